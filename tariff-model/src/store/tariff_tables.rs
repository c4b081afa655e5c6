use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};

use crate::domain::{ChargeRecord, RejectedTariff, TariffMetadata};

/// Path of a tariff's charge table inside `dir`: `<dir>/<label>.csv`.
pub fn tariff_table_path(dir: &Path, label: &str) -> PathBuf {
    dir.join(format!("{label}.csv"))
}

/// Write one tariff's charge records, one row per record.
pub fn write_tariff_table(path: &Path, records: &[ChargeRecord]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create tariff table {}", path.display()))?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Read a tariff table previously written by [`write_tariff_table`].
pub fn read_tariff_table(path: &Path) -> Result<Vec<ChargeRecord>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open tariff table {}", path.display()))?;
    let records = rdr
        .deserialize::<ChargeRecord>()
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("malformed tariff table {}", path.display()))?;
    Ok(records)
}

/// List the tariff tables in `dir` as `(label, path)` pairs, sorted by label.
pub fn list_tariff_tables(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut tables = Vec::new();
    for entry in fs::read_dir(dir)
        .with_context(|| format!("failed to list tariff directory {}", dir.display()))?
    {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("csv") {
            continue;
        }
        if let Some(label) = path.file_stem().and_then(|s| s.to_str()) {
            tables.push((label.to_string(), path.clone()));
        }
    }
    tables.sort();
    Ok(tables)
}

/// Write the metadata table. An empty table still gets its header row.
pub fn write_metadata(path: &Path, rows: &[TariffMetadata]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create metadata table {}", path.display()))?;
    if rows.is_empty() {
        wtr.write_record([
            "label", "eiaid", "name", "utility", "source", "zipcode", "state", "notes",
        ])?;
    }
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Metadata rows keyed by tariff label.
pub fn read_metadata(path: &Path) -> Result<BTreeMap<String, TariffMetadata>> {
    let mut rdr = csv::Reader::from_path(path)
        .with_context(|| format!("failed to open metadata table {}", path.display()))?;
    let mut rows = BTreeMap::new();
    for row in rdr.deserialize::<TariffMetadata>() {
        let row = row?;
        rows.insert(row.label.clone(), row);
    }
    Ok(rows)
}

/// Write the rejected-tariff list. An empty list still gets its header row.
pub fn write_rejected(path: &Path, rejected: &[RejectedTariff]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)
        .with_context(|| format!("failed to create rejected list {}", path.display()))?;
    if rejected.is_empty() {
        wtr.write_record(["tariff_id", "reason"])?;
    }
    for row in rejected {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}
