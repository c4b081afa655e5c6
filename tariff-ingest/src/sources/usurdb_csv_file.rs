use std::{collections::HashMap, fs::File, path::PathBuf};

use csv::StringRecord;
use tariff_model::domain::{
    Field, PeriodMatrix, RateStructure, RawTariff, ScheduleSet, TierKey, MONTHS_PER_YEAR,
};

use super::{
    cells::{parse_optional_f64, parse_optional_string, parse_whole},
    filter::{parse_date, TariffFilter},
};
use crate::pipeline::{Envelope, ItemStream, PipelineError, Source};

const FLAT_DEMAND_MONTHS: [&str; MONTHS_PER_YEAR] = [
    "flatDemandMonth_jan",
    "flatDemandMonth_feb",
    "flatDemandMonth_mar",
    "flatDemandMonth_apr",
    "flatDemandMonth_may",
    "flatDemandMonth_jun",
    "flatDemandMonth_jul",
    "flatDemandMonth_aug",
    "flatDemandMonth_sep",
    "flatDemandMonth_oct",
    "flatDemandMonth_nov",
    "flatDemandMonth_dec",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TierField {
    Rate,
    Adj,
    Max,
}

/// Parse a `<prefix>/period<N>/tier<T>{rate|adj|max}` column name.
fn parse_rate_column(name: &str) -> Option<(TierKey, TierField)> {
    let mut parts = name.split('/');
    let structure = RateStructure::from_prefix(parts.next()?)?;
    let period = parts.next()?.strip_prefix("period")?.parse().ok()?;
    let tier_part = parts.next()?.strip_prefix("tier")?;
    if parts.next().is_some() {
        return None;
    }

    let digits = tier_part.find(|c: char| !c.is_ascii_digit())?;
    let tier = tier_part[..digits].parse().ok()?;
    let field = match &tier_part[digits..] {
        "rate" => TierField::Rate,
        "adj" => TierField::Adj,
        "max" => TierField::Max,
        _ => return None,
    };
    Some((TierKey::new(structure, period, tier), field))
}

/// Column positions, worked out once from the header row.
#[derive(Debug)]
struct ColumnPlan {
    by_name: HashMap<String, usize>,
    rate_columns: Vec<(usize, TierKey, TierField)>,
    flat_months: Option<[usize; MONTHS_PER_YEAR]>,
}

impl ColumnPlan {
    fn from_headers(headers: &StringRecord) -> Result<Self, PipelineError> {
        let by_name: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, h)| (h.trim().to_string(), idx))
            .collect();
        if !by_name.contains_key("label") {
            return Err(PipelineError::Source(
                "missing column 'label' in tariff CSV header".to_string(),
            ));
        }

        let rate_columns = headers
            .iter()
            .enumerate()
            .filter_map(|(idx, h)| parse_rate_column(h.trim()).map(|(key, f)| (idx, key, f)))
            .collect();

        let mut months = [0usize; MONTHS_PER_YEAR];
        let mut all_months = true;
        for (slot, name) in months.iter_mut().zip(FLAT_DEMAND_MONTHS) {
            match by_name.get(name) {
                Some(&idx) => *slot = idx,
                None => all_months = false,
            }
        }

        Ok(Self {
            by_name,
            rate_columns,
            flat_months: all_months.then_some(months),
        })
    }

    fn cell<'r>(&self, record: &'r StringRecord, name: &str) -> &'r str {
        self.by_name
            .get(name)
            .and_then(|&idx| record.get(idx))
            .unwrap_or("")
    }

    fn text(&self, record: &StringRecord, name: &str) -> String {
        self.cell(record, name).trim().to_string()
    }

    fn schedule(&self, record: &StringRecord, name: &str) -> Result<Option<PeriodMatrix>, PipelineError> {
        let raw = self.cell(record, name).trim();
        if raw.is_empty() {
            return Ok(None);
        }
        let rows: Vec<Vec<u32>> = serde_json::from_str(raw)
            .map_err(|e| PipelineError::Source(format!("invalid {name} matrix: {e}")))?;
        PeriodMatrix::new(rows)
            .map(Some)
            .map_err(|e| PipelineError::Source(format!("invalid {name} matrix: {e}")))
    }

    fn raw_tariff(&self, record: &StringRecord) -> Result<RawTariff, PipelineError> {
        let label = self.text(record, "label");
        if label.is_empty() {
            return Err(PipelineError::Source("tariff row has an empty label".to_string()));
        }

        let flat_demand_months: Vec<Field<u32>> = match &self.flat_months {
            Some(cols) => cols
                .iter()
                .map(|&idx| {
                    record
                        .get(idx)
                        .and_then(parse_whole)
                        .and_then(|p| u32::try_from(p).ok())
                        .into()
                })
                .collect(),
            None => Vec::new(),
        };

        let mut tariff = RawTariff {
            eiaid: parse_whole(self.cell(record, "eiaid")),
            name: self.text(record, "name"),
            utility: self.text(record, "utility"),
            source: self.text(record, "source"),
            source_parent: self.text(record, "sourceparent"),
            description: self.text(record, "description"),
            sector: parse_optional_string(self.cell(record, "sector")),
            service_type: parse_optional_string(self.cell(record, "servicetype")),
            start_date: parse_date(self.cell(record, "startdate")),
            end_date: parse_date(self.cell(record, "enddate")),
            peak_kw_capacity_min: parse_optional_f64(self.cell(record, "peakkwcapacitymin")),
            peak_kw_capacity_max: parse_optional_f64(self.cell(record, "peakkwcapacitymax")),
            fixed_charge_first_meter: parse_optional_f64(self.cell(record, "fixedchargefirstmeter")),
            flat_demand_unit: parse_optional_string(self.cell(record, "flatdemandunit")),
            flat_demand_months,
            demand_schedule: ScheduleSet {
                weekday: self.schedule(record, "demandweekdayschedule")?,
                weekend: self.schedule(record, "demandweekendschedule")?,
            },
            energy_schedule: ScheduleSet {
                weekday: self.schedule(record, "energyweekdayschedule")?,
                weekend: self.schedule(record, "energyweekendschedule")?,
            },
            label,
            ..RawTariff::default()
        };

        for &(idx, key, field) in &self.rate_columns {
            let Some(value) = record.get(idx).and_then(parse_optional_f64) else {
                continue;
            };
            let entry = tariff.rates.entry_mut(key);
            match field {
                TierField::Rate => entry.rate = Some(value),
                TierField::Adj => entry.adj = Some(value),
                TierField::Max => entry.max = Some(value),
            }
        }

        Ok(tariff)
    }
}

/// Source over the wide utility-rate-database CSV export.
///
/// Columns are looked up by name; only `label` is mandatory. Empty or
/// unparseable numeric cells read as missing. A row that cannot be decoded
/// (bad schedule matrix, empty label) is yielded as an error and the stream
/// moves on to the next row.
pub struct UsurdbCsvFileSource {
    path: PathBuf,
    filter: Option<TariffFilter>,
}

impl UsurdbCsvFileSource {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: TariffFilter) -> Self {
        self.filter = Some(filter);
        self
    }
}

#[async_trait::async_trait]
impl Source<RawTariff> for UsurdbCsvFileSource {
    async fn stream(&self) -> ItemStream<RawTariff> {
        let path = self.path.clone();
        let filter = self.filter.clone();
        let s = async_stream::stream! {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) => {
                    yield Err(PipelineError::Source(format!(
                        "failed to open tariff CSV {}: {e}",
                        path.display()
                    )));
                    return;
                }
            };
            let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(file);
            let plan = match rdr
                .headers()
                .map_err(|e| PipelineError::Source(format!("failed to read CSV headers: {e}")))
                .and_then(ColumnPlan::from_headers)
            {
                Ok(plan) => plan,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            for result in rdr.records() {
                let parsed = result
                    .map_err(|e| PipelineError::Source(format!("failed to read CSV record: {e}")))
                    .and_then(|record| plan.raw_tariff(&record));

                let tariff = match parsed {
                    Ok(t) => t,
                    Err(e) => {
                        metrics::counter!("usurdb_csv_parse_errors_total").increment(1);
                        yield Err(e);
                        continue;
                    }
                };

                if let Some(reason) = filter.as_ref().and_then(|f| f.rejects(&tariff)) {
                    tracing::debug!(label = %tariff.label, reason, "tariff filtered out");
                    metrics::counter!("usurdb_rows_filtered_total", "reason" => reason).increment(1);
                    continue;
                }

                yield Ok(Envelope::now(tariff));
            }
        };

        Box::pin(s)
    }
}
