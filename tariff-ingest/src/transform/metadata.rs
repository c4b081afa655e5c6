use std::{collections::BTreeMap, fs::File, io::Read, path::Path};

use anyhow::{Context, Result};
use tariff_model::domain::{RawTariff, TariffMetadata};

use crate::sources::cells::{parse_optional_string, parse_whole};

/// Full state names and their postal abbreviations.
///
/// District of Columbia is filed under Maryland.
const STATE_ABBREVIATIONS: [(&str, &str); 51] = [
    ("Alabama", "AL"),
    ("Alaska", "AK"),
    ("Arizona", "AZ"),
    ("Arkansas", "AR"),
    ("California", "CA"),
    ("Colorado", "CO"),
    ("Connecticut", "CT"),
    ("Delaware", "DE"),
    ("Florida", "FL"),
    ("Georgia", "GA"),
    ("Hawaii", "HI"),
    ("Idaho", "ID"),
    ("Illinois", "IL"),
    ("Indiana", "IN"),
    ("Iowa", "IA"),
    ("Kansas", "KS"),
    ("Kentucky", "KY"),
    ("Louisiana", "LA"),
    ("Maine", "ME"),
    ("Maryland", "MD"),
    ("Massachusetts", "MA"),
    ("Michigan", "MI"),
    ("Minnesota", "MN"),
    ("Mississippi", "MS"),
    ("Missouri", "MO"),
    ("Montana", "MT"),
    ("Nebraska", "NE"),
    ("Nevada", "NV"),
    ("New Hampshire", "NH"),
    ("New Jersey", "NJ"),
    ("New Mexico", "NM"),
    ("New York", "NY"),
    ("North Carolina", "NC"),
    ("North Dakota", "ND"),
    ("Ohio", "OH"),
    ("Oklahoma", "OK"),
    ("Oregon", "OR"),
    ("Pennsylvania", "PA"),
    ("Rhode Island", "RI"),
    ("South Carolina", "SC"),
    ("South Dakota", "SD"),
    ("Tennessee", "TN"),
    ("Texas", "TX"),
    ("Utah", "UT"),
    ("Vermont", "VT"),
    ("Virginia", "VA"),
    ("Washington", "WA"),
    ("West Virginia", "WV"),
    ("Wisconsin", "WI"),
    ("Wyoming", "WY"),
    ("District of Columbia", "MD"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipcodeEntry {
    pub zipcode: String,
    pub state: Option<String>,
}

#[derive(serde::Deserialize)]
struct ZipcodeRow {
    zip: String,
    eiaid: String,
    #[serde(default)]
    state: String,
}

/// First zipcode listed for each utility (EIA id) in the merged zipcode table.
#[derive(Debug, Clone, Default)]
pub struct ZipcodeIndex {
    by_eiaid: BTreeMap<u64, ZipcodeEntry>,
}

impl ZipcodeIndex {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("failed to open zipcode table {}", path.display()))?;
        Self::from_reader(file)
    }

    /// Rows with an unparseable zip or EIA id are skipped.
    pub fn from_reader(reader: impl Read) -> Result<Self> {
        let mut rdr = csv::Reader::from_reader(reader);
        let mut by_eiaid = BTreeMap::new();
        for row in rdr.deserialize::<ZipcodeRow>() {
            let row = row?;
            let (Some(eiaid), Some(zip)) = (parse_whole(&row.eiaid), parse_whole(&row.zip)) else {
                continue;
            };
            by_eiaid.entry(eiaid).or_insert_with(|| ZipcodeEntry {
                zipcode: format!("{zip:05}"),
                state: parse_optional_string(&row.state),
            });
        }
        Ok(Self { by_eiaid })
    }

    pub fn get(&self, eiaid: u64) -> Option<&ZipcodeEntry> {
        self.by_eiaid.get(&eiaid)
    }

    pub fn len(&self) -> usize {
        self.by_eiaid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_eiaid.is_empty()
    }
}

/// State abbreviation whose full name appears in any of `texts`; the longest name wins.
fn state_from_text(texts: &[&str]) -> Option<String> {
    STATE_ABBREVIATIONS
        .iter()
        .filter(|(name, _)| texts.iter().any(|t| t.contains(name)))
        .max_by_key(|(name, _)| name.len())
        .map(|(_, abbr)| (*abbr).to_string())
}

pub fn generate_metadata(tariff: &RawTariff, zipcodes: &ZipcodeIndex) -> TariffMetadata {
    let (zipcode, state) = match tariff.eiaid.and_then(|id| zipcodes.get(id)) {
        Some(entry) => (Some(entry.zipcode.clone()), entry.state.clone()),
        None => (
            None,
            state_from_text(&[tariff.utility.as_str(), tariff.source.as_str()]),
        ),
    };

    TariffMetadata {
        label: tariff.label.clone(),
        eiaid: tariff.eiaid,
        name: tariff.name.clone(),
        utility: tariff.utility.clone(),
        source: tariff.source.clone(),
        zipcode,
        state,
        notes: tariff.description.clone(),
    }
}
