use serde::{Deserialize, Serialize};

use super::ChargeRecord;

/// One row of the metadata table published alongside the tariff tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TariffMetadata {
    pub label: String,
    pub eiaid: Option<u64>,
    pub name: String,
    pub utility: String,
    pub source: String,
    pub zipcode: Option<String>,
    pub state: Option<String>,
    pub notes: String,
}

/// A decoded tariff: its charge records in emission order plus metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Tariff {
    pub label: String,
    pub records: Vec<ChargeRecord>,
    pub metadata: Option<TariffMetadata>,
}

/// A tariff the validator turned down.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedTariff {
    pub tariff_id: String,
    pub reason: String,
}
