use std::{collections::BTreeMap, fmt};

use time::Date;

/// A source cell that is either present or marked missing.
///
/// Missing readings never continue a run of equal values: two adjacent
/// missing months are two distinct (unknown) periods, not one.
#[derive(Debug, Clone, Copy)]
pub enum Field<T> {
    Present(T),
    Missing,
}

impl<T> Field<T> {
    pub fn present(&self) -> Option<&T> {
        match self {
            Field::Present(v) => Some(v),
            Field::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Field::Missing)
    }
}

impl<T: PartialEq> Field<T> {
    /// True when both readings are present and equal.
    pub fn same_reading(&self, other: &Self) -> bool {
        match (self, other) {
            (Field::Present(a), Field::Present(b)) => a == b,
            _ => false,
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => Field::Present(v),
            None => Field::Missing,
        }
    }
}

/// The three tiered rate tables a tariff row can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RateStructure {
    FlatDemand,
    Demand,
    Energy,
}

impl RateStructure {
    pub const ALL: [RateStructure; 3] = [
        RateStructure::FlatDemand,
        RateStructure::Demand,
        RateStructure::Energy,
    ];

    /// Column prefix used by the rate database export.
    pub fn prefix(self) -> &'static str {
        match self {
            RateStructure::FlatDemand => "flatdemandstructure",
            RateStructure::Demand => "demandratestructure",
            RateStructure::Energy => "energyratestructure",
        }
    }

    pub fn from_prefix(prefix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.prefix() == prefix)
    }
}

impl fmt::Display for RateStructure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Address of one tier in a rate table, e.g. `energyratestructure/period2/tier0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TierKey {
    pub structure: RateStructure,
    pub period: u32,
    pub tier: u32,
}

impl TierKey {
    pub fn new(structure: RateStructure, period: u32, tier: u32) -> Self {
        Self {
            structure,
            period,
            tier,
        }
    }
}

impl fmt::Display for TierKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/period{}/tier{}", self.structure, self.period, self.tier)
    }
}

/// The `rate`, `adj` and `max` sub-fields of one tier.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TierEntry {
    pub rate: Option<f64>,
    pub adj: Option<f64>,
    pub max: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    tiers: BTreeMap<TierKey, TierEntry>,
}

impl RateTable {
    pub fn insert(&mut self, key: TierKey, entry: TierEntry) {
        self.tiers.insert(key, entry);
    }

    pub fn entry_mut(&mut self, key: TierKey) -> &mut TierEntry {
        self.tiers.entry(key).or_default()
    }

    pub fn get(&self, key: &TierKey) -> Option<&TierEntry> {
        self.tiers.get(key)
    }

    pub fn rate(&self, key: &TierKey) -> Option<f64> {
        self.get(key).and_then(|e| e.rate)
    }

    pub fn adjustment(&self, key: &TierKey) -> Option<f64> {
        self.get(key).and_then(|e| e.adj)
    }

    /// Tier ceiling; `None` marks the last, unbounded tier of a period.
    pub fn ceiling(&self, key: &TierKey) -> Option<f64> {
        self.get(key).and_then(|e| e.max)
    }

    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }
}

pub const MONTHS_PER_YEAR: usize = 12;
pub const HOURS_PER_DAY: usize = 24;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum MatrixShapeError {
    #[error("expected 12 month rows, found {0}")]
    Months(usize),
    #[error("month {month} has {hours} hour cells, expected 24")]
    Hours { month: usize, hours: usize },
}

/// A 12×24 month/hour grid of period indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeriodMatrix {
    rows: Vec<Vec<u32>>,
}

impl PeriodMatrix {
    pub fn new(rows: Vec<Vec<u32>>) -> Result<Self, MatrixShapeError> {
        if rows.len() != MONTHS_PER_YEAR {
            return Err(MatrixShapeError::Months(rows.len()));
        }
        if let Some((month, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != HOURS_PER_DAY)
        {
            return Err(MatrixShapeError::Hours {
                month,
                hours: row.len(),
            });
        }
        Ok(Self { rows })
    }

    /// Same period index in every cell.
    pub fn uniform(period: u32) -> Self {
        Self {
            rows: vec![vec![period; HOURS_PER_DAY]; MONTHS_PER_YEAR],
        }
    }

    pub fn rows(&self) -> &[Vec<u32>] {
        &self.rows
    }

    /// Hour→period sequence of a 0-indexed month.
    pub fn month(&self, month: usize) -> Option<&[u32]> {
        self.rows.get(month).map(Vec::as_slice)
    }
}

/// Weekday and weekend period matrices of one rate structure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScheduleSet {
    pub weekday: Option<PeriodMatrix>,
    pub weekend: Option<PeriodMatrix>,
}

impl ScheduleSet {
    pub fn is_absent(&self) -> bool {
        self.weekday.is_none() && self.weekend.is_none()
    }
}

/// One wide row of the utility rate database.
#[derive(Debug, Clone, Default)]
pub struct RawTariff {
    pub label: String,
    pub eiaid: Option<u64>,
    pub name: String,
    pub utility: String,
    pub source: String,
    pub source_parent: String,
    pub description: String,
    pub sector: Option<String>,
    pub service_type: Option<String>,
    pub start_date: Option<Date>,
    pub end_date: Option<Date>,
    pub peak_kw_capacity_min: Option<f64>,
    pub peak_kw_capacity_max: Option<f64>,
    pub fixed_charge_first_meter: Option<f64>,
    pub flat_demand_unit: Option<String>,
    /// Period index per calendar month, January first.
    pub flat_demand_months: Vec<Field<u32>>,
    pub rates: RateTable,
    pub demand_schedule: ScheduleSet,
    pub energy_schedule: ScheduleSet,
}
