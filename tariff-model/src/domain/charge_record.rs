use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Utility {
    Electric,
    Gas,
}

impl Utility {
    pub fn as_str(self) -> &'static str {
        match self {
            Utility::Electric => "electric",
            Utility::Gas => "gas",
        }
    }
}

impl fmt::Display for Utility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChargeType {
    Customer,
    Demand,
    Energy,
}

impl ChargeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChargeType::Customer => "customer",
            ChargeType::Demand => "demand",
            ChargeType::Energy => "energy",
        }
    }
}

impl fmt::Display for ChargeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub mod units {
    pub const PER_MONTH: &str = "$/month";
    pub const PER_KW: &str = "$/kW";
    pub const PER_KWH: &str = "$/kWh";
    pub const GAS_ENERGY: &str = "$/therm or $/m3";
    pub const GAS_DEMAND: &str = "$/therm/hr or $/m3/hr";
}

/// Month (1-12), weekday (0-6) and hour (0-24, end exclusive) bounds of a charge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub months: (u8, u8),
    pub weekdays: (u8, u8),
    pub hours: (u8, u8),
}

impl TimeWindow {
    /// Every hour of every day for the given months.
    pub fn whole_days(month_start: u8, month_end: u8) -> Self {
        Self {
            months: (month_start, month_end),
            weekdays: (0, 6),
            hours: (0, 24),
        }
    }
}

/// One (time window × tier) charge of a decoded tariff.
///
/// Field names follow the published tariff table columns. Customer charges
/// leave every temporal field and the charge limit empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChargeRecord {
    pub label: String,
    pub utility: Utility,
    #[serde(rename = "type")]
    pub charge_type: ChargeType,
    pub period: String,
    #[serde(rename = "basic_charge_limit (imperial)")]
    pub basic_charge_limit_imperial: Option<f64>,
    #[serde(rename = "basic_charge_limit (metric)")]
    pub basic_charge_limit_metric: Option<f64>,
    pub month_start: Option<u8>,
    pub month_end: Option<u8>,
    pub hour_start: Option<u8>,
    pub hour_end: Option<u8>,
    pub weekday_start: Option<u8>,
    pub weekday_end: Option<u8>,
    #[serde(rename = "charge (imperial)")]
    pub charge_imperial: Option<f64>,
    #[serde(rename = "charge (metric)")]
    pub charge_metric: Option<f64>,
    pub units: String,
    #[serde(rename = "Notes")]
    pub notes: String,
}

impl ChargeRecord {
    /// A fixed per-billing-period charge with no temporal bounds.
    pub fn customer(label: &str, utility: Utility, charge: Option<f64>) -> Self {
        Self {
            label: label.to_string(),
            utility,
            charge_type: ChargeType::Customer,
            period: String::new(),
            basic_charge_limit_imperial: None,
            basic_charge_limit_metric: None,
            month_start: None,
            month_end: None,
            hour_start: None,
            hour_end: None,
            weekday_start: None,
            weekday_end: None,
            charge_imperial: charge,
            charge_metric: charge,
            units: units::PER_MONTH.to_string(),
            notes: String::new(),
        }
    }

    /// An electric charge bounded in time, with its tier's lower limit.
    ///
    /// Charge and units start empty; decoders fill them in.
    pub fn windowed(
        label: &str,
        charge_type: ChargeType,
        period: impl Into<String>,
        window: TimeWindow,
        charge_limit: f64,
    ) -> Self {
        Self {
            label: label.to_string(),
            utility: Utility::Electric,
            charge_type,
            period: period.into(),
            basic_charge_limit_imperial: Some(charge_limit),
            basic_charge_limit_metric: Some(charge_limit),
            month_start: Some(window.months.0),
            month_end: Some(window.months.1),
            hour_start: Some(window.hours.0),
            hour_end: Some(window.hours.1),
            weekday_start: Some(window.weekdays.0),
            weekday_end: Some(window.weekdays.1),
            charge_imperial: None,
            charge_metric: None,
            units: String::new(),
            notes: String::new(),
        }
    }

    /// Same charge in both unit systems.
    pub fn set_charge(&mut self, charge: f64) {
        self.charge_imperial = Some(charge);
        self.charge_metric = Some(charge);
    }

    pub fn window(&self) -> Option<TimeWindow> {
        Some(TimeWindow {
            months: (self.month_start?, self.month_end?),
            weekdays: (self.weekday_start?, self.weekday_end?),
            hours: (self.hour_start?, self.hour_end?),
        })
    }

    /// Whether the (month, weekday, hour) point falls inside this record's window.
    pub fn covers(&self, month: u8, weekday: u8, hour: u8) -> bool {
        match self.window() {
            Some(w) => {
                w.months.0 <= month
                    && month <= w.months.1
                    && w.weekdays.0 <= weekday
                    && weekday <= w.weekdays.1
                    && w.hours.0 <= hour
                    && hour < w.hours.1
            }
            None => false,
        }
    }
}
