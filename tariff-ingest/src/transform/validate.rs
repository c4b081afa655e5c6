use serde::Deserialize;
use tariff_model::domain::{units, ChargeRecord, ChargeType, TimeWindow, Utility};

/// Upper bound on any single charge, per utility and charge type.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MaxCharges {
    pub electric_demand: f64,
    pub electric_energy: f64,
    pub electric_customer: f64,
    pub gas_demand: f64,
    pub gas_energy: f64,
    pub gas_customer: f64,
}

impl Default for MaxCharges {
    fn default() -> Self {
        Self {
            electric_demand: 100.0,
            electric_energy: 2.0,
            electric_customer: 5000.0,
            gas_demand: 40.0,
            gas_energy: 3.0,
            gas_customer: 5000.0,
        }
    }
}

impl MaxCharges {
    pub fn limit(&self, utility: Utility, charge_type: ChargeType) -> f64 {
        match (utility, charge_type) {
            (Utility::Electric, ChargeType::Demand) => self.electric_demand,
            (Utility::Electric, ChargeType::Energy) => self.electric_energy,
            (Utility::Electric, ChargeType::Customer) => self.electric_customer,
            (Utility::Gas, ChargeType::Demand) => self.gas_demand,
            (Utility::Gas, ChargeType::Energy) => self.gas_energy,
            (Utility::Gas, ChargeType::Customer) => self.gas_customer,
        }
    }
}

/// How temporal coverage of demand and energy charges is checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoverageMode {
    /// Check every (month, weekday, hour) of the year independently.
    #[default]
    Sweep,
    /// Walk the year by jumping to the `hour_end` of the first matching
    /// record. Matching treats the hour end as inclusive and bounds the
    /// weekday by `month_end` instead of `weekday_end`, so a weekday-only
    /// schedule can pass for the weekend while a short month window can
    /// fail for late weekdays.
    Legacy,
}

/// Why a tariff was rejected. Any one failure rejects the whole tariff.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ValidationFailure {
    #[error("{utility} {charge_type} charges leave month {month}, weekday {weekday}, hour {hour} uncovered")]
    CoverageGap {
        utility: Utility,
        charge_type: ChargeType,
        month: u8,
        weekday: u8,
        hour: u8,
    },
    #[error("{utility} {charge_type} {field} of {charge} is outside [0, {limit}]")]
    ChargeOutOfBounds {
        utility: Utility,
        charge_type: ChargeType,
        field: &'static str,
        charge: f64,
        limit: f64,
    },
    #[error("{utility} {charge_type} charge has units '{found}', expected '{expected}'")]
    WrongUnitTag {
        utility: Utility,
        charge_type: ChargeType,
        expected: &'static str,
        found: String,
    },
    #[error("{charge_type} charge has {field} bounds {start:?}..{end:?} out of order")]
    MisorderedBounds {
        charge_type: ChargeType,
        field: &'static str,
        start: Option<u8>,
        end: Option<u8>,
    },
    #[error("{utility} {charge_type} {field} imperial {imperial:?} does not convert to metric {metric:?}")]
    UnitConversionMismatch {
        utility: Utility,
        charge_type: ChargeType,
        field: &'static str,
        imperial: Option<f64>,
        metric: Option<f64>,
    },
}

impl ValidationFailure {
    /// Short category name, used as a metrics label.
    pub fn kind(&self) -> &'static str {
        match self {
            ValidationFailure::CoverageGap { .. } => "coverage_gap",
            ValidationFailure::ChargeOutOfBounds { .. } => "charge_out_of_bounds",
            ValidationFailure::WrongUnitTag { .. } => "wrong_unit_tag",
            ValidationFailure::MisorderedBounds { .. } => "misordered_bounds",
            ValidationFailure::UnitConversionMismatch { .. } => "unit_conversion_mismatch",
        }
    }
}

pub fn expected_units(utility: Utility, charge_type: ChargeType) -> &'static str {
    match (utility, charge_type) {
        (_, ChargeType::Customer) => units::PER_MONTH,
        (Utility::Electric, ChargeType::Demand) => units::PER_KW,
        (Utility::Electric, ChargeType::Energy) => units::PER_KWH,
        (Utility::Gas, ChargeType::Demand) => units::GAS_DEMAND,
        (Utility::Gas, ChargeType::Energy) => units::GAS_ENERGY,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleValidator {
    pub max_charges: MaxCharges,
    pub coverage: CoverageMode,
    /// Cubic feet per cubic metre.
    pub volumetric_factor: f64,
}

impl ScheduleValidator {
    pub fn new(max_charges: MaxCharges, coverage: CoverageMode, volumetric_factor: f64) -> Self {
        Self {
            max_charges,
            coverage,
            volumetric_factor,
        }
    }

    /// Accept or reject one tariff's full set of records.
    pub fn validate(&self, records: &[ChargeRecord]) -> Result<(), ValidationFailure> {
        for (utility, charge_type) in groups(records) {
            let group: Vec<&ChargeRecord> = records
                .iter()
                .filter(|r| r.utility == utility && r.charge_type == charge_type)
                .collect();

            if charge_type != ChargeType::Customer {
                let gap = match self.coverage {
                    CoverageMode::Sweep => sweep_gap(&group),
                    CoverageMode::Legacy => legacy_walk_gap(&group),
                };
                if let Some((month, weekday, hour)) = gap {
                    return Err(ValidationFailure::CoverageGap {
                        utility,
                        charge_type,
                        month,
                        weekday,
                        hour,
                    });
                }
            }

            self.check_bounds(utility, charge_type, &group)?;
        }

        for r in records {
            check_units(r)?;
        }
        for r in records.iter().filter(|r| r.charge_type != ChargeType::Customer) {
            check_ordering(r)?;
        }
        for r in records {
            self.check_conversion(r)?;
        }

        Ok(())
    }

    fn check_bounds(
        &self,
        utility: Utility,
        charge_type: ChargeType,
        group: &[&ChargeRecord],
    ) -> Result<(), ValidationFailure> {
        let limit = self.max_charges.limit(utility, charge_type);
        let metric_limit = match utility {
            Utility::Electric => limit,
            Utility::Gas => limit / self.volumetric_factor,
        };

        // Empty charges are left to the unit checks.
        let fields = group.iter().flat_map(|r| {
            [
                ("charge (imperial)", r.charge_imperial, limit),
                ("charge (metric)", r.charge_metric, metric_limit),
            ]
        });
        for (field, charge, limit) in fields {
            let Some(charge) = charge else { continue };
            if !(0.0..=limit).contains(&charge) {
                return Err(ValidationFailure::ChargeOutOfBounds {
                    utility,
                    charge_type,
                    field,
                    charge,
                    limit,
                });
            }
        }
        Ok(())
    }

    fn check_conversion(&self, r: &ChargeRecord) -> Result<(), ValidationFailure> {
        let factor = self.volumetric_factor;
        let customer = r.charge_type == ChargeType::Customer;

        let charge_ok = match r.utility {
            Utility::Gas if !customer => converts(r.charge_imperial, r.charge_metric, |v| v / factor),
            _ => converts(r.charge_imperial, r.charge_metric, |v| v),
        };
        if !charge_ok {
            return Err(conversion_mismatch(r, "charge", r.charge_imperial, r.charge_metric));
        }

        if !customer {
            let limit_ok = match r.utility {
                Utility::Electric => converts(
                    r.basic_charge_limit_imperial,
                    r.basic_charge_limit_metric,
                    |v| v,
                ),
                Utility::Gas => converts(
                    r.basic_charge_limit_imperial,
                    r.basic_charge_limit_metric,
                    |v| v * factor,
                ),
            };
            if !limit_ok {
                return Err(conversion_mismatch(
                    r,
                    "basic_charge_limit",
                    r.basic_charge_limit_imperial,
                    r.basic_charge_limit_metric,
                ));
            }
        }
        Ok(())
    }
}

/// Distinct (utility, type) pairs in order of first appearance.
fn groups(records: &[ChargeRecord]) -> Vec<(Utility, ChargeType)> {
    let mut seen = Vec::new();
    for r in records {
        let key = (r.utility, r.charge_type);
        if !seen.contains(&key) {
            seen.push(key);
        }
    }
    seen
}

fn sweep_gap(group: &[&ChargeRecord]) -> Option<(u8, u8, u8)> {
    for month in 1..=12 {
        for weekday in 0..7 {
            for hour in 0..24 {
                if !group.iter().any(|r| r.covers(month, weekday, hour)) {
                    return Some((month, weekday, hour));
                }
            }
        }
    }
    None
}

/// Window match of the older coverage walk.
fn legacy_matches(w: &TimeWindow, month: u8, weekday: u8, hour: u8) -> bool {
    w.months.0 <= month
        && month <= w.months.1
        && w.weekdays.0 <= weekday
        && weekday <= w.months.1
        && w.hours.0 <= hour
        && hour <= w.hours.1
}

fn legacy_walk_gap(group: &[&ChargeRecord]) -> Option<(u8, u8, u8)> {
    let (mut month, mut weekday, mut hour) = (1u8, 0u8, 0u8);
    while month < 13 {
        // A window ending exactly at `hour` still matches but cannot move the walk on.
        let next = group
            .iter()
            .filter_map(|r| r.window())
            .find(|w| legacy_matches(w, month, weekday, hour) && w.hours.1 > hour)
            .map(|w| w.hours.1);
        let Some(hour_end) = next else {
            return Some((month, weekday, hour));
        };
        hour = hour_end;
        if hour >= 24 {
            hour = 0;
            weekday += 1;
        }
        if weekday == 7 {
            weekday = 0;
            month += 1;
        }
    }
    None
}

fn check_units(r: &ChargeRecord) -> Result<(), ValidationFailure> {
    let expected = expected_units(r.utility, r.charge_type);
    if r.units != expected {
        return Err(ValidationFailure::WrongUnitTag {
            utility: r.utility,
            charge_type: r.charge_type,
            expected,
            found: r.units.clone(),
        });
    }
    Ok(())
}

fn check_ordering(r: &ChargeRecord) -> Result<(), ValidationFailure> {
    let bounds = [
        ("month", r.month_start, r.month_end, false),
        ("weekday", r.weekday_start, r.weekday_end, false),
        ("hour", r.hour_start, r.hour_end, true),
    ];
    for (field, start, end, strict) in bounds {
        let ordered = match (start, end) {
            (Some(s), Some(e)) if strict => s < e,
            (Some(s), Some(e)) => s <= e,
            _ => false,
        };
        if !ordered {
            return Err(ValidationFailure::MisorderedBounds {
                charge_type: r.charge_type,
                field,
                start,
                end,
            });
        }
    }
    Ok(())
}

fn conversion_mismatch(
    r: &ChargeRecord,
    field: &'static str,
    imperial: Option<f64>,
    metric: Option<f64>,
) -> ValidationFailure {
    ValidationFailure::UnitConversionMismatch {
        utility: r.utility,
        charge_type: r.charge_type,
        field,
        imperial,
        metric,
    }
}

fn converts(imperial: Option<f64>, metric: Option<f64>, convert: impl Fn(f64) -> f64) -> bool {
    matches!((imperial, metric), (Some(i), Some(m)) if convert(i) == m)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FT3_PER_M3: f64 = 2.83168;

    fn validator(coverage: CoverageMode) -> ScheduleValidator {
        ScheduleValidator::new(MaxCharges::default(), coverage, FT3_PER_M3)
    }

    fn electric(charge_type: ChargeType, window: TimeWindow, charge: f64, unit: &str) -> ChargeRecord {
        let mut r = ChargeRecord::windowed("t-1", charge_type, "period0", window, 0.0);
        r.set_charge(charge);
        r.units = unit.to_string();
        r
    }

    /// Customer charge, year-round flat demand and a weekday/weekend energy
    /// schedule with a two-tier weekday peak.
    fn full_year() -> Vec<ChargeRecord> {
        let weekday = |hours| TimeWindow {
            months: (1, 12),
            weekdays: (0, 4),
            hours,
        };
        let mut peak_tier = electric(ChargeType::Energy, weekday((8, 20)), 0.18, units::PER_KWH);
        peak_tier.basic_charge_limit_imperial = Some(1000.0);
        peak_tier.basic_charge_limit_metric = Some(1000.0);

        vec![
            ChargeRecord::customer("t-1", Utility::Electric, Some(120.0)),
            electric(ChargeType::Demand, TimeWindow::whole_days(1, 12), 13.71, units::PER_KW),
            electric(ChargeType::Energy, weekday((0, 8)), 0.09, units::PER_KWH),
            electric(ChargeType::Energy, weekday((8, 20)), 0.21, units::PER_KWH),
            peak_tier,
            electric(ChargeType::Energy, weekday((20, 24)), 0.09, units::PER_KWH),
            electric(
                ChargeType::Energy,
                TimeWindow {
                    months: (1, 12),
                    weekdays: (5, 6),
                    hours: (0, 24),
                },
                0.08,
                units::PER_KWH,
            ),
        ]
    }

    fn gas(charge_type: ChargeType, imperial: f64, unit: &str) -> ChargeRecord {
        let mut r = ChargeRecord::windowed("t-1", charge_type, "flat", TimeWindow::whole_days(1, 12), 0.0);
        r.utility = Utility::Gas;
        r.charge_imperial = Some(imperial);
        r.charge_metric = Some(imperial / FT3_PER_M3);
        r.basic_charge_limit_imperial = Some(0.0);
        r.basic_charge_limit_metric = Some(0.0 * FT3_PER_M3);
        r.units = unit.to_string();
        r
    }

    #[test]
    fn full_coverage_within_bounds_is_accepted() {
        assert_eq!(validator(CoverageMode::Sweep).validate(&full_year()), Ok(()));
        assert_eq!(validator(CoverageMode::Legacy).validate(&full_year()), Ok(()));
    }

    #[test]
    fn customer_only_tariff_is_accepted() {
        let records = vec![ChargeRecord::customer("t-1", Utility::Electric, Some(10.0))];
        assert_eq!(validator(CoverageMode::Sweep).validate(&records), Ok(()));
    }

    #[test]
    fn one_missing_hour_is_a_coverage_gap() {
        let mut records = full_year();
        records[5].hour_start = Some(21);

        let expected = Err(ValidationFailure::CoverageGap {
            utility: Utility::Electric,
            charge_type: ChargeType::Energy,
            month: 1,
            weekday: 0,
            hour: 20,
        });
        assert_eq!(validator(CoverageMode::Sweep).validate(&records), expected);
        assert_eq!(validator(CoverageMode::Legacy).validate(&records), expected);
    }

    #[test]
    fn missing_weekend_is_a_coverage_gap() {
        let mut records = full_year();
        records.pop();

        let res = validator(CoverageMode::Sweep).validate(&records);
        assert!(matches!(
            res,
            Err(ValidationFailure::CoverageGap { weekday: 5, month: 1, hour: 0, .. })
        ));
    }

    #[test]
    fn legacy_walk_bounds_weekdays_by_month_end() {
        let mut records = full_year();
        records.pop();

        assert!(matches!(
            validator(CoverageMode::Sweep).validate(&records),
            Err(ValidationFailure::CoverageGap { weekday: 5, .. })
        ));
        assert_eq!(validator(CoverageMode::Legacy).validate(&records), Ok(()));
    }

    #[test]
    fn legacy_walk_rejects_weekdays_past_a_short_month_window() {
        let records = vec![
            electric(ChargeType::Demand, TimeWindow::whole_days(1, 3), 10.0, units::PER_KW),
            electric(ChargeType::Demand, TimeWindow::whole_days(4, 12), 12.0, units::PER_KW),
        ];

        assert_eq!(validator(CoverageMode::Sweep).validate(&records), Ok(()));
        assert_eq!(
            validator(CoverageMode::Legacy).validate(&records),
            Err(ValidationFailure::CoverageGap {
                utility: Utility::Electric,
                charge_type: ChargeType::Demand,
                month: 1,
                weekday: 4,
                hour: 0,
            })
        );
    }

    #[test]
    fn legacy_walk_passes_over_windows_ending_at_the_hour() {
        let all_days = |hours| TimeWindow {
            months: (1, 12),
            weekdays: (0, 6),
            hours,
        };
        let records = vec![
            electric(ChargeType::Energy, all_days((0, 8)), 0.1, units::PER_KWH),
            electric(ChargeType::Energy, all_days((9, 24)), 0.2, units::PER_KWH),
        ];

        let expected = Err(ValidationFailure::CoverageGap {
            utility: Utility::Electric,
            charge_type: ChargeType::Energy,
            month: 1,
            weekday: 0,
            hour: 8,
        });
        assert_eq!(validator(CoverageMode::Sweep).validate(&records), expected);
        assert_eq!(validator(CoverageMode::Legacy).validate(&records), expected);
    }

    #[test]
    fn doubled_metric_charge_is_a_conversion_mismatch() {
        let mut records = full_year();
        records[2].charge_metric = records[2].charge_metric.map(|c| c * 2.0);

        let res = validator(CoverageMode::Sweep).validate(&records);
        assert!(matches!(
            res,
            Err(ValidationFailure::UnitConversionMismatch { field: "charge", .. })
        ));
        assert_eq!(res.unwrap_err().kind(), "unit_conversion_mismatch");
    }

    #[test]
    fn demand_above_maximum_is_out_of_bounds() {
        let mut records = full_year();
        records[1].set_charge(150.0);

        let res = validator(CoverageMode::Sweep).validate(&records);
        assert_eq!(
            res,
            Err(ValidationFailure::ChargeOutOfBounds {
                utility: Utility::Electric,
                charge_type: ChargeType::Demand,
                field: "charge (imperial)",
                charge: 150.0,
                limit: 100.0,
            })
        );
    }

    #[test]
    fn negative_charge_is_out_of_bounds() {
        let mut records = full_year();
        records[6].set_charge(-0.01);

        let res = validator(CoverageMode::Sweep).validate(&records);
        assert!(matches!(res, Err(ValidationFailure::ChargeOutOfBounds { .. })));
    }

    #[test]
    fn empty_units_are_rejected() {
        let mut records = full_year();
        records[1].units.clear();
        records[1].charge_imperial = None;
        records[1].charge_metric = None;

        let res = validator(CoverageMode::Sweep).validate(&records);
        assert_eq!(
            res,
            Err(ValidationFailure::WrongUnitTag {
                utility: Utility::Electric,
                charge_type: ChargeType::Demand,
                expected: "$/kW",
                found: String::new(),
            })
        );
    }

    #[test]
    fn empty_hour_window_is_misordered() {
        let mut records = full_year();
        let mut extra = records[2].clone();
        extra.hour_start = Some(6);
        extra.hour_end = Some(6);
        records.push(extra);

        let res = validator(CoverageMode::Sweep).validate(&records);
        assert_eq!(
            res,
            Err(ValidationFailure::MisorderedBounds {
                charge_type: ChargeType::Energy,
                field: "hour",
                start: Some(6),
                end: Some(6),
            })
        );
    }

    #[test]
    fn gas_charges_convert_by_volume() {
        let mut records = full_year();
        let mut gas_customer = ChargeRecord::customer("t-1", Utility::Gas, Some(30.0));
        gas_customer.units = units::PER_MONTH.to_string();
        records.push(gas_customer);
        records.push(gas(ChargeType::Energy, 1.2, units::GAS_ENERGY));
        records.push(gas(ChargeType::Demand, 12.0, units::GAS_DEMAND));

        assert_eq!(validator(CoverageMode::Sweep).validate(&records), Ok(()));
        for r in records.iter().filter(|r| r.utility == Utility::Gas && r.charge_type != ChargeType::Customer) {
            assert_eq!(r.charge_imperial.unwrap() / FT3_PER_M3, r.charge_metric.unwrap());
        }
    }

    #[test]
    fn gas_metric_equal_to_imperial_is_a_mismatch() {
        let mut records = full_year();
        let mut g = gas(ChargeType::Energy, 0.5, units::GAS_ENERGY);
        g.charge_metric = g.charge_imperial;
        records.push(g);

        let res = validator(CoverageMode::Sweep).validate(&records);
        assert!(matches!(
            res,
            Err(ValidationFailure::UnitConversionMismatch { utility: Utility::Gas, .. })
        ));
    }

    #[test]
    fn gas_metric_bound_is_scaled() {
        let mut records = full_year();
        // 3.0 $/therm is allowed, but a metric figure of 3.0 exceeds 3 / 2.83168.
        let mut g = gas(ChargeType::Energy, 2.9, units::GAS_ENERGY);
        g.charge_metric = Some(3.0);
        records.push(g);

        let res = validator(CoverageMode::Sweep).validate(&records);
        assert!(matches!(
            res,
            Err(ValidationFailure::ChargeOutOfBounds { field: "charge (metric)", .. })
        ));
    }
}
