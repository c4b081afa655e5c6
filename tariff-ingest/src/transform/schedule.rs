use tariff_model::domain::{
    ChargeRecord, ChargeType, PeriodMatrix, RateStructure, RateTable, TierKey, TimeWindow,
};

use super::{
    ranges::{consecutive_ranges, ConsecutiveRange},
    tiers::{resolve_tier, UnresolvedTier},
};

/// What one period matrix decodes into.
#[derive(Debug, Clone, Copy)]
pub struct ScheduleLayout {
    pub structure: RateStructure,
    pub units: &'static str,
    pub charge_type: ChargeType,
    pub weekdays: (u8, u8),
}

/// Records decoded from one period matrix.
///
/// Unlike flat demand, a schedule keeps everything decoded before the first
/// unresolvable tier; `truncated` says where decoding stopped.
#[derive(Debug, Clone, PartialEq)]
pub struct UnpackOutcome {
    pub records: Vec<ChargeRecord>,
    pub truncated: Option<UnresolvedTier>,
}

impl UnpackOutcome {
    fn partial(records: Vec<ChargeRecord>, reason: UnresolvedTier) -> Self {
        Self {
            records,
            truncated: Some(reason),
        }
    }
}

/// Walk a month/hour period matrix into charge records.
///
/// Order is tier within hour range within month range: every tier of a
/// period is emitted before the next hour range, and every hour range of a
/// month range before the next month range. Hour ranges are taken from the
/// first month of each month range.
pub fn unpack_schedule(
    label: &str,
    matrix: &PeriodMatrix,
    month_ranges: &[ConsecutiveRange],
    rates: &RateTable,
    layout: &ScheduleLayout,
) -> UnpackOutcome {
    let mut records = Vec::new();

    for month_range in month_ranges {
        let hours = matrix.month(month_range.start).unwrap_or_default();
        let hour_ranges = consecutive_ranges(hours);
        if hour_ranges.is_empty() {
            return UnpackOutcome::partial(
                records,
                UnresolvedTier::MissingPeriod {
                    structure: layout.structure,
                    index: month_range.start,
                },
            );
        }

        for hour_range in &hour_ranges {
            let period = hours[hour_range.start];
            let window = TimeWindow {
                months: (month_range.start as u8 + 1, month_range.end as u8 + 1),
                weekdays: layout.weekdays,
                hours: (hour_range.start as u8, hour_range.end as u8 + 1),
            };

            let mut charge_limit = 0.0;
            for tier in 0.. {
                let key = TierKey::new(layout.structure, period, tier);
                let resolved = match resolve_tier(rates, key) {
                    Ok(t) => t,
                    Err(e) => return UnpackOutcome::partial(records, e),
                };

                let mut record = ChargeRecord::windowed(
                    label,
                    layout.charge_type,
                    format!("period{period}"),
                    window,
                    charge_limit,
                );
                record.set_charge(resolved.charge);
                record.units = layout.units.to_string();
                records.push(record);

                match resolved.ceiling {
                    Some(max) => charge_limit = max,
                    None => break,
                }
            }
        }
    }

    UnpackOutcome {
        records,
        truncated: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tariff_model::domain::{units, TierEntry};

    const ENERGY_WEEKDAY: ScheduleLayout = ScheduleLayout {
        structure: RateStructure::Energy,
        units: units::PER_KWH,
        charge_type: ChargeType::Energy,
        weekdays: (0, 4),
    };

    fn entry(rate: f64, max: Option<f64>) -> TierEntry {
        TierEntry {
            rate: Some(rate),
            adj: None,
            max,
        }
    }

    /// Winter (Jan-May, Oct-Dec) is flat period 0; summer has a 08:00-20:00
    /// peak in period 1.
    fn summer_peak_matrix() -> PeriodMatrix {
        let mut peak_day = vec![0u32; 8];
        peak_day.extend([1u32; 12]);
        peak_day.extend([0u32; 4]);

        let rows = (0..12)
            .map(|m| if (5..9).contains(&m) { peak_day.clone() } else { vec![0; 24] })
            .collect();
        PeriodMatrix::new(rows).unwrap()
    }

    fn tiered_rates() -> RateTable {
        let mut rates = RateTable::default();
        rates.insert(TierKey::new(RateStructure::Energy, 0, 0), entry(0.08, Some(1000.0)));
        rates.insert(TierKey::new(RateStructure::Energy, 0, 1), entry(0.07, Some(5000.0)));
        rates.insert(TierKey::new(RateStructure::Energy, 0, 2), entry(0.06, None));
        rates.insert(TierKey::new(RateStructure::Energy, 1, 0), entry(0.21, None));
        rates
    }

    fn unpack(matrix: &PeriodMatrix, rates: &RateTable) -> UnpackOutcome {
        let month_ranges = consecutive_ranges(matrix.rows());
        unpack_schedule("t-1", matrix, &month_ranges, rates, &ENERGY_WEEKDAY)
    }

    fn shape(r: &ChargeRecord) -> (u8, u8, u8, u8, String) {
        (
            r.month_start.unwrap(),
            r.month_end.unwrap(),
            r.hour_start.unwrap(),
            r.hour_end.unwrap(),
            r.period.clone(),
        )
    }

    #[test]
    fn tiers_exhaust_before_hours_and_hours_before_months() {
        let outcome = unpack(&summer_peak_matrix(), &tiered_rates());
        assert!(outcome.truncated.is_none());

        let p0 = "period0".to_string();
        let p1 = "period1".to_string();
        let got: Vec<_> = outcome.records.iter().map(shape).collect();
        assert_eq!(
            got,
            vec![
                (1, 5, 0, 24, p0.clone()),
                (1, 5, 0, 24, p0.clone()),
                (1, 5, 0, 24, p0.clone()),
                (6, 9, 0, 8, p0.clone()),
                (6, 9, 0, 8, p0.clone()),
                (6, 9, 0, 8, p0.clone()),
                (6, 9, 8, 20, p1),
                (6, 9, 20, 24, p0.clone()),
                (6, 9, 20, 24, p0.clone()),
                (6, 9, 20, 24, p0.clone()),
                (10, 12, 0, 24, p0.clone()),
                (10, 12, 0, 24, p0.clone()),
                (10, 12, 0, 24, p0),
            ]
        );
        assert!(outcome
            .records
            .iter()
            .all(|r| r.weekday_start == Some(0) && r.weekday_end == Some(4) && r.units == "$/kWh"));
    }

    #[test]
    fn charge_limit_climbs_through_tier_ceilings() {
        let outcome = unpack(&summer_peak_matrix(), &tiered_rates());

        let limits: Vec<f64> = outcome.records[..3]
            .iter()
            .map(|r| r.basic_charge_limit_imperial.unwrap())
            .collect();
        assert_eq!(limits, vec![0.0, 1000.0, 5000.0]);

        // Limits restart at zero with each new hour range, including the
        // first range of a new month range.
        assert_eq!(outcome.records[3].basic_charge_limit_imperial, Some(0.0));
        assert_eq!(outcome.records[10].basic_charge_limit_imperial, Some(0.0));
        assert_eq!(outcome.records[6].basic_charge_limit_imperial, Some(0.0));
        assert_eq!(outcome.records[7].basic_charge_limit_imperial, Some(0.0));

        for r in &outcome.records {
            assert_eq!(r.basic_charge_limit_imperial, r.basic_charge_limit_metric);
            assert_eq!(r.charge_imperial, r.charge_metric);
        }
    }

    #[test]
    fn unresolved_tier_keeps_records_decoded_so_far() {
        let mut rates = tiered_rates();
        rates.insert(
            TierKey::new(RateStructure::Energy, 1, 0),
            TierEntry::default(),
        );

        let outcome = unpack(&summer_peak_matrix(), &rates);
        assert_eq!(
            outcome.truncated,
            Some(UnresolvedTier::MissingRate(TierKey::new(
                RateStructure::Energy,
                1,
                0
            )))
        );
        // Winter tiers plus the summer pre-peak tiers.
        assert_eq!(outcome.records.len(), 6);
    }

    #[test]
    fn adjustment_is_folded_into_charge() {
        let mut rates = RateTable::default();
        rates.insert(
            TierKey::new(RateStructure::Energy, 0, 0),
            TierEntry {
                rate: Some(0.1),
                adj: Some(0.015),
                max: None,
            },
        );

        let outcome = unpack(&PeriodMatrix::uniform(0), &rates);
        assert_eq!(outcome.records.len(), 1);
        assert_eq!(outcome.records[0].charge_imperial, Some(0.1 + 0.015));
        assert_eq!(outcome.records[0].notes, "");
    }
}
