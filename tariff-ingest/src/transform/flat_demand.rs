use tariff_model::domain::{
    ChargeRecord, ChargeType, ConversionConstants, Field, RateStructure, RawTariff, TierKey,
    TimeWindow, MONTHS_PER_YEAR,
};

use super::{
    ranges::{consecutive_ranges_by, ConsecutiveRange},
    tiers::{resolve_tier, UnresolvedTier},
    units::apply_demand_unit,
};

/// Result of decoding the month-indexed flat demand table.
///
/// Decoding is all-or-nothing: one unresolvable tier anywhere means the
/// tariff contributes no flat demand at all.
#[derive(Debug, Clone, PartialEq)]
pub enum FlatDemandOutcome {
    Decoded(Vec<ChargeRecord>),
    NotOffered(UnresolvedTier),
}

impl FlatDemandOutcome {
    pub fn into_records(self) -> Vec<ChargeRecord> {
        match self {
            FlatDemandOutcome::Decoded(records) => records,
            FlatDemandOutcome::NotOffered(_) => Vec::new(),
        }
    }
}

pub fn decode_flat_demand(tariff: &RawTariff, constants: &ConversionConstants) -> FlatDemandOutcome {
    let months = &tariff.flat_demand_months;
    let mut month_ranges = consecutive_ranges_by(months, Field::same_reading);
    // An empty month table still gets the full-year range, which then
    // reports month 0 as missing.
    if month_ranges.is_empty() {
        month_ranges.push(ConsecutiveRange::new(0, MONTHS_PER_YEAR - 1));
    }

    let mut records = Vec::new();
    for range in &month_ranges {
        let Some(&period) = months.get(range.start).and_then(Field::present) else {
            return FlatDemandOutcome::NotOffered(UnresolvedTier::MissingPeriod {
                structure: RateStructure::FlatDemand,
                index: range.start,
            });
        };

        let window = TimeWindow::whole_days(range.start as u8 + 1, range.end as u8 + 1);
        let mut charge_limit = 0.0;
        for tier in 0.. {
            let key = TierKey::new(RateStructure::FlatDemand, period, tier);
            let resolved = match resolve_tier(&tariff.rates, key) {
                Ok(t) => t,
                Err(e) => return FlatDemandOutcome::NotOffered(e),
            };

            let mut record = ChargeRecord::windowed(
                &tariff.label,
                ChargeType::Demand,
                "flat",
                window,
                charge_limit,
            );
            if let Some(adj) = resolved.adjustment {
                record.notes.push_str(&format!("adjustment factor of {adj}"));
            }
            apply_demand_unit(
                resolved.charge,
                tariff.flat_demand_unit.as_deref(),
                &mut record,
                constants,
            );
            records.push(record);

            match resolved.ceiling {
                Some(max) => charge_limit = max,
                None => break,
            }
        }
    }

    FlatDemandOutcome::Decoded(records)
}
