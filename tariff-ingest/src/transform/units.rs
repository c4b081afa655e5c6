use tariff_model::domain::{units, ChargeRecord, ConversionConstants};

const DAILY_NOTE: &str = "demand measured daily ";

/// Normalize a demand charge to $/kW and store it on `record`.
///
/// Units:
/// - absent or `kW`: charge unchanged.
/// - `kVA`: divided by the power factor.
/// - `hp`: multiplied by kW per horsepower.
///
/// A trailing `daily` token only adds a note. Any other unit leaves the
/// record's units and charges untouched.
pub fn apply_demand_unit(
    charge: f64,
    unit: Option<&str>,
    record: &mut ChargeRecord,
    constants: &ConversionConstants,
) {
    let Some(unit) = unit else {
        record.units = units::PER_KW.to_string();
        record.set_charge(charge);
        return;
    };

    let mut tokens = unit.split_whitespace();
    let name = tokens.next().unwrap_or_default();
    if tokens.next() == Some("daily") {
        record.notes.push_str(DAILY_NOTE);
    }

    let normalized = match name {
        "kW" => charge,
        "kVA" => charge / constants.power_factor,
        "hp" => charge * constants.hp_to_kw,
        other => {
            tracing::debug!(label = %record.label, unit = other, "unrecognized demand unit, charge left empty");
            return;
        }
    };
    record.units = units::PER_KW.to_string();
    record.set_charge(normalized);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tariff_model::domain::{ChargeType, TimeWindow};

    fn blank() -> ChargeRecord {
        ChargeRecord::windowed(
            "539fc321",
            ChargeType::Demand,
            "flat",
            TimeWindow::whole_days(1, 5),
            0.0,
        )
    }

    #[test]
    fn kw_charge_is_unchanged() {
        let mut r = blank();
        r.notes = "adjustment factor of 3.68".to_string();
        apply_demand_unit(13.709999999999999, Some("kW"), &mut r, &ConversionConstants::default());

        assert_eq!(r.units, "$/kW");
        assert_eq!(r.charge_imperial, Some(13.709999999999999));
        assert_eq!(r.charge_metric, Some(13.709999999999999));
        assert_eq!(r.notes, "adjustment factor of 3.68");
    }

    #[test]
    fn absent_unit_means_kw() {
        let mut r = blank();
        apply_demand_unit(7.5, None, &mut r, &ConversionConstants::default());
        assert_eq!(r.units, "$/kW");
        assert_eq!(r.charge_imperial, Some(7.5));
    }

    #[test]
    fn kva_divides_by_power_factor() {
        let mut r = blank();
        apply_demand_unit(100.0, Some("kVA"), &mut r, &ConversionConstants::default());
        assert_eq!(r.units, "$/kW");
        assert_eq!(r.charge_imperial, Some(100.0 / 0.95));
        assert_eq!(r.charge_metric, Some(100.0 / 0.95));
    }

    #[test]
    fn hp_multiplies_by_kw_per_hp() {
        let mut r = blank();
        apply_demand_unit(10.0, Some("hp"), &mut r, &ConversionConstants::default());
        assert_eq!(r.charge_imperial, Some(10.0 * 0.7457));
    }

    #[test]
    fn daily_suffix_appends_note_only() {
        let mut r = blank();
        r.notes = "adjustment factor of 1".to_string();
        apply_demand_unit(4.0, Some("kW daily"), &mut r, &ConversionConstants::default());
        assert_eq!(r.charge_imperial, Some(4.0));
        assert_eq!(r.notes, "adjustment factor of 1demand measured daily ");
    }

    #[test]
    fn unknown_unit_leaves_record_unpopulated() {
        let mut r = blank();
        apply_demand_unit(4.0, Some("kWh"), &mut r, &ConversionConstants::default());
        assert!(r.units.is_empty());
        assert!(r.charge_imperial.is_none());
        assert!(r.charge_metric.is_none());
    }
}
