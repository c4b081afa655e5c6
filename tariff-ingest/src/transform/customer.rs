use tariff_model::domain::{ChargeRecord, RawTariff, Utility};

/// The fixed monthly customer charge, noted with its source citation.
pub fn decode_customer(tariff: &RawTariff) -> ChargeRecord {
    let mut record = ChargeRecord::customer(
        &tariff.label,
        Utility::Electric,
        tariff.fixed_charge_first_meter,
    );
    record.notes = tariff.source.clone();
    if !tariff.source_parent.is_empty() {
        record.notes.push('\t');
        record.notes.push_str(&tariff.source_parent);
    }
    record
}
