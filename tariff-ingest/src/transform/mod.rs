pub mod customer;
pub mod flat_demand;
pub mod metadata;
pub mod ranges;
pub mod schedule;
pub mod tiers;
pub mod tou;
pub mod units;
pub mod validate;

use std::sync::Arc;

use tariff_model::domain::{ChargeRecord, ConversionConstants, RawTariff, Tariff};

use crate::pipeline::{Envelope, PipelineError, Transform};

use self::{
    customer::decode_customer,
    flat_demand::{decode_flat_demand, FlatDemandOutcome},
    metadata::{generate_metadata, ZipcodeIndex},
    tou::{decode_tou, TouKind},
    validate::ScheduleValidator,
};

/// Pure decode of one raw tariff into its ordered charge records:
/// customer charge, flat demand, TOU demand, TOU energy.
pub fn decode_charges(raw: &RawTariff, constants: &ConversionConstants) -> Vec<ChargeRecord> {
    let mut records = vec![decode_customer(raw)];

    match decode_flat_demand(raw, constants) {
        FlatDemandOutcome::Decoded(flat) => records.extend(flat),
        FlatDemandOutcome::NotOffered(reason) => {
            tracing::debug!(label = %raw.label, %reason, "flat demand not offered");
            metrics::counter!("tariff_flat_demand_not_offered_total").increment(1);
        }
    }

    for kind in [TouKind::Demand, TouKind::Energy] {
        for outcome in decode_tou(raw, kind) {
            if let Some(reason) = &outcome.truncated {
                tracing::debug!(
                    label = %raw.label,
                    ?kind,
                    %reason,
                    kept = outcome.records.len(),
                    "schedule decode stopped early"
                );
                metrics::counter!("tariff_schedule_truncated_total").increment(1);
            }
            records.extend(outcome.records);
        }
    }

    records
}

/// Decodes each raw tariff and attaches its metadata row.
#[derive(Clone)]
pub struct TariffConversion {
    zipcodes: Arc<ZipcodeIndex>,
    constants: ConversionConstants,
}

impl TariffConversion {
    pub fn new(zipcodes: Arc<ZipcodeIndex>, constants: ConversionConstants) -> Self {
        Self {
            zipcodes,
            constants,
        }
    }
}

#[async_trait::async_trait]
impl Transform<RawTariff, Tariff> for TariffConversion {
    async fn apply(&self, input: Envelope<RawTariff>) -> Result<Envelope<Tariff>, PipelineError> {
        let out = input.map(|raw| Tariff {
            records: decode_charges(&raw, &self.constants),
            metadata: Some(generate_metadata(&raw, &self.zipcodes)),
            label: raw.label,
        });
        metrics::counter!("tariff_decoded_total").increment(1);
        Ok(out)
    }
}

#[derive(Clone)]
pub struct ScheduleValidation {
    validator: ScheduleValidator,
}

impl ScheduleValidation {
    pub fn new(validator: ScheduleValidator) -> Self {
        Self { validator }
    }
}

#[async_trait::async_trait]
impl Transform<Tariff, Tariff> for ScheduleValidation {
    async fn apply(&self, input: Envelope<Tariff>) -> Result<Envelope<Tariff>, PipelineError> {
        match self.validator.validate(&input.payload.records) {
            Ok(()) => Ok(input),
            Err(reason) => {
                metrics::counter!("tariff_validation_rejected_total", "reason" => reason.kind())
                    .increment(1);
                tracing::debug!(label = %input.payload.label, %reason, "tariff rejected");
                Err(PipelineError::Rejected {
                    label: input.payload.label,
                    reason,
                })
            }
        }
    }
}
