use tariff_model::domain::{RateStructure, RateTable, TierKey};

/// Why a tier lookup could not produce a rate.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum UnresolvedTier {
    #[error("{structure} has no period assigned at index {index}")]
    MissingPeriod { structure: RateStructure, index: usize },
    #[error("{0} has no rate")]
    MissingRate(TierKey),
}

/// A tier with its adjustment already folded into `charge`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedTier {
    pub charge: f64,
    pub adjustment: Option<f64>,
    pub ceiling: Option<f64>,
}

pub fn resolve_tier(rates: &RateTable, key: TierKey) -> Result<ResolvedTier, UnresolvedTier> {
    let rate = rates.rate(&key).ok_or(UnresolvedTier::MissingRate(key))?;
    let adjustment = rates.adjustment(&key);
    Ok(ResolvedTier {
        charge: rate + adjustment.unwrap_or_default(),
        adjustment,
        ceiling: rates.ceiling(&key),
    })
}
