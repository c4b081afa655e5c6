use serde::Deserialize;

/// Physical conversion factors applied while decoding and checked while validating.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct ConversionConstants {
    /// Assumed power factor for $/kVA → $/kW.
    pub power_factor: f64,
    /// kW per horsepower.
    pub hp_to_kw: f64,
    /// Cubic feet per cubic metre; gas metric charges are imperial / this.
    pub cubic_feet_per_cubic_meter: f64,
}

impl Default for ConversionConstants {
    fn default() -> Self {
        Self {
            power_factor: 0.95,
            hp_to_kw: 0.7457,
            cubic_feet_per_cubic_meter: 2.83168,
        }
    }
}
