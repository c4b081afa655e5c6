use serde::Deserialize;
use std::{fs, path::PathBuf};

use anyhow::Context;
use tariff_model::domain::ConversionConstants;

use crate::transform::validate::{CoverageMode, MaxCharges, ScheduleValidator};

#[derive(Debug, Clone, Deserialize)]
pub struct InputConfig {
    /// Wide utility-rate-database export, one tariff per row.
    pub tariffs_csv: PathBuf,
    /// Zipcode table (`zip`, `eiaid`, `state`, ...) for the metadata lookup.
    pub zipcodes_csv: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub sectors: Vec<String>,
    pub service_types: Vec<String>,
    pub capacity_kw: f64,
    /// `YYYY-MM-DD`; today when unset.
    pub date_cutoff: Option<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            sectors: vec!["Industrial".to_string(), "Commercial".to_string()],
            service_types: vec![
                "Bundled".to_string(),
                "Delivery with Standard Offer".to_string(),
            ],
            capacity_kw: 1000.0,
            date_cutoff: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    pub tariff_dir: PathBuf,
    pub metadata_csv: PathBuf,
    pub rejected_csv: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_backoff_ms: 200,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub workers: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workers: std::thread::available_parallelism().map_or(4, |n| n.get()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    pub coverage: CoverageMode,
    pub max_charges: MaxCharges,
}

impl ValidationConfig {
    pub fn validator(&self, constants: &ConversionConstants) -> ScheduleValidator {
        ScheduleValidator::new(
            self.max_charges,
            self.coverage,
            constants.cubic_feet_per_cubic_meter,
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    /// Prometheus text-format snapshot written at the end of a run.
    pub textfile: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub input: InputConfig,
    pub filter: Option<FilterConfig>,
    pub output: OutputConfig,
    #[serde(default)]
    pub sink: SinkConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub validation: ValidationConfig,
    #[serde(default)]
    pub conversion: ConversionConstants,
    pub metrics: Option<MetricsConfig>,
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        use std::env;

        let path = env::var("TARIFF_CONFIG").unwrap_or_else(|_| "tariff-config.toml".to_string());
        let contents =
            fs::read_to_string(&path).with_context(|| format!("failed to read config {path}"))?;
        Self::from_toml_str(&contents).with_context(|| format!("invalid config {path}"))
    }

    pub fn from_toml_str(contents: &str) -> anyhow::Result<Self> {
        let cfg: AppConfig = toml::from_str(contents)?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
[input]
tariffs_csv = "data/usurdb.csv"

[output]
tariff_dir = "out/tariffs"
metadata_csv = "out/metadata.csv"
rejected_csv = "out/rejected.csv"
"#;

    #[test]
    fn optional_sections_fall_back_to_defaults() {
        let cfg = AppConfig::from_toml_str(MINIMAL).unwrap();
        assert!(cfg.filter.is_none());
        assert!(cfg.metrics.is_none());
        assert!(cfg.input.zipcodes_csv.is_none());
        assert_eq!(cfg.sink.max_retries, 3);
        assert!(cfg.pipeline.workers >= 1);
        assert_eq!(cfg.validation.coverage, CoverageMode::Sweep);
        assert_eq!(cfg.validation.max_charges.electric_demand, 100.0);
        assert_eq!(cfg.conversion.power_factor, 0.95);
        assert_eq!(cfg.conversion.cubic_feet_per_cubic_meter, 2.83168);
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let toml = format!(
            "{MINIMAL}
[filter]
sectors = [\"Commercial\"]
date_cutoff = \"2024-06-01\"

[validation]
coverage = \"legacy\"

[validation.max_charges]
gas_energy = 4.5

[metrics]
textfile = \"out/metrics.prom\"
"
        );
        let cfg = AppConfig::from_toml_str(&toml).unwrap();

        let filter = cfg.filter.unwrap();
        assert_eq!(filter.sectors, vec!["Commercial"]);
        assert_eq!(filter.service_types.len(), 2);
        assert_eq!(filter.capacity_kw, 1000.0);
        assert_eq!(filter.date_cutoff.as_deref(), Some("2024-06-01"));

        assert_eq!(cfg.validation.coverage, CoverageMode::Legacy);
        assert_eq!(cfg.validation.max_charges.gas_energy, 4.5);
        assert_eq!(cfg.validation.max_charges.gas_demand, 40.0);
        assert_eq!(
            cfg.metrics.unwrap().textfile,
            PathBuf::from("out/metrics.prom")
        );
    }

    #[test]
    fn missing_output_section_is_an_error() {
        let res = AppConfig::from_toml_str("[input]\ntariffs_csv = \"a.csv\"\n");
        assert!(res.is_err());
    }
}
