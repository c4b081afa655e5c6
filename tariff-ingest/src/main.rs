use anyhow::Result;
use std::sync::Arc;
use tariff_ingest::{
    config::AppConfig,
    metrics_export, observability,
    pipeline::Pipeline,
    sinks::TariffTableDirSink,
    sources::{TariffFilter, UsurdbCsvFileSource},
    transform::{metadata::ZipcodeIndex, ScheduleValidation, TariffConversion},
};
use tariff_model::domain::{RawTariff, Tariff};

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let cfg = AppConfig::load()?;
    if cfg.metrics.is_some() {
        metrics_export::init()?;
    }

    let zipcodes = match &cfg.input.zipcodes_csv {
        Some(path) => ZipcodeIndex::load(path)?,
        None => ZipcodeIndex::default(),
    };
    tracing::info!(utilities = zipcodes.len(), "zipcode table loaded");

    let mut source = UsurdbCsvFileSource::new(&cfg.input.tariffs_csv);
    if let Some(filter_cfg) = &cfg.filter {
        let filter = TariffFilter::from_config(filter_cfg)?;
        tracing::info!(cutoff = %filter.cutoff, sectors = ?filter.sectors, "filtering tariffs");
        source = source.with_filter(filter);
    }

    let pipeline: Pipeline<_, RawTariff, Tariff, _> = Pipeline {
        source,
        convert: Arc::new(TariffConversion::new(Arc::new(zipcodes), cfg.conversion)),
        transforms: vec![Arc::new(ScheduleValidation::new(
            cfg.validation.validator(&cfg.conversion),
        ))],
        sink: TariffTableDirSink::from_config(&cfg.output, &cfg.sink),
        workers: cfg.pipeline.workers,
    };

    let res = pipeline.run().await;

    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_export::write_textfile(&metrics_cfg.textfile)?;
    }
    res?;

    Ok(())
}
