use anyhow::{bail, Result};
use std::{env, path::PathBuf, sync::Arc};
use tariff_ingest::{
    config::AppConfig,
    metrics_export, observability,
    pipeline::{Passthrough, Pipeline},
    sinks::TariffTableDirSink,
    sources::TariffTableDirSource,
    transform::ScheduleValidation,
};
use tariff_model::domain::Tariff;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        bail!("usage: validate_tariffs <tariff_dir> [metadata_csv]");
    }
    let tariff_dir = PathBuf::from(&args[1]);
    let metadata_csv = args.get(2).map(PathBuf::from);

    // Accepted tables are copied to `output.tariff_dir` of the config.
    let cfg = AppConfig::load()?;
    if tariff_dir == cfg.output.tariff_dir {
        bail!(
            "source directory {} is also the configured output directory",
            tariff_dir.display()
        );
    }
    if cfg.metrics.is_some() {
        metrics_export::init()?;
    }

    let pipeline: Pipeline<_, Tariff, Tariff, _> = Pipeline {
        source: TariffTableDirSource::new(tariff_dir, metadata_csv),
        convert: Arc::new(Passthrough),
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
