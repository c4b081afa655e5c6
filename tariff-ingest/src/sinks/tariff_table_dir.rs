use std::{path::PathBuf, time::Duration};

use futures::StreamExt;
use tariff_model::{
    domain::{RejectedTariff, Tariff, TariffMetadata},
    store::{tariff_table_path, write_metadata, write_rejected, write_tariff_table},
};

use crate::{
    config::{OutputConfig, SinkConfig},
    pipeline::{Envelope, PipelineError, Sink},
};

/// Publishes accepted tariffs as one charge table each, then the metadata
/// table and the rejected-tariff list once the input is exhausted.
pub struct TariffTableDirSink {
    tariff_dir: PathBuf,
    metadata_csv: PathBuf,
    rejected_csv: PathBuf,
    max_retries: u32,
    retry_backoff: Duration,
}

impl TariffTableDirSink {
    pub fn new(
        tariff_dir: PathBuf,
        metadata_csv: PathBuf,
        rejected_csv: PathBuf,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Self {
        Self {
            tariff_dir,
            metadata_csv,
            rejected_csv,
            max_retries,
            retry_backoff,
        }
    }

    pub fn from_config(output: &OutputConfig, sink: &SinkConfig) -> Self {
        Self::new(
            output.tariff_dir.clone(),
            output.metadata_csv.clone(),
            output.rejected_csv.clone(),
            sink.max_retries,
            Duration::from_millis(sink.retry_backoff_ms),
        )
    }

    async fn write_with_retries<F>(&self, what: &str, mut op: F) -> Result<(), PipelineError>
    where
        F: FnMut() -> anyhow::Result<()> + Send,
    {
        let mut attempt: u32 = 0;
        loop {
            match op() {
                Ok(()) => return Ok(()),
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let sleep_for = self.retry_backoff * attempt;
                    tracing::warn!(
                        error = %format!("{e:#}"),
                        attempt,
                        what,
                        "tariff table write failed, retrying with backoff"
                    );
                    tokio::time::sleep(sleep_for).await;
                }
                Err(e) => {
                    tracing::error!(error = %format!("{e:#}"), what, "tariff table write failed, giving up");
                    metrics::counter!("tariff_sink_errors_total").increment(1);
                    return Err(PipelineError::Sink(format!("{what}: {e:#}")));
                }
            }
        }
    }

    async fn write_tariff(&self, env: &Envelope<Tariff>) -> Result<(), PipelineError> {
        let tariff = &env.payload;
        let path = tariff_table_path(&self.tariff_dir, &tariff.label);
        self.write_with_retries(&tariff.label, || write_tariff_table(&path, &tariff.records))
            .await?;

        metrics::counter!("tariff_tables_written_total").increment(1);
        if let Ok(dur) = std::time::SystemTime::now().duration_since(env.received_at) {
            metrics::histogram!("tariff_end_to_end_latency_seconds").record(dur.as_secs_f64());
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl Sink<Tariff> for TariffTableDirSink {
    async fn run<S>(&self, mut input: S) -> Result<(), PipelineError>
    where
        S: futures::Stream<Item = Result<Envelope<Tariff>, PipelineError>> + Send + Unpin + 'static,
    {
        let dir = self.tariff_dir.clone();
        self.write_with_retries("tariff directory", || {
            std::fs::create_dir_all(&dir).map_err(anyhow::Error::from)
        })
        .await?;

        let mut metadata: Vec<TariffMetadata> = Vec::new();
        let mut rejected: Vec<RejectedTariff> = Vec::new();
        let mut written: usize = 0;
        let mut errors: usize = 0;

        while let Some(item) = input.next().await {
            match item {
                Ok(env) => {
                    self.write_tariff(&env).await?;
                    written += 1;
                    metadata.extend(env.payload.metadata);
                }
                Err(PipelineError::Rejected { label, reason }) => {
                    metrics::counter!("tariff_rejected_total").increment(1);
                    rejected.push(RejectedTariff {
                        tariff_id: label,
                        reason: reason.to_string(),
                    });
                }
                Err(e) => {
                    errors += 1;
                    tracing::error!(error = %e, "error in upstream pipeline for TariffTableDirSink");
                }
            }
        }

        metadata.sort_by(|a, b| a.label.cmp(&b.label));
        rejected.sort_by(|a, b| a.tariff_id.cmp(&b.tariff_id));

        self.write_with_retries("metadata table", || write_metadata(&self.metadata_csv, &metadata))
            .await?;
        self.write_with_retries("rejected list", || write_rejected(&self.rejected_csv, &rejected))
            .await?;

        tracing::info!(
            written,
            rejected = rejected.len(),
            errors,
            dir = %self.tariff_dir.display(),
            "tariff tables published"
        );
        Ok(())
    }
}
