use std::path::PathBuf;

use tariff_model::{
    domain::Tariff,
    store::{list_tariff_tables, read_metadata, read_tariff_table},
};

use crate::pipeline::{Envelope, ItemStream, PipelineError, Source};

/// Re-reads a directory of published per-tariff charge tables.
///
/// Each `<label>.csv` becomes one `Tariff`; metadata rows are attached when a
/// metadata table is given. An unreadable table is yielded as an error.
pub struct TariffTableDirSource {
    dir: PathBuf,
    metadata_csv: Option<PathBuf>,
}

impl TariffTableDirSource {
    pub fn new<P: Into<PathBuf>>(dir: P, metadata_csv: Option<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            metadata_csv,
        }
    }
}

#[async_trait::async_trait]
impl Source<Tariff> for TariffTableDirSource {
    async fn stream(&self) -> ItemStream<Tariff> {
        let dir = self.dir.clone();
        let metadata_csv = self.metadata_csv.clone();
        let s = async_stream::stream! {
            let mut metadata = match metadata_csv.as_deref().map(read_metadata).transpose() {
                Ok(m) => m.unwrap_or_default(),
                Err(e) => {
                    yield Err(PipelineError::Source(format!("{e:#}")));
                    return;
                }
            };
            let tables = match list_tariff_tables(&dir) {
                Ok(t) => t,
                Err(e) => {
                    yield Err(PipelineError::Source(format!("{e:#}")));
                    return;
                }
            };
            tracing::info!(dir = %dir.display(), tables = tables.len(), "reading tariff tables");

            for (label, path) in tables {
                match read_tariff_table(&path) {
                    Ok(records) => {
                        yield Ok(Envelope::now(Tariff {
                            metadata: metadata.remove(&label),
                            label,
                            records,
                        }));
                    }
                    Err(e) => {
                        metrics::counter!("tariff_table_read_errors_total").increment(1);
                        yield Err(PipelineError::Source(format!("{e:#}")));
                    }
                }
            }
        };

        Box::pin(s)
    }
}
