use std::{fs, path::Path};

use anyhow::Context;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static PROM_HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Later calls are no-ops.
pub fn init() -> anyhow::Result<()> {
    PROM_HANDLE
        .get_or_try_init(|| {
            PrometheusBuilder::new()
                .install_recorder()
                .context("failed to install Prometheus metrics recorder")
        })
        .map(|_| ())
}

/// Write the current snapshot in Prometheus text format to `path`.
pub fn write_textfile(path: &Path) -> anyhow::Result<()> {
    let Some(handle) = PROM_HANDLE.get() else {
        tracing::debug!("metrics recorder not installed, skipping textfile");
        return Ok(());
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(path, handle.render())
        .with_context(|| format!("failed to write metrics textfile {}", path.display()))?;
    tracing::info!(path = %path.display(), "metrics snapshot written");
    Ok(())
}
