//! Library crate for proxy-refresh: probe a persisted candidate list through a
//! verification service and keep only the reachable entries.
pub mod commit;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod probe;
pub mod report;
pub mod store;
pub mod types;

use std::sync::Arc;

use tracing::info;

use crate::commit::CommitSummary;
use crate::config::RefreshConfig;
use crate::error::{RefreshError, Result};
use crate::probe::{HttpProbe, Probe};
use crate::types::RefreshResult;

/// Everything one completed run produced.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub result: RefreshResult,
    pub commit: CommitSummary,
}

/// Run the full pipeline against the HTTP verification service in `config`.
pub async fn refresh(config: &RefreshConfig) -> Result<RunReport> {
    let probe = HttpProbe::new(config.api_template.clone(), config.timeout)
        .map_err(RefreshError::Client)?;
    refresh_with(config, Arc::new(probe)).await
}

/// Run the full pipeline with a caller-supplied probe.
///
/// An unreadable candidate store aborts before any probe is issued.
pub async fn refresh_with<P: Probe>(config: &RefreshConfig, probe: Arc<P>) -> Result<RunReport> {
    let candidates = store::load_candidates(&config.store_path)?;
    info!(
        path = %config.store_path.display(),
        count = candidates.len(),
        "loaded candidates"
    );

    let result = dispatcher::run(&candidates, probe, config.concurrency).await;
    info!(
        alive = result.alive.len(),
        errors = result.errors.len(),
        discarded = result.discarded,
        "probing finished"
    );

    let commit = commit::commit(&result, &config.store_path, &config.outputs)?;
    Ok(RunReport { result, commit })
}
