use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{error, info};

use crate::config::OutputPaths;
use crate::error::Result;
use crate::report;
use crate::store;
use crate::types::{AliveEntry, Candidate, RefreshResult};

type ReportWriter = fn(&Path, &[AliveEntry]) -> Result<()>;

/// What the committer produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitSummary {
    pub store: PathBuf,
    pub alive: usize,
    pub written: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

/// Persist the outcome of a run.
///
/// Order: stage the refreshed store, write the error log, atomically replace
/// the store, then write the grouped and detail reports. Failing to stage or
/// replace the store stops the commit with the original store intact; every
/// other write failure is logged and recorded in [`CommitSummary::failed`].
pub fn commit(
    result: &RefreshResult,
    store_path: &Path,
    outputs: &OutputPaths,
) -> Result<CommitSummary> {
    commit_with(result, store_path, outputs, |from, to| fs::rename(from, to))
}

pub(crate) fn commit_with<F>(
    result: &RefreshResult,
    store_path: &Path,
    outputs: &OutputPaths,
    rename: F,
) -> Result<CommitSummary>
where
    F: FnOnce(&Path, &Path) -> io::Result<()>,
{
    let mut summary = CommitSummary {
        store: store_path.to_path_buf(),
        alive: result.alive.len(),
        ..CommitSummary::default()
    };

    let refreshed: Vec<Candidate> = result
        .alive
        .iter()
        .map(|e| Candidate::new(e.host.clone(), e.port.clone()))
        .collect();
    let temp = store::write_temp(store_path, &refreshed)?;

    match report::write_error_log(&outputs.error_log, &result.errors) {
        Ok(true) => {
            info!(path = %outputs.error_log.display(), count = result.errors.len(), "errors recorded");
            summary.written.push(outputs.error_log.clone());
        }
        Ok(false) => {}
        Err(e) => {
            error!(error = %e, "error log not written");
            summary.failed.push(outputs.error_log.clone());
        }
    }

    store::replace_from_temp_with(&temp, store_path, rename)?;
    info!(path = %store_path.display(), alive = summary.alive, "candidate store replaced");

    let reports: [(&Path, ReportWriter); 2] = [
        (outputs.grouped_report.as_path(), report::write_grouped_report),
        (outputs.detail_report.as_path(), report::write_detail_report),
    ];
    for (path, write) in reports {
        match write(path, &result.alive) {
            Ok(()) => {
                info!(path = %path.display(), "report written");
                summary.written.push(path.to_path_buf());
            }
            Err(e) => {
                error!(error = %e, "report not written");
                summary.failed.push(path.to_path_buf());
            }
        }
    }

    Ok(summary)
}
