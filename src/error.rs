use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Failures that stop a refresh run or that the committer reports.
///
/// Per-candidate transport and parse failures are not represented here; they
/// travel as [`crate::types::ProbeOutcome::Error`] values.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("candidate store {path} could not be read")]
    InputMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write temporary store {path}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to replace {target} with {temp}")]
    StoreReplace {
        temp: PathBuf,
        target: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to build verification HTTP client")]
    Client(#[source] reqwest::Error),

    #[error("failed to write report {path}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

pub type Result<T, E = RefreshError> = std::result::Result<T, E>;
