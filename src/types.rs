use std::fmt;

/// One `(host, port)` pair read from the candidate store.
///
/// The port is kept as text exactly as it appeared in the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Candidate {
    pub host: String,
    pub port: String,
}

impl Candidate {
    pub fn new(host: impl Into<String>, port: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: port.into(),
        }
    }
}

impl fmt::Display for Candidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Classified result of probing a single candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Alive {
        host: String,
        port: String,
        country_code: Option<String>,
        org_name: Option<String>,
    },
    Dead {
        host: String,
        port: String,
    },
    Error {
        host: String,
        port: String,
        reason: String,
    },
}

impl ProbeOutcome {
    /// Line recorded in the error log for `Dead` and `Error` outcomes.
    pub fn error_message(&self) -> Option<String> {
        match self {
            ProbeOutcome::Alive { .. } => None,
            ProbeOutcome::Dead { host, port } => Some(format!("{host}:{port} is DEAD")),
            ProbeOutcome::Error { reason, .. } => Some(reason.clone()),
        }
    }
}

/// A candidate confirmed reachable, with the metadata the verifier reported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliveEntry {
    pub host: String,
    pub port: String,
    pub country_code: Option<String>,
    pub org_name: Option<String>,
}

impl AliveEntry {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Output of one dispatcher run. `alive` and `errors` are in completion order.
#[derive(Debug, Clone, Default)]
pub struct RefreshResult {
    pub submitted: usize,
    pub alive: Vec<AliveEntry>,
    pub errors: Vec<String>,
    /// Alive outcomes whose host/port matched no submitted candidate.
    pub discarded: usize,
}

impl RefreshResult {
    /// Number of outcomes accounted for; equals `submitted` after a full run.
    pub fn accounted(&self) -> usize {
        self.alive.len() + self.errors.len() + self.discarded
    }
}
