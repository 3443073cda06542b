use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_STORE_PATH: &str = "totalproxylist.txt";
pub const DEFAULT_API_TEMPLATE: &str = "https://proxyip-check.vercel.app/{ip}:{port}";
pub const DEFAULT_GROUPED_REPORT: &str = "kvProxylist.json";
pub const DEFAULT_DETAIL_REPORT: &str = "active_proxies.csv";
pub const DEFAULT_ERROR_LOG: &str = "error.txt";
pub const DEFAULT_CONCURRENCY: usize = 10;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Everything a refresh run needs to know.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshConfig {
    pub store_path: PathBuf,
    pub api_template: String,
    pub concurrency: usize,
    pub timeout: Duration,
    pub outputs: OutputPaths,
}

/// Locations of the derived reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub grouped_report: PathBuf,
    pub detail_report: PathBuf,
    pub error_log: PathBuf,
}

impl Default for OutputPaths {
    fn default() -> Self {
        Self {
            grouped_report: PathBuf::from(DEFAULT_GROUPED_REPORT),
            detail_report: PathBuf::from(DEFAULT_DETAIL_REPORT),
            error_log: PathBuf::from(DEFAULT_ERROR_LOG),
        }
    }
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            api_template: DEFAULT_API_TEMPLATE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
            timeout: DEFAULT_TIMEOUT,
            outputs: OutputPaths::default(),
        }
    }
}

impl OutputPaths {
    /// Place all reports under `dir` with their default file names.
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        Self {
            grouped_report: dir.join(DEFAULT_GROUPED_REPORT),
            detail_report: dir.join(DEFAULT_DETAIL_REPORT),
            error_log: dir.join(DEFAULT_ERROR_LOG),
        }
    }
}
