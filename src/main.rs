use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use proxy_refresh::config::{self, OutputPaths, RefreshConfig};

/// proxy-refresh — re-verify a persisted proxy list and keep only the live entries.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "proxy-refresh",
    version,
    about = "Re-verify a persisted proxy list through a checking service and keep only live entries.",
    long_about = None
)]
struct Cli {
    /// Candidate list (one `host,port[,...]` row per line). Rewritten in place.
    #[arg(long, env = "IP_FILE", default_value = config::DEFAULT_STORE_PATH)]
    input: PathBuf,

    /// Verification URL template with `{ip}`/`{host}` and `{port}` placeholders.
    #[arg(long = "api-url", env = "API_URL", default_value = config::DEFAULT_API_TEMPLATE)]
    api_url: String,

    /// Max concurrent verification requests.
    #[arg(long, env = "PROXY_REFRESH_CONCURRENCY", default_value_t = config::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Per-request timeout in seconds.
    #[arg(long = "timeout-secs", env = "PROXY_REFRESH_TIMEOUT_SECS", default_value_t = 60)]
    timeout_secs: u64,

    /// Grouped-by-country JSON report.
    #[arg(long = "grouped-report", env = "PROXY_REFRESH_GROUPED_REPORT", default_value = config::DEFAULT_GROUPED_REPORT)]
    grouped_report: PathBuf,

    /// Detail CSV report.
    #[arg(long = "detail-report", env = "PROXY_REFRESH_DETAIL_REPORT", default_value = config::DEFAULT_DETAIL_REPORT)]
    detail_report: PathBuf,

    /// Error log, written only when a probe failed or a candidate was dead.
    #[arg(long = "error-log", env = "PROXY_REFRESH_ERROR_LOG", default_value = config::DEFAULT_ERROR_LOG)]
    error_log: PathBuf,
}

impl From<Cli> for RefreshConfig {
    fn from(cli: Cli) -> Self {
        Self {
            store_path: cli.input,
            api_template: cli.api_url,
            concurrency: cli.concurrency.max(1),
            timeout: Duration::from_secs(cli.timeout_secs),
            outputs: OutputPaths {
                grouped_report: cli.grouped_report,
                detail_report: cli.detail_report,
                error_log: cli.error_log,
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "proxy_refresh=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = RefreshConfig::from(Cli::parse());
    tracing::info!(
        input = %cfg.store_path.display(),
        api_url = %cfg.api_template,
        concurrency = cfg.concurrency,
        timeout_secs = cfg.timeout.as_secs(),
        "configuration loaded"
    );

    let run = proxy_refresh::refresh(&cfg)
        .await
        .with_context(|| format!("refresh of {} failed", cfg.store_path.display()))?;

    println!(
        "\nAlive: {} / {} (errors: {}, discarded: {})",
        run.result.alive.len(),
        run.result.submitted,
        run.result.errors.len(),
        run.result.discarded
    );
    println!("Updated {}", run.commit.store.display());
    for path in &run.commit.written {
        println!("Wrote {}", path.display());
    }
    for path in &run.commit.failed {
        eprintln!("Failed to write {}", path.display());
    }

    Ok(())
}
