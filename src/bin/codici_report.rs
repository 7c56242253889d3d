//! codici-report: send the usage report once
//!
//! For hosts that drive the schedule with an external timer (cron, systemd
//! timers) instead of the server's built-in schedule.
//!
//! Usage: `codici-report [config.yaml]`

use tracing::info;

use codici::config::Config;
use codici::runtime::Runtime;
use codici::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let path = std::env::args().nth(1);
    let config = Config::load(path.as_deref())?;

    let runtime = Runtime::init(config).await?;
    let rows = runtime.reporter.send_report().await?;

    info!(rows, "usage report sent");
    Ok(())
}
