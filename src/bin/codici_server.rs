//! codici-server: REST host for the code issuing workflow
//!
//! Serves the administrative API and the order-completion hook, and runs
//! the usage report on its schedule once the first request registers it.
//!
//! ## Configuration
//! ```yaml
//! server:
//!   port: 8090
//! storage:
//!   type: sqlite
//!   path: data/codici.db
//! mail:
//!   type: http
//!   http:
//!     endpoint: https://relay.example.com/send
//!     from: shop@example.com
//! commerce:
//!   endpoint: https://shop.example.com/api
//!   hook_token: change-me-too
//!   qualifying_category: e-learning
//! admin:
//!   token: change-me
//! defaults:
//!   admin_email: admin@example.com
//!   notification_threshold: 2
//! ```
//!
//! Usage: `codici-server [config.yaml]`

use tracing::info;

use codici::admin::rest;
use codici::config::Config;
use codici::runtime::Runtime;
use codici::utils::bootstrap::init_tracing;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let path = std::env::args().nth(1);
    let config = Config::load(path.as_deref())?;
    let host = config.server.host.clone();
    let port = config.server.port;

    if config.admin.token.is_none() {
        tracing::warn!("admin.token not set; administrative endpoints will deny every caller");
    }
    if config.commerce.hook_token.is_none() {
        tracing::warn!("commerce.hook_token not set; the order hook will reject every call");
    }

    let runtime = Runtime::init(config).await?;
    let scheduler = runtime.scheduler.clone();

    info!("codici-server starting");

    tokio::select! {
        result = rest::serve(runtime.app_state(), &host, port) => result?,
        _ = tokio::signal::ctrl_c() => info!("shutdown requested"),
    }

    scheduler.shutdown().await;
    Ok(())
}
