//! xlined - periodic X-line scheduler.
//!
//! Loads the configured static lines and drives expiry and pending-line
//! application on a fixed interval until interrupted.

use slircd_xline::config::{Config, validate};
use slircd_xline::state::{ServerState, unix_now};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        error!(path = %config_path, error = %e, code = e.error_code(), "Failed to load config");
        e
    })?;

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {}",
            errors.len(),
            config_path
        ));
    }

    info!(
        server = %config.server.name,
        sid = %config.server.sid,
        sweep_interval = config.xlines.sweep_interval,
        "Starting xlined"
    );

    let state = Arc::new(ServerState::from_config(&config, unix_now()));
    let scheduler = spawn_scheduler(
        Arc::clone(&state),
        Duration::from_secs(config.xlines.sweep_interval),
    );

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");
    scheduler.abort();

    Ok(())
}

/// Sweep expired lines and apply pending ones once per interval.
fn spawn_scheduler(state: Arc<ServerState>, period: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);

        loop {
            interval.tick().await;
            let report = state.tick(unix_now());
            for disconnect in &report.disconnected {
                info!(
                    uid = %disconnect.uid,
                    line_type = %disconnect.line_type,
                    reason = %disconnect.oper_reason,
                    "X-line enforced"
                );
            }
        }
    })
}
