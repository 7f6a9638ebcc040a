use anyhow::{Context, Result};
use salesboard::{config::Config, server};
use std::{env, path::PathBuf, sync::Arc};
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let log_level = env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string());
    fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(log_level.parse().unwrap_or(Level::INFO.into())),
        )
        .init();

    std::panic::set_hook(Box::new(|info| {
        eprintln!("panic: {:?}", info);
    }));

    // ─── 2) config ───────────────────────────────────────────────────
    let explicit = env::args().nth(1).map(PathBuf::from);
    let cfg = Config::load(explicit.as_deref()).context("loading configuration")?;
    info!(
        source = ?cfg.source.kind,
        timeout_secs = cfg.source.timeout_secs,
        "startup"
    );

    // ─── 3) serve ────────────────────────────────────────────────────
    let state = Arc::new(server::AppState {
        pipeline: cfg.pipeline().context("building pipeline")?,
        rules: cfg.aggregate.clone(),
    });
    server::serve(state, cfg.server.socket_addr()).await;

    Ok(())
}
