use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use lifeclock_core::dream::{DreamGateway, OpenAiBackend, RateLimiter};
use lifeclock_server::{build_router, AppState, ServerConfig, ServerError};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "lifeclock-server", version, about = "Dream analysis relay for Lifeclock")]
struct Args {
    /// TOML config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address, e.g. 127.0.0.1:3000.
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Base URL of the OpenAI-compatible completion API.
    #[arg(long)]
    upstream_url: Option<String>,

    /// Model name sent upstream.
    #[arg(long)]
    model: Option<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "lifeclock_server=info,lifeclock_core=info,tower_http=info".into()
            }),
        )
        .init();

    if let Err(e) = run(Args::parse()).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = ServerConfig::load(args.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;
    if let Some(bind) = args.bind {
        config.bind = bind;
    }
    if let Some(url) = args.upstream_url {
        config.upstream_url = url;
    }
    if let Some(model) = args.model {
        config.model = model;
    }
    config.validate()?;

    let api_key = config.api_key.clone().ok_or(ServerError::MissingApiKey)?;
    let backend = OpenAiBackend::new(api_key)
        .with_base_url(config.upstream_url.as_str())
        .with_model(config.model.as_str());
    let gateway = DreamGateway::new(Arc::new(backend))
        .with_limiter(RateLimiter::new(config.rate_limit_max, config.rate_limit_window()))
        .with_timeout(config.upstream_timeout());
    let state = AppState::new(gateway);

    // Forget clients whose window has fully elapsed.
    let pruner = state.clone();
    let window = config.rate_limit_window();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(window);
        loop {
            ticker.tick().await;
            pruner.gateway().limiter().prune();
        }
    });

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(config.bind).await?;
    info!(
        upstream = %config.upstream_url,
        model = %config.model,
        max_requests = config.rate_limit_max,
        window_secs = config.rate_limit_window_secs,
        "lifeclock relay listening on http://{}",
        config.bind
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    info!("lifeclock relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
