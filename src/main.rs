use std::net::SocketAddr;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use blog_gateway::config::{Args, LogFormat};
use blog_gateway::metrics::TRACKED_KEYS;
use blog_gateway::provider::ContentProvider;
use blog_gateway::rate_limit::AdmissionGate;
use blog_gateway::state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    // parse cli arguments
    let args = Args::parse();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    if args.log_format == LogFormat::Json {
        tracing_subscriber::fmt().with_env_filter(env_filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "gateway failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let gate_config = args.gate_config()?;
    let gate = AdmissionGate::new(gate_config);
    let provider = ContentProvider::new(reqwest::Client::new(), args.provider_config());

    if provider.config().api_key.is_none() {
        tracing::warn!("no server-side API key; callers must send their own bearer key");
    }

    // creating shared state
    let state = Arc::new(AppState {
        gate: gate.clone(),
        key_strategy: args.build_key_strategy(),
        provider,
        generate_limit: args.rate_limit,
    });

    // drop expired counters in the background
    let cleanup_every = Duration::from_secs(args.cleanup_interval.max(1));
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(cleanup_every);
        loop {
            ticker.tick().await;
            let removed = gate.purge_expired();
            TRACKED_KEYS.set(gate.len() as f64);
            if removed > 0 {
                tracing::debug!(removed, "purged expired client counters");
            }
        }
    });

    let app = blog_gateway::router(state);

    let addr = SocketAddr::new(args.host.parse()?, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!(
        %addr,
        provider = %args.provider_url,
        model = %args.model,
        rate_limit = args.rate_limit,
        rate_window_secs = args.rate_window,
        max_tracked_keys = args.max_tracked_keys,
        key_strategy = ?args.key_strategy,
        "Gateway ready",
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install signal handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
