use anyhow::Context;
use clap::Parser;
use mixer_api::{app, build_service, AppState, MixerConfig};
use std::path::PathBuf;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "zkether-api")]
#[command(about = "zkETHer mixer demo API", long_about = None)]
struct Args {
    /// YAML config file
    #[arg(long, env = "ZKETHER_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides the config file
    #[arg(long, env = "ZKETHER_LISTEN")]
    listen: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let config = MixerConfig::load(args.config.as_deref())?.with_listen(args.listen);
    let addr = config.listen_addr()?;

    let service = build_service(&config);
    let metrics = service.privacy_metrics().await?;
    info!(
        "ledger ready: anonymity set {} unlinkability {}",
        metrics.anonymity_set_size, metrics.unlinkability_score
    );

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!("zkether api listening on {}", addr);
    axum::serve(listener, app(AppState::new(service)).into_make_service()).await?;
    Ok(())
}
