use tessera::{AppState, Config, run_server};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        "[tessera] patterns={} models={} sessions={}",
        config.patterns_dir.display(),
        config.models_dir.display(),
        config.sessions_dir.display()
    );

    let addr = config.bind;
    run_server(AppState::from_config(config), addr).await
}
