use clap::Parser;

use chirpy::{app, config::AppConfig, state::AppState};

#[derive(Debug, Parser)]
#[command(name = "chirpy", about = "Chirpy API server")]
struct Cli {
    /// Remove the database file before starting
    #[arg(long, env = "CHIRPY_DEBUG")]
    debug: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "chirpy=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let config = AppConfig::from_env()?;
    let state = AppState::init(config)?;

    if cli.debug {
        tracing::warn!(path = %state.store.path().display(), "debug mode: resetting database");
        state.store.reset().await?;
    }

    let addr = app::listen_addr()?;
    app::serve(app::build_app(state), addr).await
}
