use clap::Parser;

use backlot_gateway::cli::{self, Cli};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up GATEWAY_BACKEND_URL,
    // GATEWAY_JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backlot_gateway=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();
    cli::run(cli).await
}
