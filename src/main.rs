use clap::Parser;
use company_registration_api::cli::{self, Cli};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() {
    // Load .env before anything reads the environment (config singleton, RUST_LOG)
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Err(e) = cli::run(Cli::parse()).await {
        tracing::error!("{:#}", e);
        std::process::exit(1);
    }
}
