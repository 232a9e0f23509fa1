use clap::Parser;
use storybook_publisher::cli::{run, Cli};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // The subscriber must exist before config loading logs anything, so the
    // filter comes from the flag/env layers only.
    let level = cli
        .log_level
        .clone()
        .or_else(|| std::env::var("STORYBOOKS_LOG_LEVEL").ok())
        .and_then(|raw| raw.parse::<storybook_publisher::config::LogLevel>().ok())
        .unwrap_or(storybook_publisher::config::LogLevel::Info);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(level.as_filter()))
        .init();

    match run(cli).await {
        Ok(()) => {
            std::process::exit(0);
        }
        Err(e) => {
            tracing::error!(error = %e, "Pipeline failed");
            eprintln!("[ERROR] {e:#}");
            std::process::exit(1);
        }
    }
}
