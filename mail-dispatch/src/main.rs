use anyhow::Context;
use clap::Parser;
use mail_dispatch::cli::Cli;
use mail_dispatch::config::Settings;
use mail_dispatch::dispatch;
use std::process::ExitCode;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("mail_dispatch={}", default_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let settings = Settings::resolve(cli).context("Invalid configuration")?;
    dispatch::run(&settings).await.context("Dispatch aborted")?;
    Ok(())
}
