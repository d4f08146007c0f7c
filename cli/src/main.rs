use clap::Parser;

mod cli;

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = gonka_core::config::load_config(cli.config.clone())?;

    // Initialize logging
    let level = &config.logging.level;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("gonka_proxy={}", level).parse()?)
                .add_directive(format!("gonka_core={}", level).parse()?)
                .add_directive("tower_http=debug".parse()?)
        )
        .init();

    match &config.source {
        Some(path) => tracing::info!("Loaded config from {:?}", path),
        None => tracing::info!("No config file found, using defaults and environment"),
    }

    match cli.command {
        Commands::Start { port, host } => {
            cli::commands::start::run(config, host, port).await?;
        }
        Commands::Status => {
            cli::commands::status::run(config).await?;
        }
        Commands::GenerateKey => {
            cli::commands::generate_key::run();
        }
    }

    Ok(())
}
