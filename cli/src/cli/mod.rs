pub mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "gonka-proxy")]
#[command(author, version, about = "OpenAI-compatible proxy that signs requests for a Gonka endpoint")]
pub struct Cli {
    /// Path to config file (checked in order: local config.toml, ~/.config/gonka-proxy/config.toml).
    /// Environment variables (GONKA_*, API_KEY, HOST, PORT) override file values.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the proxy server
    Start {
        /// Port to listen on (overrides config and PORT)
        #[arg(short, long)]
        port: Option<u16>,

        /// Address to bind (overrides config and HOST)
        #[arg(long)]
        host: Option<String>,
    },

    /// Show effective configuration and whether the server is up
    Status,

    /// Generate a new inbound API key
    GenerateKey,
}
