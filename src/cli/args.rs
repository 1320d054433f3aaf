//! Command line argument parsing
//!
//! Subcommands:
//! - `reason`: send a prompt through the gateway and print the winning reply
//! - `models`: print the configured model priority and allowlist
//! - `show-config`: show the configuration discovery hierarchy

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fgw")]
#[command(author = "Software Factory Team")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(
    about = "Reasoning gateway that routes agent prompts across LLM providers with prioritized fallback"
)]
pub struct Cli {
    /// Path to a configuration file (skips discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send a prompt through the gateway and print the winning reply
    Reason(ReasonArgs),
    /// Print the configured model priority and allowlist
    Models,
    /// Show configuration discovery information
    ShowConfig,
}

#[derive(Debug, Args)]
pub struct ReasonArgs {
    /// Prompt text; read from --file or stdin when omitted
    pub prompt: Option<String>,

    /// Read the prompt from a file instead of the command line
    #[arg(long, conflicts_with = "prompt")]
    pub file: Option<PathBuf>,

    /// System message prepended to the conversation
    #[arg(long)]
    pub system: Option<String>,

    /// Ask for a JSON response body
    #[arg(long)]
    pub json: bool,

    /// Override the configured priority list (repeatable, "provider:model")
    #[arg(long = "model")]
    pub models: Vec<String>,

    /// Cap on generated tokens for this call
    #[arg(long)]
    pub max_output_tokens: Option<u32>,

    /// Sampling temperature in [0.0, 2.0]
    #[arg(long)]
    pub temperature: Option<f32>,
}
