use anyhow::Context;
use clap::Parser;
use factory_gateway::cli::{Cli, Command, ReasonArgs};
use factory_gateway::config::{ConfigDiscovery, GatewaySettings};
use factory_gateway::gateway::{
    GatewayError, GenerationOptions, ModelId, ModelRouter, OutputFormat, Prompt, TraceContext,
};
use factory_gateway::providers::ProviderRegistry;
use std::io::Read;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("factory_gateway=info")
        .init();

    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_ref())?;

    match cli.command {
        Command::Reason(args) => run_reason(settings, args).await,
        Command::Models => {
            print_models(&settings);
            Ok(())
        }
        Command::ShowConfig => {
            ConfigDiscovery::show_discovery_info();
            Ok(())
        }
    }
}

fn load_settings(config_override: Option<&PathBuf>) -> anyhow::Result<GatewaySettings> {
    match config_override {
        Some(path) => {
            info!("Loading configuration override from: {:?}", path);
            let mut settings = GatewaySettings::from_toml_file(path)?;
            settings.apply_env();
            Ok(settings)
        }
        None => Ok(ConfigDiscovery::discover()?),
    }
}

async fn run_reason(settings: GatewaySettings, args: ReasonArgs) -> anyhow::Result<()> {
    let candidates = if args.models.is_empty() {
        settings.priority()?
    } else {
        args.models
            .iter()
            .map(|entry| entry.parse::<ModelId>())
            .collect::<Result<Vec<_>, _>>()
            .context("invalid --model override")?
    };

    let prompt_text = read_prompt_text(&args)?;
    let generation = GenerationOptions {
        max_output_tokens: args.max_output_tokens,
        temperature: args.temperature,
        format: if args.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        },
        ..Default::default()
    };
    let prompt = Prompt::from_text(args.system.as_deref(), &prompt_text)?
        .with_generation(generation)?;

    let registry = ProviderRegistry::from_settings(&settings)?;
    let router = ModelRouter::new(
        settings.allowlist(),
        registry,
        settings.attempt_timeout(),
    );

    let trace = TraceContext::new();
    info!(correlation_id = %trace.correlation_id(), "starting reasoning call");

    // Ctrl-C aborts the in-flight attempt instead of leaving it dangling.
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling");
            trigger.cancel();
        }
    });

    match router.reason(&prompt, &candidates, &trace, &cancel).await {
        Ok(reply) => {
            println!("{}", reply.response.content);
            eprintln!("--");
            eprintln!("model: {}", reply.winning_model());
            eprintln!("attempts: {}", reply.attempts.len());
            if let Some(usage) = reply.total_usage() {
                eprintln!(
                    "tokens: in={} out={} total={}",
                    fmt_count(usage.input_tokens),
                    fmt_count(usage.output_tokens),
                    fmt_count(usage.total_tokens),
                );
            }
            Ok(())
        }
        Err(GatewayError::AllModelsExhausted { failures }) => {
            eprintln!("all candidate models failed:");
            for failure in &failures {
                eprintln!("  {failure}");
            }
            anyhow::bail!("all {} candidate models failed", failures.len());
        }
        Err(err) => Err(err.into()),
    }
}

fn read_prompt_text(args: &ReasonArgs) -> anyhow::Result<String> {
    if let Some(prompt) = &args.prompt {
        return Ok(prompt.clone());
    }
    if let Some(path) = &args.file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt file {}", path.display()));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read prompt from stdin")?;
    Ok(buffer)
}

fn print_models(settings: &GatewaySettings) {
    println!("model priority:");
    for (index, entry) in settings.model_priority.iter().enumerate() {
        println!("  {}. {}", index + 1, entry);
    }
    println!("allowed models:");
    for entry in &settings.allowed_models {
        println!("  - {}", entry);
    }
}

fn fmt_count(count: Option<u64>) -> String {
    match count {
        Some(count) => count.to_string(),
        None => "?".to_string(),
    }
}
