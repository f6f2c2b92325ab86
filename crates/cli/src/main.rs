mod agents;
mod cli;
mod ollama;
mod terminal;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{error, info};

use toolbridge_core::config::{load_dotenv, Config};
use toolbridge_runtime::allowed::AllowedTools;
use toolbridge_runtime::bridge::ToolCallNormalizer;
use toolbridge_runtime::hooks::LoggerPlugin;
use toolbridge_runtime::provider::ModelProvider;
use toolbridge_runtime::session::Session;
use toolbridge_runtime::AgenticLoop;

use crate::agents::{build_root_agent, DEFAULT_MESSAGE};
use crate::cli::CliArgs;
use crate::ollama::OllamaChatProvider;
use crate::terminal::Terminal;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&args.log_level)),
        )
        .with_target(false)
        .init();

    load_dotenv();
    let mut config = Config::from_env();
    apply_args(&mut config, &args);
    config.validate().context("invalid configuration")?;
    config.log_summary();

    let terminal = Terminal::new();

    let root = Arc::new(build_root_agent(&config.http).context("failed to build agents")?);
    let logger = Arc::new(LoggerPlugin::new());

    let normalizer = if config.bridge.dynamic {
        ToolCallNormalizer::dynamic()
    } else {
        match &config.bridge.allowed_tools {
            Some(names) => ToolCallNormalizer::new(Some(AllowedTools::new(names))),
            None => ToolCallNormalizer::for_agent_tree(&root),
        }
    }
    .with_hook(logger.clone());

    let allow_label = if config.bridge.dynamic {
        "(per active agent)".to_string()
    } else {
        normalizer
            .allowed_for(&root)
            .iter()
            .collect::<Vec<_>>()
            .join(", ")
    };

    let provider: Arc<dyn ModelProvider> = Arc::new(OllamaChatProvider::new(
        config.ollama.url.clone(),
        config.ollama.model.clone(),
        config.ollama.temperature,
    ));

    let agentic_loop = AgenticLoop::new(provider, root)
        .with_plugin(logger)
        .with_plugin(Arc::new(normalizer))
        .with_max_iterations(config.bridge.max_iterations as usize);

    let message = args
        .message
        .clone()
        .or_else(|| config.session.test_message.clone())
        .unwrap_or_else(|| DEFAULT_MESSAGE.to_string());

    let mut session = Session::new(
        config.session.app_name.clone(),
        config.session.user_id.clone(),
        config.session.session_id.clone(),
    );

    terminal.print_banner(&config.ollama.model, &config.ollama.url, &allow_label)?;
    info!(session = %session.id, "Running turn");

    let spinner = terminal.start_spinner("thinking")?;
    let outcome = agentic_loop.run(&mut session, message).await;
    spinner.stop();

    let events = match outcome {
        Ok(events) => events,
        Err(e) => {
            error!(error = %e, "Agentic loop error");
            terminal.print_error(&format!("{:#}", e))?;
            terminal.print_info("(No final response event received.)")?;
            return Ok(());
        }
    };

    for event in &events {
        terminal.display_event(event)?;
    }

    match events
        .iter()
        .find(|event| event.is_final_response())
        .and_then(|event| event.text())
    {
        Some(text) => terminal.print_final_answer(&text)?,
        None => terminal.print_info("\n(No final response event received.)")?,
    }

    Ok(())
}

/// Command-line flags win over environment configuration.
fn apply_args(config: &mut Config, args: &CliArgs) {
    if let Some(model) = &args.model {
        config.ollama.model = model.clone();
    }
    if let Some(url) = &args.ollama_url {
        config.ollama.url = url.clone();
    }
    if !args.allow.is_empty() {
        let joined = args.allow.join(",");
        config.bridge.allowed_tools = Some(toolbridge_core::config::parse_tool_list(&joined));
    }
    if args.dynamic {
        config.bridge.dynamic = true;
    }
    if let Some(max) = args.max_iterations {
        config.bridge.max_iterations = max;
    }
}
