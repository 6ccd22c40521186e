//! smol-agent command-line front end.
//!
//! Usage:
//!   smol-agent ask <objective>         Run one agent turn
//!   smol-agent tools                   List registered tools
//!   smol-agent call <tool> --arg k=v   Dispatch a tool directly
//!   smol-agent schema                  Print the serialized tool catalog
//!   smol-agent init                    Write a default config file

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use smol_agent::agent::Agent;
use smol_agent::config::{self, AgentConfig};
use smol_agent::llm;
use smol_agent::tools::{builtin, schema, FunctionRegistry, ToolArgs};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "smol-agent")]
#[command(version)]
#[command(about = "Minimal tool-augmented LLM agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to the config file (default: ~/.smol-agent/smol-agent.toml).
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log level (debug, info, warn, error). Overrides the config file.
    #[arg(long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run one agent turn for an objective.
    Ask {
        /// The objective, in natural language.
        #[arg(required = true, num_args = 1..)]
        objective: Vec<String>,

        /// Print the full turn record as JSON after the response.
        #[arg(long)]
        show_turn: bool,
    },

    /// List the registered tools.
    Tools,

    /// Dispatch a tool directly, without the LLM.
    Call {
        /// Tool name.
        tool: String,

        /// Argument as key=value (repeatable).
        #[arg(long = "arg", value_name = "KEY=VALUE")]
        args: Vec<String>,
    },

    /// Print the tool catalog in a backend's tool-schema shape.
    Schema {
        #[arg(long, value_enum, default_value_t = SchemaFormat::Openai)]
        format: SchemaFormat,
    },

    /// Write a default config file.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SchemaFormat {
    Openai,
    Gemini,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
        .unwrap_or_else(config::default_config_path);

    let cfg = config::load_config(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;

    // Initialize logging
    let level = cli.log_level.as_deref().unwrap_or(&cfg.log_level);
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Ask {
            objective,
            show_turn,
        } => cmd_ask(&cfg, &objective.join(" "), show_turn).await,
        Commands::Tools => cmd_tools(&cfg),
        Commands::Call { tool, args } => cmd_call(&cfg, &tool, &args).await,
        Commands::Schema { format } => cmd_schema(&cfg, format),
        Commands::Init { force } => cmd_init(&cfg, &config_path, force),
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

async fn cmd_ask(cfg: &AgentConfig, objective: &str, show_turn: bool) -> Result<()> {
    let registry = build_registry(cfg)?;
    let client = llm::build_client(&cfg.llm)?;
    let agent = Agent::from_config(cfg, client, registry);

    info!(
        "Using {} model '{}' in {} mode",
        cfg.llm.provider, cfg.llm.model, cfg.agent.directive_mode
    );

    let turn = agent.run_turn(objective).await;
    println!("{}", turn.final_response);

    if show_turn {
        eprintln!();
        eprintln!("{}", "=== Turn ===".bold());
        eprintln!("{}", serde_json::to_string_pretty(&turn)?);
    }
    Ok(())
}

fn cmd_tools(cfg: &AgentConfig) -> Result<()> {
    let registry = build_registry(cfg)?;

    println!();
    println!("{}", "=== Tools ===".bold());
    println!();
    for def in registry.describe_all() {
        println!("  {}: {}", def.name.green().bold(), def.description);
        for p in &def.parameters {
            println!("    {}  {}", p.name.cyan(), p.description.dimmed());
        }
    }
    println!();
    Ok(())
}

async fn cmd_call(cfg: &AgentConfig, tool: &str, raw_args: &[String]) -> Result<()> {
    let registry = build_registry(cfg)?;
    let args = parse_key_values(raw_args)?;
    println!("{}", registry.call(tool, &args).await);
    Ok(())
}

fn cmd_schema(cfg: &AgentConfig, format: SchemaFormat) -> Result<()> {
    let registry = build_registry(cfg)?;
    let defs = registry.describe_all();
    let tools = match format {
        SchemaFormat::Openai => schema::openai_tools(&defs),
        SchemaFormat::Gemini => schema::gemini_tools(&defs),
    };
    println!("{}", serde_json::to_string_pretty(&tools)?);
    Ok(())
}

fn cmd_init(cfg: &AgentConfig, path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "Config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }
    config::save_config(cfg, path)?;
    println!("{} Wrote {}", ">>>".green().bold(), path.display());
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build the registry and register the enabled built-in tools.
fn build_registry(cfg: &AgentConfig) -> Result<Arc<FunctionRegistry>> {
    let registry = FunctionRegistry::with_timeout(Duration::from_secs(cfg.tools.timeout_secs));
    builtin::register_builtins(&registry, &cfg.tools)?;
    Ok(Arc::new(registry))
}

/// Parse `key=value` pairs. Values that parse as JSON scalars keep their
/// type; anything else is a string.
fn parse_key_values(raw: &[String]) -> Result<ToolArgs> {
    let mut map = Map::new();
    for item in raw {
        let Some((key, value)) = item.split_once('=') else {
            bail!("Invalid argument '{}': expected KEY=VALUE", item);
        };
        let value = match serde_json::from_str::<Value>(value) {
            Ok(v @ (Value::Number(_) | Value::Bool(_))) => v,
            _ => Value::String(value.to_string()),
        };
        map.insert(key.to_string(), value);
    }
    Ok(ToolArgs::new(map))
}
