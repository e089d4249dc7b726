//! nixdecl - Declarative Nix state for automation runs
//!
//! Converges Nix channels and the user environment to a declared state by
//! driving `nix-channel` and `nix-env`.
//!
//! Features:
//! - Replace the channel list with a declared name -> URL mapping
//! - Install exactly the declared packages per channel
//! - Check mode that never changes the target
//!
//! Usage: nixdecl <channel|env> [--check] [ARGS]

mod config;
mod error;
mod host;
mod nix;
mod types;
mod validate;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use config::Config;
use host::SystemHost;
use serde_json::{json, Value};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use types::OperationResult;
use validate::{ChannelArgs, EnvArgs};

#[derive(Parser, Debug)]
#[command(name = "nixdecl", version)]
#[command(about = "Declaratively manage Nix channels and user environments")]
struct Cli {
    /// Settings file (defaults to ~/.config/nixdecl/config.toml)
    #[arg(long, global = true, env = "NIXDECL_CONFIG")]
    config: Option<PathBuf>,

    /// Log debug output, including captured command output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Replace the channel list with the declared channels
    Channel(ModuleArgs),
    /// Install the declared packages into the user environment
    Env(ModuleArgs),
    /// Write the default settings file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct ModuleArgs {
    /// Report without changing anything
    #[arg(long)]
    check: bool,

    /// Argument document (JSON, or TOML by extension); `-` or omitted reads stdin
    args: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        println!("{}", failure_json(&err));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => Config::path()?,
    };

    let mut host = SystemHost;
    let result = match cli.command {
        Commands::InitConfig { force } => return init_config(&config_path, force),
        Commands::Channel(module) => {
            let config = load_config(&config_path, cli.verbose)?;
            let (doc, check_mode) = read_module_args(&module)?;
            let args = ChannelArgs::from_value(&doc).map_err(error::Error::from)?;
            nix::reconcile_channels(&mut host, &config, &args.channels, check_mode)?
        }
        Commands::Env(module) => {
            let config = load_config(&config_path, cli.verbose)?;
            let (doc, check_mode) = read_module_args(&module)?;
            let args = EnvArgs::from_value(&doc).map_err(error::Error::from)?;
            nix::install_packages(&mut host, &config, &args.packages, &args.config, check_mode)?
        }
    };

    print_result(&result)
}

fn load_config(path: &Path, verbose: bool) -> Result<Config> {
    let config = Config::load_from(path)
        .context("Failed to load configuration")?;
    init_logging(&config.log_level, verbose);
    Ok(config)
}

fn print_result(result: &OperationResult) -> Result<()> {
    let out = serde_json::to_string(result).context("Failed to serialize result")?;
    println!("{}", out);
    Ok(())
}

fn init_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists; pass --force to overwrite", path.display());
    }
    Config::default().save_to(path)?;
    println!("{}", path.display());
    Ok(())
}

/// Stderr logging; RUST_LOG wins over --verbose, which wins over the config
fn init_logging(level: &str, verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { level }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Read the argument document and split off the check-mode request
fn read_module_args(module: &ModuleArgs) -> Result<(Value, bool)> {
    let mut doc = match module.args.as_deref() {
        None => read_stdin()?,
        Some(path) if path == Path::new("-") => read_stdin()?,
        Some(path) => read_args_file(path)?,
    };

    let requested = validate::take_check_mode(&mut doc).map_err(error::Error::from)?;
    Ok((doc, module.check || requested))
}

fn read_stdin() -> Result<Value> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .context("Failed to read arguments from stdin")?;
    serde_json::from_str(&content).context("Failed to parse arguments from stdin")
}

fn read_args_file(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read arguments from {:?}", path))?;

    if path.extension().is_some_and(|ext| ext == "toml") {
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse arguments from {:?}", path))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse arguments from {:?}", path))
    }
}

fn failure_json(err: &anyhow::Error) -> Value {
    match err.downcast_ref::<error::Error>() {
        Some(err) => err.to_failure_json(),
        None => json!({
            "failed": true,
            "changed": false,
            "msg": format!("{:#}", err),
        }),
    }
}
