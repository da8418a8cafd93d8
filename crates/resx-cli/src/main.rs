//! CLI entry point for resx.
//!
//! This binary registers one or more resource folders and lets you browse
//! them or follow their changes live.
//!
//! # Usage
//!
//! ```bash
//! resx [OPTIONS] <COMMAND>
//!
//! # List every dialog under two folders
//! resx --path ./defs --path ./shared list --category dialog
//!
//! # Print one resource
//! resx --path ./defs cat Main.dialog
//!
//! # Print change events until Ctrl-C
//! resx --path ./defs watch
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use resx_core::{Config, ConfigError, FolderConfig, Resource, ResourceChange, ResourcesChanged};
use resx_registry::ResourceRegistry;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Browse resource folders and follow their changes.
///
/// Every `--path` becomes a folder provider, queried in the order given:
/// when two folders hold the same resource id, the first folder wins.
#[derive(Parser)]
#[command(name = "resx", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Resource folder to register (repeatable).
    ///
    /// Replaces the folders of `--config`. Defaults to the current directory
    /// when neither is given.
    #[arg(
        short,
        long = "path",
        global = true,
        env = "RESX_PATH",
        value_delimiter = ','
    )]
    paths: Vec<Utf8PathBuf>,

    /// Only register files directly inside each folder.
    #[arg(long, global = true)]
    shallow: bool,

    /// JSON configuration file.
    #[arg(short, long, global = true, env = "RESX_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Debounce window for change detection, in milliseconds.
    #[arg(long, global = true)]
    debounce_ms: Option<u64>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// List resources, sorted by id within each folder.
    List {
        /// Only list resources of this category (file extension).
        #[arg(short = 't', long)]
        category: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Show where a resource comes from.
    Get {
        /// Resource id, e.g. `Main.dialog`.
        id: String,
    },

    /// Print the content of a resource.
    Cat {
        /// Resource id, e.g. `Main.dialog`.
        id: String,
    },

    /// Print change events until interrupted.
    Watch {
        /// Print each event as one JSON line.
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    const fn monitors_changes(&self) -> bool {
        matches!(self, Self::Watch { .. })
    }
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// `notify` is filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Config`] from the config file and CLI overrides.
///
/// # Errors
///
/// Returns an error if the config file cannot be loaded, an option is
/// invalid, or a folder does not exist.
fn build_config(cli: &Cli) -> Result<Config, ConfigError> {
    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    if !cli.paths.is_empty() {
        config.folders = cli.paths.iter().cloned().map(FolderConfig::new).collect();
    }
    if config.folders.is_empty() {
        config.folders.push(FolderConfig::new("."));
    }

    let monitor = cli.command.monitors_changes();
    for folder in &mut config.folders {
        if cli.shallow {
            folder.include_subfolders = false;
        }
        folder.monitor_changes |= monitor;
    }

    if let Some(debounce_ms) = cli.debounce_ms {
        config.watch.debounce_ms = debounce_ms;
    }

    config.validate()?;

    if let Some(missing) = config.folders.iter().find(|f| !f.path.is_dir()) {
        return Err(ConfigError::MissingDirectory(missing.path.clone()));
    }

    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Lists resources, optionally restricted to a category.
fn run_list(
    registry: &ResourceRegistry,
    category: Option<&str>,
    json: bool,
) -> color_eyre::Result<()> {
    let resources = match category {
        Some(category) => registry.get_resources(category),
        None => registry.resources(),
    };

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    if json {
        serde_json::to_writer_pretty(&mut handle, &resources)?;
        writeln!(handle)?;
        return Ok(());
    }

    for resource in &resources {
        writeln!(handle, "{}", format_resource(resource))?;
    }
    info!(
        resources = resources.len(),
        providers = registry.provider_count(),
        "listed resources"
    );
    Ok(())
}

/// Prints where a resource comes from.
fn run_get(registry: &ResourceRegistry, id: &str) -> color_eyre::Result<()> {
    let resource = registry
        .get_resource(id)
        .ok_or_else(|| eyre!("resource not found: {id}"))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    serde_json::to_writer_pretty(&mut handle, &resource)?;
    writeln!(handle)?;
    Ok(())
}

/// Prints the content of a resource.
async fn run_cat(registry: &ResourceRegistry, id: &str) -> color_eyre::Result<()> {
    let resource = registry
        .get_resource(id)
        .ok_or_else(|| eyre!("resource not found: {id}"))?;

    let content = resource
        .read_text_async()
        .await
        .wrap_err_with(|| format!("failed to read {id}"))?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    write!(handle, "{content}")?;
    Ok(())
}

/// Prints change events until Ctrl-C or SIGTERM.
async fn run_watch(registry: &ResourceRegistry, json: bool) -> color_eyre::Result<()> {
    registry.on_changed(move |event| {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        let written = if json {
            serde_json::to_string(event)
                .map_err(std::io::Error::other)
                .and_then(|line| writeln!(handle, "{line}"))
        } else {
            format_event(event)
                .iter()
                .try_for_each(|line| writeln!(handle, "{line}"))
        };
        if let Err(e) = written {
            tracing::warn!(error = %e, "failed to print change event");
        }
    });

    info!(
        providers = registry.provider_count(),
        resources = registry.resource_count(),
        "watching for changes, press Ctrl-C to stop"
    );

    // Handle SIGTERM for graceful shutdown on Unix
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Received Ctrl-C, shutting down");
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl-C, shutting down");
    }

    registry.dispose();
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Formats one resource as a table row.
fn format_resource(resource: &Resource) -> String {
    format!(
        "{:<32} {:<10} {}",
        resource.id(),
        resource.category().unwrap_or("-"),
        resource.full_path()
    )
}

/// Formats a change event, one line per identifier.
fn format_event(event: &ResourcesChanged) -> Vec<String> {
    event
        .iter()
        .map(|change| match change {
            ResourceChange::Changed { resource } => {
                format!("changed  {} -> {}", resource.id(), resource.full_path())
            }
            ResourceChange::Removed { id } => format!("removed  {id}"),
        })
        .collect()
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Build the registry
    let config = build_config(&cli).wrap_err("invalid configuration")?;
    let registry = ResourceRegistry::from_config(&config)
        .await
        .wrap_err("failed to register resource folders")?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::List { category, json } => run_list(&registry, category.as_deref(), *json),
        Commands::Get { id } => run_get(&registry, id),
        Commands::Cat { id } => run_cat(&registry, id).await,
        Commands::Watch { json } => run_watch(&registry, *json).await,
    }
}
