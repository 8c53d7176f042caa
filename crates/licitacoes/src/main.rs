//! licitacoes CLI
#![deny(unsafe_code)]

use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use licitacoes::{Cli, Commands, commands};
use licitacoes_core::config::{Config, ConfigLoader, ConfigSources};
use licitacoes_core::{Dataset, DatasetError};
use tracing::debug;

mod observability;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cli.color.apply();

    if cli.version_only {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    // arg_required_else_help ensures we have --version-only or a subcommand
    let Some(command) = cli.command else {
        return Ok(());
    };

    if let Some(ref dir) = cli.chdir {
        std::env::set_current_dir(dir)
            .with_context(|| format!("failed to change directory to {}", dir.display()))?;
    }

    let cwd = std::env::current_dir().context("failed to determine current directory")?;
    let cwd = utf8(cwd, "current directory")?;
    let mut loader = ConfigLoader::new().with_project_search(&cwd);
    if let Some(ref config_path) = cli.config {
        loader = loader.with_file(utf8(config_path.clone(), "config path")?);
    }
    let (mut config, config_sources) = loader.load().context("failed to load configuration")?;

    let obs_config = observability::ObservabilityConfig::from_env_with_overrides(
        config
            .log_dir
            .as_ref()
            .map(|dir| dir.as_std_path().to_path_buf()),
    );
    let env_filter = observability::env_filter(cli.quiet, cli.verbose, config.log_level.as_str());
    let _guard = observability::init_observability(
        &obs_config,
        env_filter,
        observability::stderr_level(cli.quiet, cli.verbose),
    )
    .context("failed to initialize logging/tracing")?;

    debug!(
        verbose = cli.verbose,
        quiet = cli.quiet,
        json = cli.json,
        color = ?cli.color,
        chdir = ?cli.chdir,
        "CLI initialized"
    );

    // Anchored to the working directory so config-relative resolution leaves it alone.
    if let Some(ref path) = cli.dataset {
        config.dataset = Some(cwd.join(utf8(path.clone(), "dataset path")?));
    }

    let result = run(command, cli.json, &config, &config_sources);
    if let Err(ref err) = result {
        tracing::error!(error = %err, "fatal error");
    }
    result
}

fn run(
    command: Commands,
    json: bool,
    config: &Config,
    sources: &ConfigSources,
) -> anyhow::Result<()> {
    let dataset = if command.needs_dataset() {
        Some(load_dataset(config, sources)?)
    } else {
        None
    };

    match (command, dataset) {
        (Commands::Info(args), _) => commands::info::cmd_info(args, json, config, sources),
        (Commands::Search(args), Some(dataset)) => {
            commands::search::cmd_search(args, json, &dataset)
        }
        (Commands::Browse(args), Some(dataset)) => {
            commands::browse::cmd_browse(args, json, &dataset)
        }
        (Commands::Analyze(args), Some(dataset)) => {
            let rt = tokio::runtime::Runtime::new()
                .context("failed to create async runtime for narrative request")?;
            rt.block_on(commands::analyze::cmd_analyze(
                args,
                json,
                &dataset,
                &config.narrative,
            ))
        }
        #[cfg(feature = "mcp")]
        (Commands::Serve(args), Some(dataset)) => {
            let rt = tokio::runtime::Runtime::new()
                .context("failed to create async runtime for MCP server")?;
            rt.block_on(commands::serve::cmd_serve(args, dataset, config.clone()))
        }
        (_, None) => anyhow::bail!("dataset was not loaded"),
    }
}

/// Load the record set named by `--dataset` or config.
///
/// A relative `dataset` from a config file resolves against that file's
/// directory.
fn load_dataset(config: &Config, sources: &ConfigSources) -> anyhow::Result<Dataset> {
    let path = config
        .resolve_dataset(sources.primary_dir())
        .ok_or(DatasetError::NotConfigured)?;
    let dataset = Dataset::load(&path, &config.columns)?;
    if dataset.is_empty() {
        tracing::warn!(path = %path, "dataset has no records");
    }
    Ok(dataset)
}

fn utf8(path: std::path::PathBuf, what: &str) -> anyhow::Result<Utf8PathBuf> {
    Utf8PathBuf::try_from(path)
        .map_err(|e| anyhow::anyhow!("{what} is not valid UTF-8: {}", e.into_path_buf().display()))
}
