//! Info command implementation

use clap::Args;
use licitacoes_core::FieldMapping;
use licitacoes_core::config::{Config, ConfigSources};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{debug, instrument};

/// Arguments for the `info` subcommand.
#[derive(Args, Debug, Default)]
pub struct InfoArgs {
    // No subcommand-specific arguments; uses global --json flag
}

#[derive(Serialize)]
struct PackageInfo {
    name: &'static str,
    version: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    description: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    repository: &'static str,
    #[serde(skip_serializing_if = "str::is_empty")]
    license: &'static str,
}

impl PackageInfo {
    const fn new() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME"),
            version: env!("CARGO_PKG_VERSION"),
            description: env!("CARGO_PKG_DESCRIPTION"),
            repository: env!("CARGO_PKG_REPOSITORY"),
            license: env!("CARGO_PKG_LICENSE"),
        }
    }
}

#[derive(Serialize)]
struct NarrativeInfo {
    enabled: bool,
    model: String,
    endpoint: String,
    api_key_configured: bool,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ConfigInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    config_file: Option<String>,
    log_level: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    log_dir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dataset: Option<String>,
    columns: FieldMapping,
    narrative: NarrativeInfo,
}

impl ConfigInfo {
    fn from_config(config: &Config, sources: &ConfigSources) -> Self {
        let narrative = &config.narrative;
        Self {
            config_file: sources.primary_file().map(|p| p.to_string()),
            log_level: config.log_level.as_str().to_string(),
            log_dir: config.log_dir.as_ref().map(|p| p.to_string()),
            dataset: config
                .resolve_dataset(sources.primary_dir())
                .map(|p| p.to_string()),
            columns: config.columns.clone(),
            narrative: NarrativeInfo {
                enabled: narrative.enabled,
                model: narrative.model.clone(),
                endpoint: narrative.endpoint.clone(),
                api_key_configured: narrative.resolved_api_key().is_some(),
                timeout_secs: narrative.timeout_secs,
            },
        }
    }
}

#[derive(Serialize)]
struct FullInfo {
    #[serde(flatten)]
    package: PackageInfo,
    config: ConfigInfo,
}

/// Print package and configuration information.
#[instrument(name = "cmd_info", skip_all, fields(json_output))]
pub fn cmd_info(
    _args: InfoArgs,
    global_json: bool,
    config: &Config,
    sources: &ConfigSources,
) -> anyhow::Result<()> {
    debug!(json_output = global_json, "executing info command");

    let full_info = FullInfo {
        package: PackageInfo::new(),
        config: ConfigInfo::from_config(config, sources),
    };

    if global_json {
        println!("{}", serde_json::to_string_pretty(&full_info)?);
        return Ok(());
    }

    let package = &full_info.package;
    println!("{} {}", package.name.bold(), package.version.green());
    if !package.description.is_empty() {
        println!("{}", package.description);
    }
    if !package.license.is_empty() {
        println!("{}: {}", "License".dimmed(), package.license);
    }
    if !package.repository.is_empty() {
        println!("{}: {}", "Repository".dimmed(), package.repository.cyan());
    }

    let info = &full_info.config;
    println!();
    println!("{}", "Configuration".bold().underline());
    match info.config_file {
        Some(ref path) => println!("{}: {}", "Config file".dimmed(), path.cyan()),
        None => println!("{}: {}", "Config file".dimmed(), "none loaded".yellow()),
    }
    println!("{}: {}", "Log level".dimmed(), info.log_level);
    if let Some(ref dir) = info.log_dir {
        println!("{}: {}", "Log directory".dimmed(), dir);
    }
    match info.dataset {
        Some(ref path) => println!("{}: {}", "Dataset".dimmed(), path.cyan()),
        None => println!("{}: {}", "Dataset".dimmed(), "(not set)".yellow()),
    }

    println!();
    println!("{}", "Columns".bold().underline());
    let columns = &info.columns;
    for (label, column) in [
        ("Organization", &columns.organization),
        ("Unit", &columns.unit),
        ("Object", &columns.object),
        ("Status", &columns.status),
        ("Value", &columns.value),
        ("Location", &columns.location),
        ("Result date", &columns.result_date),
    ] {
        println!("{}: {}", label.dimmed(), column);
    }

    println!();
    println!("{}", "Narrative".bold().underline());
    let narrative = &info.narrative;
    println!("{}: {}", "Enabled".dimmed(), narrative.enabled);
    println!("{}: {}", "Model".dimmed(), narrative.model);
    println!("{}: {}", "Endpoint".dimmed(), narrative.endpoint);
    let key_state = if narrative.api_key_configured {
        format!("{}", "configured".green())
    } else {
        format!("{}", "missing".yellow())
    };
    println!("{}: {}", "API key".dimmed(), key_state);
    println!("{}: {}s", "Timeout".dimmed(), narrative.timeout_secs);

    Ok(())
}
