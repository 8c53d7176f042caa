//! Serve command: MCP server on stdio.

use std::sync::Arc;

use anyhow::Context;
use clap::Args;
use licitacoes_core::config::Config;
use licitacoes_core::{Dataset, NarrativeGenerator};
use rmcp::ServiceExt;
use rmcp::transport::stdio;
use tracing::{info, instrument};

use super::narrative_generator;
use crate::server::LicitacoesServer;

/// Arguments for the `serve` subcommand.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Never request narrative reports, whatever the configuration says
    #[arg(long)]
    pub no_narrative: bool,
}

/// Serve the loaded dataset over MCP until the client disconnects.
///
/// Stdout carries the protocol, so all diagnostics go to the log.
#[instrument(name = "cmd_serve", skip_all, fields(records = dataset.len()))]
pub async fn cmd_serve(args: ServeArgs, dataset: Dataset, config: Config) -> anyhow::Result<()> {
    let generator: Option<Arc<dyn NarrativeGenerator>> = if args.no_narrative {
        None
    } else {
        narrative_generator(&config.narrative).map(|g| Arc::new(g) as Arc<dyn NarrativeGenerator>)
    };

    info!(
        dataset = dataset.source_name(),
        narrative = generator.is_some(),
        "starting MCP server on stdio"
    );
    let service = LicitacoesServer::new(dataset, generator)
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await.context("MCP server terminated")?;
    info!("MCP server stopped");
    Ok(())
}
