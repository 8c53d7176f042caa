//! Browse command: the record table with its controls and chart counts.

use clap::Args;
use licitacoes_core::browse::{self, BrowseView};
use licitacoes_core::{Dataset, SortMode, TableQuery};
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use super::{TermArgs, print_record};

/// Arguments for the `browse` subcommand.
#[derive(Args, Debug, Default)]
pub struct BrowseArgs {
    /// Terms selecting the record set; both may be omitted.
    #[command(flatten)]
    pub terms: TermArgs,

    /// Free-text search over body, object, status and municipality
    #[arg(long, value_name = "TEXT", default_value = "")]
    pub search: String,

    /// Show only this municipality (exact label)
    #[arg(long, value_name = "NAME", default_value = "")]
    pub municipio: String,

    /// Row ordering
    #[arg(long, value_enum, default_value_t)]
    pub sort: SortMode,

    /// Print at most N rows (text output only)
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

/// Show the filtered record table.
#[instrument(name = "cmd_browse", skip_all)]
pub fn cmd_browse(args: BrowseArgs, global_json: bool, dataset: &Dataset) -> anyhow::Result<()> {
    debug!(terms = ?args.terms, sort = %args.sort, "executing browse command");

    let query = TableQuery {
        search: args.search,
        municipality: args.municipio,
        sort: args.sort,
    };
    let view = browse::view(dataset, &args.terms.criteria(), &query);

    if global_json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view, args.limit);
    }
    Ok(())
}

fn print_view(view: &BrowseView<'_>, limit: Option<usize>) {
    let shown = limit.unwrap_or(view.rows.len()).min(view.rows.len());
    for record in &view.rows[..shown] {
        print_record(record);
    }
    if shown < view.rows.len() {
        println!("{}", format!("... {} more", view.rows.len() - shown).dimmed());
    }

    println!();
    println!(
        "{} of {} rows (sorted by {})",
        view.rows.len().bold(),
        view.filtered_count,
        view.query.sort
    );
    println!(
        "{}: {} approved, {} other",
        "Status".dimmed(),
        view.status_breakdown.approved.green(),
        view.status_breakdown.not_approved
    );
    if !view.location_chart.is_empty() {
        println!("{}:", "Approvals by municipality".dimmed());
        for entry in &view.location_chart {
            println!("  {} {}", entry.location.cyan(), entry.approved_count);
        }
    }
}
