//! Analyze command: KPIs for the matching records plus a narrative report.

use std::time::Duration;

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use licitacoes_core::narrative::NarrativeOutcome;
use licitacoes_core::query::{self, Analysis};
use licitacoes_core::{Dataset, NarrativeConfig};
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use super::{TermArgs, format_brl, narrative_generator, print_record};

/// Arguments for the `analyze` subcommand.
#[derive(Args, Debug, Default)]
pub struct AnalyzeArgs {
    /// Search terms; at least one is required.
    #[command(flatten)]
    pub terms: TermArgs,

    /// Skip the narrative request and report statistics only
    #[arg(long)]
    pub no_narrative: bool,
}

/// Compute statistics for the matching records and request a narrative.
///
/// A narrative failure never fails the command: it shows up as an error
/// indicator next to the statistics.
#[instrument(name = "cmd_analyze", skip_all)]
pub async fn cmd_analyze(
    args: AnalyzeArgs,
    global_json: bool,
    dataset: &Dataset,
    narrative: &NarrativeConfig,
) -> anyhow::Result<()> {
    debug!(terms = ?args.terms, no_narrative = args.no_narrative, "executing analyze command");

    let generator = if args.no_narrative {
        None
    } else {
        narrative_generator(narrative)
    };

    let spinner = (!global_json && generator.is_some()).then(|| {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(format!("requesting narrative from {}", narrative.model));
        bar.enable_steady_tick(Duration::from_millis(120));
        bar
    });

    let result = query::analyze(dataset, &args.terms.criteria(), generator.as_ref()).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }
    let analysis = result?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
    } else {
        print_analysis(&analysis);
    }
    Ok(())
}

fn print_analysis(analysis: &Analysis<'_>) {
    let metrics = &analysis.metrics;
    println!("{}", "Metrics".bold().underline());
    println!("{}: {}", "Sample size".dimmed(), metrics.sample_size);
    println!("{}: {}", "Approved".dimmed(), metrics.approved_count);
    println!(
        "{}: {}",
        "Approval rate".dimmed(),
        metrics.approval_rate_percent.green()
    );
    println!(
        "{}: {}",
        "Total value".dimmed(),
        format_brl(metrics.total_value)
    );
    if metrics.top_locations.is_empty() {
        println!("{}: {}", "Top locations".dimmed(), "none".yellow());
    } else {
        println!("{}:", "Top locations".dimmed());
        for entry in &metrics.top_locations {
            println!("  {} ({})", entry.location.cyan(), entry.approved_count);
        }
    }

    println!();
    println!("{}", "Narrative".bold().underline());
    match &analysis.narrative {
        NarrativeOutcome::Report(report) => {
            println!("{}\n{}\n", "Executive summary".bold(), report.executive_summary);
            println!(
                "{}\n{}\n",
                "Performance".bold(),
                report.performance_analysis
            );
            println!("{}\n{}\n", "Geographic focus".bold(), report.geographic_focus);
            println!("{}", "Recommended actions".bold());
            for (i, action) in report.recommended_actions.iter().enumerate() {
                println!("  {}. {action}", i + 1);
            }
        }
        NarrativeOutcome::Failed(failure) => {
            println!("{} {}", "unavailable:".yellow(), failure.error);
            if let Some(ref raw) = failure.raw_prefix {
                println!("{} {raw}", "raw:".dimmed());
            }
        }
    }

    if !analysis.sample.is_empty() {
        println!();
        println!("{}", "Sample".bold().underline());
        for record in &analysis.sample {
            print_record(record);
        }
    }
}
