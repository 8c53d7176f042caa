//! Search command: every record matching both terms.

use clap::Args;
use licitacoes_core::{Dataset, query};
use owo_colors::OwoColorize;
use tracing::{debug, instrument};

use super::{TermArgs, print_record};

/// Arguments for the `search` subcommand.
#[derive(Args, Debug, Default)]
pub struct SearchArgs {
    /// Search terms; both are required.
    #[command(flatten)]
    pub terms: TermArgs,

    /// Print at most N records (text output only)
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,
}

/// List every record whose body and object match the two terms.
#[instrument(name = "cmd_search", skip_all)]
pub fn cmd_search(args: SearchArgs, global_json: bool, dataset: &Dataset) -> anyhow::Result<()> {
    debug!(terms = ?args.terms, limit = ?args.limit, "executing search command");

    let result = query::search(dataset, &args.terms.criteria())?;

    if global_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!(
        "{} records match {} / {} in {}",
        result.total_results.bold(),
        result.applied_filter.organization_term.cyan(),
        result.applied_filter.object_term.cyan(),
        result.data_source,
    );
    let shown = args.limit.unwrap_or(result.records.len());
    for record in result.records.iter().take(shown) {
        print_record(record);
    }
    if shown < result.records.len() {
        println!(
            "{}",
            format!("... {} more", result.records.len() - shown).dimmed()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use licitacoes_core::FieldMapping;

    fn dataset() -> Dataset {
        Dataset::from_json_str(
            r#"[{"Nome Órgão": "EXERCITO", "Objeto": "ESCRITORIO", "Situação Licitação": "HOMOLOGADO"}]"#,
            &FieldMapping::default(),
        )
        .unwrap()
    }

    fn args(orgao: Option<&str>, objeto: Option<&str>) -> SearchArgs {
        SearchArgs {
            terms: TermArgs {
                orgao: orgao.map(str::to_string),
                objeto: objeto.map(str::to_string),
            },
            limit: None,
        }
    }

    #[test]
    fn search_text_succeeds() {
        assert!(cmd_search(args(Some("exercito"), Some("escritorio")), false, &dataset()).is_ok());
    }

    #[test]
    fn search_json_succeeds() {
        assert!(cmd_search(args(Some("exercito"), Some("escritorio")), true, &dataset()).is_ok());
    }

    #[test]
    fn search_without_object_fails() {
        let err = cmd_search(args(Some("exercito"), None), false, &dataset()).unwrap_err();
        assert!(err.to_string().contains("missing search terms"));
    }
}
