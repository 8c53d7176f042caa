//! Command implementations.

use clap::Args;
use licitacoes_core::classify::is_approved_for_display;
use licitacoes_core::metrics::location_label;
use licitacoes_core::{FilterCriteria, GeminiClient, NarrativeConfig, Record};
use owo_colors::OwoColorize;

pub mod analyze;
pub mod browse;
pub mod info;
pub mod search;
#[cfg(feature = "mcp")]
pub mod serve;

/// The two search terms shared by the query commands.
#[derive(Args, Debug, Default, Clone)]
pub struct TermArgs {
    /// Issuing body term (matches the body or its managing unit)
    #[arg(long, value_name = "TERM")]
    pub orgao: Option<String>,

    /// Procurement object term
    #[arg(long, value_name = "TERM")]
    pub objeto: Option<String>,
}

impl TermArgs {
    /// Convert to engine criteria; absent terms are blank.
    pub fn criteria(&self) -> FilterCriteria {
        FilterCriteria::new(
            self.orgao.clone().unwrap_or_default(),
            self.objeto.clone().unwrap_or_default(),
        )
    }
}

/// Build the narrative generator from config.
///
/// Returns `None` when narratives are disabled or no API key is available;
/// the analysis then reports the narrative as unavailable.
pub fn narrative_generator(config: &NarrativeConfig) -> Option<GeminiClient> {
    if !config.enabled {
        tracing::debug!("narrative disabled by configuration");
        return None;
    }
    match GeminiClient::from_config(config) {
        Ok(client) => Some(client),
        Err(err) => {
            tracing::warn!(error = %err, "narrative generator unavailable");
            None
        }
    }
}

/// One table row for text output.
pub(crate) fn print_record(record: &Record) {
    let badge = if is_approved_for_display(record) {
        format!("{}", "APPROVED".green())
    } else {
        format!("{}", "OTHER   ".dimmed())
    };
    println!(
        "{badge} {} | {} | {} | {}",
        record.organization().unwrap_or("-").bold(),
        record.object().unwrap_or("-"),
        location_label(record.location()).cyan(),
        record.value().unwrap_or("-"),
    );
    if let Some(status) = record.status() {
        println!("         {}", status.dimmed());
    }
}

/// Format an amount as Brazilian reais, e.g. `R$ 1.500,50`.
pub(crate) fn format_brl(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let units = (cents / 100).to_string();
    let mut grouped = String::with_capacity(units.len() + units.len() / 3);
    for (i, ch) in units.chars().enumerate() {
        if i > 0 && (units.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    let sign = if negative { "-" } else { "" };
    format!("{sign}R$ {grouped},{:02}", cents % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_reais() {
        assert_eq!(format_brl(0.0), "R$ 0,00");
        assert_eq!(format_brl(1500.5), "R$ 1.500,50");
        assert_eq!(format_brl(1234567.891), "R$ 1.234.567,89");
        assert_eq!(format_brl(-12.3), "-R$ 12,30");
    }

    #[test]
    fn absent_terms_are_blank() {
        let criteria = TermArgs {
            orgao: Some("exercito".to_string()),
            objeto: None,
        }
        .criteria();
        assert_eq!(criteria, FilterCriteria::new("exercito", ""));
    }

    #[test]
    fn disabled_narrative_has_no_generator() {
        let config = NarrativeConfig {
            enabled: false,
            api_key: Some("key".to_string()),
            ..NarrativeConfig::default()
        };
        assert!(narrative_generator(&config).is_none());
    }

    #[test]
    fn configured_key_builds_generator() {
        let config = NarrativeConfig {
            api_key: Some("key".to_string()),
            ..NarrativeConfig::default()
        };
        assert!(narrative_generator(&config).is_some());
    }
}
