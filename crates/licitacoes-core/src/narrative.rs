//! Narrative report contract.
//!
//! The engine never writes prose. It hands a [`Payload`] to a
//! [`NarrativeGenerator`] (an external text-generation service) and folds
//! whatever comes back into a [`NarrativeOutcome`]. Any failure on that side
//! becomes an error indicator in the response; the statistics are returned
//! regardless.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{NarrativeError, NarrativeResult};
use crate::payload::Payload;

/// Characters of an unparsable response kept for diagnosis.
pub const RAW_PREFIX_CHARS: usize = 100;

/// Role and output contract given to the generator.
pub const SYSTEM_INSTRUCTION: &str = "You are a senior business intelligence analyst \
specialized in Brazilian public procurement (licitações). Analyze the JSON you are given \
and return a structured analysis. The response MUST be a valid JSON object that follows \
the provided schema, never free text or Markdown. Write the analysis in Brazilian Portuguese.";

/// The four sections requested from the generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NarrativeReport {
    /// Headline KPIs: sample size, total value, approval rate.
    pub executive_summary: String,
    /// Interpretation of the approval rate.
    pub performance_analysis: String,
    /// Distribution of approvals across the top locations.
    pub geographic_focus: String,
    /// Three concrete recommended actions.
    pub recommended_actions: Vec<String>,
}

/// Stand-in for the report when the generator failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NarrativeFailure {
    /// What went wrong.
    pub error: String,
    /// Start of the raw response, when it could not be parsed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_prefix: Option<String>,
}

/// Result of asking for a narrative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum NarrativeOutcome {
    /// A well-formed report.
    Report(NarrativeReport),
    /// An error indicator.
    Failed(NarrativeFailure),
}

impl NarrativeOutcome {
    /// Error indicator with a message only.
    pub fn failed(error: impl Into<String>) -> Self {
        Self::Failed(NarrativeFailure {
            error: error.into(),
            raw_prefix: None,
        })
    }

    /// Whether a report was produced.
    pub const fn is_report(&self) -> bool {
        matches!(self, Self::Report(_))
    }
}

impl From<NarrativeError> for NarrativeOutcome {
    fn from(err: NarrativeError) -> Self {
        Self::failed(err.to_string())
    }
}

/// An external service that turns a payload into narrative JSON text.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Request a narrative for the payload, returning the raw response text.
    async fn generate(&self, payload: &Payload<'_>) -> NarrativeResult<String>;
}

/// Ask a generator for a narrative, folding every failure into the outcome.
#[tracing::instrument(skip_all, fields(generator = generator.name()))]
pub async fn request_narrative<G>(generator: &G, payload: &Payload<'_>) -> NarrativeOutcome
where
    G: NarrativeGenerator + ?Sized,
{
    match generator.generate(payload).await {
        Ok(raw) => {
            let outcome = parse_narrative(&raw);
            if outcome.is_report() {
                tracing::info!("narrative generated");
            } else {
                tracing::warn!("narrative response was not a valid report");
            }
            outcome
        }
        Err(err) => {
            tracing::error!(error = %err, "narrative generation failed");
            err.into()
        }
    }
}

/// Interpret the generator's raw response.
///
/// A JSON object with the four sections is a report. A JSON object carrying
/// an `error` field is passed through as an error indicator. Anything else
/// becomes an error indicator holding the start of the raw text.
pub fn parse_narrative(raw: &str) -> NarrativeOutcome {
    if let Ok(report) = serde_json::from_str::<NarrativeReport>(raw) {
        return NarrativeOutcome::Report(report);
    }

    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(raw)
        && let Some(error) = map.get("error").and_then(Value::as_str)
    {
        return NarrativeOutcome::failed(error);
    }

    NarrativeOutcome::Failed(NarrativeFailure {
        error: "narrative response is not a valid JSON report".to_string(),
        raw_prefix: Some(raw.chars().take(RAW_PREFIX_CHARS).collect()),
    })
}

/// User prompt embedding the pretty-printed payload.
pub fn build_prompt(payload: &Payload<'_>) -> NarrativeResult<String> {
    let data = serde_json::to_string_pretty(payload)?;
    Ok(format!(
        "Produce a concise, professional BI analysis of the procurement data below.\n\
         \n\
         Fill in the fields of the JSON response object:\n\
         1. executive_summary: highlight the main KPIs (sample size, total value, approval rate).\n\
         2. performance_analysis: interpret the approval rate (e.g. \"16.67% is low, pointing to bottlenecks\").\n\
         3. geographic_focus: analyze how approvals are distributed across the top 3 municipalities.\n\
         4. recommended_actions: list 3 practical, specific actions.\n\
         \n\
         Analysis data (JSON):\n\
         {data}\n"
    ))
}

/// JSON schema the generator must follow, in OpenAPI-subset form.
pub fn response_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "executive_summary": {
                "type": "string",
                "description": "Concise executive summary of the main KPIs."
            },
            "performance_analysis": {
                "type": "string",
                "description": "Interpretation of the approval rate and what it implies."
            },
            "geographic_focus": {
                "type": "string",
                "description": "Distribution of approvals across the top municipalities."
            },
            "recommended_actions": {
                "type": "array",
                "description": "Three strategic, actionable recommendations.",
                "items": { "type": "string" }
            }
        },
        "required": [
            "executive_summary",
            "performance_analysis",
            "geographic_focus",
            "recommended_actions"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterCriteria;
    use crate::metrics::aggregate;
    use crate::payload::build_payload;
    use crate::record::Record;

    const REPORT: &str = r#"{
        "executive_summary": "Amostra de 2 licitações.",
        "performance_analysis": "50% é moderada.",
        "geographic_focus": "Recife concentra as aprovações.",
        "recommended_actions": ["A", "B", "C"]
    }"#;

    struct Canned(Option<String>);

    #[async_trait]
    impl NarrativeGenerator for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, _payload: &Payload<'_>) -> NarrativeResult<String> {
            self.0
                .clone()
                .ok_or_else(|| NarrativeError::Transport("connection refused".to_string()))
        }
    }

    fn with_payload<T>(f: impl FnOnce(&Payload<'_>) -> T) -> T {
        let records = vec![Record::builder().status("HOMOLOGADO").build()];
        let refs: Vec<&Record> = records.iter().collect();
        let criteria = FilterCriteria::new("", "");
        let summary = aggregate(refs.iter().copied());
        let payload = build_payload(&criteria, &summary, &refs);
        f(&payload)
    }

    #[test]
    fn parses_valid_report() {
        let outcome = parse_narrative(REPORT);
        let NarrativeOutcome::Report(report) = outcome else {
            panic!("expected report");
        };
        assert_eq!(report.recommended_actions.len(), 3);
    }

    #[test]
    fn error_object_passes_through() {
        let outcome = parse_narrative(r#"{"error": "quota exceeded"}"#);
        assert_eq!(outcome, NarrativeOutcome::failed("quota exceeded"));
    }

    #[test]
    fn garbage_keeps_raw_prefix() {
        let raw = "x".repeat(250);
        let NarrativeOutcome::Failed(failure) = parse_narrative(&raw) else {
            panic!("expected failure");
        };
        assert_eq!(failure.raw_prefix.unwrap().len(), RAW_PREFIX_CHARS);
    }

    #[test]
    fn missing_section_is_not_a_report() {
        let outcome = parse_narrative(r#"{"executive_summary": "só isso"}"#);
        assert!(!outcome.is_report());
    }

    #[test]
    fn failure_serializes_as_error_indicator() {
        let json = serde_json::to_value(NarrativeOutcome::failed("boom")).unwrap();
        assert_eq!(json, json!({ "error": "boom" }));
    }

    #[test]
    fn prompt_embeds_payload() {
        let prompt = with_payload(|payload| build_prompt(payload).unwrap());
        assert!(prompt.contains("\"approvalRatePercent\": \"100.00%\""));
        assert!(prompt.contains("recommended_actions"));
    }

    #[test]
    fn schema_requires_all_sections() {
        let schema = response_schema();
        assert_eq!(schema["required"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn generator_failure_becomes_indicator() {
        let records = vec![Record::builder().build()];
        let refs: Vec<&Record> = records.iter().collect();
        let criteria = FilterCriteria::default();
        let summary = aggregate(refs.iter().copied());
        let payload = build_payload(&criteria, &summary, &refs);

        let failing = Canned(None);
        let outcome = request_narrative(&failing, &payload).await;
        let NarrativeOutcome::Failed(failure) = outcome else {
            panic!("expected failure");
        };
        assert!(failure.error.contains("connection refused"));

        let working = Canned(Some(REPORT.to_string()));
        assert!(request_narrative(&working, &payload).await.is_report());
    }
}
