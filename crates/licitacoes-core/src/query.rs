//! Query entry points over a [`Dataset`].
//!
//! [`search`] returns the matching records. [`prepare`] and [`analyze`] run
//! the full pipeline: filter, aggregate, build the payload and, for
//! `analyze`, ask the narrative generator once the payload is complete.

use serde::Serialize;

use crate::dataset::Dataset;
use crate::error::{NarrativeError, QueryResult};
use crate::filter::{FilterCriteria, TermPolicy, filter};
use crate::metrics::{MetricsSummary, aggregate};
use crate::narrative::{NarrativeGenerator, NarrativeOutcome, request_narrative};
use crate::payload::{self, Payload, build_payload};
use crate::record::Record;

/// Status string carried by successful responses.
pub const STATUS_SUCCESS: &str = "success";

/// Records matching a strict search.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult<'a> {
    /// Always [`STATUS_SUCCESS`].
    pub status: &'static str,
    /// Name of the dataset the records came from.
    pub data_source: String,
    /// The terms that were applied.
    pub applied_filter: FilterCriteria,
    /// Number of matching records.
    pub total_results: usize,
    /// All matching records, in dataset order.
    pub records: Vec<&'a Record>,
}

/// Filtered records with their statistics, ready for a generator.
#[derive(Debug, Clone)]
pub struct Prepared<'a> {
    /// The terms that were applied.
    pub criteria: FilterCriteria,
    /// Matching records, in dataset order.
    pub records: Vec<&'a Record>,
    /// Statistics over `records`.
    pub metrics: MetricsSummary,
}

impl<'a> Prepared<'a> {
    /// The payload handed to the narrative generator.
    pub fn payload(&self) -> Payload<'_> {
        build_payload(&self.criteria, &self.metrics, &self.records)
    }

    fn into_analysis(self, data_source: &str, narrative: NarrativeOutcome) -> Analysis<'a> {
        let sample = payload::sample(&self.records);
        Analysis {
            status: STATUS_SUCCESS,
            data_source: data_source.to_string(),
            applied_filter: self.criteria,
            metrics: self.metrics,
            narrative,
            sample,
        }
    }
}

/// Statistics plus narrative for an analysis request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analysis<'a> {
    /// Always [`STATUS_SUCCESS`]; narrative failures do not change it.
    pub status: &'static str,
    /// Name of the dataset the records came from.
    pub data_source: String,
    /// The terms that were applied.
    pub applied_filter: FilterCriteria,
    /// Statistics over every matching record.
    pub metrics: MetricsSummary,
    /// The generated report, or an error indicator.
    pub narrative: NarrativeOutcome,
    /// First matching records.
    pub sample: Vec<&'a Record>,
}

/// Return every record matching both terms.
///
/// Both terms are required; a blank term fails before any filtering.
#[tracing::instrument(skip(dataset), fields(records = dataset.len()))]
pub fn search<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> QueryResult<SearchResult<'a>> {
    TermPolicy::Strict.validate(criteria)?;
    let records = filter(dataset.records(), criteria);
    tracing::info!(total_results = records.len(), "search complete");
    Ok(SearchResult {
        status: STATUS_SUCCESS,
        data_source: dataset.source_name().to_string(),
        applied_filter: criteria.clone(),
        total_results: records.len(),
        records,
    })
}

/// Filter and aggregate. At least one term is required.
#[tracing::instrument(skip(dataset), fields(records = dataset.len()))]
pub fn prepare<'a>(dataset: &'a Dataset, criteria: &FilterCriteria) -> QueryResult<Prepared<'a>> {
    TermPolicy::Relaxed.validate(criteria)?;
    let records = filter(dataset.records(), criteria);
    let metrics = aggregate(records.iter().copied());
    Ok(Prepared {
        criteria: criteria.clone(),
        records,
        metrics,
    })
}

/// Run [`prepare`], then ask the generator for a narrative.
///
/// The generator is only called after the payload is complete, and its
/// outcome never fails the analysis. With no generator the narrative is an
/// "unavailable" indicator.
pub async fn analyze<'a, G>(
    dataset: &'a Dataset,
    criteria: &FilterCriteria,
    generator: Option<&G>,
) -> QueryResult<Analysis<'a>>
where
    G: NarrativeGenerator + ?Sized,
{
    let prepared = prepare(dataset, criteria)?;
    let narrative = match generator {
        Some(generator) => request_narrative(generator, &prepared.payload()).await,
        None => {
            tracing::debug!("no narrative generator; skipping report");
            NarrativeError::NotConfigured.into()
        }
    };
    Ok(prepared.into_analysis(dataset.source_name(), narrative))
}
