//! The statistics payload handed to the narrative generator and the
//! presentation layer.

use serde::Serialize;

use crate::filter::FilterCriteria;
use crate::metrics::MetricsSummary;
use crate::record::Record;

/// Number of raw records included as a sample.
pub const SAMPLE_SIZE: usize = 5;

/// Criteria, statistics and a few example records.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Payload<'a> {
    /// The search terms that produced the record set.
    pub applied_filter: &'a FilterCriteria,
    /// Statistics over the full filtered set.
    pub metrics: &'a MetricsSummary,
    /// First records of the filtered set, in order.
    pub sample: Vec<&'a Record>,
}

/// Assemble a payload from the filtered records.
pub fn build_payload<'a>(
    criteria: &'a FilterCriteria,
    summary: &'a MetricsSummary,
    records: &[&'a Record],
) -> Payload<'a> {
    Payload {
        applied_filter: criteria,
        metrics: summary,
        sample: sample(records),
    }
}

/// The first [`SAMPLE_SIZE`] records, in order.
pub fn sample<'r>(records: &[&'r Record]) -> Vec<&'r Record> {
    records.iter().take(SAMPLE_SIZE).copied().collect()
}
