//! KPI aggregation over a filtered record set.

use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::amount::{amount_or_zero, round_cents};
use crate::classify::is_approved;
use crate::record::Record;

/// Location label used when a record has no municipality.
pub const UNSPECIFIED_LOCATION: &str = "Não informado";

/// Number of locations reported in [`MetricsSummary::top_locations`].
pub const TOP_LOCATIONS: usize = 3;

/// Approval count for one location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct LocationCount {
    /// Municipality name, or [`UNSPECIFIED_LOCATION`].
    pub location: String,
    /// Approved records in this location.
    pub approved_count: usize,
}

/// Statistics over a record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSummary {
    /// Number of records considered.
    pub sample_size: usize,
    /// Records classified as approved by the aggregate rule.
    pub approved_count: usize,
    /// Approval rate with two fraction digits and a percent sign.
    pub approval_rate_percent: String,
    /// Sum of monetary values, rounded to cents.
    pub total_value: f64,
    /// Up to three locations with the most approvals.
    pub top_locations: Vec<LocationCount>,
}

/// Counters keyed by location that remember first-insertion order.
#[derive(Debug, Default)]
pub struct LocationCounter {
    index: HashMap<String, usize>,
    counts: Vec<LocationCount>,
}

impl LocationCounter {
    /// Count one approval for the record's location.
    pub fn add(&mut self, location: Option<&str>) {
        let key = location_label(location);
        if let Some(&slot) = self.index.get(key) {
            self.counts[slot].approved_count += 1;
        } else {
            self.index.insert(key.to_string(), self.counts.len());
            self.counts.push(LocationCount {
                location: key.to_string(),
                approved_count: 1,
            });
        }
    }

    /// All counters sorted by count, descending; ties keep insertion order.
    pub fn into_ranked(self) -> Vec<LocationCount> {
        let mut counts = self.counts;
        counts.sort_by(|a, b| b.approved_count.cmp(&a.approved_count));
        counts
    }
}

/// Display label for a location cell.
pub fn location_label(location: Option<&str>) -> &str {
    match location {
        Some(name) if !name.is_empty() => name,
        _ => UNSPECIFIED_LOCATION,
    }
}

/// Fold records into a [`MetricsSummary`].
#[tracing::instrument(skip_all)]
pub fn aggregate<'a, I>(records: I) -> MetricsSummary
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut sample_size = 0usize;
    let mut approved_count = 0usize;
    let mut total_value = 0.0f64;
    let mut locations = LocationCounter::default();

    for record in records {
        sample_size += 1;
        if is_approved(record) {
            approved_count += 1;
            locations.add(record.location());
        }
        total_value += amount_or_zero(record.value());
    }

    let mut top_locations = locations.into_ranked();
    top_locations.truncate(TOP_LOCATIONS);

    let summary = MetricsSummary {
        sample_size,
        approved_count,
        approval_rate_percent: approval_rate(approved_count, sample_size),
        total_value: round_cents(total_value),
        top_locations,
    };
    tracing::debug!(
        sample_size,
        approved_count,
        total_value = summary.total_value,
        "metrics aggregated"
    );
    summary
}

fn approval_rate(approved: usize, sample: usize) -> String {
    if sample == 0 {
        return "0.00%".to_string();
    }
    // Round half away from zero before formatting; `{:.2}` alone rounds ties to even.
    let rate = round_cents(approved as f64 / sample as f64 * 100.0);
    format!("{rate:.2}%")
}
