//! Table-level browsing of a filtered record set.
//!
//! These helpers back the record table and charts of the dashboard: a second
//! text search over the already-filtered records, an exact municipality
//! filter, four sort orders, and the per-location and per-status counts used
//! by the charts. Row-level decisions use the display classification rule.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::amount::amount_or_zero;
use crate::classify::is_approved_for_display;
use crate::dataset::Dataset;
use crate::error::QueryError;
use crate::filter::{FilterCriteria, filter};
use crate::metrics::{LocationCount, LocationCounter, location_label};
use crate::normalize::normalize_str;
use crate::record::Record;

/// Row ordering for the record table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
pub enum SortMode {
    /// Approved rows first.
    #[default]
    Status,
    /// Highest value first.
    ValueDesc,
    /// Lowest value first.
    ValueAsc,
    /// Alphabetical by municipality.
    Municipality,
}

impl SortMode {
    /// All modes, in menu order.
    pub const ALL: [Self; 4] = [
        Self::Status,
        Self::ValueDesc,
        Self::ValueAsc,
        Self::Municipality,
    ];

    /// Returns the mode name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::ValueDesc => "value-desc",
            Self::ValueAsc => "value-asc",
            Self::Municipality => "municipality",
        }
    }
}

impl std::fmt::Display for SortMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = QueryError;

    /// Accepts the mode names plus the dashboard's Portuguese option values.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "status" => Ok(Self::Status),
            "value-desc" | "valor-desc" => Ok(Self::ValueDesc),
            "value-asc" | "valor-asc" => Ok(Self::ValueAsc),
            "municipality" | "municipio" => Ok(Self::Municipality),
            _ => Err(QueryError::UnknownSort {
                name: s.to_string(),
                available: Self::ALL
                    .iter()
                    .map(SortMode::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}

/// Table controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(default)]
pub struct TableQuery {
    /// Free text matched against body, object, status and municipality.
    pub search: String,
    /// Exact municipality label; empty for all.
    pub municipality: String,
    /// Row ordering.
    pub sort: SortMode,
}

/// Apply table search, municipality filter and ordering.
#[tracing::instrument(skip(records), fields(records = records.len()))]
pub fn apply<'a>(records: &[&'a Record], query: &TableQuery) -> Vec<&'a Record> {
    let search = normalize_str(&query.search);
    let municipality = query.municipality.trim();

    let mut rows: Vec<&Record> = records
        .iter()
        .copied()
        .filter(|record| search.is_empty() || matches_search(record, &search))
        .filter(|record| municipality.is_empty() || location_label(record.location()) == municipality)
        .collect();

    sort(&mut rows, query.sort);
    rows
}

fn matches_search(record: &Record, search: &str) -> bool {
    [
        record.organization(),
        record.object(),
        record.status(),
        record.location(),
    ]
    .into_iter()
    .flatten()
    .any(|field| normalize_str(field).contains(search))
}

/// Stable in-place sort of table rows.
pub fn sort(rows: &mut [&Record], mode: SortMode) {
    match mode {
        SortMode::Status => {
            rows.sort_by_key(|record| !is_approved_for_display(record));
        }
        SortMode::ValueDesc => {
            rows.sort_by(|a, b| compare_values(b, a));
        }
        SortMode::ValueAsc => {
            rows.sort_by(|a, b| compare_values(a, b));
        }
        SortMode::Municipality => {
            rows.sort_by(|a, b| compare_locations(a, b));
        }
    }
}

fn compare_values(a: &Record, b: &Record) -> Ordering {
    amount_or_zero(a.value()).total_cmp(&amount_or_zero(b.value()))
}

fn compare_locations(a: &Record, b: &Record) -> Ordering {
    let a = location_label(a.location());
    let b = location_label(b.location());
    normalize_str(a)
        .cmp(&normalize_str(b))
        .then_with(|| a.cmp(b))
}

/// Sorted, de-duplicated municipality labels for the filter menu.
pub fn municipality_options(records: &[&Record]) -> Vec<String> {
    let labels: BTreeSet<&str> = records
        .iter()
        .map(|record| location_label(record.location()))
        .collect();
    labels.into_iter().map(str::to_string).collect()
}

/// Display-rule approvals for every municipality, most approvals first.
pub fn location_chart(records: &[&Record]) -> Vec<LocationCount> {
    let mut counter = LocationCounter::default();
    for record in records.iter().filter(|r| is_approved_for_display(r)) {
        counter.add(record.location());
    }
    counter.into_ranked()
}

/// Approved vs. not-approved row counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusBreakdown {
    /// Rows with the approved badge.
    pub approved: usize,
    /// All other rows.
    pub not_approved: usize,
}

/// Count rows by display-rule status.
pub fn status_breakdown(records: &[&Record]) -> StatusBreakdown {
    let approved = records
        .iter()
        .filter(|r| is_approved_for_display(r))
        .count();
    StatusBreakdown {
        approved,
        not_approved: records.len() - approved,
    }
}

/// Everything the record table and its charts show.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BrowseView<'a> {
    /// Terms that selected the underlying record set.
    pub applied_filter: FilterCriteria,
    /// Table controls that were applied.
    pub query: TableQuery,
    /// Rows in the record set before table controls.
    pub filtered_count: usize,
    /// Menu options for the municipality filter.
    pub municipalities: Vec<String>,
    /// Status chart over the record set.
    pub status_breakdown: StatusBreakdown,
    /// Geographic chart over the record set.
    pub location_chart: Vec<LocationCount>,
    /// Rows after table search, municipality filter and ordering.
    pub rows: Vec<&'a Record>,
}

/// Filter the dataset, then apply the table controls.
///
/// Menu options and charts describe the filtered set, matching the
/// dashboard where they are computed before table controls.
#[tracing::instrument(skip(dataset), fields(records = dataset.len()))]
pub fn view<'a>(dataset: &'a Dataset, criteria: &FilterCriteria, query: &TableQuery) -> BrowseView<'a> {
    let filtered = filter(dataset.records(), criteria);
    let rows = apply(&filtered, query);
    tracing::debug!(filtered = filtered.len(), rows = rows.len(), "table view built");
    BrowseView {
        applied_filter: criteria.clone(),
        query: query.clone(),
        filtered_count: filtered.len(),
        municipalities: municipality_options(&filtered),
        status_breakdown: status_breakdown(&filtered),
        location_chart: location_chart(&filtered),
        rows,
    }
}
