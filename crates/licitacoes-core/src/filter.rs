//! Record filtering by issuing body and object.
//!
//! The filter itself is permissive: an empty term matches every record, so a
//! query with only one term degrades to a one-field filter. Whether a query
//! may omit terms is decided beforehand by a [`TermPolicy`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{QueryError, QueryResult};
use crate::normalize::normalize_str;
use crate::record::Record;

/// The two free-text search terms of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct FilterCriteria {
    /// Matched against the body name and the managing unit name.
    pub organization_term: String,
    /// Matched against the object text.
    pub object_term: String,
}

impl FilterCriteria {
    /// Create criteria from the two terms.
    pub fn new(organization_term: impl Into<String>, object_term: impl Into<String>) -> Self {
        Self {
            organization_term: organization_term.into(),
            object_term: object_term.into(),
        }
    }

    fn has_organization(&self) -> bool {
        !self.organization_term.trim().is_empty()
    }

    fn has_object(&self) -> bool {
        !self.object_term.trim().is_empty()
    }
}

/// Which terms a caller insists on before running the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TermPolicy {
    /// At least one term must be non-blank (analysis path).
    Relaxed,
    /// Both terms must be non-blank (search path).
    Strict,
}

impl TermPolicy {
    /// Check the criteria against this policy.
    pub fn validate(self, criteria: &FilterCriteria) -> QueryResult<()> {
        match self {
            Self::Relaxed if !criteria.has_organization() && !criteria.has_object() => {
                Err(QueryError::NoTerms)
            }
            Self::Strict if !criteria.has_organization() || !criteria.has_object() => {
                Err(QueryError::MissingTerms)
            }
            _ => Ok(()),
        }
    }
}

/// Select the records matching both terms, preserving input order.
#[tracing::instrument(skip(records), fields(records = records.len()))]
pub fn filter<'a>(records: &'a [Record], criteria: &FilterCriteria) -> Vec<&'a Record> {
    let organization_term = normalize_str(&criteria.organization_term);
    let object_term = normalize_str(&criteria.object_term);

    let matched: Vec<&Record> = records
        .iter()
        .filter(|record| matches(record, &organization_term, &object_term))
        .collect();

    tracing::debug!(matched = matched.len(), "filter applied");
    matched
}

/// Match a record against already-normalized terms.
fn matches(record: &Record, organization_term: &str, object_term: &str) -> bool {
    let contains = |field: Option<&str>, term: &str| {
        term.is_empty() || field.is_some_and(|value| normalize_str(value).contains(term))
    };

    let organization_match = contains(record.organization(), organization_term)
        || contains(record.unit(), organization_term);

    organization_match && contains(record.object(), object_term)
}
