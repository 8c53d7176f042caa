//! Success classification of procurement records.
//!
//! Two predicates share the same status vocabularies but answer different
//! questions:
//!
//! - [`is_approved`] feeds the aggregate statistics. A record with a result
//!   date counts as concluded unless its status names a failure.
//! - [`is_approved_for_display`] drives per-row status badges and the
//!   dashboard charts. It ignores the result date and requires an explicit
//!   success term.
//!
//! The two disagree for records that have a result date but a neutral
//! status; both behaviors are kept.

use std::sync::LazyLock;

use aho_corasick::AhoCorasick;
use serde::Serialize;

use crate::normalize::normalize;
use crate::record::Record;

/// Status fragments meaning the procurement concluded positively.
pub const APPROVED_TERMS: &[&str] = &[
    "HOMOLOGADO",
    "CONTRATADO",
    "ADJUDICADO",
    "EVENTO DE RESULTADO",
    "ENCERRADO",
];

/// Status fragments meaning the procurement failed, was voided or suspended.
pub const FAILURE_TERMS: &[&str] = &["CANCELADO", "FRACASSADO", "SUSPENSA", "DESERTA"];

static APPROVED_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::new(APPROVED_TERMS.iter().map(|t| normalize(Some(t)))).expect("valid patterns")
});

static FAILURE_MATCHER: LazyLock<AhoCorasick> = LazyLock::new(|| {
    AhoCorasick::new(FAILURE_TERMS.iter().map(|t| normalize(Some(t)))).expect("valid patterns")
});

/// The individual signals behind a classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusSignals {
    /// Normalized status contains an approved term.
    pub success: bool,
    /// Normalized status contains a failure term.
    pub failure: bool,
    /// Result date present and non-blank.
    pub has_result_date: bool,
}

impl StatusSignals {
    /// Compute the signals for a record.
    pub fn of(record: &Record) -> Self {
        let status = normalize(record.status());
        Self {
            success: APPROVED_MATCHER.is_match(&status),
            failure: FAILURE_MATCHER.is_match(&status),
            has_result_date: record.result_date().is_some_and(|d| !d.trim().is_empty()),
        }
    }

    /// Aggregate rule: success term, or a result date without a failure term.
    pub const fn approved(self) -> bool {
        self.success || (self.has_result_date && !self.failure)
    }

    /// Display rule: success term and no failure term.
    pub const fn approved_for_display(self) -> bool {
        self.success && !self.failure
    }
}

/// Whether a record counts as approved in aggregate statistics.
pub fn is_approved(record: &Record) -> bool {
    StatusSignals::of(record).approved()
}

/// Whether a record gets the "approved" badge in row-level display.
pub fn is_approved_for_display(record: &Record) -> bool {
    StatusSignals::of(record).approved_for_display()
}
