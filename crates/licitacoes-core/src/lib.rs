//! Core library for licitacoes.
//!
//! A filter-and-metrics engine over public procurement records: load a JSON
//! record set once, select records by issuing body and object, classify
//! them as approved or not, and aggregate the KPI set handed to a narrative
//! generator and to the presentation layer.
//!
//! # Modules
//!
//! - [`normalize`] - Case and diacritic folding for text matching
//! - [`record`] - Typed records and the column mapping used at ingestion
//! - [`dataset`] - Immutable, shareable record set
//! - [`filter`] - Two-term substring filter and term policies
//! - [`classify`] - Approved/not-approved classification rules
//! - [`amount`] - Lenient Brazilian monetary parsing
//! - [`metrics`] - KPI aggregation
//! - [`payload`] - Statistics payload for the narrative generator
//! - [`browse`] - Table search, sorting and chart counts
//! - [`narrative`] - Narrative generator contract and response parsing
//! - [`query`] - `search`, `prepare` and `analyze` entry points
//! - [`config`] - Configuration loading and management
//! - [`error`] - Error types and result aliases
//!
//! # Quick Start
//!
//! ```no_run
//! use camino::Utf8Path;
//! use licitacoes_core::{Dataset, FieldMapping, FilterCriteria, query};
//!
//! let dataset = Dataset::load(Utf8Path::new("licitacoes_master.json"), &FieldMapping::default())
//!     .expect("dataset should load");
//! let prepared = query::prepare(&dataset, &FilterCriteria::new("exercito", "escritorio"))
//!     .expect("at least one term");
//! println!("approval rate: {}", prepared.metrics.approval_rate_percent);
//! ```
#![deny(unsafe_code)]

pub mod amount;
pub mod browse;
pub mod classify;
pub mod config;
pub mod dataset;
pub mod error;
pub mod filter;
#[cfg(feature = "gemini")]
pub mod gemini;
pub mod metrics;
pub mod narrative;
pub mod normalize;
pub mod payload;
pub mod query;
pub mod record;

pub use browse::{BrowseView, SortMode, TableQuery};
pub use config::{Config, ConfigLoader, ConfigSources, LogLevel, NarrativeConfig};
pub use dataset::Dataset;
pub use error::{
    ConfigError, ConfigResult, DatasetError, DatasetResult, NarrativeError, NarrativeResult,
    QueryError, QueryResult,
};
pub use filter::{FilterCriteria, TermPolicy};
#[cfg(feature = "gemini")]
pub use gemini::GeminiClient;
pub use metrics::{LocationCount, MetricsSummary};
pub use narrative::{NarrativeGenerator, NarrativeOutcome, NarrativeReport};
pub use normalize::normalize;
pub use query::{Analysis, Prepared, SearchResult};
pub use record::{FieldMapping, Record};
