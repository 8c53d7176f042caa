//! The in-memory record set.
//!
//! A [`Dataset`] is loaded once at startup and never mutated afterwards.
//! Records live behind an `Arc`, so cloning the handle to hand it to
//! concurrent requests is cheap and needs no locking.

use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};

use crate::error::{DatasetError, DatasetResult};
use crate::record::{FieldMapping, Record};

/// Immutable, shareable handle over the loaded records.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[Record]>,
    source: Option<Utf8PathBuf>,
}

impl Dataset {
    /// Wrap an already-built record list.
    pub fn from_records(records: Vec<Record>) -> Self {
        Self {
            records: records.into(),
            source: None,
        }
    }

    /// Load a JSON array of row objects from disk.
    ///
    /// Fails loudly: a missing or malformed file is an error, never an
    /// empty dataset.
    #[tracing::instrument(skip(mapping), fields(path = %path))]
    pub fn load(path: &Utf8Path, mapping: &FieldMapping) -> DatasetResult<Self> {
        let raw = std::fs::read_to_string(path.as_std_path()).map_err(|source| {
            DatasetError::Read {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let mut dataset = Self::from_json_str(&raw, mapping).map_err(|source| {
            DatasetError::Parse {
                path: path.to_path_buf(),
                source,
            }
        })?;
        dataset.source = Some(path.to_path_buf());
        tracing::info!(records = dataset.len(), path = %path, "dataset loaded");
        Ok(dataset)
    }

    /// Parse a JSON array of row objects.
    pub fn from_json_str(raw: &str, mapping: &FieldMapping) -> Result<Self, serde_json::Error> {
        let rows: Vec<Map<String, Value>> = serde_json::from_str(raw)?;
        let records = rows
            .into_iter()
            .map(|row| Record::from_fields(row, mapping))
            .collect::<Vec<_>>();
        Ok(Self::from_records(records))
    }

    /// All records, in source order.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Number of loaded records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Path the dataset was loaded from, if any.
    pub fn source(&self) -> Option<&Utf8Path> {
        self.source.as_deref()
    }

    /// File name of the source, used to label responses.
    pub fn source_name(&self) -> &str {
        self.source
            .as_deref()
            .and_then(Utf8Path::file_name)
            .unwrap_or("in-memory")
    }
}
