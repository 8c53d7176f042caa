//! Typed procurement records and the column mapping that produces them.
//!
//! Source rows arrive as loosely-typed JSON objects keyed by the column
//! headers of the government CSV export. [`FieldMapping`] names the columns
//! the engine reads, and [`Record::from_fields`] resolves them once at load
//! time so the rest of the engine works with named accessors instead of raw
//! string keys.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Column names for the fields the engine reads.
///
/// Defaults match the headers of the Portal da Transparência "Licitações"
/// export. Override individual columns under `[columns]` in the config file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq, JsonSchema)]
#[serde(default)]
pub struct FieldMapping {
    /// Issuing body name.
    pub organization: String,
    /// Managing unit (UG) name, an alternate match target for the body filter.
    pub unit: String,
    /// Object/description of the procurement.
    pub object: String,
    /// Free-form status text.
    pub status: String,
    /// Monetary value with a decimal comma.
    pub value: String,
    /// Municipality.
    pub location: String,
    /// Result date; only its presence matters.
    pub result_date: String,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            organization: "Nome Órgão".to_string(),
            unit: "Nome UG".to_string(),
            object: "Objeto".to_string(),
            status: "Situação Licitação".to_string(),
            value: "Valor Licitação".to_string(),
            location: "Município".to_string(),
            result_date: "Data Resultado Compra".to_string(),
        }
    }
}

/// One procurement record.
///
/// Holds the typed fields the engine reads plus the complete source row.
/// Serializes as the source row so downstream consumers receive the
/// original column names and values.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    organization: Option<String>,
    unit: Option<String>,
    object: Option<String>,
    status: Option<String>,
    value: Option<String>,
    location: Option<String>,
    result_date: Option<String>,
    fields: Map<String, Value>,
}

impl Record {
    /// Build a record from a raw source row.
    pub fn from_fields(fields: Map<String, Value>, mapping: &FieldMapping) -> Self {
        let get = |column: &str| fields.get(column).and_then(value_as_string);
        Self {
            organization: get(&mapping.organization),
            unit: get(&mapping.unit),
            object: get(&mapping.object),
            status: get(&mapping.status),
            value: get(&mapping.value),
            location: get(&mapping.location),
            result_date: get(&mapping.result_date),
            fields,
        }
    }

    /// Start building a record with the default column mapping.
    pub fn builder() -> RecordBuilder {
        RecordBuilder::default()
    }

    /// Issuing body name.
    pub fn organization(&self) -> Option<&str> {
        self.organization.as_deref()
    }

    /// Managing unit name.
    pub fn unit(&self) -> Option<&str> {
        self.unit.as_deref()
    }

    /// Object/description text.
    pub fn object(&self) -> Option<&str> {
        self.object.as_deref()
    }

    /// Status text.
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// Raw monetary value.
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Municipality.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// Result date text.
    pub fn result_date(&self) -> Option<&str> {
        self.result_date.as_deref()
    }

    /// The full source row, in source column order.
    pub const fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

impl Serialize for Record {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.fields.serialize(serializer)
    }
}

/// Convert a JSON cell to the string the engine reads.
///
/// Converted CSVs only contain strings, but numbers and booleans are
/// accepted for hand-written datasets. `null` counts as absent.
fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Builder for synthetic records.
///
/// Writes each field into the source row under the column name from its
/// [`FieldMapping`], so a built record serializes like a loaded one.
#[derive(Debug, Default)]
pub struct RecordBuilder {
    mapping: FieldMapping,
    fields: Map<String, Value>,
}

impl RecordBuilder {
    /// Use a custom column mapping.
    pub fn with_mapping(mut self, mapping: FieldMapping) -> Self {
        self.mapping = mapping;
        self
    }

    fn set(mut self, column: String, value: impl Into<String>) -> Self {
        self.fields.insert(column, Value::String(value.into()));
        self
    }

    /// Set the issuing body name.
    pub fn organization(self, value: impl Into<String>) -> Self {
        let column = self.mapping.organization.clone();
        self.set(column, value)
    }

    /// Set the managing unit name.
    pub fn unit(self, value: impl Into<String>) -> Self {
        let column = self.mapping.unit.clone();
        self.set(column, value)
    }

    /// Set the object text.
    pub fn object(self, value: impl Into<String>) -> Self {
        let column = self.mapping.object.clone();
        self.set(column, value)
    }

    /// Set the status text.
    pub fn status(self, value: impl Into<String>) -> Self {
        let column = self.mapping.status.clone();
        self.set(column, value)
    }

    /// Set the raw monetary value.
    pub fn value(self, value: impl Into<String>) -> Self {
        let column = self.mapping.value.clone();
        self.set(column, value)
    }

    /// Set the municipality.
    pub fn location(self, value: impl Into<String>) -> Self {
        let column = self.mapping.location.clone();
        self.set(column, value)
    }

    /// Set the result date.
    pub fn result_date(self, value: impl Into<String>) -> Self {
        let column = self.mapping.result_date.clone();
        self.set(column, value)
    }

    /// Set an arbitrary extra column.
    pub fn field(self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(column.into(), value)
    }

    /// Finish the record.
    pub fn build(self) -> Record {
        Record::from_fields(self.fields, &self.mapping)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn maps_default_columns() {
        let record = Record::from_fields(
            row(json!({
                "Nome Órgão": "Comando do Exército",
                "Nome UG": "Base Administrativa",
                "Objeto": "Material de escritório",
                "Situação Licitação": "HOMOLOGADO",
                "Valor Licitação": "1500,50",
                "Município": "Recife",
                "Data Resultado Compra": "10/01/2024",
            })),
            &FieldMapping::default(),
        );

        assert_eq!(record.organization(), Some("Comando do Exército"));
        assert_eq!(record.unit(), Some("Base Administrativa"));
        assert_eq!(record.object(), Some("Material de escritório"));
        assert_eq!(record.status(), Some("HOMOLOGADO"));
        assert_eq!(record.value(), Some("1500,50"));
        assert_eq!(record.location(), Some("Recife"));
        assert_eq!(record.result_date(), Some("10/01/2024"));
    }

    #[test]
    fn missing_and_null_columns_are_absent() {
        let record = Record::from_fields(
            row(json!({ "Objeto": "Papel", "Município": null })),
            &FieldMapping::default(),
        );
        assert_eq!(record.object(), Some("Papel"));
        assert!(record.location().is_none());
        assert!(record.organization().is_none());
    }

    #[test]
    fn numeric_cells_become_strings() {
        let record = Record::from_fields(
            row(json!({ "Valor Licitação": 250.5 })),
            &FieldMapping::default(),
        );
        assert_eq!(record.value(), Some("250.5"));
    }

    #[test]
    fn custom_mapping_reads_other_columns() {
        let mapping = FieldMapping {
            organization: "orgao".to_string(),
            ..FieldMapping::default()
        };
        let record = Record::from_fields(row(json!({ "orgao": "INSS" })), &mapping);
        assert_eq!(record.organization(), Some("INSS"));
    }

    #[test]
    fn serializes_as_source_row_in_order() {
        let record = Record::builder()
            .organization("INSS")
            .object("Cadeiras")
            .field("Número Licitação", "0001/2024")
            .build();
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(
            json,
            r#"{"Nome Órgão":"INSS","Objeto":"Cadeiras","Número Licitação":"0001/2024"}"#
        );
    }

    #[test]
    fn mapping_deserializes_partial_override() {
        let mapping: FieldMapping = serde_yaml::from_str("location: Cidade\n").unwrap();
        assert_eq!(mapping.location, "Cidade");
        assert_eq!(mapping.organization, "Nome Órgão");
    }
}
