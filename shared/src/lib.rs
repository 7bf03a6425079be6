//! Wire contracts and pure domain logic shared by the tesorería client.
//!
//! Everything in this crate is synchronous and free of I/O: the types the REST
//! backend speaks, the model metadata tables that drive list screens, the
//! filter/sort/query encoding, and the small arithmetic the forms derive
//! (certificate balance after a collection, acopio balance status, ...).
//!
//! The `frontend` crate builds the controllers, HTTP client and flows on top
//! of these contracts.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub mod acopios;
pub mod filters;
pub mod pagination;
pub mod query;
pub mod schema;
pub mod sort;
pub mod tesoreria;
pub mod validation;

pub use filters::{FieldType, Filter, FilterError, FilterValue, Operator};
pub use pagination::{ListBody, ListResponse, Page};
pub use query::{decode_filters, ListQuery, QueryError};
pub use schema::{ColumnDescriptor, ColumnKind, FilterField, ModelSchema, SelectOption};
pub use sort::{SortDirection, SortState};
pub use validation::{ValidationError, ValidationErrorKind, ValidationResult};

/// Stable identity of a row, used as the reconciliation key for local
/// updates and deletes. The backend uses integer primary keys almost
/// everywhere; a few report rows are keyed by strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl RowId {
    /// Read an id out of a JSON value (number or string).
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => n.as_i64().map(RowId::Int),
            Value::String(s) => Some(RowId::Text(s.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(n) => write!(f, "{}", n),
            RowId::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RowId {
    fn from(value: i64) -> Self {
        RowId::Int(value)
    }
}

impl From<&str> for RowId {
    fn from(value: &str) -> Self {
        RowId::Text(value.to_string())
    }
}

/// Anything that can be placed in a table and reconciled by id.
pub trait Identified {
    fn row_id(&self) -> Option<RowId>;
}

impl Identified for Value {
    fn row_id(&self) -> Option<RowId> {
        self.get("id").and_then(RowId::from_value)
    }
}

/// Result of one of the bespoke endpoints (payment orders, reconciliation
/// uploads, ...), which callers treat as an opaque `{status, data}` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: u16,
    pub data: T,
}

impl<T> ApiResponse<T> {
    pub fn is_created(&self) -> bool {
        self.status == 201
    }
}

/// Serde helpers for decimal fields. The backend serialises `DecimalField`s
/// as strings (`"1234.50"`) but hand-built fixtures and a few endpoints send
/// plain numbers; both are accepted.
pub mod serde_number {
    use serde::{Deserialize, Deserializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumberOrString {
        Number(f64),
        Text(String),
    }

    fn parse<E: serde::de::Error>(raw: NumberOrString) -> Result<Option<f64>, E> {
        match raw {
            NumberOrString::Number(n) => Ok(Some(n)),
            NumberOrString::Text(s) if s.trim().is_empty() => Ok(None),
            NumberOrString::Text(s) => s
                .trim()
                .replace(',', ".")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| E::custom(format!("invalid decimal '{}'", s))),
        }
    }

    pub fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        let raw = Option::<NumberOrString>::deserialize(deserializer)?;
        match raw {
            Some(raw) => Ok(parse(raw)?.unwrap_or(0.0)),
            None => Ok(0.0),
        }
    }

    pub fn optional_decimal<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<f64>, D::Error> {
        match Option::<NumberOrString>::deserialize(deserializer)? {
            Some(raw) => parse(raw),
            None => Ok(None),
        }
    }
}

/// One entry of the change log the backend keeps for documents and ledger
/// entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub usuario: Option<String>,
    #[serde(default)]
    pub tipo: Option<String>,
    #[serde(default)]
    pub cambios: Value,
}
