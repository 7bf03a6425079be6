//! # Filter predicates
//!
//! A list screen lets the user compose `(field, operator, value)` predicates
//! that are ANDed together and sent to the backend as Django-REST style
//! lookups (`monto__gte=100`, `proveedor__nombre_fantasia_pila__icontains=sa`).
//!
//! This module owns the predicate types, the type/operator compatibility
//! table and the per-predicate query encoding. Encoding a whole list of
//! predicates (plus sort, search and page) lives in [`crate::query`].

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::schema::FilterField;

/// Comparison operator of a filter predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Eq,
    Contains,
    Gt,
    Lt,
    Gte,
    Lte,
    In,
    IsNull,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Operator::Eq,
        Operator::Contains,
        Operator::Gt,
        Operator::Lt,
        Operator::Gte,
        Operator::Lte,
        Operator::In,
        Operator::IsNull,
    ];

    /// Lookup suffix appended to the field path in the query key.
    pub fn lookup_suffix(self) -> &'static str {
        match self {
            Operator::Eq => "",
            Operator::Contains => "__icontains",
            Operator::Gt => "__gt",
            Operator::Lt => "__lt",
            Operator::Gte => "__gte",
            Operator::Lte => "__lte",
            Operator::In => "__in",
            Operator::IsNull => "__isnull",
        }
    }

    /// Whether the operator targets the related display column (for fields
    /// that declare one) rather than the raw foreign key.
    pub fn uses_display_lookup(self) -> bool {
        matches!(self, Operator::Eq | Operator::Contains | Operator::In)
    }

    /// Split a query key into its field path and operator.
    ///
    /// Longer suffixes are tried first so `__gte` is never read as `__gt`.
    pub fn split_key(key: &str) -> (&str, Operator) {
        const SUFFIXES: [(&str, Operator); 7] = [
            ("__icontains", Operator::Contains),
            ("__isnull", Operator::IsNull),
            ("__gte", Operator::Gte),
            ("__lte", Operator::Lte),
            ("__gt", Operator::Gt),
            ("__lt", Operator::Lt),
            ("__in", Operator::In),
        ];

        for (suffix, operator) in SUFFIXES {
            if let Some(path) = key.strip_suffix(suffix) {
                if !path.is_empty() {
                    return (path, operator);
                }
            }
        }
        (key, Operator::Eq)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Contains => "contains",
            Operator::Gt => "gt",
            Operator::Lt => "lt",
            Operator::Gte => "gte",
            Operator::Lte => "lte",
            Operator::In => "in",
            Operator::IsNull => "isnull",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a filterable field. Decides which operators apply and
/// how a raw query value is read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Number,
    Date,
    Boolean,
    /// Foreign key, filtered by id.
    Relation,
    /// Closed set of choices (e.g. budget status).
    Select,
}

impl FieldType {
    pub fn allowed_operators(self) -> &'static [Operator] {
        match self {
            FieldType::Text => &[Operator::Eq, Operator::Contains],
            FieldType::Number | FieldType::Date => &[
                Operator::Eq,
                Operator::Gt,
                Operator::Lt,
                Operator::Gte,
                Operator::Lte,
            ],
            FieldType::Boolean => &[Operator::Eq],
            FieldType::Relation => &[Operator::Eq, Operator::IsNull],
            FieldType::Select => &[Operator::Eq, Operator::In],
        }
    }

    pub fn allows(self, operator: Operator) -> bool {
        self.allowed_operators().contains(&operator)
    }
}

/// Right-hand side of a predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FilterValue {
    /// Percent-encoded value as it goes into the query string. List items are
    /// escaped one by one and joined with a literal comma.
    pub fn to_query_value(&self) -> String {
        match self {
            FilterValue::Null => String::new(),
            FilterValue::Bool(b) => b.to_string(),
            FilterValue::Number(n) => n.to_string(),
            FilterValue::Text(s) => urlencoding::encode(s).into_owned(),
            FilterValue::List(items) => items
                .iter()
                .map(|item| urlencoding::encode(item).into_owned())
                .collect::<Vec<_>>()
                .join(","),
        }
    }

    /// Read a raw (still percent-encoded) query value back into a typed
    /// value, guided by the field type and operator.
    pub fn from_query_value(
        raw: &str,
        field_type: FieldType,
        operator: Operator,
    ) -> Result<FilterValue, FilterError> {
        let invalid = || FilterError::InvalidValue {
            value: raw.to_string(),
            expected: field_type,
        };

        match operator {
            Operator::IsNull => match raw {
                "true" => Ok(FilterValue::Bool(true)),
                "false" => Ok(FilterValue::Bool(false)),
                _ => Err(invalid()),
            },
            Operator::In => {
                if raw.is_empty() {
                    return Ok(FilterValue::List(Vec::new()));
                }
                raw.split(',')
                    .map(|item| decode(item).ok_or_else(invalid))
                    .collect::<Result<Vec<_>, _>>()
                    .map(FilterValue::List)
            }
            _ => {
                let text = decode(raw).ok_or_else(invalid)?;
                match field_type {
                    FieldType::Number => text
                        .parse::<f64>()
                        .map(FilterValue::Number)
                        .map_err(|_| invalid()),
                    FieldType::Boolean => match text.as_str() {
                        "true" => Ok(FilterValue::Bool(true)),
                        "false" => Ok(FilterValue::Bool(false)),
                        _ => Err(invalid()),
                    },
                    FieldType::Relation => Ok(text
                        .parse::<f64>()
                        .map(FilterValue::Number)
                        .unwrap_or(FilterValue::Text(text))),
                    FieldType::Text | FieldType::Date | FieldType::Select => {
                        Ok(FilterValue::Text(text))
                    }
                }
            }
        }
    }
}

fn decode(raw: &str) -> Option<String> {
    urlencoding::decode(raw).ok().map(|s| s.into_owned())
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

impl From<f64> for FilterValue {
    fn from(value: f64) -> Self {
        FilterValue::Number(value)
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Number(value as f64)
    }
}

impl From<bool> for FilterValue {
    fn from(value: bool) -> Self {
        FilterValue::Bool(value)
    }
}

/// A single `(field, operator, value)` predicate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub field: String,
    pub operator: Operator,
    pub value: FilterValue,
}

impl Filter {
    pub fn new(field: impl Into<String>, operator: Operator, value: impl Into<FilterValue>) -> Self {
        Self {
            field: field.into(),
            operator,
            value: value.into(),
        }
    }

    /// Check the operator against the declared field type.
    pub fn check_operator(&self, field: &FilterField) -> Result<(), FilterError> {
        if field.field_type.allows(self.operator) {
            Ok(())
        } else {
            Err(FilterError::OperatorNotAllowed {
                field: self.field.clone(),
                operator: self.operator,
                field_type: field.field_type,
            })
        }
    }

    /// Reject values the query string cannot carry back: a null outside
    /// `isnull`, a list outside `in`, or an empty list item.
    pub fn check_value(&self, field: &FilterField) -> Result<(), FilterError> {
        let readable = match (self.operator, &self.value) {
            (Operator::IsNull, FilterValue::Bool(_)) => true,
            (Operator::IsNull, _) => false,
            (Operator::In, FilterValue::List(items)) => items.iter().all(|item| !item.is_empty()),
            (Operator::In, _) => false,
            (_, FilterValue::Null | FilterValue::List(_)) => false,
            _ => true,
        };
        if readable {
            Ok(())
        } else {
            Err(FilterError::InvalidValue {
                value: format!("{:?}", self.value),
                expected: field.field_type,
            })
        }
    }

    /// Operator and value both fit the field.
    pub fn check(&self, field: &FilterField) -> Result<(), FilterError> {
        self.check_operator(field)?;
        self.check_value(field)
    }

    /// Query key and encoded value for this predicate.
    pub fn to_query_pair(&self, field: &FilterField) -> (String, String) {
        let key = format!("{}{}", field.path_for(self.operator), self.operator.lookup_suffix());
        (key, self.value.to_query_value())
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
    #[error("model '{model}' has no filterable field '{field}'")]
    UnknownField { model: String, field: String },

    #[error("operator '{operator}' is not valid for {field_type:?} field '{field}'")]
    OperatorNotAllowed {
        field: String,
        operator: Operator,
        field_type: FieldType,
    },

    #[error("value '{value}' cannot be read as {expected:?}")]
    InvalidValue { value: String, expected: FieldType },

    #[error("no filter at index {0}")]
    IndexOutOfRange(usize),
}
