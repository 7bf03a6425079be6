//! # List query encoding
//!
//! A [`ListQuery`] is the full signature of one list request: the committed
//! filters, the sort state, the free-text search and the page number. It
//! encodes into the Django-REST query string the backend expects and, for
//! shareable URLs, decodes back.
//!
//! ## Wire format
//!
//! ```text
//! proveedor__nombre_fantasia_pila__icontains=sa&monto__gte=100&ordering=-fecha&search=obra&page=2
//! ```
//!
//! Filters on fields the model does not declare (or with an operator the
//! field type does not accept) are dropped at this point, so a filter list
//! restored verbatim from elsewhere can never produce an invalid request.
//!
//! The same encoding, with its pairs sorted, is the cache key of the request.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filters::{Filter, FilterError, FilterValue, Operator};
use crate::schema::ModelSchema;
use crate::sort::SortState;

const ORDERING: &str = "ordering";
const SEARCH: &str = "search";
const PAGE: &str = "page";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum QueryError {
    #[error("page must be 1 or greater, got {0}")]
    InvalidPage(u32),

    #[error(transparent)]
    Filter(#[from] FilterError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListQuery {
    pub filters: Vec<Filter>,
    pub sort: SortState,
    pub search: String,
    pub page: u32,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            sort: SortState::Unsorted,
            search: String::new(),
            page: 1,
        }
    }
}

impl ListQuery {
    pub fn new(filters: Vec<Filter>, sort: SortState, search: impl Into<String>) -> Self {
        Self {
            filters,
            sort,
            search: search.into(),
            page: 1,
        }
    }

    /// Same query, another page.
    pub fn with_page(&self, page: u32) -> Self {
        Self {
            page,
            ..self.clone()
        }
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.page == 0 {
            return Err(QueryError::InvalidPage(self.page));
        }
        Ok(())
    }

    /// Key/value pairs in request order. Keys and values are already
    /// percent-encoded.
    pub fn encode(&self, schema: &ModelSchema) -> Vec<(String, String)> {
        let mut pairs = encode_filters(schema, &self.filters);

        if let Some(ordering) = self.sort.ordering_with(|field| schema.sort_path(field)) {
            pairs.push((ORDERING.to_string(), urlencoding::encode(&ordering).into_owned()));
        }
        let search = self.search.trim();
        if !search.is_empty() {
            pairs.push((SEARCH.to_string(), urlencoding::encode(search).into_owned()));
        }
        pairs.push((PAGE.to_string(), self.page.to_string()));
        pairs
    }

    pub fn to_query_string(&self, schema: &ModelSchema) -> String {
        join_pairs(&self.encode(schema))
    }

    /// Canonical signature of this request: independent of filter order.
    pub fn cache_key(&self, schema: &ModelSchema) -> String {
        let mut pairs = self.encode(schema);
        pairs.sort();
        format!("{}?{}", schema.name, join_pairs(&pairs))
    }

    /// Read a whole query back from a query string (with or without the
    /// leading `?`).
    pub fn decode(schema: &ModelSchema, query: &str) -> Result<Self, QueryError> {
        let mut decoded = ListQuery {
            filters: decode_filters(schema, query)?,
            ..ListQuery::default()
        };

        for (key, value) in split_pairs(query) {
            match key {
                ORDERING => {
                    let ordering = percent_decode(value);
                    let (descending, path) = match ordering.strip_prefix('-') {
                        Some(path) => (true, path),
                        None => (false, ordering.as_str()),
                    };
                    let field = schema
                        .columns
                        .iter()
                        .find(|c| c.sort_path() == path)
                        .map(|c| c.field.to_string())
                        .unwrap_or_else(|| path.to_string());
                    decoded.sort = if path.is_empty() {
                        SortState::Unsorted
                    } else if descending {
                        SortState::descending(field)
                    } else {
                        SortState::ascending(field)
                    };
                }
                SEARCH => decoded.search = percent_decode(value),
                PAGE => {
                    decoded.page = value.parse().map_err(|_| QueryError::InvalidPage(0))?;
                }
                _ => {}
            }
        }

        decoded.validate()?;
        Ok(decoded)
    }
}

/// Encode the filters the model accepts, in order.
pub fn encode_filters(schema: &ModelSchema, filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .filter_map(|filter| {
            let field = schema.filter_field(&filter.field)?;
            filter.check(field).ok()?;
            let (key, value) = filter.to_query_pair(field);
            Some((urlencoding::encode(&key).into_owned(), value))
        })
        .collect()
}

/// Read the filter predicates out of a query string. Keys that do not name a
/// filterable field of `schema` (including `ordering`, `search` and `page`)
/// are skipped.
pub fn decode_filters(schema: &ModelSchema, query: &str) -> Result<Vec<Filter>, QueryError> {
    let mut filters = Vec::new();

    for (raw_key, raw_value) in split_pairs(query) {
        if matches!(raw_key, ORDERING | SEARCH | PAGE) {
            continue;
        }
        let key = percent_decode(raw_key);
        let (path, operator) = Operator::split_key(&key);
        let Some(field) = schema.filter_field_by_path(path) else {
            continue;
        };
        if !field.allows(operator) {
            continue;
        }
        let value = FilterValue::from_query_value(raw_value, field.field_type, operator)?;
        filters.push(Filter {
            field: field.id.to_string(),
            operator,
            value,
        });
    }

    Ok(filters)
}

fn split_pairs(query: &str) -> impl Iterator<Item = (&str, &str)> {
    query
        .trim_start_matches('?')
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
}

fn join_pairs(pairs: &[(String, String)]) -> String {
    pairs
        .iter()
        .map(|(key, value)| format!("{}={}", key, value))
        .collect::<Vec<_>>()
        .join("&")
}

fn percent_decode(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}
