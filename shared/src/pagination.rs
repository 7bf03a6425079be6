//! Paginated list responses.
//!
//! The backend answers list requests with the Django-REST envelope
//! `{count, next, previous, results}`. A few catalogue endpoints skip
//! pagination and return a bare array; both shapes decode into [`ListBody`]
//! and normalise into a [`Page`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of rows plus the cursor of the following page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T = Value> {
    pub items: Vec<T>,
    /// Page number to request next, `None` on the last page.
    pub next_cursor: Option<u32>,
    /// Total row count when the server reports it.
    pub count: Option<u64>,
}

impl<T> Page<T> {
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_cursor: None,
            count: None,
        }
    }

    pub fn has_more(&self) -> bool {
        self.next_cursor.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListResponse<T = Value> {
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub results: Vec<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListBody<T = Value> {
    Paginated(ListResponse<T>),
    Plain(Vec<T>),
}

impl<T> From<ListBody<T>> for Page<T> {
    fn from(body: ListBody<T>) -> Self {
        match body {
            ListBody::Paginated(response) => Page {
                next_cursor: response.next.as_deref().and_then(page_param_from_url),
                count: response.count,
                items: response.results,
            },
            ListBody::Plain(items) => Page::last(items),
        }
    }
}

/// Value of the `page` query parameter of a `next` URL.
pub fn page_param_from_url(url: &str) -> Option<u32> {
    let (_, query) = url.split_once('?')?;
    let query = query.split('#').next().unwrap_or(query);
    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "page")
        .and_then(|(_, value)| value.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_page_param_from_url() {
        assert_eq!(
            page_param_from_url("https://api.example.com/api/acopios/?ordering=fecha&page=3"),
            Some(3)
        );
        assert_eq!(page_param_from_url("/api/iva/?page=12#top"), Some(12));
        assert_eq!(page_param_from_url("/api/iva/?search=page"), None);
        assert_eq!(page_param_from_url("/api/iva/"), None);
        assert_eq!(page_param_from_url("/api/iva/?page=abc"), None);
    }

    #[test]
    fn test_paginated_body_to_page() {
        let body: ListBody = serde_json::from_value(json!({
            "count": 45,
            "next": "http://localhost:8000/api/acopios/?page=2",
            "previous": null,
            "results": [{"id": 1}, {"id": 2}]
        }))
        .unwrap();
        let page: Page = body.into();
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_cursor, Some(2));
        assert_eq!(page.count, Some(45));
        assert!(page.has_more());
    }

    #[test]
    fn test_plain_array_is_last_page() {
        let body: ListBody = serde_json::from_value(json!([{"id": 1}])).unwrap();
        let page: Page = body.into();
        assert_eq!(page.items, vec![json!({"id": 1})]);
        assert!(!page.has_more());
    }
}
