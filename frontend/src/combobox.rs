//! Searchable relation picker.
//!
//! A thin layer over [`TableBuilder`]: the options are the rows of a
//! relation model, searched with the same debounce and paged with the same
//! scroll tracker. `field_to_show` is the label a user sees and
//! `field_to_send` the value the form submits.

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::config::ClientConfig;
use crate::error::Result;
use crate::services::api::ModelFetcher;
use crate::table::{RowRef, TableBuilder};

pub const PLACEHOLDER: &str = "Seleccionar item...";

#[derive(Debug, Clone, PartialEq)]
pub struct ComboOption {
    pub value: Value,
    pub label: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub value: Value,
    pub label: String,
    /// Whole row, for forms that derive sibling fields from it.
    pub item: Option<Value>,
}

fn display(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct Combobox {
    table: TableBuilder,
    field_to_show: String,
    field_to_send: String,
    selected: Mutex<Option<Selection>>,
}

impl Combobox {
    pub fn new(
        model: &str,
        field_to_show: &str,
        field_to_send: &str,
        fetcher: Arc<dyn ModelFetcher>,
    ) -> Result<Self> {
        Ok(Self {
            table: TableBuilder::new(model, "", fetcher)?,
            field_to_show: field_to_show.to_string(),
            field_to_send: field_to_send.to_string(),
            selected: Mutex::new(None),
        })
    }

    pub fn with_config(mut self, config: &ClientConfig) -> Self {
        self.table = self.table.with_config(config);
        self
    }

    /// Preselect a value whose row may not be loaded yet, e.g. when a saved
    /// draft is restored together with its labels.
    pub fn with_initial(self, value: Value, label: impl Into<String>) -> Self {
        *self.lock() = Some(Selection {
            value,
            label: label.into(),
            item: None,
        });
        self
    }

    fn lock(&self) -> MutexGuard<'_, Option<Selection>> {
        self.selected.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn table(&self) -> &TableBuilder {
        &self.table
    }

    /// Load the first page of options.
    pub async fn open(&self) -> Result<()> {
        self.table.refresh().await
    }

    pub fn set_search(&self, text: impl Into<String>) {
        self.table.set_search(text);
    }

    pub async fn flush_search(&self) -> Result<bool> {
        self.table.flush_debounced().await
    }

    pub fn options(&self) -> Vec<ComboOption> {
        self.table
            .data()
            .iter()
            .map(|item| ComboOption {
                value: item.get(&self.field_to_send).cloned().unwrap_or(Value::Null),
                label: display(item.get(&self.field_to_show).unwrap_or(&Value::Null)),
            })
            .collect()
    }

    /// Pick the loaded option whose value is `value`. Returns the selection,
    /// or `None` (leaving the current one) when no such option is loaded.
    pub fn select(&self, value: &Value) -> Option<Selection> {
        let item = self
            .table
            .data()
            .into_iter()
            .find(|item| item.get(&self.field_to_send) == Some(value))?;
        let selection = Selection {
            value: value.clone(),
            label: display(item.get(&self.field_to_show).unwrap_or(&Value::Null)),
            item: Some(item),
        };
        *self.lock() = Some(selection.clone());
        Some(selection)
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    pub fn selection(&self) -> Option<Selection> {
        self.lock().clone()
    }

    pub fn value(&self) -> Option<Value> {
        self.lock().as_ref().map(|s| s.value.clone())
    }

    /// Text for the closed picker.
    pub fn label(&self) -> String {
        self.lock()
            .as_ref()
            .map(|s| s.label.clone())
            .unwrap_or_else(|| PLACEHOLDER.to_string())
    }

    pub fn assign_ref(&self, index: usize) -> RowRef {
        self.table.assign_ref(index)
    }

    pub async fn report_visibility(&self, row: RowRef, visible_ratio: f64) -> Result<bool> {
        self.table.report_visibility(row, visible_ratio).await
    }
}
