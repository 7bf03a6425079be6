//! Editable list of filter predicates for one model.
//!
//! Each row carries a random key so a UI can keep widget identity stable
//! while rows are removed from the middle of the list.

use uuid::Uuid;

use shared::{Filter, FilterError, FilterField, ModelSchema};

#[derive(Debug, Clone, PartialEq)]
pub struct FilterRow {
    pub key: Uuid,
    pub filter: Filter,
}

#[derive(Debug, Clone)]
pub struct FilterBuilder {
    schema: &'static ModelSchema,
    rows: Vec<FilterRow>,
}

impl FilterBuilder {
    pub fn new(schema: &'static ModelSchema) -> Self {
        Self {
            schema,
            rows: Vec::new(),
        }
    }

    /// Fields the user can filter on.
    pub fn fields(&self) -> &'static [FilterField] {
        self.schema.filter_fields
    }

    pub fn rows(&self) -> &[FilterRow] {
        &self.rows
    }

    pub fn filters(&self) -> Vec<Filter> {
        self.rows.iter().map(|r| r.filter.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Append a predicate. The field must belong to the model, the operator
    /// must suit its type and the value must fit the operator.
    pub fn add_filter(&mut self, filter: Filter) -> Result<Uuid, FilterError> {
        let field = self
            .schema
            .filter_field(&filter.field)
            .ok_or_else(|| FilterError::UnknownField {
                model: self.schema.name.to_string(),
                field: filter.field.clone(),
            })?;
        filter.check(field)?;

        let key = Uuid::new_v4();
        self.rows.push(FilterRow { key, filter });
        Ok(key)
    }

    pub fn remove_filter(&mut self, index: usize) -> Result<Filter, FilterError> {
        if index >= self.rows.len() {
            return Err(FilterError::IndexOutOfRange(index));
        }
        Ok(self.rows.remove(index).filter)
    }

    pub fn remove_by_key(&mut self, key: Uuid) -> Option<Filter> {
        let index = self.rows.iter().position(|r| r.key == key)?;
        Some(self.rows.remove(index).filter)
    }

    pub fn reset_filters(&mut self) {
        self.rows.clear();
    }

    /// Replace the list as given, e.g. restored from a URL. Predicates the
    /// model cannot express are kept here and skipped when encoding.
    pub fn set_filters(&mut self, filters: Vec<Filter>) {
        self.rows = filters
            .into_iter()
            .map(|filter| FilterRow {
                key: Uuid::new_v4(),
                filter,
            })
            .collect();
    }
}
