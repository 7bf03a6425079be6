//! Create / edit dialog over one model.
//!
//! The dialog validates its form, writes it through a [`ModelWriter`] and,
//! only once the server confirmed, reports the server representation to the
//! table through a [`RowSink`]. A failed request leaves the dialog open with
//! the input as typed.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use shared::{RowId, ValidationResult};

use crate::error::{FrontendError, Result};
use crate::services::api::ModelWriter;
use crate::table::RowSink;

/// Form model a [`RecordDialog`] can edit.
pub trait RecordForm: Serialize + Clone + Send + Sync {
    /// Model written to.
    const MODEL: &'static str;

    fn defaults(today: NaiveDate) -> Self;
    fn validate(&self) -> ValidationResult;

    /// Request body. Defaults to the form itself.
    fn to_payload(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DialogMode {
    Create,
    Edit(RowId),
}

pub struct RecordDialog<F: RecordForm> {
    writer: Arc<dyn ModelWriter>,
    sink: Arc<dyn RowSink>,
    mode: DialogMode,
    today: NaiveDate,
    open: bool,
    errors: ValidationResult,
    pub form: F,
}

impl<F: RecordForm> RecordDialog<F> {
    pub fn new(writer: Arc<dyn ModelWriter>, sink: Arc<dyn RowSink>, today: NaiveDate) -> Self {
        Self {
            writer,
            sink,
            mode: DialogMode::Create,
            today,
            open: false,
            errors: ValidationResult::valid(),
            form: F::defaults(today),
        }
    }

    pub fn open_create(&mut self) {
        self.mode = DialogMode::Create;
        self.open = true;
    }

    /// Open on an existing row, prefilled.
    pub fn open_edit(&mut self, id: RowId, form: F) {
        self.mode = DialogMode::Edit(id);
        self.form = form;
        self.errors = ValidationResult::valid();
        self.open = true;
    }

    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn mode(&self) -> &DialogMode {
        &self.mode
    }

    /// Errors of the last submit, per field.
    pub fn errors(&self) -> &ValidationResult {
        &self.errors
    }

    /// Validate without submitting.
    pub fn check(&mut self) -> bool {
        self.errors = self.form.validate();
        self.errors.is_valid
    }

    pub fn reset(&mut self) {
        self.form = F::defaults(self.today);
        self.errors = ValidationResult::valid();
        self.mode = DialogMode::Create;
    }

    /// Validate, send, reconcile. On success the dialog closes and the form
    /// goes back to its defaults; the server row is returned.
    pub async fn submit(&mut self) -> Result<Value> {
        if !self.check() {
            return Err(FrontendError::Validation(self.errors.errors.clone()));
        }
        let payload = self.form.to_payload()?;

        let result = match &self.mode {
            DialogMode::Create => self.writer.create(F::MODEL, &payload).await,
            DialogMode::Edit(id) => self.writer.update(F::MODEL, id, &payload).await,
        };

        match result {
            Ok(item) => {
                match self.mode {
                    DialogMode::Create => self.sink.add_item(item.clone()),
                    DialogMode::Edit(_) => self.sink.update_item(item.clone()),
                }
                info!(component = "forms", model = F::MODEL, mode = ?self.mode, "Saved");
                self.open = false;
                self.reset();
                Ok(item)
            }
            Err(err) => {
                warn!(component = "forms", model = F::MODEL, error = %err, "Save failed");
                Err(err)
            }
        }
    }
}

/// Delete a row on the server, then drop it from the table.
pub async fn confirm_delete(
    writer: &dyn ModelWriter,
    sink: &dyn RowSink,
    model: &str,
    id: &RowId,
) -> Result<()> {
    writer.delete(model, id).await?;
    sink.delete_item(id);
    info!(component = "forms", model, %id, "Deleted");
    Ok(())
}
