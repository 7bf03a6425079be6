//! # Bulk ledger entry
//!
//! Multi-row form for entering several ledger entries (registros) at once.
//! The half-filled form survives closing the dialog: rows are saved under
//! the `movimientos` draft key and the labels of the relation pickers under
//! `movimientos_labels`, keyed `movimientos.<row>.<field>`.
//!
//! ## Draft recovery:
//! - missing draft: one empty row
//! - rows that fail to parse: one empty row and no labels
//! - labels that fail to parse: rows kept, no labels
//!
//! ## Submit:
//! Rows are posted one by one. On the first failure the rows already posted
//! are dropped from the form, the rest stay (and are saved) for a retry.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared::tesoreria::MovimientoDraft;
use shared::ValidationResult;

use crate::combobox::Selection;
use crate::error::{FrontendError, Result};
use crate::services::api::ModelWriter;
use crate::services::draft_store::DraftStore;

pub const DRAFT_KEY: &str = "movimientos";
pub const LABELS_KEY: &str = "movimientos_labels";
const MODEL: &str = "registros";

/// Relation columns of a row, each filled through a picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationField {
    UnidadDeNegocio,
    ClienteProyecto,
    Proveedor,
    Imputacion,
    Presupuesto,
}

impl RelationField {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationField::UnidadDeNegocio => "unidad_de_negocio",
            RelationField::ClienteProyecto => "cliente_proyecto",
            RelationField::Proveedor => "proveedor",
            RelationField::Imputacion => "imputacion",
            RelationField::Presupuesto => "presupuesto",
        }
    }

    fn slot(self, row: &mut MovimientoDraft) -> &mut i64 {
        match self {
            RelationField::UnidadDeNegocio => &mut row.unidad_de_negocio,
            RelationField::ClienteProyecto => &mut row.cliente_proyecto,
            RelationField::Proveedor => &mut row.proveedor,
            RelationField::Imputacion => &mut row.imputacion,
            RelationField::Presupuesto => &mut row.presupuesto,
        }
    }
}

fn label_key(index: usize, field: &str) -> String {
    format!("movimientos.{}.{}", index, field)
}

fn parse_label_key(key: &str) -> Option<(usize, &str)> {
    let rest = key.strip_prefix("movimientos.")?;
    let (index, field) = rest.split_once('.')?;
    Some((index.parse().ok()?, field))
}

pub struct CargaMasiva {
    store: Arc<dyn DraftStore>,
    writer: Arc<dyn ModelWriter>,
    today: NaiveDate,
    rows: Vec<MovimientoDraft>,
    labels: BTreeMap<String, String>,
    errors: ValidationResult,
}

impl CargaMasiva {
    /// Open the form, restoring the saved draft if there is one.
    pub fn open(store: Arc<dyn DraftStore>, writer: Arc<dyn ModelWriter>, today: NaiveDate) -> Result<Self> {
        let mut form = Self {
            store,
            writer,
            today,
            rows: Vec::new(),
            labels: BTreeMap::new(),
            errors: ValidationResult::valid(),
        };
        form.restore()?;
        Ok(form)
    }

    fn restore(&mut self) -> Result<()> {
        let rows = match self.store.load(DRAFT_KEY)? {
            Some(json) => match serde_json::from_str::<Vec<MovimientoDraft>>(&json) {
                Ok(rows) if !rows.is_empty() => Some(rows),
                Ok(_) => None,
                Err(err) => {
                    warn!(component = "drafts", error = %err, "Discarding unreadable draft rows");
                    None
                }
            },
            None => None,
        };

        match rows {
            Some(rows) => {
                self.rows = rows;
                self.labels = match self.store.load(LABELS_KEY)? {
                    Some(json) => serde_json::from_str(&json).unwrap_or_else(|err| {
                        warn!(component = "drafts", error = %err, "Discarding unreadable draft labels");
                        BTreeMap::new()
                    }),
                    None => BTreeMap::new(),
                };
                debug!(component = "drafts", rows = self.rows.len(), "Draft restored");
            }
            None => {
                self.rows = vec![MovimientoDraft::new(self.today)];
                self.labels.clear();
            }
        }
        Ok(())
    }

    /// Save the draft. Called when the dialog closes.
    pub fn close(&self) -> Result<()> {
        self.store.save(DRAFT_KEY, &serde_json::to_string(&self.rows)?)?;
        self.store.save(LABELS_KEY, &serde_json::to_string(&self.labels)?)?;
        Ok(())
    }

    pub fn rows(&self) -> &[MovimientoDraft] {
        &self.rows
    }

    pub fn row_mut(&mut self, index: usize) -> Option<&mut MovimientoDraft> {
        self.rows.get_mut(index)
    }

    pub fn errors(&self) -> &ValidationResult {
        &self.errors
    }

    pub fn add_row(&mut self) {
        self.rows.push(MovimientoDraft::new(self.today));
    }

    /// Remove a row; labels of the rows after it move up with them.
    pub fn remove_row(&mut self, index: usize) -> Option<MovimientoDraft> {
        if index >= self.rows.len() {
            return None;
        }
        let removed = self.rows.remove(index);
        self.labels = std::mem::take(&mut self.labels)
            .into_iter()
            .filter_map(|(key, label)| match parse_label_key(&key) {
                Some((i, _)) if i == index => None,
                Some((i, field)) if i > index => Some((label_key(i - 1, field), label)),
                _ => Some((key, label)),
            })
            .collect();
        Some(removed)
    }

    /// Change a row's date; its accrual period follows.
    pub fn set_fecha(&mut self, index: usize, fecha: &str) {
        if let Some(row) = self.rows.get_mut(index) {
            row.set_fecha(fecha);
        }
    }

    /// Store a picker's choice and remember its label for the draft.
    pub fn set_relation(&mut self, index: usize, field: RelationField, selection: Option<&Selection>) {
        let Some(row) = self.rows.get_mut(index) else {
            return;
        };
        let key = label_key(index, field.as_str());
        match selection {
            Some(selection) => {
                *field.slot(row) = selection.value.as_i64().unwrap_or(0);
                self.labels.insert(key, selection.label.clone());
            }
            None => {
                *field.slot(row) = 0;
                self.labels.remove(&key);
            }
        }
    }

    /// Label to show in a picker before its options load.
    pub fn label(&self, index: usize, field: RelationField) -> &str {
        self.labels
            .get(&label_key(index, field.as_str()))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn validate(&mut self) -> &ValidationResult {
        let mut result = ValidationResult::valid();
        for (index, row) in self.rows.iter().enumerate() {
            row.validate_into(index, &mut result);
        }
        self.errors = result;
        &self.errors
    }

    fn reset(&mut self) {
        self.rows = vec![MovimientoDraft::new(self.today)];
        self.labels.clear();
        self.errors = ValidationResult::valid();
    }

    /// Post every row. On success the draft is cleared and the created
    /// entries are returned.
    pub async fn submit(&mut self) -> Result<Vec<Value>> {
        if !self.validate().is_valid {
            return Err(FrontendError::Validation(self.errors.errors.clone()));
        }

        let payloads: Vec<Value> = self.rows.iter().map(MovimientoDraft::to_payload).collect();
        let mut created = Vec::with_capacity(payloads.len());
        for payload in &payloads {
            match self.writer.create(MODEL, payload).await {
                Ok(item) => created.push(item),
                Err(err) => {
                    let posted = created.len();
                    warn!(component = "forms", posted, error = %err, "Bulk entry stopped");
                    for _ in 0..posted {
                        self.remove_row(0);
                    }
                    self.close()?;
                    return Err(err);
                }
            }
        }

        info!(component = "forms", count = created.len(), "Bulk entry posted");
        self.reset();
        self.store.clear(DRAFT_KEY)?;
        self.store.clear(LABELS_KEY)?;
        Ok(created)
    }
}
