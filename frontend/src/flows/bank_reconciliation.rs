//! # Bank reconciliation
//!
//! An uploaded bank statement comes back split into categories. Movements
//! not yet posted (`ya_cargado == false`) can be posted from here: a bank
//! fee, a money-market fund (FCI) subscription or redemption, or a batch of
//! payments created from a template.
//!
//! The template batch is not transactional. Each payment is posted on its
//! own; the ones that fail are listed in the [`BatchReport`] and the ones
//! already created stay created.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared::tesoreria::{ConciliacionResponse, MovimientoBancario, MovimientoCategoria, PagoPlantillaRequest};
use shared::{HistoryEntry, RowId, ValidationError, ValidationErrorKind};

use crate::error::{FrontendError, Result};
use crate::services::api::{HistoryKind, ModelWriter, TreasuryApi};

const FCI_MODEL: &str = "fci";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFailure {
    pub movimiento: i64,
    pub error: String,
}

/// Outcome of a template payment batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    pub succeeded: Vec<i64>,
    pub failed: Vec<BatchFailure>,
}

impl BatchReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct BankReconciliation {
    api: Arc<dyn TreasuryApi>,
    writer: Arc<dyn ModelWriter>,
    statement: ConciliacionResponse,
    selected: BTreeSet<i64>,
}

impl BankReconciliation {
    pub fn new(api: Arc<dyn TreasuryApi>, writer: Arc<dyn ModelWriter>) -> Self {
        Self {
            api,
            writer,
            statement: ConciliacionResponse::default(),
            selected: BTreeSet::new(),
        }
    }

    /// Upload a statement CSV. Replaces the loaded statement and clears the
    /// selection.
    pub async fn upload(&mut self, file_name: &str, contents: Vec<u8>) -> Result<&ConciliacionResponse> {
        let statement = self.api.upload_statement(file_name, contents).await?;
        info!(
            component = "reconciliation",
            pagos = statement.pagos.len(),
            gastos = statement.gastos_bancarios.len(),
            fci = statement.fci.len(),
            "Statement loaded"
        );
        self.statement = statement;
        self.selected.clear();
        Ok(&self.statement)
    }

    pub async fn upload_file(&mut self, path: &Path) -> Result<&ConciliacionResponse> {
        let contents = tokio::fs::read(path)
            .await
            .map_err(|e| FrontendError::Config(format!("cannot read {}: {}", path.display(), e)))?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "extracto.csv".to_string());
        self.upload(&file_name, contents).await
    }

    pub fn statement(&self) -> &ConciliacionResponse {
        &self.statement
    }

    pub fn movimientos(&self, categoria: MovimientoCategoria) -> &[MovimientoBancario] {
        self.statement.category(categoria)
    }

    fn find(&self, categoria: MovimientoCategoria, id: i64) -> Result<&MovimientoBancario> {
        self.statement
            .category(categoria)
            .iter()
            .find(|m| m.id == id)
            .ok_or(FrontendError::UnknownMovement(id))
    }

    pub fn selected(&self) -> &BTreeSet<i64> {
        &self.selected
    }

    /// Toggle a pending payment in or out of the selection. Posted or
    /// unknown payments are ignored.
    pub fn toggle_pago(&mut self, id: i64) {
        if !self.statement.pending_pagos().any(|p| p.id == id) {
            return;
        }
        if !self.selected.remove(&id) {
            self.selected.insert(id);
        }
    }

    /// Select every pending payment, or clear them all if they already were.
    pub fn toggle_all_pagos(&mut self) {
        let pending: Vec<i64> = self.statement.pending_pagos().map(|p| p.id).collect();
        if pending.iter().all(|id| self.selected.contains(id)) {
            for id in &pending {
                self.selected.remove(id);
            }
        } else {
            self.selected.extend(pending);
        }
    }

    /// Sum of the selected payments.
    pub fn selected_total(&self) -> f64 {
        self.statement
            .pagos
            .iter()
            .filter(|p| self.selected.contains(&p.id))
            .map(MovimientoBancario::monto)
            .sum()
    }

    /// Post a bank fee movement.
    pub async fn cargar_gasto_bancario(&mut self, id: i64) -> Result<Value> {
        let movimiento = self.find(MovimientoCategoria::GastosBancarios, id)?.with_iso_date();
        let response = self.api.gasto_bancario(&movimiento).await.map_err(|err| {
            warn!(component = "reconciliation", movimiento = id, error = %err, "Bank fee failed");
            err
        })?;
        self.statement.mark_loaded(MovimientoCategoria::GastosBancarios, id);
        debug!(component = "reconciliation", movimiento = id, "Bank fee posted");
        Ok(response.data)
    }

    /// Post an FCI subscription (debit) or redemption (credit).
    pub async fn cargar_fci(&mut self, id: i64) -> Result<Value> {
        let movimiento = self
            .find(MovimientoCategoria::Fci, id)?
            .fci_movimiento()
            .ok_or_else(|| {
                FrontendError::Validation(vec![ValidationError::new("monto", ValidationErrorKind::Required)])
            })?;
        let created = self
            .writer
            .create(FCI_MODEL, &serde_json::to_value(&movimiento)?)
            .await
            .map_err(|err| {
                warn!(component = "reconciliation", movimiento = id, error = %err, "FCI movement failed");
                err
            })?;
        self.statement.mark_loaded(MovimientoCategoria::Fci, id);
        debug!(component = "reconciliation", movimiento = id, tipo = ?movimiento.tipo, "FCI movement posted");
        Ok(created)
    }

    /// Create a payment from `plantilla_id` for every selected payment.
    pub async fn pagar_con_plantilla(&mut self, plantilla_id: i64) -> BatchReport {
        let pagos: Vec<MovimientoBancario> = self
            .statement
            .pending_pagos()
            .filter(|p| self.selected.contains(&p.id))
            .cloned()
            .collect();

        let mut report = BatchReport::default();
        for movimiento in pagos {
            let request = PagoPlantillaRequest {
                monto: movimiento.monto(),
                movimiento,
                plantilla_id,
            };
            let id = request.movimiento.id;
            match self.api.pago_plantilla(&request).await {
                Ok(_) => {
                    self.statement.mark_loaded(MovimientoCategoria::Pagos, id);
                    self.selected.remove(&id);
                    report.succeeded.push(id);
                }
                Err(err) => {
                    warn!(component = "reconciliation", movimiento = id, error = %err, "Template payment failed");
                    report.failed.push(BatchFailure {
                        movimiento: id,
                        error: err.to_string(),
                    });
                }
            }
        }

        info!(
            component = "reconciliation",
            plantilla = plantilla_id,
            succeeded = report.succeeded.len(),
            failed = report.failed.len(),
            "Template payments done"
        );
        report
    }

    pub async fn historial(&self, kind: HistoryKind, id: &RowId) -> Result<Vec<HistoryEntry>> {
        self.api.historial(kind, id).await
    }
}
