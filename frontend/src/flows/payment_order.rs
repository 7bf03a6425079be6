//! # Payment order
//!
//! Submits a payment order for one or more invoices. When the server answers
//! that some invoice has to be split across projects, the user is asked for
//! that split through an [`AllocationPrompt`] and the order is sent again with
//! it. The prompt is asked again while the split does not add up or the
//! server keeps asking for it; closing the prompt cancels the order.
//!
//! Once the order is created, the invoice the dialog was opened from is
//! reported back to its table as `imputado`.

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use shared::tesoreria::{total_facturas, AllocationConflict, ImputacionMultiple, NuevoPagoRequest};

use crate::error::{FrontendError, Result};
use crate::services::api::TreasuryApi;
use crate::table::RowSink;

/// Asks the user how to split invoices across projects.
#[async_trait]
pub trait AllocationPrompt: Send + Sync {
    /// `previous` is the split shown as the starting point. `None` means the
    /// user gave up.
    async fn prompt(
        &self,
        conflict: &AllocationConflict,
        previous: &[ImputacionMultiple],
    ) -> Option<Vec<ImputacionMultiple>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentOutcome {
    Created(Value),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PaymentTotals {
    pub facturas: f64,
    pub medios_pago: f64,
}

impl PaymentTotals {
    pub fn new(facturas: &[Value], request: &NuevoPagoRequest) -> Self {
        Self {
            facturas: total_facturas(facturas),
            medios_pago: request.total_medios_pago(),
        }
    }

    /// Invoices minus payment means, in local currency.
    pub fn pendiente(&self) -> f64 {
        self.facturas - self.medios_pago
    }
}

struct ProcessingGuard<'a>(&'a AtomicBool);

impl Drop for ProcessingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct PaymentOrderFlow {
    api: Arc<dyn TreasuryApi>,
    prompt: Arc<dyn AllocationPrompt>,
    factura_inicial: Option<(Value, Arc<dyn RowSink>)>,
    processing: AtomicBool,
}

impl PaymentOrderFlow {
    pub fn new(api: Arc<dyn TreasuryApi>, prompt: Arc<dyn AllocationPrompt>) -> Self {
        Self {
            api,
            prompt,
            factura_inicial: None,
            processing: AtomicBool::new(false),
        }
    }

    /// Invoice row the order was started from, and the table showing it.
    pub fn for_invoice(mut self, factura: Value, sink: Arc<dyn RowSink>) -> Self {
        self.factura_inicial = Some((factura, sink));
        self
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    pub async fn submit(&self, request: NuevoPagoRequest) -> Result<PaymentOutcome> {
        let validation = request.validate();
        if !validation.is_valid {
            return Err(FrontendError::Validation(validation.errors));
        }
        if self
            .processing
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(FrontendError::AlreadyProcessing);
        }
        let _guard = ProcessingGuard(&self.processing);

        let mut request = request;
        loop {
            match self.api.nuevo_pago(&request).await {
                Ok(response) => {
                    info!(
                        component = "payments",
                        facturas = request.facturas.len(),
                        imputaciones = request.imputaciones_multiples.len(),
                        "Payment order created"
                    );
                    self.mark_invoice_allocated();
                    return Ok(PaymentOutcome::Created(response.data));
                }
                Err(FrontendError::AllocationRequired(conflict)) => {
                    debug!(
                        component = "payments",
                        facturas = conflict.facturas_varios.len(),
                        "Server asked for a multi-project allocation"
                    );
                    match self.ask_allocation(&conflict, &request.imputaciones_multiples).await {
                        Some(imputaciones) => request.imputaciones_multiples = imputaciones,
                        None => {
                            info!(component = "payments", "Allocation cancelled");
                            return Ok(PaymentOutcome::Cancelled);
                        }
                    }
                }
                Err(err) => {
                    warn!(component = "payments", error = %err, "Payment order failed");
                    return Err(err);
                }
            }
        }
    }

    /// Prompt until the split of every invoice adds up, or the user cancels.
    async fn ask_allocation(
        &self,
        conflict: &AllocationConflict,
        sent: &[ImputacionMultiple],
    ) -> Option<Vec<ImputacionMultiple>> {
        let mut previous = if sent.is_empty() {
            conflict.default_allocation()
        } else {
            sent.to_vec()
        };
        loop {
            let imputaciones = self.prompt.prompt(conflict, &previous).await?;
            let unbalanced = conflict.unbalanced(&imputaciones);
            if unbalanced.is_empty() && !imputaciones.is_empty() {
                return Some(imputaciones);
            }
            warn!(component = "payments", ?unbalanced, "Allocation does not add up");
            previous = imputaciones;
        }
    }

    fn mark_invoice_allocated(&self) {
        if let Some((factura, sink)) = &self.factura_inicial {
            let mut factura = factura.clone();
            if let Value::Object(map) = &mut factura {
                map.insert("imputado".to_string(), Value::Bool(true));
            }
            sink.update_item(factura);
        }
    }
}
