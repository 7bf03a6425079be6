//! Collection (REC) against a billing certificate.

use chrono::NaiveDate;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

use shared::tesoreria::{BalanceOutlook, Certificado, CobroCertificado};
use shared::ValidationResult;

use super::derived::{moneda_for_caja, tipo_de_cambio_for};
use crate::combobox::Selection;
use crate::error::{FrontendError, Result};
use crate::services::api::TreasuryApi;
use crate::table::RowSink;

pub struct CobroDialog {
    api: Arc<dyn TreasuryApi>,
    sink: Arc<dyn RowSink>,
    today: NaiveDate,
    certificado: Option<Certificado>,
    errors: ValidationResult,
    open: bool,
    pub form: CobroCertificado,
}

impl CobroDialog {
    pub fn new(api: Arc<dyn TreasuryApi>, sink: Arc<dyn RowSink>, today: NaiveDate) -> Self {
        Self {
            api,
            sink,
            today,
            certificado: None,
            errors: ValidationResult::valid(),
            open: false,
            form: CobroCertificado::new(today),
        }
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn errors(&self) -> &ValidationResult {
        &self.errors
    }

    /// Cash box picked (or cleared) in its picker.
    pub fn on_caja_selected(&mut self, selection: Option<&Selection>) {
        self.form.caja = selection.map(|s| s.label.clone()).unwrap_or_default();
        self.form.moneda = moneda_for_caja(selection.and_then(|s| s.item.as_ref()));
        self.form.tipo_de_cambio = tipo_de_cambio_for(self.form.moneda, self.form.tipo_de_cambio);
    }

    pub fn on_certificado_selected(&mut self, certificado: Option<Certificado>) {
        self.form.certificado = certificado.as_ref().map(|c| c.id);
        self.certificado = certificado;
    }

    /// Whether the exchange-rate field should be shown.
    pub fn needs_exchange_rate(&self) -> bool {
        self.form.needs_exchange_rate()
    }

    /// Balance the certificate would be left with.
    pub fn saldo_final(&self) -> Option<f64> {
        self.certificado.as_ref().map(|c| self.form.saldo_final(c))
    }

    pub fn outlook(&self) -> Option<BalanceOutlook> {
        self.certificado.as_ref().map(|c| self.form.outlook(c))
    }

    pub async fn submit(&mut self) -> Result<Value> {
        self.errors = self.form.validate();
        if !self.errors.is_valid {
            return Err(FrontendError::Validation(self.errors.errors.clone()));
        }

        match self.api.nuevo_cobro(&self.form).await {
            Ok(response) => {
                info!(component = "forms", status = response.status, "Cobro registered");
                self.sink.add_item(response.data.clone());
                self.open = false;
                self.form = CobroCertificado::new(self.today);
                self.certificado = None;
                Ok(response.data)
            }
            Err(err) => {
                warn!(component = "forms", error = %err, "Cobro failed");
                Err(err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::api::HistoryKind;
    use crate::testing::{RecordingSink, SinkCall};
    use async_trait::async_trait;
    use serde_json::json;
    use shared::tesoreria::{
        ConciliacionResponse, MovimientoBancario, NuevoPagoRequest, PagoPlantillaRequest,
    };
    use shared::{ApiResponse, HistoryEntry, RowId};
    use std::sync::Mutex;

    #[derive(Default)]
    struct CobroApi {
        sent: Mutex<Vec<CobroCertificado>>,
    }

    #[async_trait]
    impl TreasuryApi for CobroApi {
        async fn nuevo_pago(&self, _: &NuevoPagoRequest) -> Result<ApiResponse<Value>> {
            unreachable!()
        }
        async fn nuevo_cobro(&self, cobro: &CobroCertificado) -> Result<ApiResponse<Value>> {
            self.sent.lock().unwrap().push(cobro.clone());
            Ok(ApiResponse {
                status: 201,
                data: json!({"id": 77, "monto": cobro.monto}),
            })
        }
        async fn upload_statement(&self, _: &str, _: Vec<u8>) -> Result<ConciliacionResponse> {
            unreachable!()
        }
        async fn gasto_bancario(&self, _: &MovimientoBancario) -> Result<ApiResponse<Value>> {
            unreachable!()
        }
        async fn pago_plantilla(&self, _: &PagoPlantillaRequest) -> Result<ApiResponse<Value>> {
            unreachable!()
        }
        async fn historial(&self, _: HistoryKind, _: &RowId) -> Result<Vec<HistoryEntry>> {
            unreachable!()
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn caja_usd() -> Selection {
        Selection {
            value: json!(2),
            label: "Banco USD".into(),
            item: Some(json!({"id": 2, "caja": "Banco USD", "moneda": 2})),
        }
    }

    #[test]
    fn test_caja_sets_moneda_and_exchange_rate_visibility() {
        let api = Arc::new(CobroApi::default());
        let mut dialog = CobroDialog::new(api, Arc::new(RecordingSink::new()), today());
        assert!(!dialog.needs_exchange_rate());

        dialog.on_caja_selected(Some(&caja_usd()));
        assert_eq!(dialog.form.caja, "Banco USD");
        assert_eq!(dialog.form.moneda, 2);
        assert!(dialog.needs_exchange_rate());

        dialog.form.tipo_de_cambio = 900.0;
        dialog.on_caja_selected(None);
        assert_eq!(dialog.form.moneda, 0);
        assert_eq!(dialog.form.tipo_de_cambio, 1.0);
    }

    #[test]
    fn test_balance_outlook() {
        let api = Arc::new(CobroApi::default());
        let mut dialog = CobroDialog::new(api, Arc::new(RecordingSink::new()), today());
        assert_eq!(dialog.outlook(), None);

        let certificado: Certificado =
            serde_json::from_value(json!({"id": 5, "monto": "50000", "saldo": "20000"})).unwrap();
        dialog.on_certificado_selected(Some(certificado));
        dialog.on_caja_selected(Some(&caja_usd()));
        dialog.form.monto = 30.0;
        dialog.form.tipo_de_cambio = 1000.0;
        assert_eq!(dialog.saldo_final(), Some(-10_000.0));
        assert_eq!(dialog.outlook(), Some(BalanceOutlook::ExceededBy(10_000.0)));
        assert_eq!(dialog.form.certificado, Some(5));
    }

    #[tokio::test]
    async fn test_submit() {
        let api = Arc::new(CobroApi::default());
        let sink = Arc::new(RecordingSink::new());
        let mut dialog = CobroDialog::new(api.clone(), sink.clone(), today());
        dialog.open();

        assert!(dialog.submit().await.is_err());
        assert!(dialog.errors().has_error("monto"));
        assert!(api.sent.lock().unwrap().is_empty());

        dialog.on_caja_selected(Some(&caja_usd()));
        dialog.form.cliente_proyecto = "Torre A".into();
        dialog.form.monto = 100.0;
        dialog.form.tipo_de_cambio = 1000.0;
        dialog.submit().await.unwrap();

        assert_eq!(api.sent.lock().unwrap()[0].moneda, 2);
        assert_eq!(sink.calls(), vec![SinkCall::Add(json!({"id": 77, "monto": 100.0}))]);
        assert!(!dialog.is_open());
        assert_eq!(dialog.form, CobroCertificado::new(today()));
    }
}
