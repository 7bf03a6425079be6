//! Acopio create / edit dialog.

use chrono::NaiveDate;

use shared::acopios::{Acopio, NuevoAcopio};
use shared::{RowId, ValidationResult};

use super::dialog::{RecordDialog, RecordForm};

impl RecordForm for NuevoAcopio {
    const MODEL: &'static str = "acopios";

    fn defaults(today: NaiveDate) -> Self {
        NuevoAcopio::defaults_for(today)
    }

    fn validate(&self) -> ValidationResult {
        NuevoAcopio::validate(self)
    }
}

pub type AcopioDialog = RecordDialog<NuevoAcopio>;

impl AcopioDialog {
    pub fn edit_acopio(&mut self, acopio: &Acopio) {
        self.open_edit(RowId::Int(acopio.id), NuevoAcopio::from_acopio(acopio));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FrontendError;
    use crate::forms::dialog::{confirm_delete, DialogMode};
    use crate::testing::{RecordingSink, RecordingWriter, SinkCall, WriteCall};
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::sync::Arc;

    fn marzo() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    fn dialog() -> (Arc<RecordingWriter>, Arc<RecordingSink>, AcopioDialog) {
        let writer = Arc::new(RecordingWriter::new());
        let sink = Arc::new(RecordingSink::new());
        let dialog = AcopioDialog::new(writer.clone(), sink.clone(), marzo());
        (writer, sink, dialog)
    }

    #[tokio::test]
    async fn test_create_acopio_scenario() {
        let (writer, sink, mut dialog) = dialog();
        let server_row = json!({
            "id": 31, "nombre": "Obra Norte", "fecha": "2024-03-01", "acopiante": 5,
            "acopiante_nombre": "Corralón Sur", "monto": "1000.00", "iva": "210.00",
            "total": "1210.00", "tipo_de_cambio": "1.00", "coeficiente_ajuste": "1.00", "saldo": "1210.00"
        });
        writer.reply_with(Ok(server_row.clone()));

        dialog.open_create();
        dialog.form = NuevoAcopio {
            nombre: "Obra Norte".into(),
            fecha: "2024-03-01".into(),
            acopiante: 5,
            monto: 1000.0,
            iva: 210.0,
            tipo_de_cambio: 1.0,
            coeficiente_ajuste: 1.0,
        };

        let saved = dialog.submit().await.unwrap();
        assert_eq!(saved, server_row);
        assert_eq!(sink.calls(), vec![SinkCall::Add(server_row)]);
        assert!(!dialog.is_open());
        assert_eq!(dialog.form, NuevoAcopio::defaults_for(marzo()));

        match &writer.calls()[0] {
            WriteCall::Create(model, body) => {
                assert_eq!(model, "acopios");
                assert_eq!(body["nombre"], "Obra Norte");
                assert_eq!(body["acopiante"], 5);
            }
            other => panic!("unexpected call {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_invalid_form_sends_nothing() {
        let (writer, sink, mut dialog) = dialog();
        dialog.open_create();
        dialog.form.monto = -1.0;

        let err = dialog.submit().await.unwrap_err();
        assert!(matches!(err, FrontendError::Validation(_)));
        assert!(dialog.errors().has_error("nombre"));
        assert!(dialog.errors().has_error("acopiante"));
        assert!(dialog.errors().has_error("monto"));
        assert!(writer.calls().is_empty());
        assert!(sink.calls().is_empty());
        assert!(dialog.is_open());
    }

    #[tokio::test]
    async fn test_request_error_keeps_dialog_and_input() {
        let (writer, sink, mut dialog) = dialog();
        writer.fail_next(500, "Error interno");
        dialog.open_create();
        dialog.form.nombre = "Obra Sur".into();
        dialog.form.acopiante = 2;

        let err = dialog.submit().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert!(dialog.is_open());
        assert_eq!(dialog.form.nombre, "Obra Sur");
        assert!(sink.calls().is_empty());
    }

    #[tokio::test]
    async fn test_edit_updates_the_row() {
        let (writer, sink, mut dialog) = dialog();
        let acopio: Acopio = serde_json::from_value(json!({
            "id": 8, "fecha": "2024-02-10", "acopiante": 3, "nombre": "Torre B",
            "monto": "500.00", "iva": "105.00", "total": "605.00",
            "tipo_de_cambio": "1", "coeficiente_ajuste": "1.1", "saldo": null
        }))
        .unwrap();
        dialog.edit_acopio(&acopio);
        assert_eq!(dialog.mode(), &DialogMode::Edit(RowId::Int(8)));
        dialog.form.nombre = "Torre B (ampliación)".into();

        dialog.submit().await.unwrap();
        assert!(matches!(&writer.calls()[0], WriteCall::Update(m, RowId::Int(8), _) if m == "acopios"));
        match &sink.calls()[0] {
            SinkCall::Update(item) => assert_eq!(item["nombre"], "Torre B (ampliación)"),
            other => panic!("unexpected call {:?}", other),
        }
        assert_eq!(dialog.mode(), &DialogMode::Create);
    }

    #[tokio::test]
    async fn test_delete_reconciles_only_after_success() {
        let writer = RecordingWriter::new();
        let sink = RecordingSink::new();
        writer.fail_next(404, "No encontrado");
        assert!(confirm_delete(&writer, &sink, "acopios", &RowId::Int(4)).await.is_err());
        assert!(sink.calls().is_empty());

        confirm_delete(&writer, &sink, "acopios", &RowId::Int(4)).await.unwrap();
        assert_eq!(sink.calls(), vec![SinkCall::Delete(RowId::Int(4))]);
    }
}
