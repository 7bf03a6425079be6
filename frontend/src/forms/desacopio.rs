//! Delivery notes (desacopios) of an acopio: the create / edit dialog and the
//! balance summary of the acopio detail screen.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use shared::acopios::{total_desacopios, Acopio, Desacopio, NuevoDesacopio, SaldoStatus};
use shared::{Filter, ListQuery, Operator, RowId, SortState, ValidationResult};

use super::dialog::{RecordDialog, RecordForm};
use crate::error::Result;
use crate::services::api::ModelFetcher;

impl RecordForm for NuevoDesacopio {
    const MODEL: &'static str = "desacopios";

    fn defaults(today: NaiveDate) -> Self {
        NuevoDesacopio {
            fecha_entrega: today.format("%Y-%m-%d").to_string(),
            ..NuevoDesacopio::default()
        }
    }

    fn validate(&self) -> ValidationResult {
        NuevoDesacopio::validate(self)
    }
}

pub type DesacopioDialog = RecordDialog<NuevoDesacopio>;

fn form_from(desacopio: &Desacopio) -> NuevoDesacopio {
    NuevoDesacopio {
        fecha_entrega: desacopio.fecha_entrega.clone(),
        remito: desacopio.remito.clone().unwrap_or_default(),
        nro_pedido: desacopio.nro_pedido.clone().unwrap_or_default(),
        arquitecto: desacopio.arquitecto.clone().unwrap_or_default(),
        articulo: desacopio.articulo.unwrap_or(0),
        cantidad: desacopio.cantidad,
        unitario: desacopio.unitario,
        alicuota: desacopio.alicuota,
        obra: desacopio.obra,
        conciliado: desacopio.conciliado,
        acopio: desacopio.acopio.unwrap_or(0),
        presupuesto_cliente_item: desacopio.presupuesto_cliente_item,
    }
}

impl DesacopioDialog {
    /// New delivery note drawing from `acopio_id`.
    pub fn create_for_acopio(&mut self, acopio_id: i64) {
        self.reset();
        self.form.acopio = acopio_id;
        self.open_create();
    }

    pub fn edit_desacopio(&mut self, desacopio: &Desacopio) {
        self.open_edit(RowId::Int(desacopio.id), form_from(desacopio));
    }

    /// Line total of the form as typed.
    pub fn line_total(&self) -> f64 {
        self.form.total()
    }
}

/// Header figures of the acopio detail screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcopioResumen {
    pub total: f64,
    pub desacopiado: f64,
    pub saldo: f64,
    pub estado: SaldoStatus,
}

impl AcopioResumen {
    /// The server's `saldo` wins when present; otherwise it is the total
    /// minus the delivered lines.
    pub fn new(acopio: &Acopio, desacopios: &[Desacopio]) -> Self {
        let desacopiado = total_desacopios(desacopios);
        let saldo = acopio.saldo.unwrap_or(acopio.total - desacopiado);
        Self {
            total: acopio.total,
            desacopiado,
            saldo,
            estado: SaldoStatus::from_saldo(saldo),
        }
    }
}

/// Fetch every delivery note of `acopio` and summarise it.
pub async fn load_resumen(fetcher: &dyn ModelFetcher, acopio: &Acopio) -> Result<(Vec<Desacopio>, AcopioResumen)> {
    let mut query = ListQuery::new(
        vec![Filter::new("acopio", Operator::Eq, acopio.id)],
        SortState::ascending("fecha_entrega"),
        "",
    );
    let mut desacopios = Vec::new();
    loop {
        let page = fetcher.fetch(NuevoDesacopio::MODEL, &query).await?;
        for item in page.items {
            desacopios.push(serde_json::from_value::<Desacopio>(item)?);
        }
        match page.next_cursor {
            Some(next) => query = query.with_page(next),
            None => break,
        }
    }
    debug!(component = "forms", acopio = acopio.id, count = desacopios.len(), "Loaded desacopios");
    let resumen = AcopioResumen::new(acopio, &desacopios);
    Ok((desacopios, resumen))
}
