//! # Treasury contracts
//!
//! Wire types and arithmetic for the treasury flows:
//!
//! - collections against billing certificates ([`CobroCertificado`]),
//! - payment orders over one or more invoices ([`NuevoPagoRequest`]) and the
//!   multi-project allocation the backend may demand for them
//!   ([`AllocationConflict`]),
//! - bank statement reconciliation ([`ConciliacionResponse`],
//!   [`MovimientoBancario`]),
//! - the bulk ledger-entry draft ([`MovimientoDraft`]).

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::value_as_f64;
use crate::serde_number::decimal;
use crate::validation::{ValidationError, ValidationErrorKind, ValidationResult};

pub const NUEVO_PAGO_PATH: &str = "api/tesoreria/pagos/nuevo_pago/";
pub const NUEVO_COBRO_PATH: &str = "api/tesoreria/cobranzas/nuevo_cobro/";
pub const CONCILIACION_PATH: &str = "api/tesoreria/conciliacion_bancaria/";
pub const GASTO_BANCARIO_PATH: &str = "api/tesoreria/conciliacion_bancaria/gasto_bancario/";
pub const PAGO_PLANTILLA_PATH: &str = "api/tesoreria/conciliacion_bancaria/pago_plantilla/";

/// `detail` of the 400 the payment-order endpoint answers with when some
/// invoice must be split across several projects.
pub const MULTI_ALLOCATION_DETAIL: &str = "Imputación múltiple requerida";

/// Cash box. Selecting one fixes the currency of the movement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Caja {
    pub id: i64,
    pub caja: String,
    #[serde(default)]
    pub moneda: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Moneda {
    pub id: i64,
    pub moneda: String,
}

/// Id of the local currency. Any other currency needs an exchange rate.
pub const MONEDA_LOCAL: i64 = 1;

// ---------------------------------------------------------------------------
// Certificates and collections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificado {
    pub id: i64,
    #[serde(default)]
    pub numero: Option<String>,
    #[serde(default)]
    pub fecha: Option<String>,
    #[serde(default)]
    pub cliente_proyecto: Option<Value>,
    #[serde(deserialize_with = "decimal", default)]
    pub monto: f64,
    #[serde(deserialize_with = "decimal", default)]
    pub saldo: f64,
}

/// What is left of a certificate after a collection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "estado", content = "monto", rename_all = "snake_case")]
pub enum BalanceOutlook {
    Remaining(f64),
    Settled,
    ExceededBy(f64),
}

impl BalanceOutlook {
    pub fn from_final_balance(saldo_final: f64) -> Self {
        if saldo_final.abs() < 0.005 {
            BalanceOutlook::Settled
        } else if saldo_final > 0.0 {
            BalanceOutlook::Remaining(saldo_final)
        } else {
            BalanceOutlook::ExceededBy(-saldo_final)
        }
    }
}

/// New collection (REC) against a certificate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CobroCertificado {
    pub fecha: String,
    pub caja: String,
    pub cliente_proyecto: String,
    pub certificado: Option<i64>,
    pub documento: Option<i64>,
    pub monto: f64,
    pub observacion: String,
    pub moneda: i64,
    pub tipo_de_cambio: f64,
}

impl CobroCertificado {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            fecha: today.format("%Y-%m-%d").to_string(),
            caja: String::new(),
            cliente_proyecto: String::new(),
            certificado: None,
            documento: None,
            monto: 0.0,
            observacion: String::new(),
            moneda: MONEDA_LOCAL,
            tipo_de_cambio: 1.0,
        }
    }

    /// `saldo − monto × tipo_de_cambio`
    pub fn saldo_final(&self, certificado: &Certificado) -> f64 {
        certificado.saldo - self.monto * self.tipo_de_cambio
    }

    pub fn outlook(&self, certificado: &Certificado) -> BalanceOutlook {
        BalanceOutlook::from_final_balance(self.saldo_final(certificado))
    }

    pub fn needs_exchange_rate(&self) -> bool {
        self.moneda > MONEDA_LOCAL
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();
        result
            .require_text("fecha", &self.fecha)
            .require_text("caja", &self.caja)
            .require_text("cliente_proyecto", &self.cliente_proyecto)
            .max("caja", self.caja.chars().count() as f64, 50.0)
            .max("cliente_proyecto", self.cliente_proyecto.chars().count() as f64, 50.0)
            .min("monto", self.monto, 1.0)
            .min("moneda", self.moneda as f64, 1.0);
        if self.needs_exchange_rate() {
            result.min("tipo_de_cambio", self.tipo_de_cambio, 0.0);
        }
        result
    }
}

// ---------------------------------------------------------------------------
// Payment orders
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TipoMedioPago {
    Efectivo,
    Transferencia,
    Echeq,
    Tarjeta,
    #[serde(rename = "Retención")]
    Retencion,
}

/// One means of payment of a payment order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedioPago {
    pub tipo: TipoMedioPago,
    pub caja: String,
    /// `YYYY-MM-DD`
    pub fecha: String,
    pub monto: f64,
    pub pdf_file: Option<String>,
    pub tipo_de_cambio: f64,
    pub tipo_retencion: Option<String>,
    pub numero_certificado: Option<String>,
}

impl MedioPago {
    /// Cash box used when none is chosen.
    pub const CAJA_POR_DEFECTO: &'static str = "Facturas";

    pub fn new(tipo: TipoMedioPago, fecha: NaiveDate, monto: f64) -> Self {
        Self {
            tipo,
            caja: Self::CAJA_POR_DEFECTO.to_string(),
            fecha: fecha.format("%Y-%m-%d").to_string(),
            monto,
            pdf_file: None,
            tipo_de_cambio: 1.0,
            tipo_retencion: None,
            numero_certificado: None,
        }
    }

    pub fn with_caja(mut self, caja: Option<&str>) -> Self {
        self.caja = caja
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(Self::CAJA_POR_DEFECTO)
            .to_string();
        self
    }

    pub fn with_tipo_de_cambio(mut self, tipo_de_cambio: Option<f64>) -> Self {
        self.tipo_de_cambio = tipo_de_cambio.filter(|t| *t != 0.0).unwrap_or(1.0);
        self
    }

    /// Amount in local currency.
    pub fn monto_local(&self) -> f64 {
        self.monto * self.tipo_de_cambio
    }
}

/// Per-invoice, per-project split of a payment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputacionMultiple {
    pub factura_id: i64,
    pub cliente_proyecto: Option<i64>,
    pub monto: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevoPagoRequest {
    pub facturas: Vec<i64>,
    pub medios_pago: Vec<MedioPago>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub imputaciones_multiples: Vec<ImputacionMultiple>,
}

impl NuevoPagoRequest {
    pub fn new(facturas: Vec<i64>, medios_pago: Vec<MedioPago>) -> Self {
        Self {
            facturas,
            medios_pago,
            imputaciones_multiples: Vec::new(),
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();
        if self.facturas.is_empty() {
            result.push(ValidationError::new("facturas", ValidationErrorKind::Required));
        }
        for (i, medio) in self.medios_pago.iter().enumerate() {
            result.min(&format!("medios_pago.{}.monto", i), medio.monto, 0.0);
        }
        result
    }

    pub fn total_medios_pago(&self) -> f64 {
        self.medios_pago.iter().map(MedioPago::monto_local).sum()
    }
}

/// Sum of the `total` of the selected invoices.
pub fn total_facturas(facturas: &[Value]) -> f64 {
    facturas
        .iter()
        .filter_map(|f| f.get("total").and_then(value_as_f64))
        .sum()
}

/// Invoice that must be split across projects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacturaVarios {
    pub id: i64,
    #[serde(default)]
    pub numero: String,
    #[serde(default)]
    pub proveedor: String,
    #[serde(deserialize_with = "decimal", default)]
    pub total: f64,
    #[serde(deserialize_with = "decimal", default)]
    pub neto: f64,
    #[serde(deserialize_with = "decimal", default)]
    pub iva: f64,
}

impl FacturaVarios {
    /// Amount the allocation of this invoice must add up to.
    pub fn allocatable(&self) -> f64 {
        self.neto + self.iva
    }
}

/// Body of the 400 asking for a multi-project allocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationConflict {
    pub detail: String,
    #[serde(default)]
    pub facturas_varios: Vec<FacturaVarios>,
}

impl AllocationConflict {
    /// Recognise the conflict in an error body.
    pub fn from_body(body: &Value) -> Option<Self> {
        if body.get("detail").and_then(Value::as_str) != Some(MULTI_ALLOCATION_DETAIL) {
            return None;
        }
        serde_json::from_value(body.clone()).ok()
    }

    /// One row per invoice carrying its full amount, project unset.
    pub fn default_allocation(&self) -> Vec<ImputacionMultiple> {
        self.facturas_varios
            .iter()
            .map(|f| ImputacionMultiple {
                factura_id: f.id,
                cliente_proyecto: None,
                monto: f.allocatable(),
            })
            .collect()
    }

    /// Ids of the invoices whose allocation does not add up to their amount
    /// (to the cent).
    pub fn unbalanced(&self, imputaciones: &[ImputacionMultiple]) -> Vec<i64> {
        self.facturas_varios
            .iter()
            .filter(|f| {
                let allocated: f64 = imputaciones
                    .iter()
                    .filter(|i| i.factura_id == f.id)
                    .map(|i| i.monto)
                    .sum();
                (f.allocatable() - allocated).abs() >= 0.01
            })
            .map(|f| f.id)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Bank reconciliation
// ---------------------------------------------------------------------------

/// One line of an uploaded bank statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MovimientoBancario {
    pub id: i64,
    pub cod_concepto: String,
    pub concepto: String,
    pub nro_cheque: String,
    pub debito: String,
    pub credito: String,
    pub nombre: String,
    pub nro_doc: String,
    /// `d/m/yyyy` as printed by the bank.
    pub fecha: String,
    pub tipo: String,
    pub sub_tipo: String,
    pub ya_cargado: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iva: Option<String>,
}

/// Parse a bank amount (`-197301,75`, `1.234,56`, `100000`).
pub fn parse_bank_amount(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let normalised = if raw.contains(',') {
        raw.replace('.', "").replace(',', ".")
    } else {
        raw.to_string()
    };
    normalised.parse::<f64>().ok()
}

/// `3/2/2025` → `2025-02-03`
pub fn bank_date_to_iso(fecha: &str) -> Option<String> {
    NaiveDate::parse_from_str(fecha.trim(), "%d/%m/%Y")
        .ok()
        .map(|d| d.format("%Y-%m-%d").to_string())
}

impl MovimientoBancario {
    /// Absolute amount of the movement: the credit if present, else the debit.
    pub fn monto(&self) -> f64 {
        parse_bank_amount(&self.credito)
            .or_else(|| parse_bank_amount(&self.debito))
            .map(f64::abs)
            .unwrap_or(0.0)
    }

    pub fn fecha_iso(&self) -> Option<String> {
        bank_date_to_iso(&self.fecha)
    }

    /// Copy with the date in ISO form, as the posting endpoints expect.
    /// Dates already in ISO form are left as they are.
    pub fn with_iso_date(&self) -> Self {
        let mut movimiento = self.clone();
        if let Some(iso) = self.fecha_iso() {
            movimiento.fecha = iso;
        }
        movimiento
    }

    /// Money-market fund movement: a debit subscribes, a credit redeems.
    pub fn fci_movimiento(&self) -> Option<FciMovimiento> {
        let fecha = self.fecha_iso().unwrap_or_else(|| self.fecha.clone());
        if let Some(monto) = parse_bank_amount(&self.debito) {
            return Some(FciMovimiento {
                fecha,
                tipo: FciTipo::Suscripcion,
                monto: monto.abs(),
            });
        }
        parse_bank_amount(&self.credito).map(|monto| FciMovimiento {
            fecha,
            tipo: FciTipo::Rescate,
            monto: monto.abs(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovimientoCategoria {
    Transferencias,
    Echeqs,
    GastosBancarios,
    Pagos,
    Fci,
    Iva,
}

/// Categorised statement as returned by the upload endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ConciliacionResponse {
    pub transferencias: Vec<MovimientoBancario>,
    pub echeqs: Vec<MovimientoBancario>,
    pub gastos_bancarios: Vec<MovimientoBancario>,
    pub pagos: Vec<MovimientoBancario>,
    pub fci: Vec<MovimientoBancario>,
    pub iva: Vec<MovimientoBancario>,
}

impl ConciliacionResponse {
    pub fn category(&self, categoria: MovimientoCategoria) -> &[MovimientoBancario] {
        match categoria {
            MovimientoCategoria::Transferencias => &self.transferencias,
            MovimientoCategoria::Echeqs => &self.echeqs,
            MovimientoCategoria::GastosBancarios => &self.gastos_bancarios,
            MovimientoCategoria::Pagos => &self.pagos,
            MovimientoCategoria::Fci => &self.fci,
            MovimientoCategoria::Iva => &self.iva,
        }
    }

    fn category_mut(&mut self, categoria: MovimientoCategoria) -> &mut Vec<MovimientoBancario> {
        match categoria {
            MovimientoCategoria::Transferencias => &mut self.transferencias,
            MovimientoCategoria::Echeqs => &mut self.echeqs,
            MovimientoCategoria::GastosBancarios => &mut self.gastos_bancarios,
            MovimientoCategoria::Pagos => &mut self.pagos,
            MovimientoCategoria::Fci => &mut self.fci,
            MovimientoCategoria::Iva => &mut self.iva,
        }
    }

    /// Flag a movement as already posted. Returns whether it was found.
    pub fn mark_loaded(&mut self, categoria: MovimientoCategoria, id: i64) -> bool {
        match self.category_mut(categoria).iter_mut().find(|m| m.id == id) {
            Some(movimiento) => {
                movimiento.ya_cargado = true;
                true
            }
            None => false,
        }
    }

    /// Payments not posted yet.
    pub fn pending_pagos(&self) -> impl Iterator<Item = &MovimientoBancario> {
        self.pagos.iter().filter(|p| !p.ya_cargado)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PagoPlantillaRequest {
    pub movimiento: MovimientoBancario,
    pub plantilla_id: i64,
    pub monto: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FciTipo {
    Suscripcion,
    Rescate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FciMovimiento {
    pub fecha: String,
    pub tipo: FciTipo,
    pub monto: f64,
}

// ---------------------------------------------------------------------------
// Bulk ledger entry
// ---------------------------------------------------------------------------

/// Accrual period of a date as a `YYYYMM` number.
pub fn mes_devengado_for(fecha: NaiveDate) -> u32 {
    fecha.year() as u32 * 100 + fecha.month()
}

/// One row of the bulk ledger-entry form. Relation fields hold ids, `0`
/// meaning "not chosen".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovimientoDraft {
    pub fecha: String,
    pub mes_devengado: u32,
    #[serde(default)]
    pub unidad_de_negocio: i64,
    #[serde(default)]
    pub cliente_proyecto: i64,
    #[serde(default)]
    pub proveedor: i64,
    #[serde(default)]
    pub imputacion: i64,
    #[serde(default)]
    pub observacion: String,
    #[serde(default)]
    pub presupuesto: i64,
    #[serde(default)]
    pub neto: f64,
    #[serde(default)]
    pub iva: f64,
}

impl MovimientoDraft {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            fecha: today.format("%Y-%m-%d").to_string(),
            mes_devengado: mes_devengado_for(today),
            unidad_de_negocio: 0,
            cliente_proyecto: 0,
            proveedor: 0,
            imputacion: 0,
            observacion: String::new(),
            presupuesto: 0,
            neto: 0.0,
            iva: 0.0,
        }
    }

    /// Change the date and re-derive the accrual period from it.
    pub fn set_fecha(&mut self, fecha: &str) {
        self.fecha = fecha.to_string();
        if let Ok(date) = NaiveDate::parse_from_str(fecha, "%Y-%m-%d") {
            self.mes_devengado = mes_devengado_for(date);
        }
    }

    /// Validate the row; error fields are prefixed `movimientos.<index>.`.
    pub fn validate_into(&self, index: usize, result: &mut ValidationResult) {
        let key = |field: &str| format!("movimientos.{}.{}", index, field);
        result
            .require_text(&key("fecha"), &self.fecha)
            .digits(&key("mes_devengado"), &self.mes_devengado.to_string(), 6)
            .require_text(&key("observacion"), &self.observacion)
            .min(&key("neto"), self.neto, 0.0)
            .min(&key("iva"), self.iva, 0.0);
    }

    /// Ledger-entry body. Unset relations are sent as `null`.
    pub fn to_payload(&self) -> Value {
        let relation = |id: i64| if id > 0 { Value::from(id) } else { Value::Null };
        serde_json::json!({
            "fecha_reg": self.fecha,
            "añomes_imputacion": self.mes_devengado,
            "unidad_de_negocio": relation(self.unidad_de_negocio),
            "cliente_proyecto": relation(self.cliente_proyecto),
            "proveedor": relation(self.proveedor),
            "imputacion": relation(self.imputacion),
            "presupuesto": relation(self.presupuesto),
            "observacion": self.observacion,
            "monto_gasto_ingreso_neto": self.neto,
            "iva_gasto_ingreso": self.iva,
        })
    }
}
