//! # Material stockpiles
//!
//! An *acopio* is a credit of materials a supplier holds for a project; each
//! *desacopio* (delivery note) draws it down. This module has the wire types
//! for both, the create/edit form models with their validation rules and the
//! balance arithmetic shown on the list and detail screens.

use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::serde_number::{decimal, optional_decimal};
use crate::validation::ValidationResult;

/// Acopio as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Acopio {
    pub id: i64,
    pub fecha: String,
    #[serde(default)]
    pub acopiante: Option<i64>,
    #[serde(default)]
    pub acopiante_nombre: Option<String>,
    pub nombre: String,
    #[serde(deserialize_with = "decimal", default)]
    pub monto: f64,
    #[serde(deserialize_with = "decimal", default)]
    pub iva: f64,
    #[serde(deserialize_with = "decimal", default)]
    pub total: f64,
    #[serde(deserialize_with = "decimal", default)]
    pub tipo_de_cambio: f64,
    #[serde(deserialize_with = "decimal", default)]
    pub coeficiente_ajuste: f64,
    #[serde(deserialize_with = "optional_decimal", default)]
    pub saldo: Option<f64>,
}

impl Acopio {
    pub fn saldo_status(&self) -> Option<SaldoStatus> {
        self.saldo.map(SaldoStatus::from_saldo)
    }
}

/// Traffic-light state of an acopio's remaining balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaldoStatus {
    Agotado,
    Critico,
    Disponible,
}

impl SaldoStatus {
    pub const EXHAUSTED_AT: f64 = 10_000.0;
    pub const CRITICAL_BELOW: f64 = 20_000.0;

    pub fn from_saldo(saldo: f64) -> Self {
        if saldo <= Self::EXHAUSTED_AT {
            SaldoStatus::Agotado
        } else if saldo < Self::CRITICAL_BELOW {
            SaldoStatus::Critico
        } else {
            SaldoStatus::Disponible
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SaldoStatus::Agotado => "Agotado",
            SaldoStatus::Critico => "Crítico",
            SaldoStatus::Disponible => "Disponible",
        }
    }
}

/// Create / edit form of an acopio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevoAcopio {
    pub nombre: String,
    /// `YYYY-MM-DD`
    pub fecha: String,
    pub acopiante: i64,
    pub monto: f64,
    pub iva: f64,
    pub tipo_de_cambio: f64,
    pub coeficiente_ajuste: f64,
}

impl Default for NuevoAcopio {
    fn default() -> Self {
        Self::defaults_for(Local::now().date_naive())
    }
}

impl NuevoAcopio {
    pub fn defaults_for(today: NaiveDate) -> Self {
        Self {
            nombre: String::new(),
            fecha: today.format("%Y-%m-%d").to_string(),
            acopiante: 0,
            monto: 0.0,
            iva: 0.0,
            tipo_de_cambio: 1.0,
            coeficiente_ajuste: 1.0,
        }
    }

    /// Prefill the edit form from an existing acopio.
    pub fn from_acopio(acopio: &Acopio) -> Self {
        Self {
            nombre: acopio.nombre.clone(),
            fecha: acopio.fecha.clone(),
            acopiante: acopio.acopiante.unwrap_or(0),
            monto: acopio.monto,
            iva: acopio.iva,
            tipo_de_cambio: acopio.tipo_de_cambio,
            coeficiente_ajuste: acopio.coeficiente_ajuste,
        }
    }

    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();
        result
            .require_text("nombre", &self.nombre)
            .require_text("fecha", &self.fecha)
            .min("acopiante", self.acopiante as f64, 1.0)
            .min("monto", self.monto, 0.0)
            .min("iva", self.iva, 0.0)
            .min("tipo_de_cambio", self.tipo_de_cambio, 0.0)
            .min("coeficiente_ajuste", self.coeficiente_ajuste, 0.0);
        result
    }

    pub fn total(&self) -> f64 {
        self.monto + self.iva
    }
}

/// Delivery note as returned by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Desacopio {
    pub id: i64,
    pub fecha_entrega: String,
    #[serde(default)]
    pub remito: Option<String>,
    #[serde(default)]
    pub nro_pedido: Option<String>,
    #[serde(default)]
    pub arquitecto: Option<String>,
    #[serde(default)]
    pub articulo: Option<i64>,
    #[serde(default)]
    pub articulo_codigo: Option<String>,
    #[serde(default)]
    pub articulo_nombre: Option<String>,
    #[serde(deserialize_with = "decimal", default)]
    pub cantidad: f64,
    #[serde(deserialize_with = "decimal", default)]
    pub unitario: f64,
    #[serde(deserialize_with = "decimal", default)]
    pub alicuota: f64,
    #[serde(default)]
    pub obra: Option<i64>,
    #[serde(default)]
    pub obra_nombre: Option<String>,
    #[serde(default)]
    pub conciliado: bool,
    #[serde(default)]
    pub acopio: Option<i64>,
    #[serde(default)]
    pub acopio_nombre: Option<String>,
    #[serde(default)]
    pub presupuesto_cliente_item: Option<i64>,
    #[serde(deserialize_with = "optional_decimal", default)]
    pub monto_total: Option<f64>,
}

impl Desacopio {
    /// Line total including VAT. Prefers the server-computed value.
    pub fn total(&self) -> f64 {
        self.monto_total
            .unwrap_or_else(|| line_total(self.cantidad, self.unitario, self.alicuota))
    }
}

/// `cantidad × unitario × (1 + alicuota / 100)`
pub fn line_total(cantidad: f64, unitario: f64, alicuota: f64) -> f64 {
    cantidad * unitario * (1.0 + alicuota / 100.0)
}

/// Sum of the drawn-down amounts of an acopio's delivery notes.
pub fn total_desacopios(desacopios: &[Desacopio]) -> f64 {
    desacopios
        .iter()
        .map(|d| line_total(d.cantidad, d.unitario, d.alicuota))
        .sum()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NuevoDesacopio {
    pub fecha_entrega: String,
    #[serde(default)]
    pub remito: String,
    #[serde(default)]
    pub nro_pedido: String,
    #[serde(default)]
    pub arquitecto: String,
    pub articulo: i64,
    pub cantidad: f64,
    pub unitario: f64,
    pub alicuota: f64,
    pub obra: Option<i64>,
    pub conciliado: bool,
    pub acopio: i64,
    pub presupuesto_cliente_item: Option<i64>,
}

impl Default for NuevoDesacopio {
    fn default() -> Self {
        Self {
            fecha_entrega: Local::now().date_naive().format("%Y-%m-%d").to_string(),
            remito: String::new(),
            nro_pedido: String::new(),
            arquitecto: String::new(),
            articulo: 0,
            cantidad: 1.0,
            unitario: 0.0,
            alicuota: 21.0,
            obra: None,
            conciliado: false,
            acopio: 0,
            presupuesto_cliente_item: None,
        }
    }
}

impl NuevoDesacopio {
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::valid();
        result
            .require_text("fecha_entrega", &self.fecha_entrega)
            .min("articulo", self.articulo as f64, 1.0)
            .integer("cantidad", self.cantidad)
            .min("unitario", self.unitario, 0.0)
            .min("alicuota", self.alicuota, 0.0)
            .min("acopio", self.acopio as f64, 1.0);
        result
    }

    pub fn total(&self) -> f64 {
        line_total(self.cantidad, self.unitario, self.alicuota)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn marzo() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_acopio_defaults() {
        let form = NuevoAcopio::defaults_for(marzo());
        assert_eq!(form.fecha, "2024-03-01");
        assert_eq!(form.acopiante, 0);
        assert_eq!(form.tipo_de_cambio, 1.0);
        assert_eq!(form.coeficiente_ajuste, 1.0);
        // Defaults are not submittable: name and supplier are missing.
        let result = form.validate();
        assert!(result.has_error("nombre"));
        assert!(result.has_error("acopiante"));
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_acopio_valid_form() {
        let form = NuevoAcopio {
            nombre: "Obra Norte".into(),
            acopiante: 5,
            monto: 1000.0,
            iva: 210.0,
            ..NuevoAcopio::defaults_for(marzo())
        };
        assert!(form.validate().is_valid);
        assert_eq!(form.total(), 1210.0);
    }

    #[test]
    fn test_acopio_negative_amounts() {
        let form = NuevoAcopio {
            nombre: "x".into(),
            acopiante: 1,
            monto: -1.0,
            tipo_de_cambio: -0.5,
            ..NuevoAcopio::defaults_for(marzo())
        };
        let result = form.validate();
        assert!(result.has_error("monto"));
        assert!(result.has_error("tipo_de_cambio"));
        assert!(!result.has_error("iva"));
    }

    #[test]
    fn test_saldo_status_thresholds() {
        assert_eq!(SaldoStatus::from_saldo(0.0), SaldoStatus::Agotado);
        assert_eq!(SaldoStatus::from_saldo(10_000.0), SaldoStatus::Agotado);
        assert_eq!(SaldoStatus::from_saldo(10_000.01), SaldoStatus::Critico);
        assert_eq!(SaldoStatus::from_saldo(19_999.99), SaldoStatus::Critico);
        assert_eq!(SaldoStatus::from_saldo(20_000.0), SaldoStatus::Disponible);
        assert_eq!(SaldoStatus::Critico.label(), "Crítico");
    }

    #[test]
    fn test_acopio_from_backend_json() {
        let acopio: Acopio = serde_json::from_value(json!({
            "id": 3,
            "fecha": "2024-03-01",
            "acopiante": 5,
            "acopiante_nombre": "Corralón Sur",
            "nombre": "Obra Norte",
            "monto": "1000.00",
            "iva": "210.00",
            "total": "1210.00",
            "tipo_de_cambio": "1.0000",
            "coeficiente_ajuste": 1,
            "saldo": "15000.00"
        }))
        .unwrap();
        assert_eq!(acopio.total, 1210.0);
        assert_eq!(acopio.saldo_status(), Some(SaldoStatus::Critico));
        assert_eq!(NuevoAcopio::from_acopio(&acopio).acopiante, 5);
    }

    #[test]
    fn test_desacopio_line_totals() {
        let form = NuevoDesacopio {
            cantidad: 10.0,
            unitario: 100.0,
            ..NuevoDesacopio::default()
        };
        assert!((form.total() - 1210.0).abs() < 1e-9);

        let rows: Vec<Desacopio> = serde_json::from_value(json!([
            {"id": 1, "fecha_entrega": "2024-03-02", "cantidad": 2, "unitario": "50.00", "alicuota": "21.00"},
            {"id": 2, "fecha_entrega": "2024-03-03", "cantidad": 1, "unitario": 100, "alicuota": 0, "monto_total": "100.00"}
        ]))
        .unwrap();
        assert!((total_desacopios(&rows) - 221.0).abs() < 1e-9);
        assert_eq!(rows[1].total(), 100.0);
    }

    #[test]
    fn test_desacopio_validation() {
        let form = NuevoDesacopio {
            cantidad: 2.5,
            unitario: -1.0,
            ..NuevoDesacopio::default()
        };
        let result = form.validate();
        assert!(result.has_error("cantidad"));
        assert!(result.has_error("unitario"));
        assert!(result.has_error("articulo"));
        assert!(result.has_error("acopio"));
        assert!(!result.has_error("alicuota"));
    }
}
