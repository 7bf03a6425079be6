//! Fields whose value follows from a sibling field.
//!
//! Forms call these from the change handler of the source field:
//! picking a cash box fixes the currency, changing a date fixes the accrual
//! period.

use chrono::NaiveDate;
use serde_json::Value;

use shared::tesoreria::{mes_devengado_for, MONEDA_LOCAL};

/// Currency of the selected cash box row; `0` when the box is cleared or
/// has no currency.
pub fn moneda_for_caja(caja: Option<&Value>) -> i64 {
    caja.and_then(|c| c.get("moneda"))
        .and_then(|m| match m {
            Value::Number(n) => n.as_i64(),
            Value::Object(obj) => obj.get("id").and_then(Value::as_i64),
            _ => None,
        })
        .unwrap_or(0)
}

/// Exchange rate to keep after the currency changed: local currency always
/// converts at 1, a foreign one keeps what was typed.
pub fn tipo_de_cambio_for(moneda: i64, current: f64) -> f64 {
    if moneda <= MONEDA_LOCAL {
        1.0
    } else {
        current
    }
}

/// Accrual period (`YYYYMM`) of an ISO date, `None` while the date is
/// incomplete.
pub fn mes_devengado_for_fecha(fecha: &str) -> Option<u32> {
    NaiveDate::parse_from_str(fecha.trim(), "%Y-%m-%d")
        .ok()
        .map(mes_devengado_for)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_moneda_for_caja() {
        assert_eq!(moneda_for_caja(Some(&json!({"id": 2, "caja": "Banco USD", "moneda": 2}))), 2);
        assert_eq!(moneda_for_caja(Some(&json!({"id": 2, "moneda": {"id": 3, "moneda": "EUR"}}))), 3);
        assert_eq!(moneda_for_caja(Some(&json!({"id": 2, "moneda": null}))), 0);
        assert_eq!(moneda_for_caja(None), 0);
    }

    #[test]
    fn test_tipo_de_cambio_resets_for_local_currency() {
        assert_eq!(tipo_de_cambio_for(1, 950.0), 1.0);
        assert_eq!(tipo_de_cambio_for(0, 950.0), 1.0);
        assert_eq!(tipo_de_cambio_for(2, 950.0), 950.0);
    }

    #[test]
    fn test_mes_devengado_for_fecha() {
        assert_eq!(mes_devengado_for_fecha("2024-03-15"), Some(202403));
        assert_eq!(mes_devengado_for_fecha("2024-03"), None);
    }
}
