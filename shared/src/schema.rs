//! # Model metadata
//!
//! Every list screen is driven by a model name. This module resolves that
//! name, once, into a [`ModelSchema`]: the endpoint the rows come from, the
//! columns to render (with their labels and how to format each cell), the
//! fields the user may filter on and the default sort column.
//!
//! The tables are static. Relation fields that the backend exposes through a
//! related display column (the supplier's trade name, the project name, ...)
//! carry a `lookup` suffix so that sorting and text filtering target the
//! readable column instead of the foreign key.
//!
//! ## Rendering
//!
//! [`ColumnDescriptor::render`] turns a raw JSON cell into display text:
//! money with Argentine separators (`1.234,56`), dates as `dd/mm/yyyy`,
//! booleans as `Sí`/`No`.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use crate::filters::{FieldType, Operator};

/// A choice of a select-type filter field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: &'static str,
    pub label: &'static str,
}

/// A field the user may filter a model on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FilterField {
    pub id: &'static str,
    pub label: &'static str,
    pub field_type: FieldType,
    /// Related display column, e.g. `__nombre_fantasia_pila`.
    pub lookup: Option<&'static str>,
    pub options: &'static [SelectOption],
}

impl FilterField {
    pub const fn new(id: &'static str, label: &'static str, field_type: FieldType) -> Self {
        Self {
            id,
            label,
            field_type,
            lookup: None,
            options: &[],
        }
    }

    pub const fn with_lookup(self, lookup: &'static str) -> Self {
        Self {
            lookup: Some(lookup),
            ..self
        }
    }

    pub const fn with_options(self, options: &'static [SelectOption]) -> Self {
        Self { options, ..self }
    }

    /// Path used in the query key for `operator`.
    pub fn path_for(&self, operator: Operator) -> String {
        match self.lookup {
            Some(lookup) if operator.uses_display_lookup() => format!("{}{}", self.id, lookup),
            _ => self.id.to_string(),
        }
    }

    pub fn allows(&self, operator: Operator) -> bool {
        self.field_type.allows(operator)
    }

    /// Whether `path` (as found in a query key) refers to this field.
    pub fn matches_path(&self, path: &str) -> bool {
        if path == self.id {
            return true;
        }
        match self.lookup {
            Some(lookup) => path
                .strip_prefix(self.id)
                .map_or(false, |rest| rest == lookup),
            None => false,
        }
    }
}

/// How a column's cells are formatted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    Text,
    Date,
    Money,
    Number,
    Boolean,
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnDescriptor {
    pub field: &'static str,
    pub label: &'static str,
    pub kind: ColumnKind,
    pub lookup: Option<&'static str>,
}

impl ColumnDescriptor {
    pub const fn new(field: &'static str, label: &'static str, kind: ColumnKind) -> Self {
        Self {
            field,
            label,
            kind,
            lookup: None,
        }
    }

    pub const fn with_lookup(self, lookup: &'static str) -> Self {
        Self {
            lookup: Some(lookup),
            ..self
        }
    }

    /// `ordering=` value for this column.
    pub fn sort_path(&self) -> String {
        match self.lookup {
            Some(lookup) => format!("{}{}", self.field, lookup),
            None => self.field.to_string(),
        }
    }

    /// Display text of this column's cell in `row`.
    pub fn render(&self, row: &Value) -> String {
        let cell = row.get(self.field).unwrap_or(&Value::Null);
        match cell {
            Value::Null => String::new(),
            Value::Bool(b) => (if *b { "Sí" } else { "No" }).to_string(),
            Value::Object(map) => ["nombre", "cliente_proyecto", "nombre_fantasia_pila", "razon_social"]
                .iter()
                .find_map(|key| map.get(*key).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| cell.to_string()),
            _ => match self.kind {
                ColumnKind::Money => value_as_f64(cell)
                    .map(format_money)
                    .unwrap_or_else(|| plain(cell)),
                ColumnKind::Percent => value_as_f64(cell)
                    .map(|n| format!("{}%", trim_number(n)))
                    .unwrap_or_else(|| plain(cell)),
                ColumnKind::Number => value_as_f64(cell)
                    .map(trim_number)
                    .unwrap_or_else(|| plain(cell)),
                ColumnKind::Date => cell
                    .as_str()
                    .and_then(format_date)
                    .unwrap_or_else(|| plain(cell)),
                ColumnKind::Boolean => match cell.as_str() {
                    Some("true") => "Sí".to_string(),
                    Some("false") => "No".to_string(),
                    _ => plain(cell),
                },
                ColumnKind::Text => plain(cell),
            },
        }
    }
}

fn plain(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn trim_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Numbers arrive either as JSON numbers or as decimal strings (`"1234.50"`).
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// `1234.5` → `1.234,50`
pub fn format_money(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, ch) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("{}{},{:02}", if negative { "-" } else { "" }, grouped, fraction)
}

/// ISO date (`2024-03-01`, optionally with a time part) → `01/03/2024`.
pub fn format_date(iso: &str) -> Option<String> {
    let date_part = iso.get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .ok()
        .map(|d| d.format("%d/%m/%Y").to_string())
}

/// Everything a list screen needs to know about one model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ModelSchema {
    pub name: &'static str,
    /// Path relative to the API base URL, with trailing slash.
    pub endpoint: &'static str,
    pub columns: &'static [ColumnDescriptor],
    pub filter_fields: &'static [FilterField],
    pub default_sort: &'static str,
}

impl ModelSchema {
    /// Endpoint for create/update/delete. Delivery notes are written through
    /// a separate CRUD route.
    pub fn write_endpoint(&self) -> &'static str {
        match self.name {
            "desacopios" => "api/acopios/desacopios-crud/",
            _ => self.endpoint,
        }
    }

    pub fn filter_field(&self, id: &str) -> Option<&'static FilterField> {
        self.filter_fields.iter().find(|f| f.id == id)
    }

    /// Filter field addressed by a query-key path (`proveedor` or
    /// `proveedor__nombre_fantasia_pila`).
    pub fn filter_field_by_path(&self, path: &str) -> Option<&'static FilterField> {
        self.filter_fields.iter().find(|f| f.matches_path(path))
    }

    pub fn column(&self, field: &str) -> Option<&'static ColumnDescriptor> {
        self.columns.iter().find(|c| c.field == field)
    }

    /// `ordering=` path for a field: the column's related display column when
    /// it has one, else the field itself.
    pub fn sort_path(&self, field: &str) -> String {
        self.column(field)
            .map(ColumnDescriptor::sort_path)
            .unwrap_or_else(|| field.to_string())
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.field).collect()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.label).collect()
    }

    /// Render every column of `row`, in column order.
    pub fn render_row(&self, row: &Value) -> Vec<String> {
        self.columns.iter().map(|c| c.render(row)).collect()
    }
}

/// Resolve a model name.
pub fn resolve(model: &str) -> Option<&'static ModelSchema> {
    MODELS.iter().find(|m| m.name == model)
}

pub fn endpoint_for(model: &str) -> Option<&'static str> {
    resolve(model).map(|m| m.endpoint)
}

pub fn model_names() -> impl Iterator<Item = &'static str> {
    MODELS.iter().map(|m| m.name)
}

// Related display columns.
pub const PROVEEDOR_LOOKUP: &str = "__nombre_fantasia_pila";
pub const CLIENTE_PROYECTO_LOOKUP: &str = "__cliente_proyecto";
pub const IMPUTACION_LOOKUP: &str = "__imputacion";
pub const UNIDAD_DE_NEGOCIO_LOOKUP: &str = "__unidad_de_negocio";
pub const CAJA_LOOKUP: &str = "__caja";

use ColumnKind as K;
use FieldType as F;

const fn col(field: &'static str, label: &'static str, kind: ColumnKind) -> ColumnDescriptor {
    ColumnDescriptor::new(field, label, kind)
}

const fn field(id: &'static str, label: &'static str, field_type: FieldType) -> FilterField {
    FilterField::new(id, label, field_type)
}

pub const ESTADO_PRESUPUESTO_OPTIONS: &[SelectOption] = &[
    SelectOption { value: "1", label: "Cargado" },
    SelectOption { value: "2", label: "Aprobado" },
    SelectOption { value: "3", label: "Completo" },
    SelectOption { value: "4", label: "Excedido" },
    SelectOption { value: "5", label: "Ampliado" },
    SelectOption { value: "99", label: "Rechazado" },
];

const PRESUPUESTOS: ModelSchema = ModelSchema {
    name: "presupuestos",
    endpoint: "api/tesoreria/presupuestos/",
    columns: &[
        col("fecha", "Fecha", K::Date),
        col("proveedor", "Proveedor", K::Text).with_lookup(PROVEEDOR_LOOKUP),
        col("cliente_proyecto", "Cliente/Proyecto", K::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        col("observacion", "Observación", K::Text),
        col("monto", "Monto", K::Money),
        col("saldo", "Saldo", K::Money),
        col("estado", "Estado", K::Text),
        col("aprobado", "Aprobado", K::Boolean),
    ],
    filter_fields: &[
        field("proveedor", "Proveedor", F::Text).with_lookup(PROVEEDOR_LOOKUP),
        field("estado", "Estado", F::Select).with_options(ESTADO_PRESUPUESTO_OPTIONS),
        field("cliente_proyecto", "Cliente/Proyecto", F::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        field("observacion", "Observación", F::Text),
        field("monto", "Monto", F::Number),
        field("saldo", "Saldo", F::Number),
        field("fecha", "Fecha", F::Date),
        field("aprobado", "Aprobado", F::Boolean),
    ],
    default_sort: "fecha",
};

const REGISTROS: ModelSchema = ModelSchema {
    name: "registros",
    endpoint: "api/tesoreria/registros/",
    columns: &[
        col("caja", "Caja", K::Text).with_lookup(CAJA_LOOKUP),
        col("tipo_reg", "Tipo reg.", K::Text),
        col("fecha_reg", "Fecha reg.", K::Date),
        col("unidad_de_negocio", "Unidad de negocio", K::Text).with_lookup(UNIDAD_DE_NEGOCIO_LOOKUP),
        col("cliente_proyecto", "Cliente/Proyecto", K::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        col("proveedor", "Contrapartida", K::Text).with_lookup(PROVEEDOR_LOOKUP),
        col("imputacion", "Imputación", K::Text).with_lookup(IMPUTACION_LOOKUP),
        col("observacion", "Observación", K::Text),
        col("presupuesto", "Presupuesto", K::Text),
        col("monto_gasto_ingreso_neto", "Neto", K::Money),
        col("iva_gasto_ingreso", "IVA", K::Money),
        col("total_gasto_ingreso", "Total Gasto/Ingreso", K::Money),
        col("monto_op_rec", "Monto OP/REC", K::Money),
        col("total_gasto_ingreso_usd", "Total Gasto/Ingreso USD", K::Money),
        col("monto_op_rec_usd", "Monto OP/REC USD", K::Money),
        col("saldo_acumulado", "Saldo caja", K::Money),
    ],
    filter_fields: &[
        field("caja", "Caja", F::Text).with_lookup(CAJA_LOOKUP),
        field("tipo_reg", "Tipo reg.", F::Text),
        field("fecha_reg", "Fecha reg.", F::Date),
        field("unidad_de_negocio", "Unidad de negocio", F::Text).with_lookup(UNIDAD_DE_NEGOCIO_LOOKUP),
        field("cliente_proyecto", "Cliente/Proyecto", F::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        field("proveedor", "Proveedor", F::Text).with_lookup(PROVEEDOR_LOOKUP),
        field("imputacion", "Imputación", F::Text).with_lookup(IMPUTACION_LOOKUP),
        field("observacion", "Observación", F::Text),
        field("monto_gasto_ingreso_neto", "Neto", F::Number),
        field("iva_gasto_ingreso", "IVA", F::Number),
        field("monto_op_rec", "Monto OP/REC", F::Number),
        field("saldo_caja", "Saldo caja", F::Number),
        field("presupuesto", "Presupuesto", F::Relation),
    ],
    default_sort: "fecha_reg",
};

const DOCUMENTOS: ModelSchema = ModelSchema {
    name: "documentos",
    endpoint: "api/iva/",
    columns: &[
        col("tipo_documento", "Tipo", K::Text),
        col("fecha_documento", "Fecha", K::Date),
        col("proveedor", "Proveedor", K::Text).with_lookup(PROVEEDOR_LOOKUP),
        col("receptor", "Receptor", K::Text),
        col("serie", "Serie", K::Text),
        col("numero", "N°", K::Text),
        col("añomes_imputacion_gasto", "Mes devengado", K::Text),
        col("unidad_de_negocio", "Unidad de negocio", K::Text).with_lookup(UNIDAD_DE_NEGOCIO_LOOKUP),
        col("cliente_proyecto", "Cliente/Proyecto", K::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        col("imputacion", "Imputación", K::Text).with_lookup(IMPUTACION_LOOKUP),
        col("concepto", "Concepto", K::Text),
        col("comentario", "Comentario", K::Text),
        col("moneda", "Moneda", K::Text),
        col("total", "Total", K::Money),
    ],
    filter_fields: &[
        field("proveedor", "Proveedor", F::Text).with_lookup(PROVEEDOR_LOOKUP),
        field("tipo_documento", "Tipo Documento", F::Text),
        field("fecha_documento", "Fecha Documento", F::Date),
        field("receptor", "Receptor", F::Text),
        field("serie", "Serie", F::Text),
        field("numero", "Número", F::Text),
        field("añomes_imputacion_gasto", "Mes de devengado", F::Text),
        field("unidad_de_negocio", "Unidad de negocio", F::Text).with_lookup(UNIDAD_DE_NEGOCIO_LOOKUP),
        field("cliente_proyecto", "Cliente/Proyecto", F::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        field("imputacion", "Imputación", F::Text).with_lookup(IMPUTACION_LOOKUP),
        field("concepto", "Concepto", F::Text),
        field("comentario", "Comentario", F::Text),
        field("neto", "Neto", F::Number),
        field("iva", "IVA", F::Number),
        field("moneda", "Moneda", F::Text),
        field("tipo_de_cambio", "Tipo de cambio", F::Number),
        field("total", "Total", F::Number),
        field("imputado", "Imputado", F::Boolean),
    ],
    default_sort: "fecha_documento",
};

const COBRANZAS: ModelSchema = ModelSchema {
    name: "cobranzas",
    endpoint: "api/tesoreria/cobranzas/",
    columns: &[
        col("caja", "Caja", K::Text).with_lookup(CAJA_LOOKUP),
        col("tipo_reg", "Tipo", K::Text),
        col("fecha_reg", "Fecha", K::Date),
        col("unidad_de_negocio", "Unidad de negocio", K::Text).with_lookup(UNIDAD_DE_NEGOCIO_LOOKUP),
        col("cliente_proyecto", "Cliente/Proyecto", K::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        col("imputacion", "Imputación", K::Text).with_lookup(IMPUTACION_LOOKUP),
        col("observacion", "Observación", K::Text),
        col("monto_gasto_ingreso_neto", "Neto", K::Money),
        col("iva_gasto_ingreso", "IVA", K::Money),
        col("monto_op_rec", "Monto OP/REC", K::Money),
    ],
    filter_fields: &[
        field("caja", "Caja", F::Text).with_lookup(CAJA_LOOKUP),
        field("tipo_reg", "Tipo reg.", F::Text),
        field("fecha_reg", "Fecha reg.", F::Date),
        field("unidad_de_negocio", "Unidad de negocio", F::Text).with_lookup(UNIDAD_DE_NEGOCIO_LOOKUP),
        field("cliente_proyecto", "Cliente/Proyecto", F::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        field("imputacion", "Imputación", F::Text).with_lookup(IMPUTACION_LOOKUP),
        field("observacion", "Observación", F::Text),
        field("monto_gasto_ingreso_neto", "Neto", F::Number),
        field("iva_gasto_ingreso", "IVA", F::Number),
        field("monto_op_rec", "Monto OP/REC", F::Number),
    ],
    default_sort: "fecha_reg",
};

const DOLAR_MEP: ModelSchema = ModelSchema {
    name: "dolar_mep",
    endpoint: "api/tesoreria/mep/",
    columns: &[
        col("fecha", "Fecha", K::Date),
        col("compra", "Compra", K::Money),
        col("venta", "Venta", K::Money),
    ],
    filter_fields: &[
        field("fecha", "Fecha", F::Date),
        field("compra", "Compra", F::Number),
        field("venta", "Venta", F::Number),
    ],
    default_sort: "fecha",
};

const PAGOS: ModelSchema = ModelSchema {
    name: "pagos",
    endpoint: "api/tesoreria/pagos/",
    columns: &[
        col("caja", "Caja", K::Text).with_lookup(CAJA_LOOKUP),
        col("fecha_pago", "Fecha", K::Date),
        col("cliente_proyecto", "Obra", K::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        col("proveedor", "Proveedor", K::Text).with_lookup(PROVEEDOR_LOOKUP),
        col("observacion", "Concepto", K::Text),
        col("monto", "Monto", K::Money),
    ],
    filter_fields: &[
        field("caja", "Caja", F::Text).with_lookup(CAJA_LOOKUP),
        field("fecha_reg", "Fecha reg.", F::Date),
        field("proveedor", "Proveedor", F::Text).with_lookup(PROVEEDOR_LOOKUP),
        field("imputacion", "Imputación", F::Text).with_lookup(IMPUTACION_LOOKUP),
        field("observacion", "Observación", F::Text),
        field("monto_op_rec", "Monto OP/REC", F::Number),
        field("moneda_display", "Moneda", F::Text),
    ],
    default_sort: "fecha_pago",
};

const PERSONA_COLUMNS: &[ColumnDescriptor] = &[
    col("razon_social", "Razón Social", K::Text),
    col("nombre_fantasia_pila", "Nombre Fantasía", K::Text),
    col("cnpj", "CNPJ", K::Text),
];

const PERSONA_FIELDS: &[FilterField] = &[
    field("razon_social", "Razón Social", F::Text),
    field("nombre_fantasia_pila", "Nombre Fantasía", F::Text),
    field("cnpj", "CNPJ", F::Text),
];

const RECEPTORES: ModelSchema = ModelSchema {
    name: "receptores",
    endpoint: "api/iva/receptores/",
    columns: PERSONA_COLUMNS,
    filter_fields: PERSONA_FIELDS,
    default_sort: "razon_social",
};

const PROVEEDORES: ModelSchema = ModelSchema {
    name: "proveedores",
    endpoint: "api/iva/proveedores/",
    columns: PERSONA_COLUMNS,
    filter_fields: PERSONA_FIELDS,
    default_sort: "nombre_fantasia_pila",
};

const CLIENTES_PROYECTOS: ModelSchema = ModelSchema {
    name: "clientes_proyectos",
    endpoint: "api/iva/clientes_proyectos/",
    columns: &[col("cliente_proyecto", "Cliente/Proyecto", K::Text)],
    filter_fields: &[field("cliente_proyecto", "Cliente/Proyecto", F::Text)],
    default_sort: "cliente_proyecto",
};

const PLANTILLAS_REGISTROS: ModelSchema = ModelSchema {
    name: "plantillas_registros",
    endpoint: "api/tesoreria/plantillas/",
    columns: &[
        col("nombre", "Nombre", K::Text),
        col("tipo_reg", "Tipo reg.", K::Text),
        col("unidad_de_negocio", "Unidad de negocio", K::Text).with_lookup(UNIDAD_DE_NEGOCIO_LOOKUP),
        col("cliente_proyecto", "Cliente/Proyecto", K::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        col("proveedor", "Proveedor", K::Text).with_lookup(PROVEEDOR_LOOKUP),
        col("imputacion", "Imputación", K::Text).with_lookup(IMPUTACION_LOOKUP),
        col("observacion", "Observación", K::Text),
    ],
    filter_fields: &[
        field("nombre", "Nombre", F::Text),
        field("tipo_reg", "Tipo reg.", F::Text),
        field("unidad_de_negocio", "Unidad de negocio", F::Text).with_lookup(UNIDAD_DE_NEGOCIO_LOOKUP),
        field("cliente_proyecto", "Cliente/Proyecto", F::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        field("imputacion", "Imputación", F::Text).with_lookup(IMPUTACION_LOOKUP),
        field("observacion", "Observación", F::Text),
    ],
    default_sort: "nombre",
};

const DESACOPIOS: ModelSchema = ModelSchema {
    name: "desacopios",
    endpoint: "api/acopios/desacopios/",
    columns: &[
        col("fecha_entrega", "Fecha entrega", K::Date),
        col("remito", "Remito", K::Text),
        col("nro_pedido", "N° Pedido", K::Text),
        col("arquitecto", "Arquitecto", K::Text),
        col("codigo", "Código", K::Text),
        col("nombre", "Artículo", K::Text),
        col("cantidad", "Cantidad", K::Number),
        col("unitario", "Precio unitario", K::Money),
        col("alicuota", "Alícuota", K::Percent),
        col("obra", "Cliente/Proyecto", K::Text),
        col("conciliado", "Conciliado", K::Boolean),
        col("acopio", "Acopio", K::Text),
    ],
    filter_fields: &[
        field("fecha_entrega", "Fecha entrega", F::Date),
        field("remito", "Remito", F::Text),
        field("nro_pedido", "N° Pedido", F::Text),
        field("arquitecto", "Arquitecto", F::Text),
        field("cantidad", "Cantidad", F::Number),
        field("unitario", "Precio unitario", F::Number),
        field("conciliado", "Conciliado", F::Boolean),
        field("obra", "Cliente/Proyecto", F::Relation),
        field("acopio", "Acopio", F::Relation),
        field("articulo", "Artículo", F::Relation),
    ],
    default_sort: "fecha_entrega",
};

const ACOPIOS: ModelSchema = ModelSchema {
    name: "acopios",
    endpoint: "api/acopios/",
    columns: &[
        col("fecha", "Fecha", K::Date),
        col("acopiante_nombre", "Acopiante", K::Text),
        col("nombre", "Nombre", K::Text),
        col("monto", "Neto", K::Money),
        col("iva", "IVA", K::Money),
        col("total", "Total", K::Money),
        col("saldo", "Saldo", K::Money),
    ],
    filter_fields: &[
        field("fecha", "Fecha", F::Date),
        field("nombre", "Nombre", F::Text),
        field("acopiante", "Acopiante", F::Relation),
        field("monto", "Neto", F::Number),
        field("total", "Total", F::Number),
        field("saldo", "Saldo", F::Number),
    ],
    default_sort: "fecha",
};

/// Catalogue models that only feed relation pickers. Single display column,
/// text search on it.
macro_rules! catalogue {
    ($ident:ident, $name:literal, $endpoint:literal, $field:literal, $label:literal) => {
        const $ident: ModelSchema = ModelSchema {
            name: $name,
            endpoint: $endpoint,
            columns: &[col($field, $label, K::Text)],
            filter_fields: &[field($field, $label, F::Text)],
            default_sort: $field,
        };
    };
}

catalogue!(CAJAS, "cajas", "api/tesoreria/cajas/", "caja", "Caja");
catalogue!(MONEDAS, "moneda", "api/shared/monedas/", "moneda", "Moneda");
catalogue!(MUNICIPIOS, "municipio", "api/shared/municipios/", "nombre", "Municipio");
catalogue!(IMPUTACIONES, "imputaciones", "api/iva/imputaciones/", "imputacion", "Imputación");
catalogue!(
    UNIDADES_DE_NEGOCIO,
    "unidades_de_negocio",
    "api/iva/unidades_de_negocio/",
    "unidad_de_negocio",
    "Unidad de negocio"
);
catalogue!(TIPOS_REG, "tipos_reg", "api/tesoreria/tipos_reg/", "tipo_reg", "Tipo reg.");
catalogue!(
    TIPOS_DOCUMENTO,
    "tipos_documento",
    "api/iva/tipos_documento/",
    "tipo_documento",
    "Tipo Documento"
);
catalogue!(ARTICULOS, "articulos", "api/acopios/articulos/", "nombre", "Artículo");
catalogue!(
    ESTADOS_PRESUPUESTO,
    "estados_presupuesto",
    "api/tesoreria/presupuestos/estados/",
    "estado",
    "Estado"
);
catalogue!(INVERSORES, "inversores", "api/inversiones/inversores/", "nombre", "Inversor");

const CERTIFICADOS: ModelSchema = ModelSchema {
    name: "certificados",
    endpoint: "api/tesoreria/cobranzas/certificados/",
    columns: &[
        col("fecha", "Fecha", K::Date),
        col("cliente_proyecto", "Cliente/Proyecto", K::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        col("numero", "N°", K::Text),
        col("monto", "Monto", K::Money),
        col("saldo", "Saldo", K::Money),
    ],
    filter_fields: &[
        field("fecha", "Fecha", F::Date),
        field("cliente_proyecto", "Cliente/Proyecto", F::Text).with_lookup(CLIENTE_PROYECTO_LOOKUP),
        field("saldo", "Saldo", F::Number),
    ],
    default_sort: "fecha",
};

const FCI: ModelSchema = ModelSchema {
    name: "fci",
    endpoint: "api/tesoreria/fci/",
    columns: &[
        col("fecha", "Fecha", K::Date),
        col("tipo", "Tipo", K::Text),
        col("monto", "Monto", K::Money),
    ],
    filter_fields: &[
        field("fecha", "Fecha", F::Date),
        field("tipo", "Tipo", F::Text),
        field("monto", "Monto", F::Number),
    ],
    default_sort: "fecha",
};

pub static MODELS: &[ModelSchema] = &[
    PRESUPUESTOS,
    REGISTROS,
    DOCUMENTOS,
    COBRANZAS,
    DOLAR_MEP,
    PAGOS,
    RECEPTORES,
    PROVEEDORES,
    CLIENTES_PROYECTOS,
    PLANTILLAS_REGISTROS,
    DESACOPIOS,
    ACOPIOS,
    CERTIFICADOS,
    FCI,
    CAJAS,
    MONEDAS,
    MUNICIPIOS,
    IMPUTACIONES,
    UNIDADES_DE_NEGOCIO,
    TIPOS_REG,
    TIPOS_DOCUMENTO,
    ARTICULOS,
    ESTADOS_PRESUPUESTO,
    INVERSORES,
];
