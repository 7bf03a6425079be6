//! # HTTP client for the tesorería backend
//!
//! Every screen talks to the backend through three narrow traits so that
//! controllers and flows can be exercised against in-memory fakes:
//!
//! - [`ModelFetcher`]: paged list reads (`GET /{model}/?...`)
//! - [`ModelWriter`]: generic writes (`POST`, `PATCH`, `DELETE`)
//! - [`TreasuryApi`]: the bespoke treasury endpoints
//!
//! [`ApiClient`] implements all three over `reqwest`. One network call per
//! invocation, no retries; non-2xx answers become [`FrontendError::Api`], and
//! the 400 asking for a multi-project allocation becomes
//! [`FrontendError::AllocationRequired`].

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use shared::schema::{self, ModelSchema};
use shared::tesoreria::{
    AllocationConflict, CobroCertificado, ConciliacionResponse, MovimientoBancario,
    NuevoPagoRequest, PagoPlantillaRequest, CONCILIACION_PATH, GASTO_BANCARIO_PATH,
    NUEVO_COBRO_PATH, NUEVO_PAGO_PATH, PAGO_PLANTILLA_PATH,
};
use shared::{ApiResponse, HistoryEntry, ListBody, ListQuery, Page, RowId};

use crate::config::ClientConfig;
use crate::error::{FrontendError, Result};

/// Paged list reads.
#[async_trait]
pub trait ModelFetcher: Send + Sync {
    async fn fetch(&self, model: &str, query: &ListQuery) -> Result<Page>;
}

/// Generic create / update / delete on a model's endpoint.
#[async_trait]
pub trait ModelWriter: Send + Sync {
    /// Returns the server representation of the new row.
    async fn create(&self, model: &str, data: &Value) -> Result<Value>;
    /// Partial update. Returns the server representation of the row.
    async fn update(&self, model: &str, id: &RowId, data: &Value) -> Result<Value>;
    async fn delete(&self, model: &str, id: &RowId) -> Result<()>;
}

/// Whose change log to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Documento,
    Registro,
}

impl HistoryKind {
    fn path(self, id: &RowId) -> String {
        match self {
            HistoryKind::Documento => format!("api/iva/{}/historial/", id),
            HistoryKind::Registro => format!("api/tesoreria/registros/{}/historial/", id),
        }
    }
}

/// Treasury endpoints that do not follow the generic model routes.
#[async_trait]
pub trait TreasuryApi: Send + Sync {
    async fn nuevo_pago(&self, request: &NuevoPagoRequest) -> Result<ApiResponse<Value>>;
    async fn nuevo_cobro(&self, cobro: &CobroCertificado) -> Result<ApiResponse<Value>>;
    /// Upload a bank statement CSV and get its categorised movements back.
    async fn upload_statement(&self, file_name: &str, bytes: Vec<u8>) -> Result<ConciliacionResponse>;
    async fn gasto_bancario(&self, movimiento: &MovimientoBancario) -> Result<ApiResponse<Value>>;
    async fn pago_plantilla(&self, request: &PagoPlantillaRequest) -> Result<ApiResponse<Value>>;
    async fn historial(&self, kind: HistoryKind, id: &RowId) -> Result<Vec<HistoryEntry>>;
}

/// `reqwest`-backed client. Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
        })
    }

    /// Client with default settings against another base URL.
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self> {
        let config = ClientConfig {
            api_url: base_url.into(),
            ..ClientConfig::default()
        };
        Self::new(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn schema(model: &str) -> Result<&'static ModelSchema> {
        schema::resolve(model).ok_or_else(|| FrontendError::UnknownModel(model.to_string()))
    }

    fn row_url(&self, schema: &ModelSchema, id: &RowId) -> String {
        let id = urlencoding::encode(&id.to_string()).into_owned();
        format!("{}{}/", self.url(schema.write_endpoint()), id)
    }

    async fn post_json<B: Serialize + Sync>(&self, path: &str, body: &B) -> Result<ApiResponse<Value>> {
        let response = self.client.post(self.url(path)).json(body).send().await?;
        into_api_response(response).await
    }
}

/// Map a non-2xx response to an error, keeping the server's message.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let text = response.text().await.unwrap_or_default();
    let body: Option<Value> = serde_json::from_str(&text).ok();

    if status == StatusCode::BAD_REQUEST {
        if let Some(conflict) = body.as_ref().and_then(AllocationConflict::from_body) {
            debug!(
                component = "api",
                invoices = conflict.facturas_varios.len(),
                "Server asks for a multi-project allocation"
            );
            return Err(FrontendError::AllocationRequired(conflict));
        }
    }

    let detail = body
        .as_ref()
        .and_then(|b| b.get("detail").or_else(|| b.get("error")))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| {
            if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("error").to_string()
            } else {
                text
            }
        });

    warn!(component = "api", status = status.as_u16(), %detail, "Request failed");
    Err(FrontendError::Api {
        status: status.as_u16(),
        detail,
    })
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let response = check_status(response).await?;
    let bytes = response.bytes().await?;
    if bytes.is_empty() {
        return Ok(serde_json::from_value(Value::Null)?);
    }
    Ok(serde_json::from_slice(&bytes)?)
}

async fn into_api_response(response: Response) -> Result<ApiResponse<Value>> {
    let status = response.status().as_u16();
    let data = decode::<Value>(response).await?;
    Ok(ApiResponse { status, data })
}

#[async_trait]
impl ModelFetcher for ApiClient {
    async fn fetch(&self, model: &str, query: &ListQuery) -> Result<Page> {
        let schema = Self::schema(model)?;
        query.validate()?;

        let url = format!("{}?{}", self.url(schema.endpoint), query.to_query_string(schema));
        debug!(component = "api", model, page = query.page, "GET {}", url);

        let response = self.client.get(&url).send().await?;
        let body: ListBody = decode(response).await?;
        Ok(body.into())
    }
}

#[async_trait]
impl ModelWriter for ApiClient {
    async fn create(&self, model: &str, data: &Value) -> Result<Value> {
        let schema = Self::schema(model)?;
        debug!(component = "api", model, "POST {}", schema.write_endpoint());
        let response = self
            .client
            .post(self.url(schema.write_endpoint()))
            .json(data)
            .send()
            .await?;
        decode(response).await
    }

    async fn update(&self, model: &str, id: &RowId, data: &Value) -> Result<Value> {
        let schema = Self::schema(model)?;
        let url = self.row_url(schema, id);
        debug!(component = "api", model, %id, "PATCH {}", url);
        let response = self.client.patch(url).json(data).send().await?;
        decode(response).await
    }

    async fn delete(&self, model: &str, id: &RowId) -> Result<()> {
        let schema = Self::schema(model)?;
        let url = self.row_url(schema, id);
        debug!(component = "api", model, %id, "DELETE {}", url);
        let response = self.client.delete(url).send().await?;
        check_status(response).await?;
        Ok(())
    }
}

#[async_trait]
impl TreasuryApi for ApiClient {
    async fn nuevo_pago(&self, request: &NuevoPagoRequest) -> Result<ApiResponse<Value>> {
        self.post_json(NUEVO_PAGO_PATH, request).await
    }

    async fn nuevo_cobro(&self, cobro: &CobroCertificado) -> Result<ApiResponse<Value>> {
        self.post_json(NUEVO_COBRO_PATH, cobro).await
    }

    async fn upload_statement(&self, file_name: &str, bytes: Vec<u8>) -> Result<ConciliacionResponse> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("text/csv")?;
        let form = Form::new().part("archivo", part);
        debug!(component = "api", file_name, "Uploading bank statement");
        let response = self
            .client
            .post(self.url(CONCILIACION_PATH))
            .multipart(form)
            .send()
            .await?;
        decode(response).await
    }

    async fn gasto_bancario(&self, movimiento: &MovimientoBancario) -> Result<ApiResponse<Value>> {
        self.post_json(GASTO_BANCARIO_PATH, &movimiento.with_iso_date()).await
    }

    async fn pago_plantilla(&self, request: &PagoPlantillaRequest) -> Result<ApiResponse<Value>> {
        self.post_json(PAGO_PLANTILLA_PATH, request).await
    }

    async fn historial(&self, kind: HistoryKind, id: &RowId) -> Result<Vec<HistoryEntry>> {
        let response = self.client.get(self.url(&kind.path(id))).send().await?;
        let entries: Option<Vec<HistoryEntry>> = decode(response).await?;
        Ok(entries.unwrap_or_default())
    }
}
