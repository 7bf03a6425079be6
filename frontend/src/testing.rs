//! In-memory fakes shared by the unit tests of forms, flows and pickers.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Mutex;

use shared::tesoreria::{
    CobroCertificado, ConciliacionResponse, MovimientoBancario, NuevoPagoRequest, PagoPlantillaRequest,
};
use shared::{ApiResponse, HistoryEntry, ListQuery, Page, RowId};

use crate::error::{FrontendError, Result};
use crate::services::api::{HistoryKind, ModelFetcher, ModelWriter, TreasuryApi};
use crate::table::RowSink;

/// Serves a fixed list of rows on page 1 and records every query.
pub struct StaticFetcher {
    rows: Vec<Value>,
    pub queries: Mutex<Vec<(String, ListQuery)>>,
}

impl StaticFetcher {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<(String, ListQuery)> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelFetcher for StaticFetcher {
    async fn fetch(&self, model: &str, query: &ListQuery) -> Result<Page> {
        self.queries
            .lock()
            .unwrap()
            .push((model.to_string(), query.clone()));
        Ok(Page::last(self.rows.clone()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteCall {
    Create(String, Value),
    Update(String, RowId, Value),
    Delete(String, RowId),
}

/// Records writes and answers from a queue (echoing the body with an id
/// once the queue is empty).
#[derive(Default)]
pub struct RecordingWriter {
    pub calls: Mutex<Vec<WriteCall>>,
    replies: Mutex<VecDeque<Result<Value>>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_with(&self, reply: Result<Value>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn fail_next(&self, status: u16, detail: &str) {
        self.reply_with(Err(FrontendError::Api {
            status,
            detail: detail.to_string(),
        }));
    }

    pub fn calls(&self) -> Vec<WriteCall> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self, data: &Value, id: i64) -> Result<Value> {
        match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply,
            None => {
                let mut echoed = data.clone();
                if let Value::Object(map) = &mut echoed {
                    map.entry("id").or_insert(Value::from(id));
                }
                Ok(echoed)
            }
        }
    }
}

#[async_trait]
impl ModelWriter for RecordingWriter {
    async fn create(&self, model: &str, data: &Value) -> Result<Value> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(WriteCall::Create(model.to_string(), data.clone()));
            calls.len() as i64
        };
        self.next_reply(data, 100 + n)
    }

    async fn update(&self, model: &str, id: &RowId, data: &Value) -> Result<Value> {
        self.calls
            .lock()
            .unwrap()
            .push(WriteCall::Update(model.to_string(), id.clone(), data.clone()));
        let id = match id {
            RowId::Int(n) => *n,
            RowId::Text(_) => 0,
        };
        self.next_reply(data, id)
    }

    async fn delete(&self, model: &str, id: &RowId) -> Result<()> {
        self.calls
            .lock()
            .unwrap()
            .push(WriteCall::Delete(model.to_string(), id.clone()));
        match self.replies.lock().unwrap().pop_front() {
            Some(Err(err)) => Err(err),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkCall {
    Add(Value),
    Update(Value),
    Delete(RowId),
}

/// Records what a dialog reports back to its table.
#[derive(Default)]
pub struct RecordingSink {
    pub calls: Mutex<Vec<SinkCall>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<SinkCall> {
        self.calls.lock().unwrap().clone()
    }
}

impl RowSink for RecordingSink {
    fn add_item(&self, item: Value) {
        self.calls.lock().unwrap().push(SinkCall::Add(item));
    }

    fn update_item(&self, item: Value) {
        self.calls.lock().unwrap().push(SinkCall::Update(item));
    }

    fn delete_item(&self, id: &RowId) {
        self.calls.lock().unwrap().push(SinkCall::Delete(id.clone()));
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TreasuryCall {
    NuevoPago(NuevoPagoRequest),
    NuevoCobro(CobroCertificado),
    Upload(String, usize),
    GastoBancario(MovimientoBancario),
    PagoPlantilla(PagoPlantillaRequest),
    Historial(HistoryKind, RowId),
}

/// Bespoke treasury endpoints answering from a queue; once it is empty every
/// call succeeds with `{"id": <call number>}`.
#[derive(Default)]
pub struct ScriptedTreasury {
    calls: Mutex<Vec<TreasuryCall>>,
    replies: Mutex<VecDeque<Result<Value>>>,
    statement: Mutex<ConciliacionResponse>,
    history: Mutex<Vec<HistoryEntry>>,
}

impl ScriptedTreasury {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply_with(&self, reply: Result<Value>) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn fail_next(&self, err: FrontendError) {
        self.reply_with(Err(err));
    }

    pub fn with_statement(self, statement: ConciliacionResponse) -> Self {
        *self.statement.lock().unwrap() = statement;
        self
    }

    pub fn with_history(self, history: Vec<HistoryEntry>) -> Self {
        *self.history.lock().unwrap() = history;
        self
    }

    pub fn calls(&self) -> Vec<TreasuryCall> {
        self.calls.lock().unwrap().clone()
    }

    fn answer(&self, call: TreasuryCall) -> Result<ApiResponse<Value>> {
        let n = {
            let mut calls = self.calls.lock().unwrap();
            calls.push(call);
            calls.len() as i64
        };
        let data = match self.replies.lock().unwrap().pop_front() {
            Some(reply) => reply?,
            None => serde_json::json!({ "id": n }),
        };
        Ok(ApiResponse { status: 201, data })
    }
}

#[async_trait]
impl TreasuryApi for ScriptedTreasury {
    async fn nuevo_pago(&self, request: &NuevoPagoRequest) -> Result<ApiResponse<Value>> {
        self.answer(TreasuryCall::NuevoPago(request.clone()))
    }

    async fn nuevo_cobro(&self, cobro: &CobroCertificado) -> Result<ApiResponse<Value>> {
        self.answer(TreasuryCall::NuevoCobro(cobro.clone()))
    }

    async fn upload_statement(&self, file_name: &str, contents: Vec<u8>) -> Result<ConciliacionResponse> {
        self.calls
            .lock()
            .unwrap()
            .push(TreasuryCall::Upload(file_name.to_string(), contents.len()));
        if let Some(Err(err)) = self.replies.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.statement.lock().unwrap().clone())
    }

    async fn gasto_bancario(&self, movimiento: &MovimientoBancario) -> Result<ApiResponse<Value>> {
        self.answer(TreasuryCall::GastoBancario(movimiento.clone()))
    }

    async fn pago_plantilla(&self, request: &PagoPlantillaRequest) -> Result<ApiResponse<Value>> {
        self.answer(TreasuryCall::PagoPlantilla(request.clone()))
    }

    async fn historial(&self, kind: HistoryKind, id: &RowId) -> Result<Vec<HistoryEntry>> {
        self.calls
            .lock()
            .unwrap()
            .push(TreasuryCall::Historial(kind, id.clone()));
        Ok(self.history.lock().unwrap().clone())
    }
}
