//! # TableBuilder
//!
//! Controller behind every list screen. A screen builds one with a model
//! name and a default sort field; the builder owns the loaded rows, the
//! filter list, the sort state and the search text, and drives the fetcher.
//!
//! ## Responsibilities:
//! - Compose committed filters, sort and search into a [`ListQuery`]
//! - Debounce search and filter edits before refetching
//! - Sort cycling on header clicks
//! - Sequential infinite scroll through [`ScrollTracker`]
//! - Optimistic local mutations from create/edit/delete dialogs
//!
//! ## Concurrency:
//! Methods take `&self`; state sits behind a mutex that is never held
//! across an `.await`. Each query change bumps a generation published on a
//! `watch` channel, and in-flight fetches of an older generation are dropped
//! (cancelling the HTTP request). Responses that land anyway are checked
//! against their ticket by [`TableState`].

use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::watch;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared::schema;
use shared::{
    Filter, FilterError, FilterField, ListQuery, ModelSchema, RowId, SortDirection, SortState,
};

use super::debounce::Debouncer;
use super::filters::FilterBuilder;
use super::scroll::{RowRef, ScrollTracker};
use super::state::{FetchOutcome, FetchTicket, Mutation, TableState};
use crate::config::ClientConfig;
use crate::error::{FrontendError, Result};
use crate::services::api::ModelFetcher;
use crate::services::cache::{CachedFetcher, QueryCache};

/// Where dialogs report confirmed changes.
pub trait RowSink: Send + Sync {
    fn add_item(&self, item: Value);
    fn update_item(&self, item: Value);
    fn delete_item(&self, id: &RowId);
}

#[derive(Debug, Default)]
struct PendingQuery {
    search: Option<String>,
    filters_changed: bool,
}

#[derive(Debug)]
struct Inner {
    state: TableState,
    filters: FilterBuilder,
    search_input: String,
    committed: ListQuery,
    debouncer: Debouncer<PendingQuery>,
}

impl Inner {
    fn query(&self, page: u32) -> ListQuery {
        self.committed.with_page(page)
    }

    /// Fold pending edits into the committed query. Returns whether the
    /// query actually changed.
    fn commit(&mut self, pending: PendingQuery) -> bool {
        let before = self.committed.clone();
        if let Some(search) = pending.search {
            self.committed.search = search.trim().to_string();
        }
        if pending.filters_changed {
            self.committed.filters = self.filters.filters();
        }
        self.committed != before
    }
}

pub struct TableBuilder {
    schema: &'static ModelSchema,
    fetcher: Arc<dyn ModelFetcher>,
    cache: Option<Arc<QueryCache>>,
    scroll: ScrollTracker,
    inner: Mutex<Inner>,
    generation_tx: watch::Sender<u64>,
}

impl TableBuilder {
    /// Controller for `model`, sorted ascending by `default_sort` (the
    /// model's own default when empty).
    pub fn new(model: &str, default_sort: &str, fetcher: Arc<dyn ModelFetcher>) -> Result<Self> {
        let schema =
            schema::resolve(model).ok_or_else(|| FrontendError::UnknownModel(model.to_string()))?;
        let default_sort = if default_sort.is_empty() {
            schema.default_sort
        } else {
            default_sort
        };
        let config = ClientConfig::default();

        let inner = Inner {
            state: TableState::new(),
            filters: FilterBuilder::new(schema),
            search_input: String::new(),
            committed: ListQuery::new(Vec::new(), SortState::ascending(default_sort), ""),
            debouncer: Debouncer::new(config.debounce()),
        };
        let (generation_tx, _) = watch::channel(0);

        debug!(component = "table", model, default_sort, "TableBuilder created");
        Ok(Self {
            schema,
            fetcher,
            cache: None,
            scroll: ScrollTracker::new(config.scroll_lead, config.scroll_threshold),
            inner: Mutex::new(inner),
            generation_tx,
        })
    }

    /// Take debounce and scroll tuning from the config.
    pub fn with_config(mut self, config: &ClientConfig) -> Self {
        self.scroll = ScrollTracker::new(config.scroll_lead, config.scroll_threshold);
        let inner = self
            .inner
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.debouncer = Debouncer::new(config.debounce());
        self
    }

    /// Serve pages through `cache` and invalidate it on local mutations.
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.fetcher = Arc::new(CachedFetcher::new(self.fetcher, cache.clone()));
        self.cache = Some(cache);
        self
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn schema(&self) -> &'static ModelSchema {
        self.schema
    }

    pub fn model(&self) -> &'static str {
        self.schema.name
    }

    // ---------------------------------------------------------------------
    // Read side
    // ---------------------------------------------------------------------

    pub fn data(&self) -> Vec<Value> {
        self.lock().state.rows().to_vec()
    }

    /// Loaded rows rendered through the model's column descriptors.
    pub fn rendered_rows(&self) -> Vec<Vec<String>> {
        let inner = self.lock();
        inner
            .state
            .rows()
            .iter()
            .map(|row| self.schema.render_row(row))
            .collect()
    }

    pub fn row_count(&self) -> usize {
        self.lock().state.row_count()
    }

    pub fn headers(&self) -> Vec<&'static str> {
        self.schema.headers()
    }

    pub fn labels(&self) -> Vec<&'static str> {
        self.schema.labels()
    }

    pub fn fields(&self) -> &'static [FilterField] {
        self.schema.filter_fields
    }

    /// Filters as currently edited (possibly not committed yet).
    pub fn filters(&self) -> Vec<Filter> {
        self.lock().filters.filters()
    }

    pub fn search(&self) -> String {
        self.lock().search_input.clone()
    }

    pub fn sort_state(&self) -> SortState {
        self.lock().committed.sort.clone()
    }

    /// Field the list is sorted by.
    pub fn orden_por(&self) -> Option<String> {
        self.lock().committed.sort.field().map(str::to_string)
    }

    pub fn orden(&self) -> Option<SortDirection> {
        self.lock().committed.sort.direction()
    }

    /// Query of the first page as it would be sent now.
    pub fn query(&self) -> ListQuery {
        self.lock().query(1)
    }

    pub fn is_loading(&self) -> bool {
        self.lock().state.is_loading()
    }

    pub fn has_more(&self) -> bool {
        self.lock().state.has_more()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().state.error().map(str::to_string)
    }

    /// Local edits kept for replay over pages still in flight.
    pub fn pending_mutations(&self) -> usize {
        self.lock().state.pending_mutations()
    }

    pub fn has_pending_changes(&self) -> bool {
        self.lock().debouncer.is_pending()
    }

    // ---------------------------------------------------------------------
    // Filters and search
    // ---------------------------------------------------------------------

    pub fn add_filter(&self, filter: Filter) -> std::result::Result<Uuid, FilterError> {
        let mut inner = self.lock();
        let key = inner.filters.add_filter(filter)?;
        inner.debouncer.update(|p| p.filters_changed = true);
        Ok(key)
    }

    pub fn remove_filter(&self, index: usize) -> std::result::Result<Filter, FilterError> {
        let mut inner = self.lock();
        let removed = inner.filters.remove_filter(index)?;
        inner.debouncer.update(|p| p.filters_changed = true);
        Ok(removed)
    }

    pub fn reset_filters(&self) {
        let mut inner = self.lock();
        inner.filters.reset_filters();
        inner.debouncer.update(|p| p.filters_changed = true);
    }

    /// Replace the filter list as given. Fields the model does not know are
    /// skipped when the query is encoded.
    pub fn set_filters(&self, filters: Vec<Filter>) {
        let mut inner = self.lock();
        inner.filters.set_filters(filters);
        inner.debouncer.update(|p| p.filters_changed = true);
    }

    pub fn set_search(&self, text: impl Into<String>) {
        let text = text.into();
        let mut inner = self.lock();
        inner.search_input = text.clone();
        inner.debouncer.update(|p| p.search = Some(text));
    }

    /// Wait out the quiet period, then commit pending search and filter
    /// edits and refetch if the query changed. Returns whether it refetched.
    pub async fn flush_debounced(&self) -> Result<bool> {
        loop {
            let deadline = match self.lock().debouncer.deadline() {
                Some(deadline) => deadline,
                None => return Ok(false),
            };
            sleep_until(deadline).await;

            let pending = self.lock().debouncer.take_ready(Instant::now());
            if let Some(pending) = pending {
                return self.apply_pending(pending).await;
            }
        }
    }

    /// Commit pending edits immediately (e.g. on Enter).
    pub async fn commit_now(&self) -> Result<bool> {
        let pending = self.lock().debouncer.take_now();
        match pending {
            Some(pending) => self.apply_pending(pending).await,
            None => Ok(false),
        }
    }

    async fn apply_pending(&self, pending: PendingQuery) -> Result<bool> {
        let changed = {
            let mut inner = self.lock();
            let changed = inner.commit(pending);
            if changed {
                self.bump_generation(&mut inner);
            }
            changed
        };
        if changed {
            self.refresh().await?;
        }
        Ok(changed)
    }

    fn bump_generation(&self, inner: &mut Inner) {
        let generation = inner.state.bump_generation();
        self.generation_tx.send_replace(generation);
    }

    // ---------------------------------------------------------------------
    // Sorting
    // ---------------------------------------------------------------------

    /// Header click: cycles asc → desc → unsorted on the same column and
    /// starts ascending on another one. Refetches from page 1.
    pub async fn handle_ordenar(&self, field: &str) -> Result<()> {
        {
            let mut inner = self.lock();
            inner.committed.sort.toggle(field);
            debug!(
                component = "table",
                model = self.schema.name,
                sort = ?inner.committed.sort,
                "Sort changed"
            );
            self.bump_generation(&mut inner);
        }
        self.refresh().await
    }

    /// Set the sort outright and refetch.
    pub async fn sort_by(&self, sort: SortState) -> Result<()> {
        {
            let mut inner = self.lock();
            if inner.committed.sort == sort {
                return Ok(());
            }
            inner.committed.sort = sort;
            self.bump_generation(&mut inner);
        }
        self.refresh().await
    }

    // ---------------------------------------------------------------------
    // Fetching
    // ---------------------------------------------------------------------

    /// Refetch the first page of the committed query.
    pub async fn refresh(&self) -> Result<()> {
        let (ticket, query) = {
            let mut inner = self.lock();
            let ticket = inner.state.begin_reset();
            (ticket, inner.query(1))
        };
        self.run(ticket, query).await.map(|_| ())
    }

    /// Fetch the following page, if there is one and nothing is loading.
    /// Returns whether a request was made.
    pub async fn load_next_page(&self) -> Result<bool> {
        let next = {
            let mut inner = self.lock();
            inner
                .state
                .begin_next_page()
                .map(|ticket| (ticket, inner.query(ticket.page)))
        };
        match next {
            Some((ticket, query)) => {
                self.run(ticket, query).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn run(&self, ticket: FetchTicket, query: ListQuery) -> Result<FetchOutcome> {
        let mut guard = TicketGuard {
            builder: self,
            ticket,
            settled: false,
        };
        let rx = self.generation_tx.subscribe();
        debug!(
            component = "table",
            model = self.schema.name,
            ticket = ticket.id,
            page = ticket.page,
            "Fetching"
        );

        let result = tokio::select! {
            result = self.fetcher.fetch(self.schema.name, &query) => Some(result),
            _ = superseded(rx, ticket.generation) => None,
        };
        guard.settled = true;

        match result {
            None => {
                debug!(component = "table", ticket = ticket.id, "Fetch cancelled by a newer query");
                self.lock().state.abandon(ticket);
                Ok(FetchOutcome::Discarded)
            }
            Some(Ok(page)) => {
                let rows = page.items.len();
                let outcome = self.lock().state.complete(ticket, Ok(page));
                if outcome == FetchOutcome::Applied {
                    info!(
                        component = "table",
                        model = self.schema.name,
                        page = ticket.page,
                        rows,
                        "Page loaded"
                    );
                }
                Ok(outcome)
            }
            Some(Err(err)) => {
                let outcome = self.lock().state.complete(ticket, Err(err.to_string()));
                match outcome {
                    FetchOutcome::Discarded => Ok(outcome),
                    _ => {
                        warn!(component = "table", model = self.schema.name, error = %err, "Fetch failed");
                        Err(err)
                    }
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Infinite scroll
    // ---------------------------------------------------------------------

    pub fn assign_ref(&self, index: usize) -> RowRef {
        self.scroll.assign_ref(index, self.row_count())
    }

    /// The UI saw `row` with `visible_ratio` of it on screen. Loads the next
    /// page when that row is the sentinel. Returns whether it did.
    pub async fn report_visibility(&self, row: RowRef, visible_ratio: f64) -> Result<bool> {
        let due = {
            let inner = self.lock();
            self.scroll.should_load(
                row,
                inner.state.row_count(),
                visible_ratio,
                inner.state.can_load_more(),
            )
        };
        if !due {
            return Ok(false);
        }
        self.load_next_page().await
    }

    // ---------------------------------------------------------------------
    // Local mutations
    // ---------------------------------------------------------------------

    fn mutate(&self, mutation: Mutation) -> bool {
        let changed = self.lock().state.mutate(mutation);
        if let Some(cache) = &self.cache {
            cache.invalidate_model(self.schema.name);
        }
        changed
    }

    pub fn add_item(&self, item: Value) {
        self.mutate(Mutation::Add(item));
    }

    /// Returns whether a row was replaced.
    pub fn update_item(&self, item: Value) -> bool {
        self.mutate(Mutation::Update(item))
    }

    /// Returns whether a row was removed.
    pub fn delete_item(&self, id: &RowId) -> bool {
        self.mutate(Mutation::Delete(id.clone()))
    }
}

impl RowSink for TableBuilder {
    fn add_item(&self, item: Value) {
        TableBuilder::add_item(self, item);
    }

    fn update_item(&self, item: Value) {
        TableBuilder::update_item(self, item);
    }

    fn delete_item(&self, id: &RowId) {
        TableBuilder::delete_item(self, id);
    }
}

/// Resolves once the published generation differs from `generation`.
/// Abandons the ticket when a fetch future is dropped before its answer
/// lands, so the table does not stay loading.
struct TicketGuard<'a> {
    builder: &'a TableBuilder,
    ticket: FetchTicket,
    settled: bool,
}

impl Drop for TicketGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            debug!(component = "table", ticket = self.ticket.id, "Fetch dropped before it answered");
            self.builder.lock().state.abandon(self.ticket);
        }
    }
}

async fn superseded(mut rx: watch::Receiver<u64>, generation: u64) {
    loop {
        if *rx.borrow_and_update() != generation {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: nothing can supersede this fetch any more.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use shared::{Operator, Page};
    use std::time::Duration;
    use tokio::sync::{mpsc, oneshot};

    /// Answers immediately and records every query it was asked.
    struct RecordingFetcher {
        queries: Mutex<Vec<ListQuery>>,
        pages: Box<dyn Fn(&ListQuery) -> Result<Page> + Send + Sync>,
    }

    impl RecordingFetcher {
        fn new(pages: impl Fn(&ListQuery) -> Result<Page> + Send + Sync + 'static) -> Arc<Self> {
            Arc::new(Self {
                queries: Mutex::new(Vec::new()),
                pages: Box::new(pages),
            })
        }

        fn queries(&self) -> Vec<ListQuery> {
            self.queries.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ModelFetcher for RecordingFetcher {
        async fn fetch(&self, _model: &str, query: &ListQuery) -> Result<Page> {
            self.queries.lock().unwrap().push(query.clone());
            (self.pages)(query)
        }
    }

    type Call = (ListQuery, oneshot::Sender<Result<Page>>);

    /// Hands every request to the test, which answers when it wants.
    struct ChannelFetcher {
        calls: mpsc::UnboundedSender<Call>,
    }

    #[async_trait]
    impl ModelFetcher for ChannelFetcher {
        async fn fetch(&self, _model: &str, query: &ListQuery) -> Result<Page> {
            let (tx, rx) = oneshot::channel();
            self.calls.send((query.clone(), tx)).unwrap();
            rx.await.unwrap_or_else(|_| {
                Err(FrontendError::Api {
                    status: 499,
                    detail: "dropped".into(),
                })
            })
        }
    }

    fn channel_builder() -> (Arc<TableBuilder>, mpsc::UnboundedReceiver<Call>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(ChannelFetcher { calls: tx });
        let builder = TableBuilder::new("acopios", "fecha", fetcher).unwrap();
        (Arc::new(builder), rx)
    }

    fn cached_channel_builder() -> (Arc<TableBuilder>, mpsc::UnboundedReceiver<Call>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let fetcher = Arc::new(ChannelFetcher { calls: tx });
        let cache = Arc::new(QueryCache::new(Duration::from_secs(300), Duration::from_secs(600)));
        let builder = TableBuilder::new("acopios", "fecha", fetcher)
            .unwrap()
            .with_cache(cache);
        (Arc::new(builder), rx)
    }

    fn acopio(id: i64) -> Value {
        json!({"id": id, "fecha": "2024-03-01", "nombre": format!("Acopio {}", id), "monto": "1000.00"})
    }

    fn numbered_pages(per_page: i64, pages: u32) -> impl Fn(&ListQuery) -> Result<Page> {
        move |query| {
            let start = (query.page as i64 - 1) * per_page;
            Ok(Page {
                items: (start..start + per_page).map(acopio).collect(),
                next_cursor: (query.page < pages).then_some(query.page + 1),
                count: Some(per_page as u64 * pages as u64),
            })
        }
    }

    fn ids(builder: &TableBuilder) -> Vec<i64> {
        builder.data().iter().filter_map(|r| r["id"].as_i64()).collect()
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let fetcher = RecordingFetcher::new(|_| Ok(Page::last(Vec::new())));
        assert!(matches!(
            TableBuilder::new("nada", "fecha", fetcher),
            Err(FrontendError::UnknownModel(_))
        ));
    }

    #[tokio::test]
    async fn test_initial_state_and_refresh() {
        let fetcher = RecordingFetcher::new(numbered_pages(3, 1));
        let builder = TableBuilder::new("acopios", "", fetcher.clone()).unwrap();
        assert_eq!(builder.orden_por().as_deref(), Some("fecha"));
        assert_eq!(builder.orden(), Some(SortDirection::Asc));
        assert_eq!(builder.headers()[0], "fecha");

        builder.refresh().await.unwrap();
        assert_eq!(ids(&builder), vec![0, 1, 2]);
        assert!(!builder.is_loading());
        assert!(!builder.has_more());
        assert_eq!(builder.rendered_rows()[0][0], "01/03/2024");
        assert_eq!(fetcher.queries()[0].page, 1);
    }

    #[tokio::test]
    async fn test_sort_toggle_scenario() {
        let fetcher = RecordingFetcher::new(numbered_pages(2, 1));
        let builder = TableBuilder::new("acopios", "fecha", fetcher.clone()).unwrap();

        builder.handle_ordenar("monto").await.unwrap();
        assert_eq!(builder.orden_por().as_deref(), Some("monto"));
        assert_eq!(builder.orden(), Some(SortDirection::Asc));

        builder.handle_ordenar("monto").await.unwrap();
        assert_eq!(builder.orden_por().as_deref(), Some("monto"));
        assert_eq!(builder.orden(), Some(SortDirection::Desc));

        builder.handle_ordenar("monto").await.unwrap();
        assert_eq!(builder.orden_por(), None);

        let sorts: Vec<SortState> = fetcher.queries().into_iter().map(|q| q.sort).collect();
        assert_eq!(
            sorts,
            vec![
                SortState::ascending("monto"),
                SortState::descending("monto"),
                SortState::Unsorted
            ]
        );
    }

    #[tokio::test]
    async fn test_optimistic_delete_scenario() {
        let fetcher = RecordingFetcher::new(|_| Ok(Page::last(vec![acopio(41), acopio(42)])));
        let builder = TableBuilder::new("acopios", "fecha", fetcher.clone()).unwrap();
        builder.refresh().await.unwrap();

        assert!(builder.delete_item(&RowId::Int(42)));
        assert_eq!(ids(&builder), vec![41]);
        assert!(!builder.delete_item(&RowId::Int(42)));
        assert_eq!(fetcher.queries().len(), 1, "deleting must not fetch");
    }

    #[tokio::test]
    async fn test_mutations_invalidate_the_cache() {
        let fetcher = RecordingFetcher::new(|_| Ok(Page::last(vec![acopio(1)])));
        let cache = Arc::new(QueryCache::new(Duration::from_secs(300), Duration::from_secs(600)));
        let builder = TableBuilder::new("acopios", "fecha", fetcher.clone())
            .unwrap()
            .with_cache(cache.clone());

        builder.refresh().await.unwrap();
        builder.refresh().await.unwrap();
        assert_eq!(fetcher.queries().len(), 1);

        builder.add_item(acopio(2));
        assert!(cache.is_empty());
        builder.refresh().await.unwrap();
        assert_eq!(fetcher.queries().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_search_is_debounced() {
        let fetcher = RecordingFetcher::new(|_| Ok(Page::last(Vec::new())));
        let builder = TableBuilder::new("acopios", "fecha", fetcher.clone()).unwrap();

        builder.set_search("ob");
        tokio::time::advance(Duration::from_millis(100)).await;
        builder.set_search("obra norte ");
        assert_eq!(builder.search(), "obra norte ");
        assert!(fetcher.queries().is_empty());

        assert!(builder.flush_debounced().await.unwrap());
        let queries = fetcher.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].search, "obra norte");

        // Same text again: nothing to refetch.
        builder.set_search("obra norte");
        assert!(!builder.flush_debounced().await.unwrap());
        assert_eq!(fetcher.queries().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_filters_are_committed_after_quiet_period() {
        let fetcher = RecordingFetcher::new(|_| Ok(Page::last(Vec::new())));
        let builder = TableBuilder::new("acopios", "fecha", fetcher.clone()).unwrap();

        builder
            .add_filter(Filter::new("nombre", Operator::Contains, "norte"))
            .unwrap();
        assert!(builder
            .add_filter(Filter::new("nombre", Operator::Gte, "x"))
            .is_err());
        assert_eq!(builder.filters().len(), 1);
        assert!(builder.query().filters.is_empty(), "not committed yet");

        builder.flush_debounced().await.unwrap();
        assert_eq!(
            fetcher.queries()[0].filters,
            vec![Filter::new("nombre", Operator::Contains, "norte")]
        );

        builder.set_filters(vec![Filter::new("desconocido", Operator::Eq, "x")]);
        builder.commit_now().await.unwrap();
        let query = fetcher.queries()[1].clone();
        assert_eq!(query.filters.len(), 1);
        assert!(!query
            .to_query_string(builder.schema())
            .contains("desconocido"));
    }

    #[tokio::test]
    async fn test_infinite_scroll_loads_sequentially() {
        let fetcher = RecordingFetcher::new(numbered_pages(20, 3));
        let builder = TableBuilder::new("acopios", "fecha", fetcher.clone()).unwrap();
        builder.refresh().await.unwrap();
        assert!(builder.has_more());

        let not_sentinel = builder.assign_ref(0);
        assert!(!builder.report_visibility(not_sentinel, 1.0).await.unwrap());

        let sentinel = builder.assign_ref(9);
        assert!(sentinel.is_sentinel);
        assert!(!builder.report_visibility(sentinel, 0.1).await.unwrap());
        assert!(builder.report_visibility(sentinel, 0.5).await.unwrap());
        assert_eq!(builder.row_count(), 40);

        // Stale ref from before the list grew.
        assert!(!builder.report_visibility(sentinel, 1.0).await.unwrap());

        assert!(builder.load_next_page().await.unwrap());
        assert!(!builder.load_next_page().await.unwrap());
        assert_eq!(builder.row_count(), 60);
        let pages: Vec<u32> = fetcher.queries().iter().map(|q| q.page).collect();
        assert_eq!(pages, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_fetch_errors_are_returned_and_rows_kept() {
        let fetcher = RecordingFetcher::new(|query| {
            if query.page == 1 {
                Ok(Page {
                    items: vec![acopio(1)],
                    next_cursor: Some(2),
                    count: None,
                })
            } else {
                Err(FrontendError::Api {
                    status: 500,
                    detail: "Error interno".into(),
                })
            }
        });
        let builder = TableBuilder::new("acopios", "fecha", fetcher).unwrap();
        builder.refresh().await.unwrap();

        let err = builder.load_next_page().await.unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(ids(&builder), vec![1]);
        assert!(builder.error().unwrap().contains("Error interno"));
        assert!(!builder.is_loading());
    }

    #[tokio::test]
    async fn test_superseded_fetch_is_cancelled() {
        let (builder, mut calls) = channel_builder();

        let first = tokio::spawn({
            let builder = builder.clone();
            async move { builder.refresh().await }
        });
        let (query, _first_reply) = calls.recv().await.unwrap();
        assert_eq!(query.sort, SortState::ascending("fecha"));

        let second = tokio::spawn({
            let builder = builder.clone();
            async move { builder.handle_ordenar("monto").await }
        });
        let (query, reply) = calls.recv().await.unwrap();
        assert_eq!(query.sort, SortState::ascending("monto"));

        // The first request was dropped without waiting for its answer.
        first.await.unwrap().unwrap();
        assert!(builder.is_loading());

        reply.send(Ok(Page::last(vec![acopio(2)]))).unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(ids(&builder), vec![2]);
        assert!(!builder.is_loading());
    }

    #[tokio::test]
    async fn test_local_edit_during_fetch_survives_stale_page() {
        let (builder, mut calls) = channel_builder();

        let refresh = tokio::spawn({
            let builder = builder.clone();
            async move { builder.refresh().await }
        });
        let (_, reply) = calls.recv().await.unwrap();

        builder.add_item(acopio(7));
        builder.delete_item(&RowId::Int(42));

        reply
            .send(Ok(Page::last(vec![acopio(42), acopio(43)])))
            .unwrap();
        refresh.await.unwrap().unwrap();
        assert_eq!(ids(&builder), vec![7, 43]);
    }

    #[tokio::test]
    async fn test_delete_during_cached_fetch_is_not_undone_by_next_refresh() {
        let (builder, mut calls) = cached_channel_builder();

        let refresh = tokio::spawn({
            let builder = builder.clone();
            async move { builder.refresh().await }
        });
        let (_, reply) = calls.recv().await.unwrap();
        builder.delete_item(&RowId::Int(42));
        reply
            .send(Ok(Page::last(vec![acopio(42), acopio(43)])))
            .unwrap();
        refresh.await.unwrap().unwrap();
        assert_eq!(ids(&builder), vec![43]);

        // The page answered before the delete must not be served from cache.
        let refresh = tokio::spawn({
            let builder = builder.clone();
            async move { builder.refresh().await }
        });
        let (_, reply) = tokio::time::timeout(Duration::from_secs(5), calls.recv())
            .await
            .expect("second refresh should reach the server")
            .unwrap();
        reply.send(Ok(Page::last(vec![acopio(43)]))).unwrap();
        refresh.await.unwrap().unwrap();
        assert_eq!(ids(&builder), vec![43]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_fetch_releases_loading_state() {
        let (builder, mut calls) = channel_builder();

        let timed_out = tokio::time::timeout(Duration::from_millis(10), builder.refresh()).await;
        assert!(timed_out.is_err());
        let (_, _unanswered) = calls.recv().await.unwrap();
        assert!(!builder.is_loading());

        builder.add_item(acopio(1));
        builder.add_item(acopio(2));
        builder.add_item(acopio(3));
        assert_eq!(builder.pending_mutations(), 0);

        let refresh = tokio::spawn({
            let builder = builder.clone();
            async move { builder.refresh().await }
        });
        let (_, reply) = calls.recv().await.unwrap();
        assert!(builder.is_loading());
        reply.send(Ok(Page::last(vec![acopio(5)]))).unwrap();
        refresh.await.unwrap().unwrap();
        assert!(!builder.is_loading());
        assert_eq!(ids(&builder), vec![5]);
    }

    #[tokio::test]
    async fn test_row_sink_forwards_to_the_table() {
        let fetcher = RecordingFetcher::new(|_| Ok(Page::last(vec![acopio(1)])));
        let builder = TableBuilder::new("acopios", "fecha", fetcher).unwrap();
        builder.refresh().await.unwrap();

        let sink: &dyn RowSink = &builder;
        sink.add_item(acopio(2));
        sink.update_item(json!({"id": 1, "nombre": "Editado"}));
        sink.update_item(json!({"id": 99, "nombre": "Fantasma"}));
        assert_eq!(ids(&builder), vec![2, 1]);
        assert_eq!(builder.data()[1]["nombre"], "Editado");
        sink.delete_item(&RowId::Int(2));
        assert_eq!(ids(&builder), vec![1]);
    }
}
