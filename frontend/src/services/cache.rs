//! Process-wide TTL cache of list pages.
//!
//! Entries are keyed by the canonical request signature
//! ([`ListQuery::cache_key`]): model, filters, sort, search and page. A page
//! is served while fresh; after that it is refetched, and once past the
//! retention window it is dropped.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

use shared::schema;
use shared::{ListQuery, Page};

use super::api::ModelFetcher;
use crate::config::ClientConfig;
use crate::error::{FrontendError, Result};

#[derive(Debug, Clone)]
struct Entry {
    page: Page,
    stored_at: Instant,
}

#[derive(Debug, Default)]
struct Store {
    entries: HashMap<String, Entry>,
    /// Bumped on every invalidation of a model.
    epochs: HashMap<String, u64>,
}

#[derive(Debug)]
pub struct QueryCache {
    store: Mutex<Store>,
    fresh_for: Duration,
    retain_for: Duration,
}

static GLOBAL: OnceLock<Arc<QueryCache>> = OnceLock::new();

impl QueryCache {
    pub fn new(fresh_for: Duration, retain_for: Duration) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            fresh_for,
            retain_for: retain_for.max(fresh_for),
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Self::new(config.cache_fresh(), config.cache_retain())
    }

    /// The shared cache. The first caller's config fixes the TTLs.
    pub fn global(config: &ClientConfig) -> Arc<QueryCache> {
        GLOBAL
            .get_or_init(|| Arc::new(Self::from_config(config)))
            .clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Store> {
        // A panic while holding the lock cannot leave a half-written entry.
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Fresh page for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Page> {
        let store = self.lock();
        let entry = store.entries.get(key)?;
        (entry.stored_at.elapsed() < self.fresh_for).then(|| entry.page.clone())
    }

    pub fn insert(&self, key: String, page: Page) {
        let mut store = self.lock();
        self.store_entry(&mut store, key, page);
    }

    fn store_entry(&self, store: &mut Store, key: String, page: Page) {
        let retain_for = self.retain_for;
        store.entries.retain(|_, e| e.stored_at.elapsed() < retain_for);
        store.entries.insert(
            key,
            Entry {
                page,
                stored_at: Instant::now(),
            },
        );
    }

    /// How many times `model` has been invalidated. Read before a fetch and
    /// hand it back to [`QueryCache::insert_if_current`].
    pub fn epoch(&self, model: &str) -> u64 {
        self.lock().epochs.get(model).copied().unwrap_or(0)
    }

    /// Store `page` unless `model` was invalidated since `epoch` was read.
    /// Returns whether the page was stored.
    pub fn insert_if_current(&self, key: String, model: &str, epoch: u64, page: Page) -> bool {
        let mut store = self.lock();
        let current = store.epochs.get(model).copied().unwrap_or(0);
        if current != epoch {
            debug!(
                component = "cache",
                %key,
                epoch,
                current,
                "Skipping page fetched before an invalidation"
            );
            return false;
        }
        self.store_entry(&mut store, key, page);
        true
    }

    /// Drop every page of `model`. Called after local mutations.
    pub fn invalidate_model(&self, model: &str) {
        let prefix = format!("{}?", model);
        let mut store = self.lock();
        *store.epochs.entry(model.to_string()).or_insert(0) += 1;
        let before = store.entries.len();
        store.entries.retain(|key, _| !key.starts_with(&prefix));
        debug!(
            component = "cache",
            model,
            dropped = before - store.entries.len(),
            "Invalidated cached pages"
        );
    }

    /// Drop entries past the retention window. Returns how many were dropped.
    pub fn evict_expired(&self) -> usize {
        let mut store = self.lock();
        let before = store.entries.len();
        let retain_for = self.retain_for;
        store.entries.retain(|_, e| e.stored_at.elapsed() < retain_for);
        before - store.entries.len()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Serves fresh pages from a [`QueryCache`] and falls through to the wrapped
/// fetcher otherwise.
pub struct CachedFetcher {
    inner: Arc<dyn ModelFetcher>,
    cache: Arc<QueryCache>,
}

impl CachedFetcher {
    pub fn new(inner: Arc<dyn ModelFetcher>, cache: Arc<QueryCache>) -> Self {
        Self { inner, cache }
    }

    pub fn cache(&self) -> &Arc<QueryCache> {
        &self.cache
    }
}

#[async_trait]
impl ModelFetcher for CachedFetcher {
    async fn fetch(&self, model: &str, query: &ListQuery) -> Result<Page> {
        let schema =
            schema::resolve(model).ok_or_else(|| FrontendError::UnknownModel(model.to_string()))?;
        query.validate()?;

        let key = query.cache_key(schema);
        if let Some(page) = self.cache.get(&key) {
            debug!(component = "cache", %key, "Cache hit");
            return Ok(page);
        }

        // A mutation landing while this fetch is in flight makes the answer stale.
        let epoch = self.cache.epoch(schema.name);
        let page = self.inner.fetch(model, query).await?;
        self.cache.insert_if_current(key, schema.name, epoch, page.clone());
        Ok(page)
    }
}
