pub mod api;
pub mod cache;
pub mod draft_store;
pub mod logging;

pub use api::{ApiClient, HistoryKind, ModelFetcher, ModelWriter, TreasuryApi};
pub use cache::{CachedFetcher, QueryCache};
pub use draft_store::{DraftStore, FileDraftStore, InMemoryDraftStore};
pub use logging::init_tracing;
