//! Generic list-screen controller and its parts.

pub mod builder;
pub mod debounce;
pub mod filters;
pub mod scroll;
pub mod state;

pub use builder::{RowSink, TableBuilder};
pub use filters::{FilterBuilder, FilterRow};
pub use scroll::{RowRef, ScrollTracker};
pub use state::{FetchOutcome, Mutation, TableState};
