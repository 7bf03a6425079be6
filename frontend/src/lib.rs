//! Headless client for the tesorería back-office.
//!
//! The list screens are driven by [`TableBuilder`], forms by the dialogs in
//! [`forms`], and the payment-order and bank-reconciliation flows by
//! [`flows`]. Everything talks to the backend through the traits in
//! [`services::api`], so tests and other front ends can swap the transport.

pub mod combobox;
pub mod config;
pub mod error;
pub mod flows;
pub mod forms;
pub mod services;
pub mod table;

#[cfg(test)]
mod testing;

pub use combobox::{Combobox, Selection};
pub use config::ClientConfig;
pub use error::{FrontendError, Result};
pub use services::{ApiClient, ModelFetcher, ModelWriter, QueryCache, TreasuryApi};
pub use table::{RowSink, TableBuilder};
