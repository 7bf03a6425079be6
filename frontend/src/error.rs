//! Error type of the client library.
//!
//! Every action (fetch, submit, upload) returns these to its caller; nothing
//! is retried and nothing is swallowed. The UI decides how to show them.

use shared::tesoreria::AllocationConflict;
use shared::{FilterError, QueryError, ValidationError};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, FrontendError>;

#[derive(Debug, Error)]
pub enum FrontendError {
    /// Network failure, timeout or undecodable body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx answer.
    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    /// The payment order needs an invoice split across several projects.
    #[error("multi-project allocation required for {} invoice(s)", .0.facturas_varios.len())]
    AllocationRequired(AllocationConflict),

    #[error("unknown model '{0}'")]
    UnknownModel(String),

    #[error("invalid page {0}: pages start at 1")]
    InvalidPage(u32),

    #[error("invalid input: {}", format_validation(.0))]
    Validation(Vec<ValidationError>),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("draft store error: {0}")]
    Draft(String),

    /// The movement is not in the loaded bank statement.
    #[error("movement {0} is not in the loaded statement")]
    UnknownMovement(i64),

    #[error("a submission is already being processed")]
    AlreadyProcessing,

    #[error("configuration error: {0}")]
    Config(String),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<QueryError> for FrontendError {
    fn from(err: QueryError) -> Self {
        match err {
            QueryError::InvalidPage(page) => FrontendError::InvalidPage(page),
            QueryError::Filter(err) => FrontendError::Filter(err),
        }
    }
}

impl From<std::io::Error> for FrontendError {
    fn from(err: std::io::Error) -> Self {
        FrontendError::Draft(err.to_string())
    }
}

impl FrontendError {
    /// HTTP status of the failure, when there was a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            FrontendError::Api { status, .. } => Some(*status),
            FrontendError::AllocationRequired(_) => Some(400),
            FrontendError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
