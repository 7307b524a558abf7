//! Error kinds surfaced by the pipeline.
//!
//! Every failure is reported once, to the caller, as an actionable message.
//! Nothing is retried and no error state is remembered between calls.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CopilotError {
    /// Bad caller input: empty corpus, empty question, zero question count.
    #[error("invalid input: {0}")]
    InputValidation(String),

    /// A read operation ran before a successful build.
    #[error("not ready: {0}")]
    NotReady(String),

    /// The embedding or generation service failed or answered with
    /// something unusable.
    #[error("{service} service failed: {message}")]
    ExternalService {
        service: &'static str,
        message: String,
    },

    /// Settings that cannot work together, e.g. a query embedding whose
    /// dimension differs from the built index.
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl CopilotError {
    /// Wrap a backend error, flattening its context chain into one message.
    pub fn external(service: &'static str, err: anyhow::Error) -> Self {
        CopilotError::ExternalService {
            service,
            message: format!("{:#}", err),
        }
    }

    /// Short machine-readable code, used by the HTTP error envelope.
    pub fn code(&self) -> &'static str {
        match self {
            CopilotError::InputValidation(_) => "bad_request",
            CopilotError::NotReady(_) => "not_ready",
            CopilotError::ExternalService { .. } => "upstream_error",
            CopilotError::Configuration(_) => "configuration",
        }
    }
}

pub type Result<T> = std::result::Result<T, CopilotError>;
