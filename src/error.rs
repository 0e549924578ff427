//! Crate-level error type.
//!
//! Every fallible operation in the widget returns [`WidgetError`]. None of
//! these errors is fatal to the process: the controller turns request
//! failures into a user-visible apology and always returns to idle.

use thiserror::Error;

/// Errors produced while configuring the widget or talking to the endpoint.
#[derive(Debug, Error)]
pub enum WidgetError {
    /// A configuration value is missing or malformed.
    #[error("invalid config field '{field}': {detail}")]
    Config { field: &'static str, detail: String },

    /// The configuration file could not be read or parsed.
    #[error("config file {path}: {detail}")]
    ConfigFile { path: String, detail: String },

    /// The request never produced a response (DNS, connect, TLS, ...).
    #[error("request to {url} failed: {detail}")]
    Request { url: String, detail: String },

    /// The endpoint replied with a non-2xx status code.
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// The response carried no readable body.
    #[error("response has no readable body")]
    NoBody,

    /// Reading the response body failed part way through.
    #[error("stream read failed: {detail}")]
    Stream { detail: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WidgetError {
    /// True for failures that happen before any response body is consumed.
    ///
    /// These are the errors the controller answers with the apology message.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            WidgetError::Request { .. } | WidgetError::Status { .. } | WidgetError::NoBody
        )
    }
}

pub type Result<T> = std::result::Result<T, WidgetError>;
