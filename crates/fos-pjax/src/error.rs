//! Error types
//!
//! [`PjaxError`] is fatal and returned from construction/initialization.
//! [`NavigationError`] is recoverable and only ever reaches user code through
//! the `onErrorPjax` callback.

use fos_dom::SelectorError;
use fos_net::NetError;

/// Initialization failure
#[derive(Debug, thiserror::Error)]
pub enum PjaxError {
    #[error("The target with identifier '{key}' could not be matched in the initial DOM using selector '{selector}'.")]
    MissingTarget { key: String, selector: String },

    #[error("Invalid selector '{selector}' for '{key}': {source}")]
    InvalidSelector {
        key: String,
        selector: String,
        #[source]
        source: SelectorError,
    },

    #[error("Invalid options: {0}")]
    Options(#[from] serde_json::Error),
}

/// HTTP status details attached to a failed navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorContext {
    pub status: u16,
    pub status_text: String,
}

/// Recoverable navigation failure, normalized to `{msg, context?}`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{msg}")]
pub struct NavigationError {
    pub msg: String,
    pub context: Option<ErrorContext>,
}

impl NavigationError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            msg: msg.into(),
            context: None,
        }
    }

    /// Non-ok or empty response: the message is the status text
    pub fn from_status(status: u16, status_text: &str) -> Self {
        Self {
            msg: status_text.to_string(),
            context: Some(ErrorContext {
                status,
                status_text: status_text.to_string(),
            }),
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.context.as_ref().map(|c| c.status)
    }
}

impl From<NetError> for NavigationError {
    fn from(err: NetError) -> Self {
        Self::new(err.to_string())
    }
}

impl From<String> for NavigationError {
    fn from(msg: String) -> Self {
        Self::new(msg)
    }
}

impl From<&str> for NavigationError {
    fn from(msg: &str) -> Self {
        Self::new(msg)
    }
}
