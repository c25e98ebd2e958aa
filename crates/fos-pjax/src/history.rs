//! History state entries

use serde::{Deserialize, Serialize};

/// State object stored with each session history entry.
///
/// `contents` is the page HTML encoded as a JSON string literal, so the
/// entry survives any structured serialization the history store applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub url: String,
    pub contents: String,
}

impl HistoryEntry {
    pub fn new(url: &str, html: &str) -> Self {
        Self {
            url: url.to_string(),
            contents: serde_json::Value::from(html).to_string(),
        }
    }

    /// Decoded HTML snapshot; `None` if `contents` is not a JSON string
    pub fn html(&self) -> Option<String> {
        serde_json::from_str(&self.contents).ok()
    }

    /// A cached snapshot usable in place of a network fetch
    pub fn cached_html(&self) -> Option<String> {
        self.html().filter(|html| !html.is_empty())
    }
}

/// How a history entry is written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryMode {
    #[default]
    Push,
    /// Used for the initial-load entry to avoid a duplicate first entry
    Replace,
}
