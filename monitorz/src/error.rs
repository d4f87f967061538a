//! Errors surfaced by agent requests.
//!
//! The `Display` text of each variant is exactly what the dashboard shows to
//! the user, so keep it short.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The agent answered, but not with a success status.
    #[error("HTTP {0}")]
    Status(u16),

    /// The request never completed (refused, reset, DNS, ...).
    #[error("{0}")]
    Transport(String),

    /// The body was not the JSON we expected.
    #[error("{0}")]
    Decode(String),

    #[error("invalid agent URL: {0}")]
    Url(String),

    /// Abandoned by the poller after waiting this long for an answer.
    #[error("agent did not respond within {}s", .0.as_secs())]
    Stalled(std::time::Duration),
}

impl From<reqwest::Error> for FetchError {
    fn from(e: reqwest::Error) -> Self {
        if let Some(status) = e.status() {
            return FetchError::Status(status.as_u16());
        }
        if e.is_decode() {
            return FetchError::Decode(e.to_string());
        }
        FetchError::Transport(error_chain(&e))
    }
}

// reqwest's top-level message only names the URL; the useful part
// ("Connection refused") sits further down the source chain.
fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = e.to_string();
    let mut cur = e.source();
    while let Some(src) = cur {
        let s = src.to_string();
        if !msg.contains(&s) {
            msg.push_str(": ");
            msg.push_str(&s);
        }
        cur = src.source();
    }
    msg
}

impl From<url::ParseError> for FetchError {
    fn from(e: url::ParseError) -> Self {
        FetchError::Url(e.to_string())
    }
}
