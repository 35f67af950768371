//! # Link Error Types Module
//!
//! This module defines the closed error type returned by the invite authority
//! and the single place where the authority's free-text error surface is
//! mapped onto it.

use std::time::Duration;

use teloxide::RequestError;
use thiserror::Error;

/// Error surfaced by the invite authority for a single group
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The bot lacks the rights needed to create invite links
    #[error("Permission error: {0}")]
    Permission(String),
    /// The group no longer exists or cannot be seen by the bot
    #[error("Not found error: {0}")]
    NotFound(String),
    /// The bot itself was removed or banned from the group
    #[error("Ejected error: {0}")]
    Ejected(String),
    /// The authority asked us to slow down
    #[error("Throttled error: {message}")]
    Throttled {
        message: String,
        retry_after: Option<Duration>,
    },
    /// Network failures, timeouts, server-side errors and anything unrecognised
    #[error("Transient error: {0}")]
    Transient(String),
}

impl LinkError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, LinkError::Throttled { .. } | LinkError::Transient(_))
    }

    /// Minimum wait requested by the authority before the next attempt
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            LinkError::Throttled { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Short machine-readable label, used as a structured log field
    pub fn kind(&self) -> &'static str {
        match self {
            LinkError::Permission(_) => "permission",
            LinkError::NotFound(_) => "not_found",
            LinkError::Ejected(_) => "ejected",
            LinkError::Throttled { .. } => "throttled",
            LinkError::Transient(_) => "transient",
        }
    }
}

/// Classify an error description returned by the Telegram Bot API.
///
/// This is the only place that matches on the API's message text.
pub fn classify_api_message(message: &str) -> LinkError {
    let lowered = message.to_lowercase();

    if lowered.contains("not enough rights") || lowered.contains("chat_admin_required") {
        LinkError::Permission(message.to_string())
    } else if lowered.contains("chat not found") {
        LinkError::NotFound(message.to_string())
    } else if lowered.contains("bot was kicked") {
        LinkError::Ejected(message.to_string())
    } else if lowered.contains("too many requests") {
        LinkError::Throttled {
            message: message.to_string(),
            retry_after: parse_retry_after(&lowered),
        }
    } else {
        LinkError::Transient(message.to_string())
    }
}

/// Extracts the `retry after N` hint Telegram appends to 429 descriptions
fn parse_retry_after(lowered: &str) -> Option<Duration> {
    let (_, tail) = lowered.split_once("retry after")?;
    let seconds: String = tail
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    seconds.parse::<u64>().ok().map(Duration::from_secs)
}

impl From<RequestError> for LinkError {
    fn from(err: RequestError) -> Self {
        match err {
            RequestError::RetryAfter(seconds) => LinkError::Throttled {
                message: format!("retry after {}s", seconds.seconds()),
                retry_after: Some(seconds.duration()),
            },
            RequestError::Api(api_error) => classify_api_message(&api_error.to_string()),
            other => LinkError::Transient(other.to_string()),
        }
    }
}
