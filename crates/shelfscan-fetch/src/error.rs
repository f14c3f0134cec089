use thiserror::Error;

use crate::challenge::ChallengeKind;

/// Failure taxonomy for both fetch paths.
///
/// Per-call failures are absorbed at the fetcher boundary: callers treat any
/// `FetchError` surviving the retry policy as an "unavailable" outcome and
/// apply fallback or degradation, never process-level abort.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level failure (timeout, connection reset, TLS). Retriable.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// HTTP 429. Retriable with backoff.
    #[error("rate limited at {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    /// Any other non-2xx status. 5xx is retriable, 4xx is not.
    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    /// Response body did not parse. Not retriable.
    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// Rendered page did not contain the expected structure. Not retriable.
    #[error("extraction failed for {context}: {reason}")]
    Extraction { context: String, reason: String },

    /// Structured detail/review fetch needs a numeric id the candidate does
    /// not have. Not retriable; forces the rendered path.
    #[error("candidate has no catalog id: {link}")]
    MissingId { link: String },

    /// A configured or derived URL failed to parse. Not retriable.
    #[error("invalid URL \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    /// The rendered session hit a bot-mitigation or login wall. Not a
    /// failure of the call itself: the owning task suspends and resolves
    /// through the challenge gate.
    #[error("challenge encountered: {0}")]
    ChallengeRequired(ChallengeKind),

    /// No operator confirmation arrived within the configured window.
    #[error("challenge unresolved after {waited_secs}s")]
    ChallengeTimeout { waited_secs: u64 },

    /// Session blob could not be read or written. Non-fatal: the run
    /// proceeds without a reusable session and expects more challenges.
    #[error("session store error at {path}: {reason}")]
    SessionUnavailable { path: String, reason: String },
}

impl FetchError {
    /// True for transient conditions worth another attempt after backoff:
    /// network-level failures, 429, and 5xx statuses.
    ///
    /// Challenges are deliberately not retriable here; they are handled by
    /// suspension and operator resolution, not by hammering the endpoint.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        match self {
            FetchError::Http(e) => {
                e.is_timeout() || e.is_connect() || e.status().is_some_and(|s| s.is_server_error())
            }
            FetchError::RateLimited { .. } => true,
            FetchError::UnexpectedStatus { status, .. } => (500..600).contains(status),
            FetchError::Deserialize { .. }
            | FetchError::Extraction { .. }
            | FetchError::MissingId { .. }
            | FetchError::InvalidUrl { .. }
            | FetchError::ChallengeRequired(_)
            | FetchError::ChallengeTimeout { .. }
            | FetchError::SessionUnavailable { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_limited_is_retriable() {
        let err = FetchError::RateLimited {
            url: "https://catalog.example/api/v2/products".to_owned(),
            retry_after_secs: 30,
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn server_error_status_is_retriable() {
        let err = FetchError::UnexpectedStatus {
            status: 503,
            url: "https://catalog.example/api/v2/products/1".to_owned(),
        };
        assert!(err.is_retriable());
    }

    #[test]
    fn client_error_status_is_not_retriable() {
        let err = FetchError::UnexpectedStatus {
            status: 403,
            url: "https://catalog.example/api/v2/products/1".to_owned(),
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn deserialize_error_is_not_retriable() {
        let source = serde_json::from_str::<()>("nope").unwrap_err();
        let err = FetchError::Deserialize {
            context: "test".to_owned(),
            source,
        };
        assert!(!err.is_retriable());
    }

    #[test]
    fn challenge_is_not_retriable() {
        assert!(!FetchError::ChallengeRequired(ChallengeKind::LoginRequired).is_retriable());
        assert!(!FetchError::ChallengeTimeout { waited_secs: 300 }.is_retriable());
    }

    #[test]
    fn missing_id_is_not_retriable() {
        let err = FetchError::MissingId {
            link: "https://catalog.example/item.html".to_owned(),
        };
        assert!(!err.is_retriable());
    }
}
