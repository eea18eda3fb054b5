/// Directory transport errors
///
/// Every failure talking to Views surfaces as a [`DirectoryError`], never as
/// part of a payload. [`DirectoryError::is_transient`] decides whether a GET
/// may be retried.

/// Errors from the Views directory
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    /// Connection or protocol failure
    #[error("HTTP error: {0}")]
    Http(#[source] reqwest::Error),

    /// The per-request timeout elapsed
    #[error("Request timed out")]
    Timeout,

    /// Views answered with a non-success status
    #[error("Directory returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Views answered 429 Too Many Requests
    #[error("Rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The body could not be decoded
    #[error("Malformed response: {0}")]
    Parse(String),
}

impl DirectoryError {
    /// True for failures that may succeed on a later attempt
    ///
    /// Connection failures, timeouts, 5xx and 429 are transient. Other 4xx
    /// and malformed bodies are permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            DirectoryError::Http(e) => e.is_connect() || e.is_request(),
            DirectoryError::Timeout => true,
            DirectoryError::Status { status, .. } => *status >= 500,
            DirectoryError::RateLimited { .. } => true,
            DirectoryError::Parse(_) => false,
        }
    }
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DirectoryError::Timeout
        } else {
            DirectoryError::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        let server = DirectoryError::Status { status: 503, body: String::new() };
        let not_found = DirectoryError::Status { status: 404, body: String::new() };
        let unauthorized = DirectoryError::Status { status: 401, body: String::new() };

        assert!(server.is_transient());
        assert!(!not_found.is_transient());
        assert!(!unauthorized.is_transient());
    }

    #[test]
    fn test_timeout_and_rate_limit_are_transient() {
        assert!(DirectoryError::Timeout.is_transient());
        assert!(DirectoryError::RateLimited { retry_after_secs: 5 }.is_transient());
    }

    #[test]
    fn test_parse_is_permanent() {
        assert!(!DirectoryError::Parse("expected value".to_string()).is_transient());
    }
}
