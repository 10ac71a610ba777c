//! Domain-specific error types for netlens.
//!
//! Uses `thiserror` for ergonomic error definitions that integrate
//! with the broader `anyhow` error handling strategy.

use thiserror::Error;

/// Errors that can occur while talking to the traffic backend.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend returned {status} for {endpoint}")]
    Status {
        endpoint: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no data found at {endpoint}")]
    Empty { endpoint: String },
}

impl ApiError {
    /// True when the backend answered cleanly but had nothing to return.
    pub fn is_empty(&self) -> bool {
        matches!(self, ApiError::Empty { .. })
    }
}

/// Errors that can occur in the TUI layer.
#[derive(Error, Debug)]
pub enum UiError {
    #[error("terminal setup failed: {0}")]
    TerminalSetup(#[from] std::io::Error),
}

/// Result type alias using anyhow for application-level error handling.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_distinguishable() {
        let err = ApiError::Empty {
            endpoint: "/api/prediction/10.0.0.1".to_string(),
        };
        assert!(err.is_empty());

        let err = ApiError::Status {
            endpoint: "/api/traffic".to_string(),
            status: reqwest::StatusCode::BAD_GATEWAY,
        };
        assert!(!err.is_empty());
    }

    #[test]
    fn display_includes_endpoint() {
        let err = ApiError::Status {
            endpoint: "/api/traffic/aggregate".to_string(),
            status: reqwest::StatusCode::BAD_REQUEST,
        };
        let msg = err.to_string();
        assert!(msg.contains("/api/traffic/aggregate"));
        assert!(msg.contains("400"));
    }
}
