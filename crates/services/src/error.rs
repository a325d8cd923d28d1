use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{kind} request to {url} failed: {source}")]
    Transport {
        kind: &'static str,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{kind} request timed out")]
    Timeout { kind: &'static str },

    #[error("{kind} request returned status {status}")]
    Status { kind: &'static str, status: u16 },

    #[error("{kind} response could not be decoded: {source}")]
    InvalidResponse {
        kind: &'static str,
        #[source]
        source: reqwest::Error,
    },
}

impl ServiceError {
    /// Transient failures are worth retrying: transport errors, timeouts,
    /// rate limits and server-side errors. Client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            ServiceError::Transport { .. } | ServiceError::Timeout { .. } => true,
            ServiceError::Status { status, .. } => *status == 429 || *status >= 500,
            ServiceError::InvalidResponse { .. } => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::Timeout { kind: "completion" }.is_transient());
        assert!(ServiceError::Status { kind: "embedding", status: 429 }.is_transient());
        assert!(ServiceError::Status { kind: "embedding", status: 503 }.is_transient());
        assert!(!ServiceError::Status { kind: "embedding", status: 400 }.is_transient());
    }
}
