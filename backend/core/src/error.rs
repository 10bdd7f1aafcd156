use thiserror::Error;

/// Top-level error type for the EmberChat runtime.
///
/// Only `Config` is fatal, and only at startup. Everything else is reported
/// per turn: backend and store failures are caught at the turn controller
/// boundary and surfaced as a single consumer-visible error signal.
#[derive(Debug, Error)]
pub enum ChatError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("inference backend unreachable: {0}")]
    BackendUnreachable(String),

    #[error("inference backend protocol error: {0}")]
    BackendProtocol(String),

    #[error("conversation store error: {0}")]
    Store(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ChatError::BackendUnreachable("connection refused".to_string());
        assert_eq!(
            err.to_string(),
            "inference backend unreachable: connection refused"
        );
    }

    #[test]
    fn test_anyhow_conversion() {
        let err: ChatError = anyhow::anyhow!("boom").into();
        assert_eq!(err.to_string(), "boom");
    }
}
