use thiserror::Error;

/// Failure of a single probe attempt.
///
/// These never leave the executor: every variant is folded into a down
/// verdict with the rendered message as the response error.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("timed out")]
    Timeout,

    #[error("Invalid probe request: {0}")]
    InvalidRequest(String),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("{0}")]
    Request(String),

    #[error("{0}")]
    Connect(#[from] std::io::Error),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),
}

impl ProbeError {
    /// Wrap a reqwest error, keeping the full source chain in the message.
    ///
    /// reqwest's own `Display` only says "error sending request"; the useful
    /// part (DNS failure, refused connection, TLS) lives in the sources.
    pub fn from_reqwest(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return ProbeError::Timeout;
        }
        ProbeError::Request(describe(&error))
    }
}

/// Render an error and all of its sources as `outer: inner: root`.
pub fn describe(error: &dyn std::error::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("outer")]
    struct Outer(#[source] std::io::Error);

    #[test]
    fn test_describe_includes_sources() {
        let error = Outer(std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused"));
        assert_eq!(describe(&error), "outer: refused");
    }

    #[test]
    fn test_timeout_message() {
        assert_eq!(ProbeError::Timeout.to_string(), "timed out");
    }
}
