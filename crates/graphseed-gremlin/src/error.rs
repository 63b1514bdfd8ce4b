//! Errors raised at the Gremlin Server boundary.

/// Failure of a single round trip (or of session setup).
#[derive(Debug, thiserror::Error)]
pub enum GremlinError {
    #[error("failed to build http client: {0}")]
    Client(String),
    #[error("failed to reach gremlin server at {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("gremlin server at {url} rejected the credentials (http {status})")]
    Unauthorized { url: String, status: u16 },
    #[error("gremlin server error {code}: {message}")]
    Server { code: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("unexpected result: expected {expected}, got {got}")]
    UnexpectedResult { expected: &'static str, got: String },
    #[error("session is closed")]
    Closed,
    #[error("invalid session configuration: {0}")]
    Config(String),
}
