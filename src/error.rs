use thiserror::Error;

/// Failures surfaced by the fetch/normalize/stats core.
///
/// None of these are retried; the first error aborts the whole report.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The explorer reported a terminal status. Carries the explorer's
    /// message and the raw `result` payload verbatim.
    #[error("explorer error: {message} | result={result}")]
    Source { message: String, result: String },

    /// Request-level failure (connect, timeout, non-success HTTP status,
    /// undecodable body).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Required configuration missing or out of range at invocation time.
    #[error("configuration error: {0}")]
    Config(String),

    /// Malformed record field or mismatched series input.
    #[error("validation error: {0}")]
    Validation(String),
}
