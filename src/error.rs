/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum MultiQueryError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// Non-success HTTP status code with raw response body.
    #[error("http error {status}: {body}")]
    Http { status: u16, body: String },
    /// SQL error returned for a control request (BEGIN, COMMIT, ROLLBACK).
    #[error("pipeline error at request {request_index}: {message}")]
    Pipeline {
        /// Index of the failing request in the pipeline payload.
        request_index: usize,
        /// Error message text from the server.
        message: String,
        /// Optional engine-specific error code.
        code: Option<String>,
    },
    /// Response decoding or protocol-shape validation error.
    #[error("decode error: {0}")]
    Decode(String),
    /// Connection-level failure reported by a [`Connection`](crate::Connection) implementation.
    #[error("connection error: {0}")]
    Connection(String),
    /// A batch must contain at least one statement.
    #[error("batch contains no statements")]
    EmptyBatch,
    /// No outcome was recorded for the requested statement index.
    #[error("there is no result for statement {index}")]
    ResultNotFound { index: usize },
    /// Results are withheld because at least one statement in the batch failed.
    #[error("results unavailable: batch had {errors} error(s) and {exceptions} exception(s)")]
    ResultsBlocked { errors: usize, exceptions: usize },
    /// The server exposed a different number of results than statements submitted.
    #[error("outcome count {outcomes} does not match statement count {statements}")]
    OutcomeCountMismatch { outcomes: usize, statements: usize },
}
