//! The capability set the executor and transaction runner need from a
//! database connection.
//!
//! A connection exposes the results of a multi-statement request as a
//! chain: after [`Connection::send_batch`] the first statement's result is
//! current, and each [`Connection::advance_to_next_result`] moves to the next
//! one. Per-statement SQL errors are reported through
//! [`Connection::last_error`]; an `Err` return from any method is a
//! transport or protocol failure.

use crate::{BatchRequest, Result, Row};

/// A result set exposed by a connection, drained one row at a time.
///
/// The handle is dropped as soon as it is drained, which must release any
/// resources the connection holds for it.
#[allow(async_fn_in_trait)]
pub trait RowSource {
    /// Returns the next row, or `None` once the result set is exhausted.
    async fn fetch_row(&mut self) -> Result<Option<Row>>;
}

#[allow(async_fn_in_trait)]
pub trait Connection {
    type Rows: RowSource;

    /// Sends every statement of `batch` in one request and makes the first
    /// statement's result current.
    ///
    /// Returns `Ok(false)` if the first statement failed on the server.
    async fn send_batch(&mut self, batch: &BatchRequest) -> Result<bool>;

    /// Makes the next statement's result current.
    ///
    /// Returns `Ok(false)` if there is no next result or if it is an error.
    async fn advance_to_next_result(&mut self) -> Result<bool>;

    /// Whether another result follows the current one.
    fn has_more_results(&self) -> bool;

    /// Server-reported error text for the current result, if any.
    fn last_error(&self) -> Option<&str>;

    /// Returns the current result's rows, or `None` if the statement
    /// produced no result set.
    async fn materialize_current_result(&mut self) -> Result<Option<Self::Rows>>;

    async fn begin_transaction(&mut self) -> Result<()>;

    async fn commit(&mut self) -> Result<()>;

    async fn rollback(&mut self) -> Result<()>;
}
