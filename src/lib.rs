//! `multiquery` sends many SQL statements to a database in one round-trip
//! and reconciles the per-statement results.
//!
//! - [`BatchExecutor::execute`] walks a connection's chained results and
//!   produces an [`ExecutionReport`] with one [`StatementOutcome`] per
//!   statement, plus any server errors and transport failures.
//! - [`TransactionRunner::run`] wraps a batch in `BEGIN`/`COMMIT`, rolls
//!   back when any statement failed, and retries the whole attempt.
//!
//! Any database that exposes multi-statement results one at a time can be
//! plugged in through the [`Connection`] trait. [`PipelineConnection`]
//! implements it over the libSQL `/v2/pipeline` HTTP endpoint.

mod baton;
mod connection;
mod decode;
mod error;
mod executor;
mod options;
mod pipeline;
mod report;
mod request;
mod row;
mod sink;
mod transaction;
mod types;
mod value;
mod wire;

pub use baton::Baton;
pub use connection::{Connection, RowSource};
pub use error::MultiQueryError;
pub use executor::BatchExecutor;
pub use options::{ClientOptions, TransactionOptions};
pub use pipeline::{PipelineConnection, PipelineRows};
pub use report::ExecutionReport;
pub use request::{BatchRequest, STATEMENT_SEPARATOR};
pub use row::Row;
pub use sink::{TracingSink, TransactionWarning, WarningSink};
pub use transaction::{TransactionAttempt, TransactionRunner};
pub use types::{BatchException, StatementOutcome, TransactionStatus};
pub use value::Value;

pub type Result<T> = std::result::Result<T, MultiQueryError>;
