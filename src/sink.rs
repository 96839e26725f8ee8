//! Warning signals raised while running transactions.

use std::time::Duration;

use crate::MultiQueryError;

/// A non-fatal condition the transaction runner reports and then handles.
#[derive(Debug)]
pub enum TransactionWarning<'a> {
    /// The connection refused to begin a transaction; it is retried after `retry_in`.
    BeginFailed {
        error: &'a MultiQueryError,
        retry_in: Duration,
    },
    /// The configured cap on begin retries was reached.
    BeginRetriesExhausted { retries: usize },
    /// A clean batch exposed a different number of results than statements.
    OutcomeCountMismatch { outcomes: usize, statements: usize },
    CommitFailed { error: &'a MultiQueryError },
    RollbackFailed { error: &'a MultiQueryError },
    /// An attempt was rolled back. `remaining` attempts are left.
    AttemptFailed { attempt: usize, remaining: usize },
}

/// Receives warnings from a [`TransactionRunner`](crate::TransactionRunner).
pub trait WarningSink {
    fn warn(&self, warning: &TransactionWarning<'_>);
}

/// Writes warnings as `tracing` events. Does nothing when the `tracing`
/// feature is disabled.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl WarningSink for TracingSink {
    #[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
    fn warn(&self, warning: &TransactionWarning<'_>) {
        #[cfg(feature = "tracing")]
        emit(warning);
    }
}

#[cfg(feature = "tracing")]
fn emit(warning: &TransactionWarning<'_>) {
    match warning {
        TransactionWarning::BeginFailed { error, retry_in } => tracing::warn!(
            %error,
            ?retry_in,
            "failed to start transaction, retrying"
        ),
        TransactionWarning::BeginRetriesExhausted { retries } => {
            tracing::warn!(retries, "gave up starting transaction")
        }
        TransactionWarning::OutcomeCountMismatch {
            outcomes,
            statements,
        } => tracing::warn!(
            outcomes,
            statements,
            "result count does not match statement count, rolling back"
        ),
        TransactionWarning::CommitFailed { error } => {
            tracing::warn!(%error, "commit failed, rolling back")
        }
        TransactionWarning::RollbackFailed { error } => {
            tracing::warn!(%error, "rollback failed")
        }
        TransactionWarning::AttemptFailed { attempt, remaining } => {
            tracing::warn!(attempt, remaining, "transaction failed")
        }
    }
}

impl<S: WarningSink + ?Sized> WarningSink for &S {
    fn warn(&self, warning: &TransactionWarning<'_>) {
        (**self).warn(warning)
    }
}
