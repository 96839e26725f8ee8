//! All-or-nothing execution of a batch with bounded retry.
//!
//! Each attempt is `begin → batch → commit`, falling back to `rollback` if
//! any statement failed, the result chain was incomplete, or the commit
//! itself failed. A failed attempt is reported to the [`WarningSink`] and,
//! while attempts remain, retried after [`TransactionOptions::retry_sleep`].
//! Running out of attempts is not an error: the runner ends in
//! [`TransactionStatus::Failed`] and callers check
//! [`TransactionRunner::was_successful`].
//!
//! Statements that implicitly commit (DDL on most engines) are not detected,
//! and nothing checks that the storage engine supports transactions.

use tokio::time::sleep;

use crate::{
    sink::{TracingSink, TransactionWarning, WarningSink},
    BatchExecutor, BatchRequest, Connection, ExecutionReport, TransactionOptions,
    TransactionStatus,
};

/// One `begin → batch → commit-or-rollback` cycle.
#[derive(Debug)]
pub struct TransactionAttempt {
    number: usize,
    statements: BatchRequest,
    status: TransactionStatus,
    report: Option<ExecutionReport>,
}

impl TransactionAttempt {
    /// 1-based position of this attempt within the run.
    pub fn number(&self) -> usize {
        self.number
    }

    pub fn status(&self) -> TransactionStatus {
        self.status
    }

    /// The statements this attempt ran, shared with the runner.
    pub fn statements(&self) -> &BatchRequest {
        &self.statements
    }

    /// Report of the batch run in this attempt. `None` if the transaction
    /// could not be started.
    pub fn report(&self) -> Option<&ExecutionReport> {
        self.report.as_ref()
    }
}

/// Runs a batch inside a transaction, retrying failed attempts.
#[derive(Debug)]
pub struct TransactionRunner {
    statements: BatchRequest,
    last_attempt: TransactionAttempt,
}

impl TransactionRunner {
    /// Runs `statements` as a transaction on `conn`, logging warnings
    /// through [`TracingSink`].
    pub async fn run<C: Connection>(
        conn: &mut C,
        statements: BatchRequest,
        options: TransactionOptions,
    ) -> Self {
        Self::run_with_sink(conn, statements, options, TracingSink).await
    }

    /// Runs `statements` as a transaction on `conn`, sending warnings to `sink`.
    pub async fn run_with_sink<C, S>(
        conn: &mut C,
        statements: BatchRequest,
        options: TransactionOptions,
        sink: S,
    ) -> Self
    where
        C: Connection,
        S: WarningSink,
    {
        let total = options.total_attempts();
        let mut number = 1;

        let last_attempt = loop {
            let attempt = run_attempt(conn, &statements, &options, &sink, number).await;
            if attempt.status == TransactionStatus::Succeeded {
                break attempt;
            }

            let remaining = total - number;
            sink.warn(&TransactionWarning::AttemptFailed {
                attempt: number,
                remaining,
            });
            if remaining == 0 {
                break attempt;
            }

            sleep(options.retry_sleep).await;
            number += 1;
        };

        Self {
            statements,
            last_attempt,
        }
    }

    pub fn was_successful(&self) -> bool {
        self.status() == TransactionStatus::Succeeded
    }

    pub fn status(&self) -> TransactionStatus {
        self.last_attempt.status
    }

    /// The statements this transaction ran. Useful when diagnosing a failure.
    pub fn statements(&self) -> &BatchRequest {
        &self.statements
    }

    /// Number of attempts made.
    pub fn attempts(&self) -> usize {
        self.last_attempt.number
    }

    pub fn last_attempt(&self) -> &TransactionAttempt {
        &self.last_attempt
    }

    /// Report of the most recent batch, for finding which statement failed.
    pub fn report(&self) -> Option<&ExecutionReport> {
        self.last_attempt.report()
    }
}

async fn run_attempt<C, S>(
    conn: &mut C,
    statements: &BatchRequest,
    options: &TransactionOptions,
    sink: &S,
    number: usize,
) -> TransactionAttempt
where
    C: Connection,
    S: WarningSink,
{
    if !begin(conn, options, sink).await {
        return TransactionAttempt {
            number,
            statements: statements.clone(),
            status: TransactionStatus::Failed,
            report: None,
        };
    }

    let report = BatchExecutor::execute(conn, statements).await;

    let clean = if report.has_errors_or_exceptions() {
        false
    } else if !report.is_complete() {
        sink.warn(&TransactionWarning::OutcomeCountMismatch {
            outcomes: report.outcomes().len(),
            statements: statements.len(),
        });
        false
    } else {
        true
    };

    let status = if !clean {
        rollback(conn, sink).await;
        TransactionStatus::Failed
    } else {
        match conn.commit().await {
            Ok(()) => TransactionStatus::Succeeded,
            Err(error) => {
                sink.warn(&TransactionWarning::CommitFailed { error: &error });
                rollback(conn, sink).await;
                TransactionStatus::Failed
            }
        }
    };

    #[cfg(feature = "tracing")]
    tracing::debug!(attempt = number, ?status, "transaction attempt finished");

    TransactionAttempt {
        number,
        statements: statements.clone(),
        status,
        report: Some(report),
    }
}

/// Begins a transaction, retrying after `begin_retry_delay` until it
/// succeeds or `max_begin_retries` is exhausted.
async fn begin<C, S>(conn: &mut C, options: &TransactionOptions, sink: &S) -> bool
where
    C: Connection,
    S: WarningSink,
{
    let mut retries = 0;
    loop {
        let error = match conn.begin_transaction().await {
            Ok(()) => return true,
            Err(error) => error,
        };

        if options.max_begin_retries.is_some_and(|max| retries >= max) {
            sink.warn(&TransactionWarning::BeginRetriesExhausted { retries });
            return false;
        }

        sink.warn(&TransactionWarning::BeginFailed {
            error: &error,
            retry_in: options.begin_retry_delay,
        });
        sleep(options.begin_retry_delay).await;
        retries += 1;
    }
}

async fn rollback<C: Connection, S: WarningSink>(conn: &mut C, sink: &S) {
    if let Err(error) = conn.rollback().await {
        sink.warn(&TransactionWarning::RollbackFailed { error: &error });
    }
}
