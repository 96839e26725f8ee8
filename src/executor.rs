//! Reconciles a connection's chained results into one outcome per statement.
//!
//! The walk is a small state machine. `Send` issues the batch and makes
//! result 0 current; every later step is an `Advance`. Each step, whatever
//! its phase, reads the error channel, then the result channel, then records
//! exactly one outcome for the current cursor. The machine finishes when the
//! connection reports no further results.

use crate::{
    connection::{Connection, RowSource},
    BatchRequest, ExecutionReport, MultiQueryError, Result, Row, StatementOutcome,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Send,
    Advance,
    Finished,
}

/// Sends a batch over a connection and collects its [`ExecutionReport`].
///
/// Per-statement failures never abort the walk; they are accumulated in the
/// report so every result the server exposes is consumed.
pub struct BatchExecutor<'c, C: Connection> {
    conn: &'c mut C,
    phase: Phase,
    cursor: usize,
    report: ExecutionReport,
}

impl<'c, C: Connection> BatchExecutor<'c, C> {
    /// Runs `batch` on `conn` and returns the finished report.
    ///
    /// The connection must be open and idle; it is idle again afterwards.
    pub async fn execute(conn: &'c mut C, batch: &BatchRequest) -> ExecutionReport {
        let mut executor = Self {
            conn,
            phase: Phase::Send,
            cursor: 0,
            report: ExecutionReport::new(batch.clone()),
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(statements = batch.len(), "sending multi-statement batch");

        while executor.step().await {}

        #[cfg(feature = "tracing")]
        tracing::debug!(
            outcomes = executor.report.outcomes().len(),
            errors = executor.report.error_count(),
            exceptions = executor.report.exception_count(),
            "batch reconciled"
        );

        executor.report
    }

    /// Performs one transition. Returns `false` once finished.
    async fn step(&mut self) -> bool {
        let moved = match self.phase {
            Phase::Send => self.conn.send_batch(self.report.statements()).await,
            Phase::Advance => self.conn.advance_to_next_result().await,
            Phase::Finished => return false,
        };

        let outcome = match moved {
            Ok(_) => {
                self.capture_server_error();
                self.materialize().await
            }
            Err(error) => self.fail(error),
        };
        self.report.record_outcome(self.cursor, outcome);

        self.cursor += 1;
        self.phase = if self.conn.has_more_results() {
            #[cfg(feature = "tracing")]
            tracing::debug!(index = self.cursor, "advancing to next result");
            Phase::Advance
        } else {
            Phase::Finished
        };
        true
    }

    fn capture_server_error(&mut self) {
        if let Some(message) = self.conn.last_error().filter(|text| !text.is_empty()) {
            #[cfg(feature = "tracing")]
            tracing::debug!(index = self.cursor, error = message, "statement reported an error");

            let message = message.to_owned();
            self.report.record_error(self.cursor, message);
        }
    }

    // A result set wins over error text at the same cursor.
    async fn materialize(&mut self) -> StatementOutcome {
        let source = match self.conn.materialize_current_result().await {
            Ok(Some(source)) => source,
            Ok(None) => return StatementOutcome::NoRowSet,
            Err(error) => return self.fail(error),
        };

        match drain(source).await {
            Ok(rows) => StatementOutcome::RowSet(rows),
            Err(error) => self.fail(error),
        }
    }

    fn fail(&mut self, error: MultiQueryError) -> StatementOutcome {
        #[cfg(feature = "tracing")]
        tracing::debug!(index = self.cursor, %error, "transport failure while walking results");

        self.report.record_exception(self.cursor, error);
        StatementOutcome::Absent
    }
}

/// Reads every row, then drops the source so it is released before the
/// connection advances.
async fn drain<R: RowSource>(mut source: R) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    while let Some(row) = source.fetch_row().await? {
        rows.push(row);
    }
    Ok(rows)
}
