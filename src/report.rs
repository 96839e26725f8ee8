use std::collections::BTreeMap;

use crate::{BatchException, BatchRequest, MultiQueryError, Result, Row, StatementOutcome};

/// Everything a batch execution produced, keyed by statement index.
///
/// Once any statement reported an error or a transport failure occurred,
/// the whole batch is considered poisoned and the retrieval methods
/// ([`result`](Self::result), [`results`](Self::results),
/// [`merged_result`](Self::merged_result)) refuse to hand out rows.
#[derive(Debug)]
pub struct ExecutionReport {
    statements: BatchRequest,
    outcomes: Vec<StatementOutcome>,
    errors: BTreeMap<usize, String>,
    exceptions: Vec<BatchException>,
}

impl ExecutionReport {
    pub(crate) fn new(statements: BatchRequest) -> Self {
        let capacity = statements.len();
        Self {
            statements,
            outcomes: Vec::with_capacity(capacity),
            errors: BTreeMap::new(),
            exceptions: Vec::new(),
        }
    }

    pub(crate) fn record_outcome(&mut self, index: usize, outcome: StatementOutcome) {
        debug_assert_eq!(index, self.outcomes.len());
        self.outcomes.push(outcome);
    }

    pub(crate) fn record_error(&mut self, index: usize, message: impl Into<String>) {
        self.errors.insert(index, message.into());
    }

    pub(crate) fn record_exception(&mut self, index: usize, error: MultiQueryError) {
        self.exceptions.push(BatchException { index, error });
    }

    pub fn statements(&self) -> &BatchRequest {
        &self.statements
    }

    /// Recorded outcomes, including `Absent` entries. Never blocked.
    pub fn outcomes(&self) -> &[StatementOutcome] {
        &self.outcomes
    }

    /// Whether the server exposed exactly one result per statement.
    pub fn is_complete(&self) -> bool {
        self.outcomes.len() == self.statements.len()
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn has_exceptions(&self) -> bool {
        !self.exceptions.is_empty()
    }

    pub fn has_errors_or_exceptions(&self) -> bool {
        self.has_errors() || self.has_exceptions()
    }

    pub fn was_successful(&self) -> bool {
        !self.has_errors_or_exceptions()
    }

    /// Server-reported error text by statement index.
    pub fn errors(&self) -> &BTreeMap<usize, String> {
        &self.errors
    }

    pub fn exceptions(&self) -> &[BatchException] {
        &self.exceptions
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn exception_count(&self) -> usize {
        self.exceptions.len()
    }

    /// Returns the outcome of the statement at `index`.
    pub fn result(&self, index: usize) -> Result<&StatementOutcome> {
        self.ensure_not_poisoned()?;
        match self.outcomes.get(index) {
            Some(StatementOutcome::Absent) | None => Err(MultiQueryError::ResultNotFound { index }),
            Some(outcome) => Ok(outcome),
        }
    }

    pub fn results(&self) -> Result<&[StatementOutcome]> {
        self.ensure_not_poisoned()?;
        Ok(&self.outcomes)
    }

    /// Concatenates the rows of every result set, in statement order then
    /// row order. Columns are not reconciled across result sets.
    pub fn merged_result(&self) -> Result<Vec<Row>> {
        self.ensure_not_poisoned()?;
        Ok(self
            .outcomes
            .iter()
            .filter_map(StatementOutcome::rows)
            .flatten()
            .cloned()
            .collect())
    }

    /// Like [`merged_result`](Self::merged_result) but moves the rows out.
    pub fn into_merged_result(self) -> Result<Vec<Row>> {
        self.ensure_not_poisoned()?;
        Ok(self
            .outcomes
            .into_iter()
            .filter_map(|outcome| match outcome {
                StatementOutcome::RowSet(rows) => Some(rows),
                _ => None,
            })
            .flatten()
            .collect())
    }

    fn ensure_not_poisoned(&self) -> Result<()> {
        if self.has_errors_or_exceptions() {
            return Err(MultiQueryError::ResultsBlocked {
                errors: self.error_count(),
                exceptions: self.exception_count(),
            });
        }
        Ok(())
    }
}
