use std::sync::Arc;

use crate::{MultiQueryError, Result};

/// Separator placed between statements when a batch is sent as one SQL text.
pub const STATEMENT_SEPARATOR: &str = ";";

/// Ordered, non-empty list of SQL statements sent in one round-trip.
///
/// The index of a statement in the batch is the index its outcome and error
/// are reported under. Cloning is cheap and shares the same statement list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BatchRequest {
    statements: Arc<[String]>,
}

impl BatchRequest {
    /// Builds a batch, rejecting an empty statement list.
    pub fn new<I, S>(statements: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let statements: Vec<String> = statements.into_iter().map(Into::into).collect();
        if statements.is_empty() {
            return Err(MultiQueryError::EmptyBatch);
        }
        Ok(Self {
            statements: statements.into(),
        })
    }

    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.statements.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.statements.len()
    }

    /// Always false; kept for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.statements.is_empty()
    }

    /// All statements joined with [`STATEMENT_SEPARATOR`], for connections
    /// that accept several statements in a single SQL text.
    pub fn combined_sql(&self) -> String {
        self.statements.join(STATEMENT_SEPARATOR)
    }
}
