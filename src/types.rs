use crate::{MultiQueryError, Row};

/// How a single statement of a batch ended.
#[derive(Clone, Debug, PartialEq)]
pub enum StatementOutcome {
    /// The statement returned a result set, fully drained.
    RowSet(Vec<Row>),
    /// The statement ran but produced no result set (INSERT, UPDATE, DDL).
    NoRowSet,
    /// A transport failure at this position left the outcome unknown.
    Absent,
}

impl StatementOutcome {
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Self::RowSet(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn is_row_set(&self) -> bool {
        matches!(self, Self::RowSet(_))
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// A transport or protocol failure raised while walking the result chain.
#[derive(Debug)]
pub struct BatchException {
    /// Cursor position (statement index) at which the failure occurred.
    pub index: usize,
    pub error: MultiQueryError,
}

/// Final state of a transaction run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransactionStatus {
    /// No attempt has completed yet.
    #[default]
    NotApplicable,
    Succeeded,
    /// The last attempt was rolled back.
    Failed,
}
