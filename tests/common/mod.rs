//! A scripted chained-result connection that behaves like a MySQL server
//! answering a multi-statement query: statements run in order, execution
//! stops at the first SQL error, and results are exposed one at a time.

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::{HashMap, VecDeque},
    rc::Rc,
};

use multiquery::{
    BatchRequest, Connection, MultiQueryError, Row, RowSource, TransactionWarning, Value,
    WarningSink, STATEMENT_SEPARATOR,
};

/// What the server does when it runs a statement.
#[derive(Clone, Debug)]
pub enum Reply {
    /// Returns these rows.
    Rows(Vec<Row>),
    /// Returns every row of the `persons` table.
    SelectAll,
    /// Appends a row to the `persons` table, no result set.
    Insert(Row),
    /// Acknowledges without a result set.
    Ack,
    /// SQL error; the server stops executing the remaining statements.
    SqlError(String),
    /// SQL error text alongside a result set; execution continues.
    ErrorWithRows(String, Vec<Row>),
    /// The link fails when advancing to this result.
    Transport(String),
    /// The link fails while materializing this result.
    BrokenResult(String),
}

#[derive(Debug)]
enum Slot {
    Rows(Vec<Row>),
    Ack,
    Error(String),
    ErrorWithRows(String, Vec<Row>),
    Transport(String),
    BrokenResult(String),
}

#[derive(Default)]
pub struct ScriptedConnection {
    script: HashMap<String, VecDeque<Reply>>,
    committed: Vec<Row>,
    uncommitted: Vec<Row>,
    in_transaction: bool,
    queue: VecDeque<Slot>,
    current: Option<Slot>,
    open_handles: Rc<Cell<usize>>,
    pub begin_failures: usize,
    pub commit_failures: usize,
    pub rollback_failures: usize,
    pub batches_sent: usize,
    pub begins: usize,
    pub commits: usize,
    pub rollbacks: usize,
    pub sent_sql: Vec<String>,
    /// Set if the connection was advanced while a result handle was alive.
    pub advanced_with_open_handle: bool,
}

impl ScriptedConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the reply for `sql`.
    pub fn on(mut self, sql: &str, reply: Reply) -> Self {
        self.script.insert(sql.to_owned(), VecDeque::from([reply]));
        self
    }

    /// Registers replies for successive executions of `sql`; the last one
    /// repeats.
    pub fn on_sequence(mut self, sql: &str, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.script
            .insert(sql.to_owned(), replies.into_iter().collect());
        self
    }

    pub fn with_committed_row(mut self, row: Row) -> Self {
        self.committed.push(row);
        self
    }

    /// Rows visible to a reader outside any transaction.
    pub fn committed_rows(&self) -> &[Row] {
        &self.committed
    }

    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    fn next_reply(&mut self, sql: &str) -> Reply {
        let Some(replies) = self.script.get_mut(sql) else {
            return Reply::SqlError(format!("You have an error in your SQL syntax near '{sql}'"));
        };
        if replies.len() > 1 {
            replies.pop_front().expect("non-empty script")
        } else {
            replies.front().cloned().expect("non-empty script")
        }
    }

    fn visible_rows(&self) -> Vec<Row> {
        self.committed
            .iter()
            .chain(self.uncommitted.iter())
            .cloned()
            .collect()
    }

    fn run_statement(&mut self, sql: &str) -> (Slot, bool) {
        match self.next_reply(sql) {
            Reply::Rows(rows) => (Slot::Rows(rows), true),
            Reply::SelectAll => (Slot::Rows(self.visible_rows()), true),
            Reply::Insert(row) => {
                if self.in_transaction {
                    self.uncommitted.push(row);
                } else {
                    self.committed.push(row);
                }
                (Slot::Ack, true)
            }
            Reply::Ack => (Slot::Ack, true),
            Reply::SqlError(message) => (Slot::Error(message), false),
            Reply::ErrorWithRows(message, rows) => (Slot::ErrorWithRows(message, rows), true),
            Reply::Transport(message) => (Slot::Transport(message), true),
            Reply::BrokenResult(message) => (Slot::BrokenResult(message), true),
        }
    }

    fn take_next(&mut self) -> Result<bool, MultiQueryError> {
        if self.open_handles.get() > 0 {
            self.advanced_with_open_handle = true;
        }
        self.current = self.queue.pop_front();
        match &self.current {
            Some(Slot::Transport(message)) => Err(MultiQueryError::Connection(message.clone())),
            Some(Slot::Error(_)) | None => Ok(false),
            Some(_) => Ok(true),
        }
    }
}

impl Connection for ScriptedConnection {
    type Rows = ScriptedRows;

    async fn send_batch(&mut self, batch: &BatchRequest) -> Result<bool, MultiQueryError> {
        self.batches_sent += 1;
        let combined = batch.combined_sql();
        self.sent_sql.push(combined.clone());

        self.queue.clear();
        for sql in combined.split(STATEMENT_SEPARATOR) {
            let (slot, keep_going) = self.run_statement(sql);
            self.queue.push_back(slot);
            if !keep_going {
                break;
            }
        }
        self.take_next()
    }

    async fn advance_to_next_result(&mut self) -> Result<bool, MultiQueryError> {
        self.take_next()
    }

    fn has_more_results(&self) -> bool {
        !self.queue.is_empty()
    }

    fn last_error(&self) -> Option<&str> {
        match &self.current {
            Some(Slot::Error(message)) | Some(Slot::ErrorWithRows(message, _)) => {
                Some(message.as_str())
            }
            _ => None,
        }
    }

    async fn materialize_current_result(
        &mut self,
    ) -> Result<Option<ScriptedRows>, MultiQueryError> {
        let rows = match self.current.take() {
            Some(Slot::Rows(rows)) | Some(Slot::ErrorWithRows(_, rows)) => rows,
            Some(Slot::BrokenResult(message)) => {
                return Err(MultiQueryError::Connection(message));
            }
            _ => return Ok(None),
        };
        self.open_handles.set(self.open_handles.get() + 1);
        Ok(Some(ScriptedRows {
            rows: rows.into(),
            open_handles: Rc::clone(&self.open_handles),
        }))
    }

    async fn begin_transaction(&mut self) -> Result<(), MultiQueryError> {
        if self.begin_failures > 0 {
            self.begin_failures -= 1;
            return Err(MultiQueryError::Connection(
                "MySQL server has gone away".to_owned(),
            ));
        }
        self.begins += 1;
        self.in_transaction = true;
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), MultiQueryError> {
        if self.commit_failures > 0 {
            self.commit_failures -= 1;
            return Err(MultiQueryError::Connection("commit refused".to_owned()));
        }
        self.commits += 1;
        self.committed.append(&mut self.uncommitted);
        self.in_transaction = false;
        Ok(())
    }

    async fn rollback(&mut self) -> Result<(), MultiQueryError> {
        self.rollbacks += 1;
        self.uncommitted.clear();
        self.in_transaction = false;
        if self.rollback_failures > 0 {
            self.rollback_failures -= 1;
            return Err(MultiQueryError::Connection("rollback refused".to_owned()));
        }
        Ok(())
    }
}

pub struct ScriptedRows {
    rows: VecDeque<Row>,
    open_handles: Rc<Cell<usize>>,
}

impl RowSource for ScriptedRows {
    async fn fetch_row(&mut self) -> Result<Option<Row>, MultiQueryError> {
        Ok(self.rows.pop_front())
    }
}

impl Drop for ScriptedRows {
    fn drop(&mut self) {
        self.open_handles.set(self.open_handles.get() - 1);
    }
}

/// Captures warnings by kind so tests can assert on them.
#[derive(Default)]
pub struct RecordingSink {
    warnings: RefCell<Vec<String>>,
}

impl RecordingSink {
    pub fn kinds(&self) -> Vec<String> {
        self.warnings.borrow().clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.warnings.borrow().iter().filter(|k| *k == kind).count()
    }
}

impl WarningSink for RecordingSink {
    fn warn(&self, warning: &TransactionWarning<'_>) {
        let kind = match warning {
            TransactionWarning::BeginFailed { .. } => "begin_failed",
            TransactionWarning::BeginRetriesExhausted { .. } => "begin_retries_exhausted",
            TransactionWarning::OutcomeCountMismatch { .. } => "outcome_count_mismatch",
            TransactionWarning::CommitFailed { .. } => "commit_failed",
            TransactionWarning::RollbackFailed { .. } => "rollback_failed",
            TransactionWarning::AttemptFailed { .. } => "attempt_failed",
        };
        self.warnings.borrow_mut().push(kind.to_owned());
    }
}

pub fn person(first: &str, last: &str) -> Row {
    Row::from_columns([
        ("FirstName", Value::text(first)),
        ("LastName", Value::text(last)),
    ])
}
