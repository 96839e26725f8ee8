use std::time::Duration;

use multiquery::{
    BatchExecutor, BatchRequest, PipelineConnection, StatementOutcome, TransactionOptions,
    TransactionRunner, TransactionWarning, WarningSink,
};

struct StderrSink;

impl WarningSink for StderrSink {
    fn warn(&self, warning: &TransactionWarning<'_>) {
        eprintln!("warning: {warning:?}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut conn = PipelineConnection::from_env().map_err(anyhow::Error::msg)?;

    let setup = BatchRequest::new([
        "CREATE TABLE IF NOT EXISTS persons (id INTEGER PRIMARY KEY, first_name TEXT NOT NULL)",
    ])?;
    let report = BatchExecutor::execute(&mut conn, &setup).await;
    if !report.was_successful() {
        anyhow::bail!("setup failed: {:?}", report.errors());
    }

    let inserts = BatchRequest::new([
        "INSERT INTO persons (first_name) VALUES ('Joe')",
        "INSERT INTO persons (first_name) VALUES ('Samantha')",
    ])?;
    let options = TransactionOptions::default()
        .with_retry_attempts(2)
        .with_retry_sleep(Duration::from_millis(500));
    let runner = TransactionRunner::run_with_sink(&mut conn, inserts, options, StderrSink).await;
    println!(
        "transaction {:?} after {} attempt(s)",
        runner.status(),
        runner.attempts()
    );

    let queries = BatchRequest::new([
        "SELECT * FROM persons",
        "SELECT COUNT(*) AS n FROM persons",
    ])?;
    let report = BatchExecutor::execute(&mut conn, &queries).await;
    for (index, outcome) in report.results()?.iter().enumerate() {
        match outcome {
            StatementOutcome::RowSet(rows) => println!("statement {index}: {} row(s)", rows.len()),
            StatementOutcome::NoRowSet => println!("statement {index}: no result set"),
            StatementOutcome::Absent => println!("statement {index}: unknown"),
        }
    }

    Ok(())
}
