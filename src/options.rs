use std::time::Duration;

/// Configures the HTTP pipeline connection.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self { timeout_ms: 10_000 }
    }
}

/// Configures retry behavior of a [`TransactionRunner`](crate::TransactionRunner).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionOptions {
    /// Extra attempts after the first one fails.
    pub retry_attempts: usize,
    /// Delay between a failed attempt and the next one.
    pub retry_sleep: Duration,
    /// Delay between failed tries to begin a transaction.
    pub begin_retry_delay: Duration,
    /// Cap on retries to begin a transaction within one attempt.
    ///
    /// `None` retries until the connection accepts `BEGIN`.
    pub max_begin_retries: Option<usize>,
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            retry_attempts: 0,
            retry_sleep: Duration::from_secs(1),
            begin_retry_delay: Duration::from_secs(1),
            max_begin_retries: None,
        }
    }
}

impl TransactionOptions {
    pub fn with_retry_attempts(mut self, retry_attempts: usize) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_retry_sleep(mut self, retry_sleep: Duration) -> Self {
        self.retry_sleep = retry_sleep;
        self
    }

    pub fn with_begin_retry_delay(mut self, delay: Duration) -> Self {
        self.begin_retry_delay = delay;
        self
    }

    pub fn with_max_begin_retries(mut self, max: usize) -> Self {
        self.max_begin_retries = Some(max);
        self
    }

    /// Total number of attempts a run may make.
    pub fn total_attempts(&self) -> usize {
        self.retry_attempts.saturating_add(1)
    }

    /// Builds options from environment variables, falling back to defaults.
    ///
    /// Reads:
    /// - `MULTIQUERY_RETRY_ATTEMPTS`: extra attempts after the first
    /// - `MULTIQUERY_RETRY_SLEEP_MS`: delay between attempts in milliseconds
    ///
    /// Returns an error if a variable is set but not a non-negative integer.
    pub fn from_env() -> std::result::Result<Self, String> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> std::result::Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut options = Self::default();
        if let Some(attempts) = read_u64(&lookup, "MULTIQUERY_RETRY_ATTEMPTS")? {
            options.retry_attempts = usize::try_from(attempts)
                .map_err(|_| "MULTIQUERY_RETRY_ATTEMPTS is out of range".to_owned())?;
        }
        if let Some(sleep_ms) = read_u64(&lookup, "MULTIQUERY_RETRY_SLEEP_MS")? {
            options.retry_sleep = Duration::from_millis(sleep_ms);
        }
        Ok(options)
    }
}

fn read_u64<F>(lookup: &F, name: &str) -> std::result::Result<Option<u64>, String>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| format!("{name} must be a non-negative integer: {err}")),
        None => Ok(None),
    }
}
