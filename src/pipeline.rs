//! [`Connection`] over the libSQL `/v2/pipeline` HTTP endpoint.
//!
//! A batch is one HTTP request holding one `execute` per statement; the
//! buffered results are then exposed one at a time as a result chain.
//! Transactions keep the server stream open between requests by presenting
//! the baton the server hands back.

use std::{collections::VecDeque, fmt, time::Duration};

use reqwest::header;

use crate::{
    baton::{Baton, Session},
    connection::{Connection, RowSource},
    decode::{column_names, decode_row},
    wire::{self, PipelineRequest, Request},
    BatchRequest, ClientOptions, MultiQueryError, Result, Row,
};

/// Chained-result connection to a libSQL pipeline endpoint.
pub struct PipelineConnection {
    http: reqwest::Client,
    pipeline_url: String,
    token: String,
    options: ClientOptions,
    session: Option<Session>,
    pending: VecDeque<wire::PipelineResult>,
    current: Option<wire::PipelineResult>,
}

impl fmt::Debug for PipelineConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConnection")
            .field("pipeline_url", &self.pipeline_url)
            .field("token", &"<redacted>")
            .field("options", &self.options)
            .field("in_transaction", &self.in_transaction())
            .finish()
    }
}

impl PipelineConnection {
    /// Creates a connection with a raw authorization header value.
    pub fn new(pipeline_url: impl Into<String>, authorization: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            pipeline_url: pipeline_url.into(),
            token: authorization.into(),
            options: ClientOptions::default(),
            session: None,
            pending: VecDeque::new(),
            current: None,
        }
    }

    /// Creates a connection from a bearer token.
    ///
    /// If the token is missing the `Bearer ` prefix, it is added automatically.
    pub fn new_bearer(pipeline_url: impl Into<String>, token: impl AsRef<str>) -> Self {
        let authorization = normalize_bearer_authorization(token.as_ref());
        Self::new(pipeline_url, authorization)
    }

    /// Creates a connection from environment variables.
    ///
    /// Reads:
    /// - `MULTIQUERY_PIPELINE_URL`: full pipeline endpoint URL
    /// - `MULTIQUERY_TOKEN`: access token (Bearer prefix optional)
    ///
    /// Returns an error if either variable is missing or empty.
    pub fn from_env() -> std::result::Result<Self, String> {
        let url = std::env::var("MULTIQUERY_PIPELINE_URL")
            .map_err(|_| "missing MULTIQUERY_PIPELINE_URL environment variable".to_owned())?;
        let token = std::env::var("MULTIQUERY_TOKEN")
            .map_err(|_| "missing MULTIQUERY_TOKEN environment variable".to_owned())?;
        if url.trim().is_empty() {
            return Err("MULTIQUERY_PIPELINE_URL is set but empty".to_owned());
        }
        if token.trim().is_empty() {
            return Err("MULTIQUERY_TOKEN is set but empty".to_owned());
        }
        Ok(Self::new_bearer(url, token))
    }

    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Whether a transaction stream is currently open.
    pub fn in_transaction(&self) -> bool {
        self.session.is_some()
    }

    /// Baton of the open transaction stream, if any.
    pub fn baton(&self) -> Option<&Baton> {
        self.session.as_ref()?.baton.as_ref()
    }

    fn request_url(&self) -> String {
        match self.session.as_ref().and_then(|s| s.base_url.as_deref()) {
            Some(base) => format!("{}/v2/pipeline", base.trim_end_matches('/')),
            None => self.pipeline_url.clone(),
        }
    }

    async fn send_pipeline(&self, requests: Vec<Request>) -> Result<wire::PipelineResponse> {
        let payload = PipelineRequest {
            baton: self.session.as_ref().and_then(Session::baton_value),
            requests,
        };

        #[cfg(feature = "tracing")]
        tracing::debug!(
            requests = payload.requests.len(),
            has_baton = payload.baton.is_some(),
            "posting pipeline request"
        );

        let response = self
            .http
            .post(self.request_url())
            .header(header::AUTHORIZATION, &self.token)
            .header(header::CONTENT_TYPE, "application/json")
            .timeout(Duration::from_millis(self.options.timeout_ms))
            .json(&payload)
            .send()
            .await
            .map_err(MultiQueryError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(MultiQueryError::Transport)?;
        if !status.is_success() {
            return Err(MultiQueryError::Http {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str::<wire::PipelineResponse>(&body).map_err(|err| {
            MultiQueryError::Decode(format!("invalid pipeline response JSON: {err}; body: {body}"))
        })
    }

    /// Sends a control statement (`COMMIT` or `ROLLBACK`) and closes the stream.
    async fn finish(&mut self, sql: &str) -> Result<()> {
        let response = self
            .send_pipeline(vec![Request::execute(sql), Request::Close {}])
            .await;
        // The close request ends the stream whatever the outcome.
        self.session = None;

        let mut results = expect_results(response?, 2)?.into_iter();
        let control = results
            .next()
            .ok_or_else(|| MultiQueryError::Decode(format!("missing {sql} result")))?;
        ensure_success(control, 0, "execute")?;
        let close = results
            .next()
            .ok_or_else(|| MultiQueryError::Decode("missing close result".to_owned()))?;
        ensure_success(close, 1, "close")
    }

    fn clear_results(&mut self) {
        self.pending.clear();
        self.current = None;
    }
}

impl Connection for PipelineConnection {
    type Rows = PipelineRows;

    async fn send_batch(&mut self, batch: &BatchRequest) -> Result<bool> {
        self.clear_results();

        let close = self.session.is_none();
        let mut requests: Vec<Request> = batch.statements().iter().map(Request::execute).collect();
        if close {
            requests.push(Request::Close {});
        }

        let response = self.send_pipeline(requests).await?;
        if let Some(session) = self.session.as_mut() {
            session.update(response.baton.clone(), response.base_url.clone());
        }

        let expected = batch.len() + usize::from(close);
        let mut results = expect_results(response, expected)?;
        if close {
            if let Some(close_result) = results.pop() {
                ensure_success(close_result, batch.len(), "close")?;
            }
        }

        self.pending = results.into();
        self.current = self.pending.pop_front();
        Ok(current_succeeded(&self.current))
    }

    async fn advance_to_next_result(&mut self) -> Result<bool> {
        self.current = self.pending.pop_front();
        Ok(current_succeeded(&self.current))
    }

    fn has_more_results(&self) -> bool {
        !self.pending.is_empty()
    }

    fn last_error(&self) -> Option<&str> {
        let current = self.current.as_ref()?;
        if current.kind != "error" {
            return None;
        }
        current.error.as_ref().map(|error| error.message.as_str())
    }

    async fn materialize_current_result(&mut self) -> Result<Option<PipelineRows>> {
        let Some(current) = self.current.as_mut() else {
            return Ok(None);
        };

        match current.kind.as_str() {
            "ok" => {
                let envelope = current.response.take().ok_or_else(|| {
                    MultiQueryError::Decode("missing response payload for statement".to_owned())
                })?;
                if envelope.kind != "execute" {
                    return Err(MultiQueryError::Decode(format!(
                        "expected execute response, got '{}'",
                        envelope.kind
                    )));
                }
                let result = envelope.result.ok_or_else(|| {
                    MultiQueryError::Decode("missing execute result payload".to_owned())
                })?;
                if result.cols.is_empty() {
                    return Ok(None);
                }
                Ok(Some(PipelineRows {
                    names: column_names(result.cols),
                    rows: result.rows.into_iter(),
                }))
            }
            "error" if current.error.is_some() => Ok(None),
            "error" => Err(MultiQueryError::Decode(
                "missing error payload for statement".to_owned(),
            )),
            other => Err(MultiQueryError::Decode(format!(
                "unknown pipeline result type '{other}'"
            ))),
        }
    }

    /// Begins a transaction on a fresh stream. A stream left open by an
    /// earlier `BEGIN` is rolled back and closed first.
    async fn begin_transaction(&mut self) -> Result<()> {
        if self.session.is_some() {
            #[cfg(feature = "tracing")]
            tracing::debug!("rolling back stale transaction stream before BEGIN");

            // `finish` clears the session even on error, so a retry starts clean.
            self.finish("ROLLBACK").await?;
        }
        self.clear_results();

        let response = self.send_pipeline(vec![Request::execute("BEGIN")]).await?;
        let baton = response.baton.clone();
        let base_url = response.base_url.clone();

        let begin = expect_results(response, 1)?
            .pop()
            .ok_or_else(|| MultiQueryError::Decode("missing BEGIN result".to_owned()))?;
        ensure_success(begin, 0, "execute")?;

        let baton = baton.ok_or_else(|| {
            MultiQueryError::Decode("server did not return a baton for the open stream".to_owned())
        })?;
        let mut session = Session::default();
        session.update(Some(baton), base_url);
        self.session = Some(session);
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Err(MultiQueryError::Connection(
                "no transaction is open on this connection".to_owned(),
            ));
        }
        self.finish("COMMIT").await
    }

    /// Rolls back the open transaction. Succeeds without a request when no
    /// stream is open, since closing a stream discards its transaction.
    async fn rollback(&mut self) -> Result<()> {
        if self.session.is_none() {
            return Ok(());
        }
        self.finish("ROLLBACK").await
    }
}

/// Rows of one buffered result, decoded lazily.
#[derive(Debug)]
pub struct PipelineRows {
    names: Vec<String>,
    rows: std::vec::IntoIter<Vec<wire::Value>>,
}

impl RowSource for PipelineRows {
    async fn fetch_row(&mut self) -> Result<Option<Row>> {
        self.rows
            .next()
            .map(|values| decode_row(&self.names, values))
            .transpose()
    }
}

fn current_succeeded(current: &Option<wire::PipelineResult>) -> bool {
    current.as_ref().is_some_and(|result| result.kind == "ok")
}

fn expect_results(
    response: wire::PipelineResponse,
    expected: usize,
) -> Result<Vec<wire::PipelineResult>> {
    if response.results.len() != expected {
        return Err(MultiQueryError::Decode(format!(
            "result count mismatch: expected {expected}, got {}",
            response.results.len()
        )));
    }
    Ok(response.results)
}

fn ensure_success(result: wire::PipelineResult, request_index: usize, kind: &str) -> Result<()> {
    match result.kind.as_str() {
        "ok" => {
            let response = result.response.ok_or_else(|| {
                MultiQueryError::Decode(format!(
                    "missing response payload for request {request_index}"
                ))
            })?;
            if response.kind != kind {
                return Err(MultiQueryError::Decode(format!(
                    "expected {kind} response at request {request_index}, got '{}'",
                    response.kind
                )));
            }
            Ok(())
        }
        "error" => {
            let error = result.error.ok_or_else(|| {
                MultiQueryError::Decode(format!(
                    "missing error payload for request {request_index}"
                ))
            })?;
            Err(MultiQueryError::Pipeline {
                request_index,
                message: error.message,
                code: error.code,
            })
        }
        other => Err(MultiQueryError::Decode(format!(
            "unknown pipeline result type '{other}' at request {request_index}"
        ))),
    }
}

fn normalize_bearer_authorization(token: &str) -> String {
    let trimmed = token.trim();
    let prefix = trimmed.get(..7);
    if prefix.is_some_and(|value| value.eq_ignore_ascii_case("bearer ")) {
        trimmed.to_owned()
    } else {
        format!("Bearer {trimmed}")
    }
}
