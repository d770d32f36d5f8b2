//! HTTP implementation of the backend contract.

use crate::api::PollApi;
use crate::error::ApiError;
use crate::models::{Challenge, Poll, ResponseStatus, Tally};
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::warn;

/// Default timeout for backend requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Format the backend uses for poll start times.
const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// JSON-over-HTTP client for the poll backend (reusable connection pool;
/// cheap to clone).
#[derive(Clone)]
pub struct HttpPollApi {
    base_url: String,
    http: reqwest::Client,
}

impl HttpPollApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .unwrap_or_default();
        HttpPollApi {
            base_url: base_url.into(),
            http,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Poll as serialized by the backend: flat `response1..response4` columns
/// and a `%Y-%m-%d %H:%M` start time.
#[derive(Debug, Deserialize)]
struct PollWire {
    id: i64,
    #[serde(rename = "authorId")]
    author_id: i64,
    question: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(rename = "startTime")]
    start_time: String,
    response1: String,
    response2: String,
    response3: String,
    response4: String,
}

impl PollWire {
    fn into_poll(self) -> Result<Poll, ApiError> {
        Ok(Poll {
            id: self.id,
            author_id: self.author_id,
            question: self.question,
            description: self.description,
            start_time: parse_start_time(&self.start_time)?,
            choices: [
                self.response1,
                self.response2,
                self.response3,
                self.response4,
            ],
        })
    }
}

#[derive(Debug, Deserialize)]
struct ChallengeWire {
    questionid: i64,
    question: String,
    #[serde(default)]
    description: Option<String>,
    response1: String,
    response2: String,
    response3: String,
    response4: String,
}

impl From<ChallengeWire> for Challenge {
    fn from(wire: ChallengeWire) -> Self {
        Challenge {
            question_id: wire.questionid,
            question: wire.question,
            description: wire.description,
            choices: [
                wire.response1,
                wire.response2,
                wire.response3,
                wire.response4,
            ],
        }
    }
}

#[derive(Debug, Deserialize)]
struct StatusWire {
    responded: bool,
    #[serde(default)]
    response: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct ResultsWire {
    results: Tally,
}

#[derive(Debug, Deserialize)]
struct VerdictWire {
    is_correct: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

fn parse_start_time(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, START_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| ApiError::InvalidResponse(format!("bad start time {raw:?}: {e}")))
}

/// The verdict field is a boolean by contract, but the deployed backend has
/// been seen answering with the matched index; any truthy value counts.
fn verdict_is_correct(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
        _ => false,
    }
}

/// Duplicate-vote discrimination: a 409, or an error body whose message
/// mentions an already existing response.
fn is_duplicate(status: StatusCode, body: &ErrorBody) -> bool {
    status == StatusCode::CONFLICT
        || body
            .error
            .as_deref()
            .is_some_and(|msg| msg.to_lowercase().contains("already"))
}

fn map_request_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() || e.is_connect() {
        ApiError::Transport(e.to_string())
    } else {
        ApiError::Backend(e.to_string())
    }
}

fn decode_error(e: reqwest::Error) -> ApiError {
    ApiError::InvalidResponse(e.to_string())
}

impl HttpPollApi {
    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .http
            .get(self.endpoint(path))
            .send()
            .await
            .map_err(map_request_error)?;
        let status = response.status();
        if !status.is_success() {
            warn!(%status, path, "backend request failed");
            return Err(ApiError::Backend(format!("HTTP status {status}")));
        }
        response.json().await.map_err(decode_error)
    }
}

impl PollApi for HttpPollApi {
    async fn list_polls(&self) -> Result<Vec<Poll>, ApiError> {
        let polls: Vec<PollWire> = self.get_json("get-polls").await?;
        polls.into_iter().map(PollWire::into_poll).collect()
    }

    async fn get_poll(&self, poll_id: i64) -> Result<Poll, ApiError> {
        let response = self
            .http
            .get(self.endpoint(&format!("get-poll/{poll_id}")))
            .send()
            .await
            .map_err(map_request_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            Err(ApiError::PollNotFound)
        } else if !status.is_success() {
            Err(ApiError::Backend(format!("HTTP status {status}")))
        } else {
            let wire: PollWire = response.json().await.map_err(decode_error)?;
            wire.into_poll()
        }
    }

    async fn response_status(
        &self,
        user_id: i64,
        poll_id: i64,
    ) -> Result<ResponseStatus, ApiError> {
        let wire: StatusWire = self
            .get_json(&format!("has-user-responded/{user_id}/{poll_id}"))
            .await?;
        Ok(ResponseStatus {
            responded: wire.responded,
            choice_index: wire.response.filter(|_| wire.responded),
        })
    }

    async fn submit_response(
        &self,
        user_id: i64,
        poll_id: i64,
        choice_index: u8,
    ) -> Result<(), ApiError> {
        let response = self
            .http
            .post(self.endpoint("add-response"))
            .json(&json!({
                "userid": user_id,
                "questionid": poll_id,
                "response": choice_index,
            }))
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body: ErrorBody = response.json().await.unwrap_or_default();
        if is_duplicate(status, &body) {
            return Err(ApiError::AlreadyResponded);
        }
        warn!(%status, "vote submission rejected");
        Err(ApiError::Backend(
            body.error
                .unwrap_or_else(|| format!("HTTP status {status}")),
        ))
    }

    async fn poll_results(&self, poll_id: i64) -> Result<Tally, ApiError> {
        let wire: ResultsWire = self
            .get_json(&format!("get-poll-results/{poll_id}"))
            .await?;
        Ok(wire.results)
    }

    async fn random_challenge(&self) -> Result<Challenge, ApiError> {
        let response = self
            .http
            .get(self.endpoint("get-random-quality-control-poll"))
            .send()
            .await
            .map_err(map_request_error)?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            Err(ApiError::NoChallengeAvailable)
        } else if !status.is_success() {
            Err(ApiError::Backend(format!("HTTP status {status}")))
        } else {
            let wire: ChallengeWire = response.json().await.map_err(decode_error)?;
            Ok(wire.into())
        }
    }

    async fn check_challenge_answer(
        &self,
        user_id: i64,
        question_id: i64,
        choice_index: u8,
    ) -> Result<bool, ApiError> {
        let response = self
            .http
            .post(self.endpoint("check-quality-control-response"))
            .json(&json!({
                "userid": user_id,
                "questionid": question_id,
                "response": choice_index,
            }))
            .send()
            .await
            .map_err(map_request_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Backend(format!("HTTP status {status}")));
        }
        let wire: VerdictWire = response.json().await.map_err(decode_error)?;
        Ok(verdict_is_correct(&wire.is_correct))
    }
}
