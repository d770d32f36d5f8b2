use crate::error::ApiError;
use crate::models::{Challenge, Poll, ResponseStatus, Tally};

/// Backend contract consumed by the core components.
///
/// The production implementation is [`crate::http::HttpPollApi`]; tests
/// construct in-memory implementations so every component can run against an
/// isolated backend. All choice indexes crossing this boundary are 1-based.
#[allow(async_fn_in_trait)]
pub trait PollApi {
    /// All polls currently available for voting.
    async fn list_polls(&self) -> Result<Vec<Poll>, ApiError>;

    /// A single poll by id.
    async fn get_poll(&self, poll_id: i64) -> Result<Poll, ApiError>;

    /// Whether `user_id` has already responded to `poll_id`, and with which
    /// choice. This is the authoritative "has voted" signal; local state is
    /// only ever a hint.
    async fn response_status(&self, user_id: i64, poll_id: i64)
    -> Result<ResponseStatus, ApiError>;

    /// Record a vote. At most one response per (user, poll) pair exists;
    /// a duplicate submission yields [`ApiError::AlreadyResponded`].
    async fn submit_response(
        &self,
        user_id: i64,
        poll_id: i64,
        choice_index: u8,
    ) -> Result<(), ApiError>;

    /// Current per-choice vote counts for a poll.
    async fn poll_results(&self, poll_id: i64) -> Result<Tally, ApiError>;

    /// One random quality control question.
    async fn random_challenge(&self) -> Result<Challenge, ApiError>;

    /// Verdict for a submitted quality control answer.
    async fn check_challenge_answer(
        &self,
        user_id: i64,
        question_id: i64,
        choice_index: u8,
    ) -> Result<bool, ApiError>;
}
