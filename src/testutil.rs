//! In-memory backend for tests: one `MockApi` can be cloned into several
//! components while all clones observe the same state, call counters, and
//! injected failures.

use crate::api::PollApi;
use crate::error::ApiError;
use crate::models::{CHOICE_COUNT, Challenge, Poll, ResponseStatus, Tally};
use chrono::Utc;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

/// Route tracing output through the test harness so state-transition logs
/// show up on failing tests. Only the first call installs the subscriber.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub list_fetches: u32,
    pub poll_fetches: u32,
    pub status_fetches: u32,
    pub submit_calls: u32,
    pub results_fetches: u32,
    pub challenge_fetches: u32,
    pub check_calls: u32,
}

#[derive(Default)]
struct MockState {
    polls: Vec<Poll>,
    /// (user_id, poll_id) -> 1-based choice index, like the backend's
    /// responses table.
    responses: HashMap<(i64, i64), u8>,
    /// Served round-robin so a refetch after a wrong answer yields a
    /// different question.
    challenges: VecDeque<Challenge>,
    correct_answers: HashMap<i64, u8>,
    counts: CallCounts,
    fail_polls: bool,
    fail_submit: bool,
    fail_results: bool,
    fail_challenges: bool,
    fail_challenge_check: bool,
}

#[derive(Clone, Default)]
pub struct MockApi {
    state: Arc<Mutex<MockState>>,
}

impl MockApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_poll(
        &self,
        id: i64,
        author_id: i64,
        question: &str,
        description: Option<&str>,
        choices: [&str; CHOICE_COUNT],
    ) {
        self.state.lock().unwrap().polls.push(Poll {
            id,
            author_id,
            question: question.to_string(),
            description: description.map(str::to_string),
            start_time: Utc::now(),
            choices: choices.map(str::to_string),
        });
    }

    pub fn add_challenge(
        &self,
        question_id: i64,
        question: &str,
        choices: [&str; CHOICE_COUNT],
        correct_wire_index: u8,
    ) {
        let mut state = self.state.lock().unwrap();
        state.challenges.push_back(Challenge {
            question_id,
            question: question.to_string(),
            description: None,
            choices: choices.map(str::to_string),
        });
        state.correct_answers.insert(question_id, correct_wire_index);
    }

    /// Record a response directly, as if cast from another session.
    pub fn record_response(&self, user_id: i64, poll_id: i64, choice_index: u8) {
        self.state
            .lock()
            .unwrap()
            .responses
            .insert((user_id, poll_id), choice_index);
    }

    pub fn recorded_response(&self, user_id: i64, poll_id: i64) -> Option<u8> {
        self.state
            .lock()
            .unwrap()
            .responses
            .get(&(user_id, poll_id))
            .copied()
    }

    pub fn counts(&self) -> CallCounts {
        self.state.lock().unwrap().counts
    }

    pub fn fail_polls(&self, fail: bool) {
        self.state.lock().unwrap().fail_polls = fail;
    }

    pub fn fail_submit(&self, fail: bool) {
        self.state.lock().unwrap().fail_submit = fail;
    }

    pub fn fail_results(&self, fail: bool) {
        self.state.lock().unwrap().fail_results = fail;
    }

    pub fn fail_challenges(&self, fail: bool) {
        self.state.lock().unwrap().fail_challenges = fail;
    }

    pub fn fail_challenge_check(&self, fail: bool) {
        self.state.lock().unwrap().fail_challenge_check = fail;
    }

    fn transport() -> ApiError {
        ApiError::Transport("mock backend unreachable".into())
    }
}

impl PollApi for MockApi {
    async fn list_polls(&self) -> Result<Vec<Poll>, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.counts.list_fetches += 1;
        if state.fail_polls {
            return Err(Self::transport());
        }
        Ok(state.polls.clone())
    }

    async fn get_poll(&self, poll_id: i64) -> Result<Poll, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.counts.poll_fetches += 1;
        if state.fail_polls {
            return Err(Self::transport());
        }
        state
            .polls
            .iter()
            .find(|p| p.id == poll_id)
            .cloned()
            .ok_or(ApiError::PollNotFound)
    }

    async fn response_status(
        &self,
        user_id: i64,
        poll_id: i64,
    ) -> Result<ResponseStatus, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.counts.status_fetches += 1;
        Ok(match state.responses.get(&(user_id, poll_id)) {
            Some(&choice) => ResponseStatus {
                responded: true,
                choice_index: Some(choice),
            },
            None => ResponseStatus::none(),
        })
    }

    async fn submit_response(
        &self,
        user_id: i64,
        poll_id: i64,
        choice_index: u8,
    ) -> Result<(), ApiError> {
        let mut state = self.state.lock().unwrap();
        state.counts.submit_calls += 1;
        if state.fail_submit {
            return Err(Self::transport());
        }
        if state.responses.contains_key(&(user_id, poll_id)) {
            return Err(ApiError::AlreadyResponded);
        }
        state.responses.insert((user_id, poll_id), choice_index);
        Ok(())
    }

    async fn poll_results(&self, poll_id: i64) -> Result<Tally, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.counts.results_fetches += 1;
        if state.fail_results {
            return Err(Self::transport());
        }
        let poll = state
            .polls
            .iter()
            .find(|p| p.id == poll_id)
            .cloned()
            .ok_or(ApiError::PollNotFound)?;

        let mut tally = Tally::new();
        for (&(_, pid), &choice) in &state.responses {
            if pid != poll_id {
                continue;
            }
            if let Some(label) = poll.choices.get(choice as usize - 1) {
                *tally.entry(label.clone()).or_insert(0) += 1;
            }
        }
        Ok(tally)
    }

    async fn random_challenge(&self) -> Result<Challenge, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.counts.challenge_fetches += 1;
        if state.fail_challenges {
            return Err(Self::transport());
        }
        let challenge = state
            .challenges
            .pop_front()
            .ok_or(ApiError::NoChallengeAvailable)?;
        state.challenges.push_back(challenge.clone());
        Ok(challenge)
    }

    async fn check_challenge_answer(
        &self,
        _user_id: i64,
        question_id: i64,
        choice_index: u8,
    ) -> Result<bool, ApiError> {
        let mut state = self.state.lock().unwrap();
        state.counts.check_calls += 1;
        if state.fail_challenge_check {
            return Err(Self::transport());
        }
        Ok(state.correct_answers.get(&question_id) == Some(&choice_index))
    }
}
