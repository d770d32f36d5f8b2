use crate::api::PollApi;
use crate::error::CoreError;
use crate::models::{CHOICE_COUNT, Challenge, to_wire_index};
use crate::session::SessionStore;
use std::sync::Arc;
use tracing::{debug, warn};

/// Observable state of the quality control gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Unstarted,
    Loading,
    AwaitingAnswer,
    Submitting,
    /// Terminal for this session; the gate flag in the session is raised.
    Passed,
    /// A challenge fetch failed. `begin()` again to retry.
    Failed,
}

/// One-time per-session challenge that must be answered correctly before
/// poll content becomes reachable.
///
/// A wrong answer is a normal transition, not an error: the selection is
/// discarded, a fresh challenge is fetched before control returns (so an
/// answer can never be submitted against a stale question id), and a short
/// notice is surfaced. The session's gate flag is raised here and nowhere
/// else.
pub struct GateChallenge<A: PollApi> {
    api: A,
    session: Arc<SessionStore>,
    user_id: i64,
    state: GateState,
    challenge: Option<Challenge>,
    selected: Option<usize>,
    notice: Option<&'static str>,
}

const INCORRECT_NOTICE: &str = "Incorrect answer. Please try again with a new question.";

impl<A: PollApi> GateChallenge<A> {
    /// Entry requires an identity. If the gate is already open the machine
    /// starts in `Passed` and revisiting never re-challenges.
    pub fn open(api: A, session: Arc<SessionStore>) -> Result<Self, CoreError> {
        let identity = session
            .identity()
            .ok_or(CoreError::AuthenticationRequired)?;
        let state = if session.gate_passed() {
            GateState::Passed
        } else {
            GateState::Unstarted
        };
        Ok(GateChallenge {
            api,
            session,
            user_id: identity.user_id,
            state,
            challenge: None,
            selected: None,
            notice: None,
        })
    }

    pub fn state(&self) -> GateState {
        self.state
    }

    pub fn challenge(&self) -> Option<&Challenge> {
        self.challenge.as_ref()
    }

    /// 0-based display index of the currently selected answer.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// User-facing notice from the last transition, if any.
    pub fn notice(&self) -> Option<&'static str> {
        self.notice
    }

    /// Fetch the first challenge. No-op once passed; retries from `Failed`.
    pub async fn begin(&mut self) -> Result<(), CoreError> {
        match self.state {
            GateState::Passed => return Ok(()),
            GateState::Unstarted | GateState::Failed => {}
            _ => return Ok(()),
        }

        self.state = GateState::Loading;
        self.notice = None;
        match self.api.random_challenge().await {
            Ok(challenge) => {
                debug!(question_id = challenge.question_id, "gate challenge loaded");
                self.challenge = Some(challenge);
                self.selected = None;
                self.state = GateState::AwaitingAnswer;
                Ok(())
            }
            Err(e) => {
                warn!("gate challenge fetch failed: {e}");
                self.notice = Some(e.user_message());
                self.state = GateState::Failed;
                Err(e.into())
            }
        }
    }

    /// Select one answer, overwriting any previous selection.
    pub fn select(&mut self, index: usize) -> Result<(), CoreError> {
        if self.state != GateState::AwaitingAnswer || index >= CHOICE_COUNT {
            return Err(CoreError::NoSelection);
        }
        self.selected = Some(index);
        Ok(())
    }

    pub fn can_submit(&self) -> bool {
        self.state == GateState::AwaitingAnswer && self.selected.is_some()
    }

    /// Submit the selected answer for a verdict.
    pub async fn submit(&mut self) -> Result<(), CoreError> {
        if self.state != GateState::AwaitingAnswer {
            return Err(CoreError::NoSelection);
        }
        let selected = self.selected.ok_or(CoreError::NoSelection)?;
        let question_id = self
            .challenge
            .as_ref()
            .map(|c| c.question_id)
            .ok_or(CoreError::NoSelection)?;

        self.state = GateState::Submitting;
        self.notice = None;
        let verdict = self
            .api
            .check_challenge_answer(self.user_id, question_id, to_wire_index(selected))
            .await;

        match verdict {
            Ok(true) => {
                debug!(question_id, "gate passed");
                self.session.mark_gate_passed();
                self.selected = None;
                self.state = GateState::Passed;
                Ok(())
            }
            Ok(false) => {
                debug!(question_id, "gate answer incorrect, reissuing challenge");
                self.selected = None;
                self.notice = Some(INCORRECT_NOTICE);
                // The failed question is never reused; a fresh one must be
                // in place before the caller can select again.
                match self.api.random_challenge().await {
                    Ok(challenge) => {
                        self.challenge = Some(challenge);
                        self.state = GateState::AwaitingAnswer;
                        Ok(())
                    }
                    Err(e) => {
                        warn!("challenge refetch failed: {e}");
                        self.challenge = None;
                        self.notice = Some(e.user_message());
                        self.state = GateState::Failed;
                        Err(e.into())
                    }
                }
            }
            Err(e) => {
                warn!("gate answer submission failed: {e}");
                // Keep question and selection so the same submission can be
                // retried.
                self.selected = Some(selected);
                self.notice = Some(e.user_message());
                self.state = GateState::AwaitingAnswer;
                Err(e.into())
            }
        }
    }
}
