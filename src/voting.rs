use crate::api::PollApi;
use crate::error::{ApiError, CoreError};
use crate::models::{CHOICE_COUNT, Poll, to_display_index, to_wire_index};
use crate::results::{PollResults, aggregate};
use crate::session::SessionStore;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteState {
    Loading,
    Voting,
    Submitting,
    /// Terminal for this poll instance: no further voting, however it was
    /// reached.
    ShowingResults,
    /// The initial load failed; `load()` retries.
    Failed,
}

/// The voting lifecycle for a single poll.
///
/// Construction checks identity and gate before anything else, so an
/// unauthenticated or ungated visit performs zero backend calls. Once built,
/// `load()` decides between the choice-selection state and the already-voted
/// results state; `submit()` performs the one allowed vote. A duplicate-vote
/// rejection is routed to the results view, not surfaced as a failure: the
/// vote already exists server-side.
pub struct VotingSession<A: PollApi> {
    api: A,
    user_id: i64,
    poll_id: i64,
    state: VoteState,
    poll: Option<Poll>,
    selected: Option<usize>,
    /// 0-based display index of the user's recorded answer.
    your_choice: Option<usize>,
    results: Option<PollResults>,
    error: Option<&'static str>,
}

impl<A: PollApi> VotingSession<A> {
    /// Entry point for a specific poll. Redirect-class errors fire before
    /// any fetch.
    pub fn open(api: A, session: &SessionStore, poll_id: i64) -> Result<Self, CoreError> {
        let identity = session
            .identity()
            .ok_or(CoreError::AuthenticationRequired)?;
        if !session.gate_passed() {
            return Err(CoreError::GateRequired);
        }
        Ok(VotingSession {
            api,
            user_id: identity.user_id,
            poll_id,
            state: VoteState::Loading,
            poll: None,
            selected: None,
            your_choice: None,
            results: None,
            error: None,
        })
    }

    pub fn state(&self) -> VoteState {
        self.state
    }

    pub fn poll(&self) -> Option<&Poll> {
        self.poll.as_ref()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// The recorded answer to highlight in the results view.
    pub fn your_choice(&self) -> Option<usize> {
        self.your_choice
    }

    pub fn results(&self) -> Option<&PollResults> {
        self.results.as_ref()
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// Fetch the poll and the prior-response status, then land in `Voting`
    /// or `ShowingResults`.
    pub async fn load(&mut self) -> Result<(), CoreError> {
        if !matches!(self.state, VoteState::Loading | VoteState::Failed) {
            return Ok(());
        }
        self.state = VoteState::Loading;
        self.error = None;

        // Two independent lookups.
        let (poll, status) = tokio::join!(
            self.api.get_poll(self.poll_id),
            self.api.response_status(self.user_id, self.poll_id),
        );

        let poll = match poll {
            Ok(poll) => poll,
            Err(e) => return self.fail_load(e),
        };
        let status = match status {
            Ok(status) => status,
            Err(e) => return self.fail_load(e),
        };
        self.poll = Some(poll);

        if status.responded {
            debug!(poll_id = self.poll_id, "prior response found, showing results");
            self.your_choice = status.choice_index.and_then(to_display_index);
            let _ = self.enter_results().await;
        } else {
            self.selected = None;
            self.state = VoteState::Voting;
        }
        Ok(())
    }

    fn fail_load(&mut self, e: ApiError) -> Result<(), CoreError> {
        warn!(poll_id = self.poll_id, "poll load failed: {e}");
        self.error = Some(e.user_message());
        self.state = VoteState::Failed;
        Err(e.into())
    }

    /// Select one of the four choices, overwriting any prior selection.
    pub fn select(&mut self, index: usize) -> Result<(), CoreError> {
        if self.state != VoteState::Voting || index >= CHOICE_COUNT {
            return Err(CoreError::NoSelection);
        }
        self.selected = Some(index);
        Ok(())
    }

    /// Submission stays disabled while nothing is selected.
    pub fn can_submit(&self) -> bool {
        self.state == VoteState::Voting && self.selected.is_some()
    }

    /// Cast the single allowed vote.
    pub async fn submit(&mut self) -> Result<(), CoreError> {
        if self.state != VoteState::Voting {
            return Err(CoreError::NoSelection);
        }
        let selected = self.selected.ok_or(CoreError::NoSelection)?;

        self.state = VoteState::Submitting;
        self.error = None;
        let outcome = self
            .api
            .submit_response(self.user_id, self.poll_id, to_wire_index(selected))
            .await;

        match outcome {
            Ok(()) => {
                debug!(poll_id = self.poll_id, choice = selected + 1, "vote recorded");
                self.your_choice = Some(selected);
                let _ = self.enter_results().await;
                Ok(())
            }
            Err(ApiError::AlreadyResponded) => {
                // The vote exists server-side; recover the recorded choice
                // and show results instead of erroring.
                debug!(poll_id = self.poll_id, "duplicate vote, routing to results");
                if let Ok(status) = self.api.response_status(self.user_id, self.poll_id).await {
                    self.your_choice = status.choice_index.and_then(to_display_index);
                }
                let _ = self.enter_results().await;
                Ok(())
            }
            Err(e) => {
                warn!(poll_id = self.poll_id, "vote submission failed: {e}");
                self.selected = Some(selected);
                self.error = Some(e.user_message());
                self.state = VoteState::Voting;
                Err(e.into())
            }
        }
    }

    /// Retry a failed tally fetch without leaving the results view.
    pub async fn refresh_results(&mut self) -> Result<(), CoreError> {
        if self.state != VoteState::ShowingResults {
            return Ok(());
        }
        self.enter_results().await.map_err(CoreError::from)
    }

    /// Fetch the current tally and settle in `ShowingResults`. A tally fetch
    /// failure is surfaced as a notice, not a state regression: the vote (if
    /// any) is already recorded.
    async fn enter_results(&mut self) -> Result<(), ApiError> {
        let outcome = match self.api.poll_results(self.poll_id).await {
            Ok(tally) => {
                if let Some(poll) = &self.poll {
                    self.results = Some(aggregate(&tally, &poll.choices));
                }
                self.error = None;
                Ok(())
            }
            Err(e) => {
                warn!(poll_id = self.poll_id, "results fetch failed: {e}");
                self.error = Some(e.user_message());
                Err(e)
            }
        };
        self.selected = None;
        self.state = VoteState::ShowingResults;
        outcome
    }
}
