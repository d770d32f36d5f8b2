//! Client core for the Weigh-In polling app.
//!
//! Everything a presentation layer needs to drive the voting lifecycle
//! without owning any of its rules:
//!
//! - [`session::SessionStore`] holds the identity and the quality-control
//!   gate flag; all shared auth state funnels through it.
//! - [`gate::GateChallenge`] is the one-time per-session challenge that must
//!   be answered correctly before poll content becomes reachable.
//! - [`catalog::PollCatalog`] lists and filters the available polls.
//! - [`voting::VotingSession`] runs the per-poll state machine: one vote per
//!   user, already-voted detection, results on completion.
//! - [`results`] turns raw tallies into counts and percentages.
//!
//! The backend is consumed through the [`api::PollApi`] trait;
//! [`http::HttpPollApi`] is the production JSON-over-HTTP implementation.
//! Dropping a component mid-request simply discards the in-flight response;
//! nothing is written to shared state from a dead flow.

pub mod api;
pub mod catalog;
pub mod error;
pub mod gate;
pub mod http;
pub mod models;
pub mod results;
pub mod session;
pub mod voting;

#[cfg(test)]
mod testutil;

pub use api::PollApi;
pub use catalog::{CatalogState, PollCatalog, filter_polls};
pub use error::{ApiError, CoreError};
pub use gate::{GateChallenge, GateState};
pub use http::HttpPollApi;
pub use models::{CHOICE_COUNT, Challenge, Identity, Poll, ResponseStatus, Tally};
pub use results::{ChoiceResult, PollResults, aggregate};
pub use session::{FileIdentityStore, IdentityStore, MemoryIdentityStore, SessionStore};
pub use voting::{VoteState, VotingSession};
