use crate::api::PollApi;
use crate::error::CoreError;
use crate::models::Poll;
use crate::session::SessionStore;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogState {
    Unloaded,
    Ready,
    /// Fetch failed; `reload()` retries.
    Failed,
}

/// The list of available polls for a gate-passed session.
///
/// The list is fetched once per activation, not on every render; `reload()`
/// forces a refetch after a failure or an explicit refresh.
pub struct PollCatalog<A: PollApi> {
    api: A,
    state: CatalogState,
    polls: Vec<Poll>,
    search: String,
    error: Option<&'static str>,
}

impl<A: PollApi> PollCatalog<A> {
    /// Entry requires an identity with the gate passed; nothing is fetched
    /// here.
    pub fn open(api: A, session: &SessionStore) -> Result<Self, CoreError> {
        if session.identity().is_none() {
            return Err(CoreError::AuthenticationRequired);
        }
        if !session.gate_passed() {
            return Err(CoreError::GateRequired);
        }
        Ok(PollCatalog {
            api,
            state: CatalogState::Unloaded,
            polls: Vec::new(),
            search: String::new(),
            error: None,
        })
    }

    pub fn state(&self) -> CatalogState {
        self.state
    }

    pub fn error(&self) -> Option<&'static str> {
        self.error
    }

    /// Fetch the poll list if it has not been fetched yet.
    pub async fn load(&mut self) -> Result<(), CoreError> {
        if self.state == CatalogState::Ready {
            return Ok(());
        }
        self.reload().await
    }

    /// Unconditionally refetch the poll list.
    pub async fn reload(&mut self) -> Result<(), CoreError> {
        match self.api.list_polls().await {
            Ok(polls) => {
                self.polls = polls;
                self.state = CatalogState::Ready;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                warn!("poll list fetch failed: {e}");
                self.state = CatalogState::Failed;
                self.error = Some(e.user_message());
                Err(e.into())
            }
        }
    }

    /// The full list, in backend order.
    pub fn polls(&self) -> &[Poll] {
        &self.polls
    }

    pub fn set_search(&mut self, term: impl Into<String>) {
        self.search = term.into();
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    /// The list narrowed by the current search term.
    pub fn filtered(&self) -> Vec<&Poll> {
        filter_polls(&self.polls, &self.search)
    }

    /// Polls created by the given user (profile view).
    pub fn by_author(&self, author_id: i64) -> Vec<&Poll> {
        self.polls
            .iter()
            .filter(|p| p.author_id == author_id)
            .collect()
    }
}

/// Case-insensitive substring match on question and description. The empty
/// term is the identity filter: the full list in its original order.
pub fn filter_polls<'p>(polls: &'p [Poll], term: &str) -> Vec<&'p Poll> {
    if term.is_empty() {
        return polls.iter().collect();
    }
    let needle = term.to_lowercase();
    polls
        .iter()
        .filter(|poll| {
            poll.question.to_lowercase().contains(&needle)
                || poll
                    .description
                    .as_ref()
                    .is_some_and(|d| d.to_lowercase().contains(&needle))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Identity;
    use crate::testutil::MockApi;
    use std::sync::Arc;

    fn gated_session() -> Arc<SessionStore> {
        crate::testutil::init_tracing();
        let session = Arc::new(SessionStore::in_memory());
        session.set_identity(Identity {
            user_id: 7,
            username: "alice".into(),
        });
        session.mark_gate_passed();
        session
    }

    fn seeded_api() -> MockApi {
        let api = MockApi::new();
        api.add_poll(
            1,
            1,
            "Favorite language?",
            Some("Pick the one you use most."),
            ["Python", "JavaScript", "Java", "C++"],
        );
        api.add_poll(
            2,
            2,
            "Remote work?",
            Some("Let us know your preference."),
            ["Yes", "No", "Sometimes", "Never"],
        );
        api.add_poll(
            3,
            1,
            "Best meal?",
            None,
            ["Breakfast", "Lunch", "Dinner", "Snacks"],
        );
        api
    }

    #[tokio::test]
    async fn requires_gate() {
        let api = MockApi::new();
        let session = Arc::new(SessionStore::in_memory());
        assert!(matches!(
            PollCatalog::open(api.clone(), &session),
            Err(CoreError::AuthenticationRequired)
        ));

        session.set_identity(Identity {
            user_id: 7,
            username: "alice".into(),
        });
        assert!(matches!(
            PollCatalog::open(api, &session),
            Err(CoreError::GateRequired)
        ));
    }

    #[tokio::test]
    async fn loads_once_per_activation() {
        let api = seeded_api();
        let session = gated_session();
        let mut catalog = PollCatalog::open(api.clone(), &session).unwrap();

        catalog.load().await.unwrap();
        catalog.load().await.unwrap();

        assert_eq!(catalog.polls().len(), 3);
        assert_eq!(api.counts().list_fetches, 1);
    }

    #[tokio::test]
    async fn failed_load_is_retryable() {
        let api = seeded_api();
        api.fail_polls(true);
        let session = gated_session();
        let mut catalog = PollCatalog::open(api.clone(), &session).unwrap();

        assert!(catalog.load().await.is_err());
        assert_eq!(catalog.state(), CatalogState::Failed);
        assert!(catalog.error().is_some());

        api.fail_polls(false);
        catalog.reload().await.unwrap();
        assert_eq!(catalog.state(), CatalogState::Ready);
        assert!(catalog.error().is_none());
    }

    #[tokio::test]
    async fn empty_term_is_the_identity_filter() {
        let api = seeded_api();
        let session = gated_session();
        let mut catalog = PollCatalog::open(api, &session).unwrap();
        catalog.load().await.unwrap();

        let all = catalog.filtered();
        let ids: Vec<i64> = all.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn filter_is_case_insensitive_on_question_and_description() {
        let api = seeded_api();
        let session = gated_session();
        let mut catalog = PollCatalog::open(api, &session).unwrap();
        catalog.load().await.unwrap();

        catalog.set_search("LANGUAGE");
        let hits: Vec<i64> = catalog.filtered().iter().map(|p| p.id).collect();
        assert_eq!(hits, vec![1]);

        // Matches on the description only.
        catalog.set_search("preference");
        let hits: Vec<i64> = catalog.filtered().iter().map(|p| p.id).collect();
        assert_eq!(hits, vec![2]);

        catalog.set_search("zzz");
        assert!(catalog.filtered().is_empty());
    }

    #[tokio::test]
    async fn by_author_narrows_to_created_polls() {
        let api = seeded_api();
        let session = gated_session();
        let mut catalog = PollCatalog::open(api, &session).unwrap();
        catalog.load().await.unwrap();

        let mine: Vec<i64> = catalog.by_author(1).iter().map(|p| p.id).collect();
        assert_eq!(mine, vec![1, 3]);
    }
}
