use crate::models::Identity;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

/// Persistence for the identity blob. The identity survives reloads; the
/// gate flag never does. Implementations are caches, not sources of truth,
/// so failures are logged and swallowed.
pub trait IdentityStore: Send + Sync {
    fn load(&self) -> Option<Identity>;
    fn save(&self, identity: &Identity);
    fn clear(&self);
}

/// Identity blob as a JSON file on disk.
pub struct FileIdentityStore {
    path: PathBuf,
}

impl FileIdentityStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileIdentityStore { path: path.into() }
    }
}

impl IdentityStore for FileIdentityStore {
    fn load(&self) -> Option<Identity> {
        let bytes = std::fs::read(&self.path).ok()?;
        match serde_json::from_slice(&bytes) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("discarding unreadable identity blob: {e}");
                None
            }
        }
    }

    fn save(&self, identity: &Identity) {
        let json = match serde_json::to_vec(identity) {
            Ok(json) => json,
            Err(e) => {
                warn!("failed to serialize identity: {e}");
                return;
            }
        };
        if let Err(e) = std::fs::write(&self.path, json) {
            warn!("failed to persist identity: {e}");
        }
    }

    fn clear(&self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("failed to remove identity blob: {e}");
            }
        }
    }
}

/// In-memory store for tests and embedders without a writable disk.
#[derive(Default)]
pub struct MemoryIdentityStore {
    identity: Mutex<Option<Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdentityStore for MemoryIdentityStore {
    fn load(&self) -> Option<Identity> {
        self.identity.lock().unwrap().clone()
    }

    fn save(&self, identity: &Identity) {
        *self.identity.lock().unwrap() = Some(identity.clone());
    }

    fn clear(&self) {
        *self.identity.lock().unwrap() = None;
    }
}

struct SessionState {
    identity: Option<Identity>,
    gate_passed: bool,
}

/// Holds the authenticated identity and the quality-control gate flag.
///
/// The identity is persisted through the [`IdentityStore`]; the gate flag is
/// process scoped and resets whenever the identity changes or is cleared.
/// All writers of this shared state funnel through here: the gate flag can
/// only be raised by [`crate::gate::GateChallenge`].
pub struct SessionStore {
    store: Box<dyn IdentityStore>,
    state: Mutex<SessionState>,
}

impl SessionStore {
    /// Open a session, restoring any persisted identity. The gate always
    /// starts closed.
    pub fn new(store: Box<dyn IdentityStore>) -> Self {
        let identity = store.load();
        SessionStore {
            store,
            state: Mutex::new(SessionState {
                identity,
                gate_passed: false,
            }),
        }
    }

    /// Session backed by an in-memory store.
    pub fn in_memory() -> Self {
        SessionStore::new(Box::new(MemoryIdentityStore::new()))
    }

    /// The current identity; `None` is the anonymous state, not an error.
    pub fn identity(&self) -> Option<Identity> {
        self.state.lock().unwrap().identity.clone()
    }

    /// Install a freshly authenticated identity. Resets the gate flag: a new
    /// login always faces the quality control check again.
    pub fn set_identity(&self, identity: Identity) {
        self.store.save(&identity);
        let mut state = self.state.lock().unwrap();
        state.identity = Some(identity);
        state.gate_passed = false;
    }

    /// Logout: drop the identity, close the gate, wipe the persisted blob.
    pub fn clear(&self) {
        self.store.clear();
        let mut state = self.state.lock().unwrap();
        state.identity = None;
        state.gate_passed = false;
    }

    pub fn gate_passed(&self) -> bool {
        self.state.lock().unwrap().gate_passed
    }

    /// Crate-private on purpose: only a correct GateChallenge answer may
    /// open the gate.
    pub(crate) fn mark_gate_passed(&self) {
        self.state.lock().unwrap().gate_passed = true;
    }
}
