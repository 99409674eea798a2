use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::error::AppResult;
use crate::storage::{self, SharedStorage, ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY};

use super::principal::{Role, UserProfile};

pub type SessionToken = String;

/// Snapshot of the authentication state. `authenticated` is derived from the access token
/// and never stored separately.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    pub user: Option<UserProfile>,
    pub access_token: Option<SessionToken>,
    pub refresh_token: Option<SessionToken>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.access_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    pub fn role(&self) -> Option<Role> { self.user.as_ref().map(|u| u.role) }
}

type LogoutListener = Arc<dyn Fn() + Send + Sync>;

/// In-memory session cache with a durable mirror.
///
/// The persisted session is read once in `open` and parked in a pending slot; it only
/// becomes the live session when the route guard promotes and validates it.
pub struct SessionStore {
    state: RwLock<Session>,
    pending: Mutex<Option<Session>>,
    storage: SharedStorage,
    on_logout: RwLock<Vec<LogoutListener>>,
}

impl SessionStore {
    pub fn open(storage: SharedStorage) -> Self {
        let access = storage.get(ACCESS_TOKEN_KEY).filter(|t| !t.is_empty());
        let pending = access.map(|access_token| Session {
            user: storage::read_json::<UserProfile>(storage.as_ref(), USER_KEY),
            access_token: Some(access_token),
            refresh_token: storage.get(REFRESH_TOKEN_KEY).filter(|t| !t.is_empty()),
        });
        debug!(target: "session", persisted = pending.is_some(), "session store opened");
        Self { state: RwLock::new(Session::default()), pending: Mutex::new(pending), storage, on_logout: RwLock::new(Vec::new()) }
    }

    /// Register a hook that runs after every `logout` (used to drop the cart).
    pub fn on_logout<F: Fn() + Send + Sync + 'static>(&self, f: F) {
        self.on_logout.write().push(Arc::new(f));
    }

    pub fn snapshot(&self) -> Session { self.state.read().clone() }
    pub fn access_token(&self) -> Option<SessionToken> { self.state.read().access_token.clone().filter(|t| !t.is_empty()) }
    pub fn refresh_token(&self) -> Option<SessionToken> { self.state.read().refresh_token.clone().filter(|t| !t.is_empty()) }
    pub fn is_authenticated(&self) -> bool { self.state.read().is_authenticated() }
    pub fn current_user(&self) -> Option<UserProfile> { self.state.read().user.clone() }
    pub fn user_role(&self) -> Option<Role> { self.state.read().role() }
    pub fn is_email_verified(&self) -> bool { self.state.read().user.as_ref().is_some_and(|u| u.is_email_verified) }

    pub fn has_pending(&self) -> bool { self.pending.lock().is_some() }

    pub fn take_pending(&self) -> Option<Session> { self.pending.lock().take() }

    /// Install a session in memory only (rehydration path; storage already holds it).
    pub fn install(&self, session: Session) {
        *self.state.write() = session;
    }

    /// Store a freshly issued token pair (and user, when the backend sent one) in memory and storage.
    pub fn establish(&self, access_token: SessionToken, refresh_token: SessionToken, user: Option<UserProfile>) -> AppResult<()> {
        {
            let mut st = self.state.write();
            st.access_token = Some(access_token.clone());
            st.refresh_token = Some(refresh_token.clone());
            st.user = user.clone();
        }
        self.pending.lock().take();
        self.storage.set(ACCESS_TOKEN_KEY, &access_token)?;
        self.storage.set(REFRESH_TOKEN_KEY, &refresh_token)?;
        match &user {
            Some(u) => storage::write_json(self.storage.as_ref(), USER_KEY, u)?,
            None => self.storage.remove(USER_KEY)?,
        }
        info!(target: "session", role = ?user.as_ref().map(|u| u.role), "session established");
        Ok(())
    }

    /// Replace only the access token; the refresh token and user stay as they are.
    pub fn set_access_token(&self, access_token: SessionToken) -> AppResult<()> {
        self.state.write().access_token = Some(access_token.clone());
        self.storage.set(ACCESS_TOKEN_KEY, &access_token)?;
        Ok(())
    }

    pub fn set_user(&self, user: UserProfile) -> AppResult<()> {
        storage::write_json(self.storage.as_ref(), USER_KEY, &user)?;
        self.state.write().user = Some(user);
        Ok(())
    }

    pub fn mark_email_verified(&self) -> AppResult<()> {
        let updated = {
            let mut st = self.state.write();
            match st.user.as_mut() {
                Some(u) => {
                    u.is_email_verified = true;
                    Some(u.clone())
                }
                None => None,
            }
        };
        if let Some(u) = updated {
            storage::write_json(self.storage.as_ref(), USER_KEY, &u)?;
        }
        Ok(())
    }

    /// Drop tokens and user from memory and storage. Other client state (the cart) is untouched.
    /// Storage failures are logged and do not stop the in-memory clear.
    pub fn clear_auth(&self) {
        *self.state.write() = Session::default();
        self.pending.lock().take();
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, USER_KEY] {
            if let Err(e) = self.storage.remove(key) {
                warn!(target: "session", key, "failed to remove persisted session key: {}", e);
            }
        }
        debug!(target: "session", "auth state cleared");
    }

    /// End the session: `clear_auth`, then run the logout hooks.
    pub fn logout(&self) {
        self.clear_auth();
        let hooks: Vec<LogoutListener> = self.on_logout.read().clone();
        for hook in hooks {
            hook();
        }
        info!(target: "session", "session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::storage::{DurableStorage, MemoryStorage};

    fn user(role: Role) -> UserProfile {
        UserProfile { id: 1, email: Some("a@b.test".into()), name: None, role, is_email_verified: false }
    }

    #[test]
    fn persisted_session_waits_in_pending_slot() {
        let storage = MemoryStorage::shared();
        storage.set(ACCESS_TOKEN_KEY, "a1").unwrap();
        storage.set(REFRESH_TOKEN_KEY, "r1").unwrap();
        storage::write_json(storage.as_ref(), USER_KEY, &user(Role::Admin)).unwrap();

        let store = SessionStore::open(storage);
        assert!(!store.is_authenticated());
        assert!(store.has_pending());

        let pending = store.take_pending().unwrap();
        assert_eq!(pending.role(), Some(Role::Admin));
        store.install(pending);
        assert!(store.is_authenticated());
        assert!(!store.has_pending());
    }

    #[test]
    fn empty_access_token_is_not_a_session() {
        let storage = MemoryStorage::shared();
        storage.set(ACCESS_TOKEN_KEY, "").unwrap();
        let store = SessionStore::open(storage);
        assert!(!store.has_pending());
    }

    #[test]
    fn establish_without_user_drops_stale_profile() {
        let storage = MemoryStorage::shared();
        let store = SessionStore::open(storage.clone());
        store.establish("a1".into(), "r1".into(), Some(user(Role::Customer))).unwrap();
        assert!(storage.get(USER_KEY).is_some());

        store.establish("a2".into(), "r2".into(), None).unwrap();
        assert!(storage.get(USER_KEY).is_none());
        assert_eq!(store.access_token().as_deref(), Some("a2"));
        assert_eq!(store.user_role(), None);
    }

    #[test]
    fn logout_wipes_storage_and_runs_hooks() {
        let storage = MemoryStorage::shared();
        let store = SessionStore::open(storage.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        store.on_logout(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        store.establish("a1".into(), "r1".into(), Some(user(Role::Professional))).unwrap();
        store.mark_email_verified().unwrap();
        assert!(store.is_email_verified());

        store.logout();
        assert!(!store.is_authenticated());
        assert!(store.current_user().is_none());
        assert!(storage.get(ACCESS_TOKEN_KEY).is_none());
        assert!(storage.get(REFRESH_TOKEN_KEY).is_none());
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn clear_auth_skips_logout_hooks() {
        let storage = MemoryStorage::shared();
        storage.set(crate::storage::CART_KEY, "[]").unwrap();
        let store = SessionStore::open(storage.clone());
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        store.on_logout(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        store.establish("a1".into(), "r1".into(), None).unwrap();

        store.clear_auth();
        assert!(!store.is_authenticated());
        assert!(storage.get(ACCESS_TOKEN_KEY).is_none());
        assert!(storage.get(crate::storage::CART_KEY).is_some());
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
