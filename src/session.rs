use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::models::{AdminUser, Role, Session};

/// Storage key holding the opaque bearer token.
pub const TOKEN_KEY: &str = "token";
/// Storage key holding the serialized user record.
pub const USER_KEY: &str = "user";
/// The login boundary every failed guard redirects to.
pub const LOGIN_ROUTE: &str = "/login";

// 1. SessionStore Contract
/// SessionStore
///
/// Defines the abstract contract for the process-wide key-value store holding
/// the persisted session (exactly two keys: token + user record). This trait
/// allows us to swap the concrete implementation—from the file-backed store
/// (FileSessionStore) in a real deployment to the in-memory store
/// (MemorySessionStore) during testing—without affecting the guards.
///
/// All access is synchronous: guards must be able to inspect storage without
/// suspending, so that no protected content is ever rendered while the
/// decision is pending.
pub trait SessionStore: Send + Sync {
    /// Reads one key, `None` if absent.
    fn get(&self, key: &str) -> Option<String>;

    /// Writes one key, overwriting any previous value.
    fn set(&self, key: &str, value: &str);

    /// Removes one key. No-op if absent.
    fn remove(&self, key: &str);

    /// Removes every key. Must be idempotent: clearing an already-empty store
    /// is not an error.
    fn clear(&self);
}

/// SessionState
///
/// The concrete type used to share the session store across components.
pub type SessionState = Arc<dyn SessionStore>;

// 2. In-Memory Implementation
/// MemorySessionStore
///
/// A volatile store used in tests and by hosts that manage persistence
/// themselves. Interior mutability keeps the trait object freely shareable.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }
}

// 3. File-Backed Implementation
/// FileSessionStore
///
/// Persists the key-value map as a single JSON document on disk, so a login
/// survives process restarts. Every mutation rewrites the file; the map is
/// tiny (two keys) so this is not a throughput concern.
///
/// Storage I/O failures are logged and otherwise swallowed: a store that
/// cannot be read behaves as an absent session, which the guards already
/// handle by redirecting to the login boundary.
pub struct FileSessionStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileSessionStore {
    /// Opens the store at `path`, loading any previously persisted session.
    pub fn open(path: PathBuf) -> Self {
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
                tracing::warn!(?path, %err, "discarding unreadable session file");
                HashMap::new()
            }),
            Err(_) => HashMap::new(),
        };

        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    fn persist(&self, entries: &HashMap<String, String>) {
        if let Some(parent) = self.path.parent() {
            let _ = fs::create_dir_all(parent);
        }
        match serde_json::to_string(entries) {
            Ok(raw) => {
                if let Err(err) = fs::write(&self.path, raw) {
                    tracing::error!(path = ?self.path, %err, "failed to persist session state");
                }
            }
            Err(err) => tracing::error!(%err, "failed to serialize session state"),
        }
    }
}

impl SessionStore for FileSessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key.to_string(), value.to_string());
            self.persist(&entries);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.remove(key);
            self.persist(&entries);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
            self.persist(&entries);
        }
    }
}

// 4. Session Load/Save Helpers

/// load_session
///
/// Resolves the persisted session, enforcing the all-or-nothing invariant:
/// both keys must be present AND the user record must parse, otherwise the
/// session is absent. A token without a user record (or vice versa, or a
/// corrupt record) never yields a partial session.
pub fn load_session(store: &dyn SessionStore) -> Option<Session> {
    let token = store.get(TOKEN_KEY)?;
    let raw_user = store.get(USER_KEY)?;

    match serde_json::from_str::<AdminUser>(&raw_user) {
        Ok(user) => Some(Session { token, user }),
        Err(err) => {
            tracing::warn!(%err, "stored user record is unreadable, treating session as absent");
            None
        }
    }
}

/// save_session
///
/// Overwrites the persisted session with a freshly authenticated one. Login
/// overwrites; it never merges with previous state.
pub fn save_session(store: &dyn SessionStore, session: &Session) {
    store.set(TOKEN_KEY, &session.token);
    match serde_json::to_string(&session.user) {
        Ok(raw) => store.set(USER_KEY, &raw),
        Err(err) => tracing::error!(%err, "failed to serialize user record"),
    }
}

/// logout
///
/// Clears all persisted session state unconditionally and hands back the login
/// route for the caller to navigate to. Idempotent: calling it while already
/// logged out is a no-op that still returns the login route.
pub fn logout(store: &dyn SessionStore) -> &'static str {
    store.clear();
    LOGIN_ROUTE
}

// 5. Guards

/// GuardState
///
/// The session guard's state machine: `Loading` while storage has not been
/// inspected yet (hosts render a neutral/blank frame in this state so no
/// protected content flashes before a redirect), then exactly one of the two
/// terminal states.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardState {
    /// Storage not inspected yet; render nothing.
    Loading,
    /// A full session is present; render protected content.
    Authenticated(Session),
    /// No (or partial) session; render nothing, navigation fires once.
    Redirecting,
}

/// SessionGuard
///
/// The shell-level guard invoked once per mount of a protected surface. It
/// inspects the persisted token/user pair synchronously and settles into a
/// terminal state. The redirect navigation side-effect is emitted exactly
/// once, however many times the host re-reads the state.
pub struct SessionGuard {
    store: SessionState,
    state: GuardState,
    redirect_emitted: bool,
}

impl SessionGuard {
    /// Creates a guard in the `Loading` state; nothing is inspected yet.
    pub fn new(store: SessionState) -> Self {
        Self {
            store,
            state: GuardState::Loading,
            redirect_emitted: false,
        }
    }

    /// resolve
    ///
    /// Inspects storage and settles the state machine. Once a terminal state
    /// is reached, further calls return it unchanged: the shell-level check
    /// runs once per mount.
    pub fn resolve(&mut self) -> &GuardState {
        if self.state == GuardState::Loading {
            self.state = match load_session(self.store.as_ref()) {
                Some(session) => GuardState::Authenticated(session),
                None => GuardState::Redirecting,
            };
        }
        &self.state
    }

    /// The current state without re-inspecting storage.
    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// The resolved session, available only in the `Authenticated` state.
    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            GuardState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// take_redirect
    ///
    /// Yields the login route the host must navigate to, at most once per
    /// guard. Returns `None` when authenticated or when the navigation was
    /// already emitted.
    pub fn take_redirect(&mut self) -> Option<&'static str> {
        if self.state == GuardState::Redirecting && !self.redirect_emitted {
            self.redirect_emitted = true;
            Some(LOGIN_ROUTE)
        } else {
            None
        }
    }
}

/// RoleRequirement
///
/// Parameterizes the page-level guard: ordinary console pages accept any
/// admin-grade role, admin-management tooling demands the superuser.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleRequirement {
    /// `ADMIN` or `SUPER_ADMIN`.
    Admin,
    /// Exactly `SUPER_ADMIN`.
    SuperAdmin,
}

impl RoleRequirement {
    /// Whether the given role satisfies this requirement.
    pub fn satisfied_by(self, role: Role) -> bool {
        match self {
            RoleRequirement::Admin => role.is_admin_grade(),
            RoleRequirement::SuperAdmin => role == Role::SuperAdmin,
        }
    }
}

/// RouteGuard
///
/// The page-level guard layered on top of `SessionGuard`. Unlike the shell
/// check, which runs once per mount, this one re-validates on **every**
/// navigation, because a route change does not remount the shell. On a role
/// failure it clears all persisted session state before redirecting, forcing
/// a fresh login.
pub struct RouteGuard {
    store: SessionState,
    requirement: RoleRequirement,
    state: GuardState,
    redirect_emitted: bool,
}

impl RouteGuard {
    pub fn new(store: SessionState, requirement: RoleRequirement) -> Self {
        Self {
            store,
            requirement,
            state: GuardState::Loading,
            redirect_emitted: false,
        }
    }

    /// on_navigate
    ///
    /// Re-runs the full check for the route just entered. Every call
    /// re-inspects storage, so a session revoked between navigations is
    /// caught on the next one.
    pub fn on_navigate(&mut self, route: &str) -> &GuardState {
        let _ = route; // the decision depends only on the stored session
        self.state = match load_session(self.store.as_ref()) {
            Some(session) if self.requirement.satisfied_by(session.user.role) => {
                GuardState::Authenticated(session)
            }
            Some(session) => {
                tracing::warn!(
                    username = %session.user.username,
                    role = ?session.user.role,
                    required = ?self.requirement,
                    "role check failed, clearing session"
                );
                self.store.clear();
                GuardState::Redirecting
            }
            None => GuardState::Redirecting,
        };
        &self.state
    }

    /// The current state without re-checking.
    pub fn state(&self) -> &GuardState {
        &self.state
    }

    /// The resolved session, available only in the `Authenticated` state.
    pub fn session(&self) -> Option<&Session> {
        match &self.state {
            GuardState::Authenticated(session) => Some(session),
            _ => None,
        }
    }

    /// Yields the login route at most once per guard; see
    /// `SessionGuard::take_redirect`.
    pub fn take_redirect(&mut self) -> Option<&'static str> {
        if self.state == GuardState::Redirecting && !self.redirect_emitted {
            self.redirect_emitted = true;
            Some(LOGIN_ROUTE)
        } else {
            None
        }
    }
}
