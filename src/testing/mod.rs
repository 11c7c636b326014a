//! In-memory backend for unit tests.
//!
//! Mirrors the hosted backend closely enough for screen tests: rows are owner-scoped unless the
//! signed-in user holds the admin role, writes to rows you cannot see are silent no-ops, and any
//! operation can be made to fail.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::backend::{
    AuthEvent, AuthEvents, AuthService, AuthSubscription, Collaborators, ItemTable, ProfileTable,
    RoleAssignment, RoleTable,
};
use crate::error::TodoError;
use crate::models::{AuthUser, Item, NewItem, Profile, Session, SignUpOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    GetSession,
    SignIn,
    SignUp,
    SignOut,
    Fetch,
    Insert,
    Toggle,
    Delete,
    Role,
    Profiles,
    Assign,
}

struct Account {
    user: AuthUser,
    password: String,
}

#[derive(Default)]
struct State {
    accounts: Vec<Account>,
    items: Vec<Item>,
    roles: HashMap<Uuid, String>,
    profiles: Vec<Profile>,
    session: Option<Session>,
    failing: HashSet<Op>,
    assigned: Vec<(Uuid, String)>,
    clock: i64,
}

pub struct MemoryBackend {
    state: Mutex<State>,
    events: AuthEvents,
    inserts: AtomicUsize,
    fetches: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(State {
                clock: 1_700_000_000,
                ..Default::default()
            }),
            events: AuthEvents::new(),
            inserts: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        })
    }

    pub fn collaborators(self: &Arc<Self>) -> Collaborators {
        Collaborators::from_shared(self.clone())
    }

    pub fn add_account(&self, email: &str, password: &str) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
        };
        let mut state = self.state.lock().unwrap();
        state.accounts.push(Account {
            user: user.clone(),
            password: password.to_string(),
        });
        state.profiles.push(Profile {
            id: user.id,
            email: Some(email.to_string()),
            full_name: None,
        });
        user
    }

    /// Start a session without going through `sign_in`; publishes nothing.
    pub fn start_session(&self, user: &AuthUser) -> Session {
        let session = Self::session_for(user);
        self.state.lock().unwrap().session = Some(session.clone());
        session
    }

    /// Simulate the session ending elsewhere (expiry, another tab signing out).
    pub fn end_session_remotely(&self) {
        self.state.lock().unwrap().session = None;
        self.events.publish(AuthEvent::SignedOut, None);
    }

    pub fn set_role(&self, user_id: Uuid, role: &str) {
        self.state
            .lock()
            .unwrap()
            .roles
            .insert(user_id, role.to_string());
    }

    pub fn remove_profile(&self, user_id: Uuid) {
        self.state.lock().unwrap().profiles.retain(|p| p.id != user_id);
    }

    pub fn seed_item(&self, owner: Uuid, title: &str, completed: bool) -> Item {
        let mut state = self.state.lock().unwrap();
        let created_at = Self::tick(&mut state);
        let item = Item {
            id: Uuid::new_v4(),
            owner,
            title: title.to_string(),
            content: None,
            completed,
            created_at,
        };
        state.items.push(item.clone());
        item
    }

    pub fn fail(&self, op: Op) {
        self.state.lock().unwrap().failing.insert(op);
    }

    pub fn recover(&self, op: Op) {
        self.state.lock().unwrap().failing.remove(&op);
    }

    pub fn assigned(&self) -> Vec<(Uuid, String)> {
        self.state.lock().unwrap().assigned.clone()
    }

    pub fn insert_calls(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self) -> usize {
        self.events.subscriber_count()
    }

    fn session_for(user: &AuthUser) -> Session {
        Session {
            access_token: format!("access-{}", user.id),
            refresh_token: format!("refresh-{}", user.id),
            expires_at: None,
            user: user.clone(),
        }
    }

    fn tick(state: &mut State) -> DateTime<Utc> {
        state.clock += 60;
        Utc.timestamp_opt(state.clock, 0).unwrap()
    }

    fn check(state: &State, op: Op) -> Result<(), TodoError> {
        if state.failing.contains(&op) {
            let message = format!("simulated {:?} failure", op).to_lowercase();
            return Err(match op {
                Op::GetSession | Op::SignIn | Op::SignUp | Op::SignOut => TodoError::auth(message),
                _ => TodoError::query(message),
            });
        }
        Ok(())
    }

    fn caller(state: &State) -> Result<(Uuid, bool), TodoError> {
        let session = state
            .session
            .as_ref()
            .ok_or_else(|| TodoError::auth("JWT expired"))?;
        let id = session.user.id;
        let admin = state.roles.get(&id).map(|r| r == "admin").unwrap_or(false);
        Ok((id, admin))
    }

    fn newest_first(mut items: Vec<Item>) -> Vec<Item> {
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        items
    }
}

#[async_trait]
impl AuthService for MemoryBackend {
    async fn get_session(&self) -> Result<Option<Session>, TodoError> {
        let state = self.state.lock().unwrap();
        Self::check(&state, Op::GetSession)?;
        Ok(state.session.clone())
    }

    fn on_auth_state_change(&self) -> AuthSubscription {
        self.events.subscribe()
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, TodoError> {
        let session = {
            let mut state = self.state.lock().unwrap();
            Self::check(&state, Op::SignIn)?;
            let account = state
                .accounts
                .iter()
                .find(|a| a.user.email.as_deref() == Some(email) && a.password == password)
                .ok_or_else(|| TodoError::auth("Invalid login credentials"))?;
            let session = Self::session_for(&account.user);
            state.session = Some(session.clone());
            session
        };
        self.events.publish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _redirect: Option<&str>,
    ) -> Result<SignUpOutcome, TodoError> {
        {
            let state = self.state.lock().unwrap();
            Self::check(&state, Op::SignUp)?;
            if state.accounts.iter().any(|a| a.user.email.as_deref() == Some(email)) {
                return Err(TodoError::auth("User already registered"));
            }
        }
        let user = self.add_account(email, password);
        let session = self.start_session(&user);
        self.events.publish(AuthEvent::SignedIn, Some(session.clone()));
        Ok(SignUpOutcome::SignedIn(session))
    }

    async fn sign_out(&self) -> Result<(), TodoError> {
        {
            let mut state = self.state.lock().unwrap();
            Self::check(&state, Op::SignOut)?;
            state.session = None;
        }
        self.events.publish(AuthEvent::SignedOut, None);
        Ok(())
    }
}

#[async_trait]
impl ItemTable for MemoryBackend {
    async fn list_owned(&self, owner: Uuid) -> Result<Vec<Item>, TodoError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Self::check(&state, Op::Fetch)?;
        let (caller, admin) = Self::caller(&state)?;
        let rows = state
            .items
            .iter()
            .filter(|i| i.owner == owner && (admin || i.owner == caller))
            .cloned()
            .collect();
        Ok(Self::newest_first(rows))
    }

    async fn list_all(&self) -> Result<Vec<Item>, TodoError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        let state = self.state.lock().unwrap();
        Self::check(&state, Op::Fetch)?;
        let (caller, admin) = Self::caller(&state)?;
        let rows = state
            .items
            .iter()
            .filter(|i| admin || i.owner == caller)
            .cloned()
            .collect();
        Ok(Self::newest_first(rows))
    }

    async fn insert(&self, item: &NewItem) -> Result<(), TodoError> {
        self.inserts.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        Self::check(&state, Op::Insert)?;
        let (caller, _) = Self::caller(&state)?;
        if item.owner() != caller {
            return Err(TodoError::query(
                "new row violates row-level security policy for table \"todos\"",
            ));
        }
        let created_at = Self::tick(&mut state);
        state.items.push(Item {
            id: Uuid::new_v4(),
            owner: item.owner(),
            title: item.title().to_string(),
            content: item.content().map(str::to_string),
            completed: false,
            created_at,
        });
        Ok(())
    }

    async fn set_completed(&self, id: Uuid, completed: bool) -> Result<(), TodoError> {
        let mut state = self.state.lock().unwrap();
        Self::check(&state, Op::Toggle)?;
        let (caller, admin) = Self::caller(&state)?;
        if let Some(item) = state
            .items
            .iter_mut()
            .find(|i| i.id == id && (admin || i.owner == caller))
        {
            item.completed = completed;
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), TodoError> {
        let mut state = self.state.lock().unwrap();
        Self::check(&state, Op::Delete)?;
        let (caller, admin) = Self::caller(&state)?;
        state
            .items
            .retain(|i| !(i.id == id && (admin || i.owner == caller)));
        Ok(())
    }
}

#[async_trait]
impl RoleTable for MemoryBackend {
    async fn find_role(&self, user_id: Uuid) -> Result<Option<String>, TodoError> {
        let state = self.state.lock().unwrap();
        Self::check(&state, Op::Role)?;
        Ok(state.roles.get(&user_id).cloned())
    }
}

#[async_trait]
impl ProfileTable for MemoryBackend {
    async fn find_profiles(&self, user_ids: &[Uuid]) -> Result<Vec<Profile>, TodoError> {
        let state = self.state.lock().unwrap();
        Self::check(&state, Op::Profiles)?;
        Ok(state
            .profiles
            .iter()
            .filter(|p| user_ids.contains(&p.id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl RoleAssignment for MemoryBackend {
    async fn assign_admin(&self, user_id: Uuid, admin_credential: &str) -> Result<(), TodoError> {
        let mut state = self.state.lock().unwrap();
        Self::check(&state, Op::Assign)?;
        state.assigned.push((user_id, admin_credential.to_string()));
        state.roles.insert(user_id, "admin".to_string());
        Ok(())
    }
}
