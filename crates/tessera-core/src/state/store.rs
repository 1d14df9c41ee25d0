use std::collections::HashMap;
use std::sync::Mutex;

use super::{SessionId, SessionState};
use crate::error::SessionStoreError;

/// Opaque bundle storage keyed by session id.
pub trait SessionStore: Send + Sync {
    fn load(&self, id: &SessionId) -> Result<Option<SessionState>, SessionStoreError>;
    fn save(&self, id: &SessionId, state: &SessionState) -> Result<(), SessionStoreError>;
}

/// Process-local store; state is lost on restart.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    states: Mutex<HashMap<SessionId, SessionState>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self, id: &SessionId) -> Result<Option<SessionState>, SessionStoreError> {
        let states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        Ok(states.get(id).cloned())
    }

    fn save(&self, id: &SessionId, state: &SessionState) -> Result<(), SessionStoreError> {
        let mut states = self.states.lock().unwrap_or_else(|p| p.into_inner());
        states.insert(*id, state.clone());
        Ok(())
    }
}
