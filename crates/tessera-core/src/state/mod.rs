//! Session State Bridge: the last resolved configuration, persisted per browser session.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::SessionStoreError;
use crate::settings::{GenerationSettings, RuntimeSelection};

mod file;
mod store;

pub use file::FileSessionStore;
pub use store::{MemorySessionStore, SessionStore};

/// Stable per-user key. Always a UUID, so it is safe to use as a file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(uuid::Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4())
    }

    /// `None` for anything that is not a UUID.
    pub fn parse(raw: &str) -> Option<Self> {
        uuid::Uuid::parse_str(raw.trim()).ok().map(Self)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Everything remembered between requests. Settings and routing stay separate bundles.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub settings: GenerationSettings,
    #[serde(default)]
    pub selection: RuntimeSelection,
    #[serde(default)]
    pub selected_pattern_name: Option<String>,
}

/// Reads at request start, overwrites at request end.
pub struct SessionBridge<'a> {
    store: &'a dyn SessionStore,
    id: SessionId,
}

impl<'a> SessionBridge<'a> {
    pub fn new(store: &'a dyn SessionStore, id: SessionId) -> Self {
        Self { store, id }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// The stored bundle, or an empty one when nothing (readable) is stored.
    pub fn load(&self) -> SessionState {
        match self.store.load(&self.id) {
            Ok(state) => state.unwrap_or_default(),
            Err(e) => {
                tracing::warn!("[session] could not read state for {}: {e}", self.id);
                SessionState::default()
            }
        }
    }

    /// Replace the whole bundle.
    ///
    /// Stop strings that came from the pattern are not remembered, so the next
    /// request picks up whichever pattern it selects.
    pub fn save(
        &self,
        settings: &GenerationSettings,
        selection: &RuntimeSelection,
        pattern_name: Option<&str>,
    ) -> Result<(), SessionStoreError> {
        let mut settings = settings.clone();
        if selection.stops_from_pattern {
            settings.stop_strings = None;
        }
        let state = SessionState {
            settings,
            selection: selection.clone(),
            selected_pattern_name: pattern_name.map(str::to_string),
        };
        self.store.save(&self.id, &state)?;
        tracing::debug!("[session] saved state for {}", self.id);
        Ok(())
    }
}
