use std::sync::{Arc, Mutex, MutexGuard};

use tessera_core::state::{FileSessionStore, SessionStore};
use tessera_core::{ConversationLog, ModelLoader, ModelSession};

use crate::config::Config;
use crate::plugin::PluginModelLoader;

/// Shared application state, cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    /// The one model handle. Held for the whole generate call, so requests queue here.
    pub model: Arc<Mutex<ModelSession>>,

    /// Process-wide exchange log rendered on every page.
    pub log: Arc<Mutex<ConversationLog>>,

    /// Per-browser settings bundles.
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    pub fn new(config: Config, loader: Box<dyn ModelLoader>, sessions: Arc<dyn SessionStore>) -> Self {
        let log = ConversationLog::with_capacity(config.log_capacity);
        Self {
            config: Arc::new(config),
            model: Arc::new(Mutex::new(ModelSession::new(loader))),
            log: Arc::new(Mutex::new(log)),
            sessions,
        }
    }

    /// Production wiring: plugin-backed models, sessions on disk.
    pub fn from_config(config: Config) -> Self {
        let loader = PluginModelLoader::from_config(&config);
        let sessions = FileSessionStore::new(config.sessions_dir.clone());
        Self::new(config, Box::new(loader), Arc::new(sessions))
    }

    pub fn model(&self) -> MutexGuard<'_, ModelSession> {
        self.model.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn log(&self) -> MutexGuard<'_, ConversationLog> {
        self.log.lock().unwrap_or_else(|p| p.into_inner())
    }
}
