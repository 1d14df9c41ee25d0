//! Tessera core: prompt patterns, settings resolution, rendering, and the model session.

pub mod engine;
pub mod error;
pub mod memory;
pub mod model;
pub mod patterns;
pub mod render;
pub mod settings;
pub mod state;

pub use error::{
    CoreError, GenerationError, ModelLoadError, PatternError, Result, SessionStoreError,
    SettingsError,
};
pub use memory::{ConversationEntry, ConversationLog};
pub use model::{GenerationOutcome, HandleState, LanguageModel, ModelLoader, ModelSession};
pub use patterns::{PatternStore, PromptPattern};
pub use render::render;
pub use settings::{GenerationSettings, RawFields, RuntimeSelection, resolve};
pub use state::{SessionBridge, SessionId, SessionState, SessionStore};
