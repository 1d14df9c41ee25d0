//! Settings Resolver: raw form fields → typed generation settings + runtime selection.

mod resolve;
pub mod schema;
pub mod stop;

pub use resolve::{RawFields, resolve};

use serde::{Deserialize, Serialize};

/// Default completion budget when the request does not set `max_tokens`.
pub const DEFAULT_MAX_TOKENS: u32 = 256;

/// Typed configuration for one generation call.
///
/// Every field is optional: a field the request left empty is absent here, not zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
    /// Only ever set together with `RuntimeSelection::logits_all`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_strings: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,
}

impl GenerationSettings {
    pub fn is_debug(&self) -> bool {
        self.debug.unwrap_or(false)
    }

    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS)
    }

    pub fn stop_strings(&self) -> &[String] {
        self.stop_strings.as_deref().unwrap_or(&[])
    }
}

/// Routing information carried by a request, kept apart from generation settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeSelection {
    #[serde(default)]
    pub selected_model_path: Option<String>,
    #[serde(default)]
    pub selected_pattern_name: Option<String>,
    /// Companion flag for `logprobs`; forwarded to the backend at load time.
    #[serde(default)]
    pub logits_all: bool,
    /// Free-text user input. Never persisted.
    #[serde(skip)]
    pub prompt: String,
    /// The stop strings were filled in from the selected pattern rather than sent.
    #[serde(skip)]
    pub stops_from_pattern: bool,
}
