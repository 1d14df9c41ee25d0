//! Completion engine: drives an `LLMBackend` through prefill and decode for one prompt.

use tessera_abi::backend::LLMBackend;
use tessera_abi::token::Token;

use crate::error::GenerationError;

pub mod completion;
mod decode;
mod prefill;
mod utils;

pub use completion::{
    Completion, CompletionChoice, CompletionLogprobs, CompletionRequest, FinishReason, Usage,
};

/// Fallback when the backend does not report its context window.
const DEFAULT_CONTEXT_WINDOW: usize = 2048;

/// Engine = {loaded backend session} + {KV reuse bookkeeping}.
/// Prompts arrive fully rendered; the engine adds no chat formatting of its own.
pub struct CompletionEngine<B: LLMBackend> {
    backend: B,
    model_name: String,
    context_size: usize,
    decode_cap: Option<usize>,
    // ========== KV reuse bookkeeping ==========
    prev_prompt_tokens: Vec<Token>,
    kv_warm: bool,
}

impl<B: LLMBackend> CompletionEngine<B> {
    pub fn new(backend: B, model_name: impl Into<String>) -> Self {
        let context_size = backend
            .context_window_hint()
            .unwrap_or(DEFAULT_CONTEXT_WINDOW);
        tracing::debug!("[engine] context window = {context_size}");
        Self {
            backend,
            model_name: model_name.into(),
            context_size,
            decode_cap: None,
            prev_prompt_tokens: Vec::new(),
            kv_warm: false,
        }
    }

    /// Clamp every completion to at most `cap` decode steps.
    pub fn with_decode_cap(mut self, cap: Option<usize>) -> Self {
        self.decode_cap = cap.map(|c| c.max(1));
        self
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    /// Explicitly clear any cached KV / sequence state on the backend.
    pub fn clear_kv_cache(&mut self) {
        self.backend.clear_kv_cache();
        self.prev_prompt_tokens.clear();
        self.kv_warm = false;
    }

    /// Decide how many decode steps to allow for this prompt.
    ///
    /// `max_tokens == 0` means "fill the context window".
    fn compute_step_limit(&self, prompt_len: usize, max_tokens: u32) -> Result<usize, GenerationError> {
        let reserve = ((self.context_size as f32) * 0.02) as usize; // ~2% safety
        let room = self
            .context_size
            .saturating_sub(prompt_len)
            .saturating_sub(reserve);
        if room == 0 {
            return Err(GenerationError::Backend(format!(
                "prompt of {prompt_len} tokens leaves no room in a context window of {}",
                self.context_size
            )));
        }

        let mut limit = match max_tokens {
            0 => room,
            n => room.min(n as usize),
        };
        if let Some(cap) = self.decode_cap {
            limit = limit.min(cap);
        }
        Ok(limit)
    }
}

// NOTE: The heavy lifting lives in child modules as `impl CompletionEngine<B>`:
//
// - prefill.rs:    prefill(...) with KV prefix reuse
// - decode.rs:     complete(...)
// - utils.rs:      utf8_valid_prefix_len(...), find_stop(...)
