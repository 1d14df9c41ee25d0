use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::sampling::SamplingParams;
use crate::token::Token;

/// Load-time knobs a backend receives alongside the model path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelParams {
    /// Context window (n_ctx) to allocate for the session.
    pub context_size: u32,
    /// Keep logits for every evaluated position, not just the last one.
    /// Backends need this to report per-token log-probabilities.
    #[serde(default)]
    pub logits_all: bool,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            context_size: 2048,
            logits_all: false,
        }
    }
}

/// Raw text-in, tokens-out contract the completion engine drives.
///
/// Errors are plain strings because most of them come from across the plugin
/// boundary. Prompt shaping happens before a backend sees any text.
pub trait LLMBackend {
    fn load<P: AsRef<Path>>(model_path: P, params: &ModelParams) -> Result<Self, String>
    where
        Self: Sized;

    fn tokenize(&self, text: &str) -> Result<Vec<Token>, String>;

    /// Feed `tokens` starting at position `n_past`.
    fn evaluate(&mut self, tokens: &[Token], n_past: i32) -> Result<(), String>;

    fn sample(
        &mut self,
        n_past: i32,
        params: &SamplingParams,
        history: &[Token],
    ) -> Result<Token, String>;

    /// Text piece of one token. May be a partial UTF-8 sequence rendered lossily.
    fn decode_token(&self, token: Token) -> Result<String, String>;

    fn eos_token(&self) -> Token;

    fn context_window_hint(&self) -> Option<usize> {
        None
    }

    /// Forget cached positions; the model stays loaded.
    fn clear_kv_cache(&mut self) {}

    fn last_sample_logprob(&self) -> Option<f32> {
        None
    }

    /// Bytes of `history[start..]`. The default stitches single-token pieces,
    /// which loses multi-token UTF-8 sequences; plugins with a real
    /// detokenizer should override it.
    fn detokenize_range(&self, history: &[Token], start: usize) -> Result<Vec<u8>, String> {
        history[start..]
            .iter()
            .try_fold(Vec::new(), |mut out, &tok| {
                out.extend_from_slice(self.decode_token(tok)?.as_bytes());
                Ok(out)
            })
    }
}
