use super::CompletionEngine;
use crate::error::GenerationError;
use tessera_abi::backend::LLMBackend;
use tessera_abi::token::Token;

/// Prompt tokens handed to one `evaluate` call.
const PREFILL_CHUNK: usize = 64;

fn lcp_len(a: &[Token], b: &[Token]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

impl<B: LLMBackend> CompletionEngine<B> {
    /// Bring the KV cache in line with `prompt`.
    ///
    /// When the cache already holds exactly a prefix of `prompt`, only the
    /// remainder is evaluated. Anything else clears the cache and evaluates
    /// from position 0. Returns `(n_past, history)` where `history` mirrors
    /// what the cache now holds.
    pub(super) fn prefill(&mut self, prompt: &[Token]) -> Result<(i32, Vec<Token>), GenerationError> {
        let cached = self.prev_prompt_tokens.len();
        let shared = lcp_len(&self.prev_prompt_tokens, prompt);
        let reuse = self.kv_warm && shared == cached;

        let start = if reuse {
            tracing::debug!("[prefill] reusing {shared} cached tokens of {}", prompt.len());
            shared
        } else {
            tracing::debug!("[prefill] cache diverged at {shared}/{cached}; clearing");
            self.backend.clear_kv_cache();
            0
        };

        let mut history = Vec::with_capacity(prompt.len() + 256);
        history.extend_from_slice(&prompt[..start]);
        let mut n_past = start as i32;
        for chunk in prompt[start..].chunks(PREFILL_CHUNK) {
            self.backend.evaluate(chunk, n_past).map_err(|e| {
                GenerationError::Backend(format!("prefill at position {n_past} failed: {e}"))
            })?;
            history.extend_from_slice(chunk);
            n_past += chunk.len() as i32;
        }

        self.prev_prompt_tokens.clone_from(&history);
        self.kv_warm = true;
        Ok((n_past, history))
    }
}
