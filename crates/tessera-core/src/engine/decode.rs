use std::panic;

use super::CompletionEngine;
use super::completion::{
    Completion, CompletionChoice, CompletionLogprobs, CompletionRequest, FinishReason, Usage,
};
use super::utils::{find_stop, utf8_valid_prefix_len};
use crate::error::GenerationError;
use tessera_abi::backend::LLMBackend;

/// Per-token bookkeeping collected only when the request asks for logprobs.
#[derive(Default)]
struct LogprobTrace {
    tokens: Vec<String>,
    text_offset: Vec<usize>,
    token_logprobs: Vec<Option<f32>>,
    next_offset: usize,
}

impl LogprobTrace {
    fn starting_at(offset: usize) -> Self {
        Self {
            next_offset: offset,
            ..Default::default()
        }
    }

    fn push(&mut self, piece: String, logprob: Option<f32>) {
        self.text_offset.push(self.next_offset);
        self.next_offset += piece.len();
        self.tokens.push(piece);
        self.token_logprobs.push(logprob);
    }

    /// Drop entries that start at or beyond `end` (text cut by a stop string).
    fn truncate_at(&mut self, end: usize) {
        let keep = self.text_offset.iter().take_while(|&&o| o < end).count();
        self.tokens.truncate(keep);
        self.text_offset.truncate(keep);
        self.token_logprobs.truncate(keep);
    }

    fn finish(self) -> CompletionLogprobs {
        CompletionLogprobs {
            tokens: self.tokens,
            text_offset: self.text_offset,
            token_logprobs: self.token_logprobs,
        }
    }
}

impl<B: LLMBackend> CompletionEngine<B> {
    /// Run one completion. A backend panic is reported as `GenerationError::Panicked`.
    pub fn complete(&mut self, request: &CompletionRequest) -> Result<Completion, GenerationError> {
        panic::catch_unwind(panic::AssertUnwindSafe(|| self.complete_inner(request)))
            .map_err(|_| {
                tracing::error!("[infer] panic during inference");
                GenerationError::Panicked
            })?
    }

    fn complete_inner(&mut self, request: &CompletionRequest) -> Result<Completion, GenerationError> {
        tracing::debug!("[infer] prompt: {:?}", request.prompt);

        let prompt_tokens = self
            .backend
            .tokenize(&request.prompt)
            .map_err(|e| GenerationError::Backend(format!("tokenization failed: {e}")))?;
        tracing::debug!("[infer] tokenized input ({} tokens)", prompt_tokens.len());

        let step_limit = self.compute_step_limit(prompt_tokens.len(), request.max_tokens)?;
        let sampling = request.sampling().normalized();

        let (mut n_past, mut history) = self.prefill(&prompt_tokens)?;
        // Tokens before `flushed` have already been turned into bytes.
        let mut flushed = history.len();

        let echo_len = if request.echo { request.prompt.len() } else { 0 };
        let mut trace = request
            .logprobs
            .map(|_| LogprobTrace::starting_at(echo_len));

        let mut out_text = String::new();
        let mut staging_bytes: Vec<u8> = Vec::with_capacity(4096);
        let mut generated = 0usize;
        let mut finish_reason = FinishReason::Length;

        for step in 0..step_limit {
            let token = self
                .backend
                .sample(n_past, &sampling, &history)
                .map_err(|e| GenerationError::Backend(format!("sampling failed: {e}")))?;

            if token == self.backend.eos_token() {
                tracing::debug!("[infer] EOS at step {step}");
                finish_reason = FinishReason::Stop;
                break;
            }
            let logprob = self.backend.last_sample_logprob();

            self.backend
                .evaluate(&[token], n_past)
                .map_err(|e| GenerationError::Backend(format!("re-eval failed at step {step}: {e}")))?;
            history.push(token);
            n_past += 1;
            generated += 1;

            if let Some(trace) = trace.as_mut() {
                let piece = self.backend.decode_token(token).unwrap_or_default();
                trace.push(piece, logprob);
            }

            let new_bytes = self
                .backend
                .detokenize_range(&history, flushed)
                .map_err(GenerationError::Backend)?;
            if new_bytes.is_empty() {
                continue;
            }
            staging_bytes.extend_from_slice(&new_bytes);
            flushed = history.len();

            let valid_len = utf8_valid_prefix_len(&staging_bytes);
            if valid_len == 0 {
                continue;
            }
            let taken: Vec<u8> = staging_bytes.drain(..valid_len).collect();
            let delta = String::from_utf8(taken)
                .map_err(|e| GenerationError::Backend(format!("detokenize produced non-UTF-8: {e}")))?;
            out_text.push_str(&delta);

            if let Some(cut) = find_stop(&out_text, &request.stop) {
                tracing::debug!("[infer] stop string hit at byte {cut}");
                out_text.truncate(cut);
                if let Some(trace) = trace.as_mut() {
                    trace.truncate_at(echo_len + cut);
                }
                finish_reason = FinishReason::Stop;
                break;
            }
        }

        // Every evaluated token is in the KV cache, including ones that produced no text yet.
        self.prev_prompt_tokens = history;

        tracing::info!(
            "[infer] complete: {generated} tokens, {} chars, finish={finish_reason:?}",
            out_text.len()
        );

        let text = if request.echo {
            format!("{}{out_text}", request.prompt)
        } else {
            out_text
        };
        Ok(Completion::single(
            self.model_name.clone(),
            CompletionChoice {
                text,
                index: 0,
                logprobs: trace.map(LogprobTrace::finish),
                finish_reason,
            },
            Usage::new(prompt_tokens.len(), generated),
        ))
    }
}
