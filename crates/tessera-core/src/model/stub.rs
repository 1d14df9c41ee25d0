use serde::Serialize;

use super::LanguageModel;
use crate::engine::{Completion, CompletionChoice, CompletionRequest, FinishReason, Usage};
use crate::error::GenerationError;

/// Deterministic stand-in installed when a live model cannot be loaded.
///
/// Replies `I should respond to {prompt} with {params}` where `params` is the
/// JSON of every request field except the prompt.
#[derive(Debug, Clone, Default)]
pub struct StubModel {
    reason: String,
}

impl StubModel {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    /// Why the live model was not available.
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

#[derive(Serialize)]
struct EchoedParams<'a> {
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    logprobs: Option<u32>,
    stop: &'a [String],
    echo: bool,
}

impl LanguageModel for StubModel {
    fn complete(&mut self, request: &CompletionRequest) -> Result<Completion, GenerationError> {
        let params = serde_json::to_string(&EchoedParams {
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_k: request.top_k,
            top_p: request.top_p,
            repeat_penalty: request.repeat_penalty,
            logprobs: request.logprobs,
            stop: &request.stop,
            echo: request.echo,
        })
        .map_err(|e| GenerationError::Backend(e.to_string()))?;

        Ok(Completion::single(
            "stub",
            CompletionChoice {
                text: format!("I should respond to {} with {params}", request.prompt),
                index: 0,
                logprobs: None,
                finish_reason: FinishReason::Stop,
            },
            Usage::default(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_names_prompt_and_params() {
        let req = CompletionRequest {
            prompt: "hi".into(),
            max_tokens: 8,
            temperature: None,
            top_k: Some(3),
            top_p: None,
            repeat_penalty: None,
            logprobs: None,
            stop: vec!["\n".into()],
            echo: true,
        };
        let out = StubModel::new("test").complete(&req).unwrap();
        assert_eq!(
            out.first_text(),
            Some(r#"I should respond to hi with {"max_tokens":8,"top_k":3,"stop":["\n"],"echo":true}"#)
        );
        assert_eq!(out.model, "stub");
    }
}
