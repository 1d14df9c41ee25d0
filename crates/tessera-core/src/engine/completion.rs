//! Request/response shapes of a single text completion.

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::settings::GenerationSettings;
use tessera_abi::sampling::SamplingParams;

/// Everything one completion call needs. Built from resolved settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub prompt: String,
    /// 0 means "as many as the context window allows".
    pub max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_k: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,
    pub stop: Vec<String>,
    /// Prefix the returned text with the prompt.
    pub echo: bool,
}

impl CompletionRequest {
    pub fn from_settings(prompt: impl Into<String>, settings: &GenerationSettings) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: settings.max_tokens_or_default(),
            temperature: settings.temperature,
            top_k: settings.top_k,
            top_p: settings.top_p,
            repeat_penalty: settings.repeat_penalty,
            logprobs: settings.logprobs,
            stop: settings.stop_strings().to_vec(),
            echo: true,
        }
    }

    /// Sampling knobs for the backend; unset values keep the backend defaults.
    pub fn sampling(&self) -> SamplingParams {
        let defaults = SamplingParams::default();
        SamplingParams {
            temperature: self.temperature.or(defaults.temperature),
            top_k: self.top_k.or(defaults.top_k),
            top_p: self.top_p.or(defaults.top_p),
            repeat_penalty: self.repeat_penalty.or(defaults.repeat_penalty),
            repeat_last_n: defaults.repeat_last_n,
            n_probs: self.logprobs,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FinishReason {
    /// EOS or a stop string.
    Stop,
    /// Ran out of token budget.
    Length,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionLogprobs {
    pub tokens: Vec<String>,
    pub text_offset: Vec<usize>,
    /// `None` where the backend did not report a value.
    pub token_logprobs: Vec<Option<f32>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionChoice {
    pub text: String,
    pub index: u32,
    pub logprobs: Option<CompletionLogprobs>,
    pub finish_reason: FinishReason,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
}

impl Usage {
    pub fn new(prompt_tokens: usize, completion_tokens: usize) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Raw structured engine output, shown verbatim in debug mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub id: String,
    pub object: String,
    pub created: u64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: Usage,
}

impl Completion {
    pub fn single(model: impl Into<String>, choice: CompletionChoice, usage: Usage) -> Self {
        Self {
            id: format!("cmpl-{}", uuid::Uuid::new_v4()),
            object: "text_completion".to_string(),
            created: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            model: model.into(),
            choices: vec![choice],
            usage,
        }
    }

    pub fn first_text(&self) -> Option<&str> {
        self.choices.first().map(|c| c.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_takes_settings_and_always_echoes() {
        let settings = GenerationSettings {
            top_k: Some(5),
            stop_strings: Some(vec!["\n".into()]),
            ..Default::default()
        };
        let req = CompletionRequest::from_settings("Q: hi\nA:", &settings);
        assert_eq!(req.max_tokens, 256);
        assert_eq!(req.top_k, Some(5));
        assert_eq!(req.stop, vec!["\n"]);
        assert!(req.echo);

        let sampling = req.sampling();
        assert_eq!(sampling.top_k, Some(5));
        assert_eq!(sampling.temperature, SamplingParams::default().temperature);
    }

    #[test]
    fn completion_serializes_like_a_text_completion() {
        let c = Completion::single(
            "m",
            CompletionChoice {
                text: "x".into(),
                index: 0,
                logprobs: None,
                finish_reason: FinishReason::Length,
            },
            Usage::new(3, 1),
        );
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["object"], "text_completion");
        assert_eq!(v["choices"][0]["finish_reason"], "length");
        assert_eq!(v["usage"]["total_tokens"], 4);
        assert!(v["id"].as_str().unwrap().starts_with("cmpl-"));
    }
}
