use tessera_abi::backend::ModelParams;

use super::{LanguageModel, ModelLoader, StubModel};
use crate::engine::{Completion, CompletionRequest};
use crate::error::GenerationError;
use crate::patterns::PromptPattern;
use crate::render::render;
use crate::settings::GenerationSettings;

enum ModelHandle {
    Uninitialized,
    Live(Box<dyn LanguageModel>),
    Stub(StubModel),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleState {
    Uninitialized,
    Live,
    Stub,
}

/// What one `generate` call hands back for the conversation log.
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationOutcome {
    /// The user's own input and the continuation past the rendered prompt.
    Text { prompt: String, continuation: String },
    /// Debug mode: the exact prompt sent and the untouched engine output.
    Debug {
        rendered_prompt: String,
        raw: Completion,
    },
}

/// Owns the single active model handle.
pub struct ModelSession {
    loader: Box<dyn ModelLoader>,
    handle: ModelHandle,
    last_attempt: Option<(String, ModelParams)>,
}

impl ModelSession {
    pub fn new(loader: Box<dyn ModelLoader>) -> Self {
        Self {
            loader,
            handle: ModelHandle::Uninitialized,
            last_attempt: None,
        }
    }

    pub fn state(&self) -> HandleState {
        match self.handle {
            ModelHandle::Uninitialized => HandleState::Uninitialized,
            ModelHandle::Live(_) => HandleState::Live,
            ModelHandle::Stub(_) => HandleState::Stub,
        }
    }

    /// Why the last load fell back to the stub, while the stub is active.
    pub fn stub_reason(&self) -> Option<&str> {
        match &self.handle {
            ModelHandle::Stub(stub) => Some(stub.reason()),
            _ => None,
        }
    }

    /// Path and params of the most recent load attempt.
    pub fn current(&self) -> Option<(&str, &ModelParams)> {
        self.last_attempt.as_ref().map(|(p, params)| (p.as_str(), params))
    }

    /// Replace the handle with a fresh load attempt. Load failures install the stub.
    pub fn initialize(&mut self, model_path: &str, params: &ModelParams) {
        // Drop the old handle first so two models are never resident at once.
        self.handle = ModelHandle::Uninitialized;
        self.last_attempt = Some((model_path.to_string(), *params));

        self.handle = match self.loader.load(model_path, params) {
            Ok(model) => {
                tracing::info!("[model] loaded {model_path} ({params:?})");
                ModelHandle::Live(model)
            }
            Err(e) => {
                tracing::warn!("[model] could not load {model_path}: {e}; using stub");
                ModelHandle::Stub(StubModel::new(e.to_string()))
            }
        };
    }

    /// Initialize only when nothing is loaded or the request targets a different model.
    pub fn ensure(&mut self, model_path: &str, params: &ModelParams) {
        let same = self
            .last_attempt
            .as_ref()
            .is_some_and(|(p, prev)| p == model_path && prev == params);
        if same && self.state() != HandleState::Uninitialized {
            return;
        }
        self.initialize(model_path, params);
    }

    /// Render `user_input` into `pattern` and run it through the active handle.
    pub fn generate(
        &mut self,
        user_input: &str,
        pattern: &PromptPattern,
        settings: &GenerationSettings,
    ) -> Result<GenerationOutcome, GenerationError> {
        let rendered = render(&pattern.template, user_input);
        let request = CompletionRequest::from_settings(rendered.clone(), settings);

        let raw = match &mut self.handle {
            ModelHandle::Uninitialized => return Err(GenerationError::Uninitialized),
            ModelHandle::Live(model) => model.complete(&request)?,
            ModelHandle::Stub(stub) => stub.complete(&request)?,
        };

        if settings.is_debug() {
            return Ok(GenerationOutcome::Debug {
                rendered_prompt: rendered,
                raw,
            });
        }

        let text = raw.first_text().unwrap_or_default();
        let continuation = text.strip_prefix(rendered.as_str()).unwrap_or(text);
        Ok(GenerationOutcome::Text {
            prompt: user_input.to_string(),
            continuation: continuation.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::engine::testing::ScriptedBackend;
    use crate::error::ModelLoadError;
    use crate::model::BackendLoader;

    struct CountingLoader {
        loads: Arc<AtomicUsize>,
        fail: bool,
    }

    impl ModelLoader for CountingLoader {
        fn load(
            &self,
            model_path: &str,
            params: &ModelParams,
        ) -> Result<Box<dyn LanguageModel>, ModelLoadError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(ModelLoadError::Backend(format!("cannot open {model_path}")))
            } else {
                BackendLoader::<ScriptedBackend>::default().load(env!("CARGO_MANIFEST_DIR"), params)
            }
        }
    }

    fn counting(fail: bool) -> (ModelSession, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        let loader = CountingLoader {
            loads: loads.clone(),
            fail,
        };
        (ModelSession::new(Box::new(loader)), loads)
    }

    fn chat() -> PromptPattern {
        PromptPattern {
            name: "chat".into(),
            template: "Q: <PROMPT>\nA:<RESPONSE>".into(),
            default_stop_strings: vec!["\n".into()],
        }
    }

    fn settings() -> GenerationSettings {
        GenerationSettings {
            stop_strings: Some(vec!["\n".into()]),
            ..Default::default()
        }
    }

    #[test]
    fn generate_before_initialize_is_an_error() {
        let (mut session, _) = counting(false);
        assert!(matches!(
            session.generate("hi", &chat(), &settings()),
            Err(GenerationError::Uninitialized)
        ));
    }

    #[test]
    fn bad_path_falls_back_to_stub() {
        let mut session = ModelSession::new(Box::new(BackendLoader::<ScriptedBackend>::default()));
        session.initialize("/definitely/not/a/model.gguf", &ModelParams::default());
        assert_eq!(session.state(), HandleState::Stub);

        let GenerationOutcome::Text {
            prompt,
            continuation,
        } = session.generate("hi", &chat(), &settings()).unwrap()
        else {
            panic!("expected text outcome");
        };
        assert_eq!(prompt, "hi");
        assert!(continuation.starts_with("I should respond to Q: hi\nA: with {"));
    }

    #[test]
    fn live_model_output_has_prompt_stripped() {
        let (mut session, _) = counting(false);
        session.initialize("m", &ModelParams::default());
        assert_eq!(session.state(), HandleState::Live);

        let out = session.generate("hi", &chat(), &settings()).unwrap();
        assert_eq!(
            out,
            GenerationOutcome::Text {
                prompt: "hi".into(),
                continuation: " scripted reply".into(),
            }
        );
    }

    #[test]
    fn debug_returns_rendered_prompt_and_raw_output() {
        let (mut session, _) = counting(false);
        session.initialize("m", &ModelParams::default());
        let debug = GenerationSettings {
            debug: Some(true),
            ..settings()
        };
        let GenerationOutcome::Debug {
            rendered_prompt,
            raw,
        } = session.generate("hi", &chat(), &debug).unwrap()
        else {
            panic!("expected debug outcome");
        };
        assert_eq!(rendered_prompt, "Q: hi\nA:");
        assert_eq!(raw.first_text(), Some("Q: hi\nA: scripted reply"));
    }

    #[test]
    fn ensure_reloads_only_on_change() {
        let (mut session, loads) = counting(false);
        let params = ModelParams::default();
        session.ensure("a", &params);
        session.ensure("a", &params);
        assert_eq!(loads.load(Ordering::SeqCst), 1);

        session.ensure("b", &params);
        assert_eq!(loads.load(Ordering::SeqCst), 2);

        let with_logits = ModelParams {
            logits_all: true,
            ..params
        };
        session.ensure("b", &with_logits);
        assert_eq!(loads.load(Ordering::SeqCst), 3);
        assert_eq!(session.current(), Some(("b", &with_logits)));
    }

    #[test]
    fn stub_for_same_model_is_not_retried() {
        let (mut session, loads) = counting(true);
        session.ensure("a", &ModelParams::default());
        session.ensure("a", &ModelParams::default());
        assert_eq!(session.state(), HandleState::Stub);
        assert_eq!(loads.load(Ordering::SeqCst), 1);
        assert!(session.stub_reason().is_some());

        // Explicit initialize always re-runs the attempt.
        session.initialize("a", &ModelParams::default());
        assert_eq!(loads.load(Ordering::SeqCst), 2);
    }
}
