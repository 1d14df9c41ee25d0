//! Model Session: one active model handle, live or stub, behind a single `generate`.

use std::marker::PhantomData;
use std::path::Path;

use tessera_abi::backend::{LLMBackend, ModelParams};

use crate::engine::{Completion, CompletionEngine, CompletionRequest};
use crate::error::{GenerationError, ModelLoadError};

mod session;
mod stub;

pub use session::{GenerationOutcome, HandleState, ModelSession};
pub use stub::StubModel;

/// Anything that turns a completion request into a structured completion.
pub trait LanguageModel: Send {
    fn complete(&mut self, request: &CompletionRequest) -> Result<Completion, GenerationError>;
}

/// Builds live model handles. The session owns exactly one loader.
pub trait ModelLoader: Send {
    fn load(
        &self,
        model_path: &str,
        params: &ModelParams,
    ) -> Result<Box<dyn LanguageModel>, ModelLoadError>;
}

/// A completion engine over a real backend.
pub struct LiveModel<B: LLMBackend> {
    engine: CompletionEngine<B>,
}

impl<B: LLMBackend> LiveModel<B> {
    pub fn new(engine: CompletionEngine<B>) -> Self {
        Self { engine }
    }
}

impl<B: LLMBackend + Send> LanguageModel for LiveModel<B> {
    fn complete(&mut self, request: &CompletionRequest) -> Result<Completion, GenerationError> {
        self.engine.complete(request)
    }
}

impl<B: LLMBackend> Drop for LiveModel<B> {
    fn drop(&mut self) {
        tracing::debug!("[model] releasing {}", self.engine.model_name());
        self.engine.clear_kv_cache();
    }
}

/// Loader for any statically known backend type.
pub struct BackendLoader<B> {
    decode_cap: Option<usize>,
    _backend: PhantomData<fn() -> B>,
}

impl<B> BackendLoader<B> {
    pub fn new(decode_cap: Option<usize>) -> Self {
        Self {
            decode_cap,
            _backend: PhantomData,
        }
    }
}

impl<B> Default for BackendLoader<B> {
    fn default() -> Self {
        Self::new(None)
    }
}

impl<B: LLMBackend + Send + 'static> ModelLoader for BackendLoader<B> {
    fn load(
        &self,
        model_path: &str,
        params: &ModelParams,
    ) -> Result<Box<dyn LanguageModel>, ModelLoadError> {
        if model_path.trim().is_empty() {
            return Err(ModelLoadError::InvalidPath("empty model path".into()));
        }
        let path = Path::new(model_path);
        let backend = B::load(path, params).map_err(ModelLoadError::Backend)?;
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_path.to_string());
        let engine = CompletionEngine::new(backend, name).with_decode_cap(self.decode_cap);
        Ok(Box::new(LiveModel::new(engine)))
    }
}
