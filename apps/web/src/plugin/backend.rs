use std::ffi::CString;
use std::path::Path;
use std::slice;

use tessera_abi::backend::{LLMBackend, ModelParams};
use tessera_abi::ffi::{FfiString, STATUS_OK, SessionPtr, SessionVTable};
use tessera_abi::sampling::SamplingParams;
use tessera_abi::token::{Token, to_ids};

use super::loader::LoadedPlugin;

/// A model opened inside the backend plugin.
pub struct PluginBackend {
    plugin: &'static LoadedPlugin,
    session: SessionPtr,
    eos: Token,
    ctx_len: Option<usize>,
}

// SAFETY: the session pointer is only used through `&mut self` or while the
// model session lock is held, never from two threads at once.
unsafe impl Send for PluginBackend {}

impl Drop for PluginBackend {
    fn drop(&mut self) {
        if !self.session.is_null() {
            unsafe { (self.vt().close)(self.session) };
            self.session = std::ptr::null_mut();
        }
    }
}

fn c_string(s: &str) -> Result<CString, String> {
    CString::new(s).map_err(|_| format!("interior NUL in {s:?}"))
}

/// Copy a plugin string into Rust memory and give the buffer back.
fn take_string(vt: &SessionVTable, s: FfiString) -> String {
    if s.data.is_null() {
        return String::new();
    }
    let out = if s.len == 0 {
        String::new()
    } else {
        // SAFETY: the plugin guarantees `data` points at `len` readable bytes until released.
        let bytes = unsafe { slice::from_raw_parts(s.data.cast::<u8>(), s.len) };
        String::from_utf8_lossy(bytes).into_owned()
    };
    unsafe { (vt.release_string)(s) };
    out
}

fn plugin_error(vt: &SessionVTable) -> Option<String> {
    let msg = take_string(vt, unsafe { (vt.last_error)() });
    (!msg.is_empty()).then_some(msg)
}

impl PluginBackend {
    /// Open `model_path` in an already loaded plugin.
    pub fn open(
        plugin: &'static LoadedPlugin,
        model_path: &Path,
        params: &ModelParams,
    ) -> Result<Self, String> {
        let vt = &plugin.api.session;
        let path = model_path
            .to_str()
            .ok_or_else(|| format!("model path {} is not UTF-8", model_path.display()))?;
        let params_json = serde_json::to_string(params).map_err(|e| e.to_string())?;
        let (c_path, c_params) = (c_string(path)?, c_string(&params_json)?);

        let session = unsafe { (vt.open)(c_path.as_ptr(), c_params.as_ptr()) };
        if session.is_null() {
            return Err(plugin_error(vt).unwrap_or_else(|| format!("plugin could not open {path}")));
        }

        let eos = Token(unsafe { (vt.eos)(session) });
        let ctx_len = usize::try_from(unsafe { (vt.ctx_len)(session) })
            .ok()
            .filter(|&n| n > 0);
        tracing::info!("[plugin] opened {path}: eos={} ctx={ctx_len:?}", eos.id());

        Ok(Self {
            plugin,
            session,
            eos,
            ctx_len,
        })
    }

    fn vt(&self) -> &'static SessionVTable {
        &self.plugin.api.session
    }

    fn failure(&self, call: &str) -> String {
        plugin_error(self.vt()).unwrap_or_else(|| format!("plugin `{call}` failed"))
    }
}

impl LLMBackend for PluginBackend {
    /// A plugin model needs a loaded library to open into.
    fn load<P: AsRef<Path>>(model_path: P, _params: &ModelParams) -> Result<Self, String> {
        Err(format!(
            "{} must be opened through PluginModelLoader",
            model_path.as_ref().display()
        ))
    }

    fn tokenize(&self, text: &str) -> Result<Vec<Token>, String> {
        let c_text = c_string(text)?;
        let buf = unsafe { (self.vt().tokenize)(self.session, c_text.as_ptr()) };
        if buf.data.is_null() {
            // An empty text legitimately yields no buffer.
            return match plugin_error(self.vt()) {
                Some(msg) => Err(msg),
                None => Ok(Vec::new()),
            };
        }
        let tokens = unsafe { slice::from_raw_parts(buf.data, buf.len) }
            .iter()
            .map(|&id| Token::from(id))
            .collect();
        unsafe { (self.vt().release_tokens)(buf) };
        Ok(tokens)
    }

    fn evaluate(&mut self, tokens: &[Token], n_past: i32) -> Result<(), String> {
        let ids = to_ids(tokens);
        let rc = unsafe { (self.vt().eval)(self.session, ids.as_ptr(), ids.len(), n_past) };
        if rc == STATUS_OK {
            Ok(())
        } else {
            Err(self.failure("eval"))
        }
    }

    fn sample(
        &mut self,
        _n_past: i32,
        params: &SamplingParams,
        _history: &[Token],
    ) -> Result<Token, String> {
        let json = serde_json::to_string(&params.normalized()).map_err(|e| e.to_string())?;
        let c_json = c_string(&json)?;
        match unsafe { (self.vt().sample)(self.session, c_json.as_ptr()) } {
            id if id >= 0 => Ok(Token(id)),
            _ => Err(self.failure("sample")),
        }
    }

    fn decode_token(&self, token: Token) -> Result<String, String> {
        let piece = take_string(self.vt(), unsafe {
            (self.vt().token_text)(self.session, token.id())
        });
        // Control tokens decode to nothing without being an error.
        match plugin_error(self.vt()) {
            Some(msg) if piece.is_empty() => Err(msg),
            _ => Ok(piece),
        }
    }

    fn eos_token(&self) -> Token {
        self.eos
    }

    fn context_window_hint(&self) -> Option<usize> {
        self.ctx_len
    }

    fn clear_kv_cache(&mut self) {
        unsafe { (self.vt().reset_kv)(self.session) };
    }

    fn last_sample_logprob(&self) -> Option<f32> {
        let mut lp = f32::NAN;
        let rc = unsafe { (self.vt().token_logprob)(self.session, &mut lp) };
        (rc == STATUS_OK && lp.is_finite()).then_some(lp)
    }

    fn detokenize_range(&self, history: &[Token], start: usize) -> Result<Vec<u8>, String> {
        let ids = to_ids(history.get(start..).unwrap_or_default());
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let text = take_string(self.vt(), unsafe {
            (self.vt().detokenize)(self.session, ids.as_ptr(), ids.len())
        });
        Ok(text.into_bytes())
    }
}
