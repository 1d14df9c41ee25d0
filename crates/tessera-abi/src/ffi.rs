//! C ABI between the host and a dynamically loaded backend plugin.
//!
//! A plugin exports [`ENTRY_SYMBOL`], which hands back a pointer to a static
//! [`PluginVTable`]. Every string or token buffer the plugin returns is owned by
//! the plugin and must go back through the matching `release_*` function.

use core::ffi::{c_char, c_void};

/// Checked by the host right after the entry point returns.
pub const ABI_VERSION: u32 = 1;

pub const ENTRY_SYMBOL: &str = "tessera_plugin_entry_v1";

pub const STATUS_OK: i32 = 0;
pub const STATUS_ERR: i32 = 1;

/// Plugin-owned UTF-8 bytes, not NUL terminated.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiString {
    pub data: *mut c_char,
    pub len: usize,
}

/// Plugin-owned token ids.
#[repr(C)]
#[derive(Clone, Copy)]
pub struct FfiTokenBuf {
    pub data: *mut i32,
    pub len: usize,
}

#[repr(C)]
pub struct PluginHeader {
    pub abi_version: u32,
    /// NUL-terminated backend name.
    pub name: *const c_char,
    /// NUL-terminated backend version.
    pub version: *const c_char,
}

/// Opaque per-model session handle.
pub type SessionPtr = *mut c_void;

/// `params_json` carries a serialized [`crate::backend::ModelParams`]. Null on failure.
pub type OpenFn =
    unsafe extern "C" fn(model_path: *const c_char, params_json: *const c_char) -> SessionPtr;
pub type CloseFn = unsafe extern "C" fn(session: SessionPtr);

pub type TokenizeFn = unsafe extern "C" fn(session: SessionPtr, text: *const c_char) -> FfiTokenBuf;
pub type ReleaseTokensFn = unsafe extern "C" fn(buf: FfiTokenBuf);

pub type EvalFn =
    unsafe extern "C" fn(session: SessionPtr, ids: *const i32, count: usize, n_past: i32) -> i32;

/// `sampling_json` carries a normalized [`crate::sampling::SamplingParams`].
/// Negative return values are errors.
pub type SampleFn = unsafe extern "C" fn(session: SessionPtr, sampling_json: *const c_char) -> i32;

/// `STATUS_OK` and `*out` set when the plugin kept logits for the last sample.
pub type TokenLogprobFn = unsafe extern "C" fn(session: SessionPtr, out: *mut f32) -> i32;

pub type TokenTextFn = unsafe extern "C" fn(session: SessionPtr, id: i32) -> FfiString;
pub type DetokenizeFn =
    unsafe extern "C" fn(session: SessionPtr, ids: *const i32, count: usize) -> FfiString;

pub type EosFn = unsafe extern "C" fn(session: SessionPtr) -> i32;
/// Context length of the session, or 0 when the plugin cannot tell.
pub type CtxLenFn = unsafe extern "C" fn(session: SessionPtr) -> i32;
pub type ResetKvFn = unsafe extern "C" fn(session: SessionPtr);

/// Thread-local message of the last failed call; empty when there is none.
pub type LastErrorFn = unsafe extern "C" fn() -> FfiString;
pub type ReleaseStringFn = unsafe extern "C" fn(s: FfiString);

#[repr(C)]
pub struct SessionVTable {
    pub open: OpenFn,
    pub close: CloseFn,
    pub tokenize: TokenizeFn,
    pub release_tokens: ReleaseTokensFn,
    pub eval: EvalFn,
    pub sample: SampleFn,
    pub token_logprob: TokenLogprobFn,
    pub token_text: TokenTextFn,
    pub detokenize: DetokenizeFn,
    pub eos: EosFn,
    pub ctx_len: CtxLenFn,
    pub reset_kv: ResetKvFn,
    pub last_error: LastErrorFn,
    pub release_string: ReleaseStringFn,
}

#[repr(C)]
pub struct PluginVTable {
    pub header: PluginHeader,
    pub session: SessionVTable,
}

pub type EntryFn = unsafe extern "C" fn() -> *const PluginVTable;
