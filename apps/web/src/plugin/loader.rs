use libloading::Library;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tessera_abi::backend::ModelParams;
use tessera_abi::ffi::{ABI_VERSION, ENTRY_SYMBOL, EntryFn, PluginVTable};
use tessera_core::engine::CompletionEngine;
use tessera_core::model::{LanguageModel, LiveModel, ModelLoader};
use tessera_core::ModelLoadError;

use super::backend::PluginBackend;
use super::locate::locate_plugin_binary;
use crate::config::Config;

pub struct LoadedPlugin {
    _lib: Library,
    pub(crate) api: &'static PluginVTable,
}

// SAFETY: the vtable is immutable static data inside the library, which stays loaded for the process.
unsafe impl Send for LoadedPlugin {}
unsafe impl Sync for LoadedPlugin {}

/// Successfully loaded plugins by path. Libraries are never unloaded.
static PLUGINS: Lazy<Mutex<HashMap<PathBuf, &'static LoadedPlugin>>> =
    Lazy::new(|| Mutex::new(HashMap::new()));

/// Load the plugin at `path` unless it is already loaded.
///
/// Failures are not remembered: a fixed or different path is tried again.
pub fn load_plugin_once(path: &Path) -> Result<&'static LoadedPlugin, String> {
    let mut loaded = PLUGINS.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(&plugin) = loaded.get(path) {
        return Ok(plugin);
    }

    tracing::info!("[plugin] loading {}", path.display());
    // SAFETY: loading a library runs its initializers; the plugin is trusted local code.
    let lib = unsafe { Library::new(path) }
        .map_err(|e| format!("failed to load plugin {}: {e}", path.display()))?;
    let plugin: &'static LoadedPlugin = Box::leak(Box::new(init_loaded(lib)?));
    loaded.insert(path.to_path_buf(), plugin);
    Ok(plugin)
}

fn init_loaded(lib: Library) -> Result<LoadedPlugin, String> {
    // SAFETY: the symbol type is fixed by the plugin ABI.
    let entry: libloading::Symbol<EntryFn> = unsafe { lib.get(ENTRY_SYMBOL.as_bytes()) }
        .map_err(|e| format!("plugin does not export {ENTRY_SYMBOL}: {e}"))?;

    let vtable = unsafe { entry() };
    // SAFETY: a non-null vtable is static data that lives as long as `lib`.
    let api = unsafe { vtable.as_ref() }.ok_or("plugin entry returned no vtable")?;
    let found = api.header.abi_version;
    if found != ABI_VERSION {
        return Err(format!("plugin ABI v{found}, host expects v{ABI_VERSION}"));
    }
    drop(entry);

    Ok(LoadedPlugin { _lib: lib, api })
}

/// Builds live models on top of the backend plugin.
#[derive(Debug, Clone)]
pub struct PluginModelLoader {
    plugin_path: Option<PathBuf>,
    runtime_dir: PathBuf,
    decode_cap: Option<usize>,
}

impl PluginModelLoader {
    pub fn new(plugin_path: Option<PathBuf>, runtime_dir: PathBuf, decode_cap: Option<usize>) -> Self {
        Self {
            plugin_path,
            runtime_dir,
            decode_cap,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.plugin_path.clone(),
            config.runtime_dir.clone(),
            config.max_decode_tokens,
        )
    }
}

impl ModelLoader for PluginModelLoader {
    fn load(
        &self,
        model_path: &str,
        params: &ModelParams,
    ) -> Result<Box<dyn LanguageModel>, ModelLoadError> {
        let path = Path::new(model_path);
        if !path.is_file() {
            return Err(ModelLoadError::InvalidPath(model_path.to_string()));
        }

        let located = locate_plugin_binary(self.plugin_path.as_deref(), &self.runtime_dir)
            .ok_or_else(|| {
                ModelLoadError::Plugin(format!(
                    "no backend plugin found (runtime dir {})",
                    self.runtime_dir.display()
                ))
            })?;
        let plugin = load_plugin_once(&located).map_err(ModelLoadError::Plugin)?;
        let backend = PluginBackend::open(plugin, path, params).map_err(ModelLoadError::Backend)?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| model_path.to_string());
        let engine = CompletionEngine::new(backend, name).with_decode_cap(self.decode_cap);
        Ok(Box::new(LiveModel::new(engine)))
    }
}
