pub mod backend;
pub mod loader;
pub mod locate;

pub use backend::PluginBackend;
pub use loader::{PluginModelLoader, load_plugin_once};
