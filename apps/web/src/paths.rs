use dirs::data_dir;
use std::path::PathBuf;

/// ~/.local/share/Tessera   (or platform-equivalent)
pub fn default_home() -> PathBuf {
    data_dir()
        .unwrap_or_else(|| PathBuf::from(".tessera"))
        .join("Tessera")
}
