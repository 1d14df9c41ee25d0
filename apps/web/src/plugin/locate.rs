use std::path::{Path, PathBuf};

/// Plugin file name inside `<runtime dir>/current/`.
#[cfg(target_os = "windows")]
pub const PLUGIN_BASENAME: &str = "TesseraLlama.dll";
#[cfg(target_os = "macos")]
pub const PLUGIN_BASENAME: &str = "libTesseraLlama.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
pub const PLUGIN_BASENAME: &str = "libTesseraLlama.so";

/// Explicit path wins when it exists; otherwise the active runtime's library.
pub(crate) fn locate_plugin_binary(explicit: Option<&Path>, runtime_dir: &Path) -> Option<PathBuf> {
    if let Some(p) = explicit {
        if p.exists() {
            tracing::info!("[plugin] explicit plugin = {}", p.display());
            return Some(p.to_path_buf());
        }
        tracing::warn!("[plugin] explicit plugin points to missing file: {}", p.display());
    }

    let p = runtime_dir.join("current").join(PLUGIN_BASENAME);
    if p.exists() {
        tracing::info!("[plugin] from runtime dir: {}", p.display());
        return Some(p);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn explicit_path_wins() {
        let dir = tempfile::tempdir().unwrap();
        let explicit = dir.path().join("custom.so");
        fs::write(&explicit, b"").unwrap();
        fs::create_dir_all(dir.path().join("current")).unwrap();
        fs::write(dir.path().join("current").join(PLUGIN_BASENAME), b"").unwrap();

        assert_eq!(
            locate_plugin_binary(Some(&explicit), dir.path()),
            Some(explicit)
        );
    }

    #[test]
    fn missing_explicit_falls_back_to_runtime_dir() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("current")).unwrap();
        let active = dir.path().join("current").join(PLUGIN_BASENAME);
        fs::write(&active, b"").unwrap();

        let missing = dir.path().join("nope.so");
        assert_eq!(locate_plugin_binary(Some(&missing), dir.path()), Some(active));
    }

    #[test]
    fn nothing_installed() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(locate_plugin_binary(None, dir.path()), None);
    }
}
