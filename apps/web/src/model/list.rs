use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

/// One selectable model file in the library.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ModelEntry {
    /// Path relative to the library root, `/`-separated.
    pub id: String,
    pub name: String,
    pub path: PathBuf,
    /// Name of the directory holding the file.
    pub family: String,
    pub file_type: String,
}

pub const ALLOWED_MODEL_EXTS: &[&str] = &["gguf", "bin", "safetensors", "onnx"];

impl ModelEntry {
    /// `None` unless `path` has one of [`ALLOWED_MODEL_EXTS`] (any case).
    fn probe(root: &Path, path: PathBuf) -> Option<Self> {
        let file_type = path.extension()?.to_str()?.to_ascii_lowercase();
        if !ALLOWED_MODEL_EXTS.contains(&file_type.as_str()) {
            return None;
        }

        let lossy = |s: Option<&std::ffi::OsStr>| {
            s.map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "unknown".to_string())
        };
        let name = lossy(path.file_stem());
        let family = lossy(path.parent().and_then(Path::file_name));
        let id = path
            .strip_prefix(root)
            .ok()
            .map(|rel| {
                rel.iter()
                    .map(|part| part.to_string_lossy())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| name.clone());

        Some(Self {
            id,
            name,
            path,
            family,
            file_type,
        })
    }

    fn sort_key(&self) -> (String, String) {
        (self.family.to_lowercase(), self.name.to_lowercase())
    }
}

/// Every model file under `root`, sorted by (family, name) ignoring case.
/// A missing root is an empty library; unreadable directories are skipped.
pub fn list_available_models(root: &Path) -> Vec<ModelEntry> {
    if !root.is_dir() {
        tracing::debug!("[models] library root {} does not exist", root.display());
        return Vec::new();
    }
    let root = fs::canonicalize(root).unwrap_or_else(|_| root.to_path_buf());

    let mut found = Vec::new();
    let mut seen = HashSet::new();
    let mut pending = vec![root.clone()];
    while let Some(dir) = pending.pop() {
        // Symlinked directories can loop back.
        let canonical = fs::canonicalize(&dir).unwrap_or_else(|_| dir.clone());
        if !seen.insert(canonical) {
            continue;
        }
        let listing = match fs::read_dir(&dir) {
            Ok(listing) => listing,
            Err(e) => {
                tracing::warn!("[models] skipping {}: {e}", dir.display());
                continue;
            }
        };
        for path in listing.flatten().map(|e| e.path()) {
            if path.is_dir() {
                pending.push(path);
            } else if path.is_file() {
                found.extend(ModelEntry::probe(&root, path));
            }
        }
    }

    found.sort_by_cached_key(ModelEntry::sort_key);
    tracing::debug!("[models] {} model file(s) under {}", found.len(), root.display());
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_root_is_empty() {
        assert!(list_available_models(Path::new("/no/such/library")).is_empty());
    }

    #[test]
    fn walks_recursively_and_sorts_by_family_then_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("mistral")).unwrap();
        fs::create_dir_all(root.join("Llama/q4")).unwrap();
        fs::write(root.join("mistral/7b.gguf"), b"").unwrap();
        fs::write(root.join("Llama/q4/b-model.GGUF"), b"").unwrap();
        fs::write(root.join("Llama/q4/a-model.bin"), b"").unwrap();
        fs::write(root.join("Llama/q4/notes.txt"), b"").unwrap();

        let models = list_available_models(root);
        let ids: Vec<&str> = models.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(
            ids,
            vec!["mistral/7b.gguf", "Llama/q4/a-model.bin", "Llama/q4/b-model.GGUF"]
        );
        assert_eq!(models[1].family, "q4");
        assert_eq!(models[2].file_type, "gguf");
        assert!(models.iter().all(|m| m.path.is_absolute()));
    }
}
