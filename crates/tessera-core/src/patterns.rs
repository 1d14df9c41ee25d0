//! Pattern Store: a directory of YAML prompt-pattern documents, keyed by name.
//!
//! The store is rebuilt on every request so edits to a pattern file show up
//! immediately; nothing here is cached.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PatternError;

/// File extensions recognised as pattern documents.
pub const PATTERN_EXTS: &[&str] = &["yaml", "yml"];

/// One named prompt template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptPattern {
    pub name: String,
    /// Text with `<PROMPT>` / `<RESPONSE>` markers.
    pub template: String,
    /// Used whenever the request carries no stop strings of its own.
    pub default_stop_strings: Vec<String>,
}

/// On-disk shape. `pattern` is accepted as an alias for `template`.
#[derive(Deserialize)]
struct PatternDocument {
    name: Option<String>,
    #[serde(alias = "pattern")]
    template: Option<String>,
    #[serde(default)]
    stop_strings: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternStore {
    patterns: BTreeMap<String, PromptPattern>,
}

impl PatternStore {
    /// Parse every pattern document directly inside `dir` (non-recursive).
    ///
    /// Any unreadable or malformed document fails the whole discovery. A missing
    /// directory yields an empty store.
    pub fn discover<P: AsRef<Path>>(dir: P) -> Result<Self, PatternError> {
        let dir = dir.as_ref();
        let read_dir = match fs::read_dir(dir) {
            Ok(rd) => rd,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("[patterns] directory {} does not exist", dir.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(PatternError::Io {
                    path: dir.to_path_buf(),
                    source,
                });
            }
        };

        let mut files: Vec<PathBuf> = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|source| PatternError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && has_pattern_ext(&path) {
                files.push(path);
            }
        }
        files.sort();
        tracing::info!("[patterns] discovered pattern files: {:?}", files);

        let mut store = Self::default();
        for path in files {
            let pattern = parse_pattern_file(&path)?;
            store.insert(pattern)?;
        }
        Ok(store)
    }

    /// Build a store from already-parsed patterns.
    pub fn from_patterns<I>(patterns: I) -> Result<Self, PatternError>
    where
        I: IntoIterator<Item = PromptPattern>,
    {
        let mut store = Self::default();
        for p in patterns {
            store.insert(p)?;
        }
        Ok(store)
    }

    fn insert(&mut self, pattern: PromptPattern) -> Result<(), PatternError> {
        if self.patterns.contains_key(&pattern.name) {
            return Err(PatternError::DuplicateName { name: pattern.name });
        }
        self.patterns.insert(pattern.name.clone(), pattern);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&PromptPattern> {
        self.patterns.get(name)
    }

    /// Pattern names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.patterns.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PromptPattern> {
        self.patterns.values()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

fn has_pattern_ext(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| PATTERN_EXTS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

fn parse_pattern_file(path: &Path) -> Result<PromptPattern, PatternError> {
    let text = fs::read_to_string(path).map_err(|source| PatternError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: PatternDocument = serde_yaml::from_str(&text).map_err(|source| PatternError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let name = doc
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .ok_or_else(|| PatternError::MissingName {
            path: path.to_path_buf(),
        })?;

    let template = doc.template.ok_or_else(|| PatternError::MissingTemplate {
        path: path.to_path_buf(),
    })?;

    Ok(PromptPattern {
        name,
        template,
        default_stop_strings: doc.stop_strings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write(dir: &Path, file: &str, body: &str) {
        fs::write(dir.join(file), body).unwrap();
    }

    #[test]
    fn discovers_and_indexes_by_declared_name() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "a.yaml",
            "name: chat\ntemplate: \"<PROMPT><RESPONSE>\"\nstop_strings: [\"\\n\", \"User:\"]\n",
        );
        write(
            tmp.path(),
            "b.yml",
            "name: qa\npattern: \"Q: <PROMPT>\\nA: <RESPONSE>\"\nstop_strings: []\n",
        );
        write(tmp.path(), "notes.txt", "not a pattern");

        let store = PatternStore::discover(tmp.path()).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["chat", "qa"]);

        let chat = store.get("chat").unwrap();
        assert_eq!(chat.template, "<PROMPT><RESPONSE>");
        assert_eq!(chat.default_stop_strings, vec!["\n", "User:"]);
        assert_eq!(store.get("qa").unwrap().template, "Q: <PROMPT>\nA: <RESPONSE>");
    }

    #[test]
    fn does_not_descend_into_subdirectories() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("nested");
        fs::create_dir(&nested).unwrap();
        write(&nested, "deep.yaml", "name: deep\ntemplate: x\n");

        let store = PatternStore::discover(tmp.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn missing_name_fails_whole_discovery() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "good.yaml", "name: ok\ntemplate: x\n");
        write(tmp.path(), "bad.yaml", "template: x\nstop_strings: []\n");

        let err = PatternStore::discover(tmp.path()).unwrap_err();
        assert!(matches!(err, PatternError::MissingName { .. }), "{err}");
    }

    #[test]
    fn missing_template_is_malformed() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "chat.yaml", "name: chat\ntemplte: \"<PROMPT>\"\n");

        match PatternStore::discover(tmp.path()).unwrap_err() {
            PatternError::MissingTemplate { path } => assert!(path.ends_with("chat.yaml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_document_is_reported_with_its_path() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "broken.yaml", "name: [unclosed\n");

        match PatternStore::discover(tmp.path()).unwrap_err() {
            PatternError::Parse { path, .. } => assert!(path.ends_with("broken.yaml")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "one.yaml", "name: chat\ntemplate: a\n");
        write(tmp.path(), "two.yaml", "name: chat\ntemplate: b\n");

        let err = PatternStore::discover(tmp.path()).unwrap_err();
        assert!(matches!(err, PatternError::DuplicateName { ref name } if name == "chat"));
    }

    #[test]
    fn missing_directory_is_an_empty_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = PatternStore::discover(tmp.path().join("nope")).unwrap();
        assert!(store.is_empty());
    }
}
