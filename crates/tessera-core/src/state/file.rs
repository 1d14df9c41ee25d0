use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use super::{SessionId, SessionState, SessionStore};
use crate::error::SessionStoreError;

/// One JSON document per session under a directory.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    dir: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &SessionId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self, id: &SessionId) -> Result<Option<SessionState>, SessionStoreError> {
        let bytes = match fs::read(self.path_for(id)) {
            Ok(b) => b,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    fn save(&self, id: &SessionId, state: &SessionState) -> Result<(), SessionStoreError> {
        fs::create_dir_all(&self.dir)?;
        let tmp = self.dir.join(format!("{id}.json.tmp"));
        fs::write(&tmp, serde_json::to_vec_pretty(state)?)?;
        fs::rename(&tmp, self.path_for(id))?;
        Ok(())
    }
}
