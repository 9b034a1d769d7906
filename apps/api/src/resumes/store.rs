use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{Resume, ResumeRepository};
use crate::errors::AppError;

/// Storage key for the serialized resume list.
pub const RESUMES_KEY: &str = "interviewace-resumes";
/// Storage key for the selected resume id.
pub const SELECTED_KEY: &str = "interviewace-selected-resume-id";

/// One file per key inside a data directory.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    dir: PathBuf,
}

impl JsonFileRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn resumes_path(&self) -> PathBuf {
        self.dir.join(format!("{RESUMES_KEY}.json"))
    }

    fn selection_path(&self) -> PathBuf {
        self.dir.join(SELECTED_KEY)
    }

    /// Reads a file, treating a missing file as `None`.
    fn read(path: &Path) -> Result<Option<String>, AppError> {
        match fs::read_to_string(path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Storage(format!(
                "Could not read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Writes through a temp file and rename so readers never see a partial file.
    fn write(&self, path: &Path, contents: &str) -> Result<(), AppError> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            AppError::Storage(format!("Could not create {}: {e}", self.dir.display()))
        })?;
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, contents)
            .and_then(|_| fs::rename(&tmp, path))
            .map_err(|e| AppError::Storage(format!("Could not write {}: {e}", path.display())))
    }
}

impl ResumeRepository for JsonFileRepository {
    fn load_resumes(&self) -> Result<Vec<Resume>, AppError> {
        match Self::read(&self.resumes_path())? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                AppError::Storage(format!("Could not load your saved resumes: {e}"))
            }),
            None => Ok(Vec::new()),
        }
    }

    fn save_resumes(&self, resumes: &[Resume]) -> Result<(), AppError> {
        let raw = serde_json::to_string(resumes)
            .map_err(|e| AppError::Storage(format!("Could not serialize resumes: {e}")))?;
        self.write(&self.resumes_path(), &raw)?;
        debug!(count = resumes.len(), "Saved resumes");
        Ok(())
    }

    fn load_selection(&self) -> Result<Option<String>, AppError> {
        Ok(Self::read(&self.selection_path())?
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty()))
    }

    fn save_selection(&self, id: Option<&str>) -> Result<(), AppError> {
        let path = self.selection_path();
        match id {
            Some(id) => self.write(&path, id),
            None => match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
                Err(e) => Err(AppError::Storage(format!(
                    "Could not clear {}: {e}",
                    path.display()
                ))),
            },
        }
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    resumes: Vec<Resume>,
    selection: Option<String>,
}

/// In-process repository. Clones share the same state.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl ResumeRepository for MemoryRepository {
    fn load_resumes(&self) -> Result<Vec<Resume>, AppError> {
        Ok(self.state.lock().resumes.clone())
    }

    fn save_resumes(&self, resumes: &[Resume]) -> Result<(), AppError> {
        self.state.lock().resumes = resumes.to_vec();
        Ok(())
    }

    fn load_selection(&self) -> Result<Option<String>, AppError> {
        Ok(self.state.lock().selection.clone())
    }

    fn save_selection(&self, id: Option<&str>) -> Result<(), AppError> {
        self.state.lock().selection = id.map(String::from);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resume(id: &str) -> Resume {
        Resume {
            id: id.to_string(),
            name: format!("name {id}"),
            content: format!("content {id}"),
        }
    }

    #[test]
    fn test_missing_files_load_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path().join("nested"));
        assert!(repo.load_resumes().unwrap().is_empty());
        assert_eq!(repo.load_selection().unwrap(), None);
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path());
        repo.save_resumes(&[resume("resume-1"), resume("resume-2")])
            .unwrap();
        repo.save_selection(Some("resume-2")).unwrap();

        let reopened = JsonFileRepository::new(dir.path());
        let loaded = reopened.load_resumes().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[1], resume("resume-2"));
        assert_eq!(reopened.load_selection().unwrap().as_deref(), Some("resume-2"));
    }

    #[test]
    fn test_clearing_selection_removes_file() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path());
        repo.save_selection(Some("resume-1")).unwrap();
        repo.save_selection(None).unwrap();
        assert_eq!(repo.load_selection().unwrap(), None);
        // clearing twice is fine
        repo.save_selection(None).unwrap();
    }

    #[test]
    fn test_corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("interviewace-resumes.json"), "{not json").unwrap();
        let repo = JsonFileRepository::new(dir.path());
        assert!(matches!(repo.load_resumes(), Err(AppError::Storage(_))));
    }

    #[test]
    fn test_persisted_format_is_plain_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let repo = JsonFileRepository::new(dir.path());
        repo.save_resumes(&[resume("resume-1")]).unwrap();
        let raw = fs::read_to_string(dir.path().join("interviewace-resumes.json")).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["id"], "resume-1");
        assert_eq!(value[0]["content"], "content resume-1");
    }
}
