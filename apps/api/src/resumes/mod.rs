//! Resume library: the saved resumes and the current selection.
//!
//! All reads and writes of persisted resume data go through `ResumeRepository`.
//! `ResumeLibrary` holds the in-memory copy and rewrites the repository on
//! every mutation. A mutation whose write fails leaves the library unchanged.

pub mod handlers;
pub mod store;

use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use crate::errors::AppError;
use crate::validation::validate_new_resume;

pub use store::{JsonFileRepository, MemoryRepository};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resume {
    pub id: String,
    pub name: String,
    pub content: String,
}

/// Key-value persistence for the resume list and the selected id.
pub trait ResumeRepository: Send {
    fn load_resumes(&self) -> Result<Vec<Resume>, AppError>;
    fn save_resumes(&self, resumes: &[Resume]) -> Result<(), AppError>;
    fn load_selection(&self) -> Result<Option<String>, AppError>;
    /// `None` clears the stored selection.
    fn save_selection(&self, id: Option<&str>) -> Result<(), AppError>;
}

pub struct ResumeLibrary {
    repo: Box<dyn ResumeRepository>,
    resumes: Vec<Resume>,
    selected_id: Option<String>,
}

impl ResumeLibrary {
    /// Reads the repository. A stored selection that no longer exists falls back
    /// to the first resume.
    pub fn load(repo: Box<dyn ResumeRepository>) -> Result<Self, AppError> {
        let resumes = repo.load_resumes()?;
        let stored = repo.load_selection()?;
        let selected_id = match stored {
            Some(id) if resumes.iter().any(|r| r.id == id) => Some(id),
            _ => resumes.first().map(|r| r.id.clone()),
        };
        info!(count = resumes.len(), "Resume library loaded");
        Ok(Self {
            repo,
            resumes,
            selected_id,
        })
    }

    pub fn resumes(&self) -> &[Resume] {
        &self.resumes
    }

    pub fn selected_id(&self) -> Option<&str> {
        self.selected_id.as_deref()
    }

    pub fn selected(&self) -> Option<&Resume> {
        let id = self.selected_id.as_deref()?;
        self.resumes.iter().find(|r| r.id == id)
    }

    /// Content of the selected resume, or an empty string.
    pub fn selected_content(&self) -> String {
        self.selected().map(|r| r.content.clone()).unwrap_or_default()
    }

    /// Adds a resume and makes it the selection.
    pub fn add(&mut self, name: &str, content: &str) -> Result<Resume, AppError> {
        validate_new_resume(name, content)?;
        let resume = Resume {
            id: format!("resume-{}", Uuid::new_v4()),
            name: name.trim().to_string(),
            content: content.trim().to_string(),
        };
        let mut resumes = self.resumes.clone();
        resumes.push(resume.clone());
        self.commit(resumes, Some(resume.id.clone()))?;
        info!(id = %resume.id, name = %resume.name, "Resume added");
        Ok(resume)
    }

    /// Deletes a resume. Deleting the selection moves it to the first remaining resume.
    pub fn delete(&mut self, id: &str) -> Result<(), AppError> {
        if !self.resumes.iter().any(|r| r.id == id) {
            return Err(AppError::NotFound(format!("Resume {id} not found")));
        }
        let resumes: Vec<Resume> = self.resumes.iter().filter(|r| r.id != id).cloned().collect();
        let selected_id = if self.selected_id.as_deref() == Some(id) {
            resumes.first().map(|r| r.id.clone())
        } else {
            self.selected_id.clone()
        };
        self.commit(resumes, selected_id)?;
        info!(id, "Resume deleted");
        Ok(())
    }

    pub fn select(&mut self, id: &str) -> Result<(), AppError> {
        if !self.resumes.iter().any(|r| r.id == id) {
            return Err(AppError::NotFound(format!("Resume {id} not found")));
        }
        let resumes = self.resumes.clone();
        self.commit(resumes, Some(id.to_string()))
    }

    /// Writes the new state and adopts it only once both writes succeed. On
    /// failure the library is unchanged and the previous list is written back.
    fn commit(&mut self, resumes: Vec<Resume>, selected_id: Option<String>) -> Result<(), AppError> {
        let saved = self
            .repo
            .save_resumes(&resumes)
            .and_then(|_| self.repo.save_selection(selected_id.as_deref()));
        if let Err(e) = saved {
            error!("Failed to save resumes: {e}");
            if let Err(restore) = self.repo.save_resumes(&self.resumes) {
                error!("Failed to restore saved resumes: {restore}");
            }
            return Err(e);
        }
        self.resumes = resumes;
        self.selected_id = selected_id;
        Ok(())
    }
}
