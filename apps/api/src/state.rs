use std::sync::Arc;

use parking_lot::Mutex;

use crate::llm_client::GenerativeModel;
use crate::resumes::ResumeLibrary;
use crate::validation::Limits;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Hosted model backend. `GeminiClient` in production.
    pub model: Arc<dyn GenerativeModel>,
    pub limits: Limits,
    /// Saved resumes and the current selection. Every mutation rewrites the repository.
    pub resumes: Arc<Mutex<ResumeLibrary>>,
}

impl AppState {
    pub fn new(model: Arc<dyn GenerativeModel>, limits: Limits, resumes: ResumeLibrary) -> Self {
        Self {
            model,
            limits,
            resumes: Arc::new(Mutex::new(resumes)),
        }
    }
}
