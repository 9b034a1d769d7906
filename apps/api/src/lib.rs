//! InterviewAce: AI interview copilot service.
//!
//! The binary serves the HTTP API; the library also exposes the client-side
//! view-state machines (`client`) and the backends they drive.

pub mod audio;
pub mod client;
pub mod config;
pub mod data_uri;
pub mod errors;
pub mod flows;
pub mod llm_client;
pub mod relay;
pub mod resumes;
pub mod routes;
pub mod state;
pub mod validation;
