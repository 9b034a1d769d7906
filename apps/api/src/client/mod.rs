//! Client-side view-state machines.
//!
//! Each view owns its own state and notification queue, is driven through
//! `&mut self`, and reaches the flows only through an `InterviewBackend`:
//! `LocalBackend` calls the flow dispatchers in-process, `HttpBackend` calls the
//! HTTP API. Device access (microphone, screen, speakers) is injected as ports.

pub mod copilot;
pub mod http;
pub mod local;
pub mod optimizer;
pub mod playback;
pub mod practice;
pub mod screen;
pub mod voice;

#[cfg(test)]
pub mod fake;

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::errors::AppError;
use crate::flows::copilot::CopilotRequest;
use crate::flows::optimizer::{OptimizedResume, ResumeOptimizationRequest};
use crate::flows::questions::{PracticeQuestionRequest, PracticeQuestions};
use crate::flows::screen::{ExtractedQuestion, ScreenshotRequest};
use crate::flows::speech::SpeechAudio;
use crate::relay::RelayEvent;

pub use crate::flows::copilot::Role;
pub use copilot::{CopilotPhase, CopilotSession, TurnOutcome};
pub use http::HttpBackend;
pub use local::LocalBackend;
pub use optimizer::ResumeOptimizerView;
pub use playback::{AudioPlayer, PlaybackController};
pub use practice::PracticeQuestionsView;
pub use screen::{ScreenAnalysis, ScreenAnalyzer, ScreenCapture};
pub use voice::{CaptureEvent, ContinuousListener, SilenceTimer, SpeechCapture, VoiceCopilot};

/// One entry in the copilot conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationMessage {
    pub id: u64,
    pub role: Role,
    pub content: String,
    /// Synthesized speech for this message, cached after the first playback.
    pub audio_url: Option<String>,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub destructive: bool,
}

impl Notification {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            destructive: false,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            destructive: true,
        }
    }
}

/// Failures reported by a capture device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Capture is not supported on this device")]
    NotSupported,

    /// The user declined the permission prompt. Treated as a cancellation.
    #[error("Capture permission was denied")]
    PermissionDenied,

    #[error("Capture failed: {0}")]
    Failed(String),
}

/// A view's busy marker.
///
/// `enter` returns a guard that puts the idle value back when dropped, so a
/// request future that is abandoned mid-await still leaves the view idle.
#[derive(Debug)]
pub(crate) struct BusyState<T: Copy> {
    current: Arc<Mutex<T>>,
    idle: T,
}

impl<T: Copy + PartialEq> BusyState<T> {
    pub(crate) fn new(idle: T) -> Self {
        Self {
            current: Arc::new(Mutex::new(idle)),
            idle,
        }
    }

    pub(crate) fn get(&self) -> T {
        *self.current.lock()
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.get() == self.idle
    }

    pub(crate) fn set(&self, value: T) {
        *self.current.lock() = value;
    }

    pub(crate) fn enter(&self, value: T) -> BusyGuard<T> {
        self.set(value);
        BusyGuard {
            current: self.current.clone(),
            idle: self.idle,
        }
    }
}

pub(crate) struct BusyGuard<T: Copy> {
    current: Arc<Mutex<T>>,
    idle: T,
}

impl<T: Copy> Drop for BusyGuard<T> {
    fn drop(&mut self) {
        *self.current.lock() = self.idle;
    }
}

/// The flows as seen from a client view.
#[async_trait]
pub trait InterviewBackend: Send + Sync {
    /// Starts an answer stream. Errors returned here happen before any fragment.
    async fn stream_answer(
        &self,
        request: CopilotRequest,
    ) -> Result<mpsc::Receiver<RelayEvent>, AppError>;

    async fn practice_questions(
        &self,
        request: PracticeQuestionRequest,
    ) -> Result<PracticeQuestions, AppError>;

    async fn extract_question(
        &self,
        request: ScreenshotRequest,
    ) -> Result<ExtractedQuestion, AppError>;

    async fn optimize_resume(
        &self,
        request: ResumeOptimizationRequest,
    ) -> Result<OptimizedResume, AppError>;

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio, AppError>;
}
