//! Screen analyzer: capture a frame, find the question on it, answer it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use super::{BusyState, CaptureError, InterviewBackend, Notification};
use crate::flows::copilot::CopilotRequest;
use crate::flows::screen::ScreenshotRequest;
use crate::relay::RelayEvent;

/// Screen capture port. Returns a single frame as an image data URI.
#[async_trait]
pub trait ScreenCapture: Send {
    async fn capture_frame(&mut self) -> Result<String, CaptureError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScreenAnalysis {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerPhase {
    Idle,
    Capturing,
    Extracting,
    Answering,
}

pub struct ScreenAnalyzer {
    backend: Arc<dyn InterviewBackend>,
    capture: Box<dyn ScreenCapture>,
    phase: BusyState<AnalyzerPhase>,
    result: Option<ScreenAnalysis>,
    notifications: Vec<Notification>,
}

impl ScreenAnalyzer {
    pub fn new(backend: Arc<dyn InterviewBackend>, capture: Box<dyn ScreenCapture>) -> Self {
        Self {
            backend,
            capture,
            phase: BusyState::new(AnalyzerPhase::Idle),
            result: None,
            notifications: Vec::new(),
        }
    }

    pub fn phase(&self) -> AnalyzerPhase {
        self.phase.get()
    }

    pub fn result(&self) -> Option<&ScreenAnalysis> {
        self.result.as_ref()
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    /// Runs one capture-extract-answer pass. Returns whether an answer was produced.
    pub async fn analyze(&mut self, resume: Option<&str>) -> bool {
        let _busy = self.phase.enter(AnalyzerPhase::Capturing);
        self.run(resume).await
    }

    async fn run(&mut self, resume: Option<&str>) -> bool {
        self.result = None;
        let frame = match self.capture.capture_frame().await {
            Ok(frame) => frame,
            Err(CaptureError::PermissionDenied) => {
                debug!("Screen capture cancelled by user");
                return false;
            }
            Err(CaptureError::NotSupported) => {
                self.notifications.push(Notification::error(
                    "Screen Capture Not Supported",
                    "Your browser does not support screen capture, or you may be on an insecure (non-HTTPS) connection.",
                ));
                return false;
            }
            Err(CaptureError::Failed(e)) => {
                warn!("Screen capture failed: {e}");
                self.analysis_failed();
                return false;
            }
        };

        self.phase.set(AnalyzerPhase::Extracting);
        let extracted = match self
            .backend
            .extract_question(ScreenshotRequest {
                photo_data_uri: frame,
            })
            .await
        {
            Ok(extracted) => extracted,
            Err(e) => {
                warn!("Question extraction failed: {e}");
                self.analysis_failed();
                return false;
            }
        };

        if !extracted.is_found() {
            self.notifications.push(Notification::info(
                "No Question Found",
                "We couldn't find a question on the screen. Please try again.",
            ));
            return false;
        }

        info!("Question found on screen");
        self.phase.set(AnalyzerPhase::Answering);
        self.result = Some(ScreenAnalysis {
            question: extracted.question.clone(),
            answer: String::new(),
        });

        let request = CopilotRequest {
            question: extracted.question,
            resume: resume.map(String::from),
            history: None,
        };
        let mut rx = match self.backend.stream_answer(request).await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Answer request failed: {e}");
                self.analysis_failed();
                return false;
            }
        };

        while let Some(event) = rx.recv().await {
            match event {
                RelayEvent::Fragment(text) => {
                    if let Some(result) = self.result.as_mut() {
                        result.answer.push_str(&text);
                    }
                }
                RelayEvent::Failed(message) => {
                    self.notifications
                        .push(Notification::error("Streaming Error", message));
                    return false;
                }
            }
        }
        true
    }

    fn analysis_failed(&mut self) {
        self.notifications.push(Notification::error(
            "Analysis Failed",
            "An error occurred while capturing the screen. Please try again.",
        ));
    }
}
