//! Scripted `InterviewBackend` for view tests. Records every request.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::InterviewBackend;
use crate::errors::AppError;
use crate::flows::copilot::CopilotRequest;
use crate::flows::optimizer::{OptimizedResume, ResumeOptimizationRequest};
use crate::flows::questions::{PracticeQuestionRequest, PracticeQuestions};
use crate::flows::screen::{ExtractedQuestion, ScreenshotRequest};
use crate::flows::speech::SpeechAudio;
use crate::relay::RelayEvent;

/// `Err(message)` becomes `AppError::ModelOutput(message)`, whose user message is
/// the message itself.
type Scripted<T> = Result<T, String>;

fn owned(reply: Result<&str, &str>) -> Scripted<String> {
    reply.map(String::from).map_err(String::from)
}

fn fail(message: &str) -> AppError {
    AppError::ModelOutput(message.to_string())
}

#[derive(Default)]
pub struct FakeBackend {
    answers: Mutex<VecDeque<Scripted<Vec<RelayEvent>>>>,
    questions: Mutex<Option<Scripted<Vec<String>>>>,
    extracted: Mutex<Option<Scripted<String>>>,
    optimized: Mutex<Option<Scripted<String>>>,
    speech: Mutex<Option<Scripted<String>>>,
    delay: Option<Duration>,

    pub copilot_requests: Mutex<Vec<CopilotRequest>>,
    pub practice_requests: Mutex<Vec<PracticeQuestionRequest>>,
    pub screenshot_requests: Mutex<Vec<ScreenshotRequest>>,
    pub optimize_requests: Mutex<Vec<ResumeOptimizationRequest>>,
    pub speech_requests: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues the events for the next answer stream. Unscripted streams answer "ok".
    pub fn answer(self, events: Vec<RelayEvent>) -> Self {
        self.answers.lock().push_back(Ok(events));
        self
    }

    pub fn answer_fragments(self, fragments: &[&str]) -> Self {
        self.answer(
            fragments
                .iter()
                .map(|f| RelayEvent::Fragment(f.to_string()))
                .collect(),
        )
    }

    /// The next `stream_answer` call fails before returning a stream.
    pub fn answer_error(self, message: &str) -> Self {
        self.answers.lock().push_back(Err(message.to_string()));
        self
    }

    /// Every reply, and every answer stream's first event, arrives after `delay`.
    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    async fn wait(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }

    pub fn questions(self, reply: Result<Vec<&str>, &str>) -> Self {
        *self.questions.lock() = Some(
            reply
                .map(|qs| qs.into_iter().map(String::from).collect())
                .map_err(String::from),
        );
        self
    }

    pub fn extracted(self, reply: Result<&str, &str>) -> Self {
        *self.extracted.lock() = Some(owned(reply));
        self
    }

    pub fn optimized(self, reply: Result<&str, &str>) -> Self {
        *self.optimized.lock() = Some(owned(reply));
        self
    }

    pub fn speech(self, reply: Result<&str, &str>) -> Self {
        *self.speech.lock() = Some(owned(reply));
        self
    }
}

#[async_trait]
impl InterviewBackend for FakeBackend {
    async fn stream_answer(
        &self,
        request: CopilotRequest,
    ) -> Result<mpsc::Receiver<RelayEvent>, AppError> {
        self.copilot_requests.lock().push(request);
        let events = self
            .answers
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(vec![RelayEvent::Fragment("ok".to_string())]))
            .map_err(|m| fail(&m))?;

        let (tx, rx) = mpsc::channel(events.len().max(1));
        match self.delay {
            None => {
                for event in events {
                    tx.try_send(event).unwrap();
                }
            }
            Some(delay) => {
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    for event in events {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                });
            }
        }
        Ok(rx)
    }

    async fn practice_questions(
        &self,
        request: PracticeQuestionRequest,
    ) -> Result<PracticeQuestions, AppError> {
        self.practice_requests.lock().push(request);
        self.wait().await;
        let reply = self
            .questions
            .lock()
            .clone()
            .unwrap_or_else(|| Ok(vec!["Tell me about yourself.".to_string()]));
        reply.map(|questions| PracticeQuestions { questions }).map_err(|m| fail(&m))
    }

    async fn extract_question(
        &self,
        request: ScreenshotRequest,
    ) -> Result<ExtractedQuestion, AppError> {
        self.screenshot_requests.lock().push(request);
        self.wait().await;
        let reply = self.extracted.lock().clone().unwrap_or_else(|| Ok(String::new()));
        reply.map(|question| ExtractedQuestion { question }).map_err(|m| fail(&m))
    }

    async fn optimize_resume(
        &self,
        request: ResumeOptimizationRequest,
    ) -> Result<OptimizedResume, AppError> {
        self.optimize_requests.lock().push(request);
        self.wait().await;
        let reply = self
            .optimized
            .lock()
            .clone()
            .unwrap_or_else(|| Ok("optimized".to_string()));
        reply
            .map(|optimized_resume| OptimizedResume { optimized_resume })
            .map_err(|m| fail(&m))
    }

    async fn synthesize_speech(&self, text: &str) -> Result<SpeechAudio, AppError> {
        self.speech_requests.lock().push(text.to_string());
        self.wait().await;
        let reply = self
            .speech
            .lock()
            .clone()
            .unwrap_or_else(|| Ok("data:audio/wav;base64,UklGRg==".to_string()));
        reply.map(|media| SpeechAudio { media }).map_err(|m| fail(&m))
    }
}
