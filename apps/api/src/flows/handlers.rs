use std::convert::Infallible;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::Stream;
use serde_json::json;

use crate::errors::AppError;
use crate::flows::copilot::{stream_answer, CopilotRequest};
use crate::flows::optimizer::{optimize_resume, OptimizedResume, ResumeOptimizationRequest};
use crate::flows::questions::{
    generate_practice_questions, PracticeQuestionRequest, PracticeQuestions,
};
use crate::flows::screen::{extract_question, ExtractedQuestion, ScreenshotRequest};
use crate::flows::speech::{synthesize_speech, SpeechAudio, SpeechRequest};
use crate::relay::RelayEvent;
use crate::state::AppState;

/// SSE event carrying one answer fragment as `{"text"}`.
pub const CHUNK_EVENT: &str = "chunk";
/// SSE event carrying `{"message"}`. Terminal.
pub const ERROR_EVENT: &str = "error";
/// SSE event sent once after the last chunk of a successful answer.
pub const DONE_EVENT: &str = "done";

/// POST /api/v1/copilot/answer
///
/// Validation failures are plain 400 responses. Once the stream is open, failures
/// arrive as an `error` event and no `done` follows.
pub async fn handle_copilot_answer(
    State(state): State<AppState>,
    Json(req): Json<CopilotRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let mut rx = stream_answer(state.model.clone(), req, &state.limits)?;

    let events = async_stream::stream! {
        while let Some(event) = rx.recv().await {
            match event {
                RelayEvent::Fragment(text) => {
                    yield Ok::<Event, Infallible>(Event::default()
                        .event(CHUNK_EVENT)
                        .data(json!({ "text": text }).to_string()));
                }
                RelayEvent::Failed(message) => {
                    yield Ok(Event::default()
                        .event(ERROR_EVENT)
                        .data(json!({ "message": message }).to_string()));
                    return;
                }
            }
        }
        yield Ok(Event::default().event(DONE_EVENT).data("{}"));
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()))
}

/// POST /api/v1/questions/practice
pub async fn handle_practice_questions(
    State(state): State<AppState>,
    Json(req): Json<PracticeQuestionRequest>,
) -> Result<Json<PracticeQuestions>, AppError> {
    let questions = generate_practice_questions(state.model.as_ref(), req, &state.limits).await?;
    Ok(Json(questions))
}

/// POST /api/v1/questions/extract
pub async fn handle_extract_question(
    State(state): State<AppState>,
    Json(req): Json<ScreenshotRequest>,
) -> Result<Json<ExtractedQuestion>, AppError> {
    let extracted = extract_question(state.model.as_ref(), req, &state.limits).await?;
    Ok(Json(extracted))
}

/// POST /api/v1/resumes/optimize
pub async fn handle_optimize_resume(
    State(state): State<AppState>,
    Json(req): Json<ResumeOptimizationRequest>,
) -> Result<Json<OptimizedResume>, AppError> {
    let optimized = optimize_resume(state.model.as_ref(), req, &state.limits).await?;
    Ok(Json(optimized))
}

/// POST /api/v1/speech
pub async fn handle_speech(
    State(state): State<AppState>,
    Json(req): Json<SpeechRequest>,
) -> Result<Json<SpeechAudio>, AppError> {
    let audio = synthesize_speech(state.model.as_ref(), &req.text).await?;
    Ok(Json(audio))
}
