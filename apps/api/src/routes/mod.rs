pub mod health;

use axum::{
    routing::{delete, get, post, put},
    Router,
};

use crate::flows::handlers as flows;
use crate::resumes::handlers as resumes;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Flows
        .route("/api/v1/copilot/answer", post(flows::handle_copilot_answer))
        .route(
            "/api/v1/questions/practice",
            post(flows::handle_practice_questions),
        )
        .route(
            "/api/v1/questions/extract",
            post(flows::handle_extract_question),
        )
        .route(
            "/api/v1/resumes/optimize",
            post(flows::handle_optimize_resume),
        )
        .route("/api/v1/speech", post(flows::handle_speech))
        // Resume library
        .route(
            "/api/v1/resumes",
            get(resumes::handle_list_resumes).post(resumes::handle_add_resume),
        )
        .route(
            "/api/v1/resumes/selection",
            put(resumes::handle_select_resume),
        )
        .route("/api/v1/resumes/:id", delete(resumes::handle_delete_resume))
        .with_state(state)
}
