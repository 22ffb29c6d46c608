// src/routes.rs

use axum::{
    Router,
    http::{Method, header},
    middleware,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{
    handlers::{attempt, evaluation, proctor, rounds},
    state::AppState,
    utils::jwt::{auth_middleware, candidate_middleware, recruiter_middleware},
};

/// Assembles the main application router.
///
/// * Candidate routes: attempt entry, rounds, proctoring.
/// * Recruiter routes: evaluation criteria, session reports, verdicts.
/// * Global middleware (Trace, CORS) wraps everything.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().unwrap(),
        "http://127.0.0.1:3000".parse().unwrap(),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    let candidate_routes = Router::new()
        .route("/attempt/start", post(attempt::start_attempt))
        .route("/rounds/status", get(rounds::round_status))
        .route(
            "/rounds/{round}/answers/{question_id}",
            put(rounds::record_answer),
        )
        .route("/rounds/{round}/complete", post(rounds::complete_round))
        .route("/rounds/{round}/expire", post(rounds::expire_round))
        .route("/proctor/session/start", post(proctor::start_session))
        .route("/proctor/session/end", post(proctor::end_session))
        .route("/proctor/violations", post(proctor::log_violation))
        .route("/proctor/signal", post(proctor::signal))
        // Auth first, then role check
        .layer(middleware::from_fn(candidate_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    let recruiter_routes = Router::new()
        .route(
            "/evaluation-criteria",
            get(evaluation::get_criteria).put(evaluation::update_criteria),
        )
        .route(
            "/evaluation-criteria/reset",
            post(evaluation::reset_criteria),
        )
        .route(
            "/evaluation-criteria/adjust",
            post(evaluation::adjust_criteria),
        )
        .route(
            "/proctor/sessions/{session_id}",
            get(proctor::get_session),
        )
        .route(
            "/candidates/{id}/sessions",
            get(proctor::candidate_sessions),
        )
        .route("/candidates/{id}/verdict", post(evaluation::verdict))
        .layer(middleware::from_fn(recruiter_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .nest("/api", candidate_routes)
        .nest("/api/recruiter", recruiter_routes)
        // Global Middleware (outermost first)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
