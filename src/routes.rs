use crate::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/stats", get(get_stats))
        .route("/ws/terminal", get(terminal_socket))

        // Receipt verification
        .route("/api/verify", post(verify_receipt))
        .route("/api/receipts", get(list_receipts))
        .route("/api/receipts/:id", get(get_receipt))

        // Expense proofs
        .route("/api/users", post(create_user))
        .route("/api/submit-proof", post(submit_proof))
        .route("/api/submit-gasless", post(submit_gasless))
        .route("/api/status/:proof_id", get(get_proof_status))
        .route("/api/history/:user_id", get(get_user_history))

        // UPI / oracle pipeline
        .route("/api/verify-upi", post(verify_upi))
        .route("/api/analyze-text", post(analyze_text))
        .route("/api/upload-receipt", post(upload_receipt))

        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
}
