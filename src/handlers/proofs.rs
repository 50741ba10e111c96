use crate::{
    error::ShieldError,
    handlers::AppState,
    models::{ExpenseProof, GaslessSubmission, ProofSubmission},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};

pub async fn submit_proof(
    State(state): State<AppState>,
    payload: Result<Json<ProofSubmission>, JsonRejection>,
) -> Result<Json<ExpenseProof>, ShieldError> {
    let Json(submission) = payload.map_err(|e| ShieldError::InvalidRequest(e.body_text()))?;
    if submission.tx_hash.is_empty() {
        return Err(ShieldError::InvalidRequest("tx_hash is required".to_string()));
    }
    require_user(&state, submission.user_id).await?;

    let proof = state
        .store
        .proofs
        .insert(ExpenseProof::from(submission))
        .await?;

    tracing::info!(
        "Proof {} submitted by user {} for {}",
        proof.id,
        proof.user_id,
        proof.tx_hash
    );

    state.analytics.record_proof();
    state.attestation.spawn_verification(proof.id);

    Ok(Json(proof))
}

/// Relays the proof with gas paid by the service and verifies it before
/// answering.
pub async fn submit_gasless(
    State(state): State<AppState>,
    payload: Result<Json<GaslessSubmission>, JsonRejection>,
) -> Result<Json<ExpenseProof>, ShieldError> {
    let Json(submission) = payload.map_err(|e| ShieldError::InvalidRequest(e.body_text()))?;
    require_user(&state, submission.user_id).await?;

    let proof = state.attestation.submit_gasless(&submission).await?;
    state.analytics.record_proof();

    Ok(Json(proof))
}

async fn require_user(state: &AppState, user_id: u64) -> Result<(), ShieldError> {
    match state.store.users.get(user_id).await? {
        Some(_) => Ok(()),
        None => Err(ShieldError::NotFound("User".to_string())),
    }
}

pub async fn get_proof_status(
    State(state): State<AppState>,
    Path(proof_id): Path<u64>,
) -> Result<Json<ExpenseProof>, ShieldError> {
    state
        .store
        .proofs
        .get(proof_id)
        .await?
        .map(Json)
        .ok_or_else(|| ShieldError::NotFound("Proof".to_string()))
}

pub async fn get_user_history(
    State(state): State<AppState>,
    Path(user_id): Path<u64>,
) -> Result<Json<Vec<ExpenseProof>>, ShieldError> {
    let proofs = state
        .store
        .proofs
        .list()
        .await?
        .into_iter()
        .filter(|proof| proof.user_id == user_id)
        .collect();
    Ok(Json(proofs))
}
