use crate::{
    error::ShieldError,
    handlers::AppState,
    models::{AnalyzeTextRequest, ExpenseProof, VerifyUpiRequest, VerifyUpiResponse},
    ocr::{extract_upi_id, UpiExtraction},
};
use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

/// Sentinel tx hash stored when no attestation proof was produced.
const FAILED_PROOF_HASH: &str = "0xFAILED";

/// Validates a VPA with the gateway, then requests an FDC attestation.
pub async fn verify_upi(
    State(state): State<AppState>,
    payload: Result<Json<VerifyUpiRequest>, JsonRejection>,
) -> Result<Json<VerifyUpiResponse>, ShieldError> {
    let Json(request) = payload.map_err(|e| ShieldError::InvalidRequest(e.body_text()))?;
    let upi_id = request
        .upi_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ShieldError::InvalidRequest("UPI ID is required".to_string()))?;

    let validation = state.upi.validate(&upi_id).await;
    let attestation = state.attestation.attest_upi(&validation).await;

    let record = ExpenseProof::new(
        1,
        attestation
            .proof
            .clone()
            .unwrap_or_else(|| FAILED_PROOF_HASH.to_string()),
        "FLR".to_string(),
        "0".to_string(),
    )
    .with_metadata(format!(
        "UPI Verification: {} - {}",
        upi_id, validation.status_message
    ))
    .settled(attestation.is_verified());

    let record = state.store.proofs.insert(record).await?;
    state.analytics.record_attestation();

    Ok(Json(VerifyUpiResponse {
        validation,
        attestation,
        record_id: record.id,
    }))
}

pub async fn analyze_text(
    payload: Result<Json<AnalyzeTextRequest>, JsonRejection>,
) -> Result<Json<UpiExtraction>, ShieldError> {
    let Json(request) = payload.map_err(|e| ShieldError::InvalidRequest(e.body_text()))?;
    Ok(Json(extract_upi_id(&request.text)?))
}
