use crate::{
    error::ShieldError,
    handlers::AppState,
    models::{Receipt, VerifyRequest, VerifyResponse},
    services::Store,
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use ethers::types::H256;
use std::time::Duration;

pub async fn verify_receipt(
    State(state): State<AppState>,
    payload: Result<Json<VerifyRequest>, JsonRejection>,
) -> Result<Json<VerifyResponse>, ShieldError> {
    let Json(request) = payload.map_err(|e| ShieldError::InvalidRequest(e.body_text()))?;
    let (upi_id, bank_ref_id) = request.required_fields().ok_or(ShieldError::MissingFields)?;

    tracing::info!("Processing verification for UPI: {}", upi_id);

    let receipt = record_pending(&state.store, upi_id, bank_ref_id).await?;
    spawn_settlement_log(receipt.id, state.timings.settle);

    let receipt = confirm(&state.store, receipt).await?;
    state.analytics.record_receipt();

    Ok(Json(VerifyResponse {
        message: "Verification Processed".to_string(),
        data: receipt,
    }))
}

pub async fn list_receipts(
    State(state): State<AppState>,
) -> Result<Json<Vec<Receipt>>, ShieldError> {
    Ok(Json(state.store.receipts.list().await?))
}

pub async fn get_receipt(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> Result<Json<Receipt>, ShieldError> {
    state
        .store
        .receipts
        .get(id)
        .await?
        .map(Json)
        .ok_or_else(|| ShieldError::NotFound(format!("Receipt {}", id)))
}

async fn record_pending(
    store: &Store,
    upi_id: &str,
    bank_ref_id: &str,
) -> Result<Receipt, ShieldError> {
    Ok(store
        .receipts
        .insert(Receipt::pending(upi_id, bank_ref_id))
        .await?)
}

async fn confirm(store: &Store, mut receipt: Receipt) -> Result<Receipt, ShieldError> {
    receipt.mark_verified(mock_tx_hash());
    store.receipts.update(&receipt).await?;
    Ok(receipt)
}

/// Random 32-byte hash; not a reference to any real chain transaction.
fn mock_tx_hash() -> String {
    format!("{:?}", H256::from(rand::random::<[u8; 32]>()))
}

// The bank and chain "checks" only ever log; the record is already verified.
fn spawn_settlement_log(receipt_id: u64, delay: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        tracing::info!(receipt_id, "Bank check passed");
        tracing::info!(receipt_id, "Blockchain transaction confirmed");
    });
}
