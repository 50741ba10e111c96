use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpiValidation {
    pub upi_id: String,
    pub is_active: bool,
    pub registered_name: Option<String>,
    pub status_message: String,
    pub provider_response_code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttestationStatus {
    Verified,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attestation {
    pub attestation_status: AttestationStatus,
    pub proof: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation_round: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_availability_layer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attestation_type: Option<String>,
}

impl Attestation {
    pub fn failed() -> Self {
        Self {
            attestation_status: AttestationStatus::Failed,
            proof: None,
            attestation_round: None,
            data_availability_layer: None,
            attestation_type: None,
        }
    }

    pub fn is_verified(&self) -> bool {
        self.attestation_status == AttestationStatus::Verified
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VerifyUpiRequest {
    pub upi_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyUpiResponse {
    pub validation: UpiValidation,
    pub attestation: Attestation,
    pub record_id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OracleResult {
    pub tx_id: String,
    pub is_valid: bool,
    pub timestamp: DateTime<Utc>,
    pub vote_count: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeTextRequest {
    pub text: String,
}

/// Client-side OCR payload attached to a receipt upload.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OcrPayload {
    pub tx_id: Option<String>,
    pub amount: Option<String>,
}
