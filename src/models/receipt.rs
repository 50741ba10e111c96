use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReceiptStatus {
    Pending,
    Verified,
}

/// A UPI receipt submitted through `/api/verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Receipt {
    pub id: u64,
    pub upi_id: String,
    pub bank_ref_id: String,
    pub status: ReceiptStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Receipt {
    pub fn pending(upi_id: impl Into<String>, bank_ref_id: impl Into<String>) -> Self {
        Self {
            id: 0,
            upi_id: upi_id.into(),
            bank_ref_id: bank_ref_id.into(),
            status: ReceiptStatus::Pending,
            tx_hash: None,
            timestamp: Utc::now(),
        }
    }

    /// There is no rejection path: every receipt ends up verified.
    pub fn mark_verified(&mut self, tx_hash: String) {
        self.status = ReceiptStatus::Verified;
        self.tx_hash = Some(tx_hash);
    }
}

/// Body of `POST /api/verify`. Both fields are optional at the wire level so
/// that a missing field surfaces as our own 400 rather than a decode error.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub upi_id: Option<String>,
    pub bank_ref_id: Option<String>,
}

impl VerifyRequest {
    pub fn required_fields(&self) -> Option<(&str, &str)> {
        let upi_id = self.upi_id.as_deref().filter(|s| !s.is_empty())?;
        let bank_ref_id = self.bank_ref_id.as_deref().filter(|s| !s.is_empty())?;
        Some((upi_id, bank_ref_id))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub message: String,
    pub data: Receipt,
}
