//! Field extraction from text that has already been recognised off a
//! receipt image or decoded from a QR payload.

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::{distributions::Alphanumeric, Rng};
use regex::Regex;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static DATE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").unwrap());
static AMOUNT_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\$\d+(\.\d{2})?").unwrap());
static TX_ID_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"TX-[A-Z0-9]+").unwrap());
static UPI_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9.\-_]+@[a-zA-Z]+").unwrap());

const DEFAULT_AMOUNT: &str = "$0.00";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("no text to analyze")]
    EmptyInput,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptFields {
    pub date: String,
    pub amount: String,
    pub tx_id: String,
}

/// Pulls date, amount and transaction id out of receipt text, filling
/// anything missing with today's date, `$0.00` and a random `TX-` id.
pub fn extract_receipt_fields(text: &str) -> ReceiptFields {
    let date = DATE_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());

    let amount = AMOUNT_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| DEFAULT_AMOUNT.to_string());

    let tx_id = TX_ID_PATTERN
        .find(text)
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(random_tx_id);

    ReceiptFields {
        date,
        amount,
        tx_id,
    }
}

pub fn random_tx_id() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(9)
        .map(|c| char::from(c).to_ascii_uppercase())
        .collect();
    format!("TX-{}", suffix)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExtractionMethod {
    QrCode,
    Ocr,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpiExtraction {
    pub upi_id: Option<String>,
    pub method: ExtractionMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_text: Option<String>,
}

/// Finds a UPI ID (VPA), preferring a `upi://` payment URI over free text.
pub fn extract_upi_id(text: &str) -> Result<UpiExtraction, ExtractionError> {
    let payload = text.trim();
    if payload.is_empty() {
        return Err(ExtractionError::EmptyInput);
    }

    if let Some(payee) = payee_from_uri(payload) {
        return Ok(UpiExtraction {
            upi_id: Some(payee),
            method: ExtractionMethod::QrCode,
            raw_data: Some(payload.to_string()),
            raw_text: None,
        });
    }

    let upi_id = UPI_ID_PATTERN.find(text).map(|m| m.as_str().to_string());
    let method = if upi_id.is_some() {
        ExtractionMethod::Ocr
    } else {
        ExtractionMethod::Failed
    };

    Ok(UpiExtraction {
        upi_id,
        method,
        raw_data: None,
        raw_text: Some(text.to_string()),
    })
}

fn payee_from_uri(data: &str) -> Option<String> {
    if !data.starts_with("upi://") {
        return None;
    }
    let url = Url::parse(data).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "pa")
        .map(|(_, value)| value.into_owned())
        .filter(|value| !value.is_empty())
}
