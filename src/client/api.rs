use crate::models::{
    ExpenseProof, GaslessSubmission, HealthStatus, ProofSubmission, User, VerifyResponse,
    VerifyUpiResponse,
};
use anyhow::{bail, Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::time::Duration;

/// Thin client for the ExpenseShield HTTP API.
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn health(&self) -> Result<HealthStatus> {
        let response = self.client.get(self.url("/health")).send().await?;
        decode(response).await
    }

    pub async fn verify(&self, upi_id: &str, bank_ref_id: &str) -> Result<VerifyResponse> {
        let response = self
            .client
            .post(self.url("/api/verify"))
            .json(&json!({ "upiId": upi_id, "bankRefId": bank_ref_id }))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn register_user(&self, name: &str, wallet_address: &str) -> Result<User> {
        let response = self
            .client
            .post(self.url("/api/users"))
            .json(&json!({ "name": name, "wallet_address": wallet_address }))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn submit_proof(&self, submission: &ProofSubmission) -> Result<ExpenseProof> {
        let response = self
            .client
            .post(self.url("/api/submit-proof"))
            .json(submission)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn submit_gasless(&self, submission: &GaslessSubmission) -> Result<ExpenseProof> {
        let response = self
            .client
            .post(self.url("/api/submit-gasless"))
            .json(submission)
            .send()
            .await?;
        decode(response).await
    }

    pub async fn proof_status(&self, proof_id: u64) -> Result<ExpenseProof> {
        let response = self
            .client
            .get(self.url(&format!("/api/status/{}", proof_id)))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn history(&self, user_id: u64) -> Result<Vec<ExpenseProof>> {
        let response = self
            .client
            .get(self.url(&format!("/api/history/{}", user_id)))
            .send()
            .await?;
        decode(response).await
    }

    pub async fn verify_upi(&self, upi_id: &str) -> Result<VerifyUpiResponse> {
        let response = self
            .client
            .post(self.url("/api/verify-upi"))
            .json(&json!({ "upi_id": upi_id }))
            .send()
            .await?;
        decode(response).await
    }

    /// Polls a proof until it is verified or failed.
    pub async fn wait_for_settlement(
        &self,
        proof_id: u64,
        attempts: usize,
        interval: Duration,
    ) -> Result<ExpenseProof> {
        for attempt in 1..=attempts {
            let proof = self.proof_status(proof_id).await?;
            tracing::debug!("Proof {} attempt {}: {:?}", proof_id, attempt, proof.status);
            if proof.status.is_settled() {
                return Ok(proof);
            }
            tokio::time::sleep(interval).await;
        }
        bail!("Proof {} not settled after {} attempts", proof_id, attempts)
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        bail!("Request failed with {}: {}", status, body);
    }
    response
        .json::<T>()
        .await
        .context("Failed to decode response body")
}
