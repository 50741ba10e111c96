use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    Pending,
    VerifyingOnChain,
    Verified,
    Failed,
}

impl ProofStatus {
    pub fn is_settled(&self) -> bool {
        matches!(self, ProofStatus::Verified | ProofStatus::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpenseProof {
    pub id: u64,
    pub user_id: u64,
    pub tx_hash: String,
    pub chain_id: String,
    pub amount_wei: String,
    pub amount_usd: Option<f64>,
    pub status: ProofStatus,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
    pub metadata_info: Option<String>,
}

impl ExpenseProof {
    pub fn new(user_id: u64, tx_hash: String, chain_id: String, amount_wei: String) -> Self {
        Self {
            id: 0,
            user_id,
            tx_hash,
            chain_id,
            amount_wei,
            amount_usd: None,
            status: ProofStatus::Pending,
            created_at: Utc::now(),
            verified_at: None,
            metadata_info: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata_info = Some(metadata.into());
        self
    }

    /// Records an outcome that was decided synchronously.
    pub fn settled(mut self, verified: bool) -> Self {
        self.status = if verified {
            ProofStatus::Verified
        } else {
            ProofStatus::Failed
        };
        self.verified_at = Some(Utc::now());
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofSubmission {
    pub user_id: u64,
    pub tx_hash: String,
    pub chain_id: String,
    pub amount_wei: String,
    #[serde(default)]
    pub metadata_info: Option<String>,
}

impl From<ProofSubmission> for ExpenseProof {
    fn from(submission: ProofSubmission) -> Self {
        let mut proof = ExpenseProof::new(
            submission.user_id,
            submission.tx_hash,
            submission.chain_id,
            submission.amount_wei,
        );
        proof.metadata_info = submission.metadata_info;
        proof
    }
}

/// A proof relayed on the user's behalf; the relayer pays the gas.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaslessSubmission {
    pub user_id: u64,
    pub tx_hash: String,
    /// Hex signature over the proof. Logged, never checked.
    pub signature: String,
    #[serde(default = "empty_proof_data")]
    pub proof_data: String,
    pub chain_id: String,
    pub amount_wei: String,
}

fn empty_proof_data() -> String {
    "0x".to_string()
}

impl From<&GaslessSubmission> for ExpenseProof {
    fn from(submission: &GaslessSubmission) -> Self {
        ExpenseProof::new(
            submission.user_id,
            submission.tx_hash.clone(),
            submission.chain_id.clone(),
            submission.amount_wei.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_uses_snake_case_on_the_wire() {
        assert_eq!(
            serde_json::to_string(&ProofStatus::VerifyingOnChain).unwrap(),
            "\"verifying_on_chain\""
        );
        assert!(ProofStatus::Failed.is_settled());
        assert!(!ProofStatus::VerifyingOnChain.is_settled());
    }

    #[test]
    fn submission_starts_pending() {
        let submission: ProofSubmission = serde_json::from_str(
            r#"{"user_id":1,"tx_hash":"0x1234","chain_id":"ETH","amount_wei":"5"}"#,
        )
        .unwrap();
        let proof = ExpenseProof::from(submission);
        assert_eq!(proof.status, ProofStatus::Pending);
        assert!(proof.metadata_info.is_none());
        assert!(proof.verified_at.is_none());
    }

    #[test]
    fn gasless_proof_data_defaults_to_empty_bytes() {
        let submission: GaslessSubmission = serde_json::from_str(
            r#"{"user_id":3,"tx_hash":"0xab","signature":"0xsig","chain_id":"FLR","amount_wei":"1"}"#,
        )
        .unwrap();
        assert_eq!(submission.proof_data, "0x");

        let proof = ExpenseProof::from(&submission);
        assert_eq!(proof.user_id, 3);
        assert_eq!(proof.status, ProofStatus::Pending);
        assert!(proof.metadata_info.is_none());
    }
}
