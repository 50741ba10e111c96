use crate::{
    models::{
        Attestation, AttestationStatus, ExpenseProof, GaslessSubmission, ProofStatus,
        UpiValidation,
    },
    services::store::{Store, StoreError},
};
use chrono::Utc;
use ethers::utils::keccak256;
use std::num::ParseFloatError;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Hash that always passes proof verification.
pub const MAGIC_VALID_HASH: &str = "0xTEST_VALID";

const ATTESTATION_ROUND: u64 = 15420;
const ATTESTATION_TYPE: &str = "Web2Json";
const DATA_AVAILABILITY_LAYER: &str = "https://da-layer.flare.network/proofs/";

// Mock FTSO prices, USD per unit.
const MAGIC_HASH_PRICE: f64 = 3000.50;
const DEFAULT_PRICE: f64 = 100.0;

#[derive(Error, Debug)]
pub enum SettlementError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("amount_wei {amount:?} is not a number: {source}")]
    InvalidAmount {
        amount: String,
        source: ParseFloatError,
    },
}

/// Simulated Flare Data Connector: attests VPA lookups and settles submitted
/// expense proofs.
pub struct AttestationService {
    store: Arc<Store>,
    attestation_delay: Duration,
    proof_delay: Duration,
}

impl AttestationService {
    pub fn new(store: Arc<Store>, attestation_delay: Duration, proof_delay: Duration) -> Self {
        Self {
            store,
            attestation_delay,
            proof_delay,
        }
    }

    pub async fn attest_upi(&self, validation: &UpiValidation) -> Attestation {
        let Some(name) = validation.registered_name.as_deref().filter(|_| validation.is_active)
        else {
            tracing::warn!(
                "FDC: attestation failed for {}, VPA inactive",
                validation.upi_id
            );
            return Attestation::failed();
        };

        tracing::info!(
            "FDC: submitting Web2Json attestation request for {}",
            validation.upi_id
        );
        tokio::time::sleep(self.attestation_delay).await;

        let proof = attestation_proof(&validation.upi_id, name);
        tracing::info!("FDC: proof generated, root {}", proof);

        Attestation {
            attestation_status: AttestationStatus::Verified,
            proof: Some(proof),
            attestation_round: Some(ATTESTATION_ROUND),
            data_availability_layer: Some(DATA_AVAILABILITY_LAYER.to_string()),
            attestation_type: Some(ATTESTATION_TYPE.to_string()),
        }
    }

    /// Spawns background settlement of a stored proof.
    pub fn spawn_verification(self: &Arc<Self>, proof_id: u64) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service.verify_proof(proof_id).await;
        });
    }

    /// Moves a proof through `verifying_on_chain` to `verified` or `failed`.
    pub async fn verify_proof(&self, proof_id: u64) {
        match self.settle(proof_id).await {
            Ok(Some(status)) => {
                tracing::info!("Proof {} settled as {:?}", proof_id, status);
            }
            Ok(None) => {
                tracing::warn!("Proof {} vanished before verification", proof_id);
            }
            Err(e) => {
                tracing::error!("Error verifying proof {}: {}", proof_id, e);
                self.mark_failed(proof_id).await;
            }
        }
    }

    /// Relayer path: stores the proof, "submits" it with gas paid by the
    /// relayer, then verifies inline. Returns the settled record.
    pub async fn submit_gasless(
        &self,
        submission: &GaslessSubmission,
    ) -> Result<ExpenseProof, StoreError> {
        let proof = self
            .store
            .proofs
            .insert(ExpenseProof::from(submission))
            .await?;

        tracing::info!(
            "Relayer: verifying signature {} for user {}",
            submission.signature,
            submission.user_id
        );
        tracing::info!(
            "Relayer: submitting tx {} to Flare (gas paid, proof data {})",
            submission.tx_hash,
            submission.proof_data
        );

        self.verify_proof(proof.id).await;
        self.store.proofs.require(proof.id).await
    }

    async fn settle(&self, proof_id: u64) -> Result<Option<ProofStatus>, SettlementError> {
        let Some(mut proof) = self.store.proofs.get(proof_id).await? else {
            return Ok(None);
        };

        tracing::info!("Began verification for proof {}", proof_id);
        proof.status = ProofStatus::VerifyingOnChain;
        self.store.proofs.update(&proof).await?;

        tokio::time::sleep(self.proof_delay).await;

        apply_verdict(&mut proof)?;
        self.store.proofs.update(&proof).await?;
        Ok(Some(proof.status))
    }

    async fn mark_failed(&self, proof_id: u64) {
        if let Ok(Some(mut proof)) = self.store.proofs.get(proof_id).await {
            proof.status = ProofStatus::Failed;
            if let Err(e) = self.store.proofs.update(&proof).await {
                tracing::error!("Could not mark proof {} failed: {}", proof_id, e);
            }
        }
    }
}

/// `0x`-prefixed keccak256 of `"{upi_id}:{registered_name}"`.
pub fn attestation_proof(upi_id: &str, registered_name: &str) -> String {
    let digest = keccak256(format!("{}:{}", upi_id, registered_name).as_bytes());
    format!("0x{}", hex::encode(digest))
}

/// Magic hash or even-length hash passes; the USD value comes from the mock
/// price feed. Length counts characters, not bytes.
fn apply_verdict(proof: &mut ExpenseProof) -> Result<(), SettlementError> {
    let (success, price) = if proof.tx_hash == MAGIC_VALID_HASH {
        (true, MAGIC_HASH_PRICE)
    } else {
        (proof.tx_hash.chars().count() % 2 == 0, DEFAULT_PRICE)
    };

    if success {
        let amount = parse_amount(&proof.amount_wei)?;
        proof.status = ProofStatus::Verified;
        proof.verified_at = Some(Utc::now());
        proof.amount_usd = Some(amount * price);
    } else {
        proof.status = ProofStatus::Failed;
    }
    Ok(())
}

/// An empty amount counts as zero; anything else must parse.
fn parse_amount(raw: &str) -> Result<f64, SettlementError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(0.0);
    }
    trimmed
        .parse()
        .map_err(|source| SettlementError::InvalidAmount {
            amount: raw.to_string(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(store: Arc<Store>) -> AttestationService {
        AttestationService::new(store, Duration::ZERO, Duration::ZERO)
    }

    fn active(upi_id: &str, name: &str) -> UpiValidation {
        UpiValidation {
            upi_id: upi_id.to_string(),
            is_active: true,
            registered_name: Some(name.to_string()),
            status_message: "VPA is active".to_string(),
            provider_response_code: "SUCCESS".to_string(),
        }
    }

    #[test]
    fn proof_is_deterministic_keccak() {
        let proof = attestation_proof("alice@upi", "Alice (Verified)");
        assert!(proof.starts_with("0x"));
        assert_eq!(proof.len(), 66);
        assert_eq!(proof, attestation_proof("alice@upi", "Alice (Verified)"));
        assert_ne!(proof, attestation_proof("bob@upi", "Alice (Verified)"));
    }

    #[tokio::test]
    async fn inactive_vpa_fails_without_proof() {
        let svc = service(Arc::new(Store::in_memory()));
        let mut validation = active("x.invalid@upi", "X");
        validation.is_active = false;
        validation.registered_name = None;

        let attestation = svc.attest_upi(&validation).await;
        assert_eq!(attestation.attestation_status, AttestationStatus::Failed);
        assert!(attestation.proof.is_none());
    }

    #[tokio::test]
    async fn active_vpa_is_attested() {
        let svc = service(Arc::new(Store::in_memory()));
        let attestation = svc.attest_upi(&active("alice@upi", "Alice (Verified)")).await;

        assert!(attestation.is_verified());
        assert_eq!(attestation.attestation_round, Some(15420));
        assert_eq!(attestation.attestation_type.as_deref(), Some("Web2Json"));
        assert_eq!(
            attestation.proof,
            Some(attestation_proof("alice@upi", "Alice (Verified)"))
        );
    }

    #[tokio::test]
    async fn magic_hash_verifies_at_premium_price() {
        let store = Arc::new(Store::in_memory());
        let proof = store
            .proofs
            .insert(ExpenseProof::new(1, MAGIC_VALID_HASH.into(), "ETH".into(), "2".into()))
            .await
            .unwrap();

        service(store.clone()).verify_proof(proof.id).await;

        let settled = store.proofs.require(proof.id).await.unwrap();
        assert_eq!(settled.status, ProofStatus::Verified);
        assert_eq!(settled.amount_usd, Some(6001.0));
        assert!(settled.verified_at.is_some());
    }

    #[tokio::test]
    async fn hash_length_parity_decides_outcome() {
        let store = Arc::new(Store::in_memory());
        let even = store
            .proofs
            .insert(ExpenseProof::new(1, "0x1234".into(), "ETH".into(), "3".into()))
            .await
            .unwrap();
        let odd = store
            .proofs
            .insert(ExpenseProof::new(1, "0x12345".into(), "ETH".into(), "3".into()))
            .await
            .unwrap();

        let svc = service(store.clone());
        svc.verify_proof(even.id).await;
        svc.verify_proof(odd.id).await;

        let even = store.proofs.require(even.id).await.unwrap();
        assert_eq!(even.status, ProofStatus::Verified);
        assert_eq!(even.amount_usd, Some(300.0));

        let odd = store.proofs.require(odd.id).await.unwrap();
        assert_eq!(odd.status, ProofStatus::Failed);
        assert!(odd.amount_usd.is_none());
    }

    #[tokio::test]
    async fn parity_counts_characters_not_bytes() {
        let store = Arc::new(Store::in_memory());
        // One character, two bytes.
        let single = store
            .proofs
            .insert(ExpenseProof::new(1, "é".into(), "ETH".into(), "1".into()))
            .await
            .unwrap();
        // Two characters, four bytes.
        let pair = store
            .proofs
            .insert(ExpenseProof::new(1, "éé".into(), "ETH".into(), "1".into()))
            .await
            .unwrap();

        let svc = service(store.clone());
        svc.verify_proof(single.id).await;
        svc.verify_proof(pair.id).await;

        assert_eq!(
            store.proofs.require(single.id).await.unwrap().status,
            ProofStatus::Failed
        );
        assert_eq!(
            store.proofs.require(pair.id).await.unwrap().status,
            ProofStatus::Verified
        );
    }

    #[tokio::test]
    async fn unparseable_amount_fails_the_proof() {
        let store = Arc::new(Store::in_memory());
        let proof = store
            .proofs
            .insert(ExpenseProof::new(1, "0x1234".into(), "ETH".into(), "abc".into()))
            .await
            .unwrap();

        service(store.clone()).verify_proof(proof.id).await;

        let settled = store.proofs.require(proof.id).await.unwrap();
        assert_eq!(settled.status, ProofStatus::Failed);
        assert!(settled.amount_usd.is_none());
    }

    #[tokio::test]
    async fn empty_amount_counts_as_zero() {
        let store = Arc::new(Store::in_memory());
        let proof = store
            .proofs
            .insert(ExpenseProof::new(1, "0x1234".into(), "ETH".into(), String::new()))
            .await
            .unwrap();

        service(store.clone()).verify_proof(proof.id).await;

        let settled = store.proofs.require(proof.id).await.unwrap();
        assert_eq!(settled.status, ProofStatus::Verified);
        assert_eq!(settled.amount_usd, Some(0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn proof_is_verifying_while_waiting_on_chain() {
        let store = Arc::new(Store::in_memory());
        let proof = store
            .proofs
            .insert(ExpenseProof::new(1, "0x1234".into(), "ETH".into(), "0".into()))
            .await
            .unwrap();

        let svc = Arc::new(AttestationService::new(
            store.clone(),
            Duration::ZERO,
            Duration::from_secs(3),
        ));
        svc.spawn_verification(proof.id);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(
            store.proofs.require(proof.id).await.unwrap().status,
            ProofStatus::VerifyingOnChain
        );

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(
            store.proofs.require(proof.id).await.unwrap().status,
            ProofStatus::Verified
        );
    }

    #[tokio::test]
    async fn gasless_submission_settles_before_returning() {
        let store = Arc::new(Store::in_memory());
        let submission = GaslessSubmission {
            user_id: 4,
            tx_hash: MAGIC_VALID_HASH.to_string(),
            signature: "0xsigned".to_string(),
            proof_data: "0x".to_string(),
            chain_id: "FLR".to_string(),
            amount_wei: "1".to_string(),
        };

        let proof = service(store.clone())
            .submit_gasless(&submission)
            .await
            .unwrap();

        assert_eq!(proof.user_id, 4);
        assert_eq!(proof.status, ProofStatus::Verified);
        assert_eq!(proof.amount_usd, Some(3000.5));
        assert_eq!(store.proofs.require(proof.id).await.unwrap(), proof);
    }

    #[tokio::test]
    async fn unknown_proof_is_ignored() {
        let store = Arc::new(Store::in_memory());
        service(store.clone()).verify_proof(99).await;
        assert!(store.proofs.list().await.unwrap().is_empty());
    }
}
