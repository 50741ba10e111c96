use crate::models::OracleResult;
use chrono::Utc;
use std::time::Duration;

/// Aggregates independent source votes into a single verdict.
pub struct TrustOracle {
    confirmation_delay: Duration,
}

impl TrustOracle {
    pub fn new(confirmation_delay: Duration) -> Self {
        Self { confirmation_delay }
    }

    pub async fn submit_votes(&self, tx_id: &str, votes: &[bool]) -> OracleResult {
        tracing::info!("TrustOracle: submitting votes for {}: {:?}", tx_id, votes);

        tokio::time::sleep(self.confirmation_delay).await;

        let result = OracleResult {
            tx_id: tx_id.to_string(),
            is_valid: majority(votes),
            timestamp: Utc::now(),
            vote_count: votes.len(),
        };

        tracing::info!(
            "TrustOracle: {} -> valid={} ({} votes)",
            tx_id,
            result.is_valid,
            result.vote_count
        );

        result
    }
}

/// Strict majority; ties and empty ballots are invalid.
pub fn majority(votes: &[bool]) -> bool {
    let yes = votes.iter().filter(|v| **v).count();
    yes > votes.len() - yes
}
