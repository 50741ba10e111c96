//! Receipt verification terminal.
//!
//! `upload → processing → verified`, or back to `upload` with an error. While
//! processing, three cosmetic stages advance on fixed timers; only the last
//! one calls out to a backend.

use crate::{
    models::OracleResult,
    ocr::{extract_receipt_fields, ReceiptFields},
    services::TrustOracle,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    OcrAnalysis,
    MultiSourceCheck,
    OracleSubmission,
}

impl Stage {
    pub const ALL: [Stage; 3] = [
        Stage::OcrAnalysis,
        Stage::MultiSourceCheck,
        Stage::OracleSubmission,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            Stage::OcrAnalysis => "Analyzing Receipt via OCR",
            Stage::MultiSourceCheck => "Consulting Multi-Source APIs",
            Stage::OracleSubmission => "Submitting to Flare Oracle",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            Stage::OcrAnalysis => 0,
            Stage::MultiSourceCheck => 1,
            Stage::OracleSubmission => 2,
        }
    }

    fn next(&self) -> Option<Stage> {
        Stage::ALL.get(self.index() + 1).copied()
    }
}

/// What the user handed the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TerminalInput {
    /// A selected receipt file, with whatever text was recognised on it.
    File {
        name: String,
        #[serde(default)]
        text: Option<String>,
    },
    /// A transaction hash or UPI reference typed in by hand.
    Manual { id: String },
}

impl TerminalInput {
    fn recognised_text(&self) -> &str {
        match self {
            TerminalInput::File { text, .. } => text.as_deref().unwrap_or_default(),
            TerminalInput::Manual { id } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerificationResult {
    #[serde(flatten)]
    pub oracle: OracleResult,
    #[serde(flatten)]
    pub fields: ReceiptFields,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TerminalState {
    Upload {
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Processing {
        stage: Stage,
    },
    Verified {
        result: VerificationResult,
    },
}

impl TerminalState {
    pub fn is_final(&self) -> bool {
        !matches!(self, TerminalState::Processing { .. })
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TerminalError {
    #[error("verification already in progress")]
    Busy,

    #[error("no verification in progress")]
    Idle,

    #[error("stage {0:?} is not the last stage")]
    StagesRemaining(Stage),

    #[error("already on the last stage")]
    NoStagesLeft,
}

/// The bare state machine. Holds no timers; the driver decides when to call
/// each transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TerminalMachine {
    state: TerminalState,
}

impl Default for TerminalMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalMachine {
    pub fn new() -> Self {
        Self {
            state: TerminalState::Upload { error: None },
        }
    }

    pub fn state(&self) -> &TerminalState {
        &self.state
    }

    /// `upload → processing`, entering the first stage.
    pub fn submit(&mut self) -> Result<(), TerminalError> {
        match self.state {
            TerminalState::Processing { .. } => Err(TerminalError::Busy),
            _ => {
                self.state = TerminalState::Processing {
                    stage: Stage::OcrAnalysis,
                };
                Ok(())
            }
        }
    }

    pub fn advance(&mut self) -> Result<Stage, TerminalError> {
        let TerminalState::Processing { stage } = self.state else {
            return Err(TerminalError::Idle);
        };
        let next = stage.next().ok_or(TerminalError::NoStagesLeft)?;
        self.state = TerminalState::Processing { stage: next };
        Ok(next)
    }

    /// `processing → verified`; only allowed from the last stage.
    pub fn complete(&mut self, result: VerificationResult) -> Result<(), TerminalError> {
        match self.state {
            TerminalState::Processing {
                stage: Stage::OracleSubmission,
            } => {
                self.state = TerminalState::Verified { result };
                Ok(())
            }
            TerminalState::Processing { stage } => Err(TerminalError::StagesRemaining(stage)),
            _ => Err(TerminalError::Idle),
        }
    }

    /// `processing → upload`, surfacing the error message.
    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), TerminalError> {
        match self.state {
            TerminalState::Processing { .. } => {
                self.state = TerminalState::Upload {
                    error: Some(message.into()),
                };
                Ok(())
            }
            _ => Err(TerminalError::Idle),
        }
    }
}

/// The call chain behind the oracle stage.
#[async_trait]
pub trait TerminalBackend: Send + Sync {
    async fn verify(&self, fields: &ReceiptFields) -> anyhow::Result<OracleResult>;
}

/// Polls a fixed panel of sources that all agree, then tallies through the
/// trust oracle.
pub struct OracleBackend {
    oracle: Arc<TrustOracle>,
    sources: usize,
}

impl OracleBackend {
    pub fn new(oracle: Arc<TrustOracle>, sources: usize) -> Self {
        Self { oracle, sources }
    }
}

#[async_trait]
impl TerminalBackend for OracleBackend {
    async fn verify(&self, fields: &ReceiptFields) -> anyhow::Result<OracleResult> {
        let votes = vec![true; self.sources];
        Ok(self.oracle.submit_votes(&fields.tx_id, &votes).await)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageDelays {
    pub multi_source: Duration,
    pub oracle: Duration,
}

impl Default for StageDelays {
    fn default() -> Self {
        Self {
            multi_source: Duration::from_millis(1500),
            oracle: Duration::from_millis(2000),
        }
    }
}

/// Runs one input through the machine on the fixed timers.
pub struct VerificationTerminal<B> {
    backend: B,
    delays: StageDelays,
}

impl<B: TerminalBackend> VerificationTerminal<B> {
    pub fn new(backend: B, delays: StageDelays) -> Self {
        Self { backend, delays }
    }

    /// Drives `input` to a final state, reporting every state entered
    /// (including the final one) to `on_change`.
    pub async fn run<F>(&self, input: &TerminalInput, mut on_change: F) -> TerminalState
    where
        F: FnMut(&TerminalState),
    {
        let mut machine = TerminalMachine::new();
        if machine.submit().is_err() {
            return machine.state().clone();
        }
        on_change(machine.state());

        let fields = extract_receipt_fields(input.recognised_text());
        tracing::debug!(tx_id = %fields.tx_id, "Receipt fields extracted");

        for delay in [self.delays.multi_source, self.delays.oracle] {
            // Infallible: two advances from the first of three stages.
            if machine.advance().is_ok() {
                on_change(machine.state());
            }
            tokio::time::sleep(delay).await;
        }

        let outcome = match self.backend.verify(&fields).await {
            Ok(oracle) => machine.complete(VerificationResult { oracle, fields }),
            Err(e) => {
                tracing::warn!("Terminal verification failed: {:#}", e);
                machine.fail(e.to_string())
            }
        };
        if let Err(e) = outcome {
            tracing::error!("Terminal transition rejected: {}", e);
        }

        on_change(machine.state());
        machine.state().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::time::Instant;

    struct FailingBackend;

    #[async_trait]
    impl TerminalBackend for FailingBackend {
        async fn verify(&self, _fields: &ReceiptFields) -> anyhow::Result<OracleResult> {
            anyhow::bail!("oracle unreachable")
        }
    }

    fn backend() -> OracleBackend {
        OracleBackend::new(Arc::new(TrustOracle::new(Duration::ZERO)), 5)
    }

    fn sample_result() -> VerificationResult {
        VerificationResult {
            oracle: OracleResult {
                tx_id: "TX-1".into(),
                is_valid: true,
                timestamp: Utc::now(),
                vote_count: 5,
            },
            fields: extract_receipt_fields("TX-1 $1.00 2024-01-01"),
        }
    }

    #[test]
    fn machine_walks_stages_in_order() {
        let mut machine = TerminalMachine::new();
        machine.submit().unwrap();
        assert_eq!(machine.submit(), Err(TerminalError::Busy));
        assert_eq!(
            machine.complete(sample_result()),
            Err(TerminalError::StagesRemaining(Stage::OcrAnalysis))
        );

        assert_eq!(machine.advance(), Ok(Stage::MultiSourceCheck));
        assert_eq!(machine.advance(), Ok(Stage::OracleSubmission));
        assert_eq!(machine.advance(), Err(TerminalError::NoStagesLeft));

        machine.complete(sample_result()).unwrap();
        assert!(matches!(machine.state(), TerminalState::Verified { .. }));
    }

    #[test]
    fn failure_returns_to_upload_with_message() {
        let mut machine = TerminalMachine::new();
        assert_eq!(machine.fail("nope"), Err(TerminalError::Idle));

        machine.submit().unwrap();
        machine.fail("bad receipt").unwrap();
        assert_eq!(
            machine.state(),
            &TerminalState::Upload {
                error: Some("bad receipt".into())
            }
        );

        // A failed run can be retried.
        assert!(machine.submit().is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn file_input_reaches_verified_after_fixed_delays() {
        let terminal = VerificationTerminal::new(backend(), StageDelays::default());
        let input = TerminalInput::File {
            name: "receipt.png".into(),
            text: Some("Paid $12.00 2024-05-01 TX-AB12".into()),
        };

        let started = Instant::now();
        let mut seen = Vec::new();
        let final_state = terminal.run(&input, |s| seen.push(s.clone())).await;

        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(3500));
        assert!(elapsed < Duration::from_millis(3600));
        let TerminalState::Verified { result } = final_state else {
            panic!("expected verified, got {:?}", final_state);
        };
        assert_eq!(result.fields.tx_id, "TX-AB12");
        assert_eq!(result.oracle.tx_id, "TX-AB12");
        assert!(result.oracle.is_valid);
        assert_eq!(result.oracle.vote_count, 5);

        let stages: Vec<Stage> = seen
            .iter()
            .filter_map(|s| match s {
                TerminalState::Processing { stage } => Some(*stage),
                _ => None,
            })
            .collect();
        assert_eq!(stages, Stage::ALL.to_vec());
        assert!(seen.last().unwrap().is_final());
    }

    #[tokio::test(start_paused = true)]
    async fn manual_entry_without_text_still_verifies() {
        let terminal = VerificationTerminal::new(backend(), StageDelays::default());
        let input = TerminalInput::Manual {
            id: "UPI-REF-778".into(),
        };

        let state = terminal.run(&input, |_| {}).await;
        let TerminalState::Verified { result } = state else {
            panic!("expected verified");
        };
        assert!(result.fields.tx_id.starts_with("TX-"));
        assert_eq!(result.fields.amount, "$0.00");
    }

    #[tokio::test(start_paused = true)]
    async fn backend_error_returns_to_upload() {
        let terminal = VerificationTerminal::new(FailingBackend, StageDelays::default());
        let input = TerminalInput::File {
            name: "r.jpg".into(),
            text: None,
        };

        let mut seen = Vec::new();
        let state = terminal.run(&input, |s| seen.push(s.clone())).await;

        assert_eq!(
            state,
            TerminalState::Upload {
                error: Some("oracle unreachable".into())
            }
        );
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn input_and_state_wire_format() {
        let input: TerminalInput =
            serde_json::from_str(r#"{"kind":"manual","id":"0xabc"}"#).unwrap();
        assert_eq!(input, TerminalInput::Manual { id: "0xabc".into() });

        let json = serde_json::to_value(TerminalState::Processing {
            stage: Stage::MultiSourceCheck,
        })
        .unwrap();
        assert_eq!(json["state"], "processing");
        assert_eq!(json["stage"], "multi_source_check");
    }
}
