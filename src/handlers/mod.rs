pub mod health;
pub mod proofs;
pub mod stats;
pub mod terminal;
pub mod upi;
pub mod upload;
pub mod users;
pub mod verify;

pub use health::*;
pub use proofs::*;
pub use stats::*;
pub use terminal::*;
pub use upi::*;
pub use upload::*;
pub use users::*;
pub use verify::*;

use crate::{
    config::Timings,
    services::{Analytics, AttestationService, Store, TrustOracle, UpiValidationService},
    terminal::StageDelays,
};
use std::sync::Arc;

/// Shared by every handler; all members are cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<Store>,
    pub analytics: Arc<Analytics>,
    pub upi: Arc<UpiValidationService>,
    pub attestation: Arc<AttestationService>,
    pub oracle: Arc<TrustOracle>,
    pub timings: Timings,
}

impl AppState {
    pub fn new(store: Arc<Store>, timings: Timings) -> Self {
        Self {
            analytics: Arc::new(Analytics::new()),
            upi: Arc::new(UpiValidationService::new(timings.validation)),
            attestation: Arc::new(AttestationService::new(
                store.clone(),
                timings.attestation,
                timings.proof,
            )),
            oracle: Arc::new(TrustOracle::new(timings.oracle)),
            store,
            timings,
        }
    }

    pub fn stage_delays(&self) -> StageDelays {
        StageDelays {
            multi_source: self.timings.multi_source_stage,
            oracle: self.timings.oracle_stage,
        }
    }
}
