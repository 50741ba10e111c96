pub mod analytics;
pub mod attestation;
pub mod oracle;
pub mod store;
pub mod upi;

pub use analytics::Analytics;
pub use attestation::AttestationService;
pub use oracle::TrustOracle;
pub use store::{Store, StoreError};
pub use upi::UpiValidationService;
