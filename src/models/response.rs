use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DbState {
    Connected,
    Disconnected,
    InMemoryFallback,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    #[serde(rename = "dbState")]
    pub db_state: DbState,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub receipts_verified: u64,
    pub proofs_submitted: u64,
    pub attestations_issued: u64,
    pub uploads_processed: u64,
    pub uptime_seconds: u64,
}
