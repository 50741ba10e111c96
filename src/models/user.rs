use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Owner of expense proofs, keyed by wallet address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub name: String,
    pub wallet_address: String,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: impl Into<String>, wallet_address: impl Into<String>) -> Self {
        Self {
            id: 0,
            name: name.into(),
            wallet_address: wallet_address.into(),
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreate {
    pub name: String,
    pub wallet_address: String,
}
