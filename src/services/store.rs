use crate::models::{DbState, ExpenseProof, Receipt, User};
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: u64 },

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A persisted record with a store-assigned sequential id.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Key prefix in Redis and the noun used in errors.
    const KIND: &'static str;

    fn id(&self) -> u64;
    fn set_id(&mut self, id: u64);
}

impl Record for Receipt {
    const KIND: &'static str = "receipt";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for ExpenseProof {
    const KIND: &'static str = "proof";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

impl Record for User {
    const KIND: &'static str = "user";

    fn id(&self) -> u64 {
        self.id
    }

    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
}

enum Backend<T> {
    Redis(redis::aio::ConnectionManager),
    Memory {
        records: RwLock<Vec<T>>,
        next_id: AtomicU64,
    },
}

/// One collection of records, backed by Redis when available and a
/// process-wide vector otherwise.
pub struct RecordStore<T: Record> {
    backend: Backend<T>,
}

impl<T: Record> RecordStore<T> {
    fn with_backend(redis: Option<redis::aio::ConnectionManager>) -> Self {
        let backend = match redis {
            Some(conn) => Backend::Redis(conn),
            None => Backend::Memory {
                records: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            },
        };
        Self { backend }
    }

    fn record_key(id: u64) -> String {
        format!("{}:{}", T::KIND, id)
    }

    fn index_key() -> String {
        format!("{}:index", T::KIND)
    }

    fn sequence_key() -> String {
        format!("{}:seq", T::KIND)
    }

    /// Assigns an id and stores the record, returning the stored copy.
    pub async fn insert(&self, mut record: T) -> Result<T, StoreError> {
        match &self.backend {
            Backend::Redis(conn) => {
                let mut redis = conn.clone();
                let id: u64 = redis.incr(Self::sequence_key(), 1).await?;
                record.set_id(id);
                let serialized = serde_json::to_string(&record)?;
                redis.set::<_, _, ()>(Self::record_key(id), serialized).await?;
                redis.rpush::<_, _, ()>(Self::index_key(), id).await?;
            }
            Backend::Memory { records, next_id } => {
                let id = next_id.fetch_add(1, Ordering::SeqCst);
                record.set_id(id);
                records.write().await.push(record.clone());
            }
        }

        tracing::debug!("Stored {} {}", T::KIND, record.id());
        Ok(record)
    }

    /// Replaces an existing record. Last writer wins.
    pub async fn update(&self, record: &T) -> Result<(), StoreError> {
        let id = record.id();
        match &self.backend {
            Backend::Redis(conn) => {
                let mut redis = conn.clone();
                let key = Self::record_key(id);
                let exists: bool = redis.exists(&key).await?;
                if !exists {
                    return Err(StoreError::NotFound { kind: T::KIND, id });
                }
                let serialized = serde_json::to_string(record)?;
                redis.set::<_, _, ()>(key, serialized).await?;
            }
            Backend::Memory { records, .. } => {
                let mut records = records.write().await;
                let slot = records
                    .iter_mut()
                    .find(|existing| existing.id() == id)
                    .ok_or(StoreError::NotFound { kind: T::KIND, id })?;
                *slot = record.clone();
            }
        }
        Ok(())
    }

    pub async fn get(&self, id: u64) -> Result<Option<T>, StoreError> {
        match &self.backend {
            Backend::Redis(conn) => {
                let mut redis = conn.clone();
                let raw: Option<String> = redis.get(Self::record_key(id)).await?;
                raw.map(|json| serde_json::from_str(&json))
                    .transpose()
                    .map_err(Into::into)
            }
            Backend::Memory { records, .. } => Ok(records
                .read()
                .await
                .iter()
                .find(|record| record.id() == id)
                .cloned()),
        }
    }

    /// Looks a record up, treating absence as an error.
    pub async fn require(&self, id: u64) -> Result<T, StoreError> {
        self.get(id)
            .await?
            .ok_or(StoreError::NotFound { kind: T::KIND, id })
    }

    /// First record matching `predicate`, in insertion order.
    pub async fn find<P>(&self, predicate: P) -> Result<Option<T>, StoreError>
    where
        P: Fn(&T) -> bool,
    {
        Ok(self.list().await?.into_iter().find(|record| predicate(record)))
    }

    /// All records in insertion order.
    pub async fn list(&self) -> Result<Vec<T>, StoreError> {
        match &self.backend {
            Backend::Redis(conn) => {
                let mut redis = conn.clone();
                let ids: Vec<u64> = redis.lrange(Self::index_key(), 0, -1).await?;
                let mut out = Vec::with_capacity(ids.len());
                for id in ids {
                    let raw: Option<String> = redis.get(Self::record_key(id)).await?;
                    if let Some(json) = raw {
                        out.push(serde_json::from_str(&json)?);
                    }
                }
                Ok(out)
            }
            Backend::Memory { records, .. } => Ok(records.read().await.clone()),
        }
    }
}

pub struct Store {
    redis: Option<redis::aio::ConnectionManager>,
    pub receipts: RecordStore<Receipt>,
    pub proofs: RecordStore<ExpenseProof>,
    pub users: RecordStore<User>,
}

impl Store {
    /// Connects to Redis if a URL is given and reachable, otherwise falls back
    /// to in-memory collections.
    pub async fn connect(redis_url: Option<&str>) -> Self {
        let redis = match redis_url {
            Some(url) => match redis::Client::open(url) {
                Ok(client) => match client.get_connection_manager().await {
                    Ok(conn) => {
                        tracing::info!("Redis connected successfully");
                        Some(conn)
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Redis connection failed: {}, switching to in-memory mode",
                            e
                        );
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        "Redis client creation failed: {}, switching to in-memory mode",
                        e
                    );
                    None
                }
            },
            None => {
                tracing::info!("REDIS_URL not set, using in-memory store");
                None
            }
        };

        Self::from_connection(redis)
    }

    pub fn in_memory() -> Self {
        Self::from_connection(None)
    }

    fn from_connection(redis: Option<redis::aio::ConnectionManager>) -> Self {
        Self {
            receipts: RecordStore::with_backend(redis.clone()),
            proofs: RecordStore::with_backend(redis.clone()),
            users: RecordStore::with_backend(redis.clone()),
            redis,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        self.redis.is_none()
    }

    pub async fn db_state(&self) -> DbState {
        match self.redis.clone() {
            Some(mut redis) => {
                match redis::cmd("PING").query_async::<_, String>(&mut redis).await {
                    Ok(_) => DbState::Connected,
                    Err(e) => {
                        tracing::warn!("Redis ping failed: {}", e);
                        DbState::Disconnected
                    }
                }
            }
            None => DbState::InMemoryFallback,
        }
    }
}

pub type SharedStore = Arc<Store>;
