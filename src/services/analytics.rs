use crate::models::Stats;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[derive(Debug)]
pub struct Analytics {
    receipts_verified: AtomicU64,
    proofs_submitted: AtomicU64,
    attestations_issued: AtomicU64,
    uploads_processed: AtomicU64,
    start_time: Instant,
}

impl Default for Analytics {
    fn default() -> Self {
        Self::new()
    }
}

impl Analytics {
    pub fn new() -> Self {
        Self {
            receipts_verified: AtomicU64::new(0),
            proofs_submitted: AtomicU64::new(0),
            attestations_issued: AtomicU64::new(0),
            uploads_processed: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn record_receipt(&self) {
        self.receipts_verified.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_proof(&self) {
        self.proofs_submitted.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_attestation(&self) {
        self.attestations_issued.fetch_add(1, Ordering::SeqCst);
    }

    pub fn record_upload(&self) {
        self.uploads_processed.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get_stats(&self) -> Stats {
        Stats {
            receipts_verified: self.receipts_verified.load(Ordering::SeqCst),
            proofs_submitted: self.proofs_submitted.load(Ordering::SeqCst),
            attestations_issued: self.attestations_issued.load(Ordering::SeqCst),
            uploads_processed: self.uploads_processed.load(Ordering::SeqCst),
            uptime_seconds: self.uptime_seconds(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
