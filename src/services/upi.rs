use crate::models::UpiValidation;
use moka::future::Cache;
use std::time::Duration;

/// Stand-in for a payment-gateway VPA lookup (Razorpay, PayU and the like).
pub struct UpiValidationService {
    delay: Duration,
    cache: Cache<String, UpiValidation>,
}

impl UpiValidationService {
    pub fn new(delay: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(60))
            .build();

        Self { delay, cache }
    }

    pub async fn validate(&self, upi_id: &str) -> UpiValidation {
        if let Some(cached) = self.cache.get(upi_id).await {
            tracing::debug!("VPA cache hit for {}", upi_id);
            return cached;
        }

        tracing::info!("Payment gateway: validating VPA {}", upi_id);
        tokio::time::sleep(self.delay).await;

        let validation = lookup(upi_id);
        self.cache.insert(upi_id.to_string(), validation.clone()).await;
        validation
    }
}

fn lookup(upi_id: &str) -> UpiValidation {
    if upi_id.to_lowercase().contains("invalid") {
        return UpiValidation {
            upi_id: upi_id.to_string(),
            is_active: false,
            registered_name: None,
            status_message: "VPA does not exist".to_string(),
            provider_response_code: "INVALID_VPA".to_string(),
        };
    }

    let handle = upi_id
        .split_once('@')
        .map(|(handle, _)| handle)
        .unwrap_or("User");

    UpiValidation {
        upi_id: upi_id.to_string(),
        is_active: true,
        registered_name: Some(format!("{} (Verified)", capitalize(handle))),
        status_message: "VPA is active".to_string(),
        provider_response_code: "SUCCESS".to_string(),
    }
}

/// First character upper-cased, the rest lower-cased.
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
