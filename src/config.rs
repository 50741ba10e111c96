use anyhow::{bail, Context, Result};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Testnet,
    Production,
}

/// Fixed delays standing in for gateway, chain and oracle round-trips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub settle: Duration,
    pub validation: Duration,
    pub attestation: Duration,
    pub oracle: Duration,
    pub proof: Duration,
    pub multi_source_stage: Duration,
    pub oracle_stage: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            settle: Duration::from_millis(1000),
            validation: Duration::from_millis(1000),
            attestation: Duration::from_millis(2000),
            oracle: Duration::from_millis(2000),
            proof: Duration::from_millis(3000),
            multi_source_stage: Duration::from_millis(1500),
            oracle_stage: Duration::from_millis(2000),
        }
    }
}

impl Timings {
    /// All delays zeroed, for tests and local smoke runs.
    pub fn instant() -> Self {
        Self {
            settle: Duration::ZERO,
            validation: Duration::ZERO,
            attestation: Duration::ZERO,
            oracle: Duration::ZERO,
            proof: Duration::ZERO,
            multi_source_stage: Duration::ZERO,
            oracle_stage: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: Environment,
    pub host: String,
    pub port: u16,

    // Redis (absent => in-memory fallback)
    pub redis_url: Option<String>,

    pub timings: Timings,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let environment = Self::parse_environment()?;
        let defaults = Timings::default();

        let config = Self {
            environment,
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("Invalid PORT")?,

            redis_url: std::env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),

            timings: Timings {
                settle: Self::parse_delay("SETTLE_DELAY_MS", defaults.settle)?,
                validation: Self::parse_delay("VALIDATION_DELAY_MS", defaults.validation)?,
                attestation: Self::parse_delay("ATTESTATION_DELAY_MS", defaults.attestation)?,
                oracle: Self::parse_delay("ORACLE_DELAY_MS", defaults.oracle)?,
                proof: Self::parse_delay("PROOF_DELAY_MS", defaults.proof)?,
                multi_source_stage: Self::parse_delay(
                    "MULTI_SOURCE_DELAY_MS",
                    defaults.multi_source_stage,
                )?,
                oracle_stage: Self::parse_delay("ORACLE_STAGE_DELAY_MS", defaults.oracle_stage)?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn parse_environment() -> Result<Environment> {
        let env = std::env::var("ENVIRONMENT")
            .unwrap_or_else(|_| "development".to_string());

        match env.to_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "testnet" | "test" => Ok(Environment::Testnet),
            "production" | "prod" => Ok(Environment::Production),
            _ => bail!("Unknown environment: {}", env),
        }
    }

    fn parse_delay(var: &str, default: Duration) -> Result<Duration> {
        match std::env::var(var) {
            Ok(raw) => raw
                .parse::<u64>()
                .map(Duration::from_millis)
                .with_context(|| format!("Invalid {}", var)),
            Err(_) => Ok(default),
        }
    }

    fn validate(&self) -> Result<()> {
        if let Some(url) = &self.redis_url {
            if !url.starts_with("redis://") && !url.starts_with("rediss://") {
                bail!("REDIS_URL must be a redis:// or rediss:// URL");
            }
        }

        if self.environment == Environment::Production && self.redis_url.is_none() {
            bail!("REDIS_URL required in production");
        }

        tracing::info!(
            "Configuration validated for {:?} environment",
            self.environment
        );

        Ok(())
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
