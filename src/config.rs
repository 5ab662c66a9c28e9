use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL (overridden by `DATABASE_URL`)
    #[serde(default)]
    pub postgres_url: Option<String>,
    pub auth: AuthConfig,
    #[serde(default)]
    pub transfer: TransferConfig,
    #[serde(default)]
    pub central_bank: CentralBankConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthConfig {
    /// HS256 signing secret (overridden by `JWT_SECRET`)
    #[serde(default)]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_hours")]
    pub token_ttl_hours: i64,
}

fn default_token_ttl_hours() -> i64 {
    24
}

/// Unit-of-work timeout and retry policy for money movements
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct TransferConfig {
    pub op_timeout_ms: u64,
    pub max_attempts: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            op_timeout_ms: 5_000,
            max_attempts: 3,
            base_backoff_ms: 50,
            max_backoff_ms: 1_000,
        }
    }
}

impl TransferConfig {
    pub fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

/// Stubbed central-bank key rate lookup
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CentralBankConfig {
    /// Key rate in percent, as a decimal string
    pub key_rate: String,
    /// Percentage points the bank adds on top of the key rate
    pub margin: String,
}

impl Default for CentralBankConfig {
    fn default() -> Self {
        Self {
            key_rate: "16.00".to_string(),
            margin: "5.00".to_string(),
        }
    }
}

impl AppConfig {
    /// Load `config/{env}.yaml`, then apply environment overrides
    pub fn load(env: &str) -> Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        let mut config: AppConfig =
            serde_yaml::from_str(&content).context("Failed to parse config yaml")?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            self.postgres_url = Some(url);
        }
        if let Ok(secret) = std::env::var("JWT_SECRET") {
            self.auth.jwt_secret = secret;
        }
        if let Some(port) = std::env::var("HTTP_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
        {
            self.gateway.port = port;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.auth.jwt_secret.is_empty() {
            bail!("JWT secret is required (auth.jwt_secret or JWT_SECRET)");
        }
        if self.gateway.port == 0 {
            bail!("gateway.port must be non-zero");
        }
        if self.transfer.max_attempts == 0 {
            bail!("transfer.max_attempts must be at least 1");
        }
        Ok(())
    }
}
