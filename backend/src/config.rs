//! Configuration management for the Comanda Restaurant Operations Platform
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with COMANDA_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Ledger store configuration
    pub store: StoreConfig,

    /// Billing configuration
    pub billing: BillingConfig,

    /// Order policy configuration
    pub orders: OrderPolicyConfig,

    /// JWT authentication configuration
    pub auth: AuthConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    /// Maximum attempts for an optimistic document transaction before
    /// surfacing Unavailable to the caller
    pub max_txn_attempts: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BillingConfig {
    /// Tax rate as a fraction (0.16 = 16%), applied at presentation time
    /// only; stored subtotals stay tax-exclusive
    pub tax_rate: Decimal,
}

#[derive(Debug, Deserialize, Clone)]
pub struct OrderPolicyConfig {
    /// Whether an order with zero items may be closed as paid
    pub allow_empty_close: bool,

    /// Whether closing an order debits recipe ingredients from inventory
    pub auto_debit_inventory: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Secret key for validating JWT tokens issued by the auth service
    pub jwt_secret: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("COMANDA_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("store.max_txn_attempts", 5)?
            .set_default("billing.tax_rate", "0.16")?
            .set_default("orders.allow_empty_close", true)?
            .set_default("orders.auto_debit_inventory", false)?
            .set_default("auth.jwt_secret", "development-secret-key")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (COMANDA_ prefix)
            .add_source(
                Environment::with_prefix("COMANDA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = config.try_deserialize()?;
        shared::validation::validate_tax_rate(config.billing.tax_rate)
            .map_err(|msg| ConfigError::Message(msg.to_string()))?;
        Ok(config)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            billing: BillingConfig::default(),
            orders: OrderPolicyConfig::default(),
            auth: AuthConfig {
                jwt_secret: "development-secret-key".to_string(),
            },
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            max_txn_attempts: 5,
        }
    }
}

impl Default for BillingConfig {
    fn default() -> Self {
        Self {
            // Observed production rate; override per tenant deployment
            tax_rate: Decimal::new(16, 2),
        }
    }
}

impl Default for OrderPolicyConfig {
    fn default() -> Self {
        Self {
            allow_empty_close: true,
            auto_debit_inventory: false,
        }
    }
}
