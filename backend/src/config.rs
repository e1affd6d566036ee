//! Configuration management for the fabrication operations backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with FABOPS__ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::cutting::CuttingOptions;
use shared::shortage::ShortageThresholds;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT verification configuration
    pub jwt: JwtConfig,

    /// Shortage classification thresholds
    pub inventory: InventoryConfig,

    /// Stock-cutting defaults
    pub cutting: CuttingConfig,

    /// Bookkeeping system notification
    pub bookkeeping: BookkeepingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret shared with the identity provider
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InventoryConfig {
    /// Low-stock floor for parts without a reorder point
    pub min_stock_floor: Option<Decimal>,

    /// Projected urgency when free stock is below projected demand times this
    pub projected_risk_ratio: Decimal,

    /// Include healthy parts in the alert list
    pub include_healthy: bool,
}

impl InventoryConfig {
    pub fn thresholds(&self) -> ShortageThresholds {
        ShortageThresholds {
            min_stock_floor: self.min_stock_floor,
            projected_risk_ratio: self.projected_risk_ratio,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct CuttingConfig {
    /// Saw kerf in inches
    pub kerf: Decimal,

    /// Percentage within which fewer distinct stock lengths are preferred
    pub sku_tolerance_percent: Decimal,
}

impl CuttingConfig {
    pub fn options(&self) -> CuttingOptions {
        CuttingOptions {
            kerf: self.kerf,
            sku_tolerance_percent: self.sku_tolerance_percent,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct BookkeepingConfig {
    /// Notification endpoint; notifications are skipped when unset
    pub endpoint: Option<String>,

    /// API key sent as a bearer token
    pub api_key: Option<String>,

    /// Request timeout in seconds; confirmation responses wait at most this long
    pub timeout_secs: u64,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("FABOPS_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("inventory.projected_risk_ratio", "1")?
            .set_default("inventory.include_healthy", false)?
            .set_default("cutting.kerf", "0")?
            .set_default("cutting.sku_tolerance_percent", "2")?
            .set_default("bookkeeping.timeout_secs", 3)?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (FABOPS__ prefix)
            .add_source(
                Environment::with_prefix("FABOPS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
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

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            min_stock_floor: None,
            projected_risk_ratio: Decimal::ONE,
            include_healthy: false,
        }
    }
}

impl Default for CuttingConfig {
    fn default() -> Self {
        let options = CuttingOptions::default();
        Self {
            kerf: options.kerf,
            sku_tolerance_percent: options.sku_tolerance_percent,
        }
    }
}
