//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,
    /// Invoice-registry verifier configuration.
    pub registry: RegistryConfig,
    /// Ledger engine configuration.
    pub ledger: LedgerConfig,
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// Invoice-registry verifier configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
    /// Base URL of the invoice-registry lookup service.
    pub base_url: String,
    /// Request timeout in seconds.
    #[serde(default = "default_registry_timeout")]
    pub timeout_secs: u64,
}

fn default_registry_timeout() -> u64 {
    10
}

/// Ledger engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LedgerConfig {
    /// Default currency for vouchers and open items.
    #[serde(default = "default_currency")]
    pub default_currency: String,
    /// Time-to-live for cached account metadata, in seconds.
    #[serde(default = "default_account_meta_ttl")]
    pub account_meta_ttl_secs: u64,
    /// Maximum number of cached account metadata entries.
    #[serde(default = "default_account_meta_capacity")]
    pub account_meta_capacity: u64,
}

fn default_currency() -> String {
    "JPY".to_string()
}

fn default_account_meta_ttl() -> u64 {
    300 // 5 minutes
}

fn default_account_meta_capacity() -> u64 {
    10_000
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("KICHO").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_applies_defaults() {
        let config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [database]
                url = "postgres://localhost/kicho"

                [registry]
                base_url = "https://registry.example.test"

                [ledger]
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(app.database.max_connections, 10);
        assert_eq!(app.database.min_connections, 1);
        assert_eq!(app.registry.timeout_secs, 10);
        assert_eq!(app.ledger.default_currency, "JPY");
        assert_eq!(app.ledger.account_meta_ttl_secs, 300);
        assert_eq!(app.ledger.account_meta_capacity, 10_000);
    }

    #[test]
    fn test_explicit_values_win() {
        let config = config::Config::builder()
            .add_source(config::File::from_str(
                r#"
                [database]
                url = "postgres://localhost/kicho"
                max_connections = 32

                [registry]
                base_url = "https://registry.example.test"
                timeout_secs = 3

                [ledger]
                default_currency = "USD"
                "#,
                config::FileFormat::Toml,
            ))
            .build()
            .unwrap();

        let app: AppConfig = config.try_deserialize().unwrap();
        assert_eq!(app.database.max_connections, 32);
        assert_eq!(app.registry.timeout_secs, 3);
        assert_eq!(app.ledger.default_currency, "USD");
    }
}
