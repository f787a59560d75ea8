//! API configuration

use domain_sampling::SamplingConfig;
use serde::Deserialize;

/// API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// JWT secret for authentication
    pub jwt_secret: String,
    /// JWT expiration in seconds
    pub jwt_expiration_secs: u64,
    /// Database URL
    pub database_url: String,
    /// Log level
    pub log_level: String,
    /// Sampling service tunables, read from `API_SAMPLING__*`
    pub sampling: SamplingConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_secs: 3600,
            database_url: "postgres://localhost/claim_sampling".to_string(),
            log_level: "info".to_string(),
            sampling: SamplingConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Loads configuration from environment
    ///
    /// Top-level keys use the `API_` prefix (`API_PORT`); nested sampling
    /// keys use a double underscore (`API_SAMPLING__EXTRAPOLATION_STRATEGY`).
    pub fn from_env() -> Result<Self, config::ConfigError> {
        config::Config::builder()
            .add_source(
                config::Environment::with_prefix("API")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Returns the server address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain_sampling::ExtrapolationStrategy;

    #[test]
    fn test_defaults() {
        let config = ApiConfig::default();
        assert_eq!(config.server_addr(), "0.0.0.0:8080");
        assert_eq!(config.sampling.amount_scale, 2);
        assert_eq!(config.sampling.extrapolation_strategy, ExtrapolationStrategy::Deduction);
    }

    #[test]
    fn test_partial_document_keeps_defaults() {
        let config: ApiConfig = serde_json::from_value(serde_json::json!({
            "port": 9000,
            "sampling": { "random_seed": 42 }
        }))
        .unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.sampling.random_seed, Some(42));
        assert_eq!(config.sampling.task_source, "claim_sampling");
    }
}
