//! Application configuration management.

use rust_decimal::Decimal;
use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Workflow engine configuration.
    #[serde(default)]
    pub engine: EngineConfig,
    /// Risk scoring configuration.
    #[serde(default)]
    pub risk: RiskSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Workflow engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Interval between escalation sweeps, in seconds.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
    /// SLA deadline for steps that do not configure their own timeout, in hours.
    #[serde(default = "default_step_timeout")]
    pub default_step_timeout_hours: i64,
}

fn default_sweep_interval() -> u64 {
    300 // 5 minutes
}

fn default_step_timeout() -> i64 {
    48 // 2 days
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval(),
            default_step_timeout_hours: default_step_timeout(),
        }
    }
}

/// Risk scoring configuration.
///
/// Score thresholds and factor triggers are tunable here rather than
/// hard-coded so deployments can calibrate without a code change.
#[derive(Debug, Clone, Deserialize)]
pub struct RiskSettings {
    /// Scores above this value are classified as high risk.
    #[serde(default = "default_high_score")]
    pub high_score: u32,
    /// Scores above this value (and at or below `high_score`) are medium risk.
    #[serde(default = "default_medium_score")]
    pub medium_score: u32,
    /// Transaction amounts above this value trigger the high-value factor.
    #[serde(default = "default_high_value_threshold")]
    pub high_value_threshold: Decimal,
    /// Base score applied to bulk invoice runs.
    #[serde(default = "default_bulk_base_score")]
    pub bulk_base_score: u32,
    /// Counterparty counts above this value trigger the fan-out factor.
    #[serde(default = "default_fan_out_threshold")]
    pub fan_out_threshold: u32,
    /// Compliance scores below this value trigger the compliance factor.
    #[serde(default = "default_compliance_floor")]
    pub compliance_floor: Decimal,
}

fn default_high_score() -> u32 {
    60
}

fn default_medium_score() -> u32 {
    30
}

fn default_high_value_threshold() -> Decimal {
    Decimal::new(100_000, 0)
}

fn default_bulk_base_score() -> u32 {
    15
}

fn default_fan_out_threshold() -> u32 {
    50
}

fn default_compliance_floor() -> Decimal {
    Decimal::new(70, 0)
}

impl Default for RiskSettings {
    fn default() -> Self {
        Self {
            high_score: default_high_score(),
            medium_score: default_medium_score(),
            high_value_threshold: default_high_value_threshold(),
            bulk_base_score: default_bulk_base_score(),
            fan_out_threshold: default_fan_out_threshold(),
            compliance_floor: default_compliance_floor(),
        }
    }
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
            .add_source(config::Environment::with_prefix("FUELGATE").separator("__"))
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.sweep_interval_secs, 300);
        assert_eq!(cfg.default_step_timeout_hours, 48);
    }

    #[test]
    fn test_risk_defaults() {
        let cfg = RiskSettings::default();
        assert_eq!(cfg.high_score, 60);
        assert_eq!(cfg.medium_score, 30);
        assert_eq!(cfg.bulk_base_score, 15);
        assert!(cfg.high_value_threshold > Decimal::ZERO);
    }
}
