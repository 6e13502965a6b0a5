use rust_decimal::Decimal;
use serde::Deserialize;

use crate::models::Issuer;
use crate::observability::{LogConfig, LogFormat};

/// Values below this magnitude are treated as zero by audits and netting.
pub const DEFAULT_EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub ledger: LedgerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LedgerSettings {
    /// Reserved account that issuances originate from.
    pub issuer_account_id: String,
    pub epsilon: Decimal,
    /// Reject entries whose source cannot cover the amount.
    pub require_funds: bool,
}

impl LedgerSettings {
    pub fn issuer(&self) -> Issuer {
        Issuer::new(self.issuer_account_id.as_str())
    }
}

impl Default for LedgerSettings {
    fn default() -> Self {
        Self {
            issuer_account_id: Issuer::DEFAULT_ID.to_string(),
            epsilon: DEFAULT_EPSILON,
            require_funds: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    pub level: String,
    /// `pretty`, `compact` or `json`.
    pub format: String,
    #[serde(default = "enabled")]
    pub include_target: bool,
    #[serde(default)]
    pub include_file: bool,
    #[serde(default)]
    pub include_line: bool,
}

fn enabled() -> bool {
    true
}

impl LoggingSettings {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            level: self.level.clone(),
            format: LogFormat::from(self.format.as_str()),
            include_target: self.include_target,
            include_file: self.include_file,
            include_line: self.include_line,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheSettings {
    pub enabled: bool,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Settings {
    pub fn new() -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            .set_default("ledger.issuer_account_id", Issuer::DEFAULT_ID)?
            .set_default("ledger.epsilon", DEFAULT_EPSILON.to_string())?
            .set_default("ledger.require_funds", false)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .set_default("logging.include_target", true)?
            .set_default("logging.include_file", false)?
            .set_default("logging.include_line", false)?
            .set_default("cache.enabled", true)?
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("APP").separator("__"));

        builder.build()?.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_epsilon() {
        assert_eq!(DEFAULT_EPSILON, dec!(0.01));
        assert_eq!(LedgerSettings::default().epsilon, dec!(0.01));
    }

    #[test]
    fn test_settings_load_with_defaults() {
        let settings = Settings::new().expect("defaults should always load");

        assert_eq!(settings.ledger.issuer().account_id().as_str(), "system");
        assert_eq!(settings.ledger.epsilon, dec!(0.01));
        assert!(settings.cache.enabled);
        assert!(settings.logging.include_target);
        assert!(!settings.logging.include_line);
    }

    #[test]
    fn test_logging_settings_map_to_log_config() {
        let logging = LoggingSettings {
            level: "debug".to_string(),
            format: "json".to_string(),
            include_target: false,
            include_file: true,
            include_line: true,
        };

        let config = logging.to_log_config();
        assert_eq!(config.level, "debug");
        assert_eq!(config.format, LogFormat::Json);
        assert!(!config.include_target);
        assert!(config.include_file);
        assert!(config.include_line);
    }
}
