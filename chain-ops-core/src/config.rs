use std::str::FromStr;
use std::time::Duration;

use chain_ops_common::RetryPolicy;
use config::{Config, ConfigError, Environment, File};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

use crate::blockchain::calls::MAX_IDENTITY_DISPLAY_LEN;

/// Perbill units per whole percent
const PERBILL_PER_PERCENT: u32 = 10_000_000;

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// How stash and controller receive their initial funds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FundingMode {
    /// HTTP asset request to the network faucet
    #[default]
    Faucet,
    /// Transfer from the root account
    Endowment,
}

#[derive(Debug, Deserialize)]
struct RawValidatorSettings {
    provider: Option<String>,
    root_account_mnemonic: Option<String>,
    stash_account_mnemonic: Option<String>,
    controller_account_mnemonic: Option<String>,
    bond_value: Option<String>,
    reward_commission: Option<String>,
    max_retry_attempts: Option<u32>,
    wait_seconds: Option<u64>,
    request_assets_endpoint: Option<String>,
    network: Option<String>,
    poll_interval_seconds: Option<u64>,
    funding_timeout_seconds: Option<u64>,
    funding_mode: Option<FundingMode>,
    endowment_value: Option<String>,
    stash_identity: Option<String>,
    controller_identity: Option<String>,
}

/// Everything the validator setup workflow needs, validated up front
#[derive(Debug, Clone)]
pub struct ValidatorSettings {
    pub provider: String,
    pub root_account_mnemonic: String,
    pub stash_account_mnemonic: String,
    pub controller_account_mnemonic: String,
    /// Bond in planck
    pub bond_value: u128,
    /// Commission in Perbill
    pub commission: u32,
    /// Bounds the node sync check
    pub retry: RetryPolicy,
    pub request_assets_endpoint: String,
    pub network: String,
    pub poll_interval: Duration,
    /// `None` waits for funds indefinitely
    pub funding_timeout: Option<Duration>,
    pub funding_mode: FundingMode,
    pub endowment_value: u128,
    pub stash_identity: Option<String>,
    pub controller_identity: Option<String>,
}

impl ValidatorSettings {
    /// Load from `config/{RUN_MODE}` (optional) overridden by the environment
    pub fn new() -> Result<Self, SettingsError> {
        Self::from_config(layered_config()?)
    }

    pub fn from_config(config: Config) -> Result<Self, SettingsError> {
        let raw: RawValidatorSettings = config.try_deserialize()?;

        Ok(Self {
            provider: required(raw.provider, "PROVIDER")?,
            root_account_mnemonic: required(raw.root_account_mnemonic, "ROOT_ACCOUNT_MNEMONIC")?,
            stash_account_mnemonic: required(raw.stash_account_mnemonic, "STASH_ACCOUNT_MNEMONIC")?,
            controller_account_mnemonic: required(
                raw.controller_account_mnemonic,
                "CONTROLLER_ACCOUNT_MNEMONIC",
            )?,
            bond_value: parse_planck(&required(raw.bond_value, "BOND_VALUE")?, "BOND_VALUE")?,
            commission: commission_to_perbill(&required(raw.reward_commission, "REWARD_COMMISSION")?)?,
            retry: RetryPolicy::new(
                raw.max_retry_attempts.ok_or(SettingsError::Missing("MAX_RETRY_ATTEMPTS"))?,
                raw.wait_seconds.ok_or(SettingsError::Missing("WAIT_SECONDS"))?,
            ),
            request_assets_endpoint: required(raw.request_assets_endpoint, "REQUEST_ASSETS_ENDPOINT")?,
            network: required(raw.network, "NETWORK")?,
            poll_interval: Duration::from_secs(raw.poll_interval_seconds.unwrap_or(1)),
            funding_timeout: match raw.funding_timeout_seconds.unwrap_or(600) {
                0 => None,
                secs => Some(Duration::from_secs(secs)),
            },
            funding_mode: raw.funding_mode.unwrap_or_default(),
            endowment_value: match raw.endowment_value {
                Some(value) => parse_planck(&value, "ENDOWMENT_VALUE")?,
                None => 1_000_000_000_000_000,
            },
            stash_identity: identity(raw.stash_identity, "STASH_IDENTITY")?,
            controller_identity: identity(raw.controller_identity, "CONTROLLER_IDENTITY")?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RawNetworkSettings {
    provider: Option<String>,
    network_decimals: Option<u32>,
    era_time: Option<i64>,
}

/// Settings for the tokenomics commands
#[derive(Debug, Clone)]
pub struct NetworkSettings {
    pub provider: String,
    /// Decimal places of one whole token
    pub decimals: u32,
    /// Era length in minutes
    pub era_time: Option<i64>,
}

impl NetworkSettings {
    pub fn new() -> Result<Self, SettingsError> {
        Self::from_config(layered_config()?)
    }

    pub fn from_config(config: Config) -> Result<Self, SettingsError> {
        let raw: RawNetworkSettings = config.try_deserialize()?;
        let decimals = raw
            .network_decimals
            .ok_or(SettingsError::Missing("NETWORK_DECIMALS"))?;
        if decimals > 28 {
            return Err(SettingsError::Invalid {
                name: "NETWORK_DECIMALS",
                reason: format!("{} exceeds the supported precision of 28", decimals),
            });
        }

        if let Some(minutes) = raw.era_time.filter(|m| *m <= 0) {
            return Err(SettingsError::Invalid {
                name: "ERA_TIME",
                reason: format!("{} is not a positive number of minutes", minutes),
            });
        }

        Ok(Self {
            provider: required(raw.provider, "PROVIDER")?,
            decimals,
            era_time: raw.era_time,
        })
    }
}

fn layered_config() -> Result<Config, ConfigError> {
    let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

    Config::builder()
        .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
        .add_source(Environment::default())
        .build()
}

fn required(value: Option<String>, name: &'static str) -> Result<String, SettingsError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(SettingsError::Missing(name)),
    }
}

fn identity(value: Option<String>, name: &'static str) -> Result<Option<String>, SettingsError> {
    match value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
        Some(display) if display.len() > MAX_IDENTITY_DISPLAY_LEN => Err(SettingsError::Invalid {
            name,
            reason: format!("longer than {} bytes", MAX_IDENTITY_DISPLAY_LEN),
        }),
        other => Ok(other),
    }
}

fn parse_planck(value: &str, name: &'static str) -> Result<u128, SettingsError> {
    u128::from_str(value.trim()).map_err(|e| SettingsError::Invalid {
        name,
        reason: format!("'{}' is not a whole planck amount: {}", value, e),
    })
}

/// Percent (e.g. `5.5`) to Perbill
pub fn commission_to_perbill(percent: &str) -> Result<u32, SettingsError> {
    let invalid = |reason: String| SettingsError::Invalid {
        name: "REWARD_COMMISSION",
        reason,
    };

    let percent = Decimal::from_str(percent.trim())
        .map_err(|e| invalid(format!("'{}' is not a number: {}", percent, e)))?;
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err(invalid(format!("{} is outside 0..=100", percent)));
    }

    (percent * Decimal::from(PERBILL_PER_PERCENT))
        .round()
        .to_u32()
        .ok_or_else(|| invalid(format!("{} does not fit in Perbill", percent)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator_config(overrides: &[(&str, &str)]) -> Config {
        let mut builder = Config::builder()
            .set_override("provider", "ws://127.0.0.1:9944").unwrap()
            .set_override("root_account_mnemonic", "//Alice").unwrap()
            .set_override("stash_account_mnemonic", "//Alice//stash").unwrap()
            .set_override("controller_account_mnemonic", "//Bob").unwrap()
            .set_override("bond_value", "1000000000000").unwrap()
            .set_override("reward_commission", "10").unwrap()
            .set_override("max_retry_attempts", "5").unwrap()
            .set_override("wait_seconds", "2").unwrap()
            .set_override("request_assets_endpoint", "http://127.0.0.1:8080/assets").unwrap()
            .set_override("network", "devnet").unwrap();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_full_validator_settings() {
        let settings = ValidatorSettings::from_config(validator_config(&[])).unwrap();

        assert_eq!(settings.bond_value, 1_000_000_000_000);
        assert_eq!(settings.commission, 100_000_000);
        assert_eq!(settings.retry, RetryPolicy::new(5, 2));
        assert_eq!(settings.funding_mode, FundingMode::Faucet);
        assert_eq!(settings.funding_timeout, Some(Duration::from_secs(600)));
        assert!(settings.stash_identity.is_none());
    }

    #[test]
    fn test_missing_setting_names_the_variable() {
        let config = Config::builder()
            .set_override("provider", "ws://127.0.0.1:9944")
            .unwrap()
            .build()
            .unwrap();

        let err = ValidatorSettings::from_config(config).unwrap_err();
        assert!(matches!(err, SettingsError::Missing("ROOT_ACCOUNT_MNEMONIC")));
    }

    #[test]
    fn test_blank_setting_counts_as_missing() {
        let err = ValidatorSettings::from_config(validator_config(&[("network", "  ")])).unwrap_err();
        assert!(matches!(err, SettingsError::Missing("NETWORK")));
    }

    #[test]
    fn test_invalid_bond_value() {
        let err =
            ValidatorSettings::from_config(validator_config(&[("bond_value", "12.5")])).unwrap_err();
        assert!(matches!(err, SettingsError::Invalid { name: "BOND_VALUE", .. }));
    }

    #[test]
    fn test_zero_timeout_means_unbounded() {
        let settings = ValidatorSettings::from_config(validator_config(&[
            ("funding_timeout_seconds", "0"),
            ("funding_mode", "endowment"),
        ]))
        .unwrap();

        assert_eq!(settings.funding_timeout, None);
        assert_eq!(settings.funding_mode, FundingMode::Endowment);
    }

    #[test]
    fn test_commission_conversion() {
        assert_eq!(commission_to_perbill("0").unwrap(), 0);
        assert_eq!(commission_to_perbill("5.5").unwrap(), 55_000_000);
        assert_eq!(commission_to_perbill("100").unwrap(), 1_000_000_000);
        assert!(commission_to_perbill("101").is_err());
        assert!(commission_to_perbill("-1").is_err());
        assert!(commission_to_perbill("ten").is_err());
    }

    #[test]
    fn test_network_settings() {
        let config = Config::builder()
            .set_override("provider", "ws://127.0.0.1:9944").unwrap()
            .set_override("network_decimals", "10").unwrap()
            .set_override("era_time", "360").unwrap()
            .build()
            .unwrap();

        let settings = NetworkSettings::from_config(config).unwrap();
        assert_eq!(settings.decimals, 10);
        assert_eq!(settings.era_time, Some(360));
    }

    #[test]
    fn test_era_time_must_be_positive() {
        for minutes in ["0", "-360"] {
            let config = Config::builder()
                .set_override("provider", "ws://127.0.0.1:9944").unwrap()
                .set_override("network_decimals", "10").unwrap()
                .set_override("era_time", minutes).unwrap()
                .build()
                .unwrap();

            let err = NetworkSettings::from_config(config).unwrap_err();
            assert!(matches!(err, SettingsError::Invalid { name: "ERA_TIME", .. }));
        }
    }
}
