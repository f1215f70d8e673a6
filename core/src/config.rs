//! Ledger configuration (TOML)
//!
//! Every section has defaults, so an empty file yields the stock tiers:
//!
//! ```toml
//! [tiers.basic]
//! conversion_ratio = 0.001
//! min_amount = 10
//! max_amount = 10000
//! # ...
//!
//! [staking]
//! emergency_penalty_percent = 50.0
//! treasury_share_percent = 51.0
//!
//! [governance]
//! min_proposal_balance = "10"
//! voting_period_days = 7
//! ```

use crate::amount::{self, Amount};
use crate::token::{TierTable, TokenClass};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid {field}: {message}")]
    Invalid { field: String, message: String },
}

fn invalid(field: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field: field.into(),
        message: message.into(),
    }
}

/// Where emergency-unstake penalties go
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StakingPolicy {
    /// Share of principal forfeited on an emergency exit
    pub emergency_penalty_percent: f64,
    /// Share of the non-burned penalty routed to the treasury; the rest
    /// stays in the staking pool
    pub treasury_share_percent: f64,
    pub treasury_account: String,
    pub staking_pool_account: String,
}

impl Default for StakingPolicy {
    fn default() -> Self {
        Self {
            emergency_penalty_percent: 50.0,
            treasury_share_percent: 51.0,
            treasury_account: "treasury".to_string(),
            staking_pool_account: "staking-pool".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernancePolicy {
    /// Premium balance required to open a proposal
    #[serde(with = "amount::as_decimal")]
    pub min_proposal_balance: Amount,
    pub voting_period_days: u32,
}

impl Default for GovernancePolicy {
    fn default() -> Self {
        Self {
            min_proposal_balance: Amount::from_tokens(10),
            voting_period_days: 7,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardPolicy {
    /// Reference value at which eligible accounts are paid in Premium
    #[serde(with = "amount::as_decimal")]
    pub premium_threshold: Amount,
    pub founder_account: String,
    /// Founder's share of each settled reward's reference value
    pub founder_share_percent: f64,
}

impl Default for RewardPolicy {
    fn default() -> Self {
        Self {
            premium_threshold: Amount::from_minor(5_000_000), // 0.05
            founder_account: "founder".to_string(),
            founder_share_percent: 51.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettlementPolicy {
    pub batch_interval_secs: u64,
    pub max_batch_size: usize,
}

impl Default for SettlementPolicy {
    fn default() -> Self {
        Self {
            batch_interval_secs: 3600,
            max_batch_size: 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub tiers: TierTable,
    pub staking: StakingPolicy,
    pub governance: GovernancePolicy,
    pub rewards: RewardPolicy,
    pub settlement: SettlementPolicy,
}

impl LedgerConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: LedgerConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for class in TokenClass::ALL {
            let tier = self.tiers.get(class);
            let field = |name: &str| format!("tiers.{}.{}", class.to_string().to_lowercase(), name);

            if tier.ratio_amount().is_none() {
                return Err(invalid(
                    field("conversion_ratio"),
                    format!("{} must be a positive number", tier.conversion_ratio),
                ));
            }
            if tier.min_amount > tier.max_amount {
                return Err(invalid(
                    field("min_amount"),
                    format!("{} exceeds max_amount {}", tier.min_amount, tier.max_amount),
                ));
            }
            check_percent(&field("burn_rate_percent"), tier.burn_rate_percent)?;
            if !tier.staking.apr_percent.is_finite() || tier.staking.apr_percent < 0.0 {
                return Err(invalid(field("staking.apr_percent"), "must be >= 0"));
            }
            if tier.governance.can_vote && tier.governance.vote_weight_multiplier == 0 {
                return Err(invalid(
                    field("governance.vote_weight_multiplier"),
                    "voting tiers need a multiplier of at least 1",
                ));
            }
        }

        check_percent(
            "staking.emergency_penalty_percent",
            self.staking.emergency_penalty_percent,
        )?;
        check_percent(
            "staking.treasury_share_percent",
            self.staking.treasury_share_percent,
        )?;
        check_percent(
            "rewards.founder_share_percent",
            self.rewards.founder_share_percent,
        )?;

        for (field, account) in [
            ("staking.treasury_account", &self.staking.treasury_account),
            ("staking.staking_pool_account", &self.staking.staking_pool_account),
            ("rewards.founder_account", &self.rewards.founder_account),
        ] {
            if account.trim().is_empty() {
                return Err(invalid(field, "account id must not be empty"));
            }
        }

        if self.governance.voting_period_days == 0 {
            return Err(invalid("governance.voting_period_days", "must be at least 1"));
        }
        if self.settlement.batch_interval_secs == 0 {
            return Err(invalid("settlement.batch_interval_secs", "must be at least 1"));
        }
        if self.settlement.max_batch_size == 0 {
            return Err(invalid("settlement.max_batch_size", "must be at least 1"));
        }

        Ok(())
    }
}

fn check_percent(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(invalid(field, format!("{} is outside 0..=100", value)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_file_gives_defaults() {
        let config = LedgerConfig::from_toml_str("").unwrap();
        assert_eq!(config, LedgerConfig::default());
        assert_eq!(config.governance.voting_period_days, 7);
        assert_eq!(config.staking.emergency_penalty_percent, 50.0);
    }

    #[test]
    fn test_partial_override() {
        let config = LedgerConfig::from_toml_str(
            r#"
            [staking]
            treasury_share_percent = 60.0

            [governance]
            min_proposal_balance = "25.5"
            "#,
        )
        .unwrap();

        assert_eq!(config.staking.treasury_share_percent, 60.0);
        assert_eq!(config.staking.treasury_account, "treasury");
        assert_eq!(
            config.governance.min_proposal_balance,
            "25.5".parse::<Amount>().unwrap()
        );
    }

    #[test]
    fn test_rejects_bad_ratio() {
        let mut config = LedgerConfig::default();
        config.tiers.basic.conversion_ratio = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field, .. }) if field == "tiers.basic.conversion_ratio"
        ));
    }

    #[test]
    fn test_rejects_out_of_range_percent() {
        let mut config = LedgerConfig::default();
        config.staking.treasury_share_percent = 120.0;
        assert!(config.validate().is_err());

        let mut config = LedgerConfig::default();
        config.tiers.premium.burn_rate_percent = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_inverted_bounds() {
        let mut config = LedgerConfig::default();
        config.tiers.premium.min_amount = Amount::from_tokens(1000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[settlement]\nbatch_interval_secs = 60").unwrap();

        let config = LedgerConfig::load(file.path()).unwrap();
        assert_eq!(config.settlement.batch_interval_secs, 60);
        assert_eq!(config.settlement.max_batch_size, 500);
    }
}
