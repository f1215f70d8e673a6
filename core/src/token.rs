//! Token classes and their tier parameters

use crate::amount::{self, Amount};
use crate::error::LedgerError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TokenClass {
    Basic,   // BBGT
    Premium, // 918T
}

impl TokenClass {
    pub const ALL: [TokenClass; 2] = [TokenClass::Basic, TokenClass::Premium];

    pub fn symbol(&self) -> &'static str {
        match self {
            TokenClass::Basic => "BBGT",
            TokenClass::Premium => "918T",
        }
    }
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenClass::Basic => write!(f, "Basic"),
            TokenClass::Premium => write!(f, "Premium"),
        }
    }
}

impl FromStr for TokenClass {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "basic" | "bbgt" => Ok(TokenClass::Basic),
            "premium" | "918t" => Ok(TokenClass::Premium),
            _ => Err(LedgerError::InvalidTokenClass(s.to_string())),
        }
    }
}

/// One value per token class
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerClass<T> {
    pub basic: T,
    pub premium: T,
}

impl<T> PerClass<T> {
    pub fn get(&self, class: TokenClass) -> &T {
        match class {
            TokenClass::Basic => &self.basic,
            TokenClass::Premium => &self.premium,
        }
    }

    pub fn get_mut(&mut self, class: TokenClass) -> &mut T {
        match class {
            TokenClass::Basic => &mut self.basic,
            TokenClass::Premium => &mut self.premium,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TokenClass, &T)> {
        [
            (TokenClass::Basic, &self.basic),
            (TokenClass::Premium, &self.premium),
        ]
        .into_iter()
    }
}

/// Liquid balances of one account
pub type Balances = PerClass<Amount>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StakingTerms {
    pub enabled: bool,
    pub min_lock_days: u32,
    pub apr_percent: f64,
    pub compounding: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GovernanceRights {
    pub can_vote: bool,
    pub vote_weight_multiplier: u32,
}

/// Static parameters of a token class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenTierConfig {
    pub description: String,
    pub symbol: String,
    /// Reference value per token
    pub conversion_ratio: f64,
    #[serde(with = "amount::as_decimal")]
    pub min_amount: Amount,
    #[serde(with = "amount::as_decimal")]
    pub max_amount: Amount,
    #[serde(with = "amount::as_decimal")]
    pub initial_supply: Amount,
    pub staking: StakingTerms,
    pub governance: GovernanceRights,
    pub burn_rate_percent: f64,
}

impl TokenTierConfig {
    /// BBGT: 1 reference unit = 1000 tokens
    pub fn basic() -> Self {
        Self {
            description: "Basic tier token".to_string(),
            symbol: TokenClass::Basic.symbol().to_string(),
            conversion_ratio: 0.001,
            min_amount: Amount::from_tokens(10),
            max_amount: Amount::from_tokens(10_000),
            initial_supply: Amount::from_tokens(1_000_000),
            staking: StakingTerms {
                enabled: true,
                min_lock_days: 30,
                apr_percent: 12.0,
                compounding: false,
            },
            governance: GovernanceRights {
                can_vote: false,
                vote_weight_multiplier: 1,
            },
            burn_rate_percent: 0.5,
        }
    }

    /// 918T: 1 reference unit = 100 tokens
    pub fn premium() -> Self {
        Self {
            description: "Premium tier token".to_string(),
            symbol: TokenClass::Premium.symbol().to_string(),
            conversion_ratio: 0.01,
            min_amount: Amount::from_tokens(1),
            max_amount: Amount::from_tokens(918),
            initial_supply: Amount::from_tokens(918_000),
            staking: StakingTerms {
                enabled: true,
                min_lock_days: 90,
                apr_percent: 24.0,
                compounding: true,
            },
            governance: GovernanceRights {
                can_vote: true,
                vote_weight_multiplier: 10,
            },
            burn_rate_percent: 1.0,
        }
    }

    /// Conversion ratio in minor units of reference value. `None` when the
    /// ratio is not a positive, representable number.
    pub fn ratio_amount(&self) -> Option<Amount> {
        if !self.conversion_ratio.is_finite() || self.conversion_ratio <= 0.0 {
            return None;
        }
        Amount::from_f64(self.conversion_ratio).filter(|ratio| !ratio.is_zero())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    #[serde(default = "TokenTierConfig::basic")]
    pub basic: TokenTierConfig,
    #[serde(default = "TokenTierConfig::premium")]
    pub premium: TokenTierConfig,
}

impl TierTable {
    pub fn get(&self, class: TokenClass) -> &TokenTierConfig {
        match class {
            TokenClass::Basic => &self.basic,
            TokenClass::Premium => &self.premium,
        }
    }
}

impl Default for TierTable {
    fn default() -> Self {
        Self {
            basic: TokenTierConfig::basic(),
            premium: TokenTierConfig::premium(),
        }
    }
}
