//! Conversion between reference value and tokens

use ledger_core::{Amount, LedgerError, Result, TokenClass, TokenTierConfig};

fn ratio(tier: &TokenTierConfig, class: TokenClass) -> Result<Amount> {
    tier.ratio_amount()
        .ok_or(LedgerError::InvalidConversionRatio {
            class,
            ratio: tier.conversion_ratio,
        })
}

/// `value / conversion_ratio`, clamped to the tier's `[min_amount, max_amount]`
pub fn convert_value_to_token(
    tier: &TokenTierConfig,
    class: TokenClass,
    value: Amount,
) -> Result<Amount> {
    let ratio = ratio(tier, class)?;
    let tokens = value
        .checked_div_amount(ratio)
        .ok_or_else(|| LedgerError::Overflow(format!("converting {} to {}", value, class)))?;
    Ok(tokens.clamp_to(tier.min_amount, tier.max_amount))
}

/// Reference value of a token quantity; no clamping
pub fn convert_token_to_value(
    tier: &TokenTierConfig,
    class: TokenClass,
    tokens: Amount,
) -> Result<Amount> {
    let ratio = ratio(tier, class)?;
    tokens
        .checked_mul_amount(ratio)
        .ok_or_else(|| LedgerError::Overflow(format!("valuing {} {}", tokens, class)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn value(s: &str) -> Amount {
        s.parse().unwrap()
    }

    #[test]
    fn test_basic_conversion() {
        let tier = TokenTierConfig::basic();
        assert_eq!(
            convert_value_to_token(&tier, TokenClass::Basic, value("0.05")).unwrap(),
            Amount::from_tokens(50)
        );
    }

    #[test]
    fn test_conversion_is_clamped() {
        let basic = TokenTierConfig::basic();
        // 0.001 -> 1 token, below the minimum of 10
        assert_eq!(
            convert_value_to_token(&basic, TokenClass::Basic, value("0.001")).unwrap(),
            Amount::from_tokens(10)
        );

        let premium = TokenTierConfig::premium();
        // 100 -> 10_000 tokens, above the maximum of 918
        assert_eq!(
            convert_value_to_token(&premium, TokenClass::Premium, value("100")).unwrap(),
            Amount::from_tokens(918)
        );
    }

    #[test]
    fn test_invalid_ratio() {
        let mut tier = TokenTierConfig::premium();
        tier.conversion_ratio = 0.0;
        assert_eq!(
            convert_value_to_token(&tier, TokenClass::Premium, value("1")),
            Err(LedgerError::InvalidConversionRatio {
                class: TokenClass::Premium,
                ratio: 0.0,
            })
        );
        assert!(convert_token_to_value(&tier, TokenClass::Premium, value("1")).is_err());
    }

    #[test]
    fn test_token_to_value() {
        let tier = TokenTierConfig::basic();
        assert_eq!(
            convert_token_to_value(&tier, TokenClass::Basic, Amount::from_tokens(50)).unwrap(),
            value("0.05")
        );
    }
}
