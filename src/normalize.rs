use std::collections::HashMap;

use once_cell::sync::Lazy;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::error::StatsError;
use crate::models::{NormalizedAmount, RawTx};

const WEI_DECIMALS: u32 = 18;

// Ethereum mainnet stablecoin contracts (lowercased) -> decimals
static DEFAULT_STABLE_TOKENS: Lazy<HashMap<&'static str, u32>> = Lazy::new(|| {
    HashMap::from([
        ("0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48", 6), // USDC
        ("0xdac17f958d2ee523a2206206994597c13d831ec7", 6), // USDT
    ])
});

/// Snapshot conversion rates, fixed for the lifetime of one process and
/// threaded into every report computation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct FixedRates {
    #[serde(rename = "ETH_EUR")]
    pub eth_eur: Decimal,
    #[serde(rename = "USD_EUR")]
    pub usd_eur: Decimal,
}

impl FixedRates {
    pub fn validate(&self) -> Result<(), StatsError> {
        if self.eth_eur <= Decimal::ZERO || self.usd_eur <= Decimal::ZERO {
            return Err(StatsError::Config(
                "conversion rates must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn eth_to_eur(&self, amount_eth: Decimal) -> Decimal {
        amount_eth * self.eth_eur
    }

    pub fn usd_to_eur(&self, amount_usd: Decimal) -> Decimal {
        amount_usd * self.usd_eur
    }
}

/// Allow-list of stable-value token contracts eligible for EUR conversion.
/// Anything outside it is silently dropped by the normalizer.
#[derive(Debug, Clone)]
pub struct StableTokens(HashMap<String, u32>);

impl Default for StableTokens {
    fn default() -> Self {
        Self(
            DEFAULT_STABLE_TOKENS
                .iter()
                .map(|(contract, decimals)| (contract.to_string(), *decimals))
                .collect(),
        )
    }
}

impl StableTokens {
    pub fn new(map: HashMap<String, u32>) -> Self {
        Self(
            map.into_iter()
                .map(|(contract, decimals)| (contract.to_lowercase(), decimals))
                .collect(),
        )
    }

    /// The filtering predicate: decimal precision for an allow-listed
    /// contract, `None` for anything else. Lookup is case-insensitive.
    pub fn decimals(&self, contract: &str) -> Option<u32> {
        self.0.get(&contract.to_lowercase()).copied()
    }
}

fn parse_units(raw: &str) -> Result<i128, StatsError> {
    let units: i128 = raw
        .trim()
        .parse()
        .map_err(|_| StatsError::Validation(format!("malformed integer amount: {raw:?}")))?;
    if units < 0 {
        return Err(StatsError::Validation(format!(
            "negative transfer amount: {raw:?}"
        )));
    }
    Ok(units)
}

fn scale_units(units: i128, decimals: u32) -> Result<Decimal, StatsError> {
    Decimal::try_from_i128_with_scale(units, decimals)
        .map_err(|_| StatsError::Validation(format!("amount out of range: {units}")))
}

/// Wei string -> whole ETH.
pub fn wei_to_eth(raw: &str) -> Result<Decimal, StatsError> {
    scale_units(parse_units(raw)?, WEI_DECIMALS)
}

/// Raw token units -> whole tokens at the contract's precision.
pub fn token_amount(raw: &str, decimals: u32) -> Result<Decimal, StatsError> {
    scale_units(parse_units(raw)?, decimals)
}

/// Normal/internal transfer -> EUR amount, or `None` when the zero-value
/// policy filters it out.
pub fn normalize_native(
    tx: &RawTx,
    exclude_zero: bool,
    rates: &FixedRates,
) -> Result<Option<NormalizedAmount>, StatsError> {
    let eth = wei_to_eth(&tx.value)?;
    if exclude_zero && eth.is_zero() {
        return Ok(None);
    }
    Ok(Some(NormalizedAmount {
        value: rates.eth_to_eur(eth),
        hash: tx.hash.clone(),
    }))
}

/// Token transfer -> EUR amount. Zero-value records and contracts outside
/// the allow-list are dropped, not errors.
pub fn normalize_token(
    tx: &RawTx,
    tokens: &StableTokens,
    rates: &FixedRates,
) -> Result<Option<NormalizedAmount>, StatsError> {
    let units = parse_units(&tx.value)?;
    if units == 0 {
        return Ok(None);
    }
    let decimals = match tx
        .contract_address
        .as_deref()
        .and_then(|contract| tokens.decimals(contract))
    {
        Some(d) => d,
        None => return Ok(None),
    };
    let amount_usd = scale_units(units, decimals)?;
    Ok(Some(NormalizedAmount {
        value: rates.usd_to_eur(amount_usd),
        hash: tx.hash.clone(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const USDC: &str = "0xa0b86991c6218b36c1d19d4a2e9eb0ce3606eb48";

    fn rates() -> FixedRates {
        FixedRates {
            eth_eur: Decimal::from_str("3659.00").unwrap(),
            usd_eur: Decimal::from_str("0.85").unwrap(),
        }
    }

    fn native(hash: &str, value: &str) -> RawTx {
        RawTx {
            hash: hash.to_string(),
            value: value.to_string(),
            contract_address: None,
        }
    }

    fn token(hash: &str, value: &str, contract: &str) -> RawTx {
        RawTx {
            hash: hash.to_string(),
            value: value.to_string(),
            contract_address: Some(contract.to_string()),
        }
    }

    #[test]
    fn wei_to_eth_scales_18_decimals() {
        assert_eq!(
            wei_to_eth("1500000000000000000").unwrap(),
            Decimal::from_str("1.5").unwrap()
        );
        assert_eq!(wei_to_eth("0").unwrap(), Decimal::ZERO);
    }

    #[test]
    fn malformed_amount_is_a_validation_error() {
        assert!(matches!(
            wei_to_eth("not-a-number"),
            Err(StatsError::Validation(_))
        ));
        assert!(matches!(wei_to_eth("-1"), Err(StatsError::Validation(_))));
    }

    #[test]
    fn native_zero_respects_exclusion_policy() {
        let tx = native("0xzero", "0");
        assert!(normalize_native(&tx, true, &rates()).unwrap().is_none());

        let kept = normalize_native(&tx, false, &rates()).unwrap().unwrap();
        assert_eq!(kept.value, Decimal::ZERO);
        assert_eq!(kept.hash, "0xzero");
    }

    #[test]
    fn native_converts_at_fixed_rate() {
        let tx = native("0xaaa", "2000000000000000000"); // 2 ETH
        let amount = normalize_native(&tx, false, &rates()).unwrap().unwrap();
        assert_eq!(amount.value, Decimal::from_str("7318.00").unwrap());
    }

    #[test]
    fn token_converts_at_contract_precision() {
        let tx = token("0xbbb", "2500000", USDC); // 2.5 USDC
        let amount = normalize_token(&tx, &StableTokens::default(), &rates())
            .unwrap()
            .unwrap();
        assert_eq!(amount.value, Decimal::from_str("2.125").unwrap());
    }

    #[test]
    fn token_contract_lookup_is_case_insensitive() {
        let tx = token("0xccc", "1000000", "0xA0B86991C6218B36C1D19D4A2E9EB0CE3606EB48");
        let amount = normalize_token(&tx, &StableTokens::default(), &rates()).unwrap();
        assert!(amount.is_some());
    }

    #[test]
    fn token_outside_allow_list_is_silently_dropped() {
        let tx = token("0xddd", "1000000", "0x0000000000000000000000000000000000000001");
        assert!(normalize_token(&tx, &StableTokens::default(), &rates())
            .unwrap()
            .is_none());
    }

    #[test]
    fn zero_value_token_is_silently_dropped() {
        let tx = token("0xeee", "0", USDC);
        assert!(normalize_token(&tx, &StableTokens::default(), &rates())
            .unwrap()
            .is_none());
    }

    #[test]
    fn token_without_contract_field_is_dropped() {
        let tx = native("0xfff", "1000000");
        assert!(normalize_token(&tx, &StableTokens::default(), &rates())
            .unwrap()
            .is_none());
    }

    #[test]
    fn synthetic_allow_list_is_injectable() {
        let tokens = StableTokens::new(HashMap::from([("0xABCD".to_string(), 2u32)]));
        assert_eq!(tokens.decimals("0xabcd"), Some(2));
        assert_eq!(tokens.decimals("0xABCD"), Some(2));

        let tx = token("0x111", "150", "0xabcd"); // 1.50 units
        let amount = normalize_token(&tx, &tokens, &rates()).unwrap().unwrap();
        assert_eq!(amount.value, Decimal::from_str("1.275").unwrap());
    }

    #[test]
    fn non_positive_rates_are_a_config_error() {
        let bad = FixedRates {
            eth_eur: Decimal::ZERO,
            usd_eur: Decimal::ONE,
        };
        assert!(matches!(bad.validate(), Err(StatsError::Config(_))));
        assert!(rates().validate().is_ok());
    }
}
