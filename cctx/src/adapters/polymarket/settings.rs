//! Polymarket-specific configuration, normalized from the generic
//! [`ExchangeConfig`] dictionary.

use std::str::FromStr;

use alloy_primitives::Address;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use crate::config::ExchangeConfig;
use crate::error::{Error, Result};

/// Deployment environment; picks default base URLs and chain ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Mainnet,
    Testnet,
}

impl Environment {
    const fn default_chain_id(self) -> u64 {
        match self {
            Self::Mainnet => 137,
            Self::Testnet => 80002,
        }
    }
}

/// Normalized Polymarket adapter settings.
#[derive(Debug, Clone)]
pub struct PolymarketSettings {
    pub environment: Environment,
    pub clob_base_url: String,
    pub gamma_base_url: String,
    pub chain_id: u64,
    /// Wallet private key (hex, `0x`-prefixed), required for signing
    /// orders and the L1 auth handshake.
    pub private_key: Option<String>,
    /// L2 API credentials, issued once via the L1 handshake.
    pub api_key: Option<String>,
    pub api_secret: Option<String>,
    pub api_passphrase: Option<String>,
    /// CTF Exchange contract for ordinary (non-neg-risk) markets.
    pub ctf_exchange_contract: Option<Address>,
    /// CTF Exchange contract for neg-risk markets.
    pub neg_risk_ctf_exchange_contract: Option<Address>,
    pub default_tick_size: Decimal,
}

impl PolymarketSettings {
    /// Normalize from the caller's raw exchange config.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a supplied contract address is not
    /// valid hex, or a supplied chain ID doesn't fit `u64`.
    pub fn from_config(config: &ExchangeConfig) -> Result<Self> {
        let environment = match config.raw_str("environment") {
            Some("mainnet") => Environment::Mainnet,
            _ => Environment::Testnet,
        };

        let clob_base_url = config
            .raw_str("clobBaseUrl")
            .unwrap_or("https://clob.polymarket.com")
            .to_string();
        let gamma_base_url = config
            .raw_str("gammaBaseUrl")
            .unwrap_or("https://gamma-api.polymarket.com")
            .to_string();

        let chain_id = config
            .raw
            .get("chainId")
            .and_then(Value::as_u64)
            .unwrap_or_else(|| environment.default_chain_id());

        let private_key = config.raw_str("privateKey").map(str::to_string);
        let api_key = config.raw_str("apiKey").map(str::to_string);
        let api_secret = config.raw_str("apiSecret").map(str::to_string);
        let api_passphrase = config.raw_str("apiPassphrase").map(str::to_string);

        let ctf_exchange_contract = parse_address_field(config, "ctfExchangeContract")?;
        let neg_risk_ctf_exchange_contract = parse_address_field(config, "negRiskCtfExchangeContract")?;

        Ok(Self {
            environment,
            clob_base_url,
            gamma_base_url,
            chain_id,
            private_key,
            api_key,
            api_secret,
            api_passphrase,
            ctf_exchange_contract,
            neg_risk_ctf_exchange_contract,
            default_tick_size: dec!(0.01),
        })
    }
}

fn parse_address_field(config: &ExchangeConfig, key: &str) -> Result<Option<Address>> {
    config
        .raw_str(key)
        .map(Address::from_str)
        .transpose()
        .map_err(|err| Error::Config(format!("invalid {key}: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_to_testnet_with_its_default_chain_id() {
        let config = ExchangeConfig::from_dict(json!({})).unwrap();
        let settings = PolymarketSettings::from_config(&config).unwrap();
        assert_eq!(settings.environment, Environment::Testnet);
        assert_eq!(settings.chain_id, 80002);
        assert_eq!(settings.clob_base_url, "https://clob.polymarket.com");
    }

    #[test]
    fn mainnet_environment_picks_the_mainnet_chain_id() {
        let config = ExchangeConfig::from_dict(json!({"environment": "mainnet"})).unwrap();
        let settings = PolymarketSettings::from_config(&config).unwrap();
        assert_eq!(settings.environment, Environment::Mainnet);
        assert_eq!(settings.chain_id, 137);
    }

    #[test]
    fn explicit_chain_id_overrides_the_environment_default() {
        let config = ExchangeConfig::from_dict(json!({"environment": "mainnet", "chainId": 999})).unwrap();
        let settings = PolymarketSettings::from_config(&config).unwrap();
        assert_eq!(settings.chain_id, 999);
    }

    #[test]
    fn invalid_contract_address_is_a_config_error() {
        let config = ExchangeConfig::from_dict(json!({"ctfExchangeContract": "not-an-address"})).unwrap();
        assert!(PolymarketSettings::from_config(&config).is_err());
    }

    #[test]
    fn valid_contract_address_is_parsed() {
        let config = ExchangeConfig::from_dict(json!({
            "ctfExchangeContract": "0x1111111111111111111111111111111111111111",
        }))
        .unwrap();
        let settings = PolymarketSettings::from_config(&config).unwrap();
        assert!(settings.ctf_exchange_contract.is_some());
    }
}
