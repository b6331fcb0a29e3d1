//! Ties rounding, amount derivation, salt generation, and EIP-712
//! signing into one `build_and_sign_order` call (spec.md §4.6 step 7:
//! serialize every numeric field as a decimal string).

use std::str::FromStr;

use alloy_primitives::{Address, U256};
use alloy_signer_local::PrivateKeySigner;
use rust_decimal::Decimal;
use serde::Serialize;

use super::eip712::{self, ClobOrder, ContractRegistry};
use super::rounding::{derive_amounts, generate_salt, precision_for_tick, round_and_validate_price};
use crate::error::{Error, Result};
use crate::models::{Side, TokenId};

/// Caller-supplied order intent before rounding, amount derivation, or
/// signing has run.
#[derive(Debug, Clone)]
pub struct OrderParams {
    pub token_id: TokenId,
    pub price: Decimal,
    pub size: Decimal,
    pub side: Side,
    pub maker: Address,
    pub signer: Address,
    /// The counterparty address, or `None` for a public order (the zero
    /// address is substituted).
    pub taker: Option<Address>,
    pub fee_rate_bps: u64,
    pub expiration: u64,
    pub nonce: u64,
}

/// Per-market terms needed to round and route the order.
#[derive(Debug, Clone, Copy)]
pub struct MarketTerms {
    pub tick_size: Decimal,
    pub neg_risk: bool,
    pub chain_id: u64,
}

/// A fully constructed and signed order, ready to serialize as the
/// request body for the CLOB order-creation endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct SignedOrder {
    pub salt: String,
    pub maker: String,
    pub signer: String,
    pub taker: String,
    #[serde(rename = "tokenId")]
    pub token_id: String,
    #[serde(rename = "makerAmount")]
    pub maker_amount: String,
    #[serde(rename = "takerAmount")]
    pub taker_amount: String,
    pub expiration: String,
    pub nonce: String,
    #[serde(rename = "feeRateBps")]
    pub fee_rate_bps: String,
    pub side: &'static str,
    #[serde(rename = "signatureType")]
    pub signature_type: u8,
    pub signature: String,
}

/// Round, derive amounts, build the EIP-712 typed order, and sign it.
///
/// # Errors
///
/// Returns [`Error::InvalidOrder`] if the price fails tick validation
/// or the token id isn't a valid `uint256`, [`Error::Config`] if no
/// contract is registered for `terms.chain_id`/`terms.neg_risk`, or
/// [`Error::Authentication`] if signing fails.
pub fn build_and_sign_order(
    params: OrderParams,
    terms: MarketTerms,
    registry: &ContractRegistry,
    signer: &PrivateKeySigner,
) -> Result<SignedOrder> {
    let precision = precision_for_tick(terms.tick_size);
    let price = round_and_validate_price(params.price, terms.tick_size, precision.price_dp)?;
    let amounts = derive_amounts(price, params.size, params.side, precision);
    let salt = generate_salt();
    let contract = registry.contract_for_chain(terms.chain_id, terms.neg_risk)?;
    let token_id = token_id_to_u256(&params.token_id)?;
    let taker = params.taker.unwrap_or(Address::ZERO);

    let maker_amount = U256::from(amounts.maker_amount);
    let taker_amount = U256::from(amounts.taker_amount);

    let order = ClobOrder {
        salt: U256::from(salt),
        maker: params.maker,
        signer: params.signer,
        taker,
        tokenId: token_id,
        makerAmount: maker_amount,
        takerAmount: taker_amount,
        expiration: U256::from(params.expiration),
        nonce: U256::from(params.nonce),
        feeRateBps: U256::from(params.fee_rate_bps),
        side: eip712::side_code(params.side),
        signatureType: 0,
    };

    let signature = eip712::sign_order(&order, terms.chain_id, contract, signer)?;

    Ok(SignedOrder {
        salt: salt.to_string(),
        maker: params.maker.to_string(),
        signer: params.signer.to_string(),
        taker: taker.to_string(),
        token_id: token_id.to_string(),
        maker_amount: amounts.maker_amount.to_string(),
        taker_amount: amounts.taker_amount.to_string(),
        expiration: params.expiration.to_string(),
        nonce: params.nonce.to_string(),
        fee_rate_bps: params.fee_rate_bps.to_string(),
        side: params.side.as_wire_str(),
        signature_type: 0,
        signature,
    })
}

fn token_id_to_u256(token_id: &TokenId) -> Result<U256> {
    U256::from_str(token_id.as_str())
        .map_err(|err| Error::InvalidOrder(format!("token id {token_id} is not a valid uint256: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn signer() -> PrivateKeySigner {
        PrivateKeySigner::from_str("0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")
            .expect("valid private key")
    }

    fn registry() -> ContractRegistry {
        let mut registry = ContractRegistry::new();
        registry.insert(137, false, Address::repeat_byte(0x11));
        registry
    }

    fn params() -> OrderParams {
        OrderParams {
            token_id: TokenId::new("12345"),
            price: dec!(0.5),
            size: dec!(100),
            side: Side::Buy,
            maker: Address::repeat_byte(0x22),
            signer: Address::repeat_byte(0x22),
            taker: None,
            fee_rate_bps: 0,
            expiration: 0,
            nonce: 0,
        }
    }

    fn terms() -> MarketTerms {
        MarketTerms { tick_size: dec!(0.01), neg_risk: false, chain_id: 137 }
    }

    #[test]
    fn build_and_sign_order_derives_the_documented_amounts() {
        let signed = build_and_sign_order(params(), terms(), &registry(), &signer()).unwrap();
        assert_eq!(signed.maker_amount, "50000000");
        assert_eq!(signed.taker_amount, "100000000");
        assert_eq!(signed.side, "BUY");
        assert_eq!(signed.signature_type, 0);
        assert!(signed.signature.starts_with("0x"));
    }

    #[test]
    fn build_and_sign_order_rejects_an_invalid_price() {
        let mut bad_params = params();
        bad_params.price = dec!(1.0);
        assert!(build_and_sign_order(bad_params, terms(), &registry(), &signer()).is_err());
    }

    #[test]
    fn build_and_sign_order_rejects_an_unregistered_chain() {
        let mut bad_terms = terms();
        bad_terms.chain_id = 1;
        assert!(build_and_sign_order(params(), bad_terms, &registry(), &signer()).is_err());
    }

    #[test]
    fn public_orders_default_the_taker_to_the_zero_address() {
        let signed = build_and_sign_order(params(), terms(), &registry(), &signer()).unwrap();
        assert_eq!(signed.taker, Address::ZERO.to_string());
    }
}
