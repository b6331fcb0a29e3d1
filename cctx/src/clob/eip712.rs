//! Typed-data construction and ECDSA signing for CLOB orders and the
//! L1 key-issuance handshake (spec.md §4.6 steps 5-6, and the `ClobAuth`
//! paragraph). Built directly on `alloy-sol-types`/`alloy-signer-local`
//! rather than an opaque CLOB SDK, since the rounding, salt, and typed
//! data construction belong to this crate.

use std::collections::HashMap;

use alloy_primitives::{Address, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{eip712_domain, sol, SolStruct};

use crate::error::{Error, Result};
use crate::models::Side;

sol! {
    #[derive(Debug)]
    struct ClobOrder {
        uint256 salt;
        address maker;
        address signer;
        address taker;
        uint256 tokenId;
        uint256 makerAmount;
        uint256 takerAmount;
        uint256 expiration;
        uint256 nonce;
        uint256 feeRateBps;
        uint8 side;
        uint8 signatureType;
    }
}

sol! {
    // `address` is a reserved type keyword in the sol! grammar, so the
    // wallet field is named `walletAddress` here; the wire message this
    // signs over is otherwise exactly spec.md's `ClobAuth`.
    #[derive(Debug)]
    struct ClobAuth {
        address walletAddress;
        string timestamp;
        uint256 nonce;
        string message;
    }
}

/// The fixed attestation message every `ClobAuth` signs over.
pub const CLOB_AUTH_MESSAGE: &str = "This message attests that I control the given wallet";

const EOA_SIGNATURE_TYPE: u8 = 0;

/// Maps `(chainID, negRisk)` to the CTF Exchange contract address that
/// must sign as `verifyingContract`. Deliberately not pre-populated with
/// real mainnet addresses: those are deployment configuration, not a
/// property of this pipeline, and belong in the adapter's settings.
#[derive(Debug, Clone, Default)]
pub struct ContractRegistry {
    contracts: HashMap<(u64, bool), Address>,
}

impl ContractRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, chain_id: u64, neg_risk: bool, contract: Address) -> &mut Self {
        self.contracts.insert((chain_id, neg_risk), contract);
        self
    }

    /// The verifying contract for `(chain_id, neg_risk)`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no contract has been registered for
    /// this chain/neg-risk combination.
    pub fn contract_for_chain(&self, chain_id: u64, neg_risk: bool) -> Result<Address> {
        self.contracts.get(&(chain_id, neg_risk)).copied().ok_or_else(|| {
            Error::Config(format!(
                "no CTF Exchange contract configured for chain {chain_id} (neg_risk={neg_risk})"
            ))
        })
    }
}

/// Build the EIP-712 domain for CLOB order signing.
#[must_use]
pub fn order_domain(chain_id: u64, verifying_contract: Address) -> alloy_sol_types::Eip712Domain {
    eip712_domain! {
        name: "Polymarket CTF Exchange",
        version: "1",
        chain_id: chain_id,
        verifying_contract: verifying_contract,
    }
}

/// Build the EIP-712 domain for the L1 `ClobAuth` key-issuance
/// handshake. Has no `verifyingContract`, unlike the order domain.
#[must_use]
pub fn auth_domain(chain_id: u64) -> alloy_sol_types::Eip712Domain {
    eip712_domain! {
        name: "ClobAuthDomain",
        version: "1",
        chain_id: chain_id,
    }
}

/// Side encoding the CTF Exchange contract expects: `0 = BUY`, `1 = SELL`.
#[must_use]
pub const fn side_code(side: Side) -> u8 {
    match side {
        Side::Buy => 0,
        Side::Sell => 1,
    }
}

/// Sign an arbitrary EIP-712 struct hash, returning a `0x`-prefixed hex
/// 65-byte signature (`r || s || v`) with `v` normalised to `{27, 28}`.
///
/// # Errors
///
/// Returns [`Error::Authentication`] if the signer fails to produce a
/// signature.
pub fn sign_typed_hash(signer: &PrivateKeySigner, hash: alloy_primitives::B256) -> Result<String> {
    let signature = signer
        .sign_hash_sync(&hash)
        .map_err(|err| Error::Authentication(format!("failed to sign typed data: {err}")))?;
    // `Signature::as_bytes` already encodes the recovery byte as 27/28,
    // satisfying the "add 27 if < 27" normalisation in one step.
    let bytes: [u8; 65] = signature.as_bytes();
    Ok(format!("0x{}", hex::encode(bytes)))
}

/// Build and sign a `ClobOrder` typed-data message, returning the
/// `0x`-prefixed hex signature.
///
/// # Errors
///
/// Returns [`Error::Authentication`] on a signing failure.
pub fn sign_order(order: &ClobOrder, chain_id: u64, verifying_contract: Address, signer: &PrivateKeySigner) -> Result<String> {
    let domain = order_domain(chain_id, verifying_contract);
    let hash = order.eip712_signing_hash(&domain);
    sign_typed_hash(signer, hash)
}

/// Build and sign a `ClobAuth` typed-data message for L1 key issuance.
///
/// # Errors
///
/// Returns [`Error::Authentication`] on a signing failure.
pub fn sign_auth(wallet: Address, timestamp: String, nonce: U256, chain_id: u64, signer: &PrivateKeySigner) -> Result<String> {
    let auth = ClobAuth {
        walletAddress: wallet,
        timestamp,
        nonce,
        message: CLOB_AUTH_MESSAGE.to_string(),
    };
    let domain = auth_domain(chain_id);
    let hash = auth.eip712_signing_hash(&domain);
    sign_typed_hash(signer, hash)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn fixed_signer() -> PrivateKeySigner {
        PrivateKeySigner::from_str("0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318")
            .expect("valid 32-byte hex private key")
    }

    fn sample_order() -> ClobOrder {
        ClobOrder {
            salt: U256::from(42u64),
            maker: Address::ZERO,
            signer: Address::ZERO,
            taker: Address::ZERO,
            tokenId: U256::from(1u64),
            makerAmount: U256::from(50_000_000u64),
            takerAmount: U256::from(100_000_000u64),
            expiration: U256::ZERO,
            nonce: U256::ZERO,
            feeRateBps: U256::ZERO,
            side: side_code(Side::Buy),
            signatureType: EOA_SIGNATURE_TYPE,
        }
    }

    #[test]
    fn side_code_matches_the_ctf_exchange_convention() {
        assert_eq!(side_code(Side::Buy), 0);
        assert_eq!(side_code(Side::Sell), 1);
    }

    #[test]
    fn contract_registry_resolves_registered_entries_only() {
        let mut registry = ContractRegistry::new();
        let contract = Address::repeat_byte(0xAB);
        registry.insert(137, false, contract);

        assert_eq!(registry.contract_for_chain(137, false).unwrap(), contract);
        assert!(registry.contract_for_chain(137, true).is_err());
        assert!(registry.contract_for_chain(80002, false).is_err());
    }

    #[test]
    fn signing_an_order_yields_a_deterministic_65_byte_signature_with_v_at_least_27() {
        let signer = fixed_signer();
        let contract = Address::repeat_byte(0x11);
        let order = sample_order();

        let first = sign_order(&order, 137, contract, &signer).unwrap();
        let second = sign_order(&order, 137, contract, &signer).unwrap();
        assert_eq!(first, second, "signing the same order twice is deterministic");

        let hex_digits = first.trim_start_matches("0x");
        assert_eq!(hex_digits.len(), 130, "65 bytes hex-encoded is 130 hex digits");
        let v = u8::from_str_radix(&hex_digits[128..130], 16).unwrap();
        assert!(v >= 27);
    }

    #[test]
    fn signing_an_auth_message_produces_a_valid_signature() {
        let signer = fixed_signer();
        let signature = sign_auth(
            signer.address(),
            "1700000000".to_string(),
            U256::from(7u64),
            137,
            &signer,
        )
        .unwrap();
        assert!(signature.starts_with("0x"));
        assert_eq!(signature.len(), 2 + 130);
    }

    #[test]
    fn different_orders_yield_different_signatures() {
        let signer = fixed_signer();
        let contract = Address::repeat_byte(0x11);
        let mut order = sample_order();
        let base = sign_order(&order, 137, contract, &signer).unwrap();

        order.salt = U256::from(43u64);
        let changed = sign_order(&order, 137, contract, &signer).unwrap();
        assert_ne!(base, changed);
    }
}
