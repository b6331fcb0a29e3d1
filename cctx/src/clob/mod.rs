//! Rounding, amount derivation, EIP-712 order construction and signing,
//! and L2 HMAC authentication for CLOB exchanges (spec.md §4.6).

pub mod auth;
pub mod eip712;
pub mod order;
pub mod rounding;

pub use auth::{build_l2_headers, L2Credentials, L2Headers};
pub use eip712::{auth_domain, order_domain, side_code, sign_auth, sign_order, ClobAuth, ClobOrder, ContractRegistry};
pub use order::{build_and_sign_order, MarketTerms, OrderParams, SignedOrder};
pub use rounding::{derive_amounts, generate_salt, normalize_amount, precision_for_tick, round_and_validate_price, round_down, round_normal, Amounts, Precision};
