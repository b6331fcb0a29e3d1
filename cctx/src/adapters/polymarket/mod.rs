//! Polymarket `Exchange` adapter: Gamma market discovery, CLOB order
//! execution, and orderbook polling.

mod client;
mod parse;
mod settings;

pub use client::PolymarketAdapter;
pub use parse::parse_market;
pub use settings::{Environment, PolymarketSettings};
