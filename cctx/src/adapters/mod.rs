//! Concrete `Exchange` implementations.

pub mod polymarket;
