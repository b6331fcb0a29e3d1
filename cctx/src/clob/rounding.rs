//! Tick-size-keyed rounding, price validation, and maker/taker amount
//! derivation for the CLOB order pipeline (spec.md §4.6 steps 1-4).

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{Error, Result};
use crate::models::Side;

/// Decimal places for price, size, and base-unit amount at one tick
/// size. Looked up by [`precision_for_tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Precision {
    pub price_dp: u32,
    pub size_dp: u32,
    pub amount_dp: u32,
}

/// Maker/taker base-unit amounts derived by [`derive_amounts`], scaled
/// by `1e6` as the CTF Exchange contract expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Amounts {
    pub maker_amount: u128,
    pub taker_amount: u128,
}

const BASE_UNIT_SCALE: u32 = 1_000_000;

/// Rounding table keyed by tick size formatted to 4 decimal places.
/// Unrecognised tick sizes fall back to the `0.01` row.
#[must_use]
pub fn precision_for_tick(tick_size: Decimal) -> Precision {
    match format!("{tick_size:.4}").as_str() {
        "0.1000" => Precision { price_dp: 1, size_dp: 2, amount_dp: 3 },
        "0.0100" => Precision { price_dp: 2, size_dp: 2, amount_dp: 4 },
        "0.0010" => Precision { price_dp: 3, size_dp: 2, amount_dp: 5 },
        "0.0001" => Precision { price_dp: 4, size_dp: 2, amount_dp: 6 },
        _ => Precision { price_dp: 2, size_dp: 2, amount_dp: 4 },
    }
}

/// Round to the nearest `dp` decimal places.
#[must_use]
pub fn round_normal(value: Decimal, dp: u32) -> Decimal {
    value.round_dp(dp)
}

/// Truncate towards zero at `dp` decimal places.
#[must_use]
pub fn round_down(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::ToZero)
}

/// Round `value` up to `d + 4` decimals, then down to `d` decimals if
/// that intermediate still carries more than `d` significant decimal
/// places. Avoids understating the amount while never emitting more
/// precision than the exchange accepts.
#[must_use]
pub fn normalize_amount(value: Decimal, d: u32) -> Decimal {
    let rounded_up = value.round_dp_with_strategy(d + 4, RoundingStrategy::AwayFromZero).normalize();
    if rounded_up.scale() > d {
        rounded_up.round_dp_with_strategy(d, RoundingStrategy::ToZero)
    } else {
        rounded_up
    }
}

/// Round `price` to `price_dp` and validate it lands strictly inside
/// `[tick_size, 1 - tick_size]`.
///
/// # Errors
///
/// Returns [`Error::InvalidOrder`] if the rounded price falls outside
/// the valid range.
pub fn round_and_validate_price(price: Decimal, tick_size: Decimal, price_dp: u32) -> Result<Decimal> {
    let rounded = round_normal(price, price_dp);
    let min = tick_size;
    let max = Decimal::ONE - tick_size;
    if rounded < min || rounded > max {
        return Err(Error::InvalidOrder(format!(
            "price {rounded} outside valid range [{min}, {max}] for tick size {tick_size}"
        )));
    }
    Ok(rounded)
}

/// Derive maker/taker raw decimal amounts and scale them to base units
/// (spec.md §4.6 step 3).
#[must_use]
pub fn derive_amounts(price: Decimal, size: Decimal, side: Side, precision: Precision) -> Amounts {
    let (maker_raw, taker_raw) = match side {
        Side::Buy => {
            let taker_raw = round_down(size, precision.size_dp);
            let maker_raw = normalize_amount(taker_raw * price, precision.amount_dp);
            (maker_raw, taker_raw)
        }
        Side::Sell => {
            let maker_raw = round_down(size, precision.size_dp);
            let taker_raw = normalize_amount(maker_raw * price, precision.amount_dp);
            (maker_raw, taker_raw)
        }
    };
    Amounts {
        maker_amount: to_base_units(maker_raw),
        taker_amount: to_base_units(taker_raw),
    }
}

fn to_base_units(raw: Decimal) -> u128 {
    (raw * Decimal::from(BASE_UNIT_SCALE))
        .round_dp_with_strategy(0, RoundingStrategy::ToZero)
        .to_u128()
        .unwrap_or(0)
}

/// 8 random bytes, big-endian, falling back to a nanosecond clock
/// reading if the OS RNG is unavailable (spec.md §4.6 step 4).
#[must_use]
pub fn generate_salt() -> u64 {
    use rand::RngCore;
    let mut bytes = [0u8; 8];
    match rand::rngs::OsRng.try_fill_bytes(&mut bytes) {
        Ok(()) => u64::from_be_bytes(bytes),
        Err(_) => {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or(0)
        }
    }
}
