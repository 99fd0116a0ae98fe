//! Type conversion and formatting utilities.
//!
//! Raw on-chain integers are turned into exact decimals here. Nothing in this
//! module goes through `f64`: reserves and prices feed threshold comparisons
//! that must be reproducible bit for bit across replays.

use alloy::primitives::{hex, Address, U256};
use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::Zero;
use once_cell::sync::Lazy;

// ============================================
// Hex / Address Encoding
// ============================================

/// Encode bytes as a lowercase hex string with 0x prefix.
fn hex_encode(bytes: &[u8]) -> String {
    format!("0x{}", hex::encode(bytes))
}

/// Canonical store id for an address: lowercase, 0x-prefixed, 20 bytes.
pub fn address_id(address: &Address) -> String {
    hex_encode(address.as_slice())
}

/// Parse and normalize a user supplied address string.
///
/// Accepts any casing (checksummed or not) and returns the canonical
/// lowercase form used as entity id throughout the store.
pub fn normalize_address(value: &str) -> Result<String> {
    let address: Address = value
        .trim()
        .parse()
        .with_context(|| format!("Invalid address: {value}"))?;
    Ok(address_id(&address))
}

// ============================================
// Decimal Conversions
// ============================================

/// Convert a raw token amount to a decimal adjusted by the token's decimals.
///
/// # Example
/// ```ignore
/// let one = u256_to_decimal(U256::from(1_000_000_000_000_000_000u128), 18);
/// assert_eq!(one, BigDecimal::from(1));
/// ```
pub fn u256_to_decimal(value: U256, decimals: u8) -> BigDecimal {
    let bytes: [u8; 32] = value.to_le_bytes();
    let raw = BigDecimal::from(BigInt::from_bytes_le(Sign::Plus, &bytes));

    if decimals == 0 {
        raw
    } else {
        raw / big_pow10(decimals)
    }
}

/// Significant digits kept for prices. Exact products otherwise grow by a
/// full operand's digits on every hop.
pub const PRICE_PRECISION: u64 = 34;

/// Round `value` to [`PRICE_PRECISION`] significant digits. Shorter values
/// are returned unchanged (no zero padding).
pub fn round_price(value: BigDecimal) -> BigDecimal {
    if value.digits() > PRICE_PRECISION {
        value.with_prec(PRICE_PRECISION)
    } else {
        value
    }
}

/// Divide, yielding zero when the denominator is zero.
pub fn safe_div(numerator: &BigDecimal, denominator: &BigDecimal) -> BigDecimal {
    if denominator.is_zero() {
        BigDecimal::zero()
    } else {
        numerator / denominator
    }
}

// ============================================
// Internal Helpers
// ============================================

static POW10_CACHE: Lazy<[BigDecimal; 25]> =
    Lazy::new(|| std::array::from_fn(|i| BigDecimal::from(BigInt::from(10u32).pow(i as u32))));

/// Compute 10^exp as BigDecimal.
pub(crate) fn big_pow10(exp: u8) -> BigDecimal {
    if (exp as usize) < POW10_CACHE.len() {
        POW10_CACHE[exp as usize].clone()
    } else {
        BigDecimal::from(BigInt::from(10u32).pow(exp as u32))
    }
}
