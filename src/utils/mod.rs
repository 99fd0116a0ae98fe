//! Utility functions for the pricebook indexer.
//!
//! - [`conversion`] - Raw integer to decimal conversion, address normalization

mod conversion;

// ============================================
// Common Constants
// ============================================

/// The Ethereum zero address (0x0000000000000000000000000000000000000000)
/// Returned by the factory when no pair exists, and used in configuration
/// to mark an unused canonical pool slot.
pub const ZERO_ADDRESS: &str = "0x0000000000000000000000000000000000000000";

// ============================================
// Re-exports
// ============================================

pub use conversion::{
    address_id, normalize_address, round_price, safe_div, u256_to_decimal, PRICE_PRECISION,
};
