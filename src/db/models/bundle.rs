use bigdecimal::BigDecimal;
use num_traits::Zero;
use serde::{Deserialize, Serialize};

/// Fixed id of the singleton bundle record.
pub const BUNDLE_ID: &str = "1";

/// Global reference-price snapshot.
///
/// There is exactly one bundle per deployment. It is created on first use and
/// updated in place whenever a canonical stable pool changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    pub id: String,
    /// Native asset price in the chain's stablecoin. Zero until a canonical
    /// stable pool is known.
    pub native_price_usd: BigDecimal,
}

impl Bundle {
    pub fn new(native_price_usd: BigDecimal) -> Self {
        Self {
            id: BUNDLE_ID.to_string(),
            native_price_usd,
        }
    }
}

impl Default for Bundle {
    fn default() -> Self {
        Self::new(BigDecimal::zero())
    }
}
