use rustc_hash::FxHashMap;

use crate::{db::models::Pair, utils::ZERO_ADDRESS};

/// Outcome of asking the factory for the pair of two tokens.
///
/// A revert is an expected, recoverable outcome rather than an error: some
/// factories revert `getPair` for odd inputs, and the caller simply moves on
/// to the next candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PairLookup {
    Found(String),
    Missing,
    Reverted,
}

impl PairLookup {
    /// Map a `getPair` return value: the zero address means no pair.
    pub fn from_address(address: String) -> Self {
        if address == ZERO_ADDRESS {
            PairLookup::Missing
        } else {
            PairLookup::Found(address)
        }
    }
}

/// Resolves the pair deployed for an unordered token pair.
pub trait PairResolver {
    fn try_get_pair(&self, token_a: &str, token_b: &str) -> PairLookup;

    /// Called when the indexer observes a `PairCreated` from the factory.
    fn on_pair_created(&mut self, _token0: &str, _token1: &str, _pair: &str) {}
}

fn pair_key(token_a: &str, token_b: &str) -> (String, String) {
    if token_a <= token_b {
        (token_a.to_string(), token_b.to_string())
    } else {
        (token_b.to_string(), token_a.to_string())
    }
}

/// Pairs observed through `PairCreated` while replaying the factory's logs.
///
/// At any point of an in-order replay this answers exactly what
/// `factory.getPair` would at that block, without an RPC round trip.
#[derive(Debug, Clone, Default)]
pub struct PairRegistry {
    pairs: FxHashMap<(String, String), String>,
}

impl PairRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild the index from stored pairs (e.g. after loading a snapshot).
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a Pair>) -> Self {
        let mut registry = Self::new();
        for pair in pairs {
            registry.on_pair_created(&pair.token0, &pair.token1, &pair.id);
        }
        registry
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl PairResolver for PairRegistry {
    fn try_get_pair(&self, token_a: &str, token_b: &str) -> PairLookup {
        match self.pairs.get(&pair_key(token_a, token_b)) {
            Some(pair) => PairLookup::Found(pair.clone()),
            None => PairLookup::Missing,
        }
    }

    fn on_pair_created(&mut self, token0: &str, token1: &str, pair: &str) {
        self.pairs
            .entry(pair_key(token0, token1))
            .or_insert_with(|| pair.to_string());
    }
}

/// Pre-fetched `getPair` answers, including reverts.
///
/// Filled by [`PairFetcher`](crate::worker::PairFetcher) for a block, then
/// consulted synchronously while the batch is applied. Pairs created within
/// the batch are added through the creation hook. Combinations that were
/// never fetched resolve as missing.
#[derive(Debug, Clone, Default)]
pub struct PairLookupTable {
    lookups: FxHashMap<(String, String), PairLookup>,
}

impl PairLookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, token_a: &str, token_b: &str, lookup: PairLookup) {
        self.lookups.insert(pair_key(token_a, token_b), lookup);
    }

    pub fn len(&self) -> usize {
        self.lookups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookups.is_empty()
    }
}

impl PairResolver for PairLookupTable {
    fn try_get_pair(&self, token_a: &str, token_b: &str) -> PairLookup {
        self.lookups
            .get(&pair_key(token_a, token_b))
            .cloned()
            .unwrap_or(PairLookup::Missing)
    }

    fn on_pair_created(&mut self, token0: &str, token1: &str, pair: &str) {
        self.insert(token0, token1, PairLookup::Found(pair.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_address_means_missing() {
        assert_eq!(
            PairLookup::from_address(ZERO_ADDRESS.to_string()),
            PairLookup::Missing
        );
        assert_eq!(
            PairLookup::from_address("0xabc".to_string()),
            PairLookup::Found("0xabc".to_string())
        );
    }

    #[test]
    fn test_registry_is_order_independent() {
        let mut registry = PairRegistry::new();
        registry.on_pair_created("0xaaa", "0xbbb", "0xpair");

        assert_eq!(
            registry.try_get_pair("0xbbb", "0xaaa"),
            PairLookup::Found("0xpair".to_string())
        );
        assert_eq!(registry.try_get_pair("0xaaa", "0xccc"), PairLookup::Missing);
    }

    #[test]
    fn test_registry_keeps_first_pair_for_tokens() {
        let mut registry = PairRegistry::new();
        registry.on_pair_created("0xaaa", "0xbbb", "0xfirst");
        registry.on_pair_created("0xaaa", "0xbbb", "0xsecond");

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.try_get_pair("0xaaa", "0xbbb"),
            PairLookup::Found("0xfirst".to_string())
        );
    }

    #[test]
    fn test_registry_from_pairs() {
        let pairs = vec![
            Pair::new("0xp1".into(), "0xaaa".into(), "0xbbb".into(), 1),
            Pair::new("0xp2".into(), "0xaaa".into(), "0xccc".into(), 2),
        ];
        let registry = PairRegistry::from_pairs(&pairs);
        assert_eq!(
            registry.try_get_pair("0xccc", "0xaaa"),
            PairLookup::Found("0xp2".to_string())
        );
    }

    #[test]
    fn test_lookup_table_preserves_reverts() {
        let mut table = PairLookupTable::new();
        table.insert("0xaaa", "0xbbb", PairLookup::Reverted);

        assert_eq!(table.try_get_pair("0xbbb", "0xaaa"), PairLookup::Reverted);
        assert_eq!(table.try_get_pair("0xaaa", "0xddd"), PairLookup::Missing);

        table.on_pair_created("0xaaa", "0xddd", "0xnew");
        assert_eq!(
            table.try_get_pair("0xddd", "0xaaa"),
            PairLookup::Found("0xnew".to_string())
        );
    }
}
