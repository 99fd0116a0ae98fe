use rustc_hash::FxHashMap;

use super::models::{Bundle, Pair, Token};

/// Keyed entity storage the pricing core reads from and writes derived
/// fields back into.
///
/// Lookups return owned values; `None` means the id has never been stored.
/// Entities are never deleted.
pub trait ReferenceStore {
    fn load_pair(&self, id: &str) -> Option<Pair>;
    fn load_token(&self, id: &str) -> Option<Token>;
    fn load_bundle(&self) -> Option<Bundle>;

    fn save_pair(&mut self, pair: Pair);
    fn save_token(&mut self, token: Token);
    fn save_bundle(&mut self, bundle: Bundle);
}

/// In-memory reference store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    pairs: FxHashMap<String, Pair>,
    tokens: FxHashMap<String, Token>,
    bundle: Option<Bundle>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pairs(&self) -> impl Iterator<Item = &Pair> {
        self.pairs.values()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &Token> {
        self.tokens.values()
    }

    pub fn pair_count(&self) -> usize {
        self.pairs.len()
    }

    pub fn token_count(&self) -> usize {
        self.tokens.len()
    }

    pub fn has_token(&self, id: &str) -> bool {
        self.tokens.contains_key(id)
    }
}

impl ReferenceStore for MemoryStore {
    fn load_pair(&self, id: &str) -> Option<Pair> {
        self.pairs.get(id).cloned()
    }

    fn load_token(&self, id: &str) -> Option<Token> {
        self.tokens.get(id).cloned()
    }

    fn load_bundle(&self) -> Option<Bundle> {
        self.bundle.clone()
    }

    fn save_pair(&mut self, pair: Pair) {
        self.pairs.insert(pair.id.clone(), pair);
    }

    fn save_token(&mut self, token: Token) {
        self.tokens.insert(token.id.clone(), token);
    }

    fn save_bundle(&mut self, bundle: Bundle) {
        self.bundle = Some(bundle);
    }
}
