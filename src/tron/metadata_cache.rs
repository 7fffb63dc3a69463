//! Per-contract TRC20 metadata cache.

use lru::LruCache;
use parking_lot::Mutex;
use std::num::NonZeroUsize;

use super::types::TokenMetadata;

/// Default number of contracts kept.
pub const DEFAULT_METADATA_CACHE_CAPACITY: usize = 256;

/// Bounded LRU of name / symbol / decimals keyed by base58 contract address.
///
/// Fields are filled independently as they are first fetched. Reading any
/// field marks the contract as recently used.
pub struct TokenMetadataCache {
    entries: Mutex<LruCache<String, TokenMetadata>>,
}

impl std::fmt::Debug for TokenMetadataCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("TokenMetadataCache")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

impl Default for TokenMetadataCache {
    fn default() -> Self {
        Self::new(DEFAULT_METADATA_CACHE_CAPACITY)
    }
}

impl TokenMetadataCache {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn get(&self, contract: &str) -> Option<TokenMetadata> {
        self.entries.lock().get(contract).cloned()
    }

    pub fn decimals(&self, contract: &str) -> Option<u8> {
        self.entries.lock().get(contract).and_then(|m| m.decimals)
    }

    pub fn name(&self, contract: &str) -> Option<String> {
        self.entries.lock().get(contract).and_then(|m| m.name.clone())
    }

    pub fn symbol(&self, contract: &str) -> Option<String> {
        self.entries.lock().get(contract).and_then(|m| m.symbol.clone())
    }

    pub fn store_decimals(&self, contract: &str, decimals: u8) {
        self.update(contract, |m| m.decimals = Some(decimals));
    }

    pub fn store_name(&self, contract: &str, name: String) {
        self.update(contract, |m| m.name = Some(name));
    }

    pub fn store_symbol(&self, contract: &str, symbol: String) {
        self.update(contract, |m| m.symbol = Some(symbol));
    }

    fn update<F>(&self, contract: &str, apply: F)
    where
        F: FnOnce(&mut TokenMetadata),
    {
        let mut entries = self.entries.lock();
        if let Some(existing) = entries.get_mut(contract) {
            apply(existing);
            return;
        }
        let mut metadata = TokenMetadata::default();
        apply(&mut metadata);
        entries.put(contract.to_string(), metadata);
    }

    pub fn invalidate(&self, contract: &str) -> Option<TokenMetadata> {
        self.entries.lock().pop(contract)
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }
}
