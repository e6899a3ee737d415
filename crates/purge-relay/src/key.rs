//! Cache key normalization.
//!
//! Some broker-side producers append a type discriminator to the item key,
//! turning `1:123:456` (`namespace:publicationId:itemId`) into
//! `1:123:456:PageMeta`. Downstream cache eviction only understands the
//! three-segment form, so [`normalize_key`] strips everything after the
//! numeric prefix.

use std::sync::OnceLock;

use regex::Regex;

static KEY_PREFIX: OnceLock<Regex> = OnceLock::new();

fn key_prefix() -> &'static Regex {
    KEY_PREFIX.get_or_init(|| Regex::new(r"^\d+:\d+:\d+").expect("key prefix pattern is valid"))
}

/// Reduces a compound cache key to its canonical three-segment prefix.
///
/// Keys starting with `<digits>:<digits>:<digits>` are truncated to exactly
/// that prefix; any other key is returned unchanged. Total and idempotent.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    match key_prefix().find(key) {
        Some(m) => key[..m.end()].to_string(),
        None => key.to_string(),
    }
}
