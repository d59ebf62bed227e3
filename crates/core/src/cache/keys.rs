use std::time::Duration;

use crate::book::BookId;

/// Cache key for the full collection snapshot.
pub const LIST_ALL_KEY: &str = "list:all";

/// Default time-to-live for cached books.
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Returns the cache key for a single book.
pub fn item_key(id: &BookId) -> String {
    format!("item:{}", id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_key() {
        let key = item_key(&BookId::new("665f1c2e9b1d4a0012345678"));
        assert_eq!(key, "item:665f1c2e9b1d4a0012345678");
    }

    #[test]
    fn test_list_all_key_does_not_collide_with_items() {
        assert_ne!(item_key(&BookId::new("all")), LIST_ALL_KEY);
    }
}
