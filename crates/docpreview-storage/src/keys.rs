//! Preview key generation.
//!
//! Keys are fresh per attempt so a redelivered job never overwrites the
//! artifact of a concurrent attempt.

use uuid::Uuid;

/// Generate a storage key for an uploaded preview PDF.
pub fn generate_preview_key() -> String {
    format!("previews/{}.pdf", Uuid::new_v4())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_are_unique_and_under_previews_prefix() {
        let keys: HashSet<String> = (0..100).map(|_| generate_preview_key()).collect();
        assert_eq!(keys.len(), 100);
        for key in &keys {
            assert!(key.starts_with("previews/"));
            assert!(key.ends_with(".pdf"));
        }
    }
}
