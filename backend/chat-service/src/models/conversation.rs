/// Canonical form of a username: surrounding whitespace trimmed, lowercased.
/// Returns `None` for blank input.
pub fn normalize_username(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_lowercase())
}

/// Identity of a direct conversation: the unordered pair of normalized
/// usernames, stored with the lexicographically smaller name first.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConversationKey {
    pub low: String,
    pub high: String,
}

impl ConversationKey {
    /// Build a key from two already-normalized usernames.
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                low: a.to_string(),
                high: b.to_string(),
            }
        } else {
            Self {
                low: b.to_string(),
                high: a.to_string(),
            }
        }
    }
}
