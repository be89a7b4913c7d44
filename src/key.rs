use std::fmt;

/// Namespace prepended to every caller identifier to form its store key.
pub const EMBEDDING_KEY_PREFIX: &str = "embedding::";

/// Store key of an indexed document: `embedding::<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey(String);

impl DocumentKey {
    pub fn for_id(id: &str) -> Self {
        DocumentKey(format!("{EMBEDDING_KEY_PREFIX}{id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Caller identifier this key was derived from.
    pub fn id(&self) -> &str {
        normalize_hit_key(&self.0)
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DocumentKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Map a key returned by the vector index back to a caller identifier.
///
/// The index may report either the prefixed store key or the bare identifier. Exactly one
/// leading prefix is removed; anything else is returned unchanged.
pub fn normalize_hit_key(raw: &str) -> &str {
    raw.strip_prefix(EMBEDDING_KEY_PREFIX).unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_for_id_prefixes_identifier() {
        let key = DocumentKey::for_id("doc1");
        assert_eq!(key.as_str(), "embedding::doc1");
        assert_eq!(key.to_string(), "embedding::doc1");
        assert_eq!(key.id(), "doc1");
    }

    #[test]
    fn normalize_strips_prefix() {
        assert_eq!(normalize_hit_key("embedding::doc1"), "doc1");
        assert_eq!(normalize_hit_key("embedding::notes.json"), "notes.json");
    }

    #[test]
    fn normalize_leaves_bare_identifiers_alone() {
        assert_eq!(normalize_hit_key("doc1"), "doc1");
        assert_eq!(normalize_hit_key(""), "");
        assert_eq!(normalize_hit_key("other::doc1"), "other::doc1");
    }

    #[test]
    fn normalize_strips_only_one_prefix() {
        assert_eq!(
            normalize_hit_key("embedding::embedding::doc1"),
            "embedding::doc1"
        );
        assert_eq!(normalize_hit_key("embedding::"), "");
    }

    #[test]
    fn normalize_then_derive_is_stable() {
        for raw in ["embedding::a", "a"] {
            assert_eq!(
                DocumentKey::for_id(normalize_hit_key(raw)).as_str(),
                "embedding::a"
            );
        }
    }
}
