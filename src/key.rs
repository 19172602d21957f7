//! Cache Key Module
//!
//! Defines the tagged key type produced by key policies.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

// == Cache Key ==
/// A comparable cache key derived from request attributes.
///
/// The key is an explicit sum of the shapes a key policy may produce, rather
/// than an untyped value compared at runtime. The enum discriminant doubles
/// as the type tag, so two keys of different shapes with coincidentally equal
/// payloads (`Text("7")` vs. `Id(7)`) never compare equal and never share an
/// in-flight group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    /// A plain textual key, e.g. a request path or a user id.
    Text(String),
    /// A numeric identifier key.
    Id(u64),
    /// A method name combined with a digest of the call arguments.
    Composite {
        /// Fully-qualified method name.
        method: String,
        /// Stable hash of the argument values.
        digest: u64,
    },
}

impl CacheKey {
    // == Constructors ==
    /// Creates a textual key.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Creates a numeric identifier key.
    pub fn id(id: u64) -> Self {
        Self::Id(id)
    }

    /// Creates a composite key from a method name and hashable arguments.
    ///
    /// Two calls with the same method and equal arguments produce equal keys,
    /// which is exactly the idempotence a key policy must guarantee.
    pub fn composite(method: impl Into<String>, args: &impl Hash) -> Self {
        let mut hasher = DefaultHasher::new();
        args.hash(&mut hasher);
        Self::Composite {
            method: method.into(),
            digest: hasher.finish(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "text:{}", text),
            Self::Id(id) => write!(f, "id:{}", id),
            Self::Composite { method, digest } => {
                write!(f, "{}#{:016x}", method, digest)
            }
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_text_keys_value_equality() {
        assert_eq!(CacheKey::text("users/42"), CacheKey::text("users/42"));
        assert_ne!(CacheKey::text("users/42"), CacheKey::text("users/43"));
    }

    #[test]
    fn test_distinct_shapes_never_collide() {
        // Same logical payload, different shape: must not be the same key.
        assert_ne!(CacheKey::text("7"), CacheKey::id(7));
        assert_ne!(
            CacheKey::id(7),
            CacheKey::Composite {
                method: String::new(),
                digest: 7
            }
        );
    }

    #[test]
    fn test_composite_is_idempotent_per_arguments() {
        let a = CacheKey::composite("svc.Lookup", &("alice", 31u8));
        let b = CacheKey::composite("svc.Lookup", &("alice", 31u8));
        let c = CacheKey::composite("svc.Lookup", &("bob", 31u8));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_composite_method_distinguishes() {
        let a = CacheKey::composite("svc.Lookup", &42u64);
        let b = CacheKey::composite("svc.Delete", &42u64);
        assert_ne!(a, b);
    }

    #[test]
    fn test_keys_usable_as_map_keys() {
        let mut map = HashMap::new();
        map.insert(CacheKey::text("a"), 1);
        map.insert(CacheKey::id(1), 2);

        assert_eq!(map.get(&CacheKey::text("a")), Some(&1));
        assert_eq!(map.get(&CacheKey::id(1)), Some(&2));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(CacheKey::text("users/42").to_string(), "text:users/42");
        assert_eq!(CacheKey::id(9).to_string(), "id:9");
        assert!(CacheKey::composite("svc.Lookup", &1u8)
            .to_string()
            .starts_with("svc.Lookup#"));
    }
}
