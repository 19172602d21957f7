//! Deep Clone Module
//!
//! Defines the value-level deep-copy capability required of cached responses.

use std::collections::HashMap;
use std::hash::Hash;

// == Deep Clone Trait ==
/// A deep-copy capability for values served from the cache.
///
/// A cache hit would otherwise hand the same stored object to every caller;
/// if the response carries caller-mutable metadata (headers a transport layer
/// rewrites in place, for instance), concurrent callers sharing one instance
/// would corrupt each other's view. Implementations must return a value that
/// is observably equal to `self` but shares no mutable backing storage with
/// it or with any other clone.
///
/// This is deliberately a public contract of the response type itself, not a
/// structural copy performed behind its back. `Arc<T>` intentionally has no
/// implementation: cloning an `Arc` aliases the same allocation, which is
/// precisely what this trait exists to rule out.
pub trait DeepClone: Send + Sync + 'static {
    /// Returns an independent copy of `self`.
    fn deep_clone(&self) -> Self
    where
        Self: Sized;
}

// == Implementations for Owned Primitives ==
macro_rules! impl_deep_clone_for_copy {
    ($($ty:ty),* $(,)?) => {
        $(
            impl DeepClone for $ty {
                fn deep_clone(&self) -> Self {
                    *self
                }
            }
        )*
    };
}

impl_deep_clone_for_copy!(
    (),
    bool,
    char,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    f32,
    f64,
);

impl DeepClone for String {
    fn deep_clone(&self) -> Self {
        // String owns its buffer; a plain clone is already a deep copy.
        self.clone()
    }
}

impl<T: DeepClone> DeepClone for Option<T> {
    fn deep_clone(&self) -> Self {
        self.as_ref().map(DeepClone::deep_clone)
    }
}

impl<T: DeepClone> DeepClone for Vec<T> {
    fn deep_clone(&self) -> Self {
        self.iter().map(DeepClone::deep_clone).collect()
    }
}

impl<K, V> DeepClone for HashMap<K, V>
where
    K: DeepClone + Eq + Hash,
    V: DeepClone,
{
    fn deep_clone(&self) -> Self {
        self.iter()
            .map(|(k, v)| (k.deep_clone(), v.deep_clone()))
            .collect()
    }
}
