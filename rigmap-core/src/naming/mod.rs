//! Joint-name vocabulary: tokenizer, canonical alias registry and humanoid slots.

pub mod registry;
pub mod slot;
pub mod tokenize;

use std::fmt;
use std::sync::Arc;

use serde::Serialize;

pub use registry::{canonical_for_slot, canonical_of, normalize, registry, slot_of, Registry};
pub use slot::{HumanSlot, UnknownSlot};
pub use tokenize::{canonical_key, tokenize, Segment, Side};

/// Canonical joint identifier such as `left_thumb_proximal` or `hips`.
///
/// Never empty. Cloning shares the underlying string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalKey(Arc<str>);

impl CanonicalKey {
    pub fn new(key: &str) -> Option<Self> {
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(Self(Arc::from(key)))
        }
    }

    pub(crate) fn compose(side: Option<Side>, base: &str, segment: Option<Segment>) -> Self {
        let mut key = String::new();
        if let Some(side) = side {
            key.push_str(side.as_str());
            key.push('_');
        }
        key.push_str(base);
        if let Some(segment) = segment {
            key.push('_');
            key.push_str(segment.as_str());
        }
        Self(Arc::from(key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key in the same form as [`normalize`] output, for comparison with raw names.
    pub fn normalized(&self) -> String {
        normalize(&self.0)
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
