use serde::{Deserialize, Serialize};

use crate::resolve::Strategies;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetargetConfig {
    pub strategies: StrategyToggles,
    /// Leave components inactive even when activation succeeds.
    pub keep_disabled_after_build: bool,
    pub warn_on_shallow_root: bool,
    /// Wrapper segments dropped from recorded parent paths when the full path
    /// does not exist on the destination.
    pub strip_leading_segments: Vec<String>,
    pub preview_suffix: String,
}

impl Default for RetargetConfig {
    fn default() -> Self {
        Self {
            strategies: StrategyToggles::default(),
            keep_disabled_after_build: false,
            warn_on_shallow_root: true,
            strip_leading_segments: vec!["RotationConstraint".to_string()],
            preview_suffix: "_Preview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrategyToggles {
    pub canonical_slot: bool,
    pub flat_name: bool,
    pub exact_path: bool,
    pub normalized_path: bool,
    pub suffix_path: bool,
}

impl Default for StrategyToggles {
    fn default() -> Self {
        Self {
            canonical_slot: true,
            flat_name: true,
            exact_path: true,
            normalized_path: true,
            suffix_path: true,
        }
    }
}

impl StrategyToggles {
    pub fn to_strategies(self) -> Strategies {
        let mut s = Strategies::empty();
        s.set(Strategies::CANONICAL_SLOT, self.canonical_slot);
        s.set(Strategies::FLAT_NAME, self.flat_name);
        s.set(Strategies::EXACT_PATH, self.exact_path);
        s.set(Strategies::NORMALIZED_PATH, self.normalized_path);
        s.set(Strategies::SUFFIX_PATH, self.suffix_path);
        s
    }
}
