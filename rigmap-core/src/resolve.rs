//! Reference resolution cascade.
//!
//! A recorded reference (name, slash path, optional humanoid slot) is mapped
//! onto a destination armature by trying each enabled strategy in order; the
//! first hit wins.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::index::{normalize_path_key, HierarchyPathIndex, PathIndexCache};
use crate::naming::{canonical_key, canonical_of, normalize, slot_of, HumanSlot};
use crate::rig::path::{name_equals, split_segments};
use crate::rig::{NodeId, RigTree};

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct Strategies: u8 {
        const CANONICAL_SLOT = 1 << 0;
        const FLAT_NAME = 1 << 1;
        const EXACT_PATH = 1 << 2;
        const NORMALIZED_PATH = 1 << 3;
        const SUFFIX_PATH = 1 << 4;
    }
}

impl Default for Strategies {
    fn default() -> Self {
        Strategies::all()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    CanonicalSlot,
    FlatName,
    ExactPath,
    NormalizedPath,
    SuffixPath,
}

impl Strategy {
    pub const ORDER: [Strategy; 5] = [
        Strategy::CanonicalSlot,
        Strategy::FlatName,
        Strategy::ExactPath,
        Strategy::NormalizedPath,
        Strategy::SuffixPath,
    ];

    pub fn flag(self) -> Strategies {
        match self {
            Strategy::CanonicalSlot => Strategies::CANONICAL_SLOT,
            Strategy::FlatName => Strategies::FLAT_NAME,
            Strategy::ExactPath => Strategies::EXACT_PATH,
            Strategy::NormalizedPath => Strategies::NORMALIZED_PATH,
            Strategy::SuffixPath => Strategies::SUFFIX_PATH,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Strategy::CanonicalSlot => "canonical_slot",
            Strategy::FlatName => "flat_name",
            Strategy::ExactPath => "exact_path",
            Strategy::NormalizedPath => "normalized_path",
            Strategy::SuffixPath => "suffix_path",
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(&s.replace('-', "_"));
        Strategy::ORDER
            .into_iter()
            .find(|st| normalize(st.name()) == wanted)
            .ok_or_else(|| format!("unknown strategy '{s}'"))
    }
}

/// What was recorded about a joint on the source rig.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reference<'a> {
    pub name: &'a str,
    /// Slash path relative to the source armature root.
    pub path: &'a str,
    pub slot: Option<HumanSlot>,
}

impl<'a> Reference<'a> {
    pub fn new(name: &'a str, path: &'a str) -> Self {
        Self { name, path, slot: None }
    }

    pub fn with_slot(mut self, slot: HumanSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty() && self.path.trim().is_empty() && self.slot.is_none()
    }
}

impl fmt::Display for Reference<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "name='{}' path='{}'", self.name, self.path)?;
        if let Some(slot) = self.slot {
            write!(f, " slot={slot}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub node: NodeId,
    pub strategy: Strategy,
}

/// Destination a reference is resolved against.
pub struct Scope<'a> {
    pub tree: &'a RigTree,
    pub root: NodeId,
    pub index: Option<&'a HierarchyPathIndex>,
}

type StrategyFn = fn(&Scope<'_>, &Reference<'_>) -> Option<NodeId>;

const CASCADE: [(Strategy, StrategyFn); 5] = [
    (Strategy::CanonicalSlot, by_canonical_slot),
    (Strategy::FlatName, by_flat_name),
    (Strategy::ExactPath, by_exact_path),
    (Strategy::NormalizedPath, by_normalized_path),
    (Strategy::SuffixPath, by_suffix_path),
];

pub struct Resolver<'a> {
    scope: Scope<'a>,
    enabled: Strategies,
}

impl<'a> Resolver<'a> {
    /// Borrows (building if needed) the path index for `root` from `cache`.
    pub fn new(tree: &'a RigTree, root: NodeId, enabled: Strategies, cache: &'a mut PathIndexCache) -> Self {
        let index = if enabled.contains(Strategies::NORMALIZED_PATH) && tree.contains(root) {
            Some(cache.get_or_build(tree, root))
        } else {
            None
        };
        Self { scope: Scope { tree, root, index }, enabled }
    }

    /// Resolver without a path index; the normalized-path strategy never hits.
    pub fn without_index(tree: &'a RigTree, root: NodeId, enabled: Strategies) -> Self {
        Self { scope: Scope { tree, root, index: None }, enabled }
    }

    pub fn root(&self) -> NodeId {
        self.scope.root
    }

    pub fn tree(&self) -> &'a RigTree {
        self.scope.tree
    }

    pub fn resolve(&self, reference: &Reference<'_>) -> Option<Resolution> {
        if !self.scope.tree.contains(self.scope.root) || reference.is_empty() {
            return None;
        }
        for (strategy, find) in CASCADE.iter() {
            if !self.enabled.contains(strategy.flag()) {
                continue;
            }
            if let Some(node) = find(&self.scope, reference) {
                log::debug!(
                    "resolved {reference} -> '{}' via {strategy}",
                    self.scope.tree.relative_path(self.scope.root, node, true, true)
                );
                return Some(Resolution { node, strategy: *strategy });
            }
        }
        None
    }
}

fn by_canonical_slot(scope: &Scope<'_>, reference: &Reference<'_>) -> Option<NodeId> {
    let slot = match reference.slot {
        Some(slot) => slot,
        None => slot_of(&canonical_of(reference.name)?)?,
    };
    let (_, bones) = scope.tree.nearest_humanoid(scope.root)?;
    let node = bones.get(&slot).copied()?;
    (scope.tree.contains(node) && scope.tree.is_self_or_descendant(node, scope.root)).then_some(node)
}

/// Normalized name, alias key and tokenizer key of a raw name, deduplicated.
fn name_keys(raw: &str) -> Vec<String> {
    let mut keys = Vec::with_capacity(3);
    let normalized = normalize(raw);
    if normalized.is_empty() {
        return keys;
    }
    let alias = canonical_of(&normalized).map(|k| k.normalized());
    let token = canonical_key(raw).map(|k| k.normalized());
    keys.push(normalized);
    for key in [alias, token].into_iter().flatten() {
        if !keys.contains(&key) {
            keys.push(key);
        }
    }
    keys
}

/// Plain normalized names are tried across the whole subtree before alias or
/// tokenizer keys of destination nodes, so a literal match beats a looser one.
fn by_flat_name(scope: &Scope<'_>, reference: &Reference<'_>) -> Option<NodeId> {
    let wanted = name_keys(reference.name);
    if wanted.is_empty() {
        return None;
    }
    let nodes = scope.tree.descendants(scope.root);
    nodes
        .iter()
        .copied()
        .find(|n| wanted.contains(&normalize(scope.tree.name(*n))))
        .or_else(|| {
            nodes
                .iter()
                .copied()
                .find(|n| name_keys(scope.tree.name(*n)).iter().skip(1).any(|k| wanted.contains(k)))
        })
}

fn by_exact_path(scope: &Scope<'_>, reference: &Reference<'_>) -> Option<NodeId> {
    let segments = split_segments(reference.path);
    scope.tree.find_by_segments(scope.root, &segments)
}

fn by_normalized_path(scope: &Scope<'_>, reference: &Reference<'_>) -> Option<NodeId> {
    let index = scope.index?;
    let segments = split_segments(reference.path);
    index.get(&normalize_path_key(&segments)?)
}

fn by_suffix_path(scope: &Scope<'_>, reference: &Reference<'_>) -> Option<NodeId> {
    let wanted = split_segments(reference.path);
    if wanted.is_empty() {
        return None;
    }
    scope.tree.descendants(scope.root).into_iter().skip(1).find(|n| {
        scope.tree.segments_below(scope.root, *n).is_some_and(|segs| {
            segs.len() >= wanted.len()
                && segs[segs.len() - wanted.len()..]
                    .iter()
                    .zip(wanted.iter())
                    .all(|(a, b)| name_equals(a, b))
        })
    })
}

/// One-shot resolution of a name/path pair under `root`.
pub fn resolve_reference(
    tree: &RigTree,
    root: NodeId,
    reference: &Reference<'_>,
    enabled: Strategies,
    cache: &mut PathIndexCache,
) -> Option<Resolution> {
    Resolver::new(tree, root, enabled, cache).resolve(reference)
}
