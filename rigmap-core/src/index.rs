//! Normalized hierarchy path index with ambiguity tracking.
//!
//! Each path segment is reduced to a canonical key (alias table, then
//! tokenizer, then the plain normalized name) so `Armature/Upper_Arm.L` and
//! `armature/UpperArm_L` share a key. Keys reached by two different nodes are
//! ambiguous and never resolve.

use std::collections::{HashMap, HashSet};

use crate::naming::{canonical_key, canonical_of, normalize};
use crate::rig::{NodeId, RigId, RigTree};

/// Canonical form of one path segment; empty when the name has no content.
pub fn normalize_segment(segment: &str) -> String {
    let normalized = normalize(segment);
    if normalized.is_empty() {
        return normalized;
    }
    if let Some(key) = canonical_of(&normalized) {
        return key.to_string();
    }
    if let Some(key) = canonical_key(segment) {
        return key.to_string();
    }
    normalized
}

/// Slash-joined segment keys. `None` if any segment normalizes to nothing.
pub fn normalize_path_key<S: AsRef<str>>(segments: &[S]) -> Option<String> {
    if segments.is_empty() {
        return None;
    }
    let mut key = String::new();
    for (i, seg) in segments.iter().enumerate() {
        let part = normalize_segment(seg.as_ref());
        if part.is_empty() {
            return None;
        }
        if i > 0 {
            key.push('/');
        }
        key.push_str(&part);
    }
    Some(key)
}

#[derive(Debug, Default, Clone)]
pub struct HierarchyPathIndex {
    map: HashMap<String, NodeId>,
    ambiguous: HashSet<String>,
}

impl HierarchyPathIndex {
    /// Indexes every strict descendant of `root` by its normalized relative path.
    pub fn build(tree: &RigTree, root: NodeId) -> Self {
        let mut index = Self::default();
        let mut stack: Vec<(NodeId, String)> = tree
            .children(root)
            .iter()
            .rev()
            .map(|c| (*c, String::new()))
            .collect();

        while let Some((node, prefix)) = stack.pop() {
            let part = normalize_segment(tree.name(node));
            // A nameless segment poisons the whole subtree below it.
            if part.is_empty() {
                continue;
            }
            let key = if prefix.is_empty() { part } else { format!("{prefix}/{part}") };
            for child in tree.children(node).iter().rev() {
                stack.push((*child, key.clone()));
            }
            index.insert(key, node);
        }
        index
    }

    fn insert(&mut self, key: String, node: NodeId) {
        if self.ambiguous.contains(&key) {
            return;
        }
        match self.map.get(&key) {
            Some(existing) if *existing != node => {
                self.map.remove(&key);
                self.ambiguous.insert(key);
            }
            Some(_) => {}
            None => {
                self.map.insert(key, node);
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<NodeId> {
        self.map.get(key).copied()
    }

    /// Normalizes a raw slash path and looks it up.
    pub fn lookup(&self, path: &str) -> Option<NodeId> {
        let segments = crate::rig::path::split_segments(path);
        self.get(&normalize_path_key(&segments)?)
    }

    pub fn is_ambiguous(&self, key: &str) -> bool {
        self.ambiguous.contains(key)
    }

    pub fn ambiguous_keys(&self) -> impl Iterator<Item = &str> {
        self.ambiguous.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Owned cache of path indices keyed by (rig identity, root node).
///
/// Nothing here notices tree edits; callers invalidate after structural changes.
#[derive(Debug, Default)]
pub struct PathIndexCache {
    entries: HashMap<(RigId, NodeId), HierarchyPathIndex>,
}

impl PathIndexCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_build(&mut self, tree: &RigTree, root: NodeId) -> &HierarchyPathIndex {
        self.entries
            .entry((tree.id(), root))
            .or_insert_with(|| HierarchyPathIndex::build(tree, root))
    }

    pub fn rebuild(&mut self, tree: &RigTree, root: NodeId) -> &HierarchyPathIndex {
        let index = HierarchyPathIndex::build(tree, root);
        log::debug!("rebuilt path index for '{}' ({} keys)", tree.name(root), index.len());
        let slot = self.entries.entry((tree.id(), root)).or_default();
        *slot = index;
        slot
    }

    pub fn invalidate(&mut self, rig: RigId, root: NodeId) -> bool {
        self.entries.remove(&(rig, root)).is_some()
    }

    /// Drops every index built for `rig`. Returns how many were dropped.
    pub fn invalidate_rig(&mut self, rig: RigId) -> usize {
        let before = self.entries.len();
        self.entries.retain(|(id, _), _| *id != rig);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_keys_collapse_spelling_variants() {
        assert_eq!(normalize_segment("Upper_Arm.L"), "left_arm");
        assert_eq!(normalize_segment("LeftUpperArm"), "left_arm");
        assert_eq!(normalize_segment("Armature"), "armature");
        assert_eq!(normalize_segment("__"), "");
        assert_eq!(
            normalize_path_key(&["Armature", "Hips", "Spine"]).as_deref(),
            Some("armature/hips/spine")
        );
        assert_eq!(normalize_path_key(&["Hips", "."]), None);
        assert_eq!(normalize_path_key::<&str>(&[]), None);
    }

    #[test]
    fn indexes_relative_paths() {
        let mut t = RigTree::new("Outfit");
        let arm = t.add_child(t.root(), "Armature");
        let hips = t.add_child(arm, "Hips");
        let ua = t.add_child(hips, "Upper_Arm.L");
        let index = HierarchyPathIndex::build(&t, t.root());
        assert_eq!(index.len(), 3);
        assert_eq!(index.lookup("armature/HIPS/UpperArm_L"), Some(ua));
        assert_eq!(index.lookup("Armature/Hips"), Some(hips));
        assert_eq!(index.lookup(""), None);
    }

    #[test]
    fn colliding_paths_become_ambiguous_but_exact_walk_still_works() {
        let mut t = RigTree::new("Outfit");
        let hips = t.add_child(t.root(), "Hips");
        let a = t.add_child(hips, "Hand_L");
        let b = t.add_child(hips, "hand.l");
        let index = HierarchyPathIndex::build(&t, t.root());
        assert!(index.is_ambiguous("hips/left_hand"));
        assert_eq!(index.get("hips/left_hand"), None);
        assert_eq!(index.lookup("Hips/Hand_L"), None);
        assert_eq!(t.find_by_segments(t.root(), &["Hips", "Hand_L"]), Some(a));
        assert_eq!(t.find_by_segments(t.root(), &["Hips", "hand.l"]), Some(b));
    }

    #[test]
    fn ambiguity_is_permanent_for_a_build() {
        let mut t = RigTree::new("Root");
        for name in ["Spine", "spine", "SPINE."] {
            t.add_child(t.root(), name);
        }
        let index = HierarchyPathIndex::build(&t, t.root());
        assert!(index.is_ambiguous("spine"));
        assert!(index.is_empty());
        assert_eq!(index.ambiguous_keys().count(), 1);
    }

    #[test]
    fn cache_is_keyed_by_rig_identity_and_invalidated_explicitly() {
        let mut t = RigTree::new("Outfit");
        let hips = t.add_child(t.root(), "Hips");
        let mut cache = PathIndexCache::new();
        assert_eq!(cache.get_or_build(&t, t.root()).len(), 1);

        let spine = t.add_child(hips, "Spine");
        // stale until invalidated
        assert_eq!(cache.get_or_build(&t, t.root()).lookup("Hips/Spine"), None);
        assert_eq!(cache.rebuild(&t, t.root()).lookup("Hips/Spine"), Some(spine));

        let copy = t.clone();
        cache.get_or_build(&copy, copy.root());
        cache.get_or_build(&t, hips);
        assert_eq!(cache.len(), 3);
        assert_eq!(cache.invalidate_rig(t.id()), 2);
        assert!(cache.invalidate(copy.id(), copy.root()));
        assert!(cache.is_empty());
    }
}
