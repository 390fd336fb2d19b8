//! Arena-backed rig hierarchy.
//!
//! - `RigTree` owns every node; `NodeId` is an index into it
//! - every tree gets a fresh `RigId` on construction and on clone, used as
//!   the identity for path index caches
//! - nodes may carry an `Avatar` and any number of constraint components

pub mod component;
pub mod path;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::naming::HumanSlot;
pub use component::{ConstraintComponent, ConstraintSource};
use path::name_equals;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RigId(u64);

static NEXT_RIG_ID: AtomicU64 = AtomicU64::new(1);

impl RigId {
    fn fresh() -> Self {
        RigId(NEXT_RIG_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Animation avatar description. Only humanoid avatars carry a slot map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Avatar {
    pub humanoid: Option<BTreeMap<HumanSlot, NodeId>>,
}

impl Avatar {
    pub fn generic() -> Self {
        Self { humanoid: None }
    }

    pub fn humanoid(bones: BTreeMap<HumanSlot, NodeId>) -> Self {
        Self { humanoid: Some(bones) }
    }

    pub fn is_human(&self) -> bool {
        self.humanoid.is_some()
    }

    pub fn bone(&self, slot: HumanSlot) -> Option<NodeId> {
        self.humanoid.as_ref()?.get(&slot).copied()
    }
}

#[derive(Debug, Clone)]
pub struct RigNode {
    pub name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    pub avatar: Option<Avatar>,
    pub components: Vec<ConstraintComponent>,
}

#[derive(Debug)]
pub struct RigTree {
    id: RigId,
    nodes: Vec<RigNode>,
}

impl Clone for RigTree {
    fn clone(&self) -> Self {
        Self { id: RigId::fresh(), nodes: self.nodes.clone() }
    }
}

impl RigTree {
    pub fn new(root_name: impl Into<String>) -> Self {
        let root = RigNode {
            name: root_name.into(),
            parent: None,
            children: Vec::new(),
            avatar: None,
            components: Vec::new(),
        };
        Self { id: RigId::fresh(), nodes: vec![root] }
    }

    pub fn id(&self) -> RigId {
        self.id
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: NodeId) -> bool {
        id.0 < self.nodes.len()
    }

    pub fn get(&self, id: NodeId) -> Option<&RigNode> {
        self.nodes.get(id.0)
    }

    /// Panics when `id` belongs to another tree.
    pub fn node(&self, id: NodeId) -> &RigNode {
        &self.nodes[id.0]
    }

    pub fn node_mut(&mut self, id: NodeId) -> &mut RigNode {
        &mut self.nodes[id.0]
    }

    pub fn name(&self, id: NodeId) -> &str {
        &self.nodes[id.0].name
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(RigNode {
            name: name.into(),
            parent: Some(parent),
            children: Vec::new(),
            avatar: None,
            components: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// `id` and everything below it, pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            out.push(n);
            stack.extend(self.nodes[n.0].children.iter().rev().copied());
        }
        out
    }

    /// `id`, its parent, and so on up to the tree root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |n| self.nodes[n.0].parent)
    }

    pub fn is_self_or_descendant(&self, node: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(node).any(|n| n == ancestor)
    }

    /// Number of edges from `ancestor` down to `node`.
    pub fn depth_below(&self, ancestor: NodeId, node: NodeId) -> Option<usize> {
        self.ancestors(node).position(|n| n == ancestor)
    }

    /// Names from just below `root` down to `node` (inclusive).
    pub fn segments_below(&self, root: NodeId, node: NodeId) -> Option<Vec<&str>> {
        let mut names = Vec::new();
        for n in self.ancestors(node) {
            if n == root {
                names.reverse();
                return Some(names);
            }
            names.push(self.name(n));
        }
        None
    }

    /// Slash path of `target` relative to `root`; empty when `target` is not
    /// under `root`.
    pub fn relative_path(&self, root: NodeId, target: NodeId, include_self: bool, include_root: bool) -> String {
        if target == root {
            return if include_root { self.name(root).to_string() } else { String::new() };
        }
        let Some(mut segments) = self.segments_below(root, target) else {
            return String::new();
        };
        if !include_self {
            segments.pop();
        }
        if include_root {
            segments.insert(0, self.name(root));
        }
        segments.join("/")
    }

    /// Absolute path from the tree root, root name included.
    pub fn path(&self, id: NodeId) -> String {
        let mut names: Vec<&str> = self.ancestors(id).map(|n| self.name(n)).collect();
        names.reverse();
        names.join("/")
    }

    pub fn find_child(&self, parent: NodeId, name: &str) -> Option<NodeId> {
        self.children(parent).iter().copied().find(|c| name_equals(self.name(*c), name))
    }

    /// Walks child names from `root`. A first segment naming `root` itself is
    /// skipped. Empty input finds nothing.
    pub fn find_by_segments<S: AsRef<str>>(&self, root: NodeId, segments: &[S]) -> Option<NodeId> {
        let mut segs = segments.iter().map(|s| AsRef::<str>::as_ref(s)).peekable();
        segs.peek()?;
        if segs.peek().is_some_and(|first| name_equals(first, self.name(root))) {
            segs.next();
        }
        let mut current = root;
        for seg in segs {
            current = self.find_child(current, seg)?;
        }
        Some(current)
    }

    /// First node under `root` (inclusive, pre-order) with a matching name.
    pub fn find_by_name(&self, root: NodeId, name: &str) -> Option<NodeId> {
        if name.trim().is_empty() {
            return None;
        }
        self.descendants(root).into_iter().find(|n| name_equals(self.name(*n), name))
    }

    /// Finds or creates each segment below `root`. Returns the final node and
    /// how many nodes were created.
    pub fn ensure_path<S: AsRef<str>>(&mut self, root: NodeId, segments: &[S]) -> (NodeId, usize) {
        let mut current = root;
        let mut created = 0;
        for seg in segments {
            let seg = seg.as_ref();
            current = match self.find_child(current, seg) {
                Some(existing) => existing,
                None => {
                    created += 1;
                    self.add_child(current, seg)
                }
            };
        }
        (current, created)
    }

    /// Closest node at or above `id` whose avatar has a humanoid map.
    pub fn nearest_humanoid(&self, id: NodeId) -> Option<(NodeId, &BTreeMap<HumanSlot, NodeId>)> {
        self.ancestors(id).find_map(|n| {
            let map = self.nodes[n.0].avatar.as_ref()?.humanoid.as_ref()?;
            Some((n, map))
        })
    }

    /// Nodes under `root` (inclusive) that carry an avatar, pre-order.
    pub fn avatars(&self, root: NodeId) -> Vec<NodeId> {
        self.descendants(root)
            .into_iter()
            .filter(|n| self.nodes[n.0].avatar.is_some())
            .collect()
    }

    /// `(node, component index)` for every component under `root`, pre-order.
    pub fn components_under(&self, root: NodeId) -> Vec<(NodeId, usize)> {
        self.descendants(root)
            .into_iter()
            .flat_map(|n| (0..self.nodes[n.0].components.len()).map(move |i| (n, i)))
            .collect()
    }

    pub fn rename(&mut self, id: NodeId, name: impl Into<String>) {
        self.nodes[id.0].name = name.into();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (RigTree, NodeId, NodeId, NodeId, NodeId) {
        let mut t = RigTree::new("Body");
        let arm = t.add_child(t.root(), "Armature");
        let hips = t.add_child(arm, "Hips");
        let spine = t.add_child(hips, "Spine");
        let leg = t.add_child(hips, "UpperLeg_L");
        (t, arm, hips, spine, leg)
    }

    #[test]
    fn descendants_are_preorder() {
        let (t, arm, hips, spine, leg) = sample();
        assert_eq!(t.descendants(t.root()), vec![t.root(), arm, hips, spine, leg]);
        assert_eq!(t.descendants(leg), vec![leg]);
    }

    #[test]
    fn relative_paths() {
        let (t, arm, hips, spine, _) = sample();
        assert_eq!(t.relative_path(arm, spine, true, false), "Hips/Spine");
        assert_eq!(t.relative_path(arm, spine, false, false), "Hips");
        assert_eq!(t.relative_path(arm, hips, true, true), "Armature/Hips");
        assert_eq!(t.relative_path(arm, arm, true, false), "");
        assert_eq!(t.relative_path(spine, arm, true, false), "");
        assert_eq!(t.path(spine), "Body/Armature/Hips/Spine");
        assert_eq!(t.depth_below(arm, spine), Some(2));
        assert_eq!(t.depth_below(spine, arm), None);
    }

    #[test]
    fn find_by_segments_skips_root_name() {
        let (t, arm, _, spine, _) = sample();
        assert_eq!(t.find_by_segments(arm, &["Hips", "Spine"]), Some(spine));
        assert_eq!(t.find_by_segments(arm, &["armature", "hips", "spine."]), Some(spine));
        assert_eq!(t.find_by_segments(arm, &["Hips", "Chest"]), None);
        assert_eq!(t.find_by_segments::<&str>(arm, &[]), None);
    }

    #[test]
    fn ensure_path_creates_missing_nodes_once() {
        let (mut t, arm, hips, _, _) = sample();
        let (node, created) = t.ensure_path(arm, &["Hips", "Tail", "Tip"]);
        assert_eq!(created, 2);
        assert_eq!(t.relative_path(arm, node, true, false), "Hips/Tail/Tip");
        assert_eq!(t.parent(t.parent(node).unwrap()), Some(hips));
        let (again, created) = t.ensure_path(arm, &["hips", "tail", "tip"]);
        assert_eq!((again, created), (node, 0));
    }

    #[test]
    fn clone_gets_fresh_identity() {
        let (t, _, _, spine, _) = sample();
        let c = t.clone();
        assert_ne!(t.id(), c.id());
        assert_eq!(c.name(spine), "Spine");
    }

    #[test]
    fn nearest_humanoid_walks_up() {
        let (mut t, arm, hips, spine, _) = sample();
        assert!(t.nearest_humanoid(spine).is_none());
        let root = t.root();
        t.node_mut(root).avatar = Some(Avatar::humanoid(BTreeMap::from([(HumanSlot::Hips, hips)])));
        let (owner, map) = t.nearest_humanoid(spine).unwrap();
        assert_eq!(owner, root);
        assert_eq!(map.get(&HumanSlot::Hips), Some(&hips));
        t.node_mut(arm).avatar = Some(Avatar::generic());
        assert_eq!(t.nearest_humanoid(spine).map(|(n, _)| n), Some(root));
        assert_eq!(t.avatars(root), vec![root, arm]);
    }
}
