//! Armature root detection from avatar slot maps.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::error::DetectError;
use crate::naming::HumanSlot;
use crate::rig::{NodeId, RigTree};

/// Deepest node that is an ancestor-or-self of every node in `nodes`, looking
/// no higher than `boundary`. `None` if the list is empty or any node lies
/// outside the boundary.
pub fn lowest_common_ancestor(tree: &RigTree, nodes: &[NodeId], boundary: NodeId) -> Option<NodeId> {
    let mut chains = Vec::with_capacity(nodes.len());
    for &node in nodes {
        if !tree.is_self_or_descendant(node, boundary) {
            return None;
        }
        let mut chain: Vec<NodeId> = tree.ancestors(node).take_while(|n| *n != boundary).collect();
        chain.push(boundary);
        chain.reverse();
        chains.push(chain);
    }
    let first = chains.first()?;
    let shortest = chains.iter().map(Vec::len).min().unwrap_or(0);
    let mut lca = None;
    for depth in 0..shortest {
        let candidate = first[depth];
        if chains.iter().all(|c| c[depth] == candidate) {
            lca = Some(candidate);
        } else {
            break;
        }
    }
    lca
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// LCA of the avatar's broad humanoid bones.
    Humanoid,
    /// Avatar without a humanoid map; its own node, score 0.
    GenericAvatar,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootCandidate {
    pub root: NodeId,
    pub avatar: NodeId,
    /// Core slots resolved (0..=8).
    pub score: usize,
    /// Depth of `root` below the search boundary.
    pub depth: usize,
    /// Boundary-relative path, boundary name included.
    pub label: String,
    pub source: CandidateSource,
}

pub fn core_score(bones: &BTreeMap<HumanSlot, NodeId>) -> usize {
    HumanSlot::CORE.iter().filter(|s| bones.contains_key(s)).count()
}

fn humanoid_root(
    tree: &RigTree,
    avatar: NodeId,
    bones: &BTreeMap<HumanSlot, NodeId>,
    boundary: NodeId,
) -> Result<NodeId, DetectError> {
    let broad: Vec<NodeId> = HumanSlot::BROAD
        .iter()
        .filter_map(|s| bones.get(s).copied())
        .filter(|n| tree.contains(*n))
        .collect();
    if broad.is_empty() {
        return Err(DetectError::NoResolvableBones { avatar: tree.name(avatar).to_string() });
    }
    lowest_common_ancestor(tree, &broad, boundary).ok_or_else(|| DetectError::OutsideBoundary {
        avatar: tree.name(avatar).to_string(),
        boundary: tree.name(boundary).to_string(),
    })
}

/// Every humanoid armature root under `boundary`, best first.
///
/// Avatars without a humanoid map are skipped. Duplicate roots keep their
/// highest score. Fails when no avatar yields a broad-slot root, with the
/// reason from the last avatar examined.
pub fn detect_roots(tree: &RigTree, boundary: NodeId) -> Result<Vec<RootCandidate>, DetectError> {
    collect_candidates(tree, boundary, false)
}

/// [`detect_roots`] plus a score-0 candidate for each generic avatar, ranked
/// after the humanoid ones. For listing and explicit selection; automatic
/// builds never use it.
pub fn detect_roots_with_generic(tree: &RigTree, boundary: NodeId) -> Result<Vec<RootCandidate>, DetectError> {
    collect_candidates(tree, boundary, true)
}

fn collect_candidates(
    tree: &RigTree,
    boundary: NodeId,
    include_generic: bool,
) -> Result<Vec<RootCandidate>, DetectError> {
    let avatars = tree.avatars(boundary);
    if avatars.is_empty() {
        return Err(DetectError::NoAvatar { root: tree.name(boundary).to_string() });
    }

    let mut best: Vec<RootCandidate> = Vec::new();
    let mut last_err = None;
    for avatar in avatars {
        let humanoid = tree.node(avatar).avatar.as_ref().and_then(|a| a.humanoid.as_ref());
        let (root, score, source) = match humanoid {
            Some(bones) => match humanoid_root(tree, avatar, bones, boundary) {
                Ok(root) => (root, core_score(bones), CandidateSource::Humanoid),
                Err(e) => {
                    log::debug!("skipping avatar '{}': {e}", tree.name(avatar));
                    last_err = Some(e);
                    continue;
                }
            },
            None if include_generic => (avatar, 0, CandidateSource::GenericAvatar),
            None => {
                log::debug!("skipping non-humanoid avatar '{}'", tree.name(avatar));
                continue;
            }
        };

        let candidate = RootCandidate {
            root,
            avatar,
            score,
            depth: tree.depth_below(boundary, root).unwrap_or(0),
            label: tree.relative_path(boundary, root, true, true),
            source,
        };
        match best.iter_mut().find(|c| c.root == root) {
            Some(existing) if existing.score < score => *existing = candidate,
            Some(_) => {}
            None => best.push(candidate),
        }
    }

    if best.is_empty() {
        return Err(last_err.unwrap_or(DetectError::NoHumanoid { root: tree.name(boundary).to_string() }));
    }
    best.sort_by(|a, b| b.score.cmp(&a.score));
    Ok(best)
}

/// Root of the best humanoid candidate only.
pub fn detect_humanoid_root(tree: &RigTree, boundary: NodeId) -> Result<NodeId, DetectError> {
    detect_roots(tree, boundary)?
        .into_iter()
        .next()
        .map(|c| c.root)
        .ok_or_else(|| DetectError::NoHumanoid { root: tree.name(boundary).to_string() })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootChoice {
    pub index: usize,
    pub root: NodeId,
    /// Set when the pick is the shallowest of two or more candidates;
    /// holds the deepest candidate's root.
    pub deeper_alternative: Option<NodeId>,
}

/// Picks `selected` (default: highest score) and flags a shallow pick.
pub fn choose_root(candidates: &[RootCandidate], selected: Option<usize>) -> Option<RootChoice> {
    let index = selected.unwrap_or(0);
    let picked = candidates.get(index)?;
    let mut choice = RootChoice { index, root: picked.root, deeper_alternative: None };
    if candidates.len() < 2 {
        return Some(choice);
    }
    let min_depth = candidates.iter().map(|c| c.depth).min().unwrap_or(0);
    let deepest = candidates.iter().max_by_key(|c| c.depth);
    if let Some(deepest) = deepest {
        if picked.depth == min_depth && deepest.depth > min_depth {
            choice.deeper_alternative = Some(deepest.root);
        }
    }
    Some(choice)
}

/// Finds the node at the same boundary-relative path in another tree.
pub fn map_by_path(
    from: &RigTree,
    from_boundary: NodeId,
    node: NodeId,
    to: &RigTree,
    to_boundary: NodeId,
) -> Option<NodeId> {
    if node == from_boundary {
        return Some(to_boundary);
    }
    let segments = from.segments_below(from_boundary, node)?;
    let mut current = to_boundary;
    for seg in segments {
        current = to.children(current).iter().copied().find(|c| to.name(*c) == seg)?;
    }
    Some(current)
}
