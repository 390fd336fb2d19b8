//! YAML rig scenes.
//!
//! Component references are slash paths relative to the scene root; humanoid
//! bone paths are relative to the node that carries the avatar. An empty
//! path names that base node itself.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::SceneError;
use crate::naming::HumanSlot;
use crate::rig::path::split_segments;
use crate::rig::{Avatar, ConstraintComponent, ConstraintSource, NodeId, RigTree};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneNode {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<SceneAvatar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub components: Vec<SceneComponent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<SceneNode>,
}

/// `humanoid: ~` (or absent) describes a generic avatar.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneAvatar {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humanoid: Option<BTreeMap<HumanSlot, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneComponent {
    pub kind: String,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SceneSource>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SceneSource {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node: Option<String>,
    #[serde(default)]
    pub weight: f32,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

struct Pending<'s> {
    node: NodeId,
    scene: &'s SceneNode,
}

fn add_structure<'s>(tree: &mut RigTree, scene: &'s SceneNode, id: NodeId, pending: &mut Vec<Pending<'s>>) {
    pending.push(Pending { node: id, scene });
    for child in &scene.children {
        let child_id = tree.add_child(id, child.name.as_str());
        add_structure(tree, child, child_id, pending);
    }
}

/// Exact, case-sensitive child walk from `base`.
fn lookup(tree: &RigTree, base: NodeId, path: &str) -> Option<NodeId> {
    let mut current = base;
    for seg in split_segments(path) {
        current = tree.children(current).iter().copied().find(|c| tree.name(*c) == seg)?;
    }
    Some(current)
}

impl SceneNode {
    /// Builds the node structure first, then binds avatars and component
    /// references, so references may point anywhere in the scene.
    pub fn to_tree(&self) -> Result<RigTree, SceneError> {
        let mut tree = RigTree::new(self.name.as_str());
        let root = tree.root();
        let mut pending = Vec::new();
        add_structure(&mut tree, self, root, &mut pending);

        for Pending { node, scene } in pending {
            if let Some(avatar) = &scene.avatar {
                let humanoid = match &avatar.humanoid {
                    Some(paths) => {
                        let mut bones = BTreeMap::new();
                        for (slot, path) in paths {
                            let bone = lookup(&tree, node, path).ok_or_else(|| SceneError::UnknownBone {
                                node: scene.name.clone(),
                                slot: *slot,
                                path: path.clone(),
                            })?;
                            bones.insert(*slot, bone);
                        }
                        Some(bones)
                    }
                    None => None,
                };
                tree.node_mut(node).avatar = Some(Avatar { humanoid });
            }

            let mut components = Vec::with_capacity(scene.components.len());
            for sc in &scene.components {
                let resolve = |path: &str| {
                    lookup(&tree, root, path).ok_or_else(|| SceneError::UnknownPath {
                        node: scene.name.clone(),
                        path: path.to_string(),
                    })
                };
                let target = sc.target.as_deref().map(&resolve).transpose()?;
                let mut sources = Vec::with_capacity(sc.sources.len());
                for ss in &sc.sources {
                    sources.push(ConstraintSource {
                        node: ss.node.as_deref().map(&resolve).transpose()?,
                        weight: ss.weight,
                        extra: ss.extra.clone(),
                    });
                }
                components.push(ConstraintComponent {
                    kind: sc.kind.clone(),
                    active: sc.active,
                    params: sc.params.clone(),
                    target,
                    sources,
                });
            }
            tree.node_mut(node).components = components;
        }
        Ok(tree)
    }

    /// Scene document for the subtree at `root`. References that leave the
    /// subtree are dropped with a warning.
    pub fn from_tree(tree: &RigTree, root: NodeId) -> SceneNode {
        export(tree, root, root)
    }
}

fn path_under(tree: &RigTree, base: NodeId, node: NodeId) -> Option<String> {
    if tree.is_self_or_descendant(node, base) {
        Some(tree.relative_path(base, node, true, false))
    } else {
        log::warn!("'{}' is outside '{}', reference dropped", tree.path(node), tree.path(base));
        None
    }
}

fn export(tree: &RigTree, scene_root: NodeId, id: NodeId) -> SceneNode {
    let node = tree.node(id);
    let avatar = node.avatar.as_ref().map(|a| SceneAvatar {
        humanoid: a.humanoid.as_ref().map(|bones| {
            bones
                .iter()
                .filter_map(|(slot, bone)| Some((*slot, path_under(tree, id, *bone)?)))
                .collect()
        }),
    });
    let components = node
        .components
        .iter()
        .map(|c| SceneComponent {
            kind: c.kind.clone(),
            active: c.active,
            params: c.params.clone(),
            target: c.target.and_then(|t| path_under(tree, scene_root, t)),
            sources: c
                .sources
                .iter()
                .map(|s| SceneSource {
                    node: s.node.and_then(|n| path_under(tree, scene_root, n)),
                    weight: s.weight,
                    extra: s.extra.clone(),
                })
                .collect(),
        })
        .collect();
    SceneNode {
        name: node.name.clone(),
        avatar,
        components,
        children: tree.children(id).iter().map(|c| export(tree, scene_root, *c)).collect(),
    }
}

pub fn load_from_yaml_str(s: &str) -> Result<RigTree> {
    let scene: SceneNode = serde_yaml::from_str(s)?;
    Ok(scene.to_tree()?)
}

pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<RigTree> {
    let data = std::fs::read_to_string(path)?;
    load_from_yaml_str(&data)
}

pub fn to_yaml_string(tree: &RigTree, root: NodeId) -> Result<String> {
    Ok(serde_yaml::to_string(&SceneNode::from_tree(tree, root))?)
}
