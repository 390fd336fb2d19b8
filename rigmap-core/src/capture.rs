//! Records every constraint under an import root in a rig-independent form.

use crate::record::{ArmatureProvenance, ConstraintRecord, SourceBinding};
use crate::rig::{ConstraintComponent, NodeId, RigTree};

/// Child of `root` on the way down to `node`; `None` when `node` is `root`
/// or not under it.
fn top_under_root(tree: &RigTree, root: NodeId, node: NodeId) -> Option<NodeId> {
    let mut current = node;
    while let Some(parent) = tree.parent(current) {
        if parent == root {
            return Some(current);
        }
        current = parent;
    }
    None
}

fn bound_references(component: &ConstraintComponent) -> impl Iterator<Item = NodeId> + '_ {
    component
        .target
        .into_iter()
        .chain(component.sources.iter().filter_map(|s| s.node))
}

fn armature_for(
    tree: &RigTree,
    import_root: NodeId,
    node: NodeId,
    component: &ConstraintComponent,
    armature_override: Option<NodeId>,
) -> (Option<NodeId>, ArmatureProvenance) {
    let usable_override = armature_override
        .filter(|o| tree.contains(*o) && tree.is_self_or_descendant(*o, import_root));
    if let Some(root) = usable_override {
        if bound_references(component).any(|r| tree.is_self_or_descendant(r, root)) {
            return (Some(root), ArmatureProvenance::Override);
        }
        if tree.is_self_or_descendant(node, root) {
            return (Some(root), ArmatureProvenance::ConstrainedNodeFallback);
        }
    }

    if let Some(top) = bound_references(component).find_map(|r| top_under_root(tree, import_root, r)) {
        return (Some(top), ArmatureProvenance::BoundReference);
    }
    match top_under_root(tree, import_root, node) {
        Some(top) => (Some(top), ArmatureProvenance::ConstrainedNodeFallback),
        None => (None, ArmatureProvenance::Missing),
    }
}

/// One record per constraint component under `import_root`, pre-order.
///
/// Unbound sources are left out; payloads never contain node references.
pub fn capture(tree: &RigTree, import_root: NodeId, armature_override: Option<NodeId>) -> Vec<ConstraintRecord> {
    let mut records = Vec::new();
    for (node, i) in tree.components_under(import_root) {
        let component = &tree.node(node).components[i];
        let (armature, provenance) = armature_for(tree, import_root, node, component, armature_override);
        match provenance {
            ArmatureProvenance::ConstrainedNodeFallback => log::warn!(
                "'{}': armature root derived from the constrained node itself; recorded paths may be unreliable",
                tree.relative_path(import_root, node, true, false)
            ),
            ArmatureProvenance::Missing => log::warn!(
                "'{}': no armature root found, recording names only",
                tree.relative_path(import_root, node, true, false)
            ),
            _ => {}
        }

        let rel = |target: NodeId| armature.map(|a| tree.relative_path(a, target, true, false)).unwrap_or_default();
        let sources = component
            .sources
            .iter()
            .filter_map(|s| {
                let bound = s.node?;
                Some(SourceBinding { name: tree.name(bound).to_string(), weight: s.weight.max(0.0), path: rel(bound) })
            })
            .collect();

        let record = ConstraintRecord {
            empty_name: tree.name(node).to_string(),
            parent_path: tree
                .parent(node)
                .map(|p| tree.relative_path(import_root, p, true, false))
                .unwrap_or_default(),
            constraint_path: rel(node),
            armature_root_name: armature.map(|a| tree.name(a).to_string()).unwrap_or_default(),
            armature_root_path: armature
                .map(|a| tree.relative_path(import_root, a, true, false))
                .unwrap_or_default(),
            armature_provenance: provenance,
            component_type: component.kind.clone(),
            payload: component.snapshot(),
            target_name: component.target.map(|t| tree.name(t).to_string()).unwrap_or_default(),
            target_path: component.target.map(rel).unwrap_or_default(),
            sources,
        };
        log::debug!(
            "captured {} on '{}' ({} sources)",
            record.component_type,
            record.empty_name,
            record.sources.len()
        );
        records.push(record);
    }
    log::info!("captured {} constraint(s) under '{}'", records.len(), tree.name(import_root));
    records
}
