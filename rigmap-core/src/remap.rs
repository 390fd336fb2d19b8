//! In-place rewrite of a constraint's target and source bindings.
//!
//! Resolution (`plan`) only reads the destination tree, so it can run while
//! the component to be rewritten is still borrowed elsewhere; `apply` then
//! mutates the component.

use crate::diagnostics::BuildStats;
use crate::record::SourceBinding;
use crate::resolve::{Reference, Resolution, Resolver};
use crate::rig::{ConstraintComponent, ConstraintSource, NodeId};

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSource {
    pub name: String,
    pub path: String,
    pub weight: f32,
    pub resolution: Option<Resolution>,
}

impl ResolvedSource {
    pub fn node(&self) -> Option<NodeId> {
        self.resolution.map(|r| r.node)
    }

    /// Weight to write: the recorded weight if resolved, else 0.
    pub fn effective_weight(&self) -> f32 {
        if self.resolution.is_some() {
            self.weight.max(0.0)
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RemapPlan {
    pub target_requested: bool,
    pub target: Option<Resolution>,
    pub sources: Vec<ResolvedSource>,
}

impl RemapPlan {
    pub fn stats(&self) -> BuildStats {
        let mut stats = BuildStats::default();
        if self.target_requested {
            stats.record(self.target.is_some());
        }
        for s in &self.sources {
            stats.record(s.resolution.is_some());
        }
        stats
    }

    pub fn unresolved_sources(&self) -> impl Iterator<Item = &ResolvedSource> {
        self.sources.iter().filter(|s| s.resolution.is_none())
    }
}

fn resolve_one(resolver: Option<&Resolver<'_>>, reference: &Reference<'_>) -> Option<Resolution> {
    resolver.and_then(|r| r.resolve(reference))
}

/// Resolves the target once and every source independently. Without a
/// resolver (no armature on the destination) everything stays unresolved.
pub fn plan(resolver: Option<&Resolver<'_>>, target: Reference<'_>, sources: &[SourceBinding]) -> RemapPlan {
    let target_requested = !target.is_empty();
    let target_hit = if target_requested { resolve_one(resolver, &target) } else { None };
    if target_requested && target_hit.is_none() {
        log::warn!("target not found: {target}");
    }

    let sources = sources
        .iter()
        .map(|binding| {
            let resolution = resolve_one(resolver, &binding.reference());
            if resolution.is_none() {
                log::warn!("source not found: {}", binding.reference());
            }
            ResolvedSource {
                name: binding.name.clone(),
                path: binding.path.clone(),
                weight: binding.weight,
                resolution,
            }
        })
        .collect();

    RemapPlan { target_requested, target: target_hit, sources }
}

/// Resizes `sources` to `resolved.len()` and overwrites only the reference
/// and weight of each entry. Extra fields of surviving entries are untouched.
pub fn remap_sources(sources: &mut Vec<ConstraintSource>, resolved: &[(Option<NodeId>, f32)]) {
    sources.truncate(resolved.len());
    while sources.len() < resolved.len() {
        sources.push(ConstraintSource::placeholder());
    }
    for (slot, (node, weight)) in sources.iter_mut().zip(resolved) {
        slot.node = *node;
        slot.weight = if node.is_some() { *weight } else { 0.0 };
    }
}

pub fn apply(component: &mut ConstraintComponent, plan: &RemapPlan) {
    let resolved: Vec<(Option<NodeId>, f32)> =
        plan.sources.iter().map(|s| (s.node(), s.effective_weight())).collect();
    remap_sources(&mut component.sources, &resolved);
    component.target = plan.target.map(|r| r.node);
}

/// `plan` + `apply` for a component that does not live in the resolver's tree.
pub fn remap(
    component: &mut ConstraintComponent,
    sources: &[SourceBinding],
    target: Reference<'_>,
    resolver: &Resolver<'_>,
) -> RemapPlan {
    let p = plan(Some(resolver), target, sources);
    apply(component, &p);
    p
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Strategies;
    use crate::rig::RigTree;
    use serde_json::json;

    fn binding(name: &str, weight: f32) -> SourceBinding {
        SourceBinding { name: name.into(), weight, path: String::new() }
    }

    fn tagged(tag: i64) -> ConstraintSource {
        let mut s = ConstraintSource::new(None, 1.0);
        s.extra.insert("tag".into(), json!(tag));
        s
    }

    #[test]
    fn growing_keeps_existing_extras_and_appends_placeholders() {
        let mut sources = vec![tagged(0), tagged(1), tagged(2)];
        let n = Some(NodeId(4));
        remap_sources(&mut sources, &[(n, 0.1), (n, 0.2), (n, 0.3), (n, 0.4), (n, 0.5)]);
        assert_eq!(sources.len(), 5);
        for (i, s) in sources.iter().take(3).enumerate() {
            assert_eq!(s.extra["tag"], json!(i));
        }
        assert!(sources[3].extra.is_empty() && sources[4].extra.is_empty());
        assert_eq!(sources[4].weight, 0.5);
    }

    #[test]
    fn growing_with_unresolved_tail_leaves_zero_weight_placeholders() {
        let mut sources = vec![tagged(0), tagged(1), tagged(2)];
        let n = Some(NodeId(1));
        remap_sources(&mut sources, &[(n, 1.0), (n, 1.0), (n, 1.0), (None, 0.6), (None, 0.9)]);
        assert_eq!(sources.len(), 5);
        assert_eq!(sources[2].extra["tag"], json!(2));
        for s in &sources[3..] {
            assert_eq!((s.node, s.weight), (None, 0.0));
        }
    }

    #[test]
    fn shrinking_trims_from_the_end() {
        let mut sources = vec![tagged(0), tagged(1), tagged(2)];
        remap_sources(&mut sources, &[(Some(NodeId(2)), 0.5)]);
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].extra["tag"], json!(0));
        assert_eq!(sources[0].node, Some(NodeId(2)));
    }

    #[test]
    fn unresolved_source_is_nulled_with_zero_weight() {
        let mut tree = RigTree::new("Dest");
        let hand = tree.add_child(tree.root(), "hand.l");
        let resolver = Resolver::without_index(&tree, tree.root(), Strategies::all());

        let mut c = ConstraintComponent::new("RotationConstraint");
        c.sources = vec![tagged(7), tagged(8)];
        let p = remap(
            &mut c,
            &[binding("Hand_L", 0.7), binding("Tail_01", 0.3)],
            Reference::new("Hand_L", ""),
            &resolver,
        );
        assert_eq!(c.sources[0].node, Some(hand));
        assert_eq!(c.sources[0].weight, 0.7);
        assert_eq!(c.sources[1].node, None);
        assert_eq!(c.sources[1].weight, 0.0);
        assert_eq!(c.sources[1].extra["tag"], json!(8));
        assert_eq!(c.target, Some(hand));
        assert_eq!(p.unresolved_sources().count(), 1);
        let stats = p.stats();
        assert_eq!((stats.resolved, stats.unresolved), (2, 1));
    }

    #[test]
    fn missing_resolver_leaves_everything_unresolved() {
        let p = plan(None, Reference::default(), &[binding("Hips", 1.0)]);
        assert!(!p.target_requested);
        assert_eq!(p.stats().unresolved, 1);
        let mut c = ConstraintComponent::new("AimConstraint");
        c.target = Some(NodeId(3));
        apply(&mut c, &p);
        assert_eq!(c.target, None);
        assert_eq!(c.sources, vec![ConstraintSource::placeholder()]);
    }
}
