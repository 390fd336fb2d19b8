//! Rebuilds captured constraints on destination rigs.
//!
//! - `Builder::build` replays records under an outfit root
//! - `Builder::build_detected` finds the armature root first
//! - `Builder::build_batch` handles independent destinations; one failing
//!   destination does not stop the others
//! - `Builder::build_preview` works on a clone and leaves the input untouched

use serde::Serialize;

use crate::armature::{choose_root, detect_roots, map_by_path};
use crate::config::RetargetConfig;
use crate::diagnostics::BuildStats;
use crate::error::{BuildError, DetectError};
use crate::index::PathIndexCache;
use crate::record::ConstraintRecord;
use crate::remap;
use crate::resolve::Resolver;
use crate::rig::path::{split_segments, strip_leading};
use crate::rig::{ConstraintComponent, NodeId, RigTree};

/// Host hook that turns a freshly configured component on.
pub trait ComponentActivator {
    /// Returns `false` when the component could not be activated.
    fn activate(&mut self, component: &mut ConstraintComponent) -> bool;
}

/// Sets `active` and always succeeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkActive;

impl ComponentActivator for MarkActive {
    fn activate(&mut self, component: &mut ConstraintComponent) -> bool {
        component.active = true;
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    Completed,
    /// Activation failed; the component was left inactive.
    ActivationFailed,
    /// No node could be found or created for the record.
    NodeUnavailable,
    /// The record names no component type.
    ComponentUnavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordOutcome {
    pub empty_name: String,
    pub node: Option<NodeId>,
    pub armature: Option<NodeId>,
    pub status: RecordStatus,
    pub stats: BuildStats,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub destination: String,
    pub outcomes: Vec<RecordOutcome>,
    pub stats: BuildStats,
    pub warnings: Vec<String>,
}

impl BuildReport {
    fn new(destination: &str) -> Self {
        Self { destination: destination.to_string(), ..Self::default() }
    }

    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.status == RecordStatus::Completed).count()
    }
}

/// A destination rig for batch builds. `armature: None` means detect.
#[derive(Debug, Clone)]
pub struct Destination {
    pub label: String,
    pub tree: RigTree,
    pub root: NodeId,
    pub armature: Option<NodeId>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub built: Vec<BuildReport>,
    pub skipped: Vec<(String, BuildError)>,
}

impl BatchReport {
    pub fn stats(&self) -> BuildStats {
        let mut total = BuildStats::default();
        for r in &self.built {
            total.merge(r.stats);
        }
        total
    }
}

#[derive(Debug)]
pub struct Preview {
    pub tree: RigTree,
    pub root: NodeId,
    /// `None` when no armature could be found on the clone.
    pub report: Option<BuildReport>,
}

pub struct Builder<A: ComponentActivator = MarkActive> {
    config: RetargetConfig,
    activator: A,
    cache: PathIndexCache,
}

impl Builder<MarkActive> {
    pub fn new(config: RetargetConfig) -> Self {
        Self::with_activator(config, MarkActive)
    }
}

impl<A: ComponentActivator> Builder<A> {
    pub fn with_activator(config: RetargetConfig, activator: A) -> Self {
        Self { config, activator, cache: PathIndexCache::new() }
    }

    pub fn config(&self) -> &RetargetConfig {
        &self.config
    }

    pub fn cache_mut(&mut self) -> &mut PathIndexCache {
        &mut self.cache
    }

    pub fn activator_mut(&mut self) -> &mut A {
        &mut self.activator
    }

    /// Replays `records` under `outfit_root`. With `armature: None` each
    /// record looks up its recorded armature root by path, then by name.
    pub fn build(
        &mut self,
        tree: &mut RigTree,
        outfit_root: NodeId,
        armature: Option<NodeId>,
        records: &[ConstraintRecord],
    ) -> BuildReport {
        let mut report = BuildReport::new(tree.name(outfit_root));
        log::info!("building {} record(s) on '{}'", records.len(), report.destination);
        for record in records {
            let outcome = self.build_record(tree, outfit_root, armature, record, &mut report.warnings);
            report.stats.merge(outcome.stats);
            report.outcomes.push(outcome);
        }
        log::info!(
            "built '{}': {}/{} record(s) completed, {}",
            report.destination,
            report.completed(),
            records.len(),
            report.stats
        );
        report
    }

    /// Detects the armature root under `outfit_root`, then builds.
    pub fn build_detected(
        &mut self,
        tree: &mut RigTree,
        outfit_root: NodeId,
        records: &[ConstraintRecord],
    ) -> Result<BuildReport, BuildError> {
        let (armature, warning) = self.detect_armature(tree, outfit_root)?;
        let mut report = self.build(tree, outfit_root, Some(armature), records);
        report.warnings.extend(warning);
        Ok(report)
    }

    pub fn build_batch(&mut self, destinations: &mut [Destination], records: &[ConstraintRecord]) -> BatchReport {
        let mut batch = BatchReport::default();
        for dest in destinations.iter_mut() {
            let result = match dest.armature {
                Some(armature) => Ok(self.build(&mut dest.tree, dest.root, Some(armature), records)),
                None => self.build_detected(&mut dest.tree, dest.root, records),
            };
            match result {
                Ok(report) => batch.built.push(report),
                Err(e) => {
                    log::error!("skipping destination '{}': {e}", dest.label);
                    batch.skipped.push((dest.label.clone(), e));
                }
            }
        }
        batch
    }

    /// Builds on a clone of `tree`. The armature is mapped into the clone by
    /// its path below `outfit_root`, or detected on the clone.
    pub fn build_preview(
        &mut self,
        tree: &RigTree,
        outfit_root: NodeId,
        armature: Option<NodeId>,
        records: &[ConstraintRecord],
    ) -> Preview {
        let mut preview = tree.clone();
        let preview_root = outfit_root;
        let name = format!("{}{}", tree.name(outfit_root), self.config.preview_suffix);
        preview.rename(preview_root, name);

        let mapped = armature.and_then(|a| map_by_path(tree, outfit_root, a, &preview, preview_root));
        let report = match mapped {
            Some(a) => Some(self.build(&mut preview, preview_root, Some(a), records)),
            None => match self.build_detected(&mut preview, preview_root, records) {
                Ok(report) => Some(report),
                Err(e) => {
                    log::warn!("preview: {e}");
                    None
                }
            },
        };
        Preview { tree: preview, root: preview_root, report }
    }

    fn detect_armature(&self, tree: &RigTree, outfit_root: NodeId) -> Result<(NodeId, Option<String>), BuildError> {
        let destination = tree.name(outfit_root).to_string();
        let candidates = detect_roots(tree, outfit_root)
            .map_err(|source| BuildError::NoArmature { destination: destination.clone(), source })?;
        let Some(choice) = choose_root(&candidates, None) else {
            return Err(BuildError::NoArmature {
                destination: destination.clone(),
                source: DetectError::NoAvatar { root: destination },
            });
        };
        let warning = choice
            .deeper_alternative
            .filter(|_| self.config.warn_on_shallow_root)
            .map(|deeper| {
                let msg = format!(
                    "'{}' picked the shallowest armature candidate '{}'; '{}' is deeper",
                    destination,
                    tree.relative_path(outfit_root, choice.root, true, true),
                    tree.relative_path(outfit_root, deeper, true, true)
                );
                log::warn!("{msg}");
                msg
            });
        Ok((choice.root, warning))
    }

    fn resolve_armature(
        &self,
        tree: &RigTree,
        outfit_root: NodeId,
        armature: Option<NodeId>,
        record: &ConstraintRecord,
    ) -> Option<NodeId> {
        if let Some(a) = armature.filter(|a| tree.contains(*a)) {
            return Some(a);
        }
        let by_path = split_segments(&record.armature_root_path);
        if !by_path.is_empty() {
            if let Some(found) = tree.find_by_segments(outfit_root, &by_path) {
                return Some(found);
            }
        }
        tree.find_by_name(outfit_root, &record.armature_root_name)
    }

    /// Finds (or creates) the record's parent path and empty node. Returns the
    /// node and how many nodes were created.
    fn constraint_node(&self, tree: &mut RigTree, outfit_root: NodeId, record: &ConstraintRecord) -> Option<(NodeId, usize)> {
        if record.empty_name.trim().is_empty() {
            return None;
        }
        let segments = split_segments(&record.parent_path);
        let parent_segments = strip_leading(&segments, tree.name(outfit_root)).to_vec();

        let mut parent = tree.find_by_segments(outfit_root, &parent_segments);
        if parent.is_none() {
            for wrapper in &self.config.strip_leading_segments {
                let stripped = strip_leading(&parent_segments, wrapper);
                if stripped.len() < parent_segments.len() {
                    parent = tree.find_by_segments(outfit_root, stripped);
                    if parent.is_some() {
                        break;
                    }
                }
            }
        }
        let (parent, mut created) = match parent {
            Some(p) => (p, 0),
            None if parent_segments.is_empty() => (outfit_root, 0),
            None => tree.ensure_path(outfit_root, &parent_segments),
        };

        let node = match tree.find_child(parent, &record.empty_name) {
            Some(existing) => existing,
            None => {
                created += 1;
                tree.add_child(parent, record.empty_name.as_str())
            }
        };
        Some((node, created))
    }

    fn build_record(
        &mut self,
        tree: &mut RigTree,
        outfit_root: NodeId,
        armature: Option<NodeId>,
        record: &ConstraintRecord,
        warnings: &mut Vec<String>,
    ) -> RecordOutcome {
        let armature = self.resolve_armature(tree, outfit_root, armature, record);
        let mut outcome = RecordOutcome {
            empty_name: record.empty_name.clone(),
            node: None,
            armature,
            status: RecordStatus::Completed,
            stats: BuildStats::default(),
        };
        if armature.is_none() {
            let msg = format!("'{}': armature root '{}' not found", record.empty_name, record.armature_root_name);
            log::warn!("{msg}");
            warnings.push(msg);
        }

        let Some((node, created)) = self.constraint_node(tree, outfit_root, record) else {
            let msg = format!("record without a node name ({})", record.component_type);
            log::warn!("{msg}");
            warnings.push(msg);
            outcome.status = RecordStatus::NodeUnavailable;
            return outcome;
        };
        outcome.node = Some(node);
        if created > 0 {
            self.cache.invalidate_rig(tree.id());
        }

        if record.component_type.trim().is_empty() {
            let msg = format!("'{}': record has no component type", record.empty_name);
            log::warn!("{msg}");
            warnings.push(msg);
            outcome.status = RecordStatus::ComponentUnavailable;
            return outcome;
        }

        let plan = {
            let strategies = self.config.strategies.to_strategies();
            let resolver = match armature {
                Some(a) => Some(Resolver::new(&*tree, a, strategies, &mut self.cache)),
                None => None,
            };
            remap::plan(resolver.as_ref(), record.target_reference(), &record.sources)
        };
        outcome.stats = plan.stats();
        for s in plan.unresolved_sources() {
            warnings.push(format!("'{}': source not found: {} ({})", record.empty_name, s.name, s.path));
        }
        if plan.target_requested && plan.target.is_none() {
            warnings.push(format!("'{}': target not found: {}", record.empty_name, record.target_name));
        }

        let components = &mut tree.node_mut(node).components;
        let index = match components.iter().position(|c| c.kind_matches(&record.component_type)) {
            Some(i) => i,
            None => {
                components.push(ConstraintComponent::new(record.component_type.as_str()));
                components.len() - 1
            }
        };
        let component = &mut components[index];
        component.apply_snapshot(&record.payload);
        component.active = false;
        remap::apply(component, &plan);

        if !self.activator.activate(component) {
            component.active = false;
            outcome.status = RecordStatus::ActivationFailed;
            let msg = format!("'{}': {} could not be activated", record.empty_name, component.short_kind());
            log::warn!("{msg}");
            warnings.push(msg);
        } else if self.config.keep_disabled_after_build {
            component.active = false;
        }

        log::info!(
            "'{}': {} rebuilt ({})",
            record.empty_name,
            record.component_type,
            outcome.stats
        );
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::capture;
    use crate::diagnostics::dump_bindings;
    use crate::naming::HumanSlot;
    use crate::rig::{Avatar, ConstraintSource};
    use serde_json::json;
    use std::collections::BTreeMap;

    /// Outfit A: `Armature/Hips/{Hand_L,Hand_R}` plus a constraint holder
    /// under a `RotationConstraint` wrapper.
    fn outfit_a() -> (RigTree, NodeId) {
        let mut t = RigTree::new("OutfitA");
        let arm = t.add_child(t.root(), "Armature");
        let hips = t.add_child(arm, "Hips");
        let hand_l = t.add_child(hips, "Hand_L");
        let hand_r = t.add_child(hips, "Hand_R");
        let wrapper = t.add_child(t.root(), "RotationConstraint");
        let holder = t.add_child(wrapper, "Skirt_Rot");
        let mut c = ConstraintComponent::new("RotationConstraint");
        c.params = json!({ "weight": 1.0 });
        let mut left = ConstraintSource::new(Some(hand_l), 0.7);
        left.extra.insert("rotation_offset".into(), json!([0.0, 15.0, 0.0]));
        c.sources = vec![left, ConstraintSource::new(Some(hand_r), 0.3)];
        c.target = Some(hips);
        c.active = true;
        t.node_mut(holder).components.push(c);
        (t, holder)
    }

    /// Outfit B: Blender-style lowercase names, humanoid avatar on the root.
    fn outfit_b() -> (RigTree, BTreeMap<&'static str, NodeId>) {
        let mut t = RigTree::new("OutfitB");
        let arm = t.add_child(t.root(), "armature");
        let hips = t.add_child(arm, "hips");
        let spine = t.add_child(hips, "spine");
        let hand_l = t.add_child(spine, "hand.l");
        let hand_r = t.add_child(spine, "hand.r");
        let root = t.root();
        t.node_mut(root).avatar = Some(Avatar::humanoid(BTreeMap::from([
            (HumanSlot::Hips, hips),
            (HumanSlot::Spine, spine),
        ])));
        let ids = BTreeMap::from([("armature", arm), ("hips", hips), ("hand_l", hand_l), ("hand_r", hand_r)]);
        (t, ids)
    }

    #[test]
    fn end_to_end_hand_weights_survive_renaming() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);
        let (mut b, ids) = outfit_b();
        let root = b.root();

        let mut builder = Builder::new(RetargetConfig::default());
        let report = builder.build(&mut b, root, Some(ids["armature"]), &records);
        assert_eq!(report.completed(), 1);
        assert_eq!(report.stats, BuildStats { resolved: 3, unresolved: 0 });

        let node = report.outcomes[0].node.unwrap();
        assert_eq!(b.relative_path(root, node, true, false), "RotationConstraint/Skirt_Rot");
        let c = &b.node(node).components[0];
        assert!(c.active);
        assert_eq!(c.target, Some(ids["hips"]));
        assert_eq!(c.sources.len(), 2);
        assert_eq!((c.sources[0].node, c.sources[0].weight), (Some(ids["hand_l"]), 0.7));
        assert_eq!((c.sources[1].node, c.sources[1].weight), (Some(ids["hand_r"]), 0.3));
        assert_eq!(c.sources[0].extra["rotation_offset"], json!([0.0, 15.0, 0.0]));
        assert_eq!(c.params, json!({ "weight": 1.0 }));

        let mut cache = PathIndexCache::new();
        let how = Resolver::new(&b, ids["armature"], Default::default(), &mut cache)
            .resolve(&records[0].sources[0].reference())
            .unwrap();
        assert_eq!(how.strategy, crate::resolve::Strategy::FlatName);
    }

    #[test]
    fn rebuilding_reuses_node_and_component() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);
        let (mut b, ids) = outfit_b();
        let root = b.root();
        let mut builder = Builder::new(RetargetConfig::default());
        builder.build(&mut b, root, Some(ids["armature"]), &records);
        let size = b.len();
        builder.build(&mut b, root, Some(ids["armature"]), &records);
        assert_eq!(b.len(), size);
        assert_eq!(dump_bindings(&b, root).len(), 1);
    }

    #[test]
    fn missing_wrapper_segment_is_stripped() {
        let (a, _) = outfit_a();
        let mut records = capture(&a, a.root(), None);
        records[0].parent_path = "RotationConstraint/Armature/Hips".into();
        let (mut b, ids) = outfit_b();
        let root = b.root();
        let size = b.len();
        let report = Builder::new(RetargetConfig::default()).build(&mut b, root, Some(ids["armature"]), &records);
        let node = report.outcomes[0].node.unwrap();
        assert_eq!(b.parent(node), Some(ids["hips"]));
        assert_eq!(b.len(), size + 1);
    }

    #[test]
    fn detected_build_and_missing_armature() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);

        let (mut b, ids) = outfit_b();
        let root = b.root();
        let report = Builder::new(RetargetConfig::default()).build_detected(&mut b, root, &records).unwrap();
        assert_eq!(report.outcomes[0].armature, Some(ids["hips"]));
        assert_eq!(report.stats.unresolved, 0);

        let mut bare = RigTree::new("Bare");
        let bare_root = bare.root();
        let err = Builder::new(RetargetConfig::default()).build_detected(&mut bare, bare_root, &records);
        assert!(matches!(err, Err(BuildError::NoArmature { .. })));
    }

    /// Outer humanoid spans `Armature`; an inner one on `Hips` roots deeper.
    fn nested_humanoids() -> RigTree {
        let mut t = RigTree::new("OutfitC");
        let arm = t.add_child(t.root(), "Armature");
        let hips = t.add_child(arm, "Hips");
        let spine = t.add_child(hips, "Spine");
        let leg = t.add_child(arm, "UpperLeg_L");
        let root = t.root();
        t.node_mut(root).avatar = Some(Avatar::humanoid(BTreeMap::from([
            (HumanSlot::Hips, hips),
            (HumanSlot::Spine, spine),
            (HumanSlot::LeftUpperLeg, leg),
        ])));
        t.node_mut(hips).avatar =
            Some(Avatar::humanoid(BTreeMap::from([(HumanSlot::Hips, hips), (HumanSlot::Spine, spine)])));
        t
    }

    #[test]
    fn shallow_root_pick_is_reported() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);
        let shallow = |w: &String| w.contains("shallowest armature candidate");

        let mut t = nested_humanoids();
        let root = t.root();
        let report = Builder::new(RetargetConfig::default()).build_detected(&mut t, root, &records).unwrap();
        let armature = t.find_by_segments(root, &["Armature"]);
        assert_eq!(report.outcomes[0].armature, armature);
        let warning = report.warnings.iter().find(|w| shallow(*w)).unwrap();
        assert!(warning.contains("OutfitC/Armature/Hips"));

        let quiet = RetargetConfig { warn_on_shallow_root: false, ..RetargetConfig::default() };
        let mut t = nested_humanoids();
        let root = t.root();
        let report = Builder::new(quiet).build_detected(&mut t, root, &records).unwrap();
        assert!(!report.warnings.iter().any(shallow));
    }

    #[test]
    fn generic_avatar_destination_is_skipped() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);
        let mut g = RigTree::new("Generic");
        let arm = g.add_child(g.root(), "Armature");
        g.add_child(arm, "Hips");
        g.node_mut(arm).avatar = Some(Avatar::generic());
        let size = g.len();

        let mut destinations = vec![Destination { label: "generic".into(), root: g.root(), tree: g, armature: None }];
        let batch = Builder::new(RetargetConfig::default()).build_batch(&mut destinations, &records);
        assert!(batch.built.is_empty());
        assert!(matches!(
            batch.skipped[0].1,
            BuildError::NoArmature { source: DetectError::NoHumanoid { .. }, .. }
        ));
        assert_eq!(destinations[0].tree.len(), size);
    }

    #[test]
    fn batch_continues_past_failed_destination() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);
        let (b, _) = outfit_b();
        let bare = RigTree::new("Bare");
        let mut destinations = vec![
            Destination { label: "bare".into(), root: bare.root(), tree: bare, armature: None },
            Destination { label: "b".into(), root: b.root(), tree: b, armature: None },
        ];
        let batch = Builder::new(RetargetConfig::default()).build_batch(&mut destinations, &records);
        assert_eq!(batch.skipped.len(), 1);
        assert_eq!(batch.skipped[0].0, "bare");
        assert_eq!(batch.built.len(), 1);
        assert_eq!(batch.stats().resolved, 3);
    }

    #[test]
    fn unresolved_sources_are_zeroed_and_reported() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);
        let mut b = RigTree::new("OutfitC");
        let arm = b.add_child(b.root(), "Armature");
        b.add_child(arm, "Hips");
        let root = b.root();
        let report = Builder::new(RetargetConfig::default()).build(&mut b, root, Some(arm), &records);
        assert_eq!(report.stats, BuildStats { resolved: 1, unresolved: 2 });
        assert_eq!(report.warnings.iter().filter(|w| w.contains("source not found")).count(), 2);
        let node = report.outcomes[0].node.unwrap();
        let c = &b.node(node).components[0];
        assert!(c.sources.iter().all(|s| s.node.is_none() && s.weight == 0.0));
        assert_eq!(c.sources.len(), 2);
    }

    struct Refuse;

    impl ComponentActivator for Refuse {
        fn activate(&mut self, _component: &mut ConstraintComponent) -> bool {
            false
        }
    }

    #[test]
    fn failed_activation_and_keep_disabled() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);

        let (mut b, ids) = outfit_b();
        let root = b.root();
        let report =
            Builder::with_activator(RetargetConfig::default(), Refuse).build(&mut b, root, Some(ids["armature"]), &records);
        assert_eq!(report.outcomes[0].status, RecordStatus::ActivationFailed);
        assert!(!b.node(report.outcomes[0].node.unwrap()).components[0].active);

        let (mut b, ids) = outfit_b();
        let root = b.root();
        let cfg = RetargetConfig { keep_disabled_after_build: true, ..RetargetConfig::default() };
        let report = Builder::new(cfg).build(&mut b, root, Some(ids["armature"]), &records);
        assert_eq!(report.outcomes[0].status, RecordStatus::Completed);
        assert!(!b.node(report.outcomes[0].node.unwrap()).components[0].active);
    }

    #[test]
    fn preview_leaves_original_untouched() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);
        let (b, ids) = outfit_b();
        let before = b.len();
        let preview = Builder::new(RetargetConfig::default()).build_preview(&b, b.root(), Some(ids["armature"]), &records);
        assert_eq!(b.len(), before);
        assert_ne!(preview.tree.id(), b.id());
        assert_eq!(preview.tree.name(preview.root), "OutfitB_Preview");
        let report = preview.report.unwrap();
        assert_eq!(report.outcomes[0].armature, Some(ids["armature"]));
        assert_eq!(report.stats.unresolved, 0);
        assert_eq!(dump_bindings(&preview.tree, preview.root).len(), 1);
        assert!(dump_bindings(&b, b.root()).is_empty());
    }

    #[test]
    fn records_fall_back_to_recorded_armature() {
        let (a, _) = outfit_a();
        let records = capture(&a, a.root(), None);
        let (mut b, ids) = outfit_b();
        let root = b.root();
        let report = Builder::new(RetargetConfig::default()).build(&mut b, root, None, &records);
        assert_eq!(report.outcomes[0].armature, Some(ids["armature"]));
        assert_eq!(report.stats.unresolved, 0);
    }
}
