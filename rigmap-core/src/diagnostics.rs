//! Binding dumps, bulk activation and resolution counters.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::build::ComponentActivator;
use crate::rig::{NodeId, RigTree};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    pub resolved: usize,
    pub unresolved: usize,
}

impl BuildStats {
    pub fn record(&mut self, resolved: bool) {
        if resolved {
            self.resolved += 1;
        } else {
            self.unresolved += 1;
        }
    }

    pub fn merge(&mut self, other: BuildStats) {
        self.resolved += other.resolved;
        self.unresolved += other.unresolved;
    }

    pub fn total(&self) -> usize {
        self.resolved + self.unresolved
    }
}

impl fmt::Display for BuildStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "resolved={} unresolved={}", self.resolved, self.unresolved)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BindingDump {
    pub node: NodeId,
    pub kind: String,
    pub active: bool,
    pub self_path: String,
    pub target: Option<String>,
    pub sources: Vec<(Option<String>, f32)>,
}

impl fmt::Display for BindingDump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} active={} self={} target={} sources=[",
            self.kind,
            self.active,
            self.self_path,
            self.target.as_deref().unwrap_or("(null)")
        )?;
        for (i, (path, weight)) in self.sources.iter().enumerate() {
            if i > 0 {
                f.write_str(" | ")?;
            }
            write!(f, "{i}:{} (w={weight:.3})", path.as_deref().unwrap_or("(null)"))?;
        }
        f.write_str("]")
    }
}

/// One entry per component under `root`; paths are absolute.
pub fn dump_bindings(tree: &RigTree, root: NodeId) -> Vec<BindingDump> {
    tree.components_under(root)
        .into_iter()
        .map(|(node, i)| {
            let c = &tree.node(node).components[i];
            BindingDump {
                node,
                kind: c.short_kind().to_string(),
                active: c.active,
                self_path: tree.path(node),
                target: c.target.map(|t| tree.path(t)),
                sources: c.sources.iter().map(|s| (s.node.map(|n| tree.path(n)), s.weight)).collect(),
            }
        })
        .collect()
}

/// Sets `active` on every component under `root`. Returns how many were touched.
pub fn set_all_active(tree: &mut RigTree, root: NodeId, active: bool) -> usize {
    let found = tree.components_under(root);
    for (node, i) in &found {
        tree.node_mut(*node).components[*i].active = active;
    }
    log::info!(
        "{} {} component(s) under '{}'",
        if active { "enabled" } else { "disabled" },
        found.len(),
        tree.name(root)
    );
    found.len()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivateReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub failed_kinds: BTreeMap<String, usize>,
}

impl fmt::Display for ActivateReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "total={} succeeded={} failed={}", self.total, self.succeeded, self.failed)?;
        if !self.failed_kinds.is_empty() {
            let kinds: Vec<String> = self.failed_kinds.iter().map(|(k, n)| format!("{k}:{n}")).collect();
            write!(f, " [{}]", kinds.join(", "))?;
        }
        Ok(())
    }
}

/// Runs the activator on every component under `root`. Components whose
/// activation fails are left inactive.
pub fn activate_all<A: ComponentActivator + ?Sized>(tree: &mut RigTree, root: NodeId, activator: &mut A) -> ActivateReport {
    let mut report = ActivateReport::default();
    for (node, i) in tree.components_under(root) {
        report.total += 1;
        let component = &mut tree.node_mut(node).components[i];
        if activator.activate(component) {
            report.succeeded += 1;
        } else {
            component.active = false;
            report.failed += 1;
            *report.failed_kinds.entry(component.short_kind().to_string()).or_default() += 1;
        }
    }
    if report.failed > 0 {
        log::warn!("activation under '{}': {report}", tree.name(root));
    } else {
        log::info!("activation under '{}': {report}", tree.name(root));
    }
    report
}
