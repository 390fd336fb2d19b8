//! Constraint components attached to rig nodes.

use serde_json::{json, Map, Value};

use super::NodeId;

/// One weighted source slot of a constraint.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSource {
    pub node: Option<NodeId>,
    pub weight: f32,
    /// Per-source fields other than the reference and weight (offsets, flags).
    pub extra: Map<String, Value>,
}

impl ConstraintSource {
    pub fn new(node: Option<NodeId>, weight: f32) -> Self {
        Self { node, weight, extra: Map::new() }
    }

    /// Neutral entry used when a source list has to grow.
    pub fn placeholder() -> Self {
        Self::new(None, 0.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintComponent {
    /// Host type name, possibly namespace- or assembly-qualified.
    pub kind: String,
    pub active: bool,
    pub params: Value,
    pub target: Option<NodeId>,
    pub sources: Vec<ConstraintSource>,
}

impl ConstraintComponent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            active: false,
            params: Value::Null,
            target: None,
            sources: Vec::new(),
        }
    }

    /// Type name without namespace or assembly qualification.
    pub fn short_kind(&self) -> &str {
        short_kind(&self.kind)
    }

    pub fn kind_matches(&self, kind: &str) -> bool {
        self.kind == kind || (!kind.is_empty() && self.short_kind() == short_kind(kind))
    }

    /// Opaque payload: params plus the extra fields of every bound source.
    /// Node references are never part of it.
    pub fn snapshot(&self) -> Value {
        let sources: Vec<Value> = self
            .sources
            .iter()
            .filter(|s| s.node.is_some())
            .map(|s| Value::Object(s.extra.clone()))
            .collect();
        json!({ "params": self.params, "sources": sources })
    }

    /// Overwrites params and the source list from a payload produced by
    /// [`snapshot`](Self::snapshot). Sources come back unbound with weight 0.
    /// A payload in any other shape is taken as params verbatim.
    pub fn apply_snapshot(&mut self, payload: &Value) {
        let Some(obj) = payload.as_object().filter(|o| o.contains_key("params")) else {
            if !payload.is_null() {
                self.params = payload.clone();
            }
            return;
        };
        self.params = obj.get("params").cloned().unwrap_or(Value::Null);
        if let Some(sources) = obj.get("sources").and_then(Value::as_array) {
            self.sources = sources
                .iter()
                .map(|s| ConstraintSource {
                    node: None,
                    weight: 0.0,
                    extra: s.as_object().cloned().unwrap_or_default(),
                })
                .collect();
        }
    }
}

fn short_kind(kind: &str) -> &str {
    let unqualified = kind.split(',').next().unwrap_or(kind).trim();
    unqualified.rsplit(['.', '+', ':']).next().unwrap_or(unqualified)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_kind_strips_qualification() {
        let c = ConstraintComponent::new("VRC.SDK3.Dynamics.Constraint.Components.VRCRotationConstraint, VRC.SDK3.Dynamics");
        assert_eq!(c.short_kind(), "VRCRotationConstraint");
        assert!(c.kind_matches("VRCRotationConstraint"));
        assert!(!c.kind_matches("VRCParentConstraint"));
        assert!(!c.kind_matches(""));
    }

    #[test]
    fn snapshot_skips_unbound_sources_and_references() {
        let mut c = ConstraintComponent::new("RotationConstraint");
        c.params = json!({ "weight": 1.0 });
        let mut bound = ConstraintSource::new(Some(NodeId(3)), 0.5);
        bound.extra.insert("offset".into(), json!([0.0, 90.0, 0.0]));
        c.sources = vec![bound, ConstraintSource::placeholder()];

        let snap = c.snapshot();
        assert_eq!(snap["params"]["weight"], json!(1.0));
        assert_eq!(snap["sources"].as_array().unwrap().len(), 1);
        assert_eq!(snap["sources"][0]["offset"], json!([0.0, 90.0, 0.0]));
    }

    #[test]
    fn apply_snapshot_overwrites_params_and_sources() {
        let mut c = ConstraintComponent::new("RotationConstraint");
        c.sources = vec![ConstraintSource::new(Some(NodeId(1)), 1.0); 4];
        c.apply_snapshot(&json!({ "params": { "axis": "y" }, "sources": [{ "offset": 1 }, {}] }));
        assert_eq!(c.params, json!({ "axis": "y" }));
        assert_eq!(c.sources.len(), 2);
        assert!(c.sources.iter().all(|s| s.node.is_none() && s.weight == 0.0));
        assert_eq!(c.sources[0].extra["offset"], json!(1));
    }

    #[test]
    fn foreign_payload_becomes_params() {
        let mut c = ConstraintComponent::new("AimConstraint");
        c.apply_snapshot(&json!({ "aimVector": [0, 0, 1] }));
        assert_eq!(c.params, json!({ "aimVector": [0, 0, 1] }));
        assert!(c.sources.is_empty());
    }
}
