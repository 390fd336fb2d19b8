//! Captured constraint records and their YAML/JSON persistence.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::resolve::Reference;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceBinding {
    pub name: String,
    pub weight: f32,
    /// Relative to the source armature root.
    #[serde(default)]
    pub path: String,
}

impl SourceBinding {
    pub fn reference(&self) -> Reference<'_> {
        Reference::new(&self.name, &self.path)
    }
}

/// How the armature root recorded for a constraint was found.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmatureProvenance {
    /// A caller-supplied root containing the target or a source.
    Override,
    /// The import-root child containing the target or a source.
    BoundReference,
    /// Derived from the constrained node alone; the recorded paths may not
    /// be relative to a real armature.
    ConstrainedNodeFallback,
    #[default]
    Missing,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintRecord {
    /// Name of the node that carries the constraint.
    pub empty_name: String,
    /// Parent path of that node relative to the import root.
    #[serde(default)]
    pub parent_path: String,
    /// Path of the constrained node relative to the armature root.
    #[serde(default)]
    pub constraint_path: String,
    #[serde(default)]
    pub armature_root_name: String,
    /// Relative to the import root.
    #[serde(default)]
    pub armature_root_path: String,
    #[serde(default)]
    pub armature_provenance: ArmatureProvenance,
    pub component_type: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default)]
    pub target_name: String,
    #[serde(default)]
    pub target_path: String,
    #[serde(default)]
    pub sources: Vec<SourceBinding>,
}

impl ConstraintRecord {
    pub fn target_reference(&self) -> Reference<'_> {
        Reference::new(&self.target_name, &self.target_path)
    }

    pub fn has_target(&self) -> bool {
        !self.target_reference().is_empty()
    }
}

/// Accepts YAML or JSON (a JSON document is valid YAML).
pub fn load_from_str(s: &str) -> Result<Vec<ConstraintRecord>> {
    let records: Vec<ConstraintRecord> = serde_yaml::from_str(s)?;
    Ok(records)
}

pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Vec<ConstraintRecord>> {
    let data = std::fs::read_to_string(path)?;
    load_from_str(&data)
}

pub fn to_yaml(records: &[ConstraintRecord]) -> Result<String> {
    Ok(serde_yaml::to_string(records)?)
}

pub fn to_json(records: &[ConstraintRecord]) -> Result<String> {
    Ok(serde_json::to_string_pretty(records)?)
}
