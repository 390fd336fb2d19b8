//! Retargeting options, loadable from YAML.

pub mod schema;

use anyhow::Result;
pub use schema::{RetargetConfig, StrategyToggles};

pub fn load_from_yaml_str(s: &str) -> Result<RetargetConfig> {
    let cfg: RetargetConfig = serde_yaml::from_str(s)?;
    Ok(cfg)
}

pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<RetargetConfig> {
    let data = std::fs::read_to_string(path)?;
    load_from_yaml_str(&data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolve::Strategies;

    #[test]
    fn empty_document_gives_defaults() {
        let cfg = load_from_yaml_str("{}").unwrap();
        assert_eq!(cfg, RetargetConfig::default());
        assert_eq!(cfg.strategies.to_strategies(), Strategies::all());
        assert_eq!(cfg.strip_leading_segments, vec!["RotationConstraint".to_string()]);
    }

    #[test]
    fn partial_document_overrides_fields() {
        let cfg = load_from_yaml_str(
            "strategies:\n  flat_name: false\n  suffix_path: false\nkeep_disabled_after_build: true\n",
        )
        .unwrap();
        assert!(cfg.keep_disabled_after_build);
        assert!(cfg.warn_on_shallow_root);
        let s = cfg.strategies.to_strategies();
        assert!(!s.contains(Strategies::FLAT_NAME));
        assert!(!s.contains(Strategies::SUFFIX_PATH));
        assert!(s.contains(Strategies::CANONICAL_SLOT | Strategies::EXACT_PATH | Strategies::NORMALIZED_PATH));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_from_path("/nonexistent/rigmap.yaml").is_err());
    }
}
