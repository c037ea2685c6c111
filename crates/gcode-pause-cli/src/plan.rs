//! Batch pause plans: layer height -> pause parameters, read from YAML,
//! TOML or JSON.
//!
//! ```yaml
//! 4.2:
//!   z_offset: 25
//!   x_pause: 125
//!   y_pause: 200
//!   message: Swap to red
//! 7.0:
//!   message: Swap to white
//! ```
//!
//! Omitted fields take the [`PauseParams`] defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use gcode_pause::{LayerHeight, PauseParams};
use tracing::info;

/// Parameters keyed by layer height, in ascending order.
pub type PausePlan = BTreeMap<LayerHeight, PauseParams>;

/// Serialization format of a plan file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Yaml,
    Toml,
    Json,
}

impl PlanFormat {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();
        match ext.as_str() {
            "yaml" | "yml" => Ok(PlanFormat::Yaml),
            "toml" => Ok(PlanFormat::Toml),
            "json" => Ok(PlanFormat::Json),
            _ => bail!(
                "unknown plan format for {} (expected .yaml, .yml, .toml or .json)",
                path.display()
            ),
        }
    }
}

/// Read a plan file.
pub fn load(path: &Path) -> Result<PausePlan> {
    let format = PlanFormat::from_path(path)?;
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let plan = parse(&text, format).with_context(|| format!("parsing {}", path.display()))?;
    info!(path = %path.display(), entries = plan.len(), "loaded pause plan");
    Ok(plan)
}

/// Parse plan text in the given format.
pub fn parse(text: &str, format: PlanFormat) -> Result<PausePlan> {
    let plan: PausePlan = match format {
        PlanFormat::Yaml => serde_yaml::from_str(text)?,
        PlanFormat::Toml => toml::from_str(text)?,
        PlanFormat::Json => serde_json::from_str(text)?,
    };
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(mm: f64) -> LayerHeight {
        LayerHeight::new(mm)
    }

    #[test]
    fn test_yaml_plan() {
        let plan = parse(
            "4.2:\n  z_offset: 25\n  x_pause: 125\n  y_pause: 200\n  message: Swap to red\n7:\n  message: white\n",
            PlanFormat::Yaml,
        )
        .unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(
            plan[&h(4.2)],
            PauseParams::new(25.0, 125.0, 200.0).with_message("Swap to red")
        );
        assert_eq!(plan[&h(7.0)], PauseParams::default().with_message("white"));
    }

    #[test]
    fn test_toml_plan() {
        let plan = parse(
            "[\"4.2\"]\nz_offset = 25\nmessage = \"red\"\n\n[\"0.6\"]\n",
            PlanFormat::Toml,
        )
        .unwrap();
        let heights: Vec<_> = plan.keys().copied().collect();
        assert_eq!(heights, vec![h(0.6), h(4.2)]);
        assert_eq!(plan[&h(4.2)].z_offset, 25.0);
        assert_eq!(plan[&h(4.2)].x_pause, 10.0);
    }

    #[test]
    fn test_json_plan() {
        let plan = parse(r#"{"1.5": {"y_pause": 180}}"#, PlanFormat::Json).unwrap();
        assert_eq!(plan[&h(1.5)].y_pause, 180.0);
    }

    #[test]
    fn test_unknown_field_rejected() {
        assert!(parse("4.2:\n  z_ofset: 25\n", PlanFormat::Yaml).is_err());
    }

    #[test]
    fn test_non_finite_height_rejected() {
        assert!(parse(".nan:\n  message: hi\n", PlanFormat::Yaml).is_err());
        assert!(parse(".inf:\n  message: hi\n", PlanFormat::Yaml).is_err());
        assert!(parse("[\"NaN\"]\nmessage = \"hi\"\n", PlanFormat::Toml).is_err());
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            PlanFormat::from_path(Path::new("pauses.YML")).unwrap(),
            PlanFormat::Yaml
        );
        assert!(PlanFormat::from_path(Path::new("pauses.ini")).is_err());
    }

    #[test]
    fn test_load_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plan.yaml");
        fs::write(&path, "0.2:\n  message: hi\n").unwrap();
        let plan = load(&path).unwrap();
        assert_eq!(plan[&h(0.2)].message, "hi");
    }
}
