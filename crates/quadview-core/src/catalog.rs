//! Part catalog - the named sub-components of the drone model
//!
//! Each part carries a marker anchor in the normalized model frame plus the
//! descriptive text shown in the detail panel. The catalog is loaded once and
//! never mutated afterwards; markers and ray hits refer to parts by id.

use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// Catalog shipped with the viewer for the team's quadcopter
const BUILTIN_CATALOG: &str = include_str!("../data/quadcopter_parts.toml");

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Failed to read part catalog: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse part catalog: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Duplicate part id: {0}")]
    DuplicateId(String),
    #[error("Part at index {0} has an empty id")]
    EmptyId(usize),
}

/// A single cataloged part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartDescriptor {
    /// Stable key (e.g., "camera-gimbal")
    pub id: String,
    /// Display label used by the name marker and panel heading
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Marker anchor in model space
    pub anchor: [f32; 3],
    /// Short technical facts, in display order
    #[serde(default)]
    pub specs: Vec<String>,
}

impl PartDescriptor {
    pub fn anchor(&self) -> Vec3 {
        Vec3::from_array(self.anchor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CatalogFile {
    #[serde(default = "default_version")]
    version: String,
    #[serde(default)]
    part: Vec<PartDescriptor>,
}

fn default_version() -> String {
    "1.0".to_string()
}

/// Read-only registry of parts, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct PartCatalog {
    parts: Vec<PartDescriptor>,
}

impl PartCatalog {
    /// Build a catalog, rejecting empty or repeated ids
    pub fn new(parts: Vec<PartDescriptor>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for (index, part) in parts.iter().enumerate() {
            if part.id.trim().is_empty() {
                return Err(CatalogError::EmptyId(index));
            }
            if !seen.insert(part.id.as_str()) {
                return Err(CatalogError::DuplicateId(part.id.clone()));
            }
        }
        Ok(Self { parts })
    }

    /// The quadcopter catalog compiled into the binary
    pub fn builtin() -> Self {
        // The embedded file is covered by test_builtin_catalog
        Self::from_toml(BUILTIN_CATALOG).unwrap_or_else(|e| {
            tracing::error!("Built-in part catalog is invalid: {}", e);
            Self { parts: Vec::new() }
        })
    }

    /// Load a catalog from a TOML string with `[[part]]` tables
    pub fn from_toml(content: &str) -> Result<Self, CatalogError> {
        let file: CatalogFile = toml::from_str(content)?;
        tracing::debug!(version = %file.version, parts = file.part.len(), "Parsed part catalog");
        Self::new(file.part)
    }

    /// Load a catalog from a TOML file
    pub fn from_file(path: &Path) -> Result<Self, CatalogError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn list(&self) -> &[PartDescriptor] {
        &self.parts
    }

    pub fn get(&self, id: &str) -> Option<&PartDescriptor> {
        self.parts.iter().find(|p| p.id == id)
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// Part whose anchor lies closest to `point`, if within `tolerance`
    pub fn nearest_within(&self, point: Vec3, tolerance: f32) -> Option<&PartDescriptor> {
        self.parts
            .iter()
            .map(|p| (p, p.anchor().distance(point)))
            .filter(|(_, d)| *d < tolerance)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(p, _)| p)
    }
}

impl Default for PartCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn part(id: &str, anchor: [f32; 3]) -> PartDescriptor {
        PartDescriptor {
            id: id.to_string(),
            name: id.to_uppercase(),
            description: String::new(),
            anchor,
            specs: vec![],
        }
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = PartCatalog::builtin();
        assert_eq!(catalog.len(), 7);

        let battery = catalog.get("battery").unwrap();
        assert_eq!(battery.name, "Power Cell");
        assert_eq!(battery.anchor(), Vec3::new(0.0, -0.1, 0.0));
        assert_eq!(battery.specs.len(), 3);

        let gimbal = catalog.get("camera-gimbal").unwrap();
        assert_eq!(gimbal.anchor, [0.0, 0.0, 0.9]);

        assert_eq!(catalog.list()[0].id, "main-body");
        assert!(catalog.get("rotor-9").is_none());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let result = PartCatalog::new(vec![part("a", [0.0; 3]), part("a", [1.0; 3])]);
        assert!(matches!(result, Err(CatalogError::DuplicateId(id)) if id == "a"));
    }

    #[test]
    fn test_empty_id_rejected() {
        let result = PartCatalog::new(vec![part("a", [0.0; 3]), part("  ", [1.0; 3])]);
        assert!(matches!(result, Err(CatalogError::EmptyId(1))));
    }

    #[test]
    fn test_from_toml_defaults() {
        let toml = r#"
[[part]]
id = "arm"
name = "Arm"
anchor = [1.0, 0.0, 0.0]
"#;
        let catalog = PartCatalog::from_toml(toml).unwrap();
        let arm = catalog.get("arm").unwrap();
        assert!(arm.description.is_empty());
        assert!(arm.specs.is_empty());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[[part]]\nid = \"skid\"\nname = \"Skid\"\nanchor = [0.0, -0.5, 0.0]\nspecs = [\"Foam tip\"]"
        )
        .unwrap();

        let catalog = PartCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("skid").unwrap().specs, vec!["Foam tip".to_string()]);
    }

    #[test]
    fn test_nearest_within_tolerance() {
        let catalog = PartCatalog::builtin();

        let hit = catalog.nearest_within(Vec3::new(0.65, 0.1, 0.75), 1.2).unwrap();
        assert_eq!(hit.id, "front-right-motor");

        // Far outside every anchor
        assert!(catalog.nearest_within(Vec3::new(5.0, 5.0, 5.0), 1.2).is_none());
    }
}
