use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::decoration::{EventMapping, ImageMapping, ThresholdScale};
use crate::geo::TileLayer;
use crate::tree::diagonal::DiagonalKind;
use crate::tree::layout::{BranchScaling, LayoutSettings};
use crate::tree::state::CollapsePolicy;

pub const DEFAULT_DURATION_MS: u64 = 750;
pub const DEFAULT_NODE_OPACITY: f64 = 0.8;
pub const DEFAULT_CHILDREN_ACCESSOR: &str = "children";

/// Margin kept between the outermost radial leaf and the canvas edge.
const RADIAL_MARGIN: f64 = 20.0;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read options file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed options: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("{field} must be a positive number, got {value}")]
    NonPositive { field: &'static str, value: f64 },
    #[error("node_opacity must lie within [0, 1], got {0}")]
    Opacity(f64),
    #[error("children accessor must not be empty")]
    EmptyAccessor,
    #[error("{mapping}: threshold scale with {domain} thresholds needs at least {expected} range entries, found {found}")]
    ScaleShape {
        mapping: String,
        domain: usize,
        expected: usize,
        found: usize,
    },
    #[error("{mapping}: threshold domain must be ascending")]
    UnsortedDomain { mapping: String },
    #[error("{mapping}: range index {index} has no icon ({icons} given)")]
    MissingIcon {
        mapping: String,
        index: usize,
        icons: usize,
    },
}

/// Every recognised option for both views.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    pub dendrogram: DendrogramOptions,
    pub map: MapOptions,
}

impl Options {
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let options: Options = serde_json::from_str(raw)?;
        options.validate()?;
        Ok(options)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.dendrogram.validate()?;
        self.map.validate()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DendrogramOptions {
    pub width: f64,
    pub height: f64,
    #[serde(alias = "skipBranchLengthScaling")]
    pub skip_branch_length_scaling: bool,
    /// Field of the input records holding the child list.
    #[serde(alias = "children")]
    pub children_accessor: String,
    pub diagonal: DiagonalKind,
    pub collapse: CollapsePolicy,
    pub duration_ms: u64,
}

impl Default for DendrogramOptions {
    fn default() -> Self {
        Self {
            width: 960.0,
            height: 500.0,
            skip_branch_length_scaling: false,
            children_accessor: DEFAULT_CHILDREN_ACCESSOR.to_string(),
            diagonal: DiagonalKind::RightAngle,
            collapse: CollapsePolicy::Full,
            duration_ms: DEFAULT_DURATION_MS,
        }
    }
}

impl DendrogramOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("dendrogram.width", self.width)?;
        positive("dendrogram.height", self.height)?;
        if self.children_accessor.trim().is_empty() {
            return Err(ConfigError::EmptyAccessor);
        }
        Ok(())
    }

    /// Layout extents for the configured drawing. Radial drawings spread the
    /// cross axis over a full turn in degrees and use the inscribed radius for
    /// the main axis.
    pub fn layout_settings(&self) -> LayoutSettings {
        let scaling = if self.skip_branch_length_scaling {
            BranchScaling::Uniform
        } else {
            BranchScaling::Proportional
        };
        match self.diagonal {
            DiagonalKind::RightAngle => LayoutSettings {
                width: self.width,
                height: self.height,
                scaling,
            },
            DiagonalKind::Radial => LayoutSettings {
                width: (self.width.min(self.height) / 2.0 - RADIAL_MARGIN).max(1.0),
                height: 360.0,
                scaling,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapOptions {
    pub width: f64,
    pub height: f64,
    pub node_attrs_img: Vec<ImageMapping>,
    pub node_events_2_img: Vec<EventMapping>,
    pub additional_layers: Vec<TileLayer>,
    pub base_tile_layer: Option<TileLayer>,
    pub node_opacity: Option<f64>,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            width: 500.0,
            height: 400.0,
            node_attrs_img: Vec::new(),
            node_events_2_img: Vec::new(),
            additional_layers: Vec::new(),
            base_tile_layer: None,
            node_opacity: None,
        }
    }
}

impl MapOptions {
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("map.width", self.width)?;
        positive("map.height", self.height)?;
        if let Some(opacity) = self.node_opacity {
            if !(0.0..=1.0).contains(&opacity) {
                return Err(ConfigError::Opacity(opacity));
            }
        }
        for mapping in &self.node_attrs_img {
            validate_scale(&mapping.attribute, &mapping.scale, mapping.icons.len())?;
        }
        for mapping in &self.node_events_2_img {
            validate_scale(&mapping.event, &mapping.scale, mapping.icons.len())?;
        }
        Ok(())
    }

    pub fn node_opacity(&self) -> f64 {
        self.node_opacity.unwrap_or(DEFAULT_NODE_OPACITY)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositive { field, value })
    }
}

fn validate_scale(name: &str, scale: &ThresholdScale, icons: usize) -> Result<(), ConfigError> {
    let expected = scale.domain.len() + 1;
    if scale.range.len() < expected {
        return Err(ConfigError::ScaleShape {
            mapping: name.to_string(),
            domain: scale.domain.len(),
            expected,
            found: scale.range.len(),
        });
    }
    if scale.domain.windows(2).any(|pair| pair[0] > pair[1]) {
        return Err(ConfigError::UnsortedDomain {
            mapping: name.to_string(),
        });
    }
    if let Some(&index) = scale.range.iter().find(|&&index| index >= icons) {
        return Err(ConfigError::MissingIcon {
            mapping: name.to_string(),
            index,
            icons,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let options = Options::from_json_str("{}").unwrap();
        assert_eq!(options, Options::default());
        assert_eq!(options.dendrogram.duration_ms, 750);
        assert_eq!(options.dendrogram.collapse, CollapsePolicy::Full);
        assert_eq!(options.map.node_opacity(), 0.8);
    }

    #[test]
    fn accepts_legacy_option_names() {
        let raw = r#"{
            "dendrogram": {
                "width": 400,
                "skipBranchLengthScaling": true,
                "children": "branchset",
                "diagonal": "radial",
                "collapse": { "depth": 1 }
            },
            "map": {
                "node_opacity": 0.5,
                "node_attrs_img": [{
                    "node_attr_img": "Received_ITN",
                    "img_scale": { "domain": [0, 10], "range": [0, 1, 2] },
                    "img_src": ["a.png", "b.png", "c.png"]
                }],
                "base_tile_layer": { "url": "https://tiles.example/{z}/{x}/{y}.png" }
            }
        }"#;
        let options = Options::from_json_str(raw).unwrap();
        assert!(options.dendrogram.skip_branch_length_scaling);
        assert_eq!(options.dendrogram.children_accessor, "branchset");
        assert_eq!(options.dendrogram.collapse, CollapsePolicy::Depth(1));
        assert_eq!(options.dendrogram.height, 500.0);
        assert_eq!(options.map.node_attrs_img[0].attribute, "Received_ITN");
        assert_eq!(options.map.node_opacity(), 0.5);

        let settings = options.dendrogram.layout_settings();
        assert_eq!(settings.scaling, BranchScaling::Uniform);
        assert_eq!(settings.height, 360.0);
        assert_eq!(settings.width, 180.0);
    }

    #[test]
    fn rejects_bad_dimensions_and_opacity() {
        let err = Options::from_json_str(r#"{"dendrogram": {"width": 0}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::NonPositive { field: "dendrogram.width", .. }));

        let err = Options::from_json_str(r#"{"map": {"node_opacity": 1.5}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Opacity(v) if v == 1.5));

        let err = Options::from_json_str(r#"{"dendrogram": {"children_accessor": " "}}"#).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyAccessor));
    }

    #[test]
    fn rejects_inconsistent_threshold_scales() {
        let mut options = MapOptions::default();
        options.node_attrs_img.push(ImageMapping {
            attribute: "nets".to_string(),
            scale: ThresholdScale {
                domain: vec![1.0, 5.0],
                range: vec![0, 1],
            },
            icons: vec!["x.png".to_string(), "y.png".to_string()],
        });
        assert!(matches!(
            options.validate(),
            Err(ConfigError::ScaleShape { expected: 3, found: 2, .. })
        ));

        options.node_attrs_img[0].scale.range = vec![0, 1, 2];
        assert!(matches!(
            options.validate(),
            Err(ConfigError::MissingIcon { index: 2, icons: 2, .. })
        ));

        options.node_attrs_img[0].scale = ThresholdScale {
            domain: vec![5.0, 1.0],
            range: vec![0, 1, 1],
        };
        assert!(matches!(options.validate(), Err(ConfigError::UnsortedDomain { .. })));
    }

    #[test]
    fn surplus_range_entries_are_accepted() {
        let raw = r#"{"map": {"node_attrs_img": [{
            "node_attr_img": "Received_ITN",
            "img_scale": { "domain": [0, 10], "range": [0, 1, 2, 3] },
            "img_src": ["a", "b", "c", "d"]
        }]}}"#;
        let options = Options::from_json_str(raw).unwrap();
        let mapping = &options.map.node_attrs_img[0];
        assert_eq!(mapping.icon_for(-1.0), Some("a"));
        assert_eq!(mapping.icon_for(5.0), Some("b"));
        assert_eq!(mapping.icon_for(10.0), Some("c"));
        // the fourth entry is never reached
        assert_eq!(mapping.icon_for(1e9), Some("c"));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(
            Options::from_json_str("{ not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
