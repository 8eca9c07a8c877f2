use std::collections::{BTreeMap, HashMap};

use log::{debug, warn};

use super::decoration::{EventMapping, DECORATION_OFFSETS};
use super::projection::{MapProjection, ScreenPoint};
use super::{GeoError, GeoNode, LatLng, LatLngBounds, TileLayer};
use crate::config::MapOptions;

pub const MARKER_RADIUS: f64 = 3.0;
pub const DECORATION_RADIUS: f64 = 6.5;

/// Icon drawn in one of the fixed slots around a marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoration {
    pub attribute: String,
    pub slot: usize,
    /// `None` when the node has no usable value; the slot is drawn transparent.
    pub icon: Option<String>,
    pub position: Option<ScreenPoint>,
}

impl Decoration {
    pub fn offset(&self) -> (f64, f64) {
        DECORATION_OFFSETS[self.slot]
    }

    pub fn opacity(&self) -> f64 {
        if self.icon.is_some() {
            1.0
        } else {
            0.0
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub node: GeoNode,
    pub coordinates: LatLng,
    pub position: Option<ScreenPoint>,
    pub selected: bool,
    pub decorations: Vec<Decoration>,
    /// Icon per fired event name.
    pub event_icons: BTreeMap<String, String>,
}

impl Marker {
    pub fn label(&self) -> &str {
        &self.node.node_label
    }

    pub fn cluster(&self) -> &str {
        &self.node.cluster_label
    }

    pub fn css_class(&self) -> String {
        let state = if self.selected {
            "selected-map-node"
        } else {
            "unselected-map-node"
        };
        format!("{state} cluster-{}", self.node.cluster_label)
    }
}

/// Markers for every geo node, kept in feed order and keyed by `NodeLabel`.
#[derive(Debug, Clone)]
pub struct GeoOverlay {
    markers: Vec<Marker>,
    by_label: HashMap<String, usize>,
    by_cluster: HashMap<String, Vec<usize>>,
    events: Vec<EventMapping>,
    layers: Vec<TileLayer>,
    opacity: f64,
}

impl GeoOverlay {
    pub fn new(nodes: Vec<GeoNode>, options: &MapOptions) -> Self {
        if options.node_attrs_img.len() > DECORATION_OFFSETS.len() {
            debug!(
                "only the first {} of {} attribute icon mappings have a slot",
                DECORATION_OFFSETS.len(),
                options.node_attrs_img.len()
            );
        }

        let mut markers = Vec::with_capacity(nodes.len());
        let mut by_label = HashMap::with_capacity(nodes.len());
        let mut by_cluster: HashMap<String, Vec<usize>> = HashMap::new();

        for node in nodes {
            let Some(coordinates) = node.coordinates() else {
                warn!("skipping geo node `{}`: missing coordinates", node.node_label);
                continue;
            };
            if by_label.contains_key(&node.node_label) {
                warn!("skipping duplicate geo node `{}`", node.node_label);
                continue;
            }

            let decorations = options
                .node_attrs_img
                .iter()
                .take(DECORATION_OFFSETS.len())
                .enumerate()
                .map(|(slot, mapping)| Decoration {
                    attribute: mapping.attribute.clone(),
                    slot,
                    icon: node
                        .numeric_attribute(&mapping.attribute)
                        .and_then(|value| mapping.icon_for(value))
                        .map(str::to_string),
                    position: None,
                })
                .collect();

            let index = markers.len();
            by_label.insert(node.node_label.clone(), index);
            by_cluster
                .entry(node.cluster_label.clone())
                .or_default()
                .push(index);
            markers.push(Marker {
                node,
                coordinates,
                position: None,
                selected: false,
                decorations,
                event_icons: BTreeMap::new(),
            });
        }

        let mut layers = vec![options
            .base_tile_layer
            .clone()
            .unwrap_or_else(TileLayer::default_base)];
        layers.extend(options.additional_layers.iter().cloned());

        Self {
            markers,
            by_label,
            by_cluster,
            events: options.node_events_2_img.clone(),
            layers,
            opacity: options.node_opacity(),
        }
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn marker(&self, label: &str) -> Option<&Marker> {
        self.by_label.get(label).map(|&index| &self.markers[index])
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Base layer first, then the additional layers in order.
    pub fn layers(&self) -> &[TileLayer] {
        &self.layers
    }

    pub fn bounds(&self) -> Option<LatLngBounds> {
        LatLngBounds::from_points(self.markers.iter().map(|marker| marker.coordinates))
    }

    /// Reposition every marker and decoration for the current view. Positions
    /// depend only on the coordinates and `projection`, so calling this on every
    /// view change is safe.
    pub fn update<P: MapProjection + ?Sized>(&mut self, projection: &P) {
        for marker in &mut self.markers {
            let base = projection.lat_lng_to_layer_point(marker.coordinates);
            marker.position = Some(base);
            for decoration in &mut marker.decorations {
                let (dx, dy) = decoration.offset();
                decoration.position = Some(base.offset(dx, dy));
            }
        }
    }

    pub fn set_selected(&mut self, label: &str, selected: bool) -> bool {
        match self.by_label.get(label) {
            Some(&index) => {
                self.markers[index].selected = selected;
                true
            }
            None => false,
        }
    }

    /// Unselect every marker, returning the labels that were selected.
    pub fn clear_selection(&mut self) -> Vec<String> {
        let mut cleared = Vec::new();
        for marker in &mut self.markers {
            if marker.selected {
                marker.selected = false;
                cleared.push(marker.node.node_label.clone());
            }
        }
        cleared
    }

    /// Select all markers of `cluster`, returning their labels.
    pub fn select_cluster(&mut self, cluster: &str) -> Vec<String> {
        let Some(indices) = self.by_cluster.get(cluster) else {
            return Vec::new();
        };
        indices
            .iter()
            .map(|&index| {
                let marker = &mut self.markers[index];
                marker.selected = true;
                marker.node.node_label.clone()
            })
            .collect()
    }

    pub fn selected_labels(&self) -> Vec<&str> {
        self.markers
            .iter()
            .filter(|marker| marker.selected)
            .map(Marker::label)
            .collect()
    }

    /// Resolve the icon for `event` at `value` and pin it to the marker.
    pub fn apply_event(&mut self, label: &str, event: &str, value: f64) -> Result<String, GeoError> {
        let mapping = self
            .events
            .iter()
            .find(|mapping| mapping.event == event)
            .ok_or_else(|| GeoError::UnknownEvent(event.to_string()))?;
        let icon = mapping
            .icon_for(value)
            .ok_or_else(|| GeoError::NoIcon {
                event: event.to_string(),
                value,
            })?
            .to_string();
        let index = *self
            .by_label
            .get(label)
            .ok_or_else(|| GeoError::UnknownMarker(label.to_string()))?;
        self.markers[index]
            .event_icons
            .insert(event.to_string(), icon.clone());
        Ok(icon)
    }
}
