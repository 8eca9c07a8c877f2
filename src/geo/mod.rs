use geo::{BoundingRect, Coord, MultiPoint, Point, Rect};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

pub mod decoration;
pub mod overlay;
pub mod projection;

pub use overlay::{GeoOverlay, Marker};
pub use projection::{MapProjection, MapView, ScreenPoint};

pub const DEFAULT_TILE_URL: &str = "http://{s}.tile.thunderforest.com/landscape/{z}/{x}/{y}.png";
pub const DEFAULT_TILE_ATTRIBUTION: &str = "&copy; <a href=\"http://www.thunderforest.com/\">Thunderforest</a>, &copy; <a href=\"http://www.openstreetmap.org/copyright\">OpenStreetMap</a>";

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    #[error("no marker labelled `{0}`")]
    UnknownMarker(String),
    #[error("no icon mapping for event `{0}`")]
    UnknownEvent(String),
    #[error("event `{event}` has no icon for value {value}")]
    NoIcon { event: String, value: f64 },
}

/// Geographic position in degrees, stored as a `geo` coordinate with
/// `x = longitude` and `y = latitude`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng(Coord<f64>);

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self(Coord { x: lng, y: lat })
    }

    pub fn lat(&self) -> f64 {
        self.0.y
    }

    pub fn lng(&self) -> f64 {
        self.0.x
    }

    pub fn coord(&self) -> Coord<f64> {
        self.0
    }
}

impl From<Coord<f64>> for LatLng {
    fn from(coord: Coord<f64>) -> Self {
        Self(coord)
    }
}

impl From<LatLng> for Point<f64> {
    fn from(position: LatLng) -> Self {
        Point::from(position.0)
    }
}

/// Axis-aligned lat/lng box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLngBounds(Rect<f64>);

impl LatLngBounds {
    pub fn from_points(points: impl IntoIterator<Item = LatLng>) -> Option<Self> {
        let points: MultiPoint<f64> = points.into_iter().map(Point::from).collect();
        points.bounding_rect().map(Self)
    }

    pub fn rect(&self) -> Rect<f64> {
        self.0
    }

    pub fn south_west(&self) -> LatLng {
        LatLng(self.0.min())
    }

    pub fn north_east(&self) -> LatLng {
        LatLng(self.0.max())
    }

    pub fn north_west(&self) -> LatLng {
        LatLng::new(self.0.max().y, self.0.min().x)
    }

    pub fn south_east(&self) -> LatLng {
        LatLng::new(self.0.min().y, self.0.max().x)
    }

    pub fn center(&self) -> LatLng {
        LatLng(self.0.center())
    }
}

/// A tile layer the drawing backend stacks under the markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileLayer {
    pub url: String,
    #[serde(default)]
    pub attribution: Option<String>,
}

impl TileLayer {
    pub fn default_base() -> Self {
        Self {
            url: DEFAULT_TILE_URL.to_string(),
            attribution: Some(DEFAULT_TILE_ATTRIBUTION.to_string()),
        }
    }
}

/// One record of the geo-node feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoNode {
    #[serde(rename = "Latitude", default)]
    pub latitude: Option<f64>,
    #[serde(rename = "Longitude", default)]
    pub longitude: Option<f64>,
    #[serde(rename = "NodeLabel", deserialize_with = "label_string")]
    pub node_label: String,
    /// Joins the marker to a dendrogram leaf of the same name.
    #[serde(rename = "ClusterLabel", deserialize_with = "label_string")]
    pub cluster_label: String,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl GeoNode {
    pub fn new(node_label: &str, cluster_label: &str, lat: f64, lng: f64) -> Self {
        Self {
            latitude: Some(lat),
            longitude: Some(lng),
            node_label: node_label.to_string(),
            cluster_label: cluster_label.to_string(),
            attributes: Map::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: Value) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    /// Coordinates, when both are present and inside the valid ranges.
    pub fn coordinates(&self) -> Option<LatLng> {
        let lat = self.latitude?;
        let lng = self.longitude?;
        if lat.is_finite() && lng.is_finite() && (-90.0..=90.0).contains(&lat) {
            Some(LatLng::new(lat, lng))
        } else {
            None
        }
    }

    pub fn numeric_attribute(&self, key: &str) -> Option<f64> {
        let value = match self.attributes.get(key)? {
            Value::Number(number) => number.as_f64(),
            Value::String(text) => text.trim().parse::<f64>().ok(),
            Value::Bool(flag) => Some(if *flag { 1.0 } else { 0.0 }),
            _ => None,
        }?;
        value.is_finite().then_some(value)
    }
}

fn label_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(text) => Ok(text),
        Value::Number(number) => Ok(number.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string or numeric label, found {other}"
        ))),
    }
}
