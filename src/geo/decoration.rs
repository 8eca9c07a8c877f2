use serde::{Deserialize, Serialize};

/// Screen offsets of the icon slots around a marker. A fifth mapping has no slot.
pub const DECORATION_OFFSETS: [(f64, f64); 4] = [(-5.0, -5.0), (5.0, -5.0), (-5.0, 5.0), (5.0, 5.0)];

/// Step function: values below `domain[0]` map to `range[0]`, values in
/// `[domain[i-1], domain[i])` to `range[i]`, and so on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdScale {
    pub domain: Vec<f64>,
    pub range: Vec<usize>,
}

impl ThresholdScale {
    pub fn apply(&self, value: f64) -> Option<usize> {
        let slot = self.domain.partition_point(|&threshold| threshold <= value);
        self.range.get(slot).copied()
    }
}

/// Picks an icon for a marker from one of its numeric attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMapping {
    #[serde(rename = "node_attr_img", alias = "attribute")]
    pub attribute: String,
    #[serde(rename = "img_scale", alias = "scale")]
    pub scale: ThresholdScale,
    #[serde(rename = "img_src", alias = "icons")]
    pub icons: Vec<String>,
}

impl ImageMapping {
    pub fn icon_for(&self, value: f64) -> Option<&str> {
        icon_at(&self.scale, &self.icons, value)
    }
}

/// Picks an icon for a marker when an event with a magnitude fires on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMapping {
    #[serde(rename = "node_event_img", alias = "event")]
    pub event: String,
    #[serde(rename = "img_scale", alias = "scale")]
    pub scale: ThresholdScale,
    #[serde(rename = "img_src", alias = "icons")]
    pub icons: Vec<String>,
}

impl EventMapping {
    pub fn icon_for(&self, value: f64) -> Option<&str> {
        icon_at(&self.scale, &self.icons, value)
    }
}

fn icon_at<'a>(scale: &ThresholdScale, icons: &'a [String], value: f64) -> Option<&'a str> {
    scale
        .apply(value)
        .and_then(|index| icons.get(index))
        .map(String::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nets() -> ImageMapping {
        ImageMapping {
            attribute: "Received_ITN".to_string(),
            scale: ThresholdScale {
                domain: vec![0.0, 10.0],
                range: vec![0, 1, 2],
            },
            icons: vec!["none.png".into(), "some.png".into(), "many.png".into()],
        }
    }

    #[test]
    fn thresholds_are_right_closed() {
        let scale = nets().scale;
        assert_eq!(scale.apply(-1.0), Some(0));
        assert_eq!(scale.apply(0.0), Some(1));
        assert_eq!(scale.apply(9.99), Some(1));
        assert_eq!(scale.apply(10.0), Some(2));
        assert_eq!(scale.apply(1e9), Some(2));
    }

    #[test]
    fn maps_values_to_icons() {
        let mapping = nets();
        assert_eq!(mapping.icon_for(4.0), Some("some.png"));
        assert_eq!(mapping.icon_for(12.0), Some("many.png"));
    }

    #[test]
    fn short_ranges_yield_no_icon() {
        let scale = ThresholdScale {
            domain: vec![1.0, 2.0],
            range: vec![0],
        };
        assert_eq!(scale.apply(5.0), None);
    }
}
