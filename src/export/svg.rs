use std::path::Path;

use svg::node::element::{Circle, Group, Path as SvgPath, Text};
use svg::Document;

use crate::geo::overlay::{DECORATION_RADIUS, MARKER_RADIUS};
use crate::geo::GeoOverlay;
use crate::tree::diagonal::fmt_point;
use crate::tree::reconcile::NodeClass;
use crate::tree::viewer::DendrogramSession;

const NODE_RADIUS: f64 = 4.5;
const COLLAPSED_FILL: &str = "green";
const EXPANDED_FILL: &str = "#fff";
const LINK_STROKE: &str = "darkgrey";

/// Snapshot of the dendrogram as it stands once the last diff has played.
pub fn dendrogram_document(session: &DendrogramSession, width: f64, height: f64) -> Document {
    let tree = session.tree();
    let layout = session.layout();
    let diagonal = session.diagonal();
    let origin = diagonal.origin(width, height);

    let mut document = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width as i32, height as i32));

    let mut canvas = Group::new()
        .set("id", "dendrogram")
        .set("transform", format!("translate({})", fmt_point(origin)));

    for &(parent, child) in &layout.edges {
        let (Some(source), Some(target)) = (layout.point(parent), layout.point(child)) else {
            continue;
        };
        let link = SvgPath::new()
            .set("class", "link")
            .set("d", diagonal.path(source, target))
            .set("fill", "none")
            .set("stroke", LINK_STROKE)
            .set("stroke-width", "2px");
        canvas = canvas.add(link);
    }

    for &id in &layout.order {
        let Some(point) = layout.point(id) else {
            continue;
        };
        let node = &tree.nodes[id];
        let class = NodeClass::of(tree, id);
        let fill = if session.selected_node() == Some(id) {
            "red"
        } else {
            "black"
        };

        let mut group = Group::new()
            .set("class", class.css_class())
            .set("id", format!("node-{id}"))
            .set("fill", fill)
            .set("transform", format!("translate({})", fmt_point(diagonal.project(point))));

        let circle = Circle::new().set("r", NODE_RADIUS).set(
            "fill",
            if node.is_collapsed() {
                COLLAPSED_FILL
            } else {
                EXPANDED_FILL
            },
        );
        group = group.add(circle);

        if class == NodeClass::Leaf {
            if let Some(name) = &node.name {
                let text = Text::new("")
                    .set("x", NODE_RADIUS + 4.0)
                    .set("dominant-baseline", "middle")
                    .set("text-anchor", "start")
                    .set("font-size", 10.0)
                    .add(svg::node::Text::new(name.clone()));
                group = group.add(text);
            }
        }

        canvas = canvas.add(group);
    }

    document.add(canvas)
}

/// Snapshot of the marker layer over a map of `width` x `height` pixels.
/// Marker positions come from the overlay's last `update`.
pub fn map_document(overlay: &GeoOverlay, width: f64, height: f64) -> Document {
    let mut document = Document::new()
        .set("width", width)
        .set("height", height)
        .set("viewBox", (0, 0, width as i32, height as i32));

    let mut container = Group::new()
        .set("class", "map")
        .set("id", "svgNodesContainer");

    for marker in overlay.markers() {
        let Some(position) = marker.position else {
            continue;
        };
        let circle = Circle::new()
            .set("id", marker.label())
            .set("class", marker.css_class())
            .set("cx", position.x)
            .set("cy", position.y)
            .set("r", MARKER_RADIUS)
            .set("opacity", overlay.opacity());
        container = container.add(circle);

        for decoration in &marker.decorations {
            let Some(spot) = decoration.position else {
                continue;
            };
            let mut circle = Circle::new()
                .set("id", format!("attr{}_{}", decoration.attribute, marker.label()))
                .set("cx", spot.x)
                .set("cy", spot.y)
                .set("r", DECORATION_RADIUS)
                .set("opacity", decoration.opacity());
            if let Some(icon) = &decoration.icon {
                circle = circle.set("data-icon", icon.as_str());
            }
            container = container.add(circle);
        }

        for (event, icon) in &marker.event_icons {
            let badge = Circle::new()
                .set("id", format!("event{event}_{}", marker.label()))
                .set("cx", position.x)
                .set("cy", position.y)
                .set("r", DECORATION_RADIUS)
                .set("data-icon", icon.as_str());
            container = container.add(badge);
        }
    }

    document.add(container)
}

pub fn export_dendrogram(
    session: &DendrogramSession,
    path: &Path,
    width: f64,
    height: f64,
) -> Result<(), String> {
    let document = dendrogram_document(session, width, height);
    svg::save(path, &document).map_err(|e| format!("Failed to save SVG: {}", e))
}

pub fn export_map(overlay: &GeoOverlay, path: &Path, width: f64, height: f64) -> Result<(), String> {
    let document = map_document(overlay, width, height);
    svg::save(path, &document).map_err(|e| format!("Failed to save SVG: {}", e))
}
