use std::cmp::Reverse;

use super::{NodeId, Tree, TreeError};

/// Position in layout space: `x` runs along the cross axis (leaf order, or the
/// angle in degrees for radial drawings), `y` along the main axis (distance from
/// the root).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LayoutPoint {
    pub x: f64,
    pub y: f64,
}

impl LayoutPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchScaling {
    /// `y` is proportional to the summed branch lengths from the root.
    Proportional,
    /// `y` comes from tree depth, leaves aligned at the far edge.
    Uniform,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutSettings {
    /// Extent of the main axis.
    pub width: f64,
    /// Extent of the cross axis.
    pub height: f64,
    pub scaling: BranchScaling,
}

/// Linear map from a numeric domain onto a range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearScale {
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

impl LinearScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn apply(&self, value: f64) -> f64 {
        let span = self.domain.1 - self.domain.0;
        // an empty domain pins everything to the start of the range
        let t = if span == 0.0 {
            0.0
        } else {
            (value - self.domain.0) / span
        };
        self.range.0 + t * (self.range.1 - self.range.0)
    }
}

/// Computed attributes of a visible node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub point: LayoutPoint,
    pub depth: usize,
    pub root_dist: f64,
}

/// Layout of the currently visible part of a tree.
#[derive(Debug, Clone)]
pub struct TreeLayout {
    /// Visible nodes in sorted pre-order.
    pub order: Vec<NodeId>,
    /// Indexed by node id; `None` for nodes hidden under a collapsed ancestor.
    pub placements: Vec<Option<Placement>>,
    /// Visible parent/child pairs.
    pub edges: Vec<(NodeId, NodeId)>,
    pub scale: LinearScale,
    pub settings: LayoutSettings,
}

impl TreeLayout {
    pub fn compute(tree: &Tree, settings: LayoutSettings) -> Self {
        let mut order = Vec::with_capacity(tree.len());
        let mut edges = Vec::with_capacity(tree.len());
        let mut cluster = vec![ClusterSlot::default(); tree.len()];

        let mut state = ClusterState {
            cursor: 0.0,
            first_leaf: None,
            last_leaf: None,
        };
        assign_cluster_positions(
            tree,
            tree.root,
            0,
            &mut order,
            &mut edges,
            &mut cluster,
            &mut state,
        );

        normalize_cross_axis(tree, &order, &mut cluster, &state, settings.height);

        let mut placements = vec![None; tree.len()];
        let scale = match settings.scaling {
            BranchScaling::Proportional => {
                let root_dists = compute_root_dists(tree, &order);
                let max_dist = order
                    .iter()
                    .map(|&id| root_dists[id])
                    .fold(0.0f64, f64::max);
                let scale = LinearScale::new((0.0, max_dist), (0.0, settings.width));
                for &id in &order {
                    placements[id] = Some(Placement {
                        point: LayoutPoint::new(cluster[id].x, scale.apply(root_dists[id])),
                        depth: cluster[id].depth,
                        root_dist: root_dists[id],
                    });
                }
                scale
            }
            BranchScaling::Uniform => {
                let root_dists = compute_root_dists(tree, &order);
                let scale = LinearScale::new((0.0, settings.width), (0.0, settings.width));
                let root_height = cluster[tree.root].height as f64;
                for &id in &order {
                    let relative = if root_height > 0.0 {
                        cluster[id].height as f64 / root_height
                    } else {
                        1.0
                    };
                    let y = (1.0 - relative) * settings.width;
                    placements[id] = Some(Placement {
                        point: LayoutPoint::new(cluster[id].x, scale.apply(y)),
                        depth: cluster[id].depth,
                        root_dist: root_dists[id],
                    });
                }
                scale
            }
        };

        Self {
            order,
            placements,
            edges,
            scale,
            settings,
        }
    }

    pub fn placement(&self, id: NodeId) -> Option<&Placement> {
        self.placements.get(id).and_then(Option::as_ref)
    }

    pub fn point(&self, id: NodeId) -> Option<LayoutPoint> {
        self.placement(id).map(|placement| placement.point)
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        self.placement(id).is_some()
    }

    /// Copy the computed attributes onto the tree's nodes.
    pub fn apply(&self, tree: &mut Tree) -> Result<(), TreeError> {
        for &id in &self.order {
            let placement = self.placements[id].ok_or(TreeError::UnknownNode(id))?;
            let node = tree.node_mut(id).ok_or(TreeError::UnknownNode(id))?;
            node.x = placement.point.x;
            node.y = placement.point.y;
            node.depth = placement.depth;
            node.root_dist = placement.root_dist;
        }
        Ok(())
    }
}

/// Visible children of `node_id` in drawing order: more visible children first,
/// visible leaves last, ties kept in arena order. The arena itself is untouched.
pub fn sorted_children(tree: &Tree, node_id: NodeId) -> Vec<NodeId> {
    let mut children = tree.nodes[node_id].children.clone();
    children.sort_by_key(|&child| Reverse(sort_weight(tree, child)));
    children
}

fn sort_weight(tree: &Tree, node_id: NodeId) -> isize {
    let visible = tree.nodes[node_id].children.len();
    if visible == 0 {
        -1
    } else {
        visible as isize
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct ClusterSlot {
    x: f64,
    height: usize,
    depth: usize,
}

struct ClusterState {
    cursor: f64,
    first_leaf: Option<NodeId>,
    last_leaf: Option<NodeId>,
}

fn separation(tree: &Tree, a: NodeId, b: NodeId) -> f64 {
    if tree.nodes[a].parent == tree.nodes[b].parent {
        1.0
    } else {
        2.0
    }
}

fn assign_cluster_positions(
    tree: &Tree,
    node_id: NodeId,
    depth: usize,
    order: &mut Vec<NodeId>,
    edges: &mut Vec<(NodeId, NodeId)>,
    cluster: &mut [ClusterSlot],
    state: &mut ClusterState,
) {
    order.push(node_id);
    cluster[node_id].depth = depth;

    let children = sorted_children(tree, node_id);
    if children.is_empty() {
        if let Some(previous) = state.last_leaf {
            state.cursor += separation(tree, previous, node_id);
        }
        cluster[node_id].x = state.cursor;
        cluster[node_id].height = 0;
        state.first_leaf.get_or_insert(node_id);
        state.last_leaf = Some(node_id);
        return;
    }

    let mut height = 0;
    for &child_id in &children {
        edges.push((node_id, child_id));
        assign_cluster_positions(tree, child_id, depth + 1, order, edges, cluster, state);
        height = height.max(cluster[child_id].height + 1);
    }

    let first = cluster[children[0]].x;
    let last = cluster[children[children.len() - 1]].x;
    cluster[node_id].x = (first + last) / 2.0;
    cluster[node_id].height = height;
}

fn normalize_cross_axis(
    tree: &Tree,
    order: &[NodeId],
    cluster: &mut [ClusterSlot],
    state: &ClusterState,
    extent: f64,
) {
    let (Some(left), Some(right)) = (state.first_leaf, state.last_leaf) else {
        return;
    };
    let x0 = cluster[left].x - separation(tree, left, right) / 2.0;
    let x1 = cluster[right].x + separation(tree, right, left) / 2.0;
    let span = x1 - x0;
    for &id in order {
        cluster[id].x = (cluster[id].x - x0) / span * extent;
    }
}

/// Pre-order sum of branch lengths from the root over the visible nodes.
fn compute_root_dists(tree: &Tree, order: &[NodeId]) -> Vec<f64> {
    let mut root_dists = vec![0.0; tree.len()];
    // `order` is pre-order, so every parent is resolved before its children
    for &id in order {
        let node = &tree.nodes[id];
        let parent_dist = node.parent.map(|parent| root_dists[parent]).unwrap_or(0.0);
        root_dists[id] = parent_dist + node.length.unwrap_or(0.0);
    }
    root_dists[tree.root] = 0.0;
    root_dists
}
