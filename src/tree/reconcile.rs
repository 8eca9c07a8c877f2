use std::collections::{BTreeMap, BTreeSet};

use super::diagonal::Diagonal;
use super::layout::{LayoutPoint, TreeLayout};
use super::{NodeId, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClass {
    Root,
    Inner,
    Leaf,
}

impl NodeClass {
    pub fn of(tree: &Tree, id: NodeId) -> Self {
        let node = &tree.nodes[id];
        if node.is_root() {
            NodeClass::Root
        } else if node.is_leaf() {
            NodeClass::Leaf
        } else {
            NodeClass::Inner
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            NodeClass::Root => "node root",
            NodeClass::Inner => "node inner",
            NodeClass::Leaf => "node leaf",
        }
    }
}

/// One node's animation, start to end.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeFrame {
    pub id: NodeId,
    pub class: NodeClass,
    /// Collapsed nodes are drawn filled to show they hide a subtree.
    pub collapsed: bool,
    pub from: LayoutPoint,
    pub to: LayoutPoint,
}

/// One link's animation, as path strings.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkFrame {
    pub source: NodeId,
    pub target: NodeId,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition<T> {
    pub entering: Vec<T>,
    pub updating: Vec<T>,
    pub exiting: Vec<T>,
}

impl<T> Default for Transition<T> {
    fn default() -> Self {
        Self {
            entering: Vec::new(),
            updating: Vec::new(),
            exiting: Vec::new(),
        }
    }
}

/// Everything a drawing backend needs to animate one state change.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderDiff {
    pub source: NodeId,
    pub nodes: Transition<NodeFrame>,
    pub links: Transition<LinkFrame>,
    pub duration_ms: u64,
}

/// What is currently on screen: node positions and link endpoints.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedFrame {
    pub nodes: BTreeMap<NodeId, LayoutPoint>,
    pub links: BTreeSet<(NodeId, NodeId)>,
}

impl RenderedFrame {
    pub fn from_layout(layout: &TreeLayout) -> Self {
        let nodes = layout
            .order
            .iter()
            .filter_map(|&id| layout.point(id).map(|point| (id, point)))
            .collect();
        let links = layout.edges.iter().copied().collect();
        Self { nodes, links }
    }
}

/// Where the clicked (or initially rendered) node was and now is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceMotion {
    pub id: NodeId,
    pub previous: LayoutPoint,
    pub current: LayoutPoint,
}

/// Diff the on-screen frame against a fresh layout.
///
/// Entering nodes and links grow out of the source's previous position,
/// persisting ones move from their previous to their new position, exiting ones
/// shrink into the source's new position. Returns the diff and the frame that
/// will be on screen once it has played.
pub fn reconcile(
    tree: &Tree,
    previous: &RenderedFrame,
    layout: &TreeLayout,
    source: SourceMotion,
    diagonal: &dyn Diagonal,
    duration_ms: u64,
) -> (RenderDiff, RenderedFrame) {
    let next = RenderedFrame::from_layout(layout);
    let mut nodes = Transition::default();
    let mut links = Transition::default();

    for &id in &layout.order {
        let Some(to) = layout.point(id) else {
            continue;
        };
        let frame = |from| NodeFrame {
            id,
            class: NodeClass::of(tree, id),
            collapsed: tree.nodes[id].is_collapsed(),
            from,
            to,
        };
        match previous.nodes.get(&id) {
            Some(&from) => nodes.updating.push(frame(from)),
            None => nodes.entering.push(frame(source.previous)),
        }
    }

    for (&id, &from) in &previous.nodes {
        if next.nodes.contains_key(&id) {
            continue;
        }
        nodes.exiting.push(NodeFrame {
            id,
            class: NodeClass::of(tree, id),
            collapsed: tree.nodes[id].is_collapsed(),
            from,
            to: source.current,
        });
    }

    for &(parent, child) in &layout.edges {
        let (Some(parent_point), Some(child_point)) = (layout.point(parent), layout.point(child))
        else {
            continue;
        };
        let to = diagonal.path(parent_point, child_point);
        if previous.links.contains(&(parent, child)) {
            let from = match (previous.nodes.get(&parent), previous.nodes.get(&child)) {
                (Some(&p), Some(&c)) => diagonal.path(p, c),
                _ => diagonal.path(source.previous, source.previous),
            };
            links.updating.push(LinkFrame {
                source: parent,
                target: child,
                from,
                to,
            });
        } else {
            links.entering.push(LinkFrame {
                source: parent,
                target: child,
                from: diagonal.path(source.previous, source.previous),
                to,
            });
        }
    }

    for &(parent, child) in &previous.links {
        if next.links.contains(&(parent, child)) {
            continue;
        }
        let from = match (previous.nodes.get(&parent), previous.nodes.get(&child)) {
            (Some(&p), Some(&c)) => diagonal.path(p, c),
            _ => diagonal.path(source.current, source.current),
        };
        links.exiting.push(LinkFrame {
            source: parent,
            target: child,
            from,
            to: diagonal.path(source.current, source.current),
        });
    }

    let diff = RenderDiff {
        source: source.id,
        nodes,
        links,
        duration_ms,
    };
    (diff, next)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::diagonal::RightAngleDiagonal;
    use crate::tree::fixtures::{id, sample_tree};
    use crate::tree::layout::{BranchScaling, LayoutSettings};

    const SETTINGS: LayoutSettings = LayoutSettings {
        width: 100.0,
        height: 60.0,
        scaling: BranchScaling::Proportional,
    };

    #[test]
    fn expanding_the_root_enters_its_children_from_the_root() {
        let mut tree = sample_tree();
        tree.collapse(tree.root).unwrap();
        let collapsed = TreeLayout::compute(&tree, SETTINGS);
        let previous = RenderedFrame::from_layout(&collapsed);
        let root_before = collapsed.point(tree.root).unwrap();

        tree.toggle(tree.root).unwrap();
        let expanded = TreeLayout::compute(&tree, SETTINGS);
        let motion = SourceMotion {
            id: tree.root,
            previous: root_before,
            current: expanded.point(tree.root).unwrap(),
        };
        let (diff, next) = reconcile(&tree, &previous, &expanded, motion, &RightAngleDiagonal, 750);

        let entering: Vec<_> = diff.nodes.entering.iter().map(|f| f.id).collect();
        assert_eq!(entering, vec![id(&tree, "a"), id(&tree, "d")]);
        assert!(diff.nodes.entering.iter().all(|f| f.from == root_before));
        assert!(diff.nodes.entering.iter().all(|f| f.collapsed));
        assert_eq!(diff.nodes.updating.len(), 1);
        assert_eq!(diff.nodes.updating[0].class, NodeClass::Root);
        assert!(diff.nodes.exiting.is_empty());

        assert_eq!(diff.links.entering.len(), 2);
        let stub = RightAngleDiagonal.path(root_before, root_before);
        assert!(diff.links.entering.iter().all(|link| link.from == stub));
        assert_eq!(diff.duration_ms, 750);
        assert_eq!(next.nodes.len(), 3);
    }

    #[test]
    fn collapsing_shrinks_into_the_source() {
        let mut tree = sample_tree();
        let full = TreeLayout::compute(&tree, SETTINGS);
        let previous = RenderedFrame::from_layout(&full);
        let d = id(&tree, "d");

        tree.toggle(d).unwrap();
        let folded = TreeLayout::compute(&tree, SETTINGS);
        let motion = SourceMotion {
            id: d,
            previous: full.point(d).unwrap(),
            current: folded.point(d).unwrap(),
        };
        let (diff, next) = reconcile(&tree, &previous, &folded, motion, &RightAngleDiagonal, 300);

        let mut exiting: Vec<_> = diff.nodes.exiting.iter().map(|f| f.id).collect();
        exiting.sort();
        assert_eq!(exiting, vec![id(&tree, "e"), id(&tree, "f"), id(&tree, "g")]);
        assert!(diff.nodes.exiting.iter().all(|f| f.to == motion.current));
        assert!(diff.nodes.entering.is_empty());

        let point = RightAngleDiagonal.path(motion.current, motion.current);
        assert_eq!(diff.links.exiting.len(), 3);
        assert!(diff.links.exiting.iter().all(|link| link.to == point));
        assert_eq!(next.links.len(), 4);
        assert!(diff
            .nodes
            .updating
            .iter()
            .any(|f| f.id == d && f.collapsed && f.class == NodeClass::Inner));
    }

    #[test]
    fn unchanged_layout_only_updates() {
        let tree = sample_tree();
        let layout = TreeLayout::compute(&tree, SETTINGS);
        let previous = RenderedFrame::from_layout(&layout);
        let root = layout.point(tree.root).unwrap();
        let motion = SourceMotion {
            id: tree.root,
            previous: root,
            current: root,
        };
        let (diff, next) = reconcile(&tree, &previous, &layout, motion, &RightAngleDiagonal, 750);
        assert!(diff.nodes.entering.is_empty() && diff.nodes.exiting.is_empty());
        assert!(diff.links.entering.is_empty() && diff.links.exiting.is_empty());
        assert!(diff.nodes.updating.iter().all(|f| f.from == f.to));
        assert!(diff.links.updating.iter().all(|l| l.from == l.to));
        assert_eq!(next, previous);
    }
}
