use std::collections::BTreeSet;

use log::debug;

use crate::geo::GeoOverlay;
use crate::tree::{NodeId, Tree, TreeError};

/// Every true leaf below `node_id`, walking whichever child slot is populated
/// so collapsed subtrees are included. Children are pushed in order and popped
/// last-first.
pub fn select_leaves(tree: &Tree, node_id: NodeId) -> Result<Vec<NodeId>, TreeError> {
    tree.require(node_id)?;
    let mut leaves = Vec::new();
    let mut stack = vec![node_id];
    while let Some(current) = stack.pop() {
        let node = &tree.nodes[current];
        if node.is_leaf() {
            leaves.push(current);
        } else if !node.children.is_empty() {
            stack.extend(node.children.iter().copied());
        } else {
            stack.extend(node.hidden_children.iter().copied());
        }
    }
    Ok(leaves)
}

/// `NodeLabel`s of the currently selected markers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    labels: BTreeSet<String>,
}

impl SelectionSet {
    pub fn contains(&self, label: &str) -> bool {
        self.labels.contains(label)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    fn replace(&mut self, labels: impl IntoIterator<Item = String>) {
        self.labels = labels.into_iter().collect();
    }
}

/// Result of highlighting one dendrogram node.
#[derive(Debug, Clone, PartialEq)]
pub struct Highlight {
    pub node: NodeId,
    /// Node that held the dendrogram selection before this one.
    pub previous_node: Option<NodeId>,
    pub leaves: Vec<NodeId>,
    /// Marker labels that lost their selection.
    pub cleared: Vec<String>,
    /// Marker labels selected for this node, in leaf order.
    pub selected: Vec<String>,
}

/// Keeps the single active selection shared by both views.
#[derive(Debug, Clone, Default)]
pub struct HighlightCoordinator {
    selection: SelectionSet,
    selected_node: Option<NodeId>,
}

impl HighlightCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        self.selected_node
    }

    /// Replace the selection with the markers whose cluster matches a leaf
    /// under `node_id`. Without an overlay only the dendrogram side changes.
    pub fn select(
        &mut self,
        tree: &Tree,
        node_id: NodeId,
        overlay: Option<&mut GeoOverlay>,
    ) -> Result<Highlight, TreeError> {
        let leaves = select_leaves(tree, node_id)?;

        let (cleared, selected) = match overlay {
            Some(overlay) => {
                let cleared = overlay.clear_selection();
                let mut seen = BTreeSet::new();
                let mut selected = Vec::new();
                for &leaf in &leaves {
                    let Some(name) = tree.nodes[leaf].name.as_deref() else {
                        continue;
                    };
                    if seen.insert(name) {
                        selected.extend(overlay.select_cluster(name));
                    }
                }
                (cleared, selected)
            }
            None => (Vec::new(), Vec::new()),
        };

        debug!(
            "node {node_id}: {} leaves matched {} markers",
            leaves.len(),
            selected.len()
        );
        self.selection.replace(selected.iter().cloned());
        let previous_node = self.selected_node.replace(node_id);

        Ok(Highlight {
            node: node_id,
            previous_node,
            leaves,
            cleared,
            selected,
        })
    }
}
