use serde::{Deserialize, Serialize};

use super::{NodeId, Tree, TreeError};

/// How much of the tree is folded away when a session is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollapsePolicy {
    /// Collapse everything from the root down; only the root is visible.
    #[default]
    Full,
    /// Keep the first `n` levels open and collapse every node at depth `n`.
    Depth(usize),
    /// Leave the tree fully expanded.
    #[serde(alias = "none")]
    Expanded,
}

/// What a toggle did to the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Collapsed,
    Expanded,
    /// True leaves have nothing to fold.
    Leaf,
}

impl Tree {
    /// Swap a node's visible and hidden child slots. Descendants keep whatever
    /// state they had.
    pub fn toggle(&mut self, id: NodeId) -> Result<Toggle, TreeError> {
        let node = self.node_mut(id).ok_or(TreeError::UnknownNode(id))?;
        if !node.children.is_empty() {
            node.hidden_children = std::mem::take(&mut node.children);
            Ok(Toggle::Collapsed)
        } else if !node.hidden_children.is_empty() {
            node.children = std::mem::take(&mut node.hidden_children);
            Ok(Toggle::Expanded)
        } else {
            Ok(Toggle::Leaf)
        }
    }

    /// Collapse `id` and every visible descendant beneath it. Subtrees that are
    /// already collapsed are left as they are.
    pub fn collapse(&mut self, id: NodeId) -> Result<(), TreeError> {
        self.require(id)?;
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            let node = &mut self.nodes[current];
            if node.children.is_empty() {
                continue;
            }
            node.hidden_children = std::mem::take(&mut node.children);
            stack.extend(node.hidden_children.iter().copied());
        }
        Ok(())
    }

    /// Restore the hidden children of `id`, one level only.
    pub fn expand(&mut self, id: NodeId) -> Result<(), TreeError> {
        let node = self.node_mut(id).ok_or(TreeError::UnknownNode(id))?;
        if node.children.is_empty() && !node.hidden_children.is_empty() {
            node.children = std::mem::take(&mut node.hidden_children);
        }
        Ok(())
    }

    pub fn apply_collapse_policy(&mut self, policy: CollapsePolicy) -> Result<(), TreeError> {
        match policy {
            CollapsePolicy::Full => self.collapse(self.root),
            CollapsePolicy::Expanded => Ok(()),
            CollapsePolicy::Depth(limit) => {
                let mut frontier = Vec::new();
                let mut stack = vec![(self.root, 0usize)];
                while let Some((id, depth)) = stack.pop() {
                    if depth == limit {
                        frontier.push(id);
                        continue;
                    }
                    for &child in &self.nodes[id].children {
                        stack.push((child, depth + 1));
                    }
                }
                for id in frontier {
                    self.collapse(id)?;
                }
                Ok(())
            }
        }
    }

    /// Ids reachable from the root through visible children, pre-order.
    pub fn visible_nodes(&self) -> Vec<NodeId> {
        let mut visible = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            visible.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        visible
    }

    pub fn is_visible(&self, id: NodeId) -> bool {
        let mut current = match self.nodes.get(id) {
            Some(node) => node,
            None => return false,
        };
        while let Some(parent) = current.parent {
            let parent_node = &self.nodes[parent];
            if !parent_node.children.contains(&current.id) {
                return false;
            }
            current = parent_node;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::fixtures::{id, sample_tree};

    #[test]
    fn toggle_round_trip_restores_children_in_order() {
        let mut tree = sample_tree();
        let d = id(&tree, "d");
        let before = tree.nodes[d].children.clone();

        assert_eq!(tree.toggle(d).unwrap(), Toggle::Collapsed);
        assert!(tree.nodes[d].children.is_empty());
        assert_eq!(tree.nodes[d].hidden_children, before);

        assert_eq!(tree.toggle(d).unwrap(), Toggle::Expanded);
        assert_eq!(tree.nodes[d].children, before);
        assert!(tree.nodes[d].hidden_children.is_empty());
    }

    #[test]
    fn toggle_only_touches_one_level() {
        let mut tree = sample_tree();
        let d = id(&tree, "d");
        let f = id(&tree, "f");
        tree.toggle(f).unwrap();
        tree.toggle(d).unwrap();
        tree.toggle(d).unwrap();
        // f is still collapsed after its parent was folded and reopened
        assert!(tree.nodes[f].is_collapsed());
        assert!(!tree.is_visible(id(&tree, "g")));
    }

    #[test]
    fn toggling_a_leaf_changes_nothing() {
        let mut tree = sample_tree();
        let b = id(&tree, "b");
        assert_eq!(tree.toggle(b).unwrap(), Toggle::Leaf);
        assert!(tree.nodes[b].is_leaf());
    }

    #[test]
    fn slots_are_never_both_populated() {
        let mut tree = sample_tree();
        tree.collapse(tree.root).unwrap();
        for target in ["root", "d", "f", "root", "a", "d"] {
            let node = id(&tree, target);
            tree.toggle(node).unwrap();
            assert!(tree
                .nodes
                .iter()
                .all(|n| n.children.is_empty() || n.hidden_children.is_empty()));
        }
    }

    #[test]
    fn full_collapse_hides_every_descendant() {
        let mut tree = sample_tree();
        tree.apply_collapse_policy(CollapsePolicy::Full).unwrap();
        assert_eq!(tree.visible_nodes(), vec![tree.root]);
        // each internal node stashed its own children
        for name in ["a", "d", "f"] {
            assert!(tree.nodes[id(&tree, name)].is_collapsed());
        }

        // reopening the root shows only its direct children
        tree.toggle(tree.root).unwrap();
        assert_eq!(tree.visible_nodes(), vec![0, id(&tree, "a"), id(&tree, "d")]);
    }

    #[test]
    fn expand_reopens_a_single_level() {
        let mut tree = sample_tree();
        tree.collapse(tree.root).unwrap();
        tree.expand(tree.root).unwrap();
        let (a, d) = (id(&tree, "a"), id(&tree, "d"));
        assert_eq!(tree.visible_nodes(), vec![0, a, d]);
        assert!(tree.nodes[a].is_collapsed());
        assert!(tree.nodes[d].is_collapsed());

        // already open nodes and leaves are left alone
        let before = tree.nodes[tree.root].children.clone();
        tree.expand(tree.root).unwrap();
        assert_eq!(tree.nodes[tree.root].children, before);
        let b = id(&tree, "b");
        tree.expand(b).unwrap();
        assert!(tree.nodes[b].is_leaf());
        assert_eq!(tree.expand(99), Err(TreeError::UnknownNode(99)));
    }

    #[test]
    fn depth_policy_keeps_upper_levels_open() {
        let mut tree = sample_tree();
        tree.apply_collapse_policy(CollapsePolicy::Depth(1)).unwrap();
        let visible = tree.visible_nodes();
        assert_eq!(visible, vec![0, id(&tree, "a"), id(&tree, "d")]);
        assert!(tree.nodes[id(&tree, "a")].is_collapsed());

        let mut tree = sample_tree();
        tree.apply_collapse_policy(CollapsePolicy::Depth(0)).unwrap();
        assert_eq!(tree.visible_nodes(), vec![tree.root]);
    }

    #[test]
    fn expanded_policy_is_a_no_op() {
        let mut tree = sample_tree();
        tree.apply_collapse_policy(CollapsePolicy::Expanded).unwrap();
        assert_eq!(tree.visible_nodes().len(), tree.len());
    }

    #[test]
    fn unknown_ids_are_rejected() {
        let mut tree = sample_tree();
        assert_eq!(tree.toggle(99), Err(TreeError::UnknownNode(99)));
        assert_eq!(tree.collapse(99), Err(TreeError::UnknownNode(99)));
        assert!(!tree.is_visible(99));
    }
}
