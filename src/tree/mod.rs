use phylotree::tree::{Node as PhyloNode, Tree as PhyloTree};
use thiserror::Error;

pub mod diagonal;
pub mod layout;
pub mod reconcile;
pub mod state;
pub mod viewer;

/// Arena index of a node. Assigned once when the tree is built and used as the
/// stable identity key of the rendered element across every relayout.
pub type NodeId = usize;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TreeError {
    #[error("tree does not contain any nodes")]
    Empty,
    #[error("tree has no root node")]
    MissingRoot,
    #[error("tree has more than one root: {0:?}")]
    MultipleRoots(Vec<NodeId>),
    #[error("cycle detected through node {0}")]
    Cycle(NodeId),
    #[error("node {0} is not reachable from the root")]
    Unreachable(NodeId),
    #[error("node {child} is listed under {listed_under} but its parent is {parent:?}")]
    ParentMismatch {
        child: NodeId,
        listed_under: NodeId,
        parent: Option<NodeId>,
    },
    #[error("node {node} has invalid branch length {length}")]
    InvalidLength { node: NodeId, length: f64 },
    #[error("record at {path} declares children under both `{first}` and `{second}`")]
    AmbiguousChildren {
        path: String,
        first: String,
        second: String,
    },
    #[error("node {node} has both visible and hidden children")]
    InconsistentCollapse { node: NodeId },
    #[error("unknown node id {0}")]
    UnknownNode(NodeId),
}

/// Nested input record, as produced by the clustering step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreeRecord {
    pub name: Option<String>,
    pub length: Option<f64>,
    pub children: Vec<TreeRecord>,
}

impl TreeRecord {
    pub fn leaf(name: &str, length: f64) -> Self {
        Self {
            name: Some(name.to_string()),
            length: Some(length),
            children: Vec::new(),
        }
    }

    pub fn inner(name: Option<&str>, length: Option<f64>, children: Vec<TreeRecord>) -> Self {
        Self {
            name: name.map(str::to_string),
            length,
            children,
        }
    }
}

/// Cluster tree stored as an arena of nodes.
#[derive(Debug, Clone)]
pub struct Tree {
    pub label: Option<String>,
    pub root: NodeId,
    pub nodes: Vec<TreeNode>,
}

impl Tree {
    /// Build the arena from a nested record, assigning ids in pre-order.
    pub fn from_record(label: Option<String>, record: &TreeRecord) -> Result<Self, TreeError> {
        let mut nodes = Vec::new();
        let mut stack: Vec<(&TreeRecord, Option<NodeId>)> = vec![(record, None)];

        while let Some((current, parent)) = stack.pop() {
            let id = nodes.len();
            let mut node = TreeNode::new(id, current.name.clone(), current.length);
            node.parent = parent;
            nodes.push(node);
            if let Some(parent_id) = parent {
                nodes[parent_id].children.push(id);
            }
            // reversed so the first child is popped (and numbered) first
            for child in current.children.iter().rev() {
                stack.push((child, Some(id)));
            }
        }

        Self::from_nodes(label, nodes)
    }

    /// Build the arena from a parsed Newick tree.
    pub fn from_phylo(label: Option<String>, phylo: &PhyloTree) -> Result<Self, TreeError> {
        let mut nodes = Vec::with_capacity(phylo.size());
        for idx in 0..phylo.size() {
            match phylo.get(&idx) {
                Ok(node) => nodes.push(TreeNode::from_phylo(node)),
                Err(_) => nodes.push(TreeNode::new(idx, None, None)),
            }
        }
        Self::from_nodes(label, nodes)
    }

    /// Validate a raw node list and wrap it as a tree.
    pub fn from_nodes(label: Option<String>, nodes: Vec<TreeNode>) -> Result<Self, TreeError> {
        if nodes.is_empty() {
            return Err(TreeError::Empty);
        }

        let roots: Vec<NodeId> = nodes
            .iter()
            .filter(|node| node.parent.is_none())
            .map(|node| node.id)
            .collect();
        let root = match roots.as_slice() {
            [] => return Err(TreeError::MissingRoot),
            [root] => *root,
            _ => return Err(TreeError::MultipleRoots(roots)),
        };

        for node in &nodes {
            if let Some(length) = node.length {
                if !length.is_finite() || length < 0.0 {
                    return Err(TreeError::InvalidLength {
                        node: node.id,
                        length,
                    });
                }
            }
            if !node.children.is_empty() && !node.hidden_children.is_empty() {
                return Err(TreeError::InconsistentCollapse { node: node.id });
            }
            for &child in node.children.iter().chain(&node.hidden_children) {
                let listed = nodes.get(child).ok_or(TreeError::UnknownNode(child))?;
                if listed.parent != Some(node.id) {
                    return Err(TreeError::ParentMismatch {
                        child,
                        listed_under: node.id,
                        parent: listed.parent,
                    });
                }
            }
        }

        let mut visited = vec![false; nodes.len()];
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if visited[current] {
                return Err(TreeError::Cycle(current));
            }
            visited[current] = true;
            let node = &nodes[current];
            stack.extend(node.children.iter().chain(&node.hidden_children).copied());
        }
        if let Some(orphan) = visited.iter().position(|seen| !seen) {
            return Err(TreeError::Unreachable(orphan));
        }

        let mut tree = Self { label, root, nodes };
        tree.assign_depths();
        Ok(tree)
    }

    fn assign_depths(&mut self) {
        let mut stack = vec![(self.root, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            self.nodes[id].depth = depth;
            let node = &self.nodes[id];
            for &child in node.children.iter().chain(&node.hidden_children) {
                stack.push((child, depth + 1));
            }
        }
    }

    pub fn node(&self, id: NodeId) -> Option<&TreeNode> {
        self.nodes.get(id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut TreeNode> {
        self.nodes.get_mut(id)
    }

    pub(crate) fn require(&self, id: NodeId) -> Result<&TreeNode, TreeError> {
        self.nodes.get(id).ok_or(TreeError::UnknownNode(id))
    }

    pub fn root(&self) -> &TreeNode {
        &self.nodes[self.root]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    pub fn leaves(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().filter(|node| node.is_leaf())
    }

    /// First node carrying `name`, in arena order.
    pub fn find_by_name(&self, name: &str) -> Option<NodeId> {
        self.nodes
            .iter()
            .find(|node| node.name.as_deref() == Some(name))
            .map(|node| node.id)
    }
}

/// Node within the cluster tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: Option<String>,
    pub length: Option<f64>,
    pub parent: Option<NodeId>,
    /// Visible children.
    pub children: Vec<NodeId>,
    /// Children stashed away while the node is collapsed.
    pub hidden_children: Vec<NodeId>,
    pub depth: usize,
    pub root_dist: f64,
    pub x: f64,
    pub y: f64,
    pub x0: f64,
    pub y0: f64,
}

impl TreeNode {
    pub fn new(id: NodeId, name: Option<String>, length: Option<f64>) -> Self {
        Self {
            id,
            name,
            length,
            parent: None,
            children: Vec::new(),
            hidden_children: Vec::new(),
            depth: 0,
            root_dist: 0.0,
            x: 0.0,
            y: 0.0,
            x0: 0.0,
            y0: 0.0,
        }
    }

    /// A true leaf: no children in either slot.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.hidden_children.is_empty()
    }

    pub fn is_collapsed(&self) -> bool {
        !self.hidden_children.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub(crate) fn from_phylo(node: &PhyloNode) -> Self {
        let mut tree_node = TreeNode::new(node.id, node.name.clone(), node.parent_edge);
        tree_node.parent = node.parent;
        tree_node.children = node.children.clone();
        tree_node
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    #[test]
    fn builds_arena_in_pre_order() {
        let tree = sample_tree();
        let names: Vec<_> = tree
            .nodes
            .iter()
            .map(|node| node.name.clone().unwrap())
            .collect();
        assert_eq!(names, ["root", "a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(tree.root, 0);
        assert_eq!(tree.root().depth, 0);
        assert_eq!(tree.nodes.iter().filter(|n| n.depth == 0).count(), 1);
        assert_eq!(tree.nodes[id(&tree, "g")].depth, 3);
        assert_eq!(tree.leaf_count(), 4);
    }

    #[test]
    fn builds_from_newick() {
        let phylo = PhyloTree::from_newick("((A:1,B:2)ab:0.5,C:3);").unwrap();
        let tree = Tree::from_phylo(None, &phylo).unwrap();
        assert_eq!(tree.leaf_count(), 3);
        let b = tree.find_by_name("B").unwrap();
        assert_eq!(tree.nodes[b].length, Some(2.0));
        assert_eq!(tree.nodes[b].depth, 2);
    }

    #[test]
    fn rejects_negative_lengths() {
        let record = TreeRecord::inner(None, None, vec![TreeRecord::leaf("x", -1.0)]);
        let err = Tree::from_record(None, &record).unwrap_err();
        assert_eq!(err, TreeError::InvalidLength { node: 1, length: -1.0 });
    }

    #[test]
    fn rejects_cycles_and_orphans() {
        let mut a = TreeNode::new(0, None, None);
        let mut b = TreeNode::new(1, None, None);
        a.children = vec![1];
        b.parent = Some(0);
        b.children = vec![0];
        // node 0 listed as a child of 1 while claiming no parent
        let err = Tree::from_nodes(None, vec![a.clone(), b.clone()]).unwrap_err();
        assert!(matches!(err, TreeError::ParentMismatch { child: 0, .. }));

        let mut c = TreeNode::new(2, None, None);
        let mut d = TreeNode::new(3, None, None);
        c.parent = Some(3);
        c.children = vec![3];
        d.parent = Some(2);
        d.children = vec![2];
        b.children.clear();
        let err = Tree::from_nodes(None, vec![a, b, c, d]).unwrap_err();
        assert_eq!(err, TreeError::Unreachable(2));
    }

    #[test]
    fn rejects_multiple_roots() {
        let nodes = vec![TreeNode::new(0, None, None), TreeNode::new(1, None, None)];
        assert_eq!(
            Tree::from_nodes(None, nodes).unwrap_err(),
            TreeError::MultipleRoots(vec![0, 1])
        );
        assert_eq!(Tree::from_nodes(None, Vec::new()).unwrap_err(), TreeError::Empty);
    }
}
