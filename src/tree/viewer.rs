use log::debug;

use super::diagonal::Diagonal;
use super::layout::{LayoutPoint, TreeLayout};
use super::reconcile::{reconcile, RenderDiff, RenderedFrame, SourceMotion};
use super::state::Toggle;
use super::{NodeId, Tree, TreeError};
use crate::config::DendrogramOptions;
use crate::geo::GeoOverlay;
use crate::highlight::{Highlight, HighlightCoordinator};

/// What a node click produced: the state change, its animation and the new
/// highlight.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickOutcome {
    pub toggle: Toggle,
    pub diff: RenderDiff,
    pub highlight: Highlight,
}

/// All state behind one dendrogram and its (optional) linked map.
#[derive(Debug)]
pub struct DendrogramSession {
    tree: Tree,
    options: DendrogramOptions,
    diagonal: Box<dyn Diagonal>,
    layout: TreeLayout,
    frame: RenderedFrame,
    highlight: HighlightCoordinator,
    overlay: Option<GeoOverlay>,
}

impl DendrogramSession {
    /// Lay out the full tree, fold it according to the collapse policy and
    /// render the first frame with the root as the transition source.
    pub fn build(tree: Tree, options: DendrogramOptions) -> Result<(Self, RenderDiff), TreeError> {
        let diagonal = options.diagonal.build();
        Self::build_with_diagonal(tree, options, diagonal)
    }

    pub fn build_with_diagonal(
        mut tree: Tree,
        options: DendrogramOptions,
        diagonal: Box<dyn Diagonal>,
    ) -> Result<(Self, RenderDiff), TreeError> {
        let layout = TreeLayout::compute(&tree, options.layout_settings());
        layout.apply(&mut tree)?;

        let root = tree.root;
        let root_node = &mut tree.nodes[root];
        root_node.x0 = root_node.x;
        root_node.y0 = root_node.y;

        tree.apply_collapse_policy(options.collapse)?;
        debug!(
            "built session over {} nodes ({} leaves), collapse policy {:?}",
            tree.len(),
            tree.leaf_count(),
            options.collapse
        );

        let mut session = Self {
            tree,
            options,
            diagonal,
            layout,
            frame: RenderedFrame::default(),
            highlight: HighlightCoordinator::new(),
            overlay: None,
        };
        let diff = session.update(root)?;
        Ok((session, diff))
    }

    /// Relayout the visible tree and diff it against what is on screen, using
    /// `source` as the origin of entering and the sink of exiting elements.
    pub fn update(&mut self, source: NodeId) -> Result<RenderDiff, TreeError> {
        let source_node = self.tree.require(source)?;
        let previous = LayoutPoint::new(source_node.x0, source_node.y0);

        let layout = TreeLayout::compute(&self.tree, self.options.layout_settings());
        layout.apply(&mut self.tree)?;
        // a source hidden under a collapsed ancestor stays where it was
        let current = layout.point(source).unwrap_or(previous);

        let motion = SourceMotion {
            id: source,
            previous,
            current,
        };
        let (diff, frame) = reconcile(
            &self.tree,
            &self.frame,
            &layout,
            motion,
            self.diagonal.as_ref(),
            self.options.duration_ms,
        );

        for &id in &layout.order {
            let node = &mut self.tree.nodes[id];
            node.x0 = node.x;
            node.y0 = node.y;
        }
        debug!(
            "update from node {source}: {} entering, {} updating, {} exiting",
            diff.nodes.entering.len(),
            diff.nodes.updating.len(),
            diff.nodes.exiting.len()
        );

        self.layout = layout;
        self.frame = frame;
        Ok(diff)
    }

    pub fn toggle(&mut self, node: NodeId) -> Result<(Toggle, RenderDiff), TreeError> {
        let toggle = self.tree.toggle(node)?;
        let diff = self.update(node)?;
        Ok((toggle, diff))
    }

    /// Toggle `node`, then move the shared selection to its leaves.
    pub fn on_node_click(&mut self, node: NodeId) -> Result<ClickOutcome, TreeError> {
        let (toggle, diff) = self.toggle(node)?;
        let highlight = self
            .highlight
            .select(&self.tree, node, self.overlay.as_mut())?;
        Ok(ClickOutcome {
            toggle,
            diff,
            highlight,
        })
    }

    pub fn attach_overlay(&mut self, overlay: GeoOverlay) {
        self.overlay = Some(overlay);
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn options(&self) -> &DendrogramOptions {
        &self.options
    }

    pub fn diagonal(&self) -> &dyn Diagonal {
        self.diagonal.as_ref()
    }

    pub fn layout(&self) -> &TreeLayout {
        &self.layout
    }

    pub fn frame(&self) -> &RenderedFrame {
        &self.frame
    }

    pub fn overlay(&self) -> Option<&GeoOverlay> {
        self.overlay.as_ref()
    }

    pub fn overlay_mut(&mut self) -> Option<&mut GeoOverlay> {
        self.overlay.as_mut()
    }

    pub fn selected_node(&self) -> Option<NodeId> {
        self.highlight.selected_node()
    }

    pub fn highlight(&self) -> &HighlightCoordinator {
        &self.highlight
    }
}
