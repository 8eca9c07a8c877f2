use crate::tree::reconcile::RenderDiff;
use crate::tree::viewer::{ClickOutcome, DendrogramSession};
use crate::tree::Tree;

pub fn render_preview(session: &DendrogramSession) {
    let tree = session.tree();
    let label = tree.label.as_deref().unwrap_or("unnamed tree");
    println!(
        "Loaded {} with {} node(s), {} leaf/leaves.",
        label,
        tree.len(),
        tree.leaf_count()
    );
    println!(
        "Dendrogram {}x{} px, {} visible node(s), {:?} diagonal.",
        session.options().width,
        session.options().height,
        session.layout().order.len(),
        session.options().diagonal
    );

    match session.overlay() {
        Some(overlay) => println!(
            "Map overlay: {} marker(s), {} layer(s).",
            overlay.len(),
            overlay.layers().len()
        ),
        None => println!("No map overlay attached."),
    }
}

pub fn report_diff(diff: &RenderDiff) {
    println!(
        "  nodes: +{} ~{} -{} | links: +{} ~{} -{} | {} ms",
        diff.nodes.entering.len(),
        diff.nodes.updating.len(),
        diff.nodes.exiting.len(),
        diff.links.entering.len(),
        diff.links.updating.len(),
        diff.links.exiting.len(),
        diff.duration_ms
    );
}

pub fn report_click(tree: &Tree, outcome: &ClickOutcome) {
    let name = tree.nodes[outcome.highlight.node]
        .name
        .as_deref()
        .unwrap_or("(unnamed)");
    println!(
        "Clicked {} (#{}): {:?}, {} leaf descendant(s), {} marker(s) selected.",
        name,
        outcome.highlight.node,
        outcome.toggle,
        outcome.highlight.leaves.len(),
        outcome.highlight.selected.len()
    );
    report_diff(&outcome.diff);

    let shown = outcome.highlight.selected.iter().take(8).cloned().collect::<Vec<_>>();
    if !shown.is_empty() {
        let more = outcome.highlight.selected.len() - shown.len();
        if more > 0 {
            println!("  selected: {} ... ({} more)", shown.join(", "), more);
        } else {
            println!("  selected: {}", shown.join(", "));
        }
    }
}
