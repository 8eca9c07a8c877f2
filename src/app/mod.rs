use std::fs;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use log::info;

use crate::config::{DendrogramOptions, Options};
use crate::export::svg::{export_dendrogram, export_map};
use crate::geo::projection::{DEFAULT_CENTER, DEFAULT_ZOOM};
use crate::geo::{GeoOverlay, MapView};
use crate::tree::diagonal::DiagonalKind;
use crate::tree::state::CollapsePolicy;
use crate::tree::viewer::DendrogramSession;
use crate::tree::{NodeId, Tree};
use crate::{io, ui};

#[derive(Debug, Clone, Parser)]
#[command(
    name = "dendromap",
    about = "Lay out a collapsible cluster dendrogram and highlight its leaves on a map overlay."
)]
pub struct AppConfig {
    /// Cluster tree to load (nested JSON records or Newick).
    #[arg(value_name = "TREE")]
    pub tree_path: PathBuf,

    /// JSON array of geo-node records.
    #[arg(long = "geo", value_name = "FEED")]
    pub geo_path: PathBuf,

    /// JSON options file; command line flags override it.
    #[arg(long, value_name = "FILE")]
    pub options: Option<PathBuf>,

    /// Dendrogram canvas width in pixels
    #[arg(long)]
    pub width: Option<f64>,

    /// Dendrogram canvas height in pixels
    #[arg(long)]
    pub height: Option<f64>,

    /// Draw the dendrogram radially.
    #[arg(long)]
    pub radial: bool,

    /// Ignore branch lengths and place nodes by height.
    #[arg(long)]
    pub uniform: bool,

    /// Keep this many levels open at start-up instead of collapsing everything.
    #[arg(long, value_name = "N")]
    pub collapse_depth: Option<usize>,

    /// Node to click, by name or as `#<id>`. Repeat to replay several clicks.
    #[arg(long = "click", value_name = "NAME")]
    pub clicks: Vec<String>,

    /// Directory receiving dendrogram.svg and map.svg.
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,
}

impl AppConfig {
    fn apply_overrides(&self, options: &mut DendrogramOptions) {
        if let Some(width) = self.width {
            options.width = width;
        }
        if let Some(height) = self.height {
            options.height = height;
        }
        if self.radial {
            options.diagonal = DiagonalKind::Radial;
        }
        if self.uniform {
            options.skip_branch_length_scaling = true;
        }
        if let Some(depth) = self.collapse_depth {
            options.collapse = CollapsePolicy::Depth(depth);
        }
    }
}

pub struct DendroMapApp;

impl DendroMapApp {
    pub fn run(config: &AppConfig) -> Result<()> {
        let mut options = match &config.options {
            Some(path) => Options::load(path)
                .with_context(|| format!("failed to load options from {}", path.display()))?,
            None => Options::default(),
        };
        config.apply_overrides(&mut options.dendrogram);
        options.validate()?;

        let tree = io::load_tree(&config.tree_path, &options.dendrogram.children_accessor)?;
        let nodes = io::load_geo_nodes(&config.geo_path)?;
        info!(
            "Loaded {} tree node(s) and {} geo record(s).",
            tree.len(),
            nodes.len()
        );

        let (mut session, first) = DendrogramSession::build(tree, options.dendrogram.clone())?;

        let mut overlay = GeoOverlay::new(nodes, &options.map);
        let mut view = MapView::new(
            DEFAULT_CENTER,
            DEFAULT_ZOOM,
            (options.map.width, options.map.height),
        );
        if let Some(bounds) = overlay.bounds() {
            view.fit_bounds(bounds);
        }
        overlay.update(&view);
        session.attach_overlay(overlay);

        ui::render_preview(&session);
        ui::report_diff(&first);

        for click in &config.clicks {
            let node = resolve_node(session.tree(), click)?;
            let outcome = session.on_node_click(node)?;
            ui::report_click(session.tree(), &outcome);
        }

        if let Some(dir) = &config.output_dir {
            fs::create_dir_all(dir)
                .with_context(|| format!("failed to create output directory {}", dir.display()))?;
            let dendrogram_path = dir.join("dendrogram.svg");
            export_dendrogram(
                &session,
                &dendrogram_path,
                options.dendrogram.width,
                options.dendrogram.height,
            )
            .map_err(|err| anyhow!(err))?;
            if let Some(overlay) = session.overlay() {
                export_map(
                    overlay,
                    &dir.join("map.svg"),
                    options.map.width,
                    options.map.height,
                )
                .map_err(|err| anyhow!(err))?;
            }
            info!("Wrote snapshots to {}", dir.display());
        }

        Ok(())
    }
}

/// `#<id>` addresses a node by arena index; anything else is a node name.
fn resolve_node(tree: &Tree, key: &str) -> Result<NodeId> {
    if let Some(raw_id) = key.strip_prefix('#') {
        let id: NodeId = raw_id
            .parse()
            .with_context(|| format!("invalid node id `{key}`"))?;
        if tree.node(id).is_none() {
            bail!("tree has no node #{id}");
        }
        return Ok(id);
    }
    tree.find_by_name(key)
        .ok_or_else(|| anyhow!("tree has no node named `{key}`"))
}
