use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};
use log::warn;
use phylotree::tree::Tree as PhyloTree;
use serde::Deserialize;
use serde_json::Value;

use crate::geo::GeoNode;
use crate::tree::{NodeId, Tree, TreeError, TreeNode};

/// Child-list field names recognised in addition to the configured accessor.
const CHILD_ALIASES: [&str; 2] = ["children", "branchset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TreeFileFormat {
    Json,
    Newick,
}

pub fn load_tree(path: &Path, accessor: &str) -> Result<Tree> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read tree file: {}", path.display()))?;
    let label = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned());

    let mut tree = match detect_format(path, &raw) {
        TreeFileFormat::Json => parse_tree_json(&raw, accessor)?,
        TreeFileFormat::Newick => parse_newick(&raw)?,
    };
    if tree.label.is_none() {
        tree.label = label;
    }
    Ok(tree)
}

fn detect_format(path: &Path, raw: &str) -> TreeFileFormat {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase());
    match extension.as_deref() {
        Some("json") => return TreeFileFormat::Json,
        Some("nwk" | "newick" | "tre" | "tree") => return TreeFileFormat::Newick,
        _ => {}
    }

    for line in raw.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        // Newick comment lines
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            continue;
        }

        if trimmed.starts_with('{') {
            return TreeFileFormat::Json;
        }
        return TreeFileFormat::Newick;
    }

    TreeFileFormat::Newick
}

/// Parse a nested-record tree. Child lists are read from `accessor` and the
/// usual aliases; a record may use only one of them. Nesting depth is not
/// limited: both parsing and the walk over the records run off the call stack.
pub fn parse_tree_json(raw: &str, accessor: &str) -> Result<Tree> {
    let value = read_unbounded_json(raw).context("malformed tree JSON")?;
    let mut fields = vec![accessor];
    fields.extend(CHILD_ALIASES.iter().copied().filter(|alias| *alias != accessor));

    let label = value
        .get("label")
        .and_then(Value::as_str)
        .map(str::to_string);
    let nodes = nodes_from_value(&value, &fields);
    dismantle(value);
    Ok(Tree::from_nodes(label, nodes?)?)
}

fn read_unbounded_json(raw: &str) -> serde_json::Result<Value> {
    let mut json = serde_json::Deserializer::from_str(raw);
    json.disable_recursion_limit();
    let value = Value::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(value)
}

/// Drop a parsed document without recursing through its nesting.
fn dismantle(value: Value) {
    let mut stack = vec![value];
    while let Some(mut current) = stack.pop() {
        match &mut current {
            Value::Array(items) => stack.append(items),
            Value::Object(map) => {
                stack.extend(std::mem::take(map).into_iter().map(|(_, child)| child));
            }
            _ => {}
        }
    }
}

/// Arena nodes in pre-order, walked with an explicit stack.
fn nodes_from_value<'v, 'f>(value: &'v Value, fields: &[&'f str]) -> Result<Vec<TreeNode>> {
    let mut nodes: Vec<TreeNode> = Vec::new();
    // how each node was reached from its parent, for error paths
    let mut origins: Vec<Option<(&'f str, usize)>> = Vec::new();
    let mut stack: Vec<(&'v Value, Option<NodeId>, Option<(&'f str, usize)>)> =
        vec![(value, None, None)];

    while let Some((current, parent, origin)) = stack.pop() {
        let path = || record_path(&nodes, &origins, parent, origin);
        let record = read_record(current, fields, path)?;

        let id = nodes.len();
        let mut node = TreeNode::new(id, record.name, record.length);
        node.parent = parent;
        nodes.push(node);
        origins.push(origin);
        if let Some(parent_id) = parent {
            nodes[parent_id].children.push(id);
        }
        if let Some((field, list)) = record.children {
            // reversed so the first child is popped (and numbered) first
            for (index, child) in list.iter().enumerate().rev() {
                stack.push((child, Some(id), Some((field, index))));
            }
        }
    }
    Ok(nodes)
}

fn record_path(
    nodes: &[TreeNode],
    origins: &[Option<(&str, usize)>],
    parent: Option<NodeId>,
    origin: Option<(&str, usize)>,
) -> String {
    let mut steps: Vec<(&str, usize)> = origin.into_iter().collect();
    let mut current = parent;
    while let Some(id) = current {
        steps.extend(origins[id]);
        current = nodes[id].parent;
    }
    let mut path = String::from("$");
    for (field, index) in steps.into_iter().rev() {
        path.push_str(&format!(".{field}[{index}]"));
    }
    path
}

struct RawRecord<'v, 'f> {
    name: Option<String>,
    length: Option<f64>,
    children: Option<(&'f str, &'v Vec<Value>)>,
}

fn read_record<'v, 'f>(
    value: &'v Value,
    fields: &[&'f str],
    path: impl Fn() -> String,
) -> Result<RawRecord<'v, 'f>> {
    let object = value
        .as_object()
        .ok_or_else(|| anyhow!("tree record at {} is not an object", path()))?;

    let name = match object.get("name") {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text.clone()),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(other) => bail!("tree record at {} has a non-scalar name: {other}", path()),
    };

    let length = match object.get("length") {
        None | Some(Value::Null) => None,
        Some(Value::Number(number)) => number.as_f64(),
        Some(Value::String(text)) => Some(
            text.trim()
                .parse::<f64>()
                .with_context(|| format!("tree record at {} has a non-numeric length", path()))?,
        ),
        Some(other) => bail!("tree record at {} has a non-numeric length: {other}", path()),
    };

    let mut children: Option<(&'f str, &'v Vec<Value>)> = None;
    for &field in fields {
        let Some(list) = object.get(field) else {
            continue;
        };
        let list = match list {
            Value::Array(items) => items,
            Value::Null => continue,
            _ => bail!("tree record at {} has a non-array `{field}` field", path()),
        };
        if list.is_empty() {
            continue;
        }
        if let Some((first, _)) = children {
            return Err(TreeError::AmbiguousChildren {
                path: path(),
                first: first.to_string(),
                second: field.to_string(),
            }
            .into());
        }
        children = Some((field, list));
    }

    Ok(RawRecord {
        name,
        length,
        children,
    })
}

/// Parse the first tree of a Newick document.
pub fn parse_newick(raw: &str) -> Result<Tree> {
    let mut extra = 0usize;
    let mut first = None;

    for chunk in raw.split_inclusive(';') {
        let candidate = chunk.trim();
        if candidate.is_empty() || !candidate.ends_with(';') {
            continue;
        }
        if first.is_none() {
            first = Some(normalise_newick(candidate));
        } else {
            extra += 1;
        }
    }

    let newick = first.ok_or_else(|| anyhow!("tree file did not contain any trees"))?;
    if extra > 0 {
        warn!("ignoring {extra} additional tree(s) after the first");
    }
    build_tree(None, &newick)
}

fn build_tree(label: Option<String>, newick: &str) -> Result<Tree> {
    let phylo = PhyloTree::from_newick(newick)
        .map_err(|err| anyhow!("failed to parse newick tree: {err}"))?;
    Ok(Tree::from_phylo(label, &phylo)?)
}

fn normalise_newick(raw: &str) -> String {
    let mut cleaned = raw.trim().trim_end_matches(';').trim().to_owned();
    cleaned.push(';');
    cleaned
}

pub fn load_geo_nodes(path: &Path) -> Result<Vec<GeoNode>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read geo feed: {}", path.display()))?;
    parse_geo_nodes(&raw)
}

/// Parse a JSON array of geo-node records. Records that do not deserialize are
/// skipped with a warning.
pub fn parse_geo_nodes(raw: &str) -> Result<Vec<GeoNode>> {
    let records: Vec<Value> =
        serde_json::from_str(raw).context("geo feed must be a JSON array of records")?;

    let mut nodes = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<GeoNode>(record) {
            Ok(node) => nodes.push(node),
            Err(err) => warn!("skipping geo record #{index}: {err}"),
        }
    }
    Ok(nodes)
}
