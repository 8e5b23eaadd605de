use std::collections::HashSet;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::generator::error::{GenError, GenResult};
use crate::graph;

/// A material document: one or more named node graphs.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MaterialDocument {
    pub version: String,
    pub graphs: Vec<GraphDesc>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct GraphDesc {
    pub name: String,
    /// User struct types referenced by inputs of this graph.
    #[serde(default)]
    pub types: Vec<StructTypeDesc>,
    pub nodes: Vec<NodeDesc>,
    #[serde(default)]
    pub connections: Vec<Connection>,
    pub outputs: Vec<OutputDesc>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StructTypeDesc {
    pub name: String,
    pub members: Vec<StructMemberDesc>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StructMemberDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub member_type: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct NodeDesc {
    pub name: String,
    pub category: String,
    /// Output type of the node.
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub inputs: Vec<InputDesc>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InputDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub input_type: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub uniform: bool,
    #[serde(default, rename = "enum")]
    pub enumeration: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Connection {
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Endpoint {
    pub node: String,
    #[serde(default = "default_port")]
    pub port: String,
}

fn default_port() -> String {
    "out".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OutputDesc {
    pub name: String,
    #[serde(rename = "type")]
    pub output_type: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default)]
    pub node: Option<String>,
    #[serde(default)]
    pub port: Option<String>,
}

pub fn load_document_from_path(path: impl AsRef<std::path::Path>) -> Result<MaterialDocument> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read material json at {}", path.display()))?;
    let doc: MaterialDocument =
        serde_json::from_str(&text).context("failed to parse material json")?;
    Ok(doc)
}

/// Find a graph by name; `None` picks the first graph.
pub fn find_graph<'a>(doc: &'a MaterialDocument, name: Option<&str>) -> GenResult<&'a GraphDesc> {
    match name {
        Some(name) => doc
            .graphs
            .iter()
            .find(|g| g.name == name)
            .ok_or_else(|| GenError::malformed(format!("material '{name}' not found in document"))),
        None => doc
            .graphs
            .first()
            .ok_or_else(|| GenError::malformed("document contains no graphs")),
    }
}

/// Drops nodes that cannot reach any output socket.
///
/// Connections touching a dropped node are dropped with it.
pub fn treeshake_unlinked_nodes(desc: &GraphDesc) -> GraphDesc {
    let roots: Vec<&str> = desc.outputs.iter().filter_map(|o| o.node.as_deref()).collect();
    let keep: HashSet<String> = graph::upstream_reachable(desc, roots);

    let nodes: Vec<NodeDesc> = desc
        .nodes
        .iter()
        .filter(|n| keep.contains(&n.name))
        .cloned()
        .collect();
    let pruned = desc.nodes.len() - nodes.len();
    if pruned > 0 {
        debug!(graph = %desc.name, pruned, "pruned unreachable nodes");
    }

    let connections = desc
        .connections
        .iter()
        .filter(|c| keep.contains(&c.from.node) && keep.contains(&c.to.node))
        .cloned()
        .collect();

    GraphDesc {
        name: desc.name.clone(),
        types: desc.types.clone(),
        nodes,
        connections,
        outputs: desc.outputs.clone(),
    }
}
