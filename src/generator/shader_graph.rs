//! Validated, topologically ordered node graph consumed by the generator.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;
use tracing::debug;

use super::error::{GenError, GenResult};
use super::node_impls::{NodeImplementation, implementation_for};
use super::syntax::Syntax;
use super::types::{TypeDesc, Value};
use super::variables::{Connection, Port};
use crate::dsl::{self, GraphDesc, NodeDesc};
use crate::graph;

bitflags! {
    /// Role of a node (or graph) in emission ordering.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Classification: u32 {
        const TEXTURE = 1 << 0;
        const CLOSURE = 1 << 1;
        const SHADER = 1 << 2;
        const SURFACE = 1 << 3;
        const LIGHT = 1 << 4;
        const MATERIAL = 1 << 5;
        const FILETEXTURE = 1 << 6;
        const SAMPLE2D = 1 << 7;
    }
}

impl Classification {
    /// Base classification implied by an output type.
    pub fn for_type(ty: &TypeDesc) -> Self {
        match ty {
            t if t.is_closure() => Self::CLOSURE,
            TypeDesc::SurfaceShader => Self::SHADER | Self::SURFACE,
            TypeDesc::LightShader => Self::SHADER | Self::LIGHT,
            TypeDesc::Material => Self::SHADER | Self::SURFACE | Self::MATERIAL,
            TypeDesc::VolumeShader | TypeDesc::DisplacementShader => Self::SHADER,
            _ => Self::TEXTURE,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct GraphId(u64);

static NEXT_GRAPH_ID: AtomicU64 = AtomicU64::new(1);

impl GraphId {
    fn next() -> Self {
        GraphId(NEXT_GRAPH_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// One operation in the graph.
#[derive(Clone)]
pub struct ShaderNode {
    pub name: String,
    pub category: String,
    pub inputs: Vec<Port>,
    pub outputs: Vec<Port>,
    pub classification: Classification,
    pub implementation: Arc<dyn NodeImplementation>,
    /// Owning graph; `None` for bound light shaders and internal helpers.
    pub parent: Option<GraphId>,
}

impl fmt::Debug for ShaderNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShaderNode")
            .field("name", &self.name)
            .field("category", &self.category)
            .field("implementation", &self.implementation.name())
            .field("classification", &self.classification)
            .finish()
    }
}

impl ShaderNode {
    /// Node without inputs, used for generator-internal helper functions.
    pub fn internal(name: &str, implementation: Arc<dyn NodeImplementation>) -> Self {
        Self {
            name: name.to_string(),
            category: name.to_string(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            classification: implementation.classification(),
            implementation,
            parent: None,
        }
    }

    /// Build a node from its document description. Connections are attached later.
    pub fn from_desc(desc: &NodeDesc, syntax: &Syntax, parent: Option<GraphId>) -> GenResult<Self> {
        let implementation = implementation_for(&desc.category)?;
        let out_ty = syntax
            .type_by_name(&desc.node_type)
            .ok_or_else(|| GenError::unsupported(desc.node_type.clone()))?;
        syntax.type_syntax(&out_ty)?;

        let prefix = syntax.make_valid_name(&desc.name);
        let mut inputs = Vec::with_capacity(desc.inputs.len());
        for input in &desc.inputs {
            let mut ty = syntax
                .type_by_name(&input.input_type)
                .ok_or_else(|| GenError::unsupported(input.input_type.clone()))?;
            let mut value = input
                .value
                .as_ref()
                .map(|v| Value::from_json(&ty, v, syntax))
                .transpose()?;

            let remapped = match (&input.enumeration, &value) {
                (Some(names), Some(Value::String(s))) => {
                    syntax.remap_enumeration(&input.name, s, &ty, names)?
                }
                _ => None,
            };
            if let Some((remapped_ty, remapped_value)) = remapped {
                ty = remapped_ty;
                value = Some(remapped_value);
            }

            let mut port = Port::new(input.name.clone(), ty)
                .with_variable(format!("{prefix}_{}", syntax.make_valid_name(&input.name)));
            port.value = value;
            port.uniform = input.uniform;
            port.enumeration = input.enumeration.clone();
            inputs.push(port);
        }

        let classification = Classification::for_type(&out_ty) | implementation.classification();
        Ok(Self {
            name: desc.name.clone(),
            category: desc.category.clone(),
            inputs,
            outputs: vec![Port::new("out", out_ty).with_variable(format!("{prefix}_out"))],
            classification,
            implementation,
            parent,
        })
    }

    pub fn input(&self, name: &str) -> Option<&Port> {
        self.inputs.iter().find(|p| p.name == name)
    }

    fn input_mut(&mut self, name: &str) -> Option<&mut Port> {
        self.inputs.iter_mut().find(|p| p.name == name)
    }

    pub fn output_port(&self, name: &str) -> Option<&Port> {
        self.outputs.iter().find(|p| p.name == name)
    }

    /// Primary output. Internal helper nodes have none.
    pub fn output(&self) -> GenResult<&Port> {
        self.outputs
            .first()
            .ok_or_else(|| GenError::malformed(format!("node '{}' has no output", self.name)))
    }

    pub fn has_classification(&self, c: Classification) -> bool {
        self.classification.contains(c)
    }
}

/// A graph result: port without an owning node.
#[derive(Clone, Debug)]
pub struct OutputSocket {
    pub port: Port,
}

impl OutputSocket {
    pub fn connection(&self) -> Option<&Connection> {
        self.port.connection.as_ref()
    }
}

#[derive(Debug)]
pub struct ShaderGraph {
    id: GraphId,
    name: String,
    nodes: Vec<ShaderNode>,
    outputs: Vec<OutputSocket>,
    classification: Classification,
    struct_types: Vec<(String, Vec<(String, TypeDesc)>)>,
}

impl ShaderGraph {
    /// Validate `desc`, prune unreachable nodes, remap enumerations and
    /// store nodes in stable topological order.
    pub fn build(desc: &GraphDesc, base_syntax: &Syntax) -> GenResult<Self> {
        if desc.outputs.is_empty() {
            return Err(GenError::malformed(format!("graph '{}' has no outputs", desc.name)));
        }

        let mut syntax = Cow::Borrowed(base_syntax);
        let mut struct_types = Vec::with_capacity(desc.types.len());
        for t in &desc.types {
            let mut members = Vec::with_capacity(t.members.len());
            for m in &t.members {
                let ty = syntax
                    .type_by_name(&m.member_type)
                    .ok_or_else(|| GenError::unsupported(m.member_type.clone()))?;
                members.push((m.name.clone(), ty));
            }
            syntax.to_mut().create_struct_syntax(&t.name, members.clone())?;
            struct_types.push((t.name.clone(), members));
        }

        let shaken = dsl::treeshake_unlinked_nodes(desc);
        let order = graph::topo_sort(&shaken)?;

        let id = GraphId::next();
        let mut nodes = Vec::with_capacity(order.len());
        let mut index_by_name: HashMap<&str, usize> = HashMap::new();
        let mut variables: HashMap<String, String> = HashMap::new();
        for &i in &order {
            let node_desc = &shaken.nodes[i];
            if index_by_name.contains_key(node_desc.name.as_str()) {
                return Err(GenError::malformed(format!(
                    "duplicate node name '{}'",
                    node_desc.name
                )));
            }
            let node = ShaderNode::from_desc(node_desc, &syntax, Some(id))?;
            let var = node.output()?.variable.clone();
            if let Some(other) = variables.insert(var.clone(), node.name.clone()) {
                return Err(GenError::malformed(format!(
                    "nodes '{other}' and '{}' map to the same identifier '{var}'",
                    node.name
                )));
            }
            index_by_name.insert(node_desc.name.as_str(), nodes.len());
            nodes.push(node);
        }

        for c in &shaken.connections {
            let from = index_by_name[c.from.node.as_str()];
            let to = index_by_name[c.to.node.as_str()];
            let upstream_ty = nodes[from]
                .output_port(&c.from.port)
                .map(|p| p.ty.clone())
                .ok_or_else(|| {
                    GenError::malformed(format!(
                        "node '{}' has no output '{}'",
                        c.from.node, c.from.port
                    ))
                })?;
            let connection = Connection {
                node: from,
                port: c.from.port.clone(),
            };

            let target = &mut nodes[to];
            let prefix = syntax.make_valid_name(&target.name);
            match target.input_mut(&c.to.port) {
                Some(port) => {
                    if port.ty != upstream_ty {
                        return Err(GenError::malformed(format!(
                            "type mismatch on {}.{}: expected {}, got {}",
                            c.to.node, c.to.port, port.ty, upstream_ty
                        )));
                    }
                    port.connection = Some(connection);
                }
                None => {
                    let mut port = Port::new(c.to.port.clone(), upstream_ty).with_variable(
                        format!("{prefix}_{}", syntax.make_valid_name(&c.to.port)),
                    );
                    port.connection = Some(connection);
                    target.inputs.push(port);
                }
            }
        }

        for node in &nodes {
            for input in &node.inputs {
                if input.connection.is_none() && input.value.is_none() {
                    return Err(GenError::malformed(format!(
                        "input '{}' of node '{}' is neither connected nor valued",
                        input.name, node.name
                    )));
                }
            }
        }

        let mut outputs = Vec::with_capacity(desc.outputs.len());
        for o in &desc.outputs {
            let ty = syntax
                .type_by_name(&o.output_type)
                .ok_or_else(|| GenError::unsupported(o.output_type.clone()))?;
            let mut port = Port::new(o.name.clone(), ty.clone())
                .with_variable(syntax.make_valid_name(&o.name));
            port.value = o
                .value
                .as_ref()
                .map(|v| Value::from_json(&ty, v, &syntax))
                .transpose()?;
            if let Some(node_name) = &o.node {
                let idx = *index_by_name.get(node_name.as_str()).ok_or_else(|| {
                    GenError::malformed(format!(
                        "output '{}' references missing node '{node_name}'",
                        o.name
                    ))
                })?;
                let out_port = o.port.clone().unwrap_or_else(|| "out".to_string());
                let upstream = nodes[idx].output_port(&out_port).ok_or_else(|| {
                    GenError::malformed(format!("node '{node_name}' has no output '{out_port}'"))
                })?;
                if upstream.ty != ty {
                    return Err(GenError::malformed(format!(
                        "output '{}' is {ty} but node '{node_name}' produces {}",
                        o.name, upstream.ty
                    )));
                }
                port.connection = Some(Connection {
                    node: idx,
                    port: out_port,
                });
            }
            outputs.push(OutputSocket { port });
        }

        let classification = match outputs[0].connection() {
            Some(c) => nodes[c.node].classification,
            None => Classification::for_type(&outputs[0].port.ty),
        };
        debug!(
            graph = %desc.name,
            nodes = nodes.len(),
            classification = ?classification,
            "built shader graph"
        );

        Ok(Self {
            id,
            name: desc.name.clone(),
            nodes,
            outputs,
            classification,
            struct_types,
        })
    }

    pub fn id(&self) -> GraphId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn nodes(&self) -> &[ShaderNode] {
        &self.nodes
    }

    pub fn node(&self, idx: usize) -> &ShaderNode {
        &self.nodes[idx]
    }

    pub fn outputs(&self) -> &[OutputSocket] {
        &self.outputs
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn has_classification(&self, c: Classification) -> bool {
        self.classification.contains(c)
    }

    /// Node feeding `input` of `node`, if connected.
    pub fn upstream(&self, node: &ShaderNode, input: &str) -> Option<&ShaderNode> {
        node.input(input)
            .and_then(|p| p.connection.as_ref())
            .map(|c| &self.nodes[c.node])
    }

    /// The base syntax extended with this graph's struct types.
    pub fn extend_syntax<'a>(&self, base: &'a Syntax) -> GenResult<Cow<'a, Syntax>> {
        if self.struct_types.is_empty() {
            return Ok(Cow::Borrowed(base));
        }
        let mut syntax = base.clone();
        for (name, members) in &self.struct_types {
            syntax.create_struct_syntax(name, members.clone())?;
        }
        Ok(Cow::Owned(syntax))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::MaterialDocument;

    fn build(json: &str) -> GenResult<ShaderGraph> {
        let doc: MaterialDocument = serde_json::from_str(json).unwrap();
        ShaderGraph::build(&doc.graphs[0], &Syntax::hlsl())
    }

    #[test]
    fn classification_from_type() {
        assert_eq!(Classification::for_type(&TypeDesc::Bsdf), Classification::CLOSURE);
        assert_eq!(
            Classification::for_type(&TypeDesc::Material),
            Classification::SHADER | Classification::SURFACE | Classification::MATERIAL
        );
        assert_eq!(Classification::for_type(&TypeDesc::Color3), Classification::TEXTURE);
    }

    #[test]
    fn graph_takes_classification_of_first_output_node() {
        let g = build(
            r#"{ "version": "1.0", "graphs": [{
                "name": "M",
                "nodes": [
                    { "name": "diffuse", "category": "diffuse_bsdf", "type": "BSDF" },
                    { "name": "surf", "category": "surface", "type": "surfaceshader" }
                ],
                "connections": [
                    { "from": { "node": "diffuse" }, "to": { "node": "surf", "port": "bsdf" } }
                ],
                "outputs": [{ "name": "out", "type": "surfaceshader", "node": "surf" }]
            }]}"#,
        )
        .unwrap();
        assert!(g.has_classification(Classification::SHADER | Classification::SURFACE));
        assert_eq!(g.nodes()[0].name, "diffuse");
        assert!(g.nodes()[0].has_classification(Classification::CLOSURE));
        assert_eq!(g.upstream(&g.nodes()[1], "bsdf").map(|n| n.name.as_str()), Some("diffuse"));
    }

    #[test]
    fn unvalued_unconnected_input_is_malformed() {
        let err = build(
            r#"{ "version": "1.0", "graphs": [{
                "name": "M",
                "nodes": [{ "name": "c", "category": "constant", "type": "float",
                            "inputs": [{ "name": "value", "type": "float" }] }],
                "outputs": [{ "name": "out", "type": "float", "node": "c" }]
            }]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GenError::MalformedGraph(_)));
    }

    #[test]
    fn unknown_category_is_malformed() {
        let err = build(
            r#"{ "version": "1.0", "graphs": [{
                "name": "M",
                "nodes": [{ "name": "c", "category": "teleport", "type": "float" }],
                "outputs": [{ "name": "out", "type": "float", "node": "c" }]
            }]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GenError::MalformedGraph(_)));
    }

    #[test]
    fn enum_inputs_are_remapped_to_integers() {
        let g = build(
            r#"{ "version": "1.0", "graphs": [{
                "name": "M",
                "nodes": [{ "name": "c", "category": "constant", "type": "float",
                            "inputs": [
                                { "name": "value", "type": "float", "value": 1.0 },
                                { "name": "mode", "type": "string", "value": "clamp",
                                  "enum": "constant, clamp, periodic" }
                            ] }],
                "outputs": [{ "name": "out", "type": "float", "node": "c" }]
            }]}"#,
        )
        .unwrap();
        let mode = g.nodes()[0].input("mode").unwrap();
        assert_eq!(mode.ty, TypeDesc::Integer);
        assert_eq!(mode.value, Some(Value::Integer(1)));
    }

    #[test]
    fn invalid_enum_value_is_reported() {
        let err = build(
            r#"{ "version": "1.0", "graphs": [{
                "name": "M",
                "nodes": [{ "name": "c", "category": "constant", "type": "float",
                            "inputs": [
                                { "name": "value", "type": "float", "value": 1.0 },
                                { "name": "mode", "type": "string", "value": "wrap",
                                  "enum": "constant, clamp" }
                            ] }],
                "outputs": [{ "name": "out", "type": "float", "node": "c" }]
            }]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, GenError::InvalidEnumValue { .. }));
    }

    #[test]
    fn struct_types_are_registered_per_graph() {
        let g = build(
            r#"{ "version": "1.0", "graphs": [{
                "name": "M",
                "types": [{ "name": "tint_t", "members": [
                    { "name": "color", "type": "color3" },
                    { "name": "gain", "type": "float" }
                ] }],
                "nodes": [{ "name": "c", "category": "constant", "type": "float",
                            "inputs": [
                                { "name": "value", "type": "float", "value": 1.0 },
                                { "name": "tint", "type": "tint_t", "uniform": true,
                                  "value": { "color": [1.0, 0.5, 0.0], "gain": 2.0 } }
                            ] }],
                "outputs": [{ "name": "out", "type": "float", "node": "c" }]
            }]}"#,
        )
        .unwrap();
        let base = Syntax::hlsl();
        let syntax = g.extend_syntax(&base).unwrap();
        assert!(syntax.type_by_name("tint_t").is_some());
        assert!(base.type_by_name("tint_t").is_none());
    }
}
