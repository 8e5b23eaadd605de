//! Typed ports and the ordered variable blocks they live in.

use std::collections::HashMap;

use super::types::{TypeDesc, Value};

/// Reference to a node output that feeds an input or an output socket.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    /// Index of the upstream node in the owning graph's node list.
    pub node: usize,
    pub port: String,
}

/// A named, typed value slot.
#[derive(Clone, Debug, PartialEq)]
pub struct Port {
    pub name: String,
    pub ty: TypeDesc,
    /// Identifier used for this port in generated code.
    pub variable: String,
    pub value: Option<Value>,
    pub semantic: Option<String>,
    pub connection: Option<Connection>,
    /// Published as a shader uniform instead of being inlined.
    pub uniform: bool,
    /// Comma separated enumeration names, for string inputs.
    pub enumeration: Option<String>,
}

impl Port {
    pub fn new(name: impl Into<String>, ty: TypeDesc) -> Self {
        let name = name.into();
        Self {
            variable: name.clone(),
            name,
            ty,
            value: None,
            semantic: None,
            connection: None,
            uniform: false,
            enumeration: None,
        }
    }

    pub fn with_variable(mut self, variable: impl Into<String>) -> Self {
        self.variable = variable.into();
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_semantic(mut self, semantic: impl Into<String>) -> Self {
        self.semantic = Some(semantic.into());
        self
    }

    pub fn is_texture(&self) -> bool {
        self.ty == TypeDesc::Filename
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlockKind {
    Constant,
    Uniform,
    StageInput,
    StageOutput,
}

/// Ordered, name-unique collection of ports. Insertion order is emission order.
#[derive(Clone, Debug)]
pub struct VariableBlock {
    name: String,
    instance: Option<String>,
    kind: BlockKind,
    ports: Vec<Port>,
    index_by_name: HashMap<String, usize>,
}

impl VariableBlock {
    pub fn new(name: impl Into<String>, kind: BlockKind) -> Self {
        Self {
            name: name.into(),
            instance: None,
            kind,
            ports: Vec::new(),
            index_by_name: HashMap::new(),
        }
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn kind(&self) -> BlockKind {
        self.kind
    }

    /// Add a port, or return the existing one when the name is already taken.
    pub fn add(&mut self, port: Port) -> &mut Port {
        let idx = match self.index_by_name.get(&port.name) {
            Some(&idx) => idx,
            None => {
                let idx = self.ports.len();
                self.index_by_name.insert(port.name.clone(), idx);
                self.ports.push(port);
                idx
            }
        };
        &mut self.ports[idx]
    }

    pub fn find(&self, name: &str) -> Option<&Port> {
        self.index_by_name.get(name).map(|&idx| &self.ports[idx])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index_by_name.contains_key(name)
    }

    pub fn ports(&self) -> &[Port] {
        &self.ports
    }

    pub fn len(&self) -> usize {
        self.ports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ports.is_empty()
    }
}
