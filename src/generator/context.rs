//! Request-scoped state.
//!
//! [`GenContext`] is owned by the caller and holds everything one generation
//! request may mutate. [`EmitContext`] is the read-only view handed to node
//! implementations while text is emitted.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::trace;

use super::binding::ResourceBindingStrategy;
use super::error::{GenError, GenResult};
use super::library::{LibraryResolver, MemoryLibrary};
use super::options::GenOptions;
use super::shader_graph::{Classification, ShaderGraph, ShaderNode};
use super::stage::{Stage, StageWriter};
use super::syntax::Syntax;

pub struct GenContext {
    pub(crate) options: GenOptions,
    pub(crate) resolver: Arc<dyn LibraryResolver + Send + Sync>,
    pub(crate) binding: Option<Box<dyn ResourceBindingStrategy>>,
    pub(crate) light_shaders: BTreeMap<u32, ShaderNode>,
}

impl GenContext {
    /// Context with the built-in library and no binding strategy.
    pub fn new(options: GenOptions) -> Self {
        Self {
            options,
            resolver: Arc::new(MemoryLibrary::builtin()),
            binding: None,
            light_shaders: BTreeMap::new(),
        }
    }

    pub fn with_resolver(mut self, resolver: Arc<dyn LibraryResolver + Send + Sync>) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_binding_strategy(mut self, strategy: impl ResourceBindingStrategy + 'static) -> Self {
        self.binding = Some(Box::new(strategy));
        self
    }

    pub fn options(&self) -> &GenOptions {
        &self.options
    }

    /// Bind a light shader under `type_id`; `LightData.type` selects it at runtime.
    pub fn bind_light_shader(&mut self, type_id: u32, node: ShaderNode) -> GenResult<()> {
        if !node.has_classification(Classification::LIGHT) {
            return Err(GenError::malformed(format!(
                "node '{}' is not a light shader",
                node.name
            )));
        }
        self.light_shaders.insert(type_id, node);
        Ok(())
    }

    pub fn light_shaders(&self) -> &BTreeMap<u32, ShaderNode> {
        &self.light_shaders
    }
}

/// Which part of the lighting integral closure calls are emitted for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ClosureContext {
    Reflection,
    Indirect,
    Emission,
}

impl ClosureContext {
    pub fn scope(self) -> &'static str {
        match self {
            ClosureContext::Reflection => "reflection",
            ClosureContext::Indirect => "indirect",
            ClosureContext::Emission => "emission",
        }
    }
}

#[derive(Clone, Copy)]
pub struct EmitContext<'a> {
    pub syntax: &'a Syntax,
    pub graph: &'a ShaderGraph,
    pub options: &'a GenOptions,
    pub resolver: &'a dyn LibraryResolver,
    pub light_shaders: &'a BTreeMap<u32, ShaderNode>,
    pub tokens: &'a [(&'static str, String)],
    pub closure: Option<ClosureContext>,
}

impl<'a> EmitContext<'a> {
    pub fn requires_lighting(&self) -> bool {
        self.options.hw_lighting
            && self
                .graph
                .has_classification(Classification::SHADER | Classification::SURFACE)
    }

    pub fn with_closure(self, closure: ClosureContext) -> Self {
        Self {
            closure: Some(closure),
            ..self
        }
    }

    pub fn upstream(&self, node: &ShaderNode, input: &str) -> Option<&'a ShaderNode> {
        if node.parent != Some(self.graph.id()) {
            return None;
        }
        self.graph.upstream(node, input)
    }

    /// Expression for an input: upstream variable, uniform name or literal.
    /// A missing input renders as `default`.
    pub fn input_or(&self, node: &ShaderNode, name: &str, default: &str) -> GenResult<String> {
        let Some(port) = node.input(name) else {
            return Ok(default.to_string());
        };
        if let Some(upstream) = self.upstream(node, name) {
            let conn = port.connection.as_ref().map(|c| c.port.as_str()).unwrap_or("out");
            let out = upstream.output_port(conn).ok_or_else(|| {
                GenError::malformed(format!("node '{}' has no output '{conn}'", upstream.name))
            })?;
            return Ok(out.variable.clone());
        }
        if port.uniform {
            return Ok(port.variable.clone());
        }
        match &port.value {
            Some(v) => self.syntax.value(&port.ty, v, false),
            None => self.syntax.default_value(&port.ty, false),
        }
    }

    /// Inline a library fragment once per stage. Tokens in `path` are substituted first.
    pub fn emit_library_include(&self, path: &str, writer: &mut StageWriter) -> GenResult<()> {
        let mut resolved = path.to_string();
        for (token, replacement) in self.tokens {
            resolved = resolved.replace(token, replacement);
        }
        if !writer.mark_included(&resolved) {
            return Ok(());
        }
        let text = self.resolver.resolve(&resolved)?;
        trace!(path = %resolved, stage = writer.kind().name(), "include library fragment");
        writer.raw(&text);
        writer.line_break();
        Ok(())
    }

    pub fn emit_function_definition(&self, node: &ShaderNode, stage: &mut Stage) -> GenResult<()> {
        node.implementation
            .emit_function_definition(node, self, stage)
    }

    /// Emit `node`'s call at most once per closure scope of this stage.
    pub fn emit_function_call(&self, node: &ShaderNode, stage: &mut Stage) -> GenResult<()> {
        let scope = self.closure.map(ClosureContext::scope).unwrap_or("");
        if !stage.writer.mark_called(scope, &node.name) {
            return Ok(());
        }
        node.implementation.emit_function_call(node, self, stage)
    }
}
