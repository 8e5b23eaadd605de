//! Per-stage text assembly.
//!
//! A [`Stage`] owns its variable blocks and a [`StageWriter`] that collects
//! text into fixed, ordered sections. The two are separate fields so a block
//! can be read while the writer is borrowed mutably.

use std::collections::HashSet;

use super::binding::ResourceBinding;
use super::variables::{BlockKind, VariableBlock};

pub const VERTEX_INPUTS: &str = "VertexInputs";
pub const VERTEX_DATA: &str = "VertexData";
pub const PIXEL_OUTPUTS: &str = "PixelOutputs";
pub const PRIVATE_UNIFORMS: &str = "PrivateUniforms";
pub const PUBLIC_UNIFORMS: &str = "PublicUniforms";
pub const LIGHT_DATA: &str = "LightData";
pub const LIGHT_DATA_INSTANCE: &str = "u_lightData";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageKind {
    Vertex,
    Pixel,
}

impl StageKind {
    pub fn name(self) -> &'static str {
        match self {
            StageKind::Vertex => "vertex",
            StageKind::Pixel => "pixel",
        }
    }

    pub fn entry_point(self) -> &'static str {
        match self {
            StageKind::Vertex => "VS_Main",
            StageKind::Pixel => "PS_Main",
        }
    }
}

/// Output sections, in emission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Directives,
    TypeDefinitions,
    Constants,
    Uniforms,
    Inputs,
    Outputs,
    Libraries,
    FunctionDefinitions,
    MainFunction,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::Directives,
        Section::TypeDefinitions,
        Section::Constants,
        Section::Uniforms,
        Section::Inputs,
        Section::Outputs,
        Section::Libraries,
        Section::FunctionDefinitions,
        Section::MainFunction,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

const INDENT: &str = "    ";

/// Text sink for one stage: sections, indentation and dedupe bookkeeping.
#[derive(Debug)]
pub struct StageWriter {
    kind: StageKind,
    sections: [String; 9],
    current: Section,
    indent: usize,
    included: HashSet<String>,
    defined_functions: HashSet<String>,
    emitted_calls: HashSet<(String, String)>,
    bindings: Vec<ResourceBinding>,
}

impl StageWriter {
    fn new(kind: StageKind) -> Self {
        Self {
            kind,
            sections: Default::default(),
            current: Section::Directives,
            indent: 0,
            included: HashSet::new(),
            defined_functions: HashSet::new(),
            emitted_calls: HashSet::new(),
            bindings: Vec::new(),
        }
    }

    pub fn kind(&self) -> StageKind {
        self.kind
    }

    /// Route subsequent text into `section`. Sections may only move forward.
    pub fn begin_section(&mut self, section: Section) {
        debug_assert!(section >= self.current, "sections are emitted in order");
        self.current = section;
    }

    pub fn section(&self, section: Section) -> &str {
        &self.sections[section.index()]
    }

    fn buf(&mut self) -> &mut String {
        &mut self.sections[self.current.index()]
    }

    /// Emit one indented line, optionally terminated by `;`.
    pub fn line(&mut self, text: &str, semicolon: bool) {
        let indent = INDENT.repeat(self.indent);
        let buf = self.buf();
        buf.push_str(&indent);
        buf.push_str(text);
        if semicolon {
            buf.push(';');
        }
        buf.push('\n');
    }

    /// Emit `text;` at the current indentation.
    pub fn stmt(&mut self, text: &str) {
        self.line(text, true);
    }

    pub fn line_break(&mut self) {
        self.buf().push('\n');
    }

    pub fn comment(&mut self, text: &str) {
        self.line(&format!("// {text}"), false);
    }

    /// Append a pre-formatted block (library text) verbatim.
    pub fn raw(&mut self, text: &str) {
        let buf = self.buf();
        buf.push_str(text);
        if !text.ends_with('\n') {
            buf.push('\n');
        }
    }

    pub fn scope_begin(&mut self) {
        self.line("{", false);
        self.indent += 1;
    }

    /// Close a scope; `semicolon` for struct and cbuffer bodies.
    pub fn scope_end(&mut self, semicolon: bool) {
        self.indent = self.indent.saturating_sub(1);
        self.line("}", semicolon);
    }

    /// Returns true the first time `path` is seen in this stage.
    pub fn mark_included(&mut self, path: &str) -> bool {
        self.included.insert(path.to_string())
    }

    /// Returns true the first time function `name` is seen in this stage.
    pub fn mark_function_defined(&mut self, name: &str) -> bool {
        self.defined_functions.insert(name.to_string())
    }

    /// Returns true the first time `node` is called inside `scope`.
    pub fn mark_called(&mut self, scope: &str, node: &str) -> bool {
        self.emitted_calls
            .insert((scope.to_string(), node.to_string()))
    }

    pub fn record_binding(&mut self, binding: ResourceBinding) {
        self.bindings.push(binding);
    }

    pub fn bindings(&self) -> &[ResourceBinding] {
        &self.bindings
    }

    /// Apply token substitutions to all text emitted so far.
    pub fn replace_tokens(&mut self, tokens: &[(&str, String)]) {
        for section in self.sections.iter_mut() {
            for (token, replacement) in tokens {
                if section.contains(token) {
                    *section = section.replace(token, replacement);
                }
            }
        }
    }

    pub fn source(&self) -> String {
        Section::ALL
            .iter()
            .map(|s| self.sections[s.index()].as_str())
            .collect()
    }
}

/// The variable blocks of one stage.
#[derive(Debug)]
pub struct StageBlocks {
    pub constants: VariableBlock,
    pub uniforms: Vec<VariableBlock>,
    pub inputs: Vec<VariableBlock>,
    pub outputs: Vec<VariableBlock>,
}

impl StageBlocks {
    fn new() -> Self {
        Self {
            constants: VariableBlock::new("Constants", BlockKind::Constant),
            uniforms: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
        }
    }

    fn find_mut<'a>(list: &'a mut [VariableBlock], name: &str) -> Option<&'a mut VariableBlock> {
        list.iter_mut().find(|b| b.name() == name)
    }

    pub fn uniform(&self, name: &str) -> Option<&VariableBlock> {
        self.uniforms.iter().find(|b| b.name() == name)
    }

    pub fn uniform_mut(&mut self, name: &str) -> Option<&mut VariableBlock> {
        Self::find_mut(&mut self.uniforms, name)
    }

    pub fn input(&self, name: &str) -> Option<&VariableBlock> {
        self.inputs.iter().find(|b| b.name() == name)
    }

    pub fn input_mut(&mut self, name: &str) -> Option<&mut VariableBlock> {
        Self::find_mut(&mut self.inputs, name)
    }

    pub fn output(&self, name: &str) -> Option<&VariableBlock> {
        self.outputs.iter().find(|b| b.name() == name)
    }

    pub fn output_mut(&mut self, name: &str) -> Option<&mut VariableBlock> {
        Self::find_mut(&mut self.outputs, name)
    }
}

/// One compiled program unit: blocks plus the text written for it.
#[derive(Debug)]
pub struct Stage {
    pub blocks: StageBlocks,
    pub writer: StageWriter,
}

impl Stage {
    pub fn new(kind: StageKind) -> Self {
        Self {
            blocks: StageBlocks::new(),
            writer: StageWriter::new(kind),
        }
    }

    pub fn kind(&self) -> StageKind {
        self.writer.kind()
    }

    pub fn name(&self) -> &'static str {
        self.kind().name()
    }

    pub fn entry_point(&self) -> &'static str {
        self.kind().entry_point()
    }

    pub fn add_uniform_block(&mut self, block: VariableBlock) {
        if self.blocks.uniform(block.name()).is_none() {
            self.blocks.uniforms.push(block);
        }
    }

    pub fn add_input_block(&mut self, block: VariableBlock) {
        if self.blocks.input(block.name()).is_none() {
            self.blocks.inputs.push(block);
        }
    }

    pub fn add_output_block(&mut self, block: VariableBlock) {
        if self.blocks.output(block.name()).is_none() {
            self.blocks.outputs.push(block);
        }
    }

    pub fn source(&self) -> String {
        self.writer.source()
    }
}
