//! Generation result: vertex and pixel stages plus their binding table.

use super::binding::ResourceBinding;
use super::stage::{
    LIGHT_DATA, LIGHT_DATA_INSTANCE, PIXEL_OUTPUTS, PRIVATE_UNIFORMS, PUBLIC_UNIFORMS, Stage,
    StageKind, VERTEX_DATA, VERTEX_INPUTS,
};
use super::types::TypeDesc;
use super::variables::{BlockKind, Port, VariableBlock};

#[derive(Debug)]
pub struct Shader {
    name: String,
    vertex: Stage,
    pixel: Stage,
}

impl Shader {
    /// A shader with the standard blocks of both stages in place.
    pub fn new(name: impl Into<String>) -> Self {
        let mut vertex = Stage::new(StageKind::Vertex);
        vertex.add_input_block(VariableBlock::new(VERTEX_INPUTS, BlockKind::StageInput));
        vertex.add_output_block(VariableBlock::new(VERTEX_DATA, BlockKind::StageOutput));
        vertex.add_uniform_block(VariableBlock::new(PRIVATE_UNIFORMS, BlockKind::Uniform));
        vertex.add_uniform_block(VariableBlock::new(PUBLIC_UNIFORMS, BlockKind::Uniform));

        let mut pixel = Stage::new(StageKind::Pixel);
        pixel.add_input_block(VariableBlock::new(VERTEX_DATA, BlockKind::StageInput));
        pixel.add_output_block(VariableBlock::new(PIXEL_OUTPUTS, BlockKind::StageOutput));
        pixel.add_uniform_block(VariableBlock::new(PRIVATE_UNIFORMS, BlockKind::Uniform));
        pixel.add_uniform_block(VariableBlock::new(PUBLIC_UNIFORMS, BlockKind::Uniform));
        pixel.add_uniform_block(
            VariableBlock::new(LIGHT_DATA, BlockKind::Uniform).with_instance(LIGHT_DATA_INSTANCE),
        );

        Self {
            name: name.into(),
            vertex,
            pixel,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self, kind: StageKind) -> &Stage {
        match kind {
            StageKind::Vertex => &self.vertex,
            StageKind::Pixel => &self.pixel,
        }
    }

    pub fn stage_mut(&mut self, kind: StageKind) -> &mut Stage {
        match kind {
            StageKind::Vertex => &mut self.vertex,
            StageKind::Pixel => &mut self.pixel,
        }
    }

    pub fn source(&self, kind: StageKind) -> String {
        self.stage(kind).source()
    }

    pub fn entry_point(&self, kind: StageKind) -> &'static str {
        kind.entry_point()
    }

    /// Every binding emitted by either stage, vertex first.
    pub fn binding_table(&self) -> Vec<ResourceBinding> {
        self.vertex
            .writer
            .bindings()
            .iter()
            .chain(self.pixel.writer.bindings())
            .cloned()
            .collect()
    }

    pub fn binding_table_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.binding_table())
    }

    /// Add a uniform to a named uniform block of one stage.
    pub fn add_uniform(&mut self, kind: StageKind, block: &str, port: Port) {
        if let Some(b) = self.stage_mut(kind).blocks.uniform_mut(block) {
            b.add(port);
        }
    }

    pub fn add_constant(&mut self, kind: StageKind, port: Port) {
        self.stage_mut(kind).blocks.constants.add(port);
    }

    /// Add a per-vertex attribute; common attributes get their fixed semantic.
    pub fn add_vertex_input(&mut self, name: &str, ty: TypeDesc) {
        let semantic = match name {
            "i_position" => "POSITION".to_string(),
            "i_normal" => "NORMAL".to_string(),
            "i_tangent" => "TANGENT".to_string(),
            other => match other.strip_prefix("i_texcoord_") {
                Some(index) => format!("TEXCOORD{index}"),
                None => other.to_uppercase(),
            },
        };
        if let Some(b) = self.vertex.blocks.input_mut(VERTEX_INPUTS) {
            b.add(Port::new(name, ty).with_semantic(semantic));
        }
    }

    /// Add an interpolated value written by the vertex stage and read by the pixel stage.
    pub fn add_vertex_data(&mut self, name: &str, ty: TypeDesc) {
        let Some(out) = self.vertex.blocks.output_mut(VERTEX_DATA) else {
            return;
        };
        if out.contains(name) {
            return;
        }
        let semantic = format!("TEXCOORD{}", out.len());
        let port = Port::new(name, ty).with_semantic(semantic);
        out.add(port.clone());
        if let Some(inp) = self.pixel.blocks.input_mut(VERTEX_DATA) {
            inp.add(port);
        }
    }
}
