//! Resource-binding strategies.
//!
//! A strategy assigns explicit `register(...)` slots to uniform blocks,
//! textures and samplers. Generation without a strategy leaves slot
//! assignment to the downstream compiler.

use serde::Serialize;
use tracing::debug;

use super::error::GenResult;
use super::stage::StageWriter;
use super::syntax::{SAMPLER_SUFFIX, Syntax};
use super::variables::VariableBlock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingKind {
    ConstantBuffer,
    Texture,
    Sampler,
}

/// One entry of the binding table handed to the caller.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ResourceBinding {
    pub stage: String,
    pub block: String,
    pub name: String,
    pub kind: BindingKind,
    /// `None` when no strategy was active (implicit binding).
    pub slot: Option<u32>,
}

impl ResourceBinding {
    pub fn new(
        stage: &str,
        block: &str,
        name: impl Into<String>,
        kind: BindingKind,
        slot: Option<u32>,
    ) -> Self {
        Self {
            stage: stage.to_string(),
            block: block.to_string(),
            name: name.into(),
            kind,
            slot,
        }
    }
}

pub trait ResourceBindingStrategy: Send {
    /// Reset both counters to their configured start values.
    fn initialize(&mut self);

    fn allocate_uniform_slot(&mut self) -> u32;

    fn allocate_sampler_slot(&mut self) -> u32;

    fn emit_directives(&self, _writer: &mut StageWriter) {}

    /// Bind a uniform block: one constant buffer for the value members,
    /// then a texture/sampler pair for every texture member.
    fn emit_resource_bindings(
        &mut self,
        syntax: &Syntax,
        block: &VariableBlock,
        writer: &mut StageWriter,
    ) -> GenResult<()>;

    /// Bind a block as a struct type with an array instance, e.g. per-light data.
    fn emit_structured_resource_bindings(
        &mut self,
        syntax: &Syntax,
        block: &VariableBlock,
        writer: &mut StageWriter,
        instance: &str,
        array_suffix: &str,
    ) -> GenResult<()>;
}

/// Sequential `b`/`t` and `s` register allocation for Shader Model 5.0.
///
/// Textures share the uniform counter with constant buffers; samplers have
/// their own.
#[derive(Clone, Debug)]
pub struct HlslResourceBinding {
    init_uniform_slot: u32,
    init_sampler_slot: u32,
    uniform_slot: u32,
    sampler_slot: u32,
}

impl HlslResourceBinding {
    pub fn new(uniform_start: u32, sampler_start: u32) -> Self {
        Self {
            init_uniform_slot: uniform_start,
            init_sampler_slot: sampler_start,
            uniform_slot: uniform_start,
            sampler_slot: sampler_start,
        }
    }
}

impl Default for HlslResourceBinding {
    fn default() -> Self {
        Self::new(0, 0)
    }
}

fn emit_struct_members(
    syntax: &Syntax,
    block: &VariableBlock,
    writer: &mut StageWriter,
    include_textures: bool,
) -> GenResult<()> {
    for port in block.ports() {
        if port.is_texture() && !include_textures {
            continue;
        }
        for decl in syntax.declare_variable(port, "", false)? {
            writer.stmt(&decl);
        }
    }
    Ok(())
}

impl ResourceBindingStrategy for HlslResourceBinding {
    fn initialize(&mut self) {
        self.uniform_slot = self.init_uniform_slot;
        self.sampler_slot = self.init_sampler_slot;
    }

    fn allocate_uniform_slot(&mut self) -> u32 {
        let slot = self.uniform_slot;
        self.uniform_slot += 1;
        slot
    }

    fn allocate_sampler_slot(&mut self) -> u32 {
        let slot = self.sampler_slot;
        self.sampler_slot += 1;
        slot
    }

    fn emit_resource_bindings(
        &mut self,
        syntax: &Syntax,
        block: &VariableBlock,
        writer: &mut StageWriter,
    ) -> GenResult<()> {
        let stage = writer.kind().name();

        if block.ports().iter().any(|p| !p.is_texture()) {
            let slot = self.allocate_uniform_slot();
            let cbuffer = format!("{}_{}", block.name(), stage);
            debug!(block = block.name(), stage, slot, "bind constant buffer");
            writer.line(&format!("cbuffer {cbuffer} : register(b{slot})"), false);
            writer.scope_begin();
            emit_struct_members(syntax, block, writer, false)?;
            writer.scope_end(true);
            writer.record_binding(ResourceBinding::new(
                stage,
                block.name(),
                cbuffer,
                BindingKind::ConstantBuffer,
                Some(slot),
            ));
        }

        for port in block.ports().iter().filter(|p| p.is_texture()) {
            let texture_slot = self.allocate_uniform_slot();
            let sampler_slot = self.allocate_sampler_slot();
            let sampler = format!("{}{SAMPLER_SUFFIX}", port.variable);
            debug!(texture = %port.variable, texture_slot, sampler_slot, "bind texture");
            writer.stmt(&format!("Texture2D {} : register(t{texture_slot})", port.variable));
            writer.stmt(&format!("SamplerState {sampler} : register(s{sampler_slot})"));
            writer.record_binding(ResourceBinding::new(
                stage,
                block.name(),
                port.variable.clone(),
                BindingKind::Texture,
                Some(texture_slot),
            ));
            writer.record_binding(ResourceBinding::new(
                stage,
                block.name(),
                sampler,
                BindingKind::Sampler,
                Some(sampler_slot),
            ));
        }

        writer.line_break();
        Ok(())
    }

    fn emit_structured_resource_bindings(
        &mut self,
        syntax: &Syntax,
        block: &VariableBlock,
        writer: &mut StageWriter,
        instance: &str,
        array_suffix: &str,
    ) -> GenResult<()> {
        let stage = writer.kind().name();

        writer.line(&format!("struct {}", block.name()), false);
        writer.scope_begin();
        emit_struct_members(syntax, block, writer, true)?;
        writer.scope_end(true);
        writer.line_break();

        let slot = self.allocate_uniform_slot();
        let cbuffer = format!("{}_{}", block.name(), stage);
        debug!(block = block.name(), stage, slot, "bind structured buffer");
        writer.line(&format!("cbuffer {cbuffer} : register(b{slot})"), false);
        writer.scope_begin();
        writer.stmt(&format!("{} {instance}{array_suffix}", block.name()));
        writer.scope_end(true);
        writer.record_binding(ResourceBinding::new(
            stage,
            block.name(),
            cbuffer,
            BindingKind::ConstantBuffer,
            Some(slot),
        ));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::stage::{Stage, StageKind};
    use crate::generator::types::TypeDesc;
    use crate::generator::variables::{BlockKind, Port};

    fn block(name: &str, ports: &[(&str, TypeDesc)]) -> VariableBlock {
        let mut b = VariableBlock::new(name, BlockKind::Uniform);
        for (n, ty) in ports {
            b.add(Port::new(*n, ty.clone()));
        }
        b
    }

    #[test]
    fn initialize_resets_both_counters() {
        let mut binding = HlslResourceBinding::new(2, 1);
        binding.initialize();
        let a = binding.allocate_uniform_slot();
        let s = binding.allocate_sampler_slot();
        binding.allocate_uniform_slot();
        binding.allocate_sampler_slot();
        binding.initialize();
        assert_eq!(binding.allocate_uniform_slot(), a);
        assert_eq!(binding.allocate_sampler_slot(), s);
        assert_eq!(a, 2);
        assert_eq!(s, 1);
    }

    #[test]
    fn consecutive_blocks_get_consecutive_slots() {
        let syntax = Syntax::hlsl();
        let mut stage = Stage::new(StageKind::Pixel);
        let mut binding = HlslResourceBinding::new(0, 0);
        let first = block(
            "A",
            &[("a0", TypeDesc::Float), ("a1", TypeDesc::Color3), ("a2", TypeDesc::Vector2)],
        );
        let second = block("B", &[("b0", TypeDesc::Float), ("b1", TypeDesc::Integer)]);

        binding
            .emit_resource_bindings(&syntax, &first, &mut stage.writer)
            .unwrap();
        binding
            .emit_resource_bindings(&syntax, &second, &mut stage.writer)
            .unwrap();

        let slots: Vec<Option<u32>> = stage.writer.bindings().iter().map(|b| b.slot).collect();
        assert_eq!(slots, vec![Some(0), Some(1)]);
        let src = stage.source();
        assert!(src.contains("cbuffer A_pixel : register(b0)"));
        assert!(src.contains("cbuffer B_pixel : register(b1)"));
    }

    #[test]
    fn textures_take_uniform_and_sampler_slots() {
        let syntax = Syntax::hlsl();
        let mut stage = Stage::new(StageKind::Pixel);
        let mut binding = HlslResourceBinding::new(0, 0);
        let b = block(
            "PublicUniforms",
            &[("tint", TypeDesc::Color3), ("albedo", TypeDesc::Filename)],
        );
        binding
            .emit_resource_bindings(&syntax, &b, &mut stage.writer)
            .unwrap();

        let src = stage.source();
        pretty_assertions::assert_eq!(
            src,
            "cbuffer PublicUniforms_pixel : register(b0)\n{\n    float3 tint;\n};\n\
             Texture2D albedo : register(t1);\n\
             SamplerState albedo_sampler : register(s0);\n\n"
        );
        let kinds: Vec<BindingKind> = stage.writer.bindings().iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            vec![BindingKind::ConstantBuffer, BindingKind::Texture, BindingKind::Sampler]
        );
    }

    #[test]
    fn texture_only_block_has_no_cbuffer() {
        let syntax = Syntax::hlsl();
        let mut stage = Stage::new(StageKind::Pixel);
        let mut binding = HlslResourceBinding::new(0, 0);
        let b = block("PublicUniforms", &[("albedo", TypeDesc::Filename)]);
        binding
            .emit_resource_bindings(&syntax, &b, &mut stage.writer)
            .unwrap();
        assert!(!stage.source().contains("cbuffer"));
        assert!(stage.source().contains("Texture2D albedo : register(t0);"));
    }

    #[test]
    fn structured_binding_declares_struct_and_array_instance() {
        let syntax = Syntax::hlsl();
        let mut stage = Stage::new(StageKind::Pixel);
        let mut binding = HlslResourceBinding::new(3, 0);
        let b = block(
            "LightData",
            &[("type", TypeDesc::Integer), ("position", TypeDesc::Vector3)],
        );
        binding
            .emit_structured_resource_bindings(
                &syntax,
                &b,
                &mut stage.writer,
                "u_lightData",
                "[MAX_LIGHT_SOURCES]",
            )
            .unwrap();
        pretty_assertions::assert_eq!(
            stage.source(),
            "struct LightData\n{\n    int type;\n    float3 position;\n};\n\n\
             cbuffer LightData_pixel : register(b3)\n{\n    LightData u_lightData[MAX_LIGHT_SOURCES];\n};\n"
        );
    }
}
