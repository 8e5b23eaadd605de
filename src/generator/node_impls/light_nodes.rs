//! Light shaders and the light-sampling helpers used by the surface light loop.
//!
//! Light shaders are not part of the material graph. They are bound per
//! request under a type id, add their members to the `LightData` block and
//! contribute one library function each. `sampleLightSource` dispatches on
//! `LightData.type` to those functions.

use super::NodeImplementation;
use crate::generator::context::EmitContext;
use crate::generator::error::{GenError, GenResult};
use crate::generator::options::GenOptions;
use crate::generator::shader::Shader;
use crate::generator::shader_graph::ShaderNode;
use crate::generator::stage::{LIGHT_DATA, Stage, StageKind};
use crate::generator::types::TypeDesc;
use crate::generator::variables::Port;

pub const NUM_ACTIVE_LIGHT_SOURCES: &str = "numActiveLightSources";
pub const SAMPLE_LIGHT_SOURCE: &str = "sampleLightSource";
pub const NUM_ACTIVE_LIGHT_SOURCES_UNIFORM: &str = "u_numActiveLightSources";

/// Selector member every `LightData` record starts with.
pub const LIGHT_TYPE_MEMBER: &str = "type";

pub(crate) fn add_light_member(shader: &mut Shader, name: &str, ty: TypeDesc) {
    shader.add_uniform(StageKind::Pixel, LIGHT_DATA, Port::new(name, ty).with_variable(name));
}

pub struct LightNode {
    name: &'static str,
    /// `LightData` members read by the library function, by type name.
    members: &'static [(&'static str, &'static str)],
}

impl LightNode {
    pub const POINT: LightNode = LightNode {
        name: "point_light",
        members: &[
            ("position", "vector3"),
            ("color", "color3"),
            ("intensity", "float"),
            ("decay_rate", "float"),
        ],
    };
    pub const DIRECTIONAL: LightNode = LightNode {
        name: "directional_light",
        members: &[
            ("direction", "vector3"),
            ("color", "color3"),
            ("intensity", "float"),
        ],
    };
    pub const SPOT: LightNode = LightNode {
        name: "spot_light",
        members: &[
            ("position", "vector3"),
            ("direction", "vector3"),
            ("color", "color3"),
            ("intensity", "float"),
            ("decay_rate", "float"),
            ("inner_angle", "float"),
            ("outer_angle", "float"),
        ],
    };
}

impl NodeImplementation for LightNode {
    fn name(&self) -> &'static str {
        self.name
    }

    fn create_variables(
        &self,
        _node: &ShaderNode,
        _options: &GenOptions,
        shader: &mut Shader,
    ) -> GenResult<()> {
        add_light_member(shader, LIGHT_TYPE_MEMBER, TypeDesc::Integer);
        for (member, type_name) in self.members {
            let ty = TypeDesc::from_name(type_name)
                .ok_or_else(|| GenError::unsupported(*type_name))?;
            add_light_member(shader, member, ty);
        }
        Ok(())
    }

    fn emit_function_definition(
        &self,
        _node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        if stage.kind() == StageKind::Pixel {
            let path = format!("lights/genhlsl/mx_{}.hlsl", self.name);
            ctx.emit_library_include(&path, &mut stage.writer)?;
        }
        Ok(())
    }

    /// Called from inside `sampleLightSource`, where `light`, `position` and
    /// `result` are the function parameters.
    fn emit_function_call(
        &self,
        _node: &ShaderNode,
        _ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        if stage.kind() == StageKind::Pixel {
            stage
                .writer
                .stmt(&format!("mx_{}(light, position, result)", self.name));
        }
        Ok(())
    }
}

/// `int numActiveLightSources()`, clamped to the compiled maximum.
pub struct NumActiveLightSourcesNode;

impl NodeImplementation for NumActiveLightSourcesNode {
    fn name(&self) -> &'static str {
        NUM_ACTIVE_LIGHT_SOURCES
    }

    fn emit_function_definition(
        &self,
        _node: &ShaderNode,
        _ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        if !stage.writer.mark_function_defined(NUM_ACTIVE_LIGHT_SOURCES) {
            return Ok(());
        }
        let w = &mut stage.writer;
        w.line(&format!("int {NUM_ACTIVE_LIGHT_SOURCES}()"), false);
        w.scope_begin();
        w.stmt(&format!(
            "return min({NUM_ACTIVE_LIGHT_SOURCES_UNIFORM}, MAX_LIGHT_SOURCES)"
        ));
        w.scope_end(false);
        w.line_break();
        Ok(())
    }

    fn emit_function_call(
        &self,
        _node: &ShaderNode,
        _ctx: &EmitContext<'_>,
        _stage: &mut Stage,
    ) -> GenResult<()> {
        Ok(())
    }
}

/// `void sampleLightSource(LightData, float3, out lightshader)`.
pub struct SampleLightSourceNode;

impl NodeImplementation for SampleLightSourceNode {
    fn name(&self) -> &'static str {
        SAMPLE_LIGHT_SOURCE
    }

    fn emit_function_definition(
        &self,
        _node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        if !stage.writer.mark_function_defined(SAMPLE_LIGHT_SOURCE) {
            return Ok(());
        }
        let zero = ctx.syntax.default_value(&TypeDesc::Vector3, false)?;
        stage.writer.line(
            &format!(
                "void {SAMPLE_LIGHT_SOURCE}({LIGHT_DATA} light, float3 position, out lightshader result)"
            ),
            false,
        );
        stage.writer.scope_begin();
        stage.writer.stmt(&format!("result.intensity = {zero}"));
        stage.writer.stmt(&format!("result.direction = {zero}"));
        for (i, (type_id, light)) in ctx.light_shaders.iter().enumerate() {
            let keyword = if i == 0 { "if" } else { "else if" };
            stage
                .writer
                .line(&format!("{keyword} (light.{LIGHT_TYPE_MEMBER} == {type_id})"), false);
            stage.writer.scope_begin();
            light.implementation.emit_function_call(light, ctx, stage)?;
            stage.writer.scope_end(false);
        }
        stage.writer.scope_end(false);
        stage.writer.line_break();
        Ok(())
    }

    fn emit_function_call(
        &self,
        _node: &ShaderNode,
        _ctx: &EmitContext<'_>,
        _stage: &mut Stage,
    ) -> GenResult<()> {
        Ok(())
    }
}
