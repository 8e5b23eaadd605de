//! Surface shader and material roots.

use super::geometry_nodes::{
    NORMAL_WORLD, POSITION_WORLD, VIEW_POSITION, add_normal, add_position, emit_normal_vertex,
    emit_position_vertex, private_uniform,
};
use super::{NodeImplementation, emit_output_assignment};
use crate::generator::context::{ClosureContext, EmitContext};
use crate::generator::error::GenResult;
use crate::generator::options::GenOptions;
use crate::generator::shader::Shader;
use crate::generator::shader_graph::ShaderNode;
use crate::generator::stage::{LIGHT_DATA_INSTANCE, Stage, StageKind};
use crate::generator::types::TypeDesc;

/// Lit surface: a `bsdf` input evaluated per light and for the environment,
/// an optional `edf` emission and a scalar `opacity`.
pub struct SurfaceNode;

impl NodeImplementation for SurfaceNode {
    fn name(&self) -> &'static str {
        "surface"
    }

    fn create_variables(
        &self,
        _node: &ShaderNode,
        _options: &GenOptions,
        shader: &mut Shader,
    ) -> GenResult<()> {
        add_position(shader);
        add_normal(shader);
        private_uniform(shader, StageKind::Pixel, VIEW_POSITION, TypeDesc::Vector3);
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        if stage.kind() == StageKind::Vertex {
            emit_position_vertex(&mut stage.writer);
            emit_normal_vertex(&mut stage.writer);
            return Ok(());
        }

        let out = node.output()?.variable.clone();
        let neutral = ctx.syntax.default_value(&TypeDesc::SurfaceShader, false)?;
        let opacity = ctx.input_or(node, "opacity", "1.0")?;
        let bsdf = ctx.upstream(node, "bsdf");
        let edf = ctx.upstream(node, "edf");

        stage.writer.stmt(&format!("surfaceshader {out} = {neutral}"));
        stage.writer.scope_begin();
        stage
            .writer
            .stmt(&format!("float3 N = normalize(input.{NORMAL_WORLD})"));
        stage.writer.stmt(&format!(
            "float3 V = normalize({VIEW_POSITION} - input.{POSITION_WORLD})"
        ));
        stage.writer.stmt(&format!("float3 P = input.{POSITION_WORLD}"));
        stage.writer.stmt(&format!("float surfaceOpacity = {opacity}"));

        if ctx.requires_lighting() {
            stage.writer.line_break();
            stage.writer.stmt("float occlusion = 1.0");
            if ctx.options.hw_shadow_map {
                let w = &mut stage.writer;
                w.stmt("float4 shadowCoord = mul(float4(P, 1.0), u_shadowMatrix)");
                w.stmt("shadowCoord.xyz /= shadowCoord.w");
                w.stmt("shadowCoord.xy = float2(shadowCoord.x * 0.5 + 0.5, 0.5 - shadowCoord.y * 0.5)");
                w.stmt("float2 shadowMoments = mx_sample_shadow_map(shadowCoord.xy)");
                w.stmt("occlusion = mx_variance_shadow_occlusion(shadowMoments, shadowCoord.z)");
            }

            if ctx.options.hw_max_active_light_sources > 0 {
                stage.writer.line_break();
                stage.writer.comment("Light loop");
                stage.writer.stmt("int numLights = numActiveLightSources()");
                stage.writer.stmt("lightshader lightShader");
                stage.writer.line(
                    "for (int activeLightIndex = 0; activeLightIndex < numLights; ++activeLightIndex)",
                    false,
                );
                stage.writer.scope_begin();
                stage.writer.stmt(&format!(
                    "sampleLightSource({LIGHT_DATA_INSTANCE}[activeLightIndex], P, lightShader)"
                ));
                stage.writer.stmt("float3 L = lightShader.direction");
                stage
                    .writer
                    .stmt("float lightOcclusion = activeLightIndex == 0 ? occlusion : 1.0");
                if let Some(bsdf) = bsdf {
                    ctx.with_closure(ClosureContext::Reflection)
                        .emit_function_call(bsdf, stage)?;
                    let var = &bsdf.output()?.variable;
                    stage
                        .writer
                        .stmt(&format!("{out}.color += lightShader.intensity * {var}.response"));
                }
                stage.writer.scope_end(false);
            }

            if let Some(bsdf) = bsdf {
                stage.writer.line_break();
                stage.writer.comment("Indirect lighting");
                stage.writer.scope_begin();
                ctx.with_closure(ClosureContext::Indirect)
                    .emit_function_call(bsdf, stage)?;
                let var = &bsdf.output()?.variable;
                stage
                    .writer
                    .stmt(&format!("{out}.color += occlusion * {var}.response"));
                stage.writer.scope_end(false);
            }
        }

        if let Some(edf) = edf {
            stage.writer.line_break();
            stage.writer.comment("Emission");
            stage.writer.scope_begin();
            ctx.with_closure(ClosureContext::Emission)
                .emit_function_call(edf, stage)?;
            let var = &edf.output()?.variable;
            stage.writer.stmt(&format!("{out}.color += {var}"));
            stage.writer.scope_end(false);
        }

        stage.writer.line_break();
        stage.writer.stmt(&format!("{out}.color *= surfaceOpacity"));
        stage.writer.stmt(&format!(
            "{out}.transparency = lerp(float3(1.0, 1.0, 1.0), {out}.transparency, surfaceOpacity)"
        ));
        stage.writer.scope_end(false);
        Ok(())
    }
}

/// `material name_out = surface;`
pub struct SurfaceMaterialNode;

impl NodeImplementation for SurfaceMaterialNode {
    fn name(&self) -> &'static str {
        "surfacematerial"
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        if stage.kind() != StageKind::Pixel {
            return Ok(());
        }
        if let Some(surface) = ctx.upstream(node, "surfaceshader") {
            ctx.emit_function_call(surface, stage)?;
        }
        let neutral = ctx.syntax.default_value(&TypeDesc::Material, false)?;
        let value = ctx.input_or(node, "surfaceshader", &neutral)?;
        emit_output_assignment(node, ctx, stage, &value)
    }
}
