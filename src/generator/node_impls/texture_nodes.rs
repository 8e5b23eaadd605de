//! File texture sampling.

use super::geometry_nodes::{add_texcoord, emit_texcoord_vertex, texcoord_expr};
use super::{NodeImplementation, emit_output_assignment, node_prefix};
use crate::generator::context::EmitContext;
use crate::generator::error::{GenError, GenResult};
use crate::generator::options::GenOptions;
use crate::generator::shader::Shader;
use crate::generator::shader_graph::{Classification, ShaderNode};
use crate::generator::stage::{PUBLIC_UNIFORMS, Stage, StageKind};
use crate::generator::syntax::SAMPLER_SUFFIX;
use crate::generator::types::TypeDesc;
use crate::generator::variables::Port;

/// Library fragment providing `mx_transform_uv`; the file name is chosen
/// by token substitution depending on the vertical-flip option.
pub const TRANSFORM_UV_INCLUDE: &str = "stdlib/genhlsl/lib/$fileTransformUv";

/// Samples the `file` texture at `texcoord` (texture set 0 when unconnected).
pub struct ImageNode;

fn file_variable(node: &ShaderNode) -> GenResult<String> {
    node.input("file").map(|p| p.variable.clone()).ok_or_else(|| {
        GenError::malformed(format!("image '{}' needs a 'file' input", node.name))
    })
}

fn uses_default_texcoord(node: &ShaderNode) -> bool {
    node.input("texcoord")
        .is_none_or(|p| p.connection.is_none() && !p.uniform)
}

fn swizzle(ty: &TypeDesc) -> GenResult<&'static str> {
    Ok(match ty {
        TypeDesc::Float => ".x",
        TypeDesc::Vector2 => ".xy",
        TypeDesc::Vector3 | TypeDesc::Color3 => ".xyz",
        TypeDesc::Vector4 | TypeDesc::Color4 => "",
        other => return Err(GenError::unsupported(other.name())),
    })
}

impl NodeImplementation for ImageNode {
    fn name(&self) -> &'static str {
        "image"
    }

    fn classification(&self) -> Classification {
        Classification::FILETEXTURE | Classification::SAMPLE2D
    }

    fn create_variables(
        &self,
        node: &ShaderNode,
        _options: &GenOptions,
        shader: &mut Shader,
    ) -> GenResult<()> {
        swizzle(&node.output()?.ty)?;
        let file = file_variable(node)?;
        let mut port = Port::new(file.clone(), TypeDesc::Filename).with_variable(file);
        port.uniform = true;
        port.value = node.input("file").and_then(|p| p.value.clone());
        shader.add_uniform(StageKind::Pixel, PUBLIC_UNIFORMS, port);

        if uses_default_texcoord(node) {
            add_texcoord(shader, 0);
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
            ctx.emit_library_include(TRANSFORM_UV_INCLUDE, &mut stage.writer)?;
        }
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        if stage.kind() == StageKind::Vertex {
            if uses_default_texcoord(node) {
                emit_texcoord_vertex(&mut stage.writer, 0);
            }
            return Ok(());
        }

        let file = file_variable(node)?;
        let prefix = node_prefix(node, ctx);
        let texcoord = if uses_default_texcoord(node) {
            texcoord_expr(0)
        } else {
            ctx.input_or(node, "texcoord", &texcoord_expr(0))?
        };
        let swizzle = swizzle(&node.output()?.ty)?;

        stage
            .writer
            .stmt(&format!("float2 {prefix}_uv = mx_transform_uv({texcoord})"));
        stage.writer.stmt(&format!(
            "float4 {prefix}_sample = {file}.Sample({file}{SAMPLER_SUFFIX}, {prefix}_uv)"
        ));
        emit_output_assignment(node, ctx, stage, &format!("{prefix}_sample{swizzle}"))
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::{generate, single_node_document};
    use crate::generator::options::GenOptions;
    use crate::generator::stage::StageKind;

    fn image_doc() -> String {
        single_node_document(
            r#"{ "name": "n", "category": "image", "type": "color3",
                 "inputs": [{ "name": "file", "type": "filename", "value": "albedo.png" }] }"#,
            "color3",
        )
    }

    #[test]
    fn image_publishes_texture_and_sampler() {
        let ps = generate(&image_doc(), GenOptions::default()).source(StageKind::Pixel);
        assert!(ps.contains("uniform Texture2D n_file;"));
        assert!(ps.contains("uniform SamplerState n_file_sampler;"));
        assert!(ps.contains("float2 n_uv = mx_transform_uv(input.texcoord_0);"));
        assert!(ps.contains("float4 n_sample = n_file.Sample(n_file_sampler, n_uv);"));
        assert!(ps.contains("float3 n_out = n_sample.xyz;"));
    }

    #[test]
    fn vertical_flip_selects_the_flipped_transform() {
        let plain = generate(&image_doc(), GenOptions::default()).source(StageKind::Pixel);
        assert!(plain.contains("return uv;"));
        assert!(!plain.contains("$fileTransformUv"));

        let options = GenOptions {
            file_texture_vertical_flip: true,
            ..GenOptions::default()
        };
        let flipped = generate(&image_doc(), options).source(StageKind::Pixel);
        assert!(flipped.contains("1.0 - uv.y"));
    }

    #[test]
    fn default_texcoord_is_written_by_the_vertex_stage() {
        let vs = generate(&image_doc(), GenOptions::default()).source(StageKind::Vertex);
        assert!(vs.contains("float2 i_texcoord_0 : TEXCOORD0;"));
        assert!(vs.contains("output.texcoord_0 = input.i_texcoord_0;"));
    }
}
