//! Geometric inputs: world-space position, normal and tangent, texture
//! coordinates, view direction and time.
//!
//! Per-vertex values travel through the `VertexData` block: the vertex stage
//! assigns `output.<name>` once per stage and the pixel stage reads
//! `input.<name>`.

use super::{NodeImplementation, emit_output_assignment};
use crate::generator::context::EmitContext;
use crate::generator::error::{GenError, GenResult};
use crate::generator::options::GenOptions;
use crate::generator::shader::Shader;
use crate::generator::shader_graph::ShaderNode;
use crate::generator::stage::{PRIVATE_UNIFORMS, Stage, StageKind, StageWriter};
use crate::generator::types::{TypeDesc, Value};
use crate::generator::variables::Port;

pub(crate) const POSITION_WORLD: &str = "positionWorld";
pub(crate) const NORMAL_WORLD: &str = "normalWorld";
pub(crate) const TANGENT_WORLD: &str = "tangentWorld";

pub(crate) const WORLD_MATRIX: &str = "u_worldMatrix";
pub(crate) const WORLD_INVERSE_TRANSPOSE_MATRIX: &str = "u_worldInverseTransposeMatrix";
pub(crate) const VIEW_POSITION: &str = "u_viewPosition";
pub(crate) const TIME: &str = "u_time";

/// Scope key used to dedupe vertex-data assignments across nodes.
const VERTEX_DATA_SCOPE: &str = "vertexdata";

pub(crate) fn private_uniform(shader: &mut Shader, kind: StageKind, name: &str, ty: TypeDesc) {
    shader.add_uniform(kind, PRIVATE_UNIFORMS, Port::new(name, ty).with_variable(name));
}

fn assign_vertex_data(writer: &mut StageWriter, name: &str, expr: &str) {
    if writer.mark_called(VERTEX_DATA_SCOPE, name) {
        writer.stmt(&format!("output.{name} = {expr}"));
    }
}

pub(crate) fn add_position(shader: &mut Shader) {
    shader.add_vertex_data(POSITION_WORLD, TypeDesc::Vector3);
}

pub(crate) fn emit_position_vertex(writer: &mut StageWriter) {
    assign_vertex_data(writer, POSITION_WORLD, "hPositionWorld.xyz");
}

pub(crate) fn add_normal(shader: &mut Shader) {
    shader.add_vertex_input("i_normal", TypeDesc::Vector3);
    shader.add_vertex_data(NORMAL_WORLD, TypeDesc::Vector3);
    private_uniform(
        shader,
        StageKind::Vertex,
        WORLD_INVERSE_TRANSPOSE_MATRIX,
        TypeDesc::Matrix44,
    );
}

pub(crate) fn emit_normal_vertex(writer: &mut StageWriter) {
    assign_vertex_data(
        writer,
        NORMAL_WORLD,
        &format!("normalize(mul(float4(input.i_normal, 0.0), {WORLD_INVERSE_TRANSPOSE_MATRIX}).xyz)"),
    );
}

fn texcoord_names(index: u32) -> (String, String) {
    (format!("i_texcoord_{index}"), format!("texcoord_{index}"))
}

pub(crate) fn add_texcoord(shader: &mut Shader, index: u32) {
    let (input, data) = texcoord_names(index);
    shader.add_vertex_input(&input, TypeDesc::Vector2);
    shader.add_vertex_data(&data, TypeDesc::Vector2);
}

pub(crate) fn emit_texcoord_vertex(writer: &mut StageWriter, index: u32) {
    let (input, data) = texcoord_names(index);
    assign_vertex_data(writer, &data, &format!("input.{input}"));
}

/// Pixel-stage expression for a texture coordinate set.
pub(crate) fn texcoord_expr(index: u32) -> String {
    format!("input.{}", texcoord_names(index).1)
}

pub struct PositionNode;

impl NodeImplementation for PositionNode {
    fn name(&self) -> &'static str {
        "position"
    }

    fn create_variables(&self, _: &ShaderNode, _: &GenOptions, shader: &mut Shader) -> GenResult<()> {
        add_position(shader);
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        match stage.kind() {
            StageKind::Vertex => emit_position_vertex(&mut stage.writer),
            StageKind::Pixel => {
                emit_output_assignment(node, ctx, stage, &format!("input.{POSITION_WORLD}"))?
            }
        }
        Ok(())
    }
}

pub struct NormalNode;

impl NodeImplementation for NormalNode {
    fn name(&self) -> &'static str {
        "normal"
    }

    fn create_variables(&self, _: &ShaderNode, _: &GenOptions, shader: &mut Shader) -> GenResult<()> {
        add_normal(shader);
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        match stage.kind() {
            StageKind::Vertex => emit_normal_vertex(&mut stage.writer),
            StageKind::Pixel => emit_output_assignment(
                node,
                ctx,
                stage,
                &format!("normalize(input.{NORMAL_WORLD})"),
            )?,
        }
        Ok(())
    }
}

pub struct TangentNode;

impl NodeImplementation for TangentNode {
    fn name(&self) -> &'static str {
        "tangent"
    }

    fn create_variables(&self, _: &ShaderNode, _: &GenOptions, shader: &mut Shader) -> GenResult<()> {
        shader.add_vertex_input("i_tangent", TypeDesc::Vector3);
        shader.add_vertex_data(TANGENT_WORLD, TypeDesc::Vector3);
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        match stage.kind() {
            StageKind::Vertex => assign_vertex_data(
                &mut stage.writer,
                TANGENT_WORLD,
                &format!("normalize(mul(float4(input.i_tangent, 0.0), {WORLD_MATRIX}).xyz)"),
            ),
            StageKind::Pixel => emit_output_assignment(
                node,
                ctx,
                stage,
                &format!("normalize(input.{TANGENT_WORLD})"),
            )?,
        }
        Ok(())
    }
}

/// Texture coordinates of the set selected by the literal `index` input.
pub struct TexcoordNode;

fn texcoord_index(node: &ShaderNode) -> GenResult<u32> {
    let Some(port) = node.input("index") else {
        return Ok(0);
    };
    if port.connection.is_some() {
        return Err(GenError::malformed(format!(
            "texcoord '{}' index must be a literal",
            node.name
        )));
    }
    match &port.value {
        Some(Value::Integer(i)) => u32::try_from(*i).map_err(|_| {
            GenError::malformed(format!("texcoord '{}' has negative index {i}", node.name))
        }),
        _ => Ok(0),
    }
}

impl NodeImplementation for TexcoordNode {
    fn name(&self) -> &'static str {
        "texcoord"
    }

    fn create_variables(&self, node: &ShaderNode, _: &GenOptions, shader: &mut Shader) -> GenResult<()> {
        add_texcoord(shader, texcoord_index(node)?);
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        let index = texcoord_index(node)?;
        match stage.kind() {
            StageKind::Vertex => emit_texcoord_vertex(&mut stage.writer, index),
            StageKind::Pixel => {
                let uv = texcoord_expr(index);
                let expr = match &node.output()?.ty {
                    TypeDesc::Vector2 => uv,
                    TypeDesc::Vector3 => format!("float3({uv}, 0.0)"),
                    other => return Err(GenError::unsupported(other.name())),
                };
                emit_output_assignment(node, ctx, stage, &expr)?;
            }
        }
        Ok(())
    }
}

/// Normalized direction from the viewer to the shaded point.
pub struct ViewDirectionNode;

impl NodeImplementation for ViewDirectionNode {
    fn name(&self) -> &'static str {
        "viewdirection"
    }

    fn create_variables(&self, _: &ShaderNode, _: &GenOptions, shader: &mut Shader) -> GenResult<()> {
        add_position(shader);
        private_uniform(shader, StageKind::Pixel, VIEW_POSITION, TypeDesc::Vector3);
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        match stage.kind() {
            StageKind::Vertex => emit_position_vertex(&mut stage.writer),
            StageKind::Pixel => emit_output_assignment(
                node,
                ctx,
                stage,
                &format!("normalize(input.{POSITION_WORLD} - {VIEW_POSITION})"),
            )?,
        }
        Ok(())
    }
}

pub struct TimeNode;

impl NodeImplementation for TimeNode {
    fn name(&self) -> &'static str {
        "time"
    }

    fn create_variables(&self, _: &ShaderNode, _: &GenOptions, shader: &mut Shader) -> GenResult<()> {
        private_uniform(shader, StageKind::Pixel, TIME, TypeDesc::Float);
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        if stage.kind() == StageKind::Pixel {
            emit_output_assignment(node, ctx, stage, TIME)?;
        }
        Ok(())
    }
}
