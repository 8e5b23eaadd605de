//! HLSL (Shader Model 5.0) stage emitter.
//!
//! `generate` turns a validated [`ShaderGraph`] into vertex and pixel source
//! text. Each stage is assembled section by section (see [`Section`]), so the
//! order of declarations is fixed regardless of the order in which node
//! implementations register what they need.

use std::sync::Arc;

use tracing::debug;

use super::binding::{BindingKind, ResourceBinding, ResourceBindingStrategy};
use super::context::{EmitContext, GenContext};
use super::error::{GenError, GenResult};
use super::node_impls::geometry_nodes::{VIEW_POSITION, WORLD_MATRIX};
use super::node_impls::light_nodes::{
    LIGHT_TYPE_MEMBER, NUM_ACTIVE_LIGHT_SOURCES, NUM_ACTIVE_LIGHT_SOURCES_UNIFORM,
    NumActiveLightSourcesNode, SAMPLE_LIGHT_SOURCE, SampleLightSourceNode, add_light_member,
};
use super::options::{
    DIRECTIONAL_ALBEDO_TABLE, SPECULAR_ENVIRONMENT_FIS, SPECULAR_ENVIRONMENT_NONE,
    SPECULAR_ENVIRONMENT_PREFILTER, TRANSMISSION_OPACITY, TRANSMISSION_REFRACTION,
};
use super::shader::Shader;
use super::shader_graph::{Classification, ShaderGraph, ShaderNode};
use super::stage::{
    LIGHT_DATA, LIGHT_DATA_INSTANCE, PIXEL_OUTPUTS, PRIVATE_UNIFORMS, PUBLIC_UNIFORMS, Section,
    Stage, StageBlocks, StageKind, StageWriter, VERTEX_DATA, VERTEX_INPUTS,
};
use super::syntax::{CONSTANT_QUALIFIER, SAMPLER_SUFFIX, Syntax, UNIFORM_QUALIFIER};
use super::types::{TypeDesc, Value};
use super::utils::{fmt_float, to_float4};
use super::variables::{Port, VariableBlock};
use crate::dsl::{GraphDesc, NodeDesc};

pub const T_FILE_TRANSFORM_UV: &str = "$fileTransformUv";
pub const T_ALPHA_THRESHOLD: &str = "$alphaThreshold";

const MX_MATH: &str = "stdlib/genhlsl/lib/mx_math.hlsl";
const SHADOW: &str = "pbrlib/genhlsl/lib/mx_shadow.hlsl";
const SHADOW_PLATFORM: &str = "pbrlib/genhlsl/lib/mx_shadow_platform.hlsl";
const GENERATE_ALBEDO_TABLE: &str = "pbrlib/genhlsl/lib/mx_generate_albedo_table.hlsl";
const GENERATE_PREFILTER_ENV: &str = "pbrlib/genhlsl/lib/mx_generate_prefilter_env.hlsl";

const VIEW_PROJECTION_MATRIX: &str = "u_viewProjectionMatrix";
const SHADOW_MAP: &str = "u_shadowMap";
const SHADOW_MATRIX: &str = "u_shadowMatrix";
const ALBEDO_TABLE: &str = "u_albedoTable";
const ALBEDO_TABLE_SIZE: &str = "u_albedoTableSize";
const ENV_MATRIX: &str = "u_envMatrix";
const ENV_RADIANCE: &str = "u_envRadiance";
const ENV_IRRADIANCE: &str = "u_envIrradiance";
const ENV_LIGHT_INTENSITY: &str = "u_envLightIntensity";
const ENV_RADIANCE_MIPS: &str = "u_envRadianceMips";
const ENV_RADIANCE_SAMPLES: &str = "u_envRadianceSamples";
const ENV_PREFILTER_MIP: &str = "u_envPrefilterMip";
const REFRACTION_TWO_SIDED: &str = "u_refractionTwoSided";

const MAX_LIGHT_SOURCES_SUFFIX: &str = "[MAX_LIGHT_SOURCES]";

fn specular_environment_include(method: i32) -> GenResult<&'static str> {
    match method {
        SPECULAR_ENVIRONMENT_FIS => Ok("pbrlib/genhlsl/lib/mx_environment_fis.hlsl"),
        SPECULAR_ENVIRONMENT_PREFILTER => Ok("pbrlib/genhlsl/lib/mx_environment_prefilter.hlsl"),
        SPECULAR_ENVIRONMENT_NONE => Ok("pbrlib/genhlsl/lib/mx_environment_none.hlsl"),
        other => Err(GenError::InvalidOption(format!(
            "invalid hardware specular environment method specified: '{other}'"
        ))),
    }
}

fn transmission_include(method: i32) -> GenResult<&'static str> {
    match method {
        TRANSMISSION_REFRACTION => Ok("pbrlib/genhlsl/lib/mx_transmission_refract.hlsl"),
        TRANSMISSION_OPACITY => Ok("pbrlib/genhlsl/lib/mx_transmission_opacity.hlsl"),
        other => Err(GenError::InvalidOption(format!(
            "invalid transmission render specified: '{other}'"
        ))),
    }
}

fn uniform(shader: &mut Shader, kind: StageKind, name: &str, ty: TypeDesc, value: Option<Value>) {
    let mut port = Port::new(name, ty).with_variable(name);
    port.value = value;
    port.uniform = true;
    shader.add_uniform(kind, PRIVATE_UNIFORMS, port);
}

/// Immutable generator; all per-request state lives in [`GenContext`] and
/// the returned [`Shader`].
pub struct HlslShaderGenerator {
    syntax: Syntax,
    num_active_light_sources: ShaderNode,
    sample_light_source: ShaderNode,
}

impl Default for HlslShaderGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl HlslShaderGenerator {
    pub fn new() -> Self {
        Self {
            syntax: Syntax::hlsl(),
            num_active_light_sources: ShaderNode::internal(
                NUM_ACTIVE_LIGHT_SOURCES,
                Arc::new(NumActiveLightSourcesNode),
            ),
            sample_light_source: ShaderNode::internal(
                SAMPLE_LIGHT_SOURCE,
                Arc::new(SampleLightSourceNode),
            ),
        }
    }

    pub fn syntax(&self) -> &Syntax {
        &self.syntax
    }

    pub fn build_graph(&self, desc: &GraphDesc) -> GenResult<ShaderGraph> {
        ShaderGraph::build(desc, &self.syntax)
    }

    /// Build a light shader from its description and bind it under `type_id`.
    pub fn bind_light_shader(
        &self,
        ctx: &mut GenContext,
        type_id: u32,
        desc: &NodeDesc,
    ) -> GenResult<()> {
        let node = ShaderNode::from_desc(desc, &self.syntax, None)?;
        ctx.bind_light_shader(type_id, node)
    }

    pub fn generate(
        &self,
        name: &str,
        graph: &ShaderGraph,
        ctx: &mut GenContext,
    ) -> GenResult<Shader> {
        ctx.options.validate()?;
        debug!(
            shader = name,
            graph = graph.name(),
            nodes = graph.nodes().len(),
            explicit_bindings = ctx.binding.is_some(),
            "generating hlsl"
        );

        let syntax = graph.extend_syntax(&self.syntax)?;
        let GenContext {
            options,
            resolver,
            binding,
            light_shaders,
        } = ctx;
        if let Some(strategy) = binding.as_deref_mut() {
            strategy.initialize();
        }

        let transform_uv = if options.file_texture_vertical_flip {
            "mx_transform_uv_vflip.hlsl"
        } else {
            "mx_transform_uv.hlsl"
        };
        let tokens = vec![
            (T_FILE_TRANSFORM_UV, transform_uv.to_string()),
            (T_ALPHA_THRESHOLD, fmt_float(options.hw_alpha_threshold)?),
        ];
        let emit = EmitContext {
            syntax: &syntax,
            graph,
            options,
            resolver: &**resolver,
            light_shaders,
            tokens: &tokens,
            closure: None,
        };

        let mut shader = create_shader(name, &emit)?;

        let vertex = shader.stage_mut(StageKind::Vertex);
        emit_vertex_stage(&emit, binding, vertex)?;
        vertex.writer.replace_tokens(&tokens);

        let pixel = shader.stage_mut(StageKind::Pixel);
        self.emit_pixel_stage(&emit, binding, pixel)?;
        pixel.writer.replace_tokens(&tokens);

        debug!(
            shader = name,
            vertex_bytes = shader.source(StageKind::Vertex).len(),
            pixel_bytes = shader.source(StageKind::Pixel).len(),
            bindings = shader.binding_table().len(),
            "generated hlsl"
        );
        Ok(shader)
    }

    fn emit_pixel_stage(
        &self,
        emit: &EmitContext<'_>,
        binding: &mut Option<Box<dyn ResourceBindingStrategy>>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        let syntax = emit.syntax;
        let options = emit.options;
        let lighting = emit.requires_lighting();
        let max_lights = options.hw_max_active_light_sources;

        stage.writer.begin_section(Section::Directives);
        emit_directives(binding, &mut stage.writer);

        stage.writer.begin_section(Section::TypeDefinitions);
        for definition in syntax.type_definitions() {
            stage.writer.line(definition, false);
        }
        stage.writer.line_break();

        stage.writer.begin_section(Section::Constants);
        emit_constants(syntax, &stage.blocks.constants, &mut stage.writer)?;

        stage.writer.begin_section(Section::Uniforms);
        emit_uniforms(syntax, binding, &stage.blocks, &mut stage.writer)?;

        stage.writer.begin_section(Section::Inputs);
        if let Some(block) = stage.blocks.input(VERTEX_DATA) {
            emit_struct(syntax, "VSOutput", Some("float4 position : SV_Position"), block, &mut stage.writer)?;
        }

        stage.writer.begin_section(Section::Outputs);
        if let Some(block) = stage.blocks.output(PIXEL_OUTPUTS) {
            emit_struct(syntax, "PSOutput", None, block, &mut stage.writer)?;
        }

        stage.writer.begin_section(Section::Libraries);
        emit.emit_library_include(MX_MATH, &mut stage.writer)?;
        if lighting || options.hw_write_albedo_table || options.hw_write_env_prefilter {
            stage.writer.line(
                &format!(
                    "#define DIRECTIONAL_ALBEDO_METHOD {}",
                    options.hw_directional_albedo_method
                ),
                false,
            );
        }
        stage.writer.line(
            &format!(
                "#define AIRY_FRESNEL_ITERATIONS {}",
                options.hw_airy_fresnel_iterations
            ),
            false,
        );
        stage.writer.line_break();

        if lighting {
            if max_lights > 0 {
                stage
                    .writer
                    .line(&format!("#define MAX_LIGHT_SOURCES {max_lights}"), false);
                stage.writer.line_break();
            }
            let env = specular_environment_include(options.hw_specular_environment_method)?;
            emit.emit_library_include(env, &mut stage.writer)?;
            let transmission = transmission_include(options.hw_transmission_render_method)?;
            emit.emit_library_include(transmission, &mut stage.writer)?;
            if max_lights > 0 {
                emit_light_data(syntax, binding, &stage.blocks, &mut stage.writer)?;
            }
        }

        if (lighting && options.hw_shadow_map) || options.hw_write_depth_moments {
            emit.emit_library_include(SHADOW, &mut stage.writer)?;
            emit.emit_library_include(SHADOW_PLATFORM, &mut stage.writer)?;
        }
        if options.hw_write_albedo_table {
            emit.emit_library_include(GENERATE_ALBEDO_TABLE, &mut stage.writer)?;
        }
        if options.hw_write_env_prefilter {
            emit.emit_library_include(GENERATE_PREFILTER_ENV, &mut stage.writer)?;
        }

        stage.writer.begin_section(Section::FunctionDefinitions);
        if lighting && max_lights > 0 {
            for light in emit.light_shaders.values() {
                emit.emit_function_definition(light, stage)?;
            }
            emit.emit_function_definition(&self.num_active_light_sources, stage)?;
            emit.emit_function_definition(&self.sample_light_source, stage)?;
        }
        for node in emit.graph.nodes() {
            emit.emit_function_definition(node, stage)?;
        }

        stage.writer.begin_section(Section::MainFunction);
        stage.writer.line(
            &format!("PSOutput {}(VSOutput input)", stage.entry_point()),
            false,
        );
        stage.writer.scope_begin();
        stage.writer.stmt("PSOutput output = (PSOutput)0");
        emit_pixel_body(emit, stage)?;
        stage.writer.stmt("return output");
        stage.writer.scope_end(false);
        Ok(())
    }
}

/// Build the shader and let every participating node declare its variables.
fn create_shader(name: &str, emit: &EmitContext<'_>) -> GenResult<Shader> {
    let options = emit.options;
    let lighting = emit.requires_lighting();
    let mut shader = Shader::new(name);

    shader.add_vertex_input("i_position", TypeDesc::Vector3);
    uniform(&mut shader, StageKind::Vertex, WORLD_MATRIX, TypeDesc::Matrix44, None);
    uniform(&mut shader, StageKind::Vertex, VIEW_PROJECTION_MATRIX, TypeDesc::Matrix44, None);
    if let Some(outputs) = shader
        .stage_mut(StageKind::Pixel)
        .blocks
        .output_mut(PIXEL_OUTPUTS)
    {
        outputs.add(Port::new("color", TypeDesc::Vector4).with_semantic("SV_Target0"));
    }

    let pixel = StageKind::Pixel;
    if lighting {
        let method = options.hw_specular_environment_method;
        if method == SPECULAR_ENVIRONMENT_FIS || method == SPECULAR_ENVIRONMENT_PREFILTER {
            uniform(&mut shader, pixel, ENV_MATRIX, TypeDesc::Matrix44, None);
            uniform(&mut shader, pixel, ENV_RADIANCE, TypeDesc::Filename, None);
            uniform(&mut shader, pixel, ENV_IRRADIANCE, TypeDesc::Filename, None);
            uniform(&mut shader, pixel, ENV_LIGHT_INTENSITY, TypeDesc::Float, Some(Value::Float(1.0)));
            uniform(&mut shader, pixel, ENV_RADIANCE_MIPS, TypeDesc::Integer, Some(Value::Integer(1)));
        }
        if method == SPECULAR_ENVIRONMENT_FIS {
            uniform(&mut shader, pixel, ENV_RADIANCE_SAMPLES, TypeDesc::Integer, Some(Value::Integer(16)));
        }
        if options.hw_transmission_render_method == TRANSMISSION_REFRACTION {
            uniform(&mut shader, pixel, REFRACTION_TWO_SIDED, TypeDesc::Boolean, Some(Value::Boolean(false)));
        }
        uniform(&mut shader, pixel, VIEW_POSITION, TypeDesc::Vector3, None);
        if options.hw_max_active_light_sources > 0 {
            uniform(&mut shader, pixel, NUM_ACTIVE_LIGHT_SOURCES_UNIFORM, TypeDesc::Integer, Some(Value::Integer(0)));
            add_light_member(&mut shader, LIGHT_TYPE_MEMBER, TypeDesc::Integer);
        }
    }
    if (lighting && options.hw_shadow_map) || options.hw_write_depth_moments {
        uniform(&mut shader, pixel, SHADOW_MAP, TypeDesc::Filename, None);
        uniform(&mut shader, pixel, SHADOW_MATRIX, TypeDesc::Matrix44, None);
    }
    if options.hw_write_albedo_table || options.hw_directional_albedo_method == DIRECTIONAL_ALBEDO_TABLE {
        uniform(&mut shader, pixel, ALBEDO_TABLE, TypeDesc::Filename, None);
        uniform(&mut shader, pixel, ALBEDO_TABLE_SIZE, TypeDesc::Integer, Some(Value::Integer(64)));
    }
    if options.hw_write_env_prefilter {
        uniform(&mut shader, pixel, ENV_RADIANCE, TypeDesc::Filename, None);
        uniform(&mut shader, pixel, ENV_PREFILTER_MIP, TypeDesc::Integer, Some(Value::Integer(0)));
        uniform(&mut shader, pixel, ENV_MATRIX, TypeDesc::Matrix44, None);
    }

    for node in emit.graph.nodes() {
        for input in node.inputs.iter().filter(|p| p.uniform && p.connection.is_none()) {
            let mut port = input.clone();
            port.name = input.variable.clone();
            shader.add_uniform(pixel, PUBLIC_UNIFORMS, port);
        }
        node.implementation.create_variables(node, options, &mut shader)?;
    }
    if lighting && options.hw_max_active_light_sources > 0 {
        for light in emit.light_shaders.values() {
            light.implementation.create_variables(light, options, &mut shader)?;
        }
    }
    Ok(shader)
}

fn emit_vertex_stage(
    emit: &EmitContext<'_>,
    binding: &mut Option<Box<dyn ResourceBindingStrategy>>,
    stage: &mut Stage,
) -> GenResult<()> {
    let syntax = emit.syntax;

    stage.writer.begin_section(Section::Directives);
    emit_directives(binding, &mut stage.writer);

    stage.writer.begin_section(Section::Constants);
    emit_constants(syntax, &stage.blocks.constants, &mut stage.writer)?;

    stage.writer.begin_section(Section::Uniforms);
    emit_uniforms(syntax, binding, &stage.blocks, &mut stage.writer)?;

    stage.writer.begin_section(Section::Inputs);
    if let Some(block) = stage.blocks.input(VERTEX_INPUTS) {
        emit_struct(syntax, "VSInput", None, block, &mut stage.writer)?;
    }

    stage.writer.begin_section(Section::Outputs);
    if let Some(block) = stage.blocks.output(VERTEX_DATA) {
        emit_struct(syntax, "VSOutput", Some("float4 position : SV_Position"), block, &mut stage.writer)?;
    }

    stage.writer.begin_section(Section::Libraries);
    emit.emit_library_include(MX_MATH, &mut stage.writer)?;

    stage.writer.begin_section(Section::FunctionDefinitions);
    for node in emit.graph.nodes() {
        emit.emit_function_definition(node, stage)?;
    }

    stage.writer.begin_section(Section::MainFunction);
    stage.writer.line(
        &format!("VSOutput {}(VSInput input)", stage.entry_point()),
        false,
    );
    stage.writer.scope_begin();
    stage.writer.stmt("VSOutput output = (VSOutput)0");
    stage.writer.stmt(&format!(
        "float4 hPositionWorld = mul(float4(input.i_position, 1.0), {WORLD_MATRIX})"
    ));
    stage.writer.stmt(&format!(
        "output.position = mul(hPositionWorld, {VIEW_PROJECTION_MATRIX})"
    ));
    for node in emit.graph.nodes() {
        emit.emit_function_call(node, stage)?;
    }
    stage.writer.stmt("return output");
    stage.writer.scope_end(false);
    Ok(())
}

fn emit_pixel_body(emit: &EmitContext<'_>, stage: &mut Stage) -> GenResult<()> {
    let graph = emit.graph;
    let options = emit.options;

    if graph.has_classification(Classification::CLOSURE)
        && !graph.has_classification(Classification::SHADER)
    {
        // A bare closure has no color of its own.
        stage.writer.stmt("output.color = float4(0.0, 0.0, 0.0, 1.0)");
        return Ok(());
    }

    if options.hw_write_depth_moments {
        stage
            .writer
            .stmt("float2 depthMoments = mx_compute_depth_moments(input.position)");
        stage
            .writer
            .stmt("output.color = float4(depthMoments, 0.0, 1.0)");
        return Ok(());
    }
    if options.hw_write_albedo_table {
        stage
            .writer
            .stmt("float3 dirAlbedo = mx_generate_dir_albedo_table(input.position)");
        stage.writer.stmt("output.color = float4(dirAlbedo, 1.0)");
        return Ok(());
    }
    if options.hw_write_env_prefilter {
        stage
            .writer
            .stmt("float4 prefilterEnv = mx_generate_prefilter_env(input.position)");
        stage.writer.stmt("output.color = prefilterEnv");
        return Ok(());
    }

    if graph.has_classification(Classification::SHADER | Classification::SURFACE) {
        for node in graph.nodes() {
            if node.has_classification(Classification::TEXTURE) {
                emit.emit_function_call(node, stage)?;
            }
        }
        for socket in graph.outputs() {
            let Some(c) = socket.connection() else {
                continue;
            };
            let upstream = graph.node(c.node);
            if upstream.parent == Some(graph.id())
                && upstream
                    .classification
                    .intersects(Classification::CLOSURE | Classification::SHADER)
            {
                emit.emit_function_call(upstream, stage)?;
            }
        }
    } else {
        for node in graph.nodes() {
            emit.emit_function_call(node, stage)?;
        }
    }

    emit_final_output(emit, stage)
}

/// Write `output.color` from the first output socket.
fn emit_final_output(emit: &EmitContext<'_>, stage: &mut Stage) -> GenResult<()> {
    let graph = emit.graph;
    let options = emit.options;
    let syntax = emit.syntax;
    let socket = graph
        .outputs()
        .first()
        .ok_or_else(|| GenError::malformed(format!("graph '{}' has no outputs", graph.name())))?;
    let ty = &socket.port.ty;

    let expr = match socket.connection() {
        Some(c) => {
            let upstream = graph.node(c.node);
            upstream
                .output_port(&c.port)
                .ok_or_else(|| {
                    GenError::malformed(format!(
                        "node '{}' has no output '{}'",
                        upstream.name, c.port
                    ))
                })?
                .variable
                .clone()
        }
        None => match &socket.port.value {
            Some(v) => syntax.value(ty, v, false)?,
            None => syntax.default_value(ty, false)?,
        },
    };

    if matches!(ty, TypeDesc::SurfaceShader | TypeDesc::Material) {
        let var = if socket.connection().is_some() {
            expr
        } else {
            stage
                .writer
                .stmt(&format!("{} outShader = {expr}", syntax.type_name(ty)?));
            "outShader".to_string()
        };
        let color = if options.hw_srgb_encode_output {
            format!("mx_srgb_encode({var}.color)")
        } else {
            format!("{var}.color")
        };
        if options.hw_transparency {
            stage.writer.stmt(&format!(
                "float outAlpha = saturate(1.0 - dot({var}.transparency, float3(0.3333, 0.3334, 0.3333)))"
            ));
            stage
                .writer
                .stmt(&format!("output.color = float4({color}, outAlpha)"));
            stage
                .writer
                .line(&format!("if (outAlpha < {T_ALPHA_THRESHOLD})"), false);
            stage.writer.scope_begin();
            stage.writer.stmt("discard");
            stage.writer.scope_end(false);
        } else {
            stage
                .writer
                .stmt(&format!("output.color = float4({color}, 1.0)"));
        }
        return Ok(());
    }

    let expr = if options.hw_srgb_encode_output && ty.is_float3() {
        format!("mx_srgb_encode({expr})")
    } else {
        expr
    };
    stage
        .writer
        .stmt(&format!("output.color = {}", to_float4(ty, &expr)?));
    Ok(())
}

fn emit_directives(binding: &Option<Box<dyn ResourceBindingStrategy>>, writer: &mut StageWriter) {
    writer.line("#pragma pack_matrix(row_major)", false);
    if let Some(strategy) = binding.as_deref() {
        strategy.emit_directives(writer);
    }
    writer.line_break();
}

fn emit_constants(syntax: &Syntax, block: &VariableBlock, writer: &mut StageWriter) -> GenResult<()> {
    if block.is_empty() {
        return Ok(());
    }
    for port in block.ports() {
        for decl in syntax.declare_variable(port, CONSTANT_QUALIFIER, true)? {
            writer.stmt(&decl);
        }
    }
    writer.line_break();
    Ok(())
}

fn emit_members(syntax: &Syntax, block: &VariableBlock, writer: &mut StageWriter) -> GenResult<()> {
    for port in block.ports() {
        for decl in syntax.declare_variable(port, "", false)? {
            writer.stmt(&decl);
        }
    }
    Ok(())
}

fn emit_struct(
    syntax: &Syntax,
    name: &str,
    leading: Option<&str>,
    block: &VariableBlock,
    writer: &mut StageWriter,
) -> GenResult<()> {
    writer.line(&format!("struct {name}"), false);
    writer.scope_begin();
    if let Some(member) = leading {
        writer.stmt(member);
    }
    emit_members(syntax, block, writer)?;
    writer.scope_end(true);
    writer.line_break();
    Ok(())
}

fn emit_uniforms(
    syntax: &Syntax,
    binding: &mut Option<Box<dyn ResourceBindingStrategy>>,
    blocks: &StageBlocks,
    writer: &mut StageWriter,
) -> GenResult<()> {
    for block in &blocks.uniforms {
        // Light data is bound as a structured block next to the light includes.
        if block.is_empty() || block.name() == LIGHT_DATA {
            continue;
        }
        match binding.as_deref_mut() {
            Some(strategy) => strategy.emit_resource_bindings(syntax, block, writer)?,
            None => emit_implicit_uniforms(syntax, block, writer)?,
        }
    }
    Ok(())
}

/// Uniform declarations without register assignments. Bindings are recorded
/// with no slot so the caller still sees every resource.
fn emit_implicit_uniforms(
    syntax: &Syntax,
    block: &VariableBlock,
    writer: &mut StageWriter,
) -> GenResult<()> {
    let stage = writer.kind().name();
    writer.comment(&format!("Uniform block: {}", block.name()));
    for port in block.ports() {
        for decl in syntax.declare_variable(port, UNIFORM_QUALIFIER, true)? {
            writer.stmt(&decl);
        }
    }
    writer.line_break();

    if block.ports().iter().any(|p| !p.is_texture()) {
        writer.record_binding(ResourceBinding::new(
            stage,
            block.name(),
            format!("{}_{stage}", block.name()),
            BindingKind::ConstantBuffer,
            None,
        ));
    }
    for port in block.ports().iter().filter(|p| p.is_texture()) {
        writer.record_binding(ResourceBinding::new(
            stage,
            block.name(),
            port.variable.clone(),
            BindingKind::Texture,
            None,
        ));
        writer.record_binding(ResourceBinding::new(
            stage,
            block.name(),
            format!("{}{SAMPLER_SUFFIX}", port.variable),
            BindingKind::Sampler,
            None,
        ));
    }
    Ok(())
}

fn emit_light_data(
    syntax: &Syntax,
    binding: &mut Option<Box<dyn ResourceBindingStrategy>>,
    blocks: &StageBlocks,
    writer: &mut StageWriter,
) -> GenResult<()> {
    let Some(block) = blocks.uniform(LIGHT_DATA) else {
        return Ok(());
    };
    if block.is_empty() {
        return Ok(());
    }
    let instance = block.instance().unwrap_or(LIGHT_DATA_INSTANCE);
    match binding.as_deref_mut() {
        Some(strategy) => strategy.emit_structured_resource_bindings(
            syntax,
            block,
            writer,
            instance,
            MAX_LIGHT_SOURCES_SUFFIX,
        )?,
        None => {
            let stage = writer.kind().name();
            emit_struct(syntax, LIGHT_DATA, None, block, writer)?;
            writer.stmt(&format!(
                "{UNIFORM_QUALIFIER} {LIGHT_DATA} {instance}{MAX_LIGHT_SOURCES_SUFFIX}"
            ));
            writer.record_binding(ResourceBinding::new(
                stage,
                LIGHT_DATA,
                format!("{LIGHT_DATA}_{stage}"),
                BindingKind::ConstantBuffer,
                None,
            ));
        }
    }
    writer.line_break();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::MaterialDocument;
    use crate::generator::binding::HlslResourceBinding;
    use crate::generator::options::GenOptions;
    use crate::generator::node_impls::test_support::{generate, single_node_document};
    use pretty_assertions::assert_eq;

    fn literal_doc(ty: &str, value: &str) -> String {
        format!(
            r#"{{ "version": "1.0", "graphs": [{{
                "name": "M",
                "nodes": [],
                "outputs": [{{ "name": "out", "type": "{ty}", "value": {value} }}]
            }}]}}"#
        )
    }

    const SURFACE: &str = r#"{ "version": "1.0", "graphs": [{
        "name": "M",
        "nodes": [
            { "name": "tex", "category": "image", "type": "color3",
              "inputs": [{ "name": "file", "type": "filename", "value": "a.png" }] },
            { "name": "diffuse", "category": "diffuse_bsdf", "type": "BSDF" },
            { "name": "surf", "category": "surface", "type": "surfaceshader",
              "inputs": [{ "name": "opacity", "type": "float", "value": 0.5, "uniform": true }] }
        ],
        "connections": [
            { "from": { "node": "tex" }, "to": { "node": "diffuse", "port": "color" } },
            { "from": { "node": "diffuse" }, "to": { "node": "surf", "port": "bsdf" } }
        ],
        "outputs": [{ "name": "out", "type": "surfaceshader", "node": "surf" }]
    }]}"#;

    fn generate_with(
        json: &str,
        options: GenOptions,
        strategy: Option<HlslResourceBinding>,
    ) -> GenResult<Shader> {
        let doc: MaterialDocument = serde_json::from_str(json).unwrap();
        let generator = HlslShaderGenerator::new();
        let graph = generator.build_graph(&doc.graphs[0])?;
        let mut ctx = GenContext::new(options);
        if let Some(s) = strategy {
            ctx = ctx.with_binding_strategy(s);
        }
        generator.generate("M", &graph, &mut ctx)
    }

    #[test]
    fn float_literal_output_is_widened_without_discard() {
        let ps = generate(&literal_doc("float", "0.5"), GenOptions::default())
            .source(StageKind::Pixel);
        assert!(ps.contains("    output.color = float4(0.5, 0.5, 0.5, 1.0);\n"));
        assert!(!ps.contains("discard"));
    }

    #[test]
    fn closure_only_graph_is_opaque_black() {
        let doc = single_node_document(
            r#"{ "name": "n", "category": "diffuse_bsdf", "type": "BSDF" }"#,
            "BSDF",
        );
        for options in [
            GenOptions::default(),
            GenOptions {
                hw_transparency: true,
                hw_write_depth_moments: true,
                ..GenOptions::default()
            },
        ] {
            let ps = generate(&doc, options).source(StageKind::Pixel);
            assert!(ps.contains("output.color = float4(0.0, 0.0, 0.0, 1.0);"));
            assert!(!ps.contains("diffuse_bsdf_reflection("));
        }
    }

    #[test]
    fn transparency_toggles_discard() {
        let opaque = generate(SURFACE, GenOptions::default()).source(StageKind::Pixel);
        assert!(!opaque.contains("discard"));
        assert!(opaque.contains("output.color = float4(surf_out.color, 1.0);"));

        let options = GenOptions {
            hw_transparency: true,
            hw_alpha_threshold: 0.25,
            ..GenOptions::default()
        };
        let ps = generate(SURFACE, options).source(StageKind::Pixel);
        assert!(ps.contains(
            "float outAlpha = saturate(1.0 - dot(surf_out.transparency, float3(0.3333, 0.3334, 0.3333)));"
        ));
        assert!(ps.contains("    if (outAlpha < 0.25)\n    {\n        discard;\n    }\n"));
        assert!(!ps.contains("$alphaThreshold"));
    }

    #[test]
    fn invalid_specular_environment_method_fails() {
        let options = GenOptions {
            hw_specular_environment_method: 7,
            ..GenOptions::default()
        };
        let err = generate_with(SURFACE, options, None).unwrap_err();
        assert!(matches!(err, GenError::InvalidOption(_)));
    }

    #[test]
    fn pixel_sections_follow_the_fixed_order() {
        let ps = generate(SURFACE, GenOptions::default()).source(StageKind::Pixel);
        let order = [
            "#pragma pack_matrix(row_major)",
            "struct BSDF { float3 response; float3 throughput; };",
            "uniform float4x4 u_envMatrix",
            "uniform float surf_opacity = 0.5;",
            "struct VSOutput",
            "struct PSOutput",
            "float3 mx_srgb_encode(",
            "#define DIRECTIONAL_ALBEDO_METHOD 0",
            "#define AIRY_FRESNEL_ITERATIONS 2",
            "#define MAX_LIGHT_SOURCES 3",
            "float3 mx_environment_radiance(",
            "struct LightData",
            "int numActiveLightSources()",
            "void sampleLightSource(",
            "BSDF mx_diffuse_bsdf_reflection(",
            "PSOutput PS_Main(VSOutput input)",
            "float3 tex_out = tex_sample.xyz;",
            "surfaceshader surf_out",
            "return output;",
        ];
        let mut last = 0;
        for needle in order {
            let at = ps[last..]
                .find(needle)
                .unwrap_or_else(|| panic!("'{needle}' missing or out of order"));
            last += at + needle.len();
        }
    }

    #[test]
    fn vertex_stage_layout() {
        let vs = generate(SURFACE, GenOptions::default()).source(StageKind::Vertex);
        assert!(vs.starts_with("#pragma pack_matrix(row_major)\n"));
        assert!(vs.contains(
            "struct VSInput\n{\n    float3 i_position : POSITION;\n    float2 i_texcoord_0 : TEXCOORD0;\n    float3 i_normal : NORMAL;\n};\n"
        ));
        assert!(vs.contains("struct VSOutput\n{\n    float4 position : SV_Position;\n"));
        assert!(vs.contains("VSOutput VS_Main(VSInput input)\n{\n    VSOutput output = (VSOutput)0;\n"));
        assert!(vs.contains("output.position = mul(hPositionWorld, u_viewProjectionMatrix);"));
        assert!(vs.trim_end().ends_with("return output;\n}"));
    }

    #[test]
    fn explicit_bindings_are_sequential_and_recorded() {
        let shader = generate_with(
            SURFACE,
            GenOptions::default(),
            Some(HlslResourceBinding::new(0, 0)),
        )
        .unwrap();
        let vs = shader.source(StageKind::Vertex);
        let ps = shader.source(StageKind::Pixel);
        assert!(vs.contains("cbuffer PrivateUniforms_vertex : register(b0)"));
        assert!(ps.contains("cbuffer PrivateUniforms_pixel : register(b1)"));
        assert!(ps.contains("Texture2D u_envRadiance : register(t2);"));
        assert!(ps.contains("SamplerState u_envRadiance_sampler : register(s0);"));
        assert!(ps.contains("LightData u_lightData[MAX_LIGHT_SOURCES];"));
        assert!(!ps.contains("uniform float"));

        let table = shader.binding_table();
        assert!(table.iter().all(|b| b.slot.is_some()));
        let cbuffers: Vec<u32> = table
            .iter()
            .filter(|b| b.kind == BindingKind::ConstantBuffer)
            .filter_map(|b| b.slot)
            .collect();
        assert_eq!(cbuffers.first(), Some(&0));
        assert!(cbuffers.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn implicit_bindings_have_no_slots() {
        let shader = generate_with(SURFACE, GenOptions::default(), None).unwrap();
        let table = shader.binding_table();
        assert!(!table.is_empty());
        assert!(table.iter().all(|b| b.slot.is_none()));
        assert!(table.iter().any(|b| b.name == "tex_file_sampler" && b.kind == BindingKind::Sampler));
        let json = shader.binding_table_json().unwrap();
        assert!(json.contains("\"slot\": null"));
    }

    #[test]
    fn reused_context_gives_identical_output() {
        let doc: MaterialDocument = serde_json::from_str(SURFACE).unwrap();
        let generator = HlslShaderGenerator::new();
        let graph = generator.build_graph(&doc.graphs[0]).unwrap();
        let mut ctx = GenContext::new(GenOptions::default())
            .with_binding_strategy(HlslResourceBinding::new(2, 1));
        let a = generator.generate("M", &graph, &mut ctx).unwrap();
        let b = generator.generate("M", &graph, &mut ctx).unwrap();
        assert_eq!(a.source(StageKind::Vertex), b.source(StageKind::Vertex));
        assert_eq!(a.source(StageKind::Pixel), b.source(StageKind::Pixel));
        assert_eq!(a.binding_table(), b.binding_table());
        assert!(a.source(StageKind::Vertex).contains("register(b2)"));
    }

    #[test]
    fn bake_modes_replace_the_body_in_priority_order() {
        let options = GenOptions {
            hw_write_depth_moments: true,
            hw_write_albedo_table: true,
            ..GenOptions::default()
        };
        let ps = generate(SURFACE, options).source(StageKind::Pixel);
        assert!(ps.contains("float2 depthMoments = mx_compute_depth_moments(input.position);"));
        assert!(!ps.contains("dirAlbedo = "));
        assert!(!ps.contains("surfaceshader surf_out"));

        let options = GenOptions {
            hw_write_env_prefilter: true,
            ..GenOptions::default()
        };
        let ps = generate(SURFACE, options).source(StageKind::Pixel);
        assert!(ps.contains("float4 prefilterEnv = mx_generate_prefilter_env(input.position);"));
        assert!(ps.contains("uniform int u_envPrefilterMip = 0;"));
    }

    #[test]
    fn srgb_wraps_three_component_results() {
        let options = GenOptions {
            hw_srgb_encode_output: true,
            ..GenOptions::default()
        };
        let ps = generate(&literal_doc("color3", "[0.5, 0.25, 1.0]"), options.clone())
            .source(StageKind::Pixel);
        assert!(ps.contains(
            "output.color = float4(mx_srgb_encode(float3(0.5, 0.25, 1.0)), 1.0);"
        ));
        let ps = generate(&literal_doc("float", "0.5"), options).source(StageKind::Pixel);
        assert!(ps.contains("output.color = float4(0.5, 0.5, 0.5, 1.0);"));
    }

    #[test]
    fn unconnected_surface_socket_uses_a_temporary() {
        let ps = generate(
            &literal_doc("surfaceshader", "null"),
            GenOptions::default(),
        )
        .source(StageKind::Pixel);
        assert!(ps.contains(
            "surfaceshader outShader = {float3(0.0, 0.0, 0.0), float3(0.0, 0.0, 0.0)};"
        ));
        assert!(ps.contains("output.color = float4(outShader.color, 1.0);"));
    }

    #[test]
    fn missing_library_fragment_is_reported() {
        use crate::generator::library::MemoryLibrary;

        let doc: MaterialDocument = serde_json::from_str(SURFACE).unwrap();
        let generator = HlslShaderGenerator::new();
        let graph = generator.build_graph(&doc.graphs[0]).unwrap();
        let mut ctx = GenContext::new(GenOptions::default())
            .with_resolver(Arc::new(MemoryLibrary::new()));
        let err = generator.generate("M", &graph, &mut ctx).unwrap_err();
        assert!(matches!(err, GenError::MissingLibraryFragment { .. }));
    }

    #[test]
    fn generator_is_shareable_across_threads() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HlslShaderGenerator>();
    }
}
