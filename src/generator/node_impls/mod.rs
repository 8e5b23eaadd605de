//! Node implementations and category dispatch.
//!
//! Each implementation owns three hooks: declaring the variables it needs
//! (uniforms, vertex data, constants), emitting function definitions or
//! library includes, and emitting its call in a stage's main function.

pub mod closure_nodes;
pub mod geometry_nodes;
pub mod input_nodes;
pub mod light_nodes;
pub mod math_nodes;
pub mod surface_nodes;
pub mod texture_nodes;

use std::sync::Arc;

use super::context::EmitContext;
use super::error::{GenError, GenResult};
use super::options::GenOptions;
use super::shader::Shader;
use super::shader_graph::{Classification, ShaderNode};
use super::stage::Stage;

pub trait NodeImplementation: Send + Sync {
    fn name(&self) -> &'static str;

    /// Flags added on top of the classification implied by the output type.
    fn classification(&self) -> Classification {
        Classification::empty()
    }

    fn create_variables(
        &self,
        _node: &ShaderNode,
        _options: &GenOptions,
        _shader: &mut Shader,
    ) -> GenResult<()> {
        Ok(())
    }

    fn emit_function_definition(
        &self,
        _node: &ShaderNode,
        _ctx: &EmitContext<'_>,
        _stage: &mut Stage,
    ) -> GenResult<()> {
        Ok(())
    }

    fn emit_function_call(
        &self,
        node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()>;
}

/// Resolve the implementation for a node category.
pub fn implementation_for(category: &str) -> GenResult<Arc<dyn NodeImplementation>> {
    let implementation: Arc<dyn NodeImplementation> = match category {
        // Inputs
        "constant" => Arc::new(input_nodes::ConstantNode),

        // Math
        "add" => Arc::new(math_nodes::BinaryNode::ADD),
        "subtract" => Arc::new(math_nodes::BinaryNode::SUBTRACT),
        "multiply" => Arc::new(math_nodes::BinaryNode::MULTIPLY),
        "divide" => Arc::new(math_nodes::BinaryNode::DIVIDE),
        "mix" => Arc::new(math_nodes::MixNode),
        "clamp" => Arc::new(math_nodes::ClampNode),
        "ramp" => Arc::new(math_nodes::RampNode),

        // Geometry
        "position" => Arc::new(geometry_nodes::PositionNode),
        "normal" => Arc::new(geometry_nodes::NormalNode),
        "tangent" => Arc::new(geometry_nodes::TangentNode),
        "texcoord" => Arc::new(geometry_nodes::TexcoordNode),
        "viewdirection" => Arc::new(geometry_nodes::ViewDirectionNode),
        "time" => Arc::new(geometry_nodes::TimeNode),

        // Textures
        "image" => Arc::new(texture_nodes::ImageNode),

        // Closures
        "diffuse_bsdf" => Arc::new(closure_nodes::BsdfNode::DIFFUSE),
        "specular_bsdf" => Arc::new(closure_nodes::BsdfNode::SPECULAR),
        "mix_bsdf" => Arc::new(closure_nodes::MixBsdfNode),
        "uniform_edf" => Arc::new(closure_nodes::UniformEdfNode),

        // Shaders
        "surface" => Arc::new(surface_nodes::SurfaceNode),
        "surfacematerial" => Arc::new(surface_nodes::SurfaceMaterialNode),

        // Lights
        "point_light" => Arc::new(light_nodes::LightNode::POINT),
        "directional_light" => Arc::new(light_nodes::LightNode::DIRECTIONAL),
        "spot_light" => Arc::new(light_nodes::LightNode::SPOT),

        other => {
            return Err(GenError::malformed(format!(
                "no implementation for node category '{other}'"
            )));
        }
    };
    Ok(implementation)
}

/// Emit `T name_out = expr;` for the node's primary output.
pub(crate) fn emit_output_assignment(
    node: &ShaderNode,
    ctx: &EmitContext<'_>,
    stage: &mut Stage,
    expr: &str,
) -> GenResult<()> {
    let out = node.output()?;
    let type_name = ctx.syntax.type_name(&out.ty)?;
    stage
        .writer
        .stmt(&format!("{type_name} {} = {expr}", out.variable));
    Ok(())
}

/// Identifier prefix used for a node's temporaries.
pub(crate) fn node_prefix(node: &ShaderNode, ctx: &EmitContext<'_>) -> String {
    ctx.syntax.make_valid_name(&node.name)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_category_resolves() {
        for category in [
            "constant", "add", "subtract", "multiply", "divide", "mix", "clamp", "ramp",
            "position", "normal", "tangent", "texcoord", "viewdirection", "time", "image",
            "diffuse_bsdf", "specular_bsdf", "mix_bsdf", "uniform_edf", "surface",
            "surfacematerial", "point_light", "directional_light", "spot_light",
        ] {
            assert!(implementation_for(category).is_ok(), "{category}");
        }
    }

    #[test]
    fn unknown_category_is_malformed() {
        assert!(matches!(
            implementation_for("warp_drive"),
            Err(GenError::MalformedGraph(_))
        ));
    }
}
