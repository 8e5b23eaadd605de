//! Constant values.

use super::{NodeImplementation, emit_output_assignment};
use crate::generator::context::EmitContext;
use crate::generator::error::GenResult;
use crate::generator::shader_graph::ShaderNode;
use crate::generator::stage::{Stage, StageKind};

/// `T name_out = value;`
///
/// The value comes from the `value` input, which may be a literal, a
/// published uniform or an upstream connection.
pub struct ConstantNode;

impl NodeImplementation for ConstantNode {
    fn name(&self) -> &'static str {
        "constant"
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
        let default = ctx.syntax.default_value(&node.output()?.ty, false)?;
        let value = ctx.input_or(node, "value", &default)?;
        emit_output_assignment(node, ctx, stage, &value)
    }
}
