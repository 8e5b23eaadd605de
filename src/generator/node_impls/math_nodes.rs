//! Arithmetic, interpolation and ramp lookups.

use super::{NodeImplementation, emit_output_assignment, node_prefix};
use crate::generator::context::EmitContext;
use crate::generator::error::{GenError, GenResult};
use crate::generator::options::GenOptions;
use crate::generator::shader::Shader;
use crate::generator::shader_graph::ShaderNode;
use crate::generator::stage::{Stage, StageKind};
use crate::generator::types::{TypeDesc, Value};
use crate::generator::variables::Port;

/// `in1 <op> in2`. Unset operands fall back to the operation's identity.
pub struct BinaryNode {
    name: &'static str,
    op: &'static str,
    identity_is_one: bool,
}

impl BinaryNode {
    pub const ADD: BinaryNode = BinaryNode {
        name: "add",
        op: "+",
        identity_is_one: false,
    };
    pub const SUBTRACT: BinaryNode = BinaryNode {
        name: "subtract",
        op: "-",
        identity_is_one: false,
    };
    pub const MULTIPLY: BinaryNode = BinaryNode {
        name: "multiply",
        op: "*",
        identity_is_one: true,
    };
    pub const DIVIDE: BinaryNode = BinaryNode {
        name: "divide",
        op: "/",
        identity_is_one: true,
    };
}

impl NodeImplementation for BinaryNode {
    fn name(&self) -> &'static str {
        self.name
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
        let zero = ctx.syntax.default_value(&node.output()?.ty, false)?;
        let identity = if self.identity_is_one {
            "1.0".to_string()
        } else {
            zero.clone()
        };
        let a = ctx.input_or(node, "in1", &zero)?;
        let b = ctx.input_or(node, "in2", &identity)?;
        emit_output_assignment(node, ctx, stage, &format!("{a} {} {b}", self.op))
    }
}

/// `lerp(bg, fg, mix)`
pub struct MixNode;

impl NodeImplementation for MixNode {
    fn name(&self) -> &'static str {
        "mix"
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
        let zero = ctx.syntax.default_value(&node.output()?.ty, false)?;
        let bg = ctx.input_or(node, "bg", &zero)?;
        let fg = ctx.input_or(node, "fg", &zero)?;
        let amount = ctx.input_or(node, "mix", "0.0")?;
        emit_output_assignment(node, ctx, stage, &format!("lerp({bg}, {fg}, {amount})"))
    }
}

pub struct ClampNode;

impl NodeImplementation for ClampNode {
    fn name(&self) -> &'static str {
        "clamp"
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
        let zero = ctx.syntax.default_value(&node.output()?.ty, false)?;
        let input = ctx.input_or(node, "in", &zero)?;
        let low = ctx.input_or(node, "low", "0.0")?;
        let high = ctx.input_or(node, "high", "1.0")?;
        emit_output_assignment(node, ctx, stage, &format!("clamp({input}, {low}, {high})"))
    }
}

/// Piecewise-linear float lookup.
///
/// Knot `positions` and `values` are literal float arrays of equal length,
/// emitted as pixel-stage constants unless published as uniforms. Inputs below
/// the first knot take the first value, inputs above the last knot take the
/// last value.
pub struct RampNode;

fn ramp_knots(node: &ShaderNode) -> GenResult<(&Port, &Port, usize)> {
    let knots = |name: &str| -> GenResult<(&Port, usize)> {
        let port = node.input(name).ok_or_else(|| {
            GenError::malformed(format!("ramp '{}' needs a '{name}' input", node.name))
        })?;
        if port.connection.is_some() {
            return Err(GenError::malformed(format!(
                "ramp '{}' input '{name}' must be a literal array",
                node.name
            )));
        }
        match &port.value {
            Some(Value::FloatArray(v)) if !v.is_empty() => Ok((port, v.len())),
            _ => Err(GenError::malformed(format!(
                "ramp '{}' input '{name}' must be a non-empty float array",
                node.name
            ))),
        }
    };
    let (positions, n) = knots("positions")?;
    let (values, m) = knots("values")?;
    if n != m {
        return Err(GenError::malformed(format!(
            "ramp '{}' has {n} positions but {m} values",
            node.name
        )));
    }
    Ok((positions, values, n))
}

impl NodeImplementation for RampNode {
    fn name(&self) -> &'static str {
        "ramp"
    }

    fn create_variables(
        &self,
        node: &ShaderNode,
        _options: &GenOptions,
        shader: &mut Shader,
    ) -> GenResult<()> {
        if node.output()?.ty != TypeDesc::Float {
            return Err(GenError::unsupported(node.output()?.ty.name()));
        }
        let (positions, values, _) = ramp_knots(node)?;
        // Uniform knots are already published through the public uniform block.
        for port in [positions, values].into_iter().filter(|p| !p.uniform) {
            let mut constant = port.clone();
            constant.name = constant.variable.clone();
            constant.uniform = false;
            shader.add_constant(StageKind::Pixel, constant);
        }
        Ok(())
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
        let (positions, values, n) = ramp_knots(node)?;
        let (pos, val) = (&positions.variable, &values.variable);
        let input = ctx.input_or(node, "in", "0.0")?;
        let out = &node.output()?.variable;
        let i = format!("{}_i", node_prefix(node, ctx));

        let w = &mut stage.writer;
        w.stmt(&format!("float {out} = {val}[0]"));
        w.line(&format!("for (int {i} = 1; {i} < {n}; ++{i})"), false);
        w.scope_begin();
        w.stmt(&format!(
            "float {i}_t = saturate(({input} - {pos}[{i} - 1]) / max({pos}[{i}] - {pos}[{i} - 1], M_FLOAT_EPS))"
        ));
        w.stmt(&format!(
            "{out} = ({input} >= {pos}[{i} - 1]) ? lerp({val}[{i} - 1], {val}[{i}], {i}_t) : {out}"
        ));
        w.scope_end(false);
        Ok(())
    }
}
