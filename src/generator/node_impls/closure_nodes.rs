//! BSDF and EDF closures.
//!
//! Closure calls depend on the closure context set by the surface shader:
//! reflection calls run inside the light loop with `L`, `V`, `P` and
//! `lightOcclusion` in scope, indirect calls with `V` only. Outside a
//! matching context a closure evaluates to its neutral literal.

use super::{NodeImplementation, emit_output_assignment, node_prefix};
use crate::generator::context::{ClosureContext, EmitContext};
use crate::generator::error::GenResult;
use crate::generator::shader_graph::ShaderNode;
use crate::generator::stage::{Stage, StageKind};
use crate::generator::types::TypeDesc;

/// A BSDF evaluated by a library pair `mx_<name>_reflection` / `mx_<name>_indirect`.
pub struct BsdfNode {
    name: &'static str,
    include: &'static str,
    /// Argument inputs after the shared prefix, with their fallback literals.
    params: &'static [(&'static str, &'static str)],
}

impl BsdfNode {
    pub const DIFFUSE: BsdfNode = BsdfNode {
        name: "diffuse_bsdf",
        include: "pbrlib/genhlsl/mx_diffuse_bsdf.hlsl",
        params: &[
            ("weight", "1.0"),
            ("color", "float3(0.18, 0.18, 0.18)"),
            ("roughness", "0.0"),
            ("normal", "N"),
        ],
    };
    pub const SPECULAR: BsdfNode = BsdfNode {
        name: "specular_bsdf",
        include: "pbrlib/genhlsl/mx_specular_bsdf.hlsl",
        params: &[
            ("weight", "1.0"),
            ("color", "float3(1.0, 1.0, 1.0)"),
            ("roughness", "0.2"),
            ("ior", "1.5"),
            ("normal", "N"),
        ],
    };
}

impl NodeImplementation for BsdfNode {
    fn name(&self) -> &'static str {
        self.name
    }

    fn emit_function_definition(
        &self,
        _node: &ShaderNode,
        ctx: &EmitContext<'_>,
        stage: &mut Stage,
    ) -> GenResult<()> {
        if stage.kind() == StageKind::Pixel && ctx.requires_lighting() {
            ctx.emit_library_include(self.include, &mut stage.writer)?;
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
        let mut args = Vec::with_capacity(self.params.len() + 4);
        let function = match ctx.closure {
            Some(ClosureContext::Reflection) if ctx.requires_lighting() => {
                args.extend(["L", "V", "P", "lightOcclusion"].map(String::from));
                format!("mx_{}_reflection", self.name)
            }
            Some(ClosureContext::Indirect) if ctx.requires_lighting() => {
                args.push("V".to_string());
                format!("mx_{}_indirect", self.name)
            }
            _ => {
                let neutral = ctx.syntax.default_value(&TypeDesc::Bsdf, false)?;
                return emit_output_assignment(node, ctx, stage, &neutral);
            }
        };
        for (input, fallback) in self.params {
            args.push(ctx.input_or(node, input, fallback)?);
        }
        emit_output_assignment(node, ctx, stage, &format!("{function}({})", args.join(", ")))
    }
}

/// Linear blend of two BSDFs.
pub struct MixBsdfNode;

/// Variable holding closure input `name`: the upstream result, or a neutral
/// temporary when the input is not connected.
fn closure_operand(
    node: &ShaderNode,
    name: &str,
    ctx: &EmitContext<'_>,
    stage: &mut Stage,
) -> GenResult<String> {
    if let Some(upstream) = ctx.upstream(node, name) {
        ctx.emit_function_call(upstream, stage)?;
        return Ok(upstream.output()?.variable.clone());
    }
    let var = format!("{}_{name}", node_prefix(node, ctx));
    let neutral = ctx.syntax.default_value(&TypeDesc::Bsdf, false)?;
    stage.writer.stmt(&format!("BSDF {var} = {neutral}"));
    Ok(var)
}

impl NodeImplementation for MixBsdfNode {
    fn name(&self) -> &'static str {
        "mix_bsdf"
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
        let fg = closure_operand(node, "fg", ctx, stage)?;
        let bg = closure_operand(node, "bg", ctx, stage)?;
        let amount = ctx.input_or(node, "mix", "0.0")?;
        let out = &node.output()?.variable;
        let w = &mut stage.writer;
        w.stmt(&format!("BSDF {out}"));
        w.stmt(&format!(
            "{out}.response = lerp({bg}.response, {fg}.response, {amount})"
        ));
        w.stmt(&format!(
            "{out}.throughput = lerp({bg}.throughput, {fg}.throughput, {amount})"
        ));
        Ok(())
    }
}

/// Constant emission.
pub struct UniformEdfNode;

impl NodeImplementation for UniformEdfNode {
    fn name(&self) -> &'static str {
        "uniform_edf"
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
        let expr = match ctx.closure {
            Some(ClosureContext::Emission) => {
                ctx.input_or(node, "color", "float3(1.0, 1.0, 1.0)")?
            }
            _ => ctx.syntax.default_value(&TypeDesc::Edf, false)?,
        };
        emit_output_assignment(node, ctx, stage, &expr)
    }
}
