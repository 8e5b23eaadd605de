//! Small text helpers shared by the syntax registry and the node emitters.

use super::error::{GenError, GenResult};
use super::types::TypeDesc;

/// Format a float as the shortest HLSL literal that reads back to the same
/// value, always with a fractional part. Non-finite values have no literal.
pub fn fmt_float(v: f32) -> GenResult<String> {
    if !v.is_finite() {
        return Err(GenError::malformed(format!("float value {v} has no HLSL literal")));
    }
    if v == 0.0 {
        return Ok("0.0".to_string());
    }
    let s = format!("{v:?}");
    // Debug prints `1e-7`; HLSL wants a fraction before the exponent.
    Ok(match s.split_once('e') {
        Some((mantissa, exp)) if !mantissa.contains('.') => format!("{mantissa}.0e{exp}"),
        _ => s,
    })
}

/// Join pre-rendered items with `", "`.
pub fn join(items: impl IntoIterator<Item = String>) -> String {
    items.into_iter().collect::<Vec<_>>().join(", ")
}

/// Replace anything that is not an ASCII alphanumeric or `_` with `_`.
pub fn sanitize_ident(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if ch.is_ascii_alphanumeric() || ch == '_' {
            out.push(ch);
        } else {
            out.push('_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    if out.starts_with(|c: char| c.is_ascii_digit()) {
        out.insert(0, '_');
    }
    out
}

/// Widen an expression of type `ty` to a `float4` color.
///
/// Used for both connected outputs and literal fallbacks on the final
/// pixel output, so the two paths can never disagree.
pub fn to_float4(ty: &TypeDesc, expr: &str) -> GenResult<String> {
    Ok(match ty {
        TypeDesc::Float => format!("float4({expr}, {expr}, {expr}, 1.0)"),
        TypeDesc::Integer | TypeDesc::Boolean => {
            format!("float4(float({expr}), float({expr}), float({expr}), 1.0)")
        }
        TypeDesc::Vector2 => format!("float4({expr}, 0.0, 1.0)"),
        TypeDesc::Vector3 | TypeDesc::Color3 => format!("float4({expr}, 1.0)"),
        TypeDesc::Vector4 | TypeDesc::Color4 => expr.to_string(),
        TypeDesc::SurfaceShader | TypeDesc::Material => format!("float4({expr}.color, 1.0)"),
        other => return Err(GenError::unsupported(other.name())),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_float_keeps_a_fraction() {
        assert_eq!(fmt_float(1.0).unwrap(), "1.0");
        assert_eq!(fmt_float(0.5).unwrap(), "0.5");
        assert_eq!(fmt_float(0.001).unwrap(), "0.001");
        assert_eq!(fmt_float(-2.25).unwrap(), "-2.25");
        assert_eq!(fmt_float(-0.0).unwrap(), "0.0");
    }

    #[test]
    fn fmt_float_keeps_tiny_and_huge_values() {
        assert_eq!(fmt_float(1.0e-7).unwrap(), "1.0e-7");
        assert_eq!(fmt_float(2.5e-7).unwrap(), "2.5e-7");
        assert_eq!(fmt_float(1.0e20).unwrap(), "1.0e20");
        assert_eq!(fmt_float(f32::MIN_POSITIVE).unwrap().parse::<f32>().unwrap(), f32::MIN_POSITIVE);
    }

    #[test]
    fn fmt_float_rejects_non_finite_values() {
        for v in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY] {
            assert!(matches!(fmt_float(v), Err(GenError::MalformedGraph(_))));
        }
    }

    #[test]
    fn sanitize_replaces_invalid_chars() {
        assert_eq!(sanitize_ident("base-color.1"), "base_color_1");
        assert_eq!(sanitize_ident("3d"), "_3d");
        assert_eq!(sanitize_ident(""), "_");
    }

    #[test]
    fn widening_follows_the_shared_rule() {
        assert_eq!(to_float4(&TypeDesc::Float, "x").unwrap(), "float4(x, x, x, 1.0)");
        assert_eq!(to_float4(&TypeDesc::Vector2, "x").unwrap(), "float4(x, 0.0, 1.0)");
        assert_eq!(to_float4(&TypeDesc::Color3, "x").unwrap(), "float4(x, 1.0)");
        assert_eq!(to_float4(&TypeDesc::Color4, "x").unwrap(), "x");
        assert_eq!(
            to_float4(&TypeDesc::Integer, "i").unwrap(),
            "float4(float(i), float(i), float(i), 1.0)"
        );
        assert_eq!(
            to_float4(&TypeDesc::SurfaceShader, "s").unwrap(),
            "float4(s.color, 1.0)"
        );
    }

    #[test]
    fn widening_rejects_closures() {
        assert_eq!(
            to_float4(&TypeDesc::Bsdf, "b"),
            Err(GenError::UnsupportedType {
                type_name: "BSDF".to_string()
            })
        );
    }
}
