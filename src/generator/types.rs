//! Abstract value types and literal values used throughout the shader graph.
//!
//! Nothing outside `syntax` ever spells an HLSL type name; everything else
//! refers to types through [`TypeDesc`].

use std::fmt;
use std::sync::Arc;

use serde_json::Value as Json;

use super::error::{GenError, GenResult};
use super::syntax::Syntax;

/// Abstract value type of a port.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    Boolean,
    Integer,
    IntegerArray,
    Float,
    FloatArray,
    Vector2,
    Vector3,
    Vector4,
    Color3,
    Color4,
    Matrix33,
    Matrix44,
    String,
    Filename,
    Bsdf,
    Edf,
    Vdf,
    SurfaceShader,
    VolumeShader,
    DisplacementShader,
    LightShader,
    Material,
    /// User-defined struct, looked up by name in the syntax registry.
    Struct(Arc<str>),
}

impl TypeDesc {
    /// Every built-in type, in registration order.
    pub const BUILTIN: [TypeDesc; 22] = [
        TypeDesc::Float,
        TypeDesc::FloatArray,
        TypeDesc::Integer,
        TypeDesc::IntegerArray,
        TypeDesc::Boolean,
        TypeDesc::Color3,
        TypeDesc::Color4,
        TypeDesc::Vector2,
        TypeDesc::Vector3,
        TypeDesc::Vector4,
        TypeDesc::Matrix33,
        TypeDesc::Matrix44,
        TypeDesc::String,
        TypeDesc::Filename,
        TypeDesc::Bsdf,
        TypeDesc::Edf,
        TypeDesc::Vdf,
        TypeDesc::SurfaceShader,
        TypeDesc::VolumeShader,
        TypeDesc::DisplacementShader,
        TypeDesc::LightShader,
        TypeDesc::Material,
    ];

    pub fn name(&self) -> &str {
        match self {
            TypeDesc::Boolean => "boolean",
            TypeDesc::Integer => "integer",
            TypeDesc::IntegerArray => "integerarray",
            TypeDesc::Float => "float",
            TypeDesc::FloatArray => "floatarray",
            TypeDesc::Vector2 => "vector2",
            TypeDesc::Vector3 => "vector3",
            TypeDesc::Vector4 => "vector4",
            TypeDesc::Color3 => "color3",
            TypeDesc::Color4 => "color4",
            TypeDesc::Matrix33 => "matrix33",
            TypeDesc::Matrix44 => "matrix44",
            TypeDesc::String => "string",
            TypeDesc::Filename => "filename",
            TypeDesc::Bsdf => "BSDF",
            TypeDesc::Edf => "EDF",
            TypeDesc::Vdf => "VDF",
            TypeDesc::SurfaceShader => "surfaceshader",
            TypeDesc::VolumeShader => "volumeshader",
            TypeDesc::DisplacementShader => "displacementshader",
            TypeDesc::LightShader => "lightshader",
            TypeDesc::Material => "material",
            TypeDesc::Struct(name) => name,
        }
    }

    /// Look up a built-in type by its document name.
    ///
    /// Struct types are resolved through [`Syntax::type_by_name`] instead.
    pub fn from_name(name: &str) -> Option<TypeDesc> {
        TypeDesc::BUILTIN.iter().find(|t| t.name() == name).cloned()
    }

    /// Number of scalar components for numeric types, 0 otherwise.
    pub fn size(&self) -> usize {
        match self {
            TypeDesc::Boolean | TypeDesc::Integer | TypeDesc::Float => 1,
            TypeDesc::Vector2 => 2,
            TypeDesc::Vector3 | TypeDesc::Color3 => 3,
            TypeDesc::Vector4 | TypeDesc::Color4 => 4,
            TypeDesc::Matrix33 => 9,
            TypeDesc::Matrix44 => 16,
            _ => 0,
        }
    }

    pub fn is_closure(&self) -> bool {
        matches!(self, TypeDesc::Bsdf | TypeDesc::Edf | TypeDesc::Vdf)
    }

    pub fn is_shader(&self) -> bool {
        matches!(
            self,
            TypeDesc::SurfaceShader
                | TypeDesc::VolumeShader
                | TypeDesc::DisplacementShader
                | TypeDesc::LightShader
                | TypeDesc::Material
        )
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeDesc::FloatArray | TypeDesc::IntegerArray)
    }

    pub fn is_float3(&self) -> bool {
        matches!(self, TypeDesc::Vector3 | TypeDesc::Color3)
    }

    pub fn is_float4(&self) -> bool {
        matches!(self, TypeDesc::Vector4 | TypeDesc::Color4)
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A named member of a struct value.
#[derive(Clone, Debug, PartialEq)]
pub struct StructMember {
    pub name: String,
    pub type_name: String,
    pub value: Value,
}

/// Literal value attached to a port.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Boolean(bool),
    Integer(i32),
    Float(f32),
    /// Vectors, colors and matrices, row-major.
    Floats(Vec<f32>),
    String(String),
    FloatArray(Vec<f32>),
    IntegerArray(Vec<i32>),
    Struct {
        type_name: String,
        members: Vec<StructMember>,
    },
}

impl Value {
    /// Number of elements for array values.
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Value::FloatArray(v) => Some(v.len()),
            Value::IntegerArray(v) => Some(v.len()),
            _ => None,
        }
    }

    /// Convert a JSON literal from a material document into a typed value.
    pub fn from_json(ty: &TypeDesc, json: &Json, syntax: &Syntax) -> GenResult<Value> {
        let mismatch = || {
            GenError::malformed(format!("value {json} is not a valid literal of type {ty}"))
        };
        match ty {
            TypeDesc::Boolean => json.as_bool().map(Value::Boolean).ok_or_else(mismatch),
            TypeDesc::Integer => json
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Integer)
                .ok_or_else(mismatch),
            TypeDesc::Float => json_f32(json).map(Value::Float).ok_or_else(mismatch),
            TypeDesc::Vector2
            | TypeDesc::Vector3
            | TypeDesc::Vector4
            | TypeDesc::Color3
            | TypeDesc::Color4
            | TypeDesc::Matrix33
            | TypeDesc::Matrix44 => {
                // A bare number splats across all components.
                if let Some(x) = json_f32(json) {
                    return Ok(Value::Floats(vec![x; ty.size()]));
                }
                let arr = json.as_array().ok_or_else(mismatch)?;
                let values: Option<Vec<f32>> = arr.iter().map(json_f32).collect();
                let values = values.ok_or_else(mismatch)?;
                if values.len() != ty.size() {
                    return Err(GenError::malformed(format!(
                        "{ty} literal needs {} components, got {}",
                        ty.size(),
                        values.len()
                    )));
                }
                Ok(Value::Floats(values))
            }
            TypeDesc::FloatArray => {
                let arr = json.as_array().ok_or_else(mismatch)?;
                let values: Option<Vec<f32>> = arr.iter().map(json_f32).collect();
                values.map(Value::FloatArray).ok_or_else(mismatch)
            }
            TypeDesc::IntegerArray => {
                let arr = json.as_array().ok_or_else(mismatch)?;
                let values: Option<Vec<i32>> = arr
                    .iter()
                    .map(|v| v.as_i64().and_then(|x| i32::try_from(x).ok()))
                    .collect();
                values.map(Value::IntegerArray).ok_or_else(mismatch)
            }
            TypeDesc::String | TypeDesc::Filename => json
                .as_str()
                .map(|s| Value::String(s.to_string()))
                .ok_or_else(mismatch),
            TypeDesc::Struct(name) => {
                let obj = json.as_object().ok_or_else(mismatch)?;
                let fields = syntax.struct_members(name)?;
                let mut members = Vec::with_capacity(fields.len());
                for (member_name, member_ty) in fields {
                    let member_json = obj.get(member_name.as_str()).ok_or_else(|| {
                        GenError::malformed(format!(
                            "struct value of type {name} is missing member '{member_name}'"
                        ))
                    })?;
                    members.push(StructMember {
                        name: member_name.clone(),
                        type_name: member_ty.name().to_string(),
                        value: Value::from_json(member_ty, member_json, syntax)?,
                    });
                }
                Ok(Value::Struct {
                    type_name: name.to_string(),
                    members,
                })
            }
            // Closure and shader values have no document literal form.
            _ => Err(mismatch()),
        }
    }
}

fn json_f32(v: &Json) -> Option<f32> {
    v.as_f64()
        .map(|x| x as f32)
        .or_else(|| v.as_i64().map(|x| x as f32))
        .or_else(|| v.as_u64().map(|x| x as f32))
        .filter(|x| x.is_finite())
}
