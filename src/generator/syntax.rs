//! HLSL type-syntax registry.
//!
//! Maps every [`TypeDesc`] to its HLSL spelling, literal forms and optional
//! type definition, and renders literals and declarations through it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use super::error::{GenError, GenResult};
use super::types::{TypeDesc, Value};
use super::utils::{fmt_float, join, sanitize_ident};
use super::variables::Port;

pub const CONSTANT_QUALIFIER: &str = "static const";
pub const UNIFORM_QUALIFIER: &str = "uniform";
/// Suffix of the sampler state declared next to every texture.
pub const SAMPLER_SUFFIX: &str = "_sampler";

pub const VEC2_MEMBERS: &[&str] = &[".x", ".y"];
pub const VEC3_MEMBERS: &[&str] = &[".x", ".y", ".z"];
pub const VEC4_MEMBERS: &[&str] = &[".x", ".y", ".z", ".w"];

const IDENTITY33: &str = "float3x3(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0)";
const IDENTITY44: &str =
    "float4x4(1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0)";

const RESERVED_WORDS: &[&str] = &[
    // keywords
    "break", "case", "continue", "default", "do", "else", "for", "if", "return", "switch",
    "while", "discard", "true", "false", "void", "const", "static", "uniform", "in", "out",
    "inout", "inline", "extern", "struct", "typedef", "cbuffer", "tbuffer", "register",
    "packoffset", "groupshared", "shared", "volatile", "precise", "nointerpolation", "linear",
    "centroid", "noperspective", "sample", "row_major", "column_major", "snorm", "unorm",
    "namespace", "template", "typename", "sizeof", "this", "class", "interface", "export",
    // types
    "bool", "int", "uint", "dword", "half", "float", "double", "min16float", "min10float",
    "min16int", "min12int", "min16uint", "vector", "matrix", "string",
    "bool2", "bool3", "bool4", "int2", "int3", "int4", "uint2", "uint3", "uint4",
    "half2", "half3", "half4", "float1", "float2", "float3", "float4",
    "double2", "double3", "double4", "float2x2", "float3x3", "float4x4",
    "float2x3", "float2x4", "float3x2", "float3x4", "float4x2", "float4x3",
    "Texture1D", "Texture1DArray", "Texture2D", "Texture2DArray", "Texture2DMS", "Texture3D",
    "TextureCube", "TextureCubeArray", "RWTexture1D", "RWTexture2D", "RWTexture3D",
    "Buffer", "RWBuffer", "ByteAddressBuffer", "RWByteAddressBuffer", "StructuredBuffer",
    "RWStructuredBuffer", "SamplerState", "SamplerComparisonState", "sampler", "sampler1D",
    "sampler2D", "sampler3D", "samplerCUBE", "sampler_state", "texture",
    // intrinsics
    "abs", "acos", "all", "any", "asfloat", "asin", "asint", "asuint", "atan", "atan2",
    "ceil", "clamp", "clip", "cos", "cosh", "cross", "ddx", "ddy", "degrees", "determinant",
    "distance", "dot", "exp", "exp2", "faceforward", "floor", "fmod", "frac", "frexp",
    "fwidth", "isfinite", "isinf", "isnan", "ldexp", "length", "lerp", "log", "log10",
    "log2", "mad", "max", "min", "modf", "mul", "normalize", "pow", "radians", "rcp",
    "reflect", "refract", "round", "rsqrt", "saturate", "sign", "sin", "sincos", "sinh",
    "smoothstep", "sqrt", "step", "tan", "tanh", "transpose", "trunc",
    // names the generator itself declares
    "input", "output", "VSInput", "VSOutput", "PSOutput", "VS_Main", "PS_Main",
];

const INVALID_TOKENS: &[(&str, &str)] = &[("__", "_"), ("sv_", "sv")];

/// How a registered type renders values.
#[derive(Clone, Debug, PartialEq)]
pub enum SyntaxKind {
    Scalar,
    /// Vectors, colors, matrices and built-in closure/shader records.
    Aggregate { members: &'static [&'static str] },
    /// Sized from the value; literal is `{a, b, ...}`.
    Array,
    /// User-defined struct; members render through the registry.
    Struct { members: Vec<(String, TypeDesc)> },
    /// No string primitive in HLSL; declared as `int`.
    String,
}

#[derive(Clone, Debug)]
pub struct TypeSyntax {
    pub name: String,
    pub default_value: String,
    pub uniform_default_value: String,
    pub type_alias: Option<String>,
    pub type_definition: Option<String>,
    pub kind: SyntaxKind,
}

impl TypeSyntax {
    pub fn scalar(name: &str, default_value: &str) -> Self {
        Self {
            name: name.to_string(),
            default_value: default_value.to_string(),
            uniform_default_value: default_value.to_string(),
            type_alias: None,
            type_definition: None,
            kind: SyntaxKind::Scalar,
        }
    }

    pub fn aggregate(
        name: &str,
        default_value: &str,
        uniform_default_value: &str,
        members: &'static [&'static str],
    ) -> Self {
        Self {
            name: name.to_string(),
            default_value: default_value.to_string(),
            uniform_default_value: uniform_default_value.to_string(),
            type_alias: None,
            type_definition: None,
            kind: SyntaxKind::Aggregate { members },
        }
    }

    pub fn array(name: &str) -> Self {
        Self {
            kind: SyntaxKind::Array,
            ..Self::scalar(name, "")
        }
    }

    fn string() -> Self {
        Self {
            kind: SyntaxKind::String,
            ..Self::scalar("int", "0")
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.type_alias = Some(alias.to_string());
        self
    }

    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.type_definition = Some(definition.into());
        self
    }

    /// Member-access suffixes (`.x`, `.y`, ...) for swizzling, if any.
    pub fn members(&self) -> &[&'static str] {
        match &self.kind {
            SyntaxKind::Aggregate { members } => members,
            _ => &[],
        }
    }
}

/// Registry of HLSL type syntax plus identifier rules.
#[derive(Clone, Debug)]
pub struct Syntax {
    entries: Vec<(TypeDesc, TypeSyntax)>,
    index_by_type: HashMap<TypeDesc, usize>,
    reserved_words: HashSet<&'static str>,
}

impl Syntax {
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
            index_by_type: HashMap::new(),
            reserved_words: RESERVED_WORDS.iter().copied().collect(),
        }
    }

    /// The HLSL (Shader Model 5.0) syntax with every built-in type registered.
    pub fn hlsl() -> Self {
        let mut s = Self::empty();
        let zero3 = "float3(0.0, 0.0, 0.0)";
        let zero4 = "float4(0.0, 0.0, 0.0, 0.0)";

        s.register(TypeDesc::Float, TypeSyntax::scalar("float", "0.0"));
        s.register(TypeDesc::FloatArray, TypeSyntax::array("float"));
        s.register(TypeDesc::Integer, TypeSyntax::scalar("int", "0"));
        s.register(TypeDesc::IntegerArray, TypeSyntax::array("int"));
        s.register(TypeDesc::Boolean, TypeSyntax::scalar("bool", "false"));
        s.register(TypeDesc::Color3, TypeSyntax::aggregate("float3", zero3, zero3, VEC3_MEMBERS));
        s.register(TypeDesc::Color4, TypeSyntax::aggregate("float4", zero4, zero4, VEC4_MEMBERS));
        s.register(
            TypeDesc::Vector2,
            TypeSyntax::aggregate("float2", "float2(0.0, 0.0)", "float2(0.0, 0.0)", VEC2_MEMBERS),
        );
        s.register(TypeDesc::Vector3, TypeSyntax::aggregate("float3", zero3, zero3, VEC3_MEMBERS));
        s.register(TypeDesc::Vector4, TypeSyntax::aggregate("float4", zero4, zero4, VEC4_MEMBERS));
        s.register(TypeDesc::Matrix33, TypeSyntax::aggregate("float3x3", IDENTITY33, IDENTITY33, &[]));
        s.register(TypeDesc::Matrix44, TypeSyntax::aggregate("float4x4", IDENTITY44, IDENTITY44, &[]));
        s.register(TypeDesc::String, TypeSyntax::string());
        s.register(TypeDesc::Filename, TypeSyntax::scalar("Texture2D", ""));

        let bsdf_default = "{float3(0.0, 0.0, 0.0), float3(1.0, 1.0, 1.0)}";
        let shader_default = "{float3(0.0, 0.0, 0.0), float3(0.0, 0.0, 0.0)}";
        s.register(
            TypeDesc::Bsdf,
            TypeSyntax::aggregate("BSDF", bsdf_default, "", &[])
                .with_definition("struct BSDF { float3 response; float3 throughput; };"),
        );
        s.register(
            TypeDesc::Edf,
            TypeSyntax::aggregate("EDF", zero3, zero3, VEC3_MEMBERS)
                .with_alias("float3")
                .with_definition("#define EDF float3"),
        );
        // VDF shares the BSDF record.
        s.register(TypeDesc::Vdf, TypeSyntax::aggregate("BSDF", bsdf_default, "", &[]));
        s.register(
            TypeDesc::SurfaceShader,
            TypeSyntax::aggregate("surfaceshader", shader_default, "", &[])
                .with_definition("struct surfaceshader { float3 color; float3 transparency; };"),
        );
        s.register(
            TypeDesc::VolumeShader,
            TypeSyntax::aggregate("volumeshader", shader_default, "", &[])
                .with_definition("struct volumeshader { float3 color; float3 transparency; };"),
        );
        s.register(
            TypeDesc::DisplacementShader,
            TypeSyntax::aggregate("displacementshader", "{float3(0.0, 0.0, 0.0), 1.0}", "", &[])
                .with_definition("struct displacementshader { float3 offset; float scale; };"),
        );
        s.register(
            TypeDesc::LightShader,
            TypeSyntax::aggregate("lightshader", shader_default, "", &[])
                .with_definition("struct lightshader { float3 intensity; float3 direction; };"),
        );
        s.register(
            TypeDesc::Material,
            TypeSyntax::aggregate("material", shader_default, "", &[])
                .with_alias("surfaceshader")
                .with_definition("#define material surfaceshader"),
        );
        s
    }

    /// Register (or replace) the syntax for `ty`. First registration fixes its position.
    pub fn register(&mut self, ty: TypeDesc, entry: TypeSyntax) {
        match self.index_by_type.get(&ty) {
            Some(&idx) => self.entries[idx].1 = entry,
            None => {
                self.index_by_type.insert(ty.clone(), self.entries.len());
                self.entries.push((ty, entry));
            }
        }
    }

    pub fn type_syntax(&self, ty: &TypeDesc) -> GenResult<&TypeSyntax> {
        self.index_by_type
            .get(ty)
            .map(|&idx| &self.entries[idx].1)
            .ok_or_else(|| GenError::unsupported(ty.name()))
    }

    pub fn type_name(&self, ty: &TypeDesc) -> GenResult<&str> {
        Ok(self.type_syntax(ty)?.name.as_str())
    }

    /// Resolve a document type name, including registered struct types.
    pub fn type_by_name(&self, name: &str) -> Option<TypeDesc> {
        TypeDesc::from_name(name).or_else(|| {
            self.entries.iter().find_map(|(ty, _)| match ty {
                TypeDesc::Struct(n) if n.as_ref() == name => Some(ty.clone()),
                _ => None,
            })
        })
    }

    /// Type definitions in registration order.
    pub fn type_definitions(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter_map(|(_, e)| e.type_definition.as_deref())
    }

    pub fn default_value(&self, ty: &TypeDesc, uniform: bool) -> GenResult<String> {
        let entry = self.type_syntax(ty)?;
        Ok(if uniform {
            entry.uniform_default_value.clone()
        } else {
            entry.default_value.clone()
        })
    }

    /// Render a literal. Texture handles and empty arrays render as an empty string.
    pub fn value(&self, ty: &TypeDesc, value: &Value, uniform: bool) -> GenResult<String> {
        let entry = self.type_syntax(ty)?;
        if *ty == TypeDesc::Filename {
            return Ok(String::new());
        }
        let rendered = match (&entry.kind, value) {
            (SyntaxKind::String, _) => "0".to_string(),
            (SyntaxKind::Array, Value::FloatArray(v)) if v.is_empty() => String::new(),
            (SyntaxKind::Array, Value::IntegerArray(v)) if v.is_empty() => String::new(),
            (SyntaxKind::Array, Value::FloatArray(v)) => {
                format!("{{{}}}", join(fmt_floats(v)?))
            }
            (SyntaxKind::Array, Value::IntegerArray(v)) => {
                format!("{{{}}}", join(v.iter().map(|x| x.to_string())))
            }
            (SyntaxKind::Struct { .. }, Value::Struct { type_name, members }) => {
                if type_name != ty.name() {
                    return Err(GenError::malformed(format!(
                        "value of struct type '{type_name}' cannot be rendered as {ty}"
                    )));
                }
                let mut parts = Vec::with_capacity(members.len());
                for member in members {
                    let member_ty = self
                        .type_by_name(&member.type_name)
                        .ok_or_else(|| GenError::unsupported(member.type_name.clone()))?;
                    parts.push(self.value(&member_ty, &member.value, uniform)?);
                }
                format!("{{{}}}", join(parts))
            }
            (SyntaxKind::Scalar, Value::Boolean(b)) => b.to_string(),
            (SyntaxKind::Scalar, Value::Integer(i)) => i.to_string(),
            (SyntaxKind::Scalar, Value::Float(f)) => fmt_float(*f)?,
            (SyntaxKind::Aggregate { .. }, Value::Floats(v)) => {
                format!("{}({})", entry.name, join(fmt_floats(v)?))
            }
            _ => {
                return Err(GenError::malformed(format!(
                    "value {value:?} cannot be rendered as {ty}"
                )));
            }
        };
        Ok(rendered)
    }

    /// Array suffix (`[N]`) for an array port; fails when no length can be derived.
    pub fn array_suffix(&self, port: &Port) -> GenResult<String> {
        let len = port
            .value
            .as_ref()
            .and_then(Value::array_len)
            .filter(|n| *n > 0)
            .ok_or_else(|| GenError::MissingArrayLength {
                variable: port.variable.clone(),
            })?;
        Ok(format!("[{len}]"))
    }

    /// Declarations for `port`, without trailing semicolons.
    ///
    /// A `Filename` port yields two declarations: the texture and its sampler.
    pub fn declare_variable(
        &self,
        port: &Port,
        qualifier: &str,
        assign_value: bool,
    ) -> GenResult<Vec<String>> {
        let q = if qualifier.is_empty() {
            String::new()
        } else {
            format!("{qualifier} ")
        };

        if port.is_texture() {
            return Ok(vec![
                format!("{q}Texture2D {}", port.variable),
                format!("{q}SamplerState {}{SAMPLER_SUFFIX}", port.variable),
            ]);
        }

        let entry = self.type_syntax(&port.ty)?;
        let mut decl = format!("{q}{} {}", entry.name, port.variable);
        if port.ty.is_array() {
            decl.push_str(&self.array_suffix(port)?);
        }
        if let Some(semantic) = &port.semantic {
            decl.push_str(" : ");
            decl.push_str(semantic);
        }
        if assign_value {
            let value = match &port.value {
                Some(v) => self.value(&port.ty, v, true)?,
                None => self.default_value(&port.ty, true)?,
            };
            if !value.is_empty() {
                decl.push_str(" = ");
                decl.push_str(&value);
            }
        }
        Ok(vec![decl])
    }

    /// Register a user struct type and return its descriptor.
    pub fn create_struct_syntax(
        &mut self,
        name: &str,
        members: Vec<(String, TypeDesc)>,
    ) -> GenResult<TypeDesc> {
        let mut fields = Vec::with_capacity(members.len());
        let mut defaults = Vec::with_capacity(members.len());
        for (member_name, member_ty) in &members {
            let entry = self.type_syntax(member_ty)?;
            fields.push(format!("{} {};", entry.name, member_name));
            defaults.push(entry.default_value.clone());
        }
        let definition = format!("struct {name} {{ {} }};", fields.join(" "));
        let default_value = format!("{{{}}}", join(defaults));

        let ty = TypeDesc::Struct(Arc::from(name));
        self.register(
            ty.clone(),
            TypeSyntax {
                name: name.to_string(),
                default_value: default_value.clone(),
                uniform_default_value: default_value,
                type_alias: None,
                type_definition: Some(definition),
                kind: SyntaxKind::Struct { members },
            },
        );
        Ok(ty)
    }

    pub fn struct_members(&self, name: &str) -> GenResult<&[(String, TypeDesc)]> {
        let ty = TypeDesc::Struct(Arc::from(name));
        match &self.type_syntax(&ty)?.kind {
            SyntaxKind::Struct { members } => Ok(members),
            _ => Err(GenError::unsupported(name)),
        }
    }

    /// Remap a string input carrying an enumeration to its integer index.
    ///
    /// Returns `None` when no remap applies (not a string, no enumeration, empty value).
    pub fn remap_enumeration(
        &self,
        input: &str,
        value: &str,
        ty: &TypeDesc,
        enum_names: &str,
    ) -> GenResult<Option<(TypeDesc, Value)>> {
        if enum_names.trim().is_empty() || *ty != TypeDesc::String || value.is_empty() {
            return Ok(None);
        }
        let names: Vec<&str> = enum_names.split(',').map(str::trim).collect();
        match names.iter().position(|n| *n == value) {
            Some(idx) => Ok(Some((TypeDesc::Integer, Value::Integer(idx as i32)))),
            None => Err(GenError::InvalidEnumValue {
                input: input.to_string(),
                value: value.to_string(),
                enumeration: names.join(", "),
            }),
        }
    }

    pub fn is_reserved(&self, word: &str) -> bool {
        self.reserved_words.contains(word)
    }

    /// Turn an arbitrary name into an identifier that is legal in HLSL.
    pub fn make_valid_name(&self, name: &str) -> String {
        let mut s = sanitize_ident(name);
        for (token, replacement) in INVALID_TOKENS {
            while s.contains(token) {
                s = s.replace(token, replacement);
            }
        }
        if s.is_empty() {
            s.push('_');
        }
        if self.is_reserved(&s) {
            s.push('1');
        }
        s
    }
}

fn fmt_floats(values: &[f32]) -> GenResult<Vec<String>> {
    values.iter().map(|x| fmt_float(*x)).collect()
}

impl Default for Syntax {
    fn default() -> Self {
        Self::hlsl()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::types::StructMember;

    #[test]
    fn scalar_and_vector_literals() {
        let s = Syntax::hlsl();
        assert_eq!(s.value(&TypeDesc::Float, &Value::Float(0.5), false).unwrap(), "0.5");
        assert_eq!(s.value(&TypeDesc::Integer, &Value::Integer(3), false).unwrap(), "3");
        assert_eq!(
            s.value(&TypeDesc::Boolean, &Value::Boolean(true), false).unwrap(),
            "true"
        );
        assert_eq!(
            s.value(&TypeDesc::Color3, &Value::Floats(vec![1.0, 0.5, 0.0]), false)
                .unwrap(),
            "float3(1.0, 0.5, 0.0)"
        );
    }

    #[test]
    fn texture_declares_texture_and_sampler() {
        let s = Syntax::hlsl();
        let port = Port::new("file", TypeDesc::Filename).with_variable("image1_file");
        let decls = s.declare_variable(&port, UNIFORM_QUALIFIER, true).unwrap();
        assert_eq!(
            decls,
            vec![
                "uniform Texture2D image1_file".to_string(),
                "uniform SamplerState image1_file_sampler".to_string(),
            ]
        );
    }

    #[test]
    fn array_declaration_needs_a_value() {
        let s = Syntax::hlsl();
        let port = Port::new("knots", TypeDesc::FloatArray);
        assert_eq!(
            s.declare_variable(&port, CONSTANT_QUALIFIER, true),
            Err(GenError::MissingArrayLength {
                variable: "knots".to_string()
            })
        );

        let empty = port.clone().with_value(Value::FloatArray(vec![]));
        assert!(matches!(
            s.declare_variable(&empty, CONSTANT_QUALIFIER, true),
            Err(GenError::MissingArrayLength { .. })
        ));

        let sized = port.with_value(Value::FloatArray(vec![0.0, 0.5, 1.0]));
        assert_eq!(
            s.declare_variable(&sized, CONSTANT_QUALIFIER, true).unwrap(),
            vec!["static const float knots[3] = {0.0, 0.5, 1.0}".to_string()]
        );
    }

    #[test]
    fn semantic_and_no_assignment() {
        let s = Syntax::hlsl();
        let port = Port::new("i_position", TypeDesc::Vector3).with_semantic("POSITION");
        assert_eq!(
            s.declare_variable(&port, "", false).unwrap(),
            vec!["float3 i_position : POSITION".to_string()]
        );
    }

    #[test]
    fn nested_struct_values_render_recursively() {
        let mut s = Syntax::hlsl();
        s.create_struct_syntax(
            "inner_t",
            vec![("tint".to_string(), TypeDesc::Color3), ("gain".to_string(), TypeDesc::Float)],
        )
        .unwrap();
        let outer = s
            .create_struct_syntax(
                "outer_t",
                vec![
                    ("inner".to_string(), TypeDesc::Struct(Arc::from("inner_t"))),
                    ("count".to_string(), TypeDesc::Integer),
                ],
            )
            .unwrap();

        let value = Value::Struct {
            type_name: "outer_t".to_string(),
            members: vec![
                StructMember {
                    name: "inner".to_string(),
                    type_name: "inner_t".to_string(),
                    value: Value::Struct {
                        type_name: "inner_t".to_string(),
                        members: vec![
                            StructMember {
                                name: "tint".to_string(),
                                type_name: "color3".to_string(),
                                value: Value::Floats(vec![1.0, 0.0, 0.0]),
                            },
                            StructMember {
                                name: "gain".to_string(),
                                type_name: "float".to_string(),
                                value: Value::Float(2.0),
                            },
                        ],
                    },
                },
                StructMember {
                    name: "count".to_string(),
                    type_name: "integer".to_string(),
                    value: Value::Integer(4),
                },
            ],
        };
        assert_eq!(
            s.value(&outer, &value, false).unwrap(),
            "{{float3(1.0, 0.0, 0.0), 2.0}, 4}"
        );
        let defs: Vec<&str> = s.type_definitions().collect();
        assert_eq!(
            defs.last().copied(),
            Some("struct outer_t { inner_t inner; int count; };")
        );
    }

    #[test]
    fn struct_value_of_another_type_is_malformed() {
        let mut s = Syntax::hlsl();
        let a = s
            .create_struct_syntax("a_t", vec![("x".to_string(), TypeDesc::Float)])
            .unwrap();
        s.create_struct_syntax("b_t", vec![("y".to_string(), TypeDesc::Float)])
            .unwrap();
        let value = Value::Struct {
            type_name: "b_t".to_string(),
            members: vec![StructMember {
                name: "y".to_string(),
                type_name: "float".to_string(),
                value: Value::Float(1.0),
            }],
        };
        let err = s.value(&a, &value, false).unwrap_err();
        assert!(matches!(err, GenError::MalformedGraph(_)));
    }

    #[test]
    fn strings_render_as_int_zero() {
        let s = Syntax::hlsl();
        assert_eq!(s.type_name(&TypeDesc::String).unwrap(), "int");
        assert_eq!(
            s.value(&TypeDesc::String, &Value::String("linear".into()), false)
                .unwrap(),
            "0"
        );
    }

    #[test]
    fn enumeration_remap() {
        let s = Syntax::hlsl();
        let remapped = s
            .remap_enumeration("mode", "mirror", &TypeDesc::String, "constant, clamp, periodic, mirror")
            .unwrap();
        assert_eq!(remapped, Some((TypeDesc::Integer, Value::Integer(3))));

        assert_eq!(
            s.remap_enumeration("mode", "mirror", &TypeDesc::Integer, "a, b").unwrap(),
            None
        );
        let err = s
            .remap_enumeration("mode", "wrap", &TypeDesc::String, "clamp, periodic")
            .unwrap_err();
        assert!(matches!(err, GenError::InvalidEnumValue { .. }));
    }

    #[test]
    fn unregistered_type_is_unsupported() {
        let s = Syntax::empty();
        assert_eq!(
            s.type_name(&TypeDesc::Float),
            Err(GenError::UnsupportedType {
                type_name: "float".to_string()
            })
        );
    }

    #[test]
    fn valid_names_avoid_reserved_words_and_tokens() {
        let s = Syntax::hlsl();
        assert_eq!(s.make_valid_name("float"), "float1");
        assert_eq!(s.make_valid_name("my__node"), "my_node");
        assert_eq!(s.make_valid_name("sv_target"), "svtarget");
        assert_eq!(s.make_valid_name("base color"), "base_color");
    }

    #[test]
    fn type_definitions_follow_registration_order() {
        let s = Syntax::hlsl();
        let defs: Vec<&str> = s.type_definitions().collect();
        assert_eq!(defs[0], "struct BSDF { float3 response; float3 throughput; };");
        assert_eq!(defs[1], "#define EDF float3");
        assert_eq!(defs.last().copied(), Some("#define material surfaceshader"));
    }
}
