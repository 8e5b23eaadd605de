//! HLSL shader generation from material graphs.
//!
//! This module is organized into several submodules:
//! - `types`: Type descriptors and literal values
//! - `syntax`: HLSL type names, defaults, literals and declarations
//! - `variables`: Ports and ordered variable blocks
//! - `stage`: Per-stage sections and the stage writer
//! - `shader_graph`: Validated, topologically ordered node graphs
//! - `node_impls`: Per-category emitters
//! - `binding`: Explicit register assignment
//! - `library`: Resolution of included HLSL fragments
//! - `hlsl`: The generator tying it all together
//!
//! The main entry point is `HlslShaderGenerator::generate`.

pub mod binding;
pub mod context;
pub mod error;
pub mod hlsl;
pub mod library;
pub mod node_impls;
pub mod options;
pub mod shader;
pub mod shader_graph;
pub mod stage;
pub mod syntax;
pub mod types;
pub mod utils;
pub mod variables;

pub use binding::{BindingKind, HlslResourceBinding, ResourceBinding, ResourceBindingStrategy};
pub use context::GenContext;
pub use error::{GenError, GenResult};
pub use hlsl::HlslShaderGenerator;
pub use library::{FileLibrary, LibraryResolver, MemoryLibrary};
pub use options::GenOptions;
pub use shader::Shader;
pub use shader_graph::ShaderGraph;
pub use stage::StageKind;
pub use types::TypeDesc;
