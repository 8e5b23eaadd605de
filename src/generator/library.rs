//! Library fragment resolution.
//!
//! Include paths are relative (`pbrlib/genhlsl/lib/mx_shadow.hlsl`). The
//! built-in fragments ship with the crate; a [`FileLibrary`] can override them
//! from disk.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{trace, warn};

use super::error::{GenError, GenResult};

pub trait LibraryResolver {
    fn resolve(&self, path: &str) -> GenResult<String>;
}

macro_rules! builtin_fragment {
    ($path:literal) => {
        ($path, include_str!(concat!("../../libraries/", $path)))
    };
}

const BUILTIN_FRAGMENTS: &[(&str, &str)] = &[
    builtin_fragment!("stdlib/genhlsl/lib/mx_math.hlsl"),
    builtin_fragment!("stdlib/genhlsl/lib/mx_transform_uv.hlsl"),
    builtin_fragment!("stdlib/genhlsl/lib/mx_transform_uv_vflip.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/lib/mx_environment_fis.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/lib/mx_environment_prefilter.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/lib/mx_environment_none.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/lib/mx_transmission_refract.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/lib/mx_transmission_opacity.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/lib/mx_shadow.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/lib/mx_shadow_platform.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/lib/mx_generate_albedo_table.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/lib/mx_generate_prefilter_env.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/mx_diffuse_bsdf.hlsl"),
    builtin_fragment!("pbrlib/genhlsl/mx_specular_bsdf.hlsl"),
    builtin_fragment!("lights/genhlsl/mx_point_light.hlsl"),
    builtin_fragment!("lights/genhlsl/mx_directional_light.hlsl"),
    builtin_fragment!("lights/genhlsl/mx_spot_light.hlsl"),
];

/// Fragments held in memory, keyed by include path.
#[derive(Clone, Debug, Default)]
pub struct MemoryLibrary {
    fragments: BTreeMap<String, String>,
}

impl MemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The fragments bundled with the crate.
    pub fn builtin() -> Self {
        let mut lib = Self::new();
        for (path, text) in BUILTIN_FRAGMENTS {
            lib.insert(*path, *text);
        }
        lib
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.fragments.insert(path.into(), text.into());
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.fragments.keys().map(String::as_str)
    }
}

impl LibraryResolver for MemoryLibrary {
    fn resolve(&self, path: &str) -> GenResult<String> {
        trace!(path, "resolve in-memory fragment");
        self.fragments
            .get(path)
            .cloned()
            .ok_or_else(|| GenError::MissingLibraryFragment {
                path: path.to_string(),
            })
    }
}

/// Fragments read from disk, searched in order, with an optional in-memory fallback.
#[derive(Clone, Debug, Default)]
pub struct FileLibrary {
    search_paths: Vec<PathBuf>,
    fallback: Option<MemoryLibrary>,
}

impl FileLibrary {
    pub fn new(search_paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            search_paths: search_paths.into_iter().collect(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: MemoryLibrary) -> Self {
        self.fallback = Some(fallback);
        self
    }
}

impl LibraryResolver for FileLibrary {
    fn resolve(&self, path: &str) -> GenResult<String> {
        for root in &self.search_paths {
            let candidate = root.join(path);
            match std::fs::read_to_string(&candidate) {
                Ok(text) => {
                    trace!(path = %candidate.display(), "resolve fragment from disk");
                    return Ok(text);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %candidate.display(), error = %e, "unreadable library fragment");
                    return Err(GenError::LibraryRead {
                        path: candidate.display().to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        match &self.fallback {
            Some(lib) => lib.resolve(path),
            None => Err(GenError::MissingLibraryFragment {
                path: path.to_string(),
            }),
        }
    }
}
