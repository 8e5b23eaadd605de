//! Generation options.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use super::error::{GenError, GenResult};

pub const SPECULAR_ENVIRONMENT_NONE: i32 = 0;
pub const SPECULAR_ENVIRONMENT_FIS: i32 = 1;
pub const SPECULAR_ENVIRONMENT_PREFILTER: i32 = 2;

pub const TRANSMISSION_REFRACTION: i32 = 0;
pub const TRANSMISSION_OPACITY: i32 = 1;

pub const DIRECTIONAL_ALBEDO_ANALYTIC: i32 = 0;
pub const DIRECTIONAL_ALBEDO_TABLE: i32 = 1;
pub const DIRECTIONAL_ALBEDO_MONTE_CARLO: i32 = 2;

/// Read-only configuration gating optional code paths.
///
/// Method selectors are plain integers so out-of-range values coming from
/// JSON survive deserialization and are reported by [`GenOptions::validate`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenOptions {
    pub hw_lighting: bool,
    pub hw_max_active_light_sources: u32,
    pub hw_specular_environment_method: i32,
    pub hw_transmission_render_method: i32,
    pub hw_directional_albedo_method: i32,
    pub hw_airy_fresnel_iterations: u32,
    pub hw_shadow_map: bool,
    pub hw_write_depth_moments: bool,
    pub hw_write_albedo_table: bool,
    pub hw_write_env_prefilter: bool,
    pub hw_srgb_encode_output: bool,
    pub file_texture_vertical_flip: bool,
    pub hw_transparency: bool,
    pub hw_alpha_threshold: f32,
}

impl Default for GenOptions {
    fn default() -> Self {
        Self {
            hw_lighting: true,
            hw_max_active_light_sources: 3,
            hw_specular_environment_method: SPECULAR_ENVIRONMENT_FIS,
            hw_transmission_render_method: TRANSMISSION_REFRACTION,
            hw_directional_albedo_method: DIRECTIONAL_ALBEDO_ANALYTIC,
            hw_airy_fresnel_iterations: 2,
            hw_shadow_map: false,
            hw_write_depth_moments: false,
            hw_write_albedo_table: false,
            hw_write_env_prefilter: false,
            hw_srgb_encode_output: false,
            file_texture_vertical_flip: false,
            hw_transparency: false,
            hw_alpha_threshold: 0.001,
        }
    }
}

impl GenOptions {
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read options json at {}", path.display()))?;
        let options: GenOptions =
            serde_json::from_str(&text).context("failed to parse options json")?;
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> GenResult<()> {
        if !(SPECULAR_ENVIRONMENT_NONE..=SPECULAR_ENVIRONMENT_PREFILTER)
            .contains(&self.hw_specular_environment_method)
        {
            return Err(GenError::InvalidOption(format!(
                "invalid hardware specular environment method specified: '{}'",
                self.hw_specular_environment_method
            )));
        }
        if !(TRANSMISSION_REFRACTION..=TRANSMISSION_OPACITY)
            .contains(&self.hw_transmission_render_method)
        {
            return Err(GenError::InvalidOption(format!(
                "invalid transmission render specified: '{}'",
                self.hw_transmission_render_method
            )));
        }
        if !(DIRECTIONAL_ALBEDO_ANALYTIC..=DIRECTIONAL_ALBEDO_MONTE_CARLO)
            .contains(&self.hw_directional_albedo_method)
        {
            return Err(GenError::InvalidOption(format!(
                "invalid directional albedo method specified: '{}'",
                self.hw_directional_albedo_method
            )));
        }
        if !self.hw_alpha_threshold.is_finite() {
            return Err(GenError::InvalidOption(
                "alpha threshold must be a finite number".to_string(),
            ));
        }
        Ok(())
    }
}
