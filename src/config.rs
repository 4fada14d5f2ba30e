use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::material::{MaterialLayout, TextureChannel};

/// Keyword sets that map a shader-variable name onto a texture channel.
/// Kept as data so the matching policy is configuration, not string literals
/// scattered through the parser.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelKeywords {
    #[serde(default = "ChannelKeywords::default_base")]
    pub base: Vec<String>,
    #[serde(default = "ChannelKeywords::default_normal")]
    pub normal: Vec<String>,
    #[serde(default = "ChannelKeywords::default_rough")]
    pub rough: Vec<String>,
    #[serde(default = "ChannelKeywords::default_metal")]
    pub metal: Vec<String>,
}

impl ChannelKeywords {
    fn default_base() -> Vec<String> {
        to_strings(&["base", "color", "diffuse", "albedo", "basecolor"])
    }

    fn default_normal() -> Vec<String> {
        to_strings(&["normal", "norm", "nrm"])
    }

    fn default_rough() -> Vec<String> {
        to_strings(&["rough", "roug", "roughness"])
    }

    fn default_metal() -> Vec<String> {
        to_strings(&["metal", "metallic"])
    }

    pub fn for_channel(&self, channel: TextureChannel) -> &[String] {
        match channel {
            TextureChannel::Base => &self.base,
            TextureChannel::Normal => &self.normal,
            TextureChannel::Rough => &self.rough,
            TextureChannel::Metal => &self.metal,
        }
    }
}

impl Default for ChannelKeywords {
    fn default() -> Self {
        Self {
            base: Self::default_base(),
            normal: Self::default_normal(),
            rough: Self::default_rough(),
            metal: Self::default_metal(),
        }
    }
}

/// Token tables driving the scored-heuristic resolver tier.
#[derive(Debug, Clone, Deserialize)]
pub struct HeuristicConfig {
    /// Tokens that never identify an asset on their own (type prefixes).
    #[serde(default = "HeuristicConfig::default_generic_prefixes")]
    pub generic_prefixes: Vec<String>,
    /// Broad asset-category tokens; matching one of these is weak evidence.
    #[serde(default = "HeuristicConfig::default_generic_categories")]
    pub generic_categories: Vec<String>,
    /// Zone-code prefixes (map sector identifiers embedded in names).
    #[serde(default = "HeuristicConfig::default_zone_prefixes")]
    pub zone_prefixes: Vec<String>,
    #[serde(default = "HeuristicConfig::default_score_threshold")]
    pub score_threshold: i32,
}

impl HeuristicConfig {
    fn default_generic_prefixes() -> Vec<String> {
        to_strings(&["bt", "ba", "m", "t"])
    }

    fn default_generic_categories() -> Vec<String> {
        to_strings(&["reli", "buil", "grou", "ston", "wood", "debr", "acce", "common", "module"])
    }

    fn default_zone_prefixes() -> Vec<String> {
        to_strings(&["a01"])
    }

    const fn default_score_threshold() -> i32 {
        20
    }
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            generic_prefixes: Self::default_generic_prefixes(),
            generic_categories: Self::default_generic_categories(),
            zone_prefixes: Self::default_zone_prefixes(),
            score_threshold: Self::default_score_threshold(),
        }
    }
}

/// Layout constants for the raw-vertex fragment format. The start offset is
/// an empirically discovered constant, not a header field, so it must stay
/// overridable for other revisions of the format.
#[derive(Debug, Clone, Deserialize)]
pub struct FragmentConfig {
    #[serde(default = "FragmentConfig::default_offset")]
    pub offset: usize,
    #[serde(default = "FragmentConfig::default_stride")]
    pub stride: usize,
    #[serde(default = "FragmentConfig::default_max_points")]
    pub max_points: usize,
}

impl FragmentConfig {
    const fn default_offset() -> usize {
        0x6E50
    }

    const fn default_stride() -> usize {
        16
    }

    const fn default_max_points() -> usize {
        5_000
    }
}

impl Default for FragmentConfig {
    fn default() -> Self {
        Self {
            offset: Self::default_offset(),
            stride: Self::default_stride(),
            max_points: Self::default_max_points(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ImportConfig {
    /// Scene container file to decode.
    #[serde(default)]
    pub container_path: Option<PathBuf>,
    /// Roots walked for mesh files.
    #[serde(default)]
    pub asset_roots: Vec<PathBuf>,
    /// Roots walked for texture files.
    #[serde(default)]
    pub texture_roots: Vec<PathBuf>,
    /// Roots walked for material descriptor files.
    #[serde(default)]
    pub material_roots: Vec<PathBuf>,
    /// f64 so positions (f64 throughout) scale without single-precision
    /// rounding error.
    #[serde(default = "ImportConfig::default_world_scale")]
    pub world_scale: f64,
    #[serde(default = "ImportConfig::default_light_intensity_scale")]
    pub light_intensity_scale: f32,
    #[serde(default = "ImportConfig::default_rotation_step_deg")]
    pub instance_rotation_step_deg: f32,
    #[serde(default = "ImportConfig::default_dedup_enabled")]
    pub dedup_enabled: bool,
    /// Decimal places kept when bucketing entity positions for dedup.
    /// Higher values merge less aggressively; observed useful values are 1-2.
    #[serde(default = "ImportConfig::default_dedup_precision")]
    pub dedup_precision: u32,
    #[serde(default = "ImportConfig::default_mesh_extensions")]
    pub mesh_extensions: Vec<String>,
    #[serde(default = "ImportConfig::default_texture_extensions")]
    pub texture_extensions: Vec<String>,
    /// Directory names never descended into while indexing.
    #[serde(default = "ImportConfig::default_index_blacklist")]
    pub index_blacklist: Vec<String>,
    /// Semantic suffixes stripped when building texture-index aliases.
    #[serde(default = "ImportConfig::default_alias_suffixes")]
    pub alias_suffixes: Vec<String>,
    /// Suffixes that mark a base-color texture key.
    #[serde(default = "ImportConfig::default_base_color_suffixes")]
    pub base_color_suffixes: Vec<String>,
    /// Header revision of the material files in the asset dump.
    #[serde(default)]
    pub material_layout: MaterialLayout,
    #[serde(default)]
    pub channel_keywords: ChannelKeywords,
    #[serde(default)]
    pub heuristic: HeuristicConfig,
    #[serde(default)]
    pub fragment: FragmentConfig,
}

impl ImportConfig {
    fn default_world_scale() -> f64 {
        0.01
    }

    fn default_light_intensity_scale() -> f32 {
        100.0
    }

    fn default_rotation_step_deg() -> f32 {
        0.01
    }

    const fn default_dedup_enabled() -> bool {
        true
    }

    const fn default_dedup_precision() -> u32 {
        2
    }

    fn default_mesh_extensions() -> Vec<String> {
        to_strings(&["gltf", "glb"])
    }

    fn default_texture_extensions() -> Vec<String> {
        to_strings(&["png", "dds"])
    }

    fn default_index_blacklist() -> Vec<String> {
        to_strings(&["sound", "movie", "ui", "vfx", "chara", "animation", "cut", "shader"])
    }

    fn default_alias_suffixes() -> Vec<String> {
        to_strings(&[
            "_base", "_diffuse", "_albedo", "_color", "_norm", "_normal", "_nrm", "_rough",
            "_roughness", "_roug", "_metal", "_metallic", "_heig", "_height",
        ])
    }

    fn default_base_color_suffixes() -> Vec<String> {
        to_strings(&["_base", "_diffuse", "_albedo", "_color"])
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read config file {}", path.display()))?;
        let cfg = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(cfg)
    }

    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(cfg) => cfg,
            Err(err) => {
                log::warn!("config load error: {err:?}; falling back to defaults");
                Self::default()
            }
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ImportOverrides) {
        if let Some(container) = &overrides.container_path {
            self.container_path = Some(container.clone());
        }
        if !overrides.asset_roots.is_empty() {
            self.asset_roots = overrides.asset_roots.clone();
        }
        if !overrides.texture_roots.is_empty() {
            self.texture_roots = overrides.texture_roots.clone();
        }
        if !overrides.material_roots.is_empty() {
            self.material_roots = overrides.material_roots.clone();
        }
        if let Some(precision) = overrides.dedup_precision {
            self.dedup_precision = precision;
        }
        if let Some(dedup) = overrides.dedup {
            self.dedup_enabled = dedup;
        }
    }
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            container_path: None,
            asset_roots: Vec::new(),
            texture_roots: Vec::new(),
            material_roots: Vec::new(),
            world_scale: Self::default_world_scale(),
            light_intensity_scale: Self::default_light_intensity_scale(),
            instance_rotation_step_deg: Self::default_rotation_step_deg(),
            dedup_enabled: Self::default_dedup_enabled(),
            dedup_precision: Self::default_dedup_precision(),
            mesh_extensions: Self::default_mesh_extensions(),
            texture_extensions: Self::default_texture_extensions(),
            index_blacklist: Self::default_index_blacklist(),
            alias_suffixes: Self::default_alias_suffixes(),
            base_color_suffixes: Self::default_base_color_suffixes(),
            material_layout: MaterialLayout::default(),
            channel_keywords: ChannelKeywords::default(),
            heuristic: HeuristicConfig::default(),
            fragment: FragmentConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOverrides {
    pub container_path: Option<PathBuf>,
    pub asset_roots: Vec<PathBuf>,
    pub texture_roots: Vec<PathBuf>,
    pub material_roots: Vec<PathBuf>,
    pub dedup_precision: Option<u32>,
    pub dedup: Option<bool>,
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_all_tables() {
        let cfg = ImportConfig::default();
        assert!(cfg.dedup_enabled);
        assert_eq!(cfg.dedup_precision, 2);
        assert!((cfg.world_scale - 0.01).abs() < f64::EPSILON);
        assert!(cfg.channel_keywords.base.contains(&"albedo".to_string()));
        assert!(cfg.alias_suffixes.contains(&"_height".to_string()));
        assert_eq!(cfg.fragment.offset, 0x6E50);
    }

    #[test]
    fn overrides_replace_roots_and_knobs() {
        let mut cfg = ImportConfig::default();
        let overrides = ImportOverrides {
            container_path: Some(PathBuf::from("stage/zone.mpb")),
            texture_roots: vec![PathBuf::from("converted")],
            dedup_precision: Some(3),
            dedup: Some(false),
            ..Default::default()
        };
        cfg.apply_overrides(&overrides);
        assert_eq!(cfg.container_path.as_deref(), Some(Path::new("stage/zone.mpb")));
        assert_eq!(cfg.texture_roots, vec![PathBuf::from("converted")]);
        assert_eq!(cfg.dedup_precision, 3);
        assert!(!cfg.dedup_enabled);
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: ImportConfig =
            serde_json::from_str(r#"{"dedup_precision": 1, "texture_roots": ["tex"]}"#)
                .expect("parse config");
        assert_eq!(cfg.dedup_precision, 1);
        assert_eq!(cfg.texture_roots, vec![PathBuf::from("tex")]);
        assert!((cfg.light_intensity_scale - 100.0).abs() < f32::EPSILON);
    }
}
