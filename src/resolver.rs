use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::ImportConfig;
use crate::index::AssetIndex;
use crate::material::TextureChannel;

/// How a texture binding was found. Kept on every result so an import report
/// can say which materials relied on guesswork.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    /// The material's own descriptor file named the texture.
    DirectDescriptor,
    /// `<material>_<base-color-suffix>` existed in the texture index.
    ExactSuffixMatch,
    /// Best-scoring fuzzy candidate over the texture index.
    ScoredHeuristic,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Provenance::DirectDescriptor => "direct-descriptor",
            Provenance::ExactSuffixMatch => "exact-suffix",
            Provenance::ScoredHeuristic => "scored-heuristic",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionResult {
    pub texture_path: PathBuf,
    pub provenance: Provenance,
}

/// Maps material names to base-color texture files. Three strategies run in
/// strict priority order; the first hit wins and an unresolved name is a
/// valid outcome, not an error. Stateless over a built index, so results are
/// identical across repeated calls.
pub struct MaterialResolver<'a> {
    index: &'a AssetIndex,
    config: &'a ImportConfig,
}

impl<'a> MaterialResolver<'a> {
    pub fn new(index: &'a AssetIndex, config: &'a ImportConfig) -> Self {
        Self { index, config }
    }

    pub fn resolve(&self, material_name: &str) -> Option<ResolutionResult> {
        let name = normalize_name(material_name);

        if let Some(path) = self.resolve_descriptor(&name) {
            return Some(ResolutionResult {
                texture_path: path.to_path_buf(),
                provenance: Provenance::DirectDescriptor,
            });
        }
        if let Some(path) = self.resolve_suffix(&name) {
            return Some(ResolutionResult {
                texture_path: path.to_path_buf(),
                provenance: Provenance::ExactSuffixMatch,
            });
        }
        self.resolve_scored(&name).map(|path| ResolutionResult {
            texture_path: path.to_path_buf(),
            provenance: Provenance::ScoredHeuristic,
        })
    }

    /// Tier 1: the material's descriptor names its base texture; confirm the
    /// referenced file actually exists in the index before trusting it.
    fn resolve_descriptor(&self, name: &str) -> Option<&Path> {
        let descriptor = self.index.material(name)?;
        let referenced = descriptor.texture(TextureChannel::Base, &self.config.channel_keywords)?;
        self.index.texture(&path_stem_lower(referenced))
    }

    /// Tier 2: `<name>_base` and friends, first suffix that hits.
    fn resolve_suffix(&self, name: &str) -> Option<&Path> {
        self.config
            .base_color_suffixes
            .iter()
            .find_map(|suffix| self.index.texture(&format!("{name}{suffix}")))
    }

    /// Tier 3: score every base-color texture key against an identifier
    /// token pulled out of the material name. Ties resolve to the first key
    /// in the index's sorted iteration order.
    fn resolve_scored(&self, name: &str) -> Option<&Path> {
        let identifier = self.extract_identifier(name);
        let technical_type = technical_type(name);

        let mut best: Option<(i32, &Path)> = None;
        for (key, path) in self.index.texture_entries() {
            if !self.config.base_color_suffixes.iter().any(|suffix| key.ends_with(suffix.as_str()))
            {
                continue;
            }
            let score = self.score_candidate(key, &identifier, technical_type.as_deref());
            if score > self.config.heuristic.score_threshold
                && best.map_or(true, |(top, _)| score > top)
            {
                best = Some((score, path));
            }
        }
        let (score, path) = best?;
        log::debug!("heuristic match '{name}' -> {} (score {score})", path.display());
        Some(path)
    }

    fn score_candidate(&self, key: &str, identifier: &str, technical_type: Option<&str>) -> i32 {
        let mut score = 0;
        if key.contains(&format!("_{identifier}_")) || key.ends_with(&format!("_{identifier}")) {
            score += 60;
        } else if key.contains(identifier) {
            score += 30;
        }
        if let Some(tech) = technical_type {
            if tech.len() > 3 && key.contains(&format!("_{tech}")) {
                score += 20;
            }
        }
        let off_category = self
            .config
            .heuristic
            .generic_categories
            .iter()
            .filter(|cat| technical_type != Some(cat.as_str()))
            .any(|cat| key.contains(&format!("_{cat}_")));
        if off_category {
            score -= 10;
        }
        score
    }

    /// Drops type prefixes, broad category words, zone codes, bare numbers
    /// and sub-3-character fragments; the last surviving token is what most
    /// plausibly names the asset itself. Falls back to the whole name.
    fn extract_identifier(&self, name: &str) -> String {
        let heuristic = &self.config.heuristic;
        let survivor = name
            .split('_')
            .filter(|token| {
                !heuristic.generic_prefixes.iter().any(|p| p == token)
                    && !heuristic.generic_categories.iter().any(|c| c == token)
                    && !heuristic.zone_prefixes.iter().any(|z| token.starts_with(z.as_str()))
            })
            .filter(|token| token.len() > 2 && !token.chars().all(|ch| ch.is_ascii_digit()))
            .last();
        survivor.unwrap_or(name).to_string()
    }
}

fn normalize_name(material_name: &str) -> String {
    let lowered = material_name.to_lowercase();
    lowered.strip_prefix("m_").unwrap_or(&lowered).to_string()
}

/// Stem of a texture path as referenced inside a descriptor, which may use
/// either separator style.
fn path_stem_lower(referenced: &str) -> String {
    let normalized = referenced.replace('\\', "/").to_lowercase();
    let name = normalized.rsplit('/').next().unwrap_or(&normalized);
    name.rsplit_once('.').map_or(name, |(stem, _)| stem).to_string()
}

/// Last `_`-separated segment with trailing digits stripped; empty input and
/// single-segment names have no technical type.
fn technical_type(name: &str) -> Option<String> {
    let parts: Vec<&str> = name.split('_').collect();
    if parts.len() < 2 {
        return None;
    }
    let trimmed = parts.last()?.trim_end_matches(|ch: char| ch.is_ascii_digit());
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalization_strips_material_prefix() {
        assert_eq!(normalize_name("M_CastleWall01"), "castlewall01");
        assert_eq!(normalize_name("stone"), "stone");
    }

    #[test]
    fn descriptor_paths_reduce_to_stems() {
        assert_eq!(path_stem_lower("textures\\env\\T_Wall01_Base.tex"), "t_wall01_base");
        assert_eq!(path_stem_lower("wall"), "wall");
    }

    #[test]
    fn identifier_skips_generic_and_zone_tokens() {
        let cfg = ImportConfig::default();
        let index = AssetIndex::build(&cfg);
        let resolver = MaterialResolver::new(&index, &cfg);
        assert_eq!(resolver.extract_identifier("bt_a01_ston_crackwall_01"), "crackwall");
        assert_eq!(resolver.extract_identifier("bt_01"), "bt_01");
    }

    #[test]
    fn technical_type_requires_multiple_segments() {
        assert_eq!(technical_type("castle_wall01"), Some("wall".to_string()));
        assert_eq!(technical_type("wall01"), None);
        assert_eq!(technical_type("castle_01"), None);
    }

    #[test]
    fn scoring_prefers_delimited_identifier() {
        let cfg = ImportConfig::default();
        let index = AssetIndex::build(&cfg);
        let resolver = MaterialResolver::new(&index, &cfg);
        let delimited = resolver.score_candidate("t_a01_crackwall_base", "crackwall", None);
        let substring = resolver.score_candidate("t_crackwallish_base", "crackwall", None);
        assert_eq!(delimited, 60);
        assert_eq!(substring, 30);
    }

    #[test]
    fn scoring_penalizes_off_category_keys() {
        let cfg = ImportConfig::default();
        let index = AssetIndex::build(&cfg);
        let resolver = MaterialResolver::new(&index, &cfg);
        // "wood" is a generic category and not this material's technical type.
        let penalized = resolver.score_candidate("t_wood_crackwall_base", "crackwall", Some("wall"));
        assert_eq!(penalized, 60 - 10);
    }

    #[test]
    fn scoring_adds_technical_type_bonus_when_present() {
        let cfg = ImportConfig::default();
        let index = AssetIndex::build(&cfg);
        let resolver = MaterialResolver::new(&index, &cfg);
        // The key carries both the identifier and a "_wall" segment, so the
        // technical-type bonus stacks on top of the identity match.
        let boosted =
            resolver.score_candidate("t_wood_wall_crackwall_base", "crackwall", Some("wall"));
        assert_eq!(boosted, 60 + 20 - 10);
        // Types of three characters or fewer never add the bonus.
        let short = resolver.score_candidate("t_ab_crackwall_base", "crackwall", Some("ab"));
        assert_eq!(short, 60);
    }
}
