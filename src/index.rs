use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::ImportConfig;
use crate::material::MaterialDescriptor;

/// In-memory lookup tables over the asset dump, built by one directory walk
/// per concern and immutable afterwards. Collisions resolve to the first
/// occurrence in canonical (sorted) path order, so the index is identical no
/// matter how the filesystem enumerates entries.
pub struct AssetIndex {
    meshes: HashMap<String, PathBuf>,
    // BTreeMap: the scored resolver tier iterates texture keys and breaks
    // ties by first key, which must be a stable order.
    textures: BTreeMap<String, PathBuf>,
    materials: HashMap<String, MaterialDescriptor>,
    texture_files: usize,
}

impl AssetIndex {
    pub fn build(config: &ImportConfig) -> Self {
        let mut index = Self {
            meshes: HashMap::new(),
            textures: BTreeMap::new(),
            materials: HashMap::new(),
            texture_files: 0,
        };
        index.index_meshes(config);
        index.index_textures(config);
        index.index_materials(config);
        log::info!(
            "indexed {} meshes, {} textures ({} lookup keys), {} materials",
            index.meshes.len(),
            index.texture_files,
            index.textures.len(),
            index.materials.len()
        );
        index
    }

    fn index_meshes(&mut self, config: &ImportConfig) {
        for file in collect_files(&config.asset_roots, &config.mesh_extensions, &config.index_blacklist)
        {
            if let Some(stem) = file_stem_lower(&file) {
                self.meshes.entry(stem).or_insert(file);
            }
        }
    }

    fn index_textures(&mut self, config: &ImportConfig) {
        for file in
            collect_files(&config.texture_roots, &config.texture_extensions, &config.index_blacklist)
        {
            let Some(stem) = file_stem_lower(&file) else { continue };
            self.texture_files += 1;
            self.alias_texture(&stem, &file);
            // Aliases absorb the naming inconsistency of the dump: the same
            // file stays reachable without its `t_` prefix and without its
            // semantic suffix.
            if let Some(bare) = stem.strip_prefix("t_") {
                self.alias_texture(bare, &file);
            }
            for suffix in &config.alias_suffixes {
                if let Some(base) = stem.strip_suffix(suffix.as_str()) {
                    self.alias_texture(base, &file);
                    if let Some(bare) = base.strip_prefix("t_") {
                        self.alias_texture(bare, &file);
                    }
                    break;
                }
            }
        }
    }

    fn alias_texture(&mut self, key: &str, file: &Path) {
        if key.is_empty() {
            return;
        }
        self.textures.entry(key.to_string()).or_insert_with(|| file.to_path_buf());
    }

    fn index_materials(&mut self, config: &ImportConfig) {
        let mut failures = 0usize;
        for file in collect_files(&config.material_roots, &["mtl".to_string()], &config.index_blacklist)
        {
            match read_material(&file, config) {
                Ok(descriptor) => {
                    let Some(stem) = file_stem_lower(&file) else { continue };
                    let key = stem.strip_prefix("m_").unwrap_or(&stem).to_string();
                    self.materials.entry(key).or_insert(descriptor);
                }
                Err(err) => {
                    failures += 1;
                    log::debug!("skipping material {}: {err:#}", file.display());
                }
            }
        }
        if failures > 0 {
            log::warn!("{failures} material files could not be parsed");
        }
    }

    /// Looks up a mesh by referenced path: exact stem first, then the LOD
    /// aliases the dump uses for the same geometry.
    pub fn find_mesh(&self, referenced: &str) -> Option<&Path> {
        let stem = referenced_stem(referenced)?;
        for candidate in [stem.clone(), format!("{stem}_lod0"), format!("{stem}_0")] {
            if let Some(path) = self.meshes.get(&candidate) {
                return Some(path);
            }
        }
        None
    }

    pub fn texture(&self, key: &str) -> Option<&Path> {
        self.textures.get(key).map(PathBuf::as_path)
    }

    /// Texture keys in stable sorted order, for the scored resolver tier.
    pub fn texture_entries(&self) -> impl Iterator<Item = (&str, &Path)> {
        self.textures.iter().map(|(key, path)| (key.as_str(), path.as_path()))
    }

    pub fn material(&self, normalized_name: &str) -> Option<&MaterialDescriptor> {
        self.materials.get(normalized_name)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn texture_file_count(&self) -> usize {
        self.texture_files
    }

    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}

fn read_material(path: &Path, config: &ImportConfig) -> Result<MaterialDescriptor> {
    let bytes =
        fs::read(path).with_context(|| format!("Failed to read material {}", path.display()))?;
    MaterialDescriptor::parse(&bytes, config.material_layout)
        .with_context(|| format!("Failed to parse material {}", path.display()))
}

/// Stem of the path a binary record references, tolerant of backslash
/// separators and the `.ter` terrain alias for mesh files.
fn referenced_stem(referenced: &str) -> Option<String> {
    let normalized = referenced.replace('\\', "/").to_lowercase();
    let remapped = match normalized.strip_suffix(".ter") {
        Some(base) => format!("{base}.mdl"),
        None => normalized,
    };
    let name = remapped.rsplit('/').next()?;
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    (!stem.is_empty()).then(|| stem.to_string())
}

fn file_stem_lower(path: &Path) -> Option<String> {
    path.file_stem().and_then(|stem| stem.to_str()).map(str::to_lowercase)
}

/// Walks every root once, collecting files with a matching extension while
/// refusing to descend into blacklisted directory names. The result is
/// sorted so downstream first-wins keying is reproducible.
fn collect_files(roots: &[PathBuf], extensions: &[String], blacklist: &[String]) -> Vec<PathBuf> {
    let mut out = Vec::new();
    for root in roots {
        if !root.exists() {
            log::warn!("index root not found: {}", root.display());
            continue;
        }
        if let Err(err) = walk(root, extensions, blacklist, &mut out) {
            log::warn!("walk failed under {}: {err:#}", root.display());
        }
    }
    out.sort();
    out
}

fn walk(dir: &Path, extensions: &[String], blacklist: &[String], out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in fs::read_dir(dir).with_context(|| format!("Reading '{}'", dir.display()))? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            let name = entry.file_name().to_string_lossy().to_lowercase();
            if blacklist.iter().any(|skip| skip == &name) {
                continue;
            }
            walk(&path, extensions, blacklist, out)?;
        } else if let Some(ext) = path.extension().and_then(|ext| ext.to_str()) {
            let ext = ext.to_lowercase();
            if extensions.iter().any(|wanted| wanted == &ext) {
                out.push(path);
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        File::create(path).expect("create file");
    }

    fn config_for(root: &Path) -> ImportConfig {
        ImportConfig {
            asset_roots: vec![root.join("models")],
            texture_roots: vec![root.join("textures")],
            material_roots: vec![root.join("materials")],
            ..Default::default()
        }
    }

    #[test]
    fn texture_aliases_cover_prefix_and_suffix_variants() {
        let dir = tempdir().expect("temp dir");
        let tex = dir.path().join("textures/t_stonewall_base.png");
        touch(&tex);
        let index = AssetIndex::build(&config_for(dir.path()));

        for key in ["t_stonewall_base", "stonewall_base", "t_stonewall", "stonewall"] {
            assert_eq!(index.texture(key), Some(tex.as_path()), "missing alias {key}");
        }
        assert_eq!(index.texture_file_count(), 1);
    }

    #[test]
    fn mesh_lookup_tries_lod_aliases_and_terrain_remap() {
        let dir = tempdir().expect("temp dir");
        let lod = dir.path().join("models/zone/b_cliff02_lod0.gltf");
        touch(&lod);
        let index = AssetIndex::build(&config_for(dir.path()));

        assert_eq!(index.find_mesh("env\\zone\\b_cliff02.mdl"), Some(lod.as_path()));
        assert_eq!(index.find_mesh("env/zone/b_cliff02.ter"), Some(lod.as_path()));
        assert_eq!(index.find_mesh("b_cliff02_lod0.mdl"), Some(lod.as_path()));
        assert_eq!(index.find_mesh("missing.mdl"), None);
    }

    #[test]
    fn blacklisted_directories_are_not_walked() {
        let dir = tempdir().expect("temp dir");
        touch(&dir.path().join("textures/wall_base.png"));
        touch(&dir.path().join("textures/ui/icon_base.png"));
        let index = AssetIndex::build(&config_for(dir.path()));
        assert_eq!(index.texture_file_count(), 1);
        assert!(index.texture("icon").is_none());
    }

    #[test]
    fn missing_roots_yield_empty_index() {
        let dir = tempdir().expect("temp dir");
        let index = AssetIndex::build(&config_for(dir.path()));
        assert_eq!(index.mesh_count(), 0);
        assert_eq!(index.texture_file_count(), 0);
        assert_eq!(index.material_count(), 0);
    }

    #[test]
    fn key_collisions_resolve_to_first_sorted_path() {
        let dir = tempdir().expect("temp dir");
        let first = dir.path().join("textures/a/wall_base.png");
        let second = dir.path().join("textures/b/wall_base.png");
        // Create in reverse order; the sorted walk must still prefer `a/`.
        touch(&second);
        touch(&first);
        let index = AssetIndex::build(&config_for(dir.path()));
        assert_eq!(index.texture("wall_base"), Some(first.as_path()));
    }
}
