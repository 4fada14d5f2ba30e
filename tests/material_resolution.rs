use std::fs;
use std::path::Path;

use mapbin::config::ImportConfig;
use mapbin::index::AssetIndex;
use mapbin::resolver::{MaterialResolver, Provenance};
use tempfile::tempdir;

/// Extended-layout material file with one base-color slot.
fn build_material(base_texture: &str) -> Vec<u8> {
    let entries_base = 0x28usize;
    let string_table = (entries_base + 8).div_ceil(16) * 16;

    let mut strings: Vec<u8> = Vec::new();
    let path_off = strings.len() as u32;
    strings.extend_from_slice(base_texture.as_bytes());
    strings.push(0);
    let var_off = strings.len() as u32;
    strings.extend_from_slice(b"BaseColor0\0");

    let mut data = vec![0u8; string_table + strings.len()];
    data[0..4].copy_from_slice(b"MTL ");
    data[16..18].copy_from_slice(&1u16.to_le_bytes());
    data[entries_base..entries_base + 4].copy_from_slice(&path_off.to_le_bytes());
    data[entries_base + 4..entries_base + 8].copy_from_slice(&var_off.to_le_bytes());
    data[string_table..string_table + strings.len()].copy_from_slice(&strings);
    data
}

fn write_file(path: &Path, bytes: &[u8]) {
    fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
    fs::write(path, bytes).expect("write file");
}

fn config_for(root: &Path) -> ImportConfig {
    ImportConfig {
        texture_roots: vec![root.join("textures")],
        material_roots: vec![root.join("materials")],
        ..Default::default()
    }
}

#[test]
fn descriptor_tier_outranks_suffix_tier() {
    let dir = tempdir().expect("temp dir");
    // The descriptor points at the stone texture even though a texture named
    // after the material itself also exists.
    write_file(
        &dir.path().join("materials/m_wall01.mtl"),
        &build_material("textures\\t_stone_base.tex"),
    );
    let stone = dir.path().join("textures/t_stone_base.png");
    write_file(&stone, b"");
    write_file(&dir.path().join("textures/wall01_base.png"), b"");

    let config = config_for(dir.path());
    let index = AssetIndex::build(&config);
    let resolver = MaterialResolver::new(&index, &config);

    let result = resolver.resolve("M_Wall01").expect("resolution");
    assert_eq!(result.provenance, Provenance::DirectDescriptor);
    assert_eq!(result.texture_path, stone);
}

#[test]
fn suffix_tier_matches_material_name_directly() {
    let dir = tempdir().expect("temp dir");
    let tex = dir.path().join("textures/castlegate_albedo.png");
    write_file(&tex, b"");

    let config = config_for(dir.path());
    let index = AssetIndex::build(&config);
    let resolver = MaterialResolver::new(&index, &config);

    let result = resolver.resolve("m_castlegate").expect("resolution");
    assert_eq!(result.provenance, Provenance::ExactSuffixMatch);
    assert_eq!(result.texture_path, tex);
}

#[test]
fn scored_tier_finds_shared_identifier() {
    let dir = tempdir().expect("temp dir");
    let tex = dir.path().join("textures/t_zone_crackwall_base.png");
    write_file(&tex, b"");
    write_file(&dir.path().join("textures/t_unrelated_base.png"), b"");

    let config = config_for(dir.path());
    let index = AssetIndex::build(&config);
    let resolver = MaterialResolver::new(&index, &config);

    let result = resolver.resolve("m_bt_a01_ston_crackwall_01").expect("resolution");
    assert_eq!(result.provenance, Provenance::ScoredHeuristic);
    assert_eq!(result.texture_path, tex);
}

#[test]
fn unresolvable_material_returns_none() {
    let dir = tempdir().expect("temp dir");
    write_file(&dir.path().join("textures/t_unrelated_base.png"), b"");

    let config = config_for(dir.path());
    let index = AssetIndex::build(&config);
    let resolver = MaterialResolver::new(&index, &config);
    assert!(resolver.resolve("m_nothing_matches_this").is_none());
}

#[test]
fn resolution_is_deterministic_across_calls() {
    let dir = tempdir().expect("temp dir");
    write_file(&dir.path().join("textures/t_zone_crackwall_base.png"), b"");
    write_file(&dir.path().join("textures/t_other_crackwall_base.png"), b"");

    let config = config_for(dir.path());
    let index = AssetIndex::build(&config);
    let resolver = MaterialResolver::new(&index, &config);

    let first = resolver.resolve("crackwall").expect("resolution");
    for _ in 0..5 {
        assert_eq!(resolver.resolve("crackwall").as_ref(), Some(&first));
    }
}

#[test]
fn unparseable_material_files_are_skipped() {
    let dir = tempdir().expect("temp dir");
    write_file(&dir.path().join("materials/m_broken.mtl"), b"JUNKJUNKJUNK");
    write_file(
        &dir.path().join("materials/m_wall01.mtl"),
        &build_material("textures\\t_stone_base.tex"),
    );

    let config = config_for(dir.path());
    let index = AssetIndex::build(&config);
    assert_eq!(index.material_count(), 1);
    assert!(index.material("wall01").is_some());
    assert!(index.material("broken").is_none());
}
