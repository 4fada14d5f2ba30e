use anyhow::{bail, Context, Result};
use std::fs;
use std::path::Path;

use crate::config::ImportConfig;
use crate::container::{self, ContainerParse, EntityRecord, GroupRecord};
use crate::dedup::dedup_entities;
use crate::index::AssetIndex;
use crate::resolver::{MaterialResolver, ResolutionResult};

/// Result of one import run: the decoded scene plus a fully built asset
/// index. The scene-builder consumes the records and calls back into
/// `resolve_material`/`find_mesh` while constructing its objects.
///
/// Positions and rotations are in the source engine's right-handed, Y-up
/// frame; remapping to a host convention is the consumer's job.
pub struct MapImport {
    pub groups: Vec<GroupRecord>,
    pub entities: Vec<EntityRecord>,
    /// Container records dropped because their offsets left the buffer.
    pub skipped_records: usize,
    /// Entities removed as near-duplicate placements.
    pub deduplicated: usize,
    index: AssetIndex,
    config: ImportConfig,
}

impl MapImport {
    pub fn resolver(&self) -> MaterialResolver<'_> {
        MaterialResolver::new(&self.index, &self.config)
    }

    pub fn resolve_material(&self, material_name: &str) -> Option<ResolutionResult> {
        self.resolver().resolve(material_name)
    }

    pub fn find_mesh(&self, referenced: &str) -> Option<&Path> {
        self.index.find_mesh(referenced)
    }

    pub fn index(&self) -> &AssetIndex {
        &self.index
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }
}

/// Runs the whole pipeline: parse the configured container, deduplicate
/// placements, build the asset index. Only a missing or malformed container
/// file fails the run; everything past the header degrades per record.
pub fn run_import(config: &ImportConfig) -> Result<MapImport> {
    let Some(container_path) = &config.container_path else {
        bail!("No container file configured. Pass --map or set container_path.");
    };
    let bytes = fs::read(container_path)
        .with_context(|| format!("Failed to read container {}", container_path.display()))?;
    let ContainerParse { groups, entities, skipped } = container::parse(&bytes, config)
        .with_context(|| format!("Failed to parse container {}", container_path.display()))?;
    log::info!(
        "parsed {}: {} groups, {} entities, {} skipped",
        container_path.display(),
        groups.len(),
        entities.len(),
        skipped
    );

    let (entities, deduplicated) = if config.dedup_enabled {
        dedup_entities(entities, config.dedup_precision)
    } else {
        (entities, 0)
    };
    if deduplicated > 0 {
        log::info!("removed {deduplicated} duplicate placements");
    }

    let index = AssetIndex::build(config);
    Ok(MapImport {
        groups,
        entities,
        skipped_records: skipped,
        deduplicated,
        index,
        config: config.clone(),
    })
}
