use std::collections::HashSet;

use glam::DVec3;

use crate::container::EntityRecord;

/// Collapses entities that reference the same asset at (nearly) the same
/// position. The containers repeat placements across overlapping sectors, so
/// without this pass the same prop is imported several times over.
///
/// Entities with no asset path that are not lights are structural and always
/// kept. The first occurrence of a key wins; the pass is idempotent.
pub fn dedup_entities(entities: Vec<EntityRecord>, precision: u32) -> (Vec<EntityRecord>, usize) {
    let mut seen: HashSet<DedupKey> = HashSet::new();
    let mut kept = Vec::with_capacity(entities.len());
    let mut removed = 0usize;
    for entity in entities {
        match DedupKey::for_entity(&entity, precision) {
            Some(key) => {
                if seen.insert(key) {
                    kept.push(entity);
                } else {
                    removed += 1;
                }
            }
            None => kept.push(entity),
        }
    }
    (kept, removed)
}

/// Position rounded to a fixed number of decimals (held as scaled integers so
/// the key is hashable and exact) plus the lowercased asset path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    position: [i64; 3],
    asset_path: String,
}

impl DedupKey {
    fn for_entity(entity: &EntityRecord, precision: u32) -> Option<Self> {
        let asset_path = match entity.asset_path() {
            Some(path) => path.to_lowercase(),
            None if entity.is_light() => String::new(),
            None => return None,
        };
        Some(Self { position: quantize(entity.position, precision), asset_path })
    }
}

fn quantize(position: DVec3, precision: u32) -> [i64; 3] {
    let scale = 10f64.powi(precision as i32);
    [
        (position.x * scale).round() as i64,
        (position.y * scale).round() as i64,
        (position.z * scale).round() as i64,
    ]
}
