use anyhow::{Context, Result};
use glam::{DVec3, Vec3};
use std::collections::BTreeSet;

use crate::config::ImportConfig;
use crate::cursor::Cursor;

pub const TYPE_FILE_REF: u32 = 1002;
pub const TYPE_INSTANCE_LIST: u32 = 1015;
pub const TYPE_MESH: u32 = 1028;
pub const TYPE_LIGHT: u32 = 2001;
pub const TYPE_POINT_CLOUD: u32 = 5001;

const GROUP_ENTRY_STRIDE: usize = 0x30;
const ENTITY_GROUP_STRIDE: usize = 0x3C;
const LIGHT_SUB_RECORD: usize = 0x50;
const LIGHT_SUB_RECORD_LEN: usize = 0x40;
const FILE_SUB_RECORD: usize = 0x50;

/// A flat parent bucket for entities. Groups carry nothing but their id; the
/// hierarchy is expressed solely through entity parent references.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupRecord {
    pub id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Point,
    Spot,
    Sun,
    Area,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LightParams {
    pub kind: LightKind,
    /// Normalised channels in [0, 1].
    pub color_rgb: Vec3,
    pub intensity: f32,
    pub range: f32,
    pub raw_type_code: i32,
    pub raw_color_word: u32,
    pub shaking_param_id: i32,
    /// Float slots whose meaning is not reverse-engineered; carried verbatim.
    pub extra_floats: [f32; 6],
}

/// Dispatch variant decoded from the entity's type code. Adding a new code
/// means adding a variant here and handling it wherever entities are matched.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityKind {
    /// 1028: references a mesh file.
    Mesh { path: String },
    /// 1015: references an instance-table file.
    InstanceList { path: String },
    /// 5001: references a raw-vertex fragment file.
    PointCloud { path: String },
    /// 1002: file-bearing, purpose unknown; the path is preserved.
    FileRef { path: String },
    /// 2001: light source. `None` when the sub-record was truncated.
    Light { params: Option<LightParams> },
    /// Any type code this importer does not decode further.
    Other,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub type_code: u32,
    pub kind: EntityKind,
    /// Position in the source engine's right-handed, Y-up frame.
    pub position: DVec3,
    /// Euler rotation, radians, same frame as `position`.
    pub rotation: Vec3,
    pub uniform_scale: f32,
    pub parent_group_id: i32,
    /// Absolute byte offset of the record; stable identity for diagnostics.
    pub raw_offset: usize,
}

impl EntityRecord {
    /// The referenced asset path for file-bearing kinds; empty paths (a
    /// present but truncated sub-record) count as absent.
    pub fn asset_path(&self) -> Option<&str> {
        let path = match &self.kind {
            EntityKind::Mesh { path }
            | EntityKind::InstanceList { path }
            | EntityKind::PointCloud { path }
            | EntityKind::FileRef { path } => path.as_str(),
            EntityKind::Light { .. } | EntityKind::Other => return None,
        };
        (!path.is_empty()).then_some(path)
    }

    pub fn is_light(&self) -> bool {
        self.type_code == TYPE_LIGHT
    }

    pub fn light(&self) -> Option<&LightParams> {
        match &self.kind {
            EntityKind::Light { params } => params.as_ref(),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ContainerParse {
    pub groups: Vec<GroupRecord>,
    pub entities: Vec<EntityRecord>,
    /// Records dropped because their offsets left the buffer.
    pub skipped: usize,
}

/// Decodes a scene container: group table, entity groups, entity offset
/// tables, entity records. A malformed header fails the whole file; any
/// single bad record is skipped and counted, never aborting the parse.
pub fn parse(data: &[u8], config: &ImportConfig) -> Result<ContainerParse> {
    let cursor = Cursor::new(data);
    let group_table = cursor.read_u32(4).context("container header truncated")? as usize;
    let group_count = cursor.read_u32(8).context("container header truncated")? as usize;
    log::debug!("container: {group_count} group entries at {group_table:#x}");

    let mut parse = ContainerParse::default();
    let mut group_ids: BTreeSet<i32> = BTreeSet::new();

    for index in 0..group_count {
        let entry = group_table + index * GROUP_ENTRY_STRIDE;
        let header = cursor.read_u32(entry + 0x28).and_then(|rel| {
            let count = cursor.read_u32(entry + 0x2C)?;
            Ok((rel as usize, count as usize))
        });
        let Ok((list_rel, list_count)) = header else {
            parse.skipped += 1;
            continue;
        };
        let list_base = entry + list_rel;

        for slot in 0..list_count {
            let group_entry = list_base + slot * ENTITY_GROUP_STRIDE;
            if parse_entity_group(&cursor, group_entry, config, &mut parse, &mut group_ids).is_err() {
                parse.skipped += 1;
            }
        }
    }

    parse.groups = group_ids.into_iter().map(|id| GroupRecord { id }).collect();
    log::debug!(
        "container: {} entities across {} groups ({} records skipped)",
        parse.entities.len(),
        parse.groups.len(),
        parse.skipped
    );
    Ok(parse)
}

fn parse_entity_group(
    cursor: &Cursor<'_>,
    entry: usize,
    config: &ImportConfig,
    parse: &mut ContainerParse,
    group_ids: &mut BTreeSet<i32>,
) -> Result<()> {
    let group_id = cursor.read_i32(entry + 4)?;
    group_ids.insert(group_id);

    let table_rel = cursor.read_u32(entry + 0x10)? as usize;
    let entity_count = cursor.read_u32(entry + 0x14)? as usize;
    let table_base = entry + table_rel;

    for index in 0..entity_count {
        let slot = table_base + index * 4;
        let Ok(rel) = cursor.read_i32(slot) else {
            parse.skipped += 1;
            continue;
        };
        let address = table_base as i64 + rel as i64;
        if address < 0 || address as usize >= cursor.len() {
            parse.skipped += 1;
            continue;
        }
        match decode_entity(cursor, address as usize, config) {
            Ok(entity) => parse.entities.push(entity),
            Err(_) => parse.skipped += 1,
        }
    }
    Ok(())
}

fn decode_entity(cursor: &Cursor<'_>, offset: usize, config: &ImportConfig) -> Result<EntityRecord> {
    let type_code = cursor.read_u32(offset + 4)?;
    let parent_group_id = cursor.read_i32(offset + 0x0C)?;
    let position = DVec3::new(
        cursor.read_f64(offset + 0x10)?,
        cursor.read_f64(offset + 0x18)?,
        cursor.read_f64(offset + 0x20)?,
    );
    let rotation = Vec3::new(
        cursor.read_f32(offset + 0x28)?,
        cursor.read_f32(offset + 0x2C)?,
        cursor.read_f32(offset + 0x30)?,
    );
    let uniform_scale = cursor.read_f32(offset + 0x34)?;

    let kind = match type_code {
        TYPE_MESH => EntityKind::Mesh { path: read_file_path(cursor, offset) },
        TYPE_INSTANCE_LIST => EntityKind::InstanceList { path: read_file_path(cursor, offset) },
        TYPE_POINT_CLOUD => EntityKind::PointCloud { path: read_file_path(cursor, offset) },
        TYPE_FILE_REF => EntityKind::FileRef { path: read_file_path(cursor, offset) },
        TYPE_LIGHT => EntityKind::Light { params: decode_light(cursor, offset, config) },
        _ => EntityKind::Other,
    };

    Ok(EntityRecord {
        type_code,
        kind,
        position,
        rotation,
        uniform_scale,
        parent_group_id,
        raw_offset: offset,
    })
}

/// File-bearing records carry a signed path offset at +0x54, relative to the
/// sub-record base at +0x50. A truncated sub-record degrades to an empty
/// path rather than dropping the whole entity.
fn read_file_path(cursor: &Cursor<'_>, entity_offset: usize) -> String {
    let sub_record = entity_offset + FILE_SUB_RECORD;
    match cursor.read_i32(sub_record + 4) {
        Ok(rel) => {
            let address = sub_record as i64 + rel as i64;
            if address < 0 {
                return String::new();
            }
            cursor.read_cstring(address as usize)
        }
        Err(_) => String::new(),
    }
}

fn decode_light(cursor: &Cursor<'_>, entity_offset: usize, config: &ImportConfig) -> Option<LightParams> {
    let base = entity_offset + LIGHT_SUB_RECORD;
    if base + LIGHT_SUB_RECORD_LEN > cursor.len() {
        return None;
    }

    let raw_type_code = cursor.read_i32(base).ok()?;
    let raw_color_word = cursor.read_u32(base + 4).ok()?;
    let extra_floats = [
        cursor.read_f32(base + 0x14).ok()?,
        cursor.read_f32(base + 0x18).ok()?,
        cursor.read_f32(base + 0x1C).ok()?,
        cursor.read_f32(base + 0x20).ok()?,
        cursor.read_f32(base + 0x28).ok()?,
        cursor.read_f32(base + 0x2C).ok()?,
    ];
    let shaking_param_id = cursor.read_i32(base + 0x34).ok()?;

    Some(LightParams {
        kind: light_kind(raw_type_code),
        color_rgb: decode_color_word(raw_color_word),
        intensity: extra_floats[0] * config.light_intensity_scale,
        range: (f64::from(extra_floats[2]) * config.world_scale) as f32,
        raw_type_code,
        raw_color_word,
        shaking_param_id,
        extra_floats,
    })
}

fn light_kind(raw: i32) -> LightKind {
    match raw {
        1 => LightKind::Spot,
        2 => LightKind::Sun,
        3 => LightKind::Area,
        _ => LightKind::Point,
    }
}

/// The packed color word is nominally ARGB (alpha in the high byte), but
/// dumps exist where an alpha of exactly 0 or 255 marks the word as
/// RGBA-ordered with the alpha in the low byte instead. In both conventions
/// the red/green/blue channels are taken from bits 16..24, 8..16 and 0..8;
/// only the alpha byte moves, and lights have no alpha, so no swizzle is
/// needed here. The raw word is preserved on the record for consumers that
/// want to second-guess this.
fn decode_color_word(word: u32) -> Vec3 {
    Vec3::new(
        ((word >> 16) & 0xFF) as f32 / 255.0,
        ((word >> 8) & 0xFF) as f32 / 255.0,
        (word & 0xFF) as f32 / 255.0,
    )
}
