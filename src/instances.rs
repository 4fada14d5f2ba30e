use anyhow::{Context, Result};
use glam::{DVec3, Vec2, Vec3};

use crate::config::FragmentConfig;
use crate::cursor::Cursor;

const HEADER_LEN: usize = 64;
const TRANSFORM_STRIDE: usize = 12;

/// One placed instance from an instance-table file. Positions and rotations
/// are kept as the packed integers the format stores; scaling them is the
/// consumer's call (the constants differ between asset dumps).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstanceRecord {
    pub asset_path: String,
    pub raw_position: [i16; 3],
    pub raw_rotation: [i16; 3],
}

impl InstanceRecord {
    pub fn position(&self, world_scale: f64) -> DVec3 {
        DVec3::new(
            f64::from(self.raw_position[0]) * world_scale,
            f64::from(self.raw_position[1]) * world_scale,
            f64::from(self.raw_position[2]) * world_scale,
        )
    }

    /// Packed rotations advance in fixed angular steps (degrees per unit).
    pub fn rotation_radians(&self, step_deg: f32) -> Vec3 {
        Vec3::new(
            (f32::from(self.raw_rotation[0]) * step_deg).to_radians(),
            (f32::from(self.raw_rotation[1]) * step_deg).to_radians(),
            (f32::from(self.raw_rotation[2]) * step_deg).to_radians(),
        )
    }
}

#[derive(Debug, Default)]
pub struct InstanceList {
    pub instances: Vec<InstanceRecord>,
    /// Instances dropped for an out-of-range string index or truncated data.
    pub skipped: usize,
}

/// Decodes an instance-table file: a 64-byte header, a pointer list of
/// relative string offsets, an index array selecting a string per instance,
/// and a packed i16 transform array.
pub fn parse_instance_list(data: &[u8]) -> Result<InstanceList> {
    let cursor = Cursor::new(data);
    if data.len() < HEADER_LEN {
        anyhow::bail!("instance table truncated ({} bytes)", data.len());
    }
    let data_offset = cursor.read_u32(0).context("instance header")? as usize;
    let count = cursor.read_u32(4)? as usize;
    let index_offset = cursor.read_u32(8)? as usize;
    let pointer_list = cursor.read_u32(12)? as usize;
    let string_count = cursor.read_u32(16)? as usize;

    // String pointers are relative to their own slot address.
    let mut strings = Vec::with_capacity(string_count);
    for index in 0..string_count {
        let slot = pointer_list + index * 4;
        let Ok(rel) = cursor.read_i32(slot) else { continue };
        let address = slot as i64 + rel as i64;
        if address < 0 || address as usize > data.len() {
            continue;
        }
        let value = cursor.read_cstring(address as usize);
        if !value.is_empty() {
            strings.push(value);
        }
    }

    let mut list = InstanceList::default();
    for index in 0..count {
        let Ok(selector) = cursor.read_u16(index_offset + index * 2) else {
            list.skipped += 1;
            continue;
        };
        // The index array stores byte offsets into 4-byte pointer slots.
        let string_index = selector as usize / 4;
        let Some(asset_path) = strings.get(string_index) else {
            list.skipped += 1;
            continue;
        };

        let base = data_offset + index * TRANSFORM_STRIDE;
        let transform: Result<Vec<i16>> =
            (0..6).map(|field| cursor.read_i16(base + field * 2)).collect();
        let Ok(values) = transform else {
            list.skipped += 1;
            continue;
        };
        list.instances.push(InstanceRecord {
            asset_path: asset_path.clone(),
            raw_position: [values[0], values[1], values[2]],
            raw_rotation: [values[3], values[4], values[5]],
        });
    }
    Ok(list)
}

/// Reads the tightly packed 2D float pairs of a raw-vertex mesh fragment.
/// The start offset is an empirically discovered constant (see
/// `FragmentConfig`); there is no header field describing it.
pub fn parse_point_fragment(data: &[u8], config: &FragmentConfig) -> Vec<Vec2> {
    let cursor = Cursor::new(data);
    let mut points = Vec::new();
    for index in 0..config.max_points {
        let offset = config.offset + index * config.stride;
        if offset + 12 > data.len() {
            break;
        }
        let Ok(x) = cursor.read_f32(offset) else { break };
        let Ok(y) = cursor.read_f32(offset + 4) else { break };
        points.push(Vec2::new(x, y));
    }
    points
}
