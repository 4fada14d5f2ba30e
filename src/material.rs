use anyhow::{bail, Result};
use smallvec::SmallVec;

use crate::config::ChannelKeywords;
use crate::cursor::{align_up, Cursor};

const MAGIC: &[u8; 4] = b"MTL ";

/// Semantic texture category requested from a material descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureChannel {
    Base,
    Normal,
    Rough,
    Metal,
}

/// One texture binding: the shader variable it feeds and the referenced path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureSlot {
    pub shader_var: String,
    pub path: String,
}

/// Parsed contents of one binary material file.
#[derive(Debug, Clone, Default)]
pub struct MaterialDescriptor {
    pub shader_name: Option<String>,
    pub texture_slots: SmallVec<[TextureSlot; 8]>,
}

/// The format exists in two header revisions. The extended revision carries a
/// leading shader-name offset and 32-bit string offsets; the compact one has
/// a 0x20-byte header and 16-bit offsets. Files do not self-identify, so the
/// revision targeted by an asset dump is a configuration choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MaterialLayout {
    Compact,
    #[default]
    Extended,
}

impl MaterialLayout {
    fn entries_base(self) -> usize {
        match self {
            MaterialLayout::Compact => 0x20,
            MaterialLayout::Extended => 0x28,
        }
    }

    fn min_len(self) -> usize {
        match self {
            MaterialLayout::Compact => 0x20,
            MaterialLayout::Extended => 0x28,
        }
    }
}

impl MaterialDescriptor {
    /// Decodes a material file. Fails on a bad magic tag or a buffer shorter
    /// than the header; individual slot entries with unresolvable string
    /// offsets are dropped, never fatal.
    pub fn parse(data: &[u8], layout: MaterialLayout) -> Result<Self> {
        if data.len() < layout.min_len() {
            bail!("material buffer too short ({} bytes)", data.len());
        }
        if &data[0..4] != MAGIC {
            bail!("bad material magic tag {:?}", &data[0..4]);
        }

        let cursor = Cursor::new(data);
        let slot_count = cursor.read_u16(16)? as usize;
        let param_block_size = cursor.read_u32(20)? as usize;
        let constant_count = cursor.read_u16(24)? as usize;

        let entries_base = layout.entries_base();
        let string_table =
            align_up(entries_base + slot_count * 8 + constant_count * 8 + param_block_size, 16);

        let shader_name = match layout {
            MaterialLayout::Extended => {
                let name_off = cursor.read_u32(0x24)? as usize;
                let name = cursor.read_cstring(string_table + name_off);
                (!name.is_empty()).then_some(name)
            }
            MaterialLayout::Compact => None,
        };

        let mut texture_slots = SmallVec::new();
        for slot in 0..slot_count {
            let entry = entries_base + slot * 8;
            let (path_off, var_off) = match layout {
                MaterialLayout::Extended => {
                    let Ok(path_off) = cursor.read_u32(entry) else { break };
                    let Ok(var_off) = cursor.read_u32(entry + 4) else { break };
                    (path_off as usize, var_off as usize)
                }
                MaterialLayout::Compact => {
                    let Ok(path_off) = cursor.read_u16(entry) else { break };
                    let Ok(var_off) = cursor.read_u16(entry + 4) else { break };
                    (path_off as usize, var_off as usize)
                }
            };
            let path = cursor.read_cstring(string_table + path_off);
            if path.is_empty() {
                continue;
            }
            let shader_var = cursor.read_cstring(string_table + var_off);
            texture_slots.push(TextureSlot { shader_var, path });
        }

        Ok(Self { shader_name, texture_slots })
    }

    /// Returns the first texture path whose shader-variable name contains a
    /// keyword of the requested channel (case-insensitive). Slot order is the
    /// file's order and defines lookup priority.
    pub fn texture(&self, channel: TextureChannel, keywords: &ChannelKeywords) -> Option<&str> {
        let wanted = keywords.for_channel(channel);
        self.texture_slots.iter().find_map(|slot| {
            let var = slot.shader_var.to_lowercase();
            wanted.iter().any(|kw| var.contains(kw.as_str())).then_some(slot.path.as_str())
        })
    }
}
