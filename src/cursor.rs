use anyhow::{bail, Result};

/// Bounds-checked little-endian reader over a borrowed byte buffer.
///
/// Every multi-byte read takes an absolute offset; the container formats this
/// crate decodes are built from relative-offset tables, so callers resolve
/// addresses themselves and the cursor only guards the final access.
pub struct Cursor<'a> {
    data: &'a [u8],
}

impl<'a> Cursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    fn slice(&self, offset: usize, width: usize) -> Result<&'a [u8]> {
        let end = offset.checked_add(width).filter(|&end| end <= self.data.len());
        match end {
            Some(end) => Ok(&self.data[offset..end]),
            None => bail!("read of {width} bytes at offset {offset:#x} exceeds buffer ({} bytes)", self.data.len()),
        }
    }

    pub fn read_u16(&self, offset: usize) -> Result<u16> {
        let bytes = self.slice(offset, 2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&self, offset: usize) -> Result<u32> {
        let bytes = self.slice(offset, 4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i16(&self, offset: usize) -> Result<i16> {
        let bytes = self.slice(offset, 2)?;
        Ok(i16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i32(&self, offset: usize) -> Result<i32> {
        let bytes = self.slice(offset, 4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_f32(&self, offset: usize) -> Result<f32> {
        Ok(f32::from_bits(self.read_u32(offset)?))
    }

    pub fn read_f64(&self, offset: usize) -> Result<f64> {
        let bytes = self.slice(offset, 8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    /// Reads a NUL-terminated string starting at `offset`.
    ///
    /// Out-of-range offsets yield an empty string rather than an error: the
    /// string tables these formats carry are frequently truncated, and a
    /// missing name must not sink the record that referenced it. Invalid
    /// UTF-8 is replaced, never fatal.
    pub fn read_cstring(&self, offset: usize) -> String {
        if offset >= self.data.len() {
            return String::new();
        }
        let tail = &self.data[offset..];
        let end = tail.iter().position(|&b| b == 0).unwrap_or(tail.len());
        String::from_utf8_lossy(&tail[..end]).into_owned()
    }
}

/// Rounds `value` up to the next multiple of `alignment` (a power of two).
pub fn align_up(value: usize, alignment: usize) -> usize {
    debug_assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_reads() {
        let data = [0x33, 0x22, 0x11, 0xFF, 0x00, 0x00, 0x80, 0x3F];
        let cursor = Cursor::new(&data);
        assert_eq!(cursor.read_u16(0).expect("u16"), 0x2233);
        assert_eq!(cursor.read_u32(0).expect("u32"), 0xFF112233);
        assert_eq!(cursor.read_i32(0).expect("i32"), 0xFF112233u32 as i32);
        assert!((cursor.read_f32(4).expect("f32") - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn out_of_bounds_read_errors() {
        let cursor = Cursor::new(&[0u8; 4]);
        assert!(cursor.read_u32(1).is_err());
        assert!(cursor.read_f64(0).is_err());
        assert!(cursor.read_u16(usize::MAX).is_err());
    }

    #[test]
    fn cstring_stops_at_terminator() {
        let cursor = Cursor::new(b"wall\0brick\0");
        assert_eq!(cursor.read_cstring(0), "wall");
        assert_eq!(cursor.read_cstring(5), "brick");
    }

    #[test]
    fn cstring_past_end_is_empty() {
        let cursor = Cursor::new(b"abc");
        assert_eq!(cursor.read_cstring(3), "");
        assert_eq!(cursor.read_cstring(100), "");
    }

    #[test]
    fn cstring_without_terminator_reads_to_end() {
        let cursor = Cursor::new(b"unterminated");
        assert_eq!(cursor.read_cstring(2), "terminated");
    }

    #[test]
    fn align_up_is_idempotent_and_monotone() {
        for value in [0usize, 1, 15, 16, 17, 0x2B, 0x40] {
            let aligned = align_up(value, 16);
            assert!(aligned >= value);
            assert_eq!(aligned % 16, 0);
            assert_eq!(align_up(aligned, 16), aligned);
        }
    }
}
