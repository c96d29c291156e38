// Bounds-checked little-endian reads over a record or header slice.
// A read that runs past the slice yields None so truncation never looks like a zero.

use crate::layout::Primitive;

pub(crate) fn read_u8(buf: &[u8], offset: usize) -> Option<u8> {
    buf.get(offset).copied()
}

pub(crate) fn read_u16(buf: &[u8], offset: usize) -> Option<u16> {
    let bytes = buf.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

pub(crate) fn read_u32(buf: &[u8], offset: usize) -> Option<u32> {
    let bytes = buf.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

pub(crate) fn read_f32(buf: &[u8], offset: usize) -> Option<f32> {
    read_u32(buf, offset).map(f32::from_bits)
}

/// Raw value widened to f64. NaN and infinities pass through for the caller to reject.
pub(crate) fn read_primitive(buf: &[u8], offset: usize, primitive: Primitive) -> Option<f64> {
    match primitive {
        Primitive::U8 => read_u8(buf, offset).map(f64::from),
        Primitive::U16 => read_u16(buf, offset).map(f64::from),
        Primitive::U32 => read_u32(buf, offset).map(f64::from),
        Primitive::F32 => read_f32(buf, offset).map(f64::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_little_endian() {
        let buf = [0x34, 0x12, 0x78, 0x56, 0x00, 0x00, 0x48, 0x41];
        assert_eq!(read_u8(&buf, 1), Some(0x12));
        assert_eq!(read_u16(&buf, 0), Some(0x1234));
        assert_eq!(read_u32(&buf, 0), Some(0x5678_1234));
        assert_eq!(read_f32(&buf, 4), Some(12.5));
    }

    #[test]
    fn reads_past_end_are_none_not_zero() {
        let buf = [0u8; 4];
        assert_eq!(read_u8(&buf, 4), None);
        assert_eq!(read_u16(&buf, 3), None);
        assert_eq!(read_u32(&buf, 1), None);
        assert_eq!(read_primitive(&buf, usize::MAX, Primitive::F32), None);
        assert_eq!(read_primitive(&buf, 0, Primitive::F32), Some(0.0));
    }

    #[test]
    fn nan_bit_pattern_is_passed_through() {
        let buf = f32::NAN.to_le_bytes();
        assert!(read_primitive(&buf, 0, Primitive::F32).unwrap().is_nan());
    }
}
