use std::io::{self, Write};

/// A bit-level writer that packs fields MSB-first and hands every completed
/// byte straight to the underlying sink.
///
/// At most one partially filled byte is held in memory. Bits that have not
/// been forced out with [`flush`](BitWriter::flush) are lost when the writer
/// is dropped.
///
/// After the sink returns an error the cursor is no longer meaningful and
/// the writer must not be reused.
#[derive(Debug)]
pub struct BitWriter<W> {
    sink: W,
    /// The in-progress byte.
    byte: u8,
    /// Bits left until `byte` is full (1..=8).
    count: u8,
}

impl<W: Write> BitWriter<W> {
    /// Creates a byte-aligned writer over `sink`.
    pub fn new(sink: W) -> Self {
        Self {
            sink,
            byte: 0,
            count: 8,
        }
    }

    /// Writes a single bit, emitting the in-progress byte once it is full.
    #[inline]
    pub fn write_bit(&mut self, bit: bool) -> io::Result<()> {
        if bit {
            self.byte |= 1 << (self.count - 1);
        }
        self.count -= 1;

        if self.count == 0 {
            self.sink.write_all(&[self.byte])?;
            self.byte = 0;
            self.count = 8;
        }
        Ok(())
    }

    /// Writes the lowest `nbits` bits of `value`, most significant first.
    /// `nbits` must be <= 64; higher bits of `value` are ignored.
    pub fn write_bits(&mut self, value: u64, nbits: u8) -> io::Result<()> {
        debug_assert!(nbits <= 64);
        if nbits == 0 {
            return Ok(());
        }

        let mut nbits = nbits;
        let mut value = value << (64 - u32::from(nbits));
        while nbits >= 8 {
            self.write_byte((value >> 56) as u8)?;
            value <<= 8;
            nbits -= 8;
        }

        while nbits > 0 {
            self.write_bit(value >> 63 == 1)?;
            value <<= 1;
            nbits -= 1;
        }
        Ok(())
    }

    /// Writes a whole byte regardless of the current alignment.
    ///
    /// The high bits complete the in-progress byte, which is emitted; the
    /// low bits become the start of the next one.
    pub fn write_byte(&mut self, byte: u8) -> io::Result<()> {
        self.byte |= byte >> (8 - self.count);
        self.sink.write_all(&[self.byte])?;
        // Widen so a shift by 8 on an aligned cursor yields zero.
        self.byte = (u16::from(byte) << self.count) as u8;
        Ok(())
    }

    /// Pads the in-progress byte with `bit` until it is emitted. No-op when
    /// already aligned.
    pub fn flush(&mut self, bit: bool) -> io::Result<()> {
        while self.count != 8 {
            self.write_bit(bit)?;
        }
        Ok(())
    }

    /// Returns `true` if no partial byte is pending.
    #[inline]
    pub fn is_aligned(&self) -> bool {
        self.count == 8
    }

    /// Returns a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Consumes the writer and returns the sink. Any pending partial byte is
    /// discarded.
    pub fn into_inner(self) -> W {
        self.sink
    }
}

/// A cursor for reading bits sequentially, MSB-first, from a byte slice.
#[derive(Debug)]
pub struct BitReader<'a> {
    bytes: &'a [u8],
    /// Current bit position (0-indexed from the start).
    pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` over `bytes`.
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Returns the number of bits remaining.
    #[inline]
    pub fn remaining(&self) -> usize {
        (self.bytes.len() * 8).saturating_sub(self.pos)
    }

    /// Reads a single bit. Returns `None` if exhausted.
    #[inline]
    pub fn read_bit(&mut self) -> Option<bool> {
        let byte = *self.bytes.get(self.pos / 8)?;
        let bit_idx = self.pos % 8;
        self.pos += 1;
        Some((byte >> (7 - bit_idx)) & 1 == 1)
    }

    /// Reads `n` bits as a `u64` (big-endian). Returns `None` if not enough bits remain.
    pub fn read_bits(&mut self, n: u8) -> Option<u64> {
        debug_assert!(n <= 64);
        if self.remaining() < n as usize {
            return None;
        }
        let mut value: u64 = 0;
        for _ in 0..n {
            value = (value << 1) | (self.read_bit()? as u64);
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference path: every field written one bit at a time.
    fn write_bitwise(fields: &[(u64, u8)]) -> Vec<u8> {
        let mut w = BitWriter::new(Vec::new());
        for &(value, nbits) in fields {
            for i in (0..nbits).rev() {
                w.write_bit((value >> i) & 1 == 1).unwrap();
            }
        }
        w.flush(false).unwrap();
        w.into_inner()
    }

    fn write_fields(fields: &[(u64, u8)]) -> Vec<u8> {
        let mut w = BitWriter::new(Vec::new());
        for &(value, nbits) in fields {
            w.write_bits(value, nbits).unwrap();
        }
        w.flush(false).unwrap();
        w.into_inner()
    }

    #[test]
    fn test_write_bits_msb_first() {
        let mut w = BitWriter::new(Vec::new());
        w.write_bit(true).unwrap();
        w.write_bit(false).unwrap();
        w.write_bit(true).unwrap();
        assert!(w.get_ref().is_empty());
        w.write_bits(0b11010, 5).unwrap();
        assert_eq!(w.get_ref(), &vec![0b1011_1010]);
        assert!(w.is_aligned());
    }

    #[test]
    fn test_byte_path_matches_bit_path() {
        // Every starting offset, with field widths that straddle byte boundaries.
        for offset in 0..8u8 {
            let fields = vec![
                (0, offset),
                (0xDEAD_BEEF_CAFE_BABE, 64),
                (0x1FF, 9),
                (0xABCD, 16),
                (0b101, 3),
                (u64::MAX, 63),
                (0x5A, 8),
                (0, 0),
                (0x3FFF, 14),
            ];
            assert_eq!(write_fields(&fields), write_bitwise(&fields), "offset {offset}");
        }
    }

    #[test]
    fn test_write_byte_unaligned() {
        let mut w = BitWriter::new(Vec::new());
        w.write_bits(0b101, 3).unwrap();
        w.write_byte(0xFF).unwrap();
        assert_eq!(w.get_ref(), &vec![0b1011_1111]);
        w.flush(false).unwrap();
        assert_eq!(w.into_inner(), vec![0b1011_1111, 0b1110_0000]);
    }

    #[test]
    fn test_write_byte_aligned() {
        let mut w = BitWriter::new(Vec::new());
        w.write_byte(0xA5).unwrap();
        assert!(w.is_aligned());
        w.write_bit(true).unwrap();
        w.flush(false).unwrap();
        assert_eq!(w.into_inner(), vec![0xA5, 0x80]);
    }

    #[test]
    fn test_high_bits_ignored() {
        assert_eq!(write_fields(&[(0xFF_05, 4)]), vec![0b0101_0000]);
    }

    #[test]
    fn test_flush_padding() {
        let mut w = BitWriter::new(Vec::new());
        w.flush(true).unwrap();
        assert!(w.get_ref().is_empty());

        w.write_bit(false).unwrap();
        w.flush(true).unwrap();
        assert_eq!(w.into_inner(), vec![0b0111_1111]);
    }

    #[test]
    fn test_reader_roundtrip() {
        let bytes = write_fields(&[(0b11010, 5), (0xFF, 8), (0xDEAD_BEEF_CAFE_BABE, 64)]);
        let mut reader = BitReader::new(&bytes);
        assert_eq!(reader.read_bits(5), Some(0b11010));
        assert_eq!(reader.read_bits(8), Some(0xFF));
        assert_eq!(reader.read_bits(64), Some(0xDEAD_BEEF_CAFE_BABE));
        assert_eq!(reader.remaining(), 3);
        assert_eq!(reader.read_bits(4), None);
    }

    #[test]
    fn test_empty_reader() {
        let mut reader = BitReader::new(&[]);
        assert_eq!(reader.read_bit(), None);
        assert_eq!(reader.read_bits(0), Some(0));
    }
}
