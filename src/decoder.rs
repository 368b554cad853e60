use crate::bitbuffer::BitReader;
use crate::encoder::{DataPoint, EMPTY_STREAM_DELTA, END_OF_STREAM_DOD, FIRST_DELTA_BITS};
use crate::error::DecodeError;

/// The header and samples recovered from one compressed stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedStream {
    /// Base timestamp the first delta is relative to.
    pub header: u32,
    pub points: Vec<DataPoint>,
}

/// Reader for streams produced by [`Compressor`](crate::Compressor).
///
/// Reconstructs samples from the bit-packed stream up to the end-of-stream
/// marker. Trailing padding after the marker is ignored.
///
/// # Example
/// ```
/// use gorilla_stream::{Compressor, DataPoint, Decoder};
///
/// let mut c = Compressor::new(Vec::new(), 1000).unwrap();
/// c.compress(1000, 12.0).unwrap();
/// c.compress(1060, 12.5).unwrap();
/// c.finish().unwrap();
///
/// let stream = Decoder::decode(c.get_ref()).unwrap();
/// assert_eq!(stream.header, 1000);
/// assert_eq!(stream.points[1], DataPoint::new(1060, 12.5));
/// ```
pub struct Decoder;

impl Decoder {
    /// Decodes the header and all samples of a finished stream.
    pub fn decode(bytes: &[u8]) -> Result<DecodedStream, DecodeError> {
        let mut iter = Self::iter(bytes);
        let points = iter.by_ref().collect::<Result<Vec<_>, _>>()?;
        let header = iter.header().ok_or(DecodeError::MissingHeader)?;
        Ok(DecodedStream { header, points })
    }

    /// Returns an iterator that lazily decodes samples.
    pub fn iter(bytes: &[u8]) -> DecoderIter<'_> {
        DecoderIter {
            reader: BitReader::new(bytes),
            state: IterState::Header,
            header: None,
            prev_timestamp: 0,
            prev_delta: 0,
            prev_value_bits: 0,
            prev_leading_zeros: 0,
            prev_trailing_zeros: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterState {
    Header,
    Subsequent,
    Done,
}

/// A lazy iterator that yields `DataPoint`s from a compressed stream.
///
/// Stops after the first error.
pub struct DecoderIter<'a> {
    reader: BitReader<'a>,
    state: IterState,
    header: Option<u32>,
    prev_timestamp: u32,
    prev_delta: u32,
    prev_value_bits: u64,
    prev_leading_zeros: u8,
    prev_trailing_zeros: u8,
}

impl DecoderIter<'_> {
    /// The stream header, once it has been read.
    pub fn header(&self) -> Option<u32> {
        self.header
    }

    fn read(&mut self, n: u8) -> Result<u64, DecodeError> {
        self.reader.read_bits(n).ok_or(DecodeError::UnexpectedEnd)
    }

    fn read_bit(&mut self) -> Result<bool, DecodeError> {
        self.reader.read_bit().ok_or(DecodeError::UnexpectedEnd)
    }

    fn read_first(&mut self) -> Result<Option<DataPoint>, DecodeError> {
        let header = self
            .reader
            .read_bits(32)
            .ok_or(DecodeError::MissingHeader)? as u32;
        self.header = Some(header);

        let delta = self.read(FIRST_DELTA_BITS)?;
        let value_bits = self.read(64)?;
        if delta == EMPTY_STREAM_DELTA && value_bits == 0 {
            return Ok(None);
        }

        self.prev_delta = delta as u32;
        self.prev_timestamp = header.wrapping_add(self.prev_delta);
        self.prev_value_bits = value_bits;
        self.state = IterState::Subsequent;
        Ok(Some(DataPoint::new(
            self.prev_timestamp,
            f64::from_bits(value_bits),
        )))
    }

    fn read_next(&mut self) -> Result<Option<DataPoint>, DecodeError> {
        let dod = match self.read_delta_of_delta()? {
            Some(dod) => dod,
            None => return Ok(None),
        };
        // Deltas live in u32; truncating the dod reproduces the encoder's wrap.
        self.prev_delta = self.prev_delta.wrapping_add(dod as u32);
        self.prev_timestamp = self.prev_timestamp.wrapping_add(self.prev_delta);

        let value_bits = self.read_value()?;
        self.prev_value_bits = value_bits;
        Ok(Some(DataPoint::new(
            self.prev_timestamp,
            f64::from_bits(value_bits),
        )))
    }

    /// Decodes a variable-length delta-of-delta, or `None` at the end marker.
    fn read_delta_of_delta(&mut self) -> Result<Option<i64>, DecodeError> {
        if !self.read_bit()? {
            return Ok(Some(0));
        }
        let nbits = if !self.read_bit()? {
            7
        } else if !self.read_bit()? {
            9
        } else if !self.read_bit()? {
            12
        } else {
            32
        };

        let raw = self.read(nbits)?;
        if nbits == 32 && raw == END_OF_STREAM_DOD {
            return Ok(None);
        }
        Ok(Some(unbias(raw, nbits)))
    }

    /// Decodes an XOR-compressed value against the previous one.
    fn read_value(&mut self) -> Result<u64, DecodeError> {
        if !self.read_bit()? {
            return Ok(self.prev_value_bits);
        }

        if self.read_bit()? {
            let leading = self.read(5)? as u8;
            let significant = match self.read(6)? as u8 {
                0 => 64,
                n => n,
            };
            let trailing = 64u8
                .checked_sub(leading + significant)
                .ok_or(DecodeError::InvalidWindow {
                    leading,
                    significant,
                })?;
            self.prev_leading_zeros = leading;
            self.prev_trailing_zeros = trailing;
        }

        let significant = 64 - self.prev_leading_zeros - self.prev_trailing_zeros;
        let meaningful = self.read(significant)?;
        Ok(self.prev_value_bits ^ (meaningful << self.prev_trailing_zeros))
    }
}

/// Maps an `nbits` payload back to a signed value. Payloads above
/// `2^(nbits-1)` are negative, so the positive bound (e.g. 64 for 7 bits)
/// is representable.
#[inline]
fn unbias(raw: u64, nbits: u8) -> i64 {
    if raw > 1 << (nbits - 1) {
        raw as i64 - (1i64 << nbits)
    } else {
        raw as i64
    }
}

impl Iterator for DecoderIter<'_> {
    type Item = Result<DataPoint, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = match self.state {
            IterState::Done => return None,
            IterState::Header => self.read_first(),
            IterState::Subsequent => self.read_next(),
        };
        match result {
            Ok(Some(dp)) => Some(Ok(dp)),
            Ok(None) => {
                self.state = IterState::Done;
                None
            }
            Err(e) => {
                self.state = IterState::Done;
                Some(Err(e))
            }
        }
    }
}
