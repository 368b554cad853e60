use std::io::Write;

use crate::bitbuffer::BitWriter;
use crate::error::{Error, Result};

/// Width of the first-sample delta field.
pub const FIRST_DELTA_BITS: u8 = 14;

/// Delta written in place of the first sample when a stream is finished empty.
pub(crate) const EMPTY_STREAM_DELTA: u64 = (1 << FIRST_DELTA_BITS) - 1;

/// Delta-of-delta payload written after a `1111` prefix to end a stream.
pub(crate) const END_OF_STREAM_DOD: u64 = 0xFFFF_FFFF;

/// A single time-series sample: a 32-bit timestamp and an f64 value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub timestamp: u32,
    pub value: f64,
}

impl DataPoint {
    /// Creates a new `DataPoint`.
    pub fn new(timestamp: u32, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Leading/trailing zero counts of the last XOR that opened a window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    leading: u8,
    trailing: u8,
}

impl Window {
    #[inline]
    fn significant_bits(self) -> u8 {
        64 - self.leading - self.trailing
    }

    /// Whether an XOR with these zero counts fits inside the window.
    #[inline]
    fn contains(self, leading: u8, trailing: u8) -> bool {
        self.leading <= leading && self.trailing <= trailing
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Header written, no sample yet.
    Empty,
    Streaming,
    Finished,
}

/// The streaming Gorilla compressor.
///
/// Writes a 32-bit header on construction, then bit-packs each sample into
/// the sink as it arrives:
/// - **Timestamps**: delta-of-delta encoding with variable-length prefixes.
/// - **Values**: XOR against the previous value with a reusable
///   leading/trailing zero window.
///
/// [`finish`](Compressor::finish) must be called once at the end to write the
/// end-of-stream marker and pad to a byte boundary.
///
/// # Example
/// ```
/// use gorilla_stream::{Compressor, Decoder};
///
/// let mut c = Compressor::new(Vec::new(), 1_600_000_000).unwrap();
/// c.compress(1_600_000_000, 12.0).unwrap();
/// c.compress(1_600_000_060, 12.5).unwrap();
/// c.finish().unwrap();
///
/// let bytes = c.into_inner();
/// let stream = Decoder::decode(&bytes).unwrap();
/// assert_eq!(stream.points.len(), 2);
/// ```
#[derive(Debug)]
pub struct Compressor<W> {
    bw: BitWriter<W>,
    header: u32,
    state: State,
    /// Number of samples encoded so far.
    count: u64,
    /// Previous timestamp.
    t: u32,
    /// Previous delta between timestamps.
    t_delta: u32,
    /// Previous value as raw bits.
    value: u64,
    /// `None` until the first non-zero XOR.
    window: Option<Window>,
    /// Set once a leading-zero count overflowing 5 bits has been logged.
    leading_overflow_logged: bool,
}

impl<W: Write> Compressor<W> {
    /// Creates a compressor over `sink` and writes `header` as the stream's
    /// 32-bit base timestamp.
    pub fn new(sink: W, header: u32) -> Result<Self> {
        let mut bw = BitWriter::new(sink);
        bw.write_bits(u64::from(header), 32)
            .map_err(Error::io("header"))?;
        debug!("stream header {header} written");

        Ok(Self {
            bw,
            header,
            state: State::Empty,
            count: 0,
            t: 0,
            t_delta: 0,
            value: 0,
            window: None,
            leading_overflow_logged: false,
        })
    }

    /// Encodes one sample.
    ///
    /// Timestamps should strictly increase and the first one should lie
    /// within `2^14 - 1` of the header. Violations are logged but still
    /// encoded with the same wrapping/truncating arithmetic, so the resulting
    /// stream will not decode to the input.
    ///
    /// After an I/O error the compressor must be discarded.
    pub fn compress(&mut self, t: u32, v: f64) -> Result<()> {
        match self.state {
            State::Empty => self.compress_first(t, v)?,
            State::Streaming => {
                self.compress_timestamp(t)?;
                self.compress_value(v)?;
            }
            State::Finished => return Err(Error::Finished),
        }
        self.count += 1;
        Ok(())
    }

    /// Encodes a [`DataPoint`].
    pub fn encode(&mut self, dp: DataPoint) -> Result<()> {
        self.compress(dp.timestamp, dp.value)
    }

    /// Writes the end-of-stream marker and zero-pads to a byte boundary.
    ///
    /// Calling `finish` again is a no-op.
    pub fn finish(&mut self) -> Result<()> {
        match self.state {
            State::Finished => return Ok(()),
            State::Empty => {
                self.bw
                    .write_bits(EMPTY_STREAM_DELTA, FIRST_DELTA_BITS)
                    .map_err(Error::io("empty stream marker"))?;
                self.bw
                    .write_bits(0, 64)
                    .map_err(Error::io("empty stream marker"))?;
            }
            State::Streaming => {
                self.bw
                    .write_bits(0b1111, 4)
                    .map_err(Error::io("end marker prefix"))?;
                self.bw
                    .write_bits(END_OF_STREAM_DOD, 32)
                    .map_err(Error::io("end marker"))?;
                self.bw
                    .write_bit(false)
                    .map_err(Error::io("end marker value"))?;
            }
        }
        self.bw.flush(false).map_err(Error::io("padding"))?;
        self.state = State::Finished;
        debug!("stream finished after {} samples", self.count);
        Ok(())
    }

    /// Returns the header (base timestamp) of this stream.
    pub fn header(&self) -> u32 {
        self.header
    }

    /// Returns the number of samples encoded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Returns `true` once [`finish`](Compressor::finish) has succeeded.
    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    /// Returns a reference to the underlying sink.
    pub fn get_ref(&self) -> &W {
        self.bw.get_ref()
    }

    /// Consumes the compressor and returns the sink.
    ///
    /// Bits not yet forced out by `finish` are lost.
    pub fn into_inner(self) -> W {
        self.bw.into_inner()
    }

    // ── internal helpers ───────────────────────────────────────────────

    fn compress_first(&mut self, t: u32, v: f64) -> Result<()> {
        if t < self.header {
            warn!("first timestamp {t} precedes header {}", self.header);
        }
        let delta = t.wrapping_sub(self.header);
        if delta > EMPTY_STREAM_DELTA as u32 {
            warn!("first delta {delta} does not fit in {FIRST_DELTA_BITS} bits");
        }
        self.t = t;
        self.t_delta = delta;
        self.value = v.to_bits();

        self.bw
            .write_bits(u64::from(delta), FIRST_DELTA_BITS)
            .map_err(Error::io("first timestamp"))?;
        self.bw
            .write_bits(self.value, 64)
            .map_err(Error::io("first value"))?;
        self.state = State::Streaming;
        Ok(())
    }

    /// Encodes the delta-of-delta with the Gorilla prefix scheme:
    ///
    /// | dod            | prefix  | payload | total   |
    /// |----------------|---------|---------|---------|
    /// | 0              | `0`     | 0       | 1 bit   |
    /// | [-63, 64]      | `10`    | 7       | 9 bits  |
    /// | [-255, 256]    | `110`   | 9       | 12 bits |
    /// | [-2047, 2048]  | `1110`  | 12      | 16 bits |
    /// | otherwise      | `1111`  | 32      | 36 bits |
    fn compress_timestamp(&mut self, t: u32) -> Result<()> {
        if t <= self.t {
            warn!("timestamp {t} does not follow previous {}", self.t);
        }
        let delta = t.wrapping_sub(self.t);
        let dod = i64::from(delta) - i64::from(self.t_delta);
        self.t = t;
        self.t_delta = delta;

        let (prefix, prefix_bits, payload_bits) = match dod {
            0 => {
                trace!("dod 0");
                return self
                    .bw
                    .write_bit(false)
                    .map_err(Error::io("timestamp zero"));
            }
            -63..=64 => (0b10, 2, 7),
            -255..=256 => (0b110, 3, 9),
            -2047..=2048 => (0b1110, 4, 12),
            _ => (0b1111, 4, 32),
        };
        trace!("dod {dod} in {payload_bits}-bit payload");

        self.bw
            .write_bits(prefix, prefix_bits)
            .map_err(Error::io("dod prefix"))?;
        write_signed(&mut self.bw, dod, payload_bits).map_err(Error::io("dod payload"))
    }

    /// XOR-based value compression:
    ///
    /// 1. XOR with previous value.
    /// 2. If XOR == 0: write single `0` bit.
    /// 3. Else write `1`, then either
    ///    a. `0` + the bits inside the current window, or
    ///    b. `1` + 5-bit leading zeros + 6-bit significant length + significant bits,
    ///       opening a new window.
    fn compress_value(&mut self, v: f64) -> Result<()> {
        let bits = v.to_bits();
        let xor = self.value ^ bits;
        self.value = bits;

        if xor == 0 {
            return self
                .bw
                .write_bit(false)
                .map_err(Error::io("unchanged value"));
        }
        self.bw
            .write_bit(true)
            .map_err(Error::io("value control"))?;

        let leading = xor.leading_zeros() as u8;
        let trailing = xor.trailing_zeros() as u8;

        if let Some(window) = self.window.filter(|w| w.contains(leading, trailing)) {
            trace!("xor reuses window {window:?}");
            self.bw
                .write_bit(false)
                .map_err(Error::io("window control"))?;
            return self
                .bw
                .write_bits(xor >> window.trailing, window.significant_bits())
                .map_err(Error::io("xor value"));
        }

        let window = Window { leading, trailing };
        self.window = Some(window);
        trace!("xor opens window {window:?}");
        if leading >= 32 {
            if self.leading_overflow_logged {
                debug!("{leading} leading zeros do not fit in 5 bits");
            } else {
                warn!("{leading} leading zeros do not fit in 5 bits; further occurrences logged at debug");
                self.leading_overflow_logged = true;
            }
        }

        self.bw
            .write_bit(true)
            .map_err(Error::io("window control"))?;
        self.bw
            .write_bits(u64::from(leading), 5)
            .map_err(Error::io("leading zeros"))?;
        // 64 significant bits is written as 0 in the 6-bit field; a non-zero
        // XOR never has 0 significant bits.
        let significant = window.significant_bits();
        self.bw
            .write_bits(u64::from(significant), 6)
            .map_err(Error::io("significant bits"))?;
        self.bw
            .write_bits(xor >> trailing, significant)
            .map_err(Error::io("xor value"))
    }
}

/// Writes `i` as a `nbits`-wide two's-complement field.
fn write_signed<W: Write>(bw: &mut BitWriter<W>, i: i64, nbits: u8) -> std::io::Result<()> {
    // Truncation to the low `nbits` bits equals 2^nbits + i for negative i.
    bw.write_bits(i as u64, nbits)
}
