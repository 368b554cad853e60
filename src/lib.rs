//! # Gorilla stream
//!
//! A streaming encoder for Facebook's Gorilla time-series compression
//! scheme, as described in *"Gorilla: A Fast, Scalable, In-Memory Time
//! Series Database"* (VLDB 2015). Samples are bit-packed and handed to any
//! [`std::io::Write`] sink as soon as each byte is complete.
//!
//! ## Wire format
//!
//! All fields are written MSB-first.
//!
//! 1. 32-bit header: the base timestamp.
//! 2. First sample: 14-bit delta from the header, then the raw 64-bit value.
//! 3. Every later sample: a delta-of-delta prefix code (`0`, `10`+7,
//!    `110`+9, `1110`+12, `1111`+32 bits), then an XOR value code (`0` for
//!    unchanged, `10` + bits inside the current window, `11` + 5-bit leading
//!    zeros + 6-bit significant length + significant bits).
//! 4. End marker: `1111` + `0xFFFFFFFF` + `0` (or, for a stream with no
//!    samples, an all-ones first delta and a zero value), then zero padding
//!    to a byte boundary.
//!
//! ## Example
//!
//! ```rust
//! use gorilla_stream::{Compressor, Decoder, DataPoint};
//!
//! let mut compressor = Compressor::new(Vec::new(), 1_609_459_200).unwrap();
//! compressor.compress(1_609_459_200, 12.0).unwrap();
//! compressor.compress(1_609_459_260, 12.5).unwrap();
//! compressor.compress(1_609_459_320, 13.0).unwrap();
//! compressor.finish().unwrap();
//!
//! let bytes = compressor.into_inner();
//! let stream = Decoder::decode(&bytes).unwrap();
//! assert_eq!(stream.points.len(), 3);
//! assert_eq!(stream.points[0], DataPoint::new(1_609_459_200, 12.0));
//! ```
//!
//! ## Multiple streams
//!
//! ```rust
//! use gorilla_stream::MultiCompressor;
//!
//! let mut multi = MultiCompressor::<Vec<u8>>::new();
//! let cpu = multi.add_compressor(Vec::new(), 0).unwrap();
//! let mem = multi.add_compressor(Vec::new(), 0).unwrap();
//! multi.compress(cpu, 10, 0.25).unwrap();
//! multi.compress(mem, 10, 512.0).unwrap();
//! multi.finish(cpu).unwrap();
//! multi.finish(mem).unwrap();
//! ```
//!
//! ## Limitations
//!
//! Timestamps are 32-bit and must strictly increase; the first sample must
//! lie within `2^14 - 1` of the header; XORs with 32 or more leading zeros
//! do not fit the 5-bit field. None of these are rejected: the arithmetic
//! wraps or truncates exactly as the format dictates and a warning is
//! logged through the [`log`] facade.

#[macro_use]
extern crate log;

pub mod bitbuffer;
pub mod decoder;
pub mod encoder;
pub mod multi;

mod error;

// Re-export primary types at the crate root.
pub use decoder::{DecodedStream, Decoder, DecoderIter};
pub use encoder::{Compressor, DataPoint};
pub use error::{DecodeError, Error, Result};
pub use multi::MultiCompressor;
