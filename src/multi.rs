use std::io::Write;

use crate::encoder::Compressor;
use crate::error::{Error, Result};

/// An append-only set of independent [`Compressor`]s addressed by index.
///
/// Every stream has its own sink and header; nothing is shared between
/// them. All mutation goes through `&mut self`, so concurrent registration
/// and dispatch cannot happen without an external lock. To drive streams
/// from several threads, register them all first and split the result of
/// [`into_compressors`](MultiCompressor::into_compressors).
///
/// There is no combined finish: each stream is finished on its own with
/// [`finish`](MultiCompressor::finish).
#[derive(Debug)]
pub struct MultiCompressor<W> {
    compressors: Vec<Compressor<W>>,
}

impl<W: Write> MultiCompressor<W> {
    /// Creates an empty dispatcher.
    pub fn new() -> Self {
        Self {
            compressors: Vec::new(),
        }
    }

    /// Creates a compressor over `sink` with `header`, and returns its index.
    pub fn add_compressor(&mut self, sink: W, header: u32) -> Result<usize> {
        let compressor = Compressor::new(sink, header)?;
        let index = self.compressors.len();
        self.compressors.push(compressor);
        debug!("registered compressor {index} with header {header}");
        Ok(index)
    }

    /// Encodes a sample on the stream at `index`.
    pub fn compress(&mut self, index: usize, t: u32, v: f64) -> Result<()> {
        self.get_mut(index)?.compress(t, v)
    }

    /// Finishes the stream at `index`.
    pub fn finish(&mut self, index: usize) -> Result<()> {
        self.get_mut(index)?.finish()
    }

    /// Returns the compressor at `index`.
    pub fn get_mut(&mut self, index: usize) -> Result<&mut Compressor<W>> {
        let len = self.compressors.len();
        self.compressors
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })
    }

    /// Number of registered compressors.
    pub fn len(&self) -> usize {
        self.compressors.len()
    }

    /// Returns `true` if no compressor has been registered.
    pub fn is_empty(&self) -> bool {
        self.compressors.is_empty()
    }

    /// Consumes the dispatcher, returning the compressors in index order.
    pub fn into_compressors(self) -> Vec<Compressor<W>> {
        self.compressors
    }
}

impl<W: Write> Default for MultiCompressor<W> {
    fn default() -> Self {
        Self::new()
    }
}
