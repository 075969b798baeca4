//! Per-session receive buffer.
//!
//! A fixed-size byte array with an explicit fill mark. Reads append at the
//! fill mark and never past the end of the array; consumed prefixes are
//! removed by shifting the unconsumed tail back to index 0. Capacity is
//! fixed for the life of the session, so the longest acceptable line is
//! bounded by it.

use tokio::io::{AsyncRead, AsyncReadExt};

/// Fixed-capacity receive buffer owned by exactly one session.
pub struct RecvBuffer {
    /// Backing storage, allocated once.
    data: Box<[u8]>,
    /// Number of valid bytes at the front of `data`.
    filled: usize,
}

impl RecvBuffer {
    /// Create an empty buffer holding at most `capacity` bytes.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0u8; capacity].into_boxed_slice(),
            filled: 0,
        }
    }

    /// Total size of the buffer.
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// Number of buffered bytes.
    pub fn len(&self) -> usize {
        self.filled
    }

    /// Space left for the next read.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.filled
    }

    pub fn is_full(&self) -> bool {
        self.remaining() == 0
    }

    /// Buffered bytes, oldest first.
    pub fn filled(&self) -> &[u8] {
        &self.data[..self.filled]
    }

    /// Append bytes, returning how many fit.
    #[cfg(test)]
    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        self.data[self.filled..self.filled + n].copy_from_slice(&bytes[..n]);
        self.filled += n;
        n
    }

    /// Read once from `reader` into the free tail.
    ///
    /// The read is bounded by [`remaining`](Self::remaining). Returns the
    /// number of bytes read; 0 means EOF (or a full buffer, which callers
    /// check for first).
    pub async fn read_from<R>(&mut self, reader: &mut R) -> std::io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        let n = reader.read(&mut self.data[self.filled..]).await?;
        self.filled += n;
        Ok(n)
    }

    /// Drop the first `n` buffered bytes, shifting the rest to the front.
    ///
    /// # Panics
    /// Panics if `n` exceeds the buffered length.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.filled, "consume past fill mark");
        self.data.copy_within(n..self.filled, 0);
        self.filled -= n;
    }
}
