//! Fixed-endianness writer and reader over a pre-sized byte buffer.
//!
//! The writer never grows its buffer: a write that does not fit fails
//! with [`WireError::BufferOverflow`] and leaves the cursor unchanged.

use filament_core::Point3;

use crate::error::WireError;

// ── Writer ──────────────────────────────────────────────────────

/// Little-endian writer into a caller-owned buffer.
pub struct WireWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> WireWriter<'a> {
    /// Start writing at the beginning of `buf`.
    pub fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes written so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn put(&mut self, bytes: &[u8]) -> Result<(), WireError> {
        if bytes.len() > self.remaining() {
            return Err(WireError::BufferOverflow {
                needed: bytes.len(),
                available: self.remaining(),
            });
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }

    /// Write a single byte.
    pub fn write_u8(&mut self, v: u8) -> Result<(), WireError> {
        self.put(&[v])
    }

    /// Write a little-endian u32.
    pub fn write_u32(&mut self, v: u32) -> Result<(), WireError> {
        self.put(&v.to_le_bytes())
    }

    /// Write a little-endian i32.
    pub fn write_i32(&mut self, v: i32) -> Result<(), WireError> {
        self.put(&v.to_le_bytes())
    }

    /// Write a little-endian u64.
    pub fn write_u64(&mut self, v: u64) -> Result<(), WireError> {
        self.put(&v.to_le_bytes())
    }

    /// Write a little-endian f64 (bit-exact).
    pub fn write_f64(&mut self, v: f64) -> Result<(), WireError> {
        self.put(&v.to_le_bytes())
    }

    /// Write three f64 components.
    pub fn write_point(&mut self, p: &Point3) -> Result<(), WireError> {
        for c in p.0 {
            self.write_f64(c)?;
        }
        Ok(())
    }
}

// ── Reader ──────────────────────────────────────────────────────

/// Little-endian reader over a received message.
pub struct WireReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireReader<'a> {
    /// Start reading at the beginning of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        if N > self.remaining() {
            return Err(WireError::Truncated {
                needed: N,
                available: self.remaining(),
            });
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, WireError> {
        Ok(self.take::<1>()?[0])
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32, WireError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    /// Read a little-endian i32.
    pub fn read_i32(&mut self) -> Result<i32, WireError> {
        Ok(i32::from_le_bytes(self.take()?))
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64, WireError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    /// Read a little-endian f64.
    pub fn read_f64(&mut self) -> Result<f64, WireError> {
        Ok(f64::from_le_bytes(self.take()?))
    }

    /// Read three f64 components.
    pub fn read_point(&mut self) -> Result<Point3, WireError> {
        Ok(Point3([self.read_f64()?, self.read_f64()?, self.read_f64()?]))
    }
}
