//! Bit-level codec for PER bit streams
//!
//! [`BitBuffer`] manages a streaming bit sequence with MSB-first ordering:
//! the first bit written into a byte lands in its most significant
//! position. It supports writes and reads of 1 to 64 bits, byte-aligned
//! bulk operations with fast paths, and explicit alignment to octet
//! boundaries.
//!
//! The same type fulfils both roles. A writer appends to a growable
//! buffer; a reader consumes from a pre-filled one. Mixing writes and
//! reads on one instance is not supported.
//!
//! # Offset state
//!
//! The within-byte offset is tri-state:
//!
//! - `0`: at the start of a byte, no bits touched in it yet
//! - `1..=7`: that many leading bits of the current byte are in use
//! - `8`: the current leading byte is full; the next operation moves past
//!   it lazily
//!
//! Keeping "just filled" as `offset == 8` instead of advancing eagerly
//! makes [`align`](BitBuffer::align) and [`advance`](BitBuffer::advance)
//! O(1): no byte is appended or skipped until the next real read or
//! write. Code inspecting the buffer must treat the pending-advance byte
//! as already consumed.

use per_core::error::{PerError, PerResult};
use std::fmt;

/// Default initial capacity for writer buffers, in bytes.
pub const INITIAL_BUFFER_SIZE: usize = 64;

/// Bit stream codec with MSB-first ordering.
pub struct BitBuffer {
    buff: Vec<u8>,
    /// Index of the first unconsumed byte. Stays zero in the writer role.
    pos: usize,
    /// Bit position within the current byte, 0 to 8.
    offset: u8,
    written: u64,
    read: u64,
}

impl BitBuffer {
    /// Create a codec for writing, pre-allocating [`INITIAL_BUFFER_SIZE`]
    /// bytes.
    pub fn writer() -> Self {
        Self::writer_with_capacity(INITIAL_BUFFER_SIZE)
    }

    /// Create a codec for writing with an explicit capacity hint in bytes.
    pub fn writer_with_capacity(capacity: usize) -> Self {
        Self {
            buff: Vec::with_capacity(capacity),
            pos: 0,
            offset: 0,
            written: 0,
            read: 0,
        }
    }

    /// Create a codec for reading from existing byte-aligned data.
    pub fn reader(data: Vec<u8>) -> Self {
        Self {
            buff: data,
            pos: 0,
            offset: 0,
            written: 0,
            read: 0,
        }
    }

    /// Total number of bits written, including alignment padding.
    pub fn num_written(&self) -> u64 {
        self.written
    }

    /// Total number of bits read, including skipped alignment bits.
    pub fn num_read(&self) -> u64 {
        self.read
    }

    /// Number of bytes currently in view (unconsumed suffix for a reader,
    /// the whole buffer for a writer).
    pub fn len(&self) -> usize {
        self.available()
    }

    pub fn is_empty(&self) -> bool {
        self.available() == 0
    }

    /// Capacity of the underlying buffer in bytes.
    pub fn capacity(&self) -> usize {
        self.buff.capacity()
    }

    /// Bytes currently in view. For a writer this is the encoded stream
    /// trimmed to the bytes actually touched, partial tail byte included.
    pub fn as_bytes(&self) -> &[u8] {
        &self.buff[self.pos..]
    }

    /// Consume the writer and return the encoded bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buff
    }

    fn available(&self) -> usize {
        self.buff.len() - self.pos
    }

    /// Ensure space for `n` more zeroed bytes, doubling capacity as
    /// needed so total reallocation work stays linear.
    fn grow(&mut self, n: usize) {
        let needed = self.buff.len() + n;
        if self.buff.capacity() < needed {
            let target = usize::max(self.buff.capacity() * 2, needed);
            self.buff.reserve(target - self.buff.len());
        }
        self.buff.resize(needed, 0);
    }

    /// Append the least significant `num` bits of `value`, MSB first.
    ///
    /// `value` is masked to `num` bits before writing. `num` must be
    /// between 1 and 64.
    pub fn write(&mut self, num: u8, value: u64) -> PerResult<()> {
        if num == 0 || num > 64 {
            return Err(PerError::BadRequest(format!(
                "bit count must be between 1 and 64, got {}",
                num
            )));
        }
        log::trace!("write: num={} value={}", num, value);

        let value = value & (u64::MAX >> (64 - num as u32));

        // Fast path: at a byte boundary, stage the value big-endian in an
        // eight-byte scratch slot and append whole bytes in one shot.
        if self.offset == 0 || self.offset == 8 {
            let nbytes = (num as usize + 7) >> 3;
            let staged = (value << (64 - num as u32)).to_be_bytes();
            self.buff.extend_from_slice(&staged[..nbytes]);
            self.offset = num & 7;
            if self.offset == 0 {
                // Full byte consumed; mark it as pending advance.
                self.offset = 8;
            }
            self.written += num as u64;
            return Ok(());
        }

        // Slow path: pack into the partial byte, then byte by byte.
        let mut pending = num;
        while pending > 0 {
            if self.offset == 8 || self.buff.is_empty() {
                self.grow(1);
                self.offset = 0;
            }
            let available = 8 - self.offset;
            let nbits = u8::min(pending, available);
            let remaining = pending - nbits;
            let chunk = ((value >> remaining) as u8) & (((1u16 << nbits) - 1) as u8);
            let shift = available - nbits;
            let last = self.buff.len() - 1;
            self.buff[last] |= chunk << shift;
            self.offset += nbits;
            pending = remaining;
        }
        self.written += num as u64;
        Ok(())
    }

    /// Read the next `num` bits, returned right-aligned in a u64.
    ///
    /// `num == 0` yields 0 without touching the stream. `num` must be at
    /// most 64.
    pub fn read(&mut self, num: u8) -> PerResult<u64> {
        if num == 0 {
            return Ok(0);
        }
        if num > 64 {
            return Err(PerError::BadRequest(format!(
                "bit count must be between 1 and 64, got {}",
                num
            )));
        }
        log::trace!("read: num={}", num);
        if self.available() == 0 {
            return Err(PerError::Exhausted("no more data".to_string()));
        }

        // Fast path: at a byte boundary, load whole bytes big-endian.
        if self.offset == 0 || self.offset == 8 {
            if self.offset == 8 {
                self.pos += 1;
                self.offset = 0;
                if self.available() == 0 {
                    return Err(PerError::Exhausted("unexpected end of data".to_string()));
                }
            }
            let nbytes = (num as usize + 7) >> 3;
            if self.available() < nbytes {
                return Err(PerError::Exhausted(format!(
                    "{} bits requested but only {} bytes remain",
                    num,
                    self.available()
                )));
            }
            let mut staged = [0u8; 8];
            staged[..nbytes].copy_from_slice(&self.buff[self.pos..self.pos + nbytes]);
            let result = u64::from_be_bytes(staged) >> (64 - num as u32);
            // Keep the last touched byte in view; the offset records how
            // much of it is consumed, with 8 marking it fully spent.
            self.pos += nbytes - 1;
            self.offset = num & 7;
            if self.offset == 0 {
                self.offset = 8;
            }
            self.read += num as u64;
            return Ok(result);
        }

        // Slow path: mid-byte, accumulate a chunk at a time.
        let mut result = 0u64;
        let mut pending = num;
        while pending > 0 {
            if self.offset == 8 {
                self.pos += 1;
                self.offset = 0;
                if self.available() == 0 {
                    return Err(PerError::Exhausted("unexpected end of data".to_string()));
                }
            }
            let remaining = 8 - self.offset;
            let reading = u8::min(pending, remaining);
            let mask = ((1u16 << reading) - 1) as u8;
            let shift = remaining - reading;
            let bits = (self.buff[self.pos] >> shift) & mask;
            result = (result << reading) | bits as u64;
            self.offset += reading;
            pending -= reading;
        }
        self.read += num as u64;
        Ok(result)
    }

    /// Append whole octets continuing from the current bit offset.
    ///
    /// Alignment is not forced; call [`align`](Self::align) first when the
    /// encoding requires octet-aligned contents.
    pub fn write_bytes(&mut self, data: &[u8]) -> PerResult<()> {
        if data.is_empty() {
            return Ok(());
        }
        log::trace!("write_bytes: len={}", data.len());

        if self.offset == 0 || self.offset == 8 {
            self.buff.extend_from_slice(data);
            self.written += data.len() as u64 * 8;
            self.offset = 8;
            return Ok(());
        }
        for &byte in data {
            self.write(8, byte as u64)?;
        }
        Ok(())
    }

    /// Read exactly `n` whole octets continuing from the current bit
    /// offset.
    pub fn read_bytes(&mut self, n: usize) -> PerResult<Vec<u8>> {
        if n == 0 {
            return Ok(Vec::new());
        }
        log::trace!("read_bytes: n={}", n);

        if self.offset == 0 || self.offset == 8 {
            if self.offset == 8 {
                if self.available() == 0 {
                    return Err(PerError::Exhausted("unexpected end of data".to_string()));
                }
                self.pos += 1;
                self.offset = 0;
            }
            if self.available() < n {
                return Err(PerError::Exhausted(format!(
                    "{} bytes requested but only {} remain",
                    n,
                    self.available()
                )));
            }
            let result = self.buff[self.pos..self.pos + n].to_vec();
            self.pos += n;
            self.read += n as u64 * 8;
            return Ok(result);
        }
        let mut result = Vec::with_capacity(n);
        for _ in 0..n {
            result.push(self.read(8)? as u8);
        }
        Ok(result)
    }

    /// Advance the write position to the next byte boundary.
    ///
    /// Unused bits of the current byte stay zero. Idempotent at a
    /// boundary; no byte is appended until the next write.
    pub fn align(&mut self) {
        if self.offset > 0 && self.offset < 8 {
            self.written += (8 - self.offset) as u64;
            self.offset = 8;
        }
    }

    /// Skip the remaining bits of the current byte, the read counterpart
    /// of [`align`](Self::align). Idempotent at a boundary.
    pub fn advance(&mut self) {
        if self.offset > 0 && self.offset < 8 {
            self.read += (8 - self.offset) as u64;
            self.offset = 8;
        }
    }
}

impl fmt::Debug for BitBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitBuffer")
            .field("len", &self.available())
            .field("offset", &self.offset)
            .field("written", &self.written)
            .field("read", &self.read)
            .finish()
    }
}
