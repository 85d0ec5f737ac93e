//! Fixed-capacity byte arena
//!
//! The arena is tiled, start to end, by blocks. Every block begins with an
//! 8-byte header holding the block's total size (header included), followed
//! by its payload:
//!
//! ```text
//! offset 0                                                      capacity
//! ┌────────┬──────────────┬────────┬─────────┬────────┬─────────────────┐
//! │ header │   payload    │ header │ payload │ header │     payload     │
//! │  (8)   │              │  (8)   │         │  (8)   │                 │
//! └────────┴──────────────┴────────┴─────────┴────────┴─────────────────┘
//!          ▲                       ▲                  ▲
//!          └── BlockAddr           └── BlockAddr      └── BlockAddr
//! ```
//!
//! Callers only ever see payload addresses ([`BlockAddr`]); headers are
//! reached through the bounds-checked accessors below.

use crate::core::error::{AllocError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Size of the per-block size header in bytes
pub const HEADER_SIZE: usize = 8;

/// Payload address of a block, expressed as a byte offset into the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockAddr(usize);

impl BlockAddr {
    pub fn new(offset: usize) -> Self {
        BlockAddr(offset)
    }

    /// Address of the block whose header starts at `offset`
    pub fn from_header(offset: usize) -> Self {
        BlockAddr(offset + HEADER_SIZE)
    }

    /// Byte offset of the payload
    pub fn offset(self) -> usize {
        self.0
    }

    /// Byte offset of the header, `None` for addresses inside the first header
    pub fn header_offset(self) -> Option<usize> {
        self.0.checked_sub(HEADER_SIZE)
    }
}

impl fmt::Display for BlockAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// The managed byte buffer
#[derive(Debug, Clone)]
pub struct Arena {
    buf: Vec<u8>,
}

impl Arena {
    /// Create a zero-filled arena holding a single block that spans all of it
    pub fn new(capacity: usize) -> Result<Self> {
        if capacity <= HEADER_SIZE {
            return Err(AllocError::InvalidCapacity(capacity));
        }

        let mut arena = Arena {
            buf: vec![0; capacity],
        };
        arena.write_header(arena.first_block(), capacity)?;

        Ok(arena)
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Payload address of the block that starts at offset 0
    pub fn first_block(&self) -> BlockAddr {
        BlockAddr::from_header(0)
    }

    /// Raw view of the whole buffer
    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.buf.len() => Ok(()),
            _ => Err(AllocError::OutOfBounds {
                offset,
                len,
                capacity: self.buf.len(),
            }),
        }
    }

    fn header_range(&self, addr: BlockAddr) -> Result<usize> {
        let start = addr.header_offset().ok_or(AllocError::OutOfBounds {
            offset: addr.offset(),
            len: HEADER_SIZE,
            capacity: self.buf.len(),
        })?;
        self.check_range(start, HEADER_SIZE)?;
        Ok(start)
    }

    /// Read the total block size stored in the header of `addr`
    pub fn read_header(&self, addr: BlockAddr) -> Result<usize> {
        let start = self.header_range(addr)?;
        let mut raw = [0u8; HEADER_SIZE];
        raw.copy_from_slice(&self.buf[start..start + HEADER_SIZE]);
        Ok(u64::from_le_bytes(raw) as usize)
    }

    pub fn write_header(&mut self, addr: BlockAddr, size: usize) -> Result<()> {
        let start = self.header_range(addr)?;
        self.buf[start..start + HEADER_SIZE].copy_from_slice(&(size as u64).to_le_bytes());
        Ok(())
    }

    /// Zero the header bytes of a block that has been absorbed by a neighbour
    pub fn clear_header(&mut self, addr: BlockAddr) -> Result<()> {
        let start = self.header_range(addr)?;
        self.buf[start..start + HEADER_SIZE].fill(0);
        Ok(())
    }

    /// Payload bytes of the block at `addr`, sized from its header
    pub fn payload(&self, addr: BlockAddr) -> Result<&[u8]> {
        let len = self.payload_len(addr)?;
        Ok(&self.buf[addr.offset()..addr.offset() + len])
    }

    pub fn payload_mut(&mut self, addr: BlockAddr) -> Result<&mut [u8]> {
        let len = self.payload_len(addr)?;
        Ok(&mut self.buf[addr.offset()..addr.offset() + len])
    }

    fn payload_len(&self, addr: BlockAddr) -> Result<usize> {
        let size = self.read_header(addr)?;
        let len = size.checked_sub(HEADER_SIZE).ok_or_else(|| {
            AllocError::Corrupted(format!("block {} has header {} < {}", addr, size, HEADER_SIZE))
        })?;
        self.check_range(addr.offset(), len)?;
        Ok(len)
    }

    /// Zero the payload of `addr`, keeping its header
    pub fn zero_payload(&mut self, addr: BlockAddr) -> Result<()> {
        self.payload_mut(addr)?.fill(0);
        Ok(())
    }

    /// Zero an arbitrary byte range
    pub fn zero(&mut self, offset: usize, len: usize) -> Result<()> {
        self.check_range(offset, len)?;
        self.buf[offset..offset + len].fill(0);
        Ok(())
    }

    /// Move a whole block (header and payload) so that its payload starts at `to`
    ///
    /// Bytes of the old span that the new span does not cover are zeroed.
    /// Returns the block size.
    pub fn relocate(&mut self, from: BlockAddr, to: BlockAddr) -> Result<usize> {
        let size = self.read_header(from)?;
        if from == to {
            return Ok(size);
        }

        let src = self.header_range(from)?;
        let dst = self.header_range(to)?;
        self.check_range(src, size)?;
        self.check_range(dst, size)?;

        self.buf.copy_within(src..src + size, dst);

        let (stale_start, stale_end) = if dst < src {
            ((dst + size).max(src), src + size)
        } else {
            (src, dst.min(src + size))
        };
        self.buf[stale_start..stale_end].fill(0);

        Ok(size)
    }
}
