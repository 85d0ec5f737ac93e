//! Allocator engine: initialization, allocation, deallocation and coalescing

use crate::core::allocator::FitPolicy;
use crate::core::arena::{Arena, BlockAddr, HEADER_SIZE};
use crate::core::block_list::{BlockList, SizeOrder};
use crate::core::config::AllocatorConfig;
use crate::core::error::{AllocError, Result};
use std::collections::HashSet;
use tracing::{debug, info, trace, warn};

/// Fixed-arena allocator
///
/// Owns the arena plus two ordered block lists: one for free blocks and one
/// for blocks handed out to callers. Every block of the arena is referenced by
/// exactly one of the two lists.
///
/// # Examples
///
/// ```
/// use fitalloc::{Allocator, FitPolicy};
///
/// let mut alloc = Allocator::new(1024, FitPolicy::FirstFit)?;
///
/// let addr = alloc.allocate(100)?.expect("fits");
/// alloc.payload_mut(addr)?[..5].copy_from_slice(b"hello");
///
/// alloc.deallocate(addr)?;
/// assert_eq!(alloc.available_memory()?, 1024 - 8);
/// # Ok::<(), fitalloc::AllocError>(())
/// ```
#[derive(Debug, Clone)]
pub struct Allocator {
    pub(super) arena: Arena,
    pub(super) free: BlockList,
    pub(super) allocated: BlockList,
    policy: FitPolicy,
}

impl Allocator {
    /// Create an allocator managing `capacity` bytes
    ///
    /// The arena starts as one free block spanning all of it.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCapacity` if `capacity` cannot hold a block header
    /// plus at least one payload byte.
    pub fn new(capacity: usize, policy: FitPolicy) -> Result<Self> {
        let arena = Arena::new(capacity).inspect_err(|_| {
            warn!("Rejected arena capacity {}", capacity);
        })?;

        let mut free = BlockList::new();
        free.push_back(arena.first_block())?;

        info!("Initialized {} byte arena with {} policy", capacity, policy);

        Ok(Allocator {
            arena,
            free,
            allocated: BlockList::new(),
            policy,
        })
    }

    /// Create an allocator from a validated configuration
    pub fn with_config(config: &AllocatorConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.capacity, config.policy)
    }

    /// Release the arena and every descriptor
    pub fn destroy(self) {
        info!(
            "Destroying {} byte arena ({} allocated, {} free blocks)",
            self.arena.capacity(),
            self.allocated.len(),
            self.free.len()
        );
    }

    pub fn policy(&self) -> FitPolicy {
        self.policy
    }

    pub fn capacity(&self) -> usize {
        self.arena.capacity()
    }

    /// Read-only view of the arena
    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    /// Allocate a block with at least `size` payload bytes
    ///
    /// Returns `Ok(None)` when no free block can hold the request; this is
    /// not an error and the caller may retry after freeing or compacting.
    ///
    /// A block is split when the leftover would exceed one header; otherwise
    /// the whole block is handed out and keeps its original size.
    pub fn allocate(&mut self, size: usize) -> Result<Option<BlockAddr>> {
        if size == 0 {
            warn!("Rejected zero-byte allocation");
            return Err(AllocError::InvalidSize(size));
        }

        let Some(needed) = size.checked_add(HEADER_SIZE) else {
            debug!("Request for {} bytes overflows block size", size);
            return Ok(None);
        };

        match self.policy {
            FitPolicy::FirstFit => {}
            FitPolicy::BestFit => self.free.sort_by_size(&self.arena, SizeOrder::Ascending)?,
            FitPolicy::WorstFit => self.free.sort_by_size(&self.arena, SizeOrder::Descending)?,
        }

        let mut candidate = None;
        for (desc, addr) in self.free.iter() {
            let block_size = self.arena.read_header(addr)?;
            if block_size >= needed {
                candidate = Some((desc, addr, block_size));
                break;
            }
        }

        let Some((desc, addr, block_size)) = candidate else {
            debug!(
                "No free block fits {} bytes ({} free blocks, policy {})",
                size,
                self.free.len(),
                self.policy
            );
            return Ok(None);
        };

        let remainder = block_size - needed;
        if remainder > HEADER_SIZE {
            let rest = BlockAddr::new(addr.offset() + needed);
            self.arena.write_header(addr, needed)?;
            self.arena.write_header(rest, remainder)?;
            self.free.set_address(desc, rest)?;
            debug!(
                "Allocated {} at {} by splitting {} byte block, {} bytes left at {}",
                size, addr, block_size, remainder, rest
            );
        } else {
            self.free.delete(desc)?;
            debug!(
                "Allocated {} at {} using whole {} byte block",
                size, addr, block_size
            );
        }

        self.allocated.push_back(addr)?;
        Ok(Some(addr))
    }

    /// Return a block to the free list and merge it with free neighbours
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `addr` is not a currently allocated block.
    pub fn deallocate(&mut self, addr: BlockAddr) -> Result<()> {
        let Some(desc) = self.allocated.find(addr) else {
            warn!("Deallocation of unknown block {}", addr);
            return Err(AllocError::NotFound(addr));
        };

        self.allocated.delete(desc)?;
        self.free.push_back(addr)?;
        self.arena.zero_payload(addr)?;
        self.allocated.sort_by_address();

        let merged = self.coalesce()?;
        debug!(
            "Deallocated {} ({} merges, {} free blocks)",
            addr,
            merged,
            self.free.len()
        );
        Ok(())
    }

    /// Merge physically adjacent free blocks that are neighbours in the free list
    ///
    /// Passes repeat until one makes no change. Pairs that touch in the arena
    /// but are not next to each other in list order are left alone. The lower
    /// block of a pair absorbs the higher one and the surviving descriptor
    /// keeps the first node's position.
    fn coalesce(&mut self) -> Result<usize> {
        let mut merges = 0;

        loop {
            let mut changed = false;
            let mut cursor = self.free.head();

            while let Some(first) = cursor {
                let Some(second) = self.free.next(first) else {
                    break;
                };

                let a = self.free.address(first)?;
                let b = self.free.address(second)?;
                let a_size = self.arena.read_header(a)?;
                let b_size = self.arena.read_header(b)?;

                let (low, high) = if a.offset() + a_size == b.offset() {
                    (a, b)
                } else if b.offset() + b_size == a.offset() {
                    (b, a)
                } else {
                    cursor = Some(second);
                    continue;
                };

                self.arena.write_header(low, a_size + b_size)?;
                self.arena.clear_header(high)?;
                self.free.set_address(first, low)?;
                self.free.delete(second)?;

                trace!("Merged free block {} into {}", high, low);
                merges += 1;
                changed = true;
            }

            if !changed {
                return Ok(merges);
            }
        }
    }

    /// Total free payload bytes (headers excluded)
    pub fn available_memory(&self) -> Result<usize> {
        self.free
            .iter()
            .map(|(_, addr)| {
                self.arena
                    .read_header(addr)
                    .map(|size| size.saturating_sub(HEADER_SIZE))
            })
            .sum()
    }

    /// Total size (header included) of an allocated block
    pub fn block_size(&self, addr: BlockAddr) -> Result<usize> {
        self.ensure_allocated(addr)?;
        self.arena.read_header(addr)
    }

    /// Payload of an allocated block
    pub fn payload(&self, addr: BlockAddr) -> Result<&[u8]> {
        self.ensure_allocated(addr)?;
        self.arena.payload(addr)
    }

    pub fn payload_mut(&mut self, addr: BlockAddr) -> Result<&mut [u8]> {
        self.ensure_allocated(addr)?;
        self.arena.payload_mut(addr)
    }

    fn ensure_allocated(&self, addr: BlockAddr) -> Result<()> {
        match self.allocated.find(addr) {
            Some(_) => Ok(()),
            None => Err(AllocError::NotFound(addr)),
        }
    }

    /// Allocated block addresses in current list order
    pub fn allocated_blocks(&self) -> Vec<BlockAddr> {
        self.allocated.addresses()
    }

    /// Free block addresses in current list order
    pub fn free_blocks(&self) -> Vec<BlockAddr> {
        self.free.addresses()
    }

    /// Verify the arena layout against both lists
    ///
    /// Checks that headers tile the arena exactly, that every block is longer
    /// than its header, and that each block is listed exactly once across the
    /// free and allocated lists.
    pub fn check_invariants(&self) -> Result<()> {
        let capacity = self.arena.capacity();
        let mut blocks = HashSet::new();
        let mut offset = 0;

        while offset < capacity {
            let addr = BlockAddr::from_header(offset);
            let size = self.arena.read_header(addr)?;
            if size <= HEADER_SIZE {
                return Err(AllocError::Corrupted(format!(
                    "block {} has degenerate size {}",
                    addr, size
                )));
            }
            if offset + size > capacity {
                return Err(AllocError::Corrupted(format!(
                    "block {} of size {} runs past the arena end",
                    addr, size
                )));
            }
            blocks.insert(addr);
            offset += size;
        }

        let mut seen = HashSet::new();
        for addr in self.free.addresses().into_iter().chain(self.allocated.addresses()) {
            if !blocks.contains(&addr) {
                return Err(AllocError::Corrupted(format!(
                    "listed address {} is not a block boundary",
                    addr
                )));
            }
            if !seen.insert(addr) {
                return Err(AllocError::Corrupted(format!("block {} listed twice", addr)));
            }
        }

        if seen.len() != blocks.len() {
            return Err(AllocError::Corrupted(format!(
                "{} blocks in arena but {} listed",
                blocks.len(),
                seen.len()
            )));
        }

        Ok(())
    }
}
