//! Compaction: slide every live block to the front of the arena

use crate::core::allocator::Allocator;
use crate::core::arena::{BlockAddr, HEADER_SIZE};
use crate::core::error::{AllocError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Old and new payload address of a block moved by compaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relocation {
    pub before: BlockAddr,
    pub after: BlockAddr,
}

impl Allocator {
    /// Compact live blocks and report their moves in caller-owned slices
    ///
    /// Live blocks are moved, in ascending address order, to a contiguous
    /// prefix of the arena. `before[i]` and `after[i]` receive the old and
    /// new payload address of the i-th block. All free space becomes one
    /// trailing free block. Returns the number of blocks processed.
    ///
    /// # Errors
    ///
    /// Returns `CapacityExceeded` without touching the arena if either slice
    /// is shorter than the number of allocated blocks, and `Corrupted` if the
    /// space left after the live blocks could not form a free block.
    pub fn compact_into(&mut self, before: &mut [BlockAddr], after: &mut [BlockAddr]) -> Result<usize> {
        let required = self.allocated.len();
        let provided = before.len().min(after.len());
        if provided < required {
            return Err(AllocError::CapacityExceeded { required, provided });
        }

        let used = self
            .allocated
            .iter()
            .map(|(_, addr)| self.arena.read_header(addr))
            .sum::<Result<usize>>()?;
        let remaining = self
            .arena
            .capacity()
            .checked_sub(used)
            .ok_or_else(|| AllocError::Corrupted(format!("live blocks span {} bytes", used)))?;
        if remaining > 0 && remaining <= HEADER_SIZE {
            return Err(AllocError::Corrupted(format!(
                "{} trailing bytes left after compaction cannot form a block",
                remaining
            )));
        }

        self.allocated.sort_by_address();

        let mut cursor = 0;
        let mut count = 0;
        let mut node = self.allocated.head();

        while let Some(desc) = node {
            let old = self.allocated.address(desc)?;
            let new = BlockAddr::from_header(cursor);
            let size = self.arena.relocate(old, new)?;

            before[count] = old;
            after[count] = new;
            self.allocated.set_address(desc, new)?;

            cursor += size;
            count += 1;
            node = self.allocated.next(desc);
        }

        self.free.clear();

        self.arena.zero(cursor, remaining)?;
        if remaining > 0 {
            let tail = BlockAddr::from_header(cursor);
            self.arena.write_header(tail, remaining)?;
            self.free.push_back(tail)?;
        }

        debug!(
            "Compacted {} blocks into {} bytes, {} bytes free",
            count, cursor, remaining
        );
        Ok(count)
    }

    /// Compact live blocks, returning one [`Relocation`] per block
    pub fn compact(&mut self) -> Result<Vec<Relocation>> {
        let n = self.allocated.len();
        let mut before = vec![BlockAddr::new(0); n];
        let mut after = vec![BlockAddr::new(0); n];

        let count = self.compact_into(&mut before, &mut after)?;

        Ok(before
            .into_iter()
            .zip(after)
            .take(count)
            .map(|(before, after)| Relocation { before, after })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocator::FitPolicy;

    #[test]
    fn test_compact_empty_allocator() {
        let mut alloc = Allocator::new(256, FitPolicy::FirstFit).unwrap();
        assert!(alloc.compact().unwrap().is_empty());
        assert_eq!(alloc.free_blocks(), vec![BlockAddr::new(8)]);
        assert_eq!(alloc.available_memory().unwrap(), 248);
    }

    #[test]
    fn test_compact_moves_blocks_and_data() {
        let mut alloc = Allocator::new(512, FitPolicy::FirstFit).unwrap();
        let a = alloc.allocate(24).unwrap().unwrap();
        let b = alloc.allocate(40).unwrap().unwrap();
        let c = alloc.allocate(16).unwrap().unwrap();
        alloc.payload_mut(c).unwrap().copy_from_slice(&[0xC3; 16]);
        alloc.payload_mut(b).unwrap().fill(0xB2);

        alloc.deallocate(a).unwrap();

        let moves = alloc.compact().unwrap();
        assert_eq!(
            moves,
            vec![
                Relocation {
                    before: b,
                    after: BlockAddr::new(8)
                },
                Relocation {
                    before: c,
                    after: BlockAddr::new(56)
                },
            ]
        );

        assert!(alloc.payload(BlockAddr::new(8)).unwrap().iter().all(|&x| x == 0xB2));
        assert!(alloc.payload(BlockAddr::new(56)).unwrap().iter().all(|&x| x == 0xC3));
        assert_eq!(alloc.free_blocks(), vec![BlockAddr::new(80)]);
        assert_eq!(alloc.available_memory().unwrap(), 512 - 48 - 24 - 8);
        alloc.check_invariants().unwrap();
    }

    #[test]
    fn test_compact_into_rejects_short_slices() {
        let mut alloc = Allocator::new(256, FitPolicy::FirstFit).unwrap();
        alloc.allocate(8).unwrap().unwrap();
        alloc.allocate(8).unwrap().unwrap();
        let snapshot = alloc.arena().bytes().to_vec();

        let mut before = [BlockAddr::new(0); 1];
        let mut after = [BlockAddr::new(0); 2];
        let err = alloc.compact_into(&mut before, &mut after).unwrap_err();

        assert!(matches!(
            err,
            AllocError::CapacityExceeded {
                required: 2,
                provided: 1
            }
        ));
        assert_eq!(alloc.arena().bytes(), &snapshot[..]);
    }

    #[test]
    fn test_compact_rejects_unusable_remainder_before_moving() {
        let mut alloc = Allocator::new(64, FitPolicy::FirstFit).unwrap();
        let a = alloc.allocate(8).unwrap().unwrap();
        let b = alloc.allocate(8).unwrap().unwrap();
        alloc.deallocate(a).unwrap();

        // Stretch b so only 4 bytes would trail the compacted blocks
        alloc.arena.write_header(b, 60).unwrap();
        let snapshot = alloc.arena().bytes().to_vec();
        let free = alloc.free_blocks();

        let err = alloc.compact().unwrap_err();

        assert!(matches!(err, AllocError::Corrupted(_)));
        assert_eq!(alloc.arena().bytes(), &snapshot[..]);
        assert_eq!(alloc.free_blocks(), free);
        assert_eq!(alloc.allocated_blocks(), vec![b]);
    }

    #[test]
    fn test_compact_full_arena_leaves_no_free_block() {
        let mut alloc = Allocator::new(64, FitPolicy::FirstFit).unwrap();
        let a = alloc.allocate(56).unwrap().unwrap();

        let moves = alloc.compact().unwrap();
        assert_eq!(moves, vec![Relocation { before: a, after: a }]);
        assert!(alloc.free_blocks().is_empty());
        assert_eq!(alloc.available_memory().unwrap(), 0);
        alloc.check_invariants().unwrap();
    }
}
