//! Allocation statistics

use crate::core::allocator::Allocator;
use crate::core::block_list::{BlockList, SizeOrder};
use crate::core::error::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

/// Snapshot of arena usage
///
/// Sizes count whole blocks, headers included, so `allocated_size +
/// free_size` always equals the arena capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub allocated_size: usize,
    pub allocated_chunks: usize,
    pub free_size: usize,
    pub free_chunks: usize,
    /// 0 when nothing is free
    pub largest_free_chunk_size: usize,
    /// Arena capacity when nothing is free
    pub smallest_free_chunk_size: usize,
}

impl fmt::Display for Statistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Allocated size = {}", self.allocated_size)?;
        writeln!(f, "Allocated chunks = {}", self.allocated_chunks)?;
        writeln!(f, "Free size = {}", self.free_size)?;
        writeln!(f, "Free chunks = {}", self.free_chunks)?;
        writeln!(f, "Largest free chunk size = {}", self.largest_free_chunk_size)?;
        writeln!(f, "Smallest free chunk size = {}", self.smallest_free_chunk_size)
    }
}

impl Allocator {
    /// Gather usage statistics
    ///
    /// Finding the extreme free chunks sorts the free list by size, ascending
    /// then descending, so afterwards the free list is ordered largest first.
    /// Under first fit this changes which block the next request takes.
    pub fn statistics(&mut self) -> Result<Statistics> {
        let (allocated_size, allocated_chunks) = self.sum_sizes(&self.allocated)?;
        let (free_size, free_chunks) = self.sum_sizes(&self.free)?;

        self.free.sort_by_size(&self.arena, SizeOrder::Ascending)?;
        let smallest_free_chunk_size = match self.free.head() {
            Some(desc) => self.arena.read_header(self.free.address(desc)?)?,
            None => self.arena.capacity(),
        };

        self.free.sort_by_size(&self.arena, SizeOrder::Descending)?;
        let largest_free_chunk_size = match self.free.head() {
            Some(desc) => self.arena.read_header(self.free.address(desc)?)?,
            None => 0,
        };

        Ok(Statistics {
            allocated_size,
            allocated_chunks,
            free_size,
            free_chunks,
            largest_free_chunk_size,
            smallest_free_chunk_size,
        })
    }

    fn sum_sizes(&self, list: &BlockList) -> Result<(usize, usize)> {
        let total = list
            .iter()
            .map(|(_, addr)| self.arena.read_header(addr))
            .sum::<Result<usize>>()?;
        Ok((total, list.len()))
    }

    /// Write the six statistics lines to `out`
    pub fn write_statistics<W: Write>(&mut self, out: &mut W) -> Result<()> {
        let stats = self.statistics()?;
        write!(out, "{}", stats)?;
        Ok(())
    }

    /// Print the six statistics lines to standard output
    pub fn print_statistics(&mut self) -> Result<()> {
        let stdout = io::stdout();
        let mut lock = stdout.lock();
        self.write_statistics(&mut lock)?;
        lock.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::allocator::FitPolicy;
    use crate::core::arena::BlockAddr;

    #[test]
    fn test_statistics_of_fresh_arena() {
        let mut alloc = Allocator::new(1024, FitPolicy::FirstFit).unwrap();
        let stats = alloc.statistics().unwrap();
        assert_eq!(
            stats,
            Statistics {
                allocated_size: 0,
                allocated_chunks: 0,
                free_size: 1024,
                free_chunks: 1,
                largest_free_chunk_size: 1024,
                smallest_free_chunk_size: 1024,
            }
        );
    }

    #[test]
    fn test_statistics_when_full() {
        let mut alloc = Allocator::new(64, FitPolicy::FirstFit).unwrap();
        alloc.allocate(56).unwrap().unwrap();
        let stats = alloc.statistics().unwrap();
        assert_eq!(stats.allocated_size, 64);
        assert_eq!(stats.free_chunks, 0);
        assert_eq!(stats.largest_free_chunk_size, 0);
        assert_eq!(stats.smallest_free_chunk_size, 64);
    }

    #[test]
    fn test_statistics_leaves_free_list_largest_first() {
        let mut alloc = Allocator::new(1024, FitPolicy::FirstFit).unwrap();
        let a = alloc.allocate(100).unwrap().unwrap();
        let _b = alloc.allocate(10).unwrap().unwrap();
        let c = alloc.allocate(600).unwrap().unwrap();
        let _d = alloc.allocate(10).unwrap().unwrap();
        alloc.deallocate(a).unwrap();
        alloc.deallocate(c).unwrap();

        let tail = BlockAddr::new(760);
        assert_eq!(alloc.free_blocks(), vec![tail, a, c]);

        let stats = alloc.statistics().unwrap();
        assert_eq!(stats.allocated_chunks, 2);
        assert_eq!(stats.allocated_size, 36);
        assert_eq!(stats.free_chunks, 3);
        assert_eq!(stats.free_size, 272 + 108 + 608);
        assert_eq!(stats.smallest_free_chunk_size, 108);
        assert_eq!(stats.largest_free_chunk_size, 608);
        assert_eq!(alloc.free_blocks(), vec![c, tail, a]);
    }

    #[test]
    fn test_display_format() {
        let stats = Statistics {
            allocated_size: 118,
            allocated_chunks: 2,
            free_size: 906,
            free_chunks: 1,
            largest_free_chunk_size: 906,
            smallest_free_chunk_size: 906,
        };
        assert_eq!(
            stats.to_string(),
            "Allocated size = 118\n\
             Allocated chunks = 2\n\
             Free size = 906\n\
             Free chunks = 1\n\
             Largest free chunk size = 906\n\
             Smallest free chunk size = 906\n"
        );
    }
}
