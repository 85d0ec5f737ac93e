//! # fitalloc - Fixed-Arena Memory Allocator
//!
//! `fitalloc` manages one fixed-size, contiguous byte arena on behalf of its
//! caller. Variable-size requests are carved out of free space using a
//! selectable fit policy; freed blocks are merged with free neighbours, and
//! live blocks can be compacted to the front of the arena.
//!
//! - **Three fit policies**: first fit, best fit, worst fit
//! - **Splitting** of oversized free blocks, **coalescing** on release
//! - **Compaction** with before/after address reporting
//! - **Statistics** on allocated and free space
//!
//! ## Quick Start
//!
//! ```rust
//! use fitalloc::{Allocator, FitPolicy, Result};
//!
//! # fn main() -> Result<()> {
//! let mut alloc = Allocator::new(1024, FitPolicy::BestFit)?;
//!
//! let a = alloc.allocate(100)?.expect("arena has room");
//! let b = alloc.allocate(50)?.expect("arena has room");
//! alloc.payload_mut(b)?.fill(0x2A);
//!
//! alloc.deallocate(a)?;
//!
//! // Slide `b` to the front of the arena
//! let moves = alloc.compact()?;
//! assert_eq!(moves[0].before, b);
//! assert!(alloc.payload(moves[0].after)?.iter().all(|&x| x == 0x2A));
//!
//! alloc.print_statistics()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Arena Layout
//!
//! ```text
//! ┌────────┬───────────┬────────┬──────────────────┬────────┬──────────┐
//! │ size=N │ payload   │ size=M │ payload          │ size=K │ payload  │
//! └────────┴───────────┴────────┴──────────────────┴────────┴──────────┘
//!  8 bytes   N - 8       8 bytes  M - 8              8 bytes  K - 8
//! ```
//!
//! Each block starts with an 8-byte header holding its total size. Callers
//! receive and pass back the payload address ([`BlockAddr`]).
//!
//! ## Configuration
//!
//! ```rust
//! use fitalloc::{AllocatorBuilder, FitPolicy};
//!
//! # fn main() -> fitalloc::Result<()> {
//! let alloc = AllocatorBuilder::new()
//!     .capacity(64 * 1024)
//!     .policy(FitPolicy::WorstFit)
//!     .build()?;
//! assert_eq!(alloc.capacity(), 64 * 1024);
//! # Ok(())
//! # }
//! ```

pub mod core;

pub use crate::core::{
    allocator::{Allocator, FitPolicy, Relocation, Statistics},
    arena::{Arena, BlockAddr, HEADER_SIZE},
    block_list::{BlockList, Descriptor, SizeOrder},
    config::AllocatorConfig,
    error::{AllocError, Result},
    workload::{parse_script, Command, StatsFormat, Step, Workload},
};

use tracing::debug;

/// Builder for customizing Allocator creation
///
/// # Examples
///
/// ```rust
/// use fitalloc::{AllocatorBuilder, AllocatorConfig, FitPolicy};
///
/// # fn main() -> fitalloc::Result<()> {
/// let config = AllocatorConfig::new(4096, FitPolicy::BestFit);
/// let alloc = AllocatorBuilder::new().config(config).build()?;
/// assert_eq!(alloc.policy(), FitPolicy::BestFit);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct AllocatorBuilder {
    capacity: Option<usize>,
    policy: FitPolicy,
}

impl AllocatorBuilder {
    /// Create a new AllocatorBuilder with default settings (first fit)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the arena size in bytes
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Set the fit policy
    pub fn policy(mut self, policy: FitPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Take capacity and policy from a configuration
    pub fn config(mut self, config: AllocatorConfig) -> Self {
        self.capacity = Some(config.capacity);
        self.policy = config.policy;
        self
    }

    /// Build the Allocator instance
    pub fn build(self) -> Result<Allocator> {
        let capacity = self
            .capacity
            .ok_or_else(|| AllocError::Config("capacity must be set".to_string()))?;

        debug!("Building allocator: capacity {}, policy {}", capacity, self.policy);

        let config = AllocatorConfig::new(capacity, self.policy);
        Allocator::with_config(&config)
    }
}
