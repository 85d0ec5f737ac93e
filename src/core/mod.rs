//! Core allocator implementation
//!
//! - [`arena`] - The byte arena and block header accessors
//! - [`block_list`] - Ordered descriptor lists backing the free and allocated sets
//! - [`allocator`] - Fit policies, allocation, coalescing, compaction and statistics
//! - [`config`] - TOML-backed allocator configuration
//! - [`workload`] - Scripted command replay used by the `fitalloc` binary
//! - [`error`] - Error types

pub mod allocator;
pub mod arena;
pub mod block_list;
pub mod config;
pub mod error;
pub mod workload;
