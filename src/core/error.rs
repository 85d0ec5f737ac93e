//! Error types for allocator operations

use crate::core::arena::BlockAddr;
use thiserror::Error;

/// Allocator operation errors
#[derive(Error, Debug)]
pub enum AllocError {
    /// Arena too small to hold a block header and a payload byte
    #[error("Invalid arena capacity: {0} (must be larger than the 8-byte block header)")]
    InvalidCapacity(usize),

    /// Requested payload size is not allowed (zero)
    #[error("Invalid allocation size: {0}")]
    InvalidSize(usize),

    /// Address is not a currently allocated block
    #[error("Block not found: {0}")]
    NotFound(BlockAddr),

    /// Descriptor is not linked in the list it was used with
    #[error("Descriptor does not belong to this list")]
    InvalidDescriptor,

    /// Descriptor storage could not grow
    #[error("Descriptor storage exhausted")]
    DescriptorExhausted,

    /// Compaction output slices are too short
    #[error("Output capacity exceeded: {required} relocations, room for {provided}")]
    CapacityExceeded { required: usize, provided: usize },

    /// Arena access outside the buffer
    #[error("Arena access out of bounds: offset {offset}, length {len}, capacity {capacity}")]
    OutOfBounds {
        offset: usize,
        len: usize,
        capacity: usize,
    },

    /// Block headers or lists are inconsistent
    #[error("Arena corrupted: {0}")]
    Corrupted(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Malformed or inconsistent workload script
    #[error("Workload script error at line {line}: {message}")]
    Script { line: usize, message: String },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Allocator operation result type
pub type Result<T> = std::result::Result<T, AllocError>;
