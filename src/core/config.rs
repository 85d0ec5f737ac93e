//! Allocator configuration
//!
//! Configuration can be built in code or loaded from TOML:
//!
//! ```toml
//! capacity = 4096
//! policy = "best-fit"
//! ```

use crate::core::allocator::FitPolicy;
use crate::core::arena::HEADER_SIZE;
use crate::core::error::{AllocError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AllocatorConfig {
    /// Arena size in bytes
    pub capacity: usize,

    /// Block selection policy
    #[serde(default)]
    pub policy: FitPolicy,
}

impl AllocatorConfig {
    pub fn new(capacity: usize, policy: FitPolicy) -> Self {
        AllocatorConfig { capacity, policy }
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: AllocatorConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&raw)
    }

    /// Capacity must hold a header and at least one payload byte
    pub fn validate(&self) -> Result<()> {
        if self.capacity <= HEADER_SIZE {
            return Err(AllocError::Config(format!(
                "capacity {} must be larger than the {} byte block header",
                self.capacity, HEADER_SIZE
            )));
        }
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string(self).map_err(|e| AllocError::Config(e.to_string()))
    }
}
