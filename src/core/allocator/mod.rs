//! Block allocation engine
//!
//! The [`Allocator`] carves variable-size blocks out of a single [`Arena`]
//! using one of three fit policies:
//! - First fit: first adequate block in current free-list order
//! - Best fit: smallest adequate block
//! - Worst fit: largest block
//!
//! [`Arena`]: crate::core::arena::Arena

pub mod compaction;
pub mod engine;
pub mod stats;

pub use compaction::Relocation;
pub use engine::Allocator;
pub use stats::Statistics;

use crate::core::error::AllocError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Selection rule among free blocks large enough for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FitPolicy {
    #[default]
    FirstFit,
    BestFit,
    WorstFit,
}

impl FitPolicy {
    pub const ALL: [FitPolicy; 3] = [FitPolicy::FirstFit, FitPolicy::BestFit, FitPolicy::WorstFit];

    pub fn as_str(self) -> &'static str {
        match self {
            FitPolicy::FirstFit => "first-fit",
            FitPolicy::BestFit => "best-fit",
            FitPolicy::WorstFit => "worst-fit",
        }
    }
}

impl fmt::Display for FitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitPolicy {
    type Err = AllocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "first" | "first-fit" | "firstfit" => Ok(FitPolicy::FirstFit),
            "best" | "best-fit" | "bestfit" => Ok(FitPolicy::BestFit),
            "worst" | "worst-fit" | "worstfit" => Ok(FitPolicy::WorstFit),
            _ => Err(AllocError::Config(format!(
                "Invalid fit policy '{}'. Valid options: first-fit, best-fit, worst-fit",
                s
            ))),
        }
    }
}
