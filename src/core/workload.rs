//! Workload scripts
//!
//! A workload is a plain-text list of allocator commands, one per line:
//!
//! ```text
//! # comment
//! alloc a 100      # allocate 100 bytes and call the block "a"
//! alloc b 50
//! free a
//! compact          # remaps names to relocated addresses
//! available
//! stats
//! check
//! ```

use crate::core::allocator::{Allocator, Statistics};
use crate::core::arena::BlockAddr;
use crate::core::error::{AllocError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::io::Write;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Alloc { name: String, size: usize },
    Free { name: String },
    Compact,
    Available,
    Stats,
    Check,
}

/// A command with the script line it came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub line: usize,
    pub command: Command,
}

fn script_error(line: usize, message: impl Into<String>) -> AllocError {
    AllocError::Script {
        line,
        message: message.into(),
    }
}

/// Parse a workload script
pub fn parse_script(src: &str) -> Result<Vec<Step>> {
    let mut steps = Vec::new();

    for (idx, raw) in src.lines().enumerate() {
        let line = idx + 1;
        let text = raw.split('#').next().unwrap_or("").trim();
        if text.is_empty() {
            continue;
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        let command = match words.as_slice() {
            ["alloc", name, size] => {
                let size = size
                    .parse::<usize>()
                    .map_err(|_| script_error(line, format!("invalid size '{}'", size)))?;
                Command::Alloc {
                    name: name.to_string(),
                    size,
                }
            }
            ["free", name] => Command::Free {
                name: name.to_string(),
            },
            ["compact"] => Command::Compact,
            ["available"] => Command::Available,
            ["stats"] => Command::Stats,
            ["check"] => Command::Check,
            _ => return Err(script_error(line, format!("unrecognized command '{}'", text))),
        };

        steps.push(Step { line, command });
    }

    Ok(steps)
}

/// How statistics are rendered by the `stats` command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatsFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonStats<'a> {
    line: usize,
    #[serde(flatten)]
    stats: &'a Statistics,
}

/// Replays steps against an allocator, tracking block names
pub struct Workload {
    allocator: Allocator,
    names: HashMap<String, BlockAddr>,
    format: StatsFormat,
}

impl Workload {
    pub fn new(allocator: Allocator) -> Self {
        Workload {
            allocator,
            names: HashMap::new(),
            format: StatsFormat::Text,
        }
    }

    pub fn with_format(mut self, format: StatsFormat) -> Self {
        self.format = format;
        self
    }

    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    pub fn into_allocator(self) -> Allocator {
        self.allocator
    }

    /// Address currently bound to `name`
    pub fn address_of(&self, name: &str) -> Option<BlockAddr> {
        self.names.get(name).copied()
    }

    pub fn run<W: Write>(&mut self, steps: &[Step], out: &mut W) -> Result<()> {
        for step in steps {
            self.execute(step, out)?;
        }
        Ok(())
    }

    pub fn execute<W: Write>(&mut self, step: &Step, out: &mut W) -> Result<()> {
        debug!("Line {}: {:?}", step.line, step.command);

        match &step.command {
            Command::Alloc { name, size } => {
                if self.names.contains_key(name) {
                    return Err(script_error(step.line, format!("'{}' is already allocated", name)));
                }
                match self.allocator.allocate(*size)? {
                    Some(addr) => {
                        writeln!(out, "alloc {} {} -> {}", name, size, addr)?;
                        self.names.insert(name.clone(), addr);
                    }
                    None => writeln!(out, "alloc {} {} -> null", name, size)?,
                }
            }
            Command::Free { name } => {
                let addr = self
                    .names
                    .remove(name)
                    .ok_or_else(|| script_error(step.line, format!("unknown block '{}'", name)))?;
                self.allocator.deallocate(addr)?;
                writeln!(out, "free {}", name)?;
            }
            Command::Compact => {
                let moves = self.allocator.compact()?;
                let remap: HashMap<BlockAddr, BlockAddr> =
                    moves.iter().map(|m| (m.before, m.after)).collect();
                for addr in self.names.values_mut() {
                    if let Some(&new) = remap.get(addr) {
                        *addr = new;
                    }
                }
                writeln!(out, "compact -> {} blocks", moves.len())?;
                for m in &moves {
                    writeln!(out, "  {} -> {}", m.before, m.after)?;
                }
            }
            Command::Available => {
                writeln!(out, "Available memory = {}", self.allocator.available_memory()?)?;
            }
            Command::Stats => {
                let stats = self.allocator.statistics()?;
                match self.format {
                    StatsFormat::Text => write!(out, "{}", stats)?,
                    StatsFormat::Json => {
                        let json = serde_json::to_string(&JsonStats {
                            line: step.line,
                            stats: &stats,
                        })
                        .map_err(|e| script_error(step.line, e.to_string()))?;
                        writeln!(out, "{}", json)?;
                    }
                }
            }
            Command::Check => {
                self.allocator.check_invariants()?;
                writeln!(out, "check ok")?;
            }
        }

        Ok(())
    }
}
