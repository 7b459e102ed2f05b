//! Engine options that configure the attack maps and the hash table.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::OptionError;
use crate::tt::SharedHashTable;

/// Default transposition table size in MB
pub const DEFAULT_HASH_MB: usize = 16;
pub const MAX_HASH_MB: usize = 65536;
pub const MAX_THREADS: usize = 256;

/// Table work requested by an option change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionAction {
    ResizeHash(usize),
    ClearHash,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EngineOptions {
    pub hash_mb: usize,
    pub threads: usize,
    /// Seed for the magic search; `None` draws from OS entropy.
    pub magic_seed: Option<u64>,
}

impl Default for EngineOptions {
    fn default() -> Self {
        EngineOptions {
            hash_mb: DEFAULT_HASH_MB,
            threads: 1,
            magic_seed: None,
        }
    }
}

impl EngineOptions {
    /// Apply a named option. Names are matched case-insensitively.
    pub fn set_option(
        &mut self,
        name: &str,
        value: Option<&str>,
    ) -> Result<Option<OptionAction>, OptionError> {
        let normalized = name.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "hash" => {
                let mb = parse_in_range(name, value, 1, MAX_HASH_MB)?;
                if mb != self.hash_mb {
                    self.hash_mb = mb;
                    return Ok(Some(OptionAction::ResizeHash(mb)));
                }
                Ok(None)
            }
            "clear hash" => Ok(Some(OptionAction::ClearHash)),
            "threads" => {
                self.threads = parse_in_range(name, value, 1, MAX_THREADS)?;
                Ok(None)
            }
            "magic seed" => {
                let raw = required(name, value)?;
                self.magic_seed = if raw.eq_ignore_ascii_case("random") {
                    None
                } else {
                    Some(raw.parse().map_err(|_| invalid(name, raw))?)
                };
                Ok(None)
            }
            _ => Err(OptionError::UnknownOption {
                name: name.trim().to_string(),
            }),
        }
    }

    /// Carry out an action returned by [`EngineOptions::set_option`].
    pub fn apply(action: OptionAction, table: &SharedHashTable) {
        match action {
            OptionAction::ResizeHash(mb) => table.resize(mb),
            OptionAction::ClearHash => table.clear(),
        }
    }
}

fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, OptionError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| OptionError::MissingValue {
            name: name.trim().to_string(),
        })
}

fn invalid(name: &str, value: &str) -> OptionError {
    OptionError::InvalidValue {
        name: name.trim().to_string(),
        value: value.to_string(),
    }
}

fn parse_in_range(
    name: &str,
    value: Option<&str>,
    min: usize,
    max: usize,
) -> Result<usize, OptionError> {
    let raw = required(name, value)?;
    raw.parse::<usize>()
        .ok()
        .filter(|v| (min..=max).contains(v))
        .ok_or_else(|| invalid(name, raw))
}
