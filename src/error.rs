//! Error types for attack table generation and engine options.

use std::fmt;

use crate::attack_tables::Slider;

/// Error type for bounded attack table generation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttackTableError {
    /// No collision-free magic was found within the attempt budget
    MagicSearchExhausted {
        square: usize,
        slider: Slider,
        attempts: u64,
    },
}

impl fmt::Display for AttackTableError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttackTableError::MagicSearchExhausted {
                square,
                slider,
                attempts,
            } => write!(
                f,
                "No {slider:?} magic found for square {square} after {attempts} candidates"
            ),
        }
    }
}

impl std::error::Error for AttackTableError {}

/// Error type for `EngineOptions::set_option`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionError {
    /// Option name is not recognised
    UnknownOption { name: String },
    /// Option requires a value but none was given
    MissingValue { name: String },
    /// Value could not be parsed or is out of range
    InvalidValue { name: String, value: String },
}

impl fmt::Display for OptionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionError::UnknownOption { name } => write!(f, "Unknown option '{name}'"),
            OptionError::MissingValue { name } => write!(f, "Option '{name}' requires a value"),
            OptionError::InvalidValue { name, value } => {
                write!(f, "Invalid value '{value}' for option '{name}'")
            }
        }
    }
}

impl std::error::Error for OptionError {}
