//! Bitboard primitives, magic-bitboard attack tables and a lock-free
//! transposition table for chess engines.

pub mod attack_tables;
pub mod bits;
pub mod config;
pub mod error;
pub mod square;
pub mod tt;

#[cfg(test)]
mod tests;

pub use attack_tables::{
    bishop_attacks, init_attack_maps, init_attack_maps_with, king_attacks, knight_attacks,
    queen_attacks, rook_attacks, AttackMaps, MagicEntry, Slider,
};
pub use bits::{Bitboard, Direction};
pub use config::{EngineOptions, OptionAction};
pub use error::{AttackTableError, OptionError};
pub use tt::{HashEntry, HashKey, HashTable, SharedHashTable};
