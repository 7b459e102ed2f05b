//! Magic constant search for sliding piece attacks.
//!
//! For each square the relevant blocker squares form a mask with `k` bits.
//! Every one of the `2^k` blocker subsets is ray-cast once, then random sparse
//! constants are tried until `(subset * magic) >> (64 - k)` sends subsets with
//! different attack sets to different slots of a `2^k` table.

use log::{debug, trace};
use rand::Rng;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::bits::{
    popcount, shift, square_bb, squares, Bitboard, Direction, BOARD_EDGE, FILE_A, FILE_H, RANK_1,
    RANK_8,
};
use crate::error::AttackTableError;

/// Largest relevant mask is a rook in a corner: 12 bits.
pub const MAX_TABLE_SIZE: usize = 4096;

/// Minimum set bits in the top byte of `magic * mask` for a candidate to be tried.
const MIN_HIGH_BYTE_BITS: u32 = 6;
const HIGH_BYTE: Bitboard = 0xff00_0000_0000_0000;

/// Sliding piece class.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Slider {
    Rook,
    Bishop,
}

impl Slider {
    pub const ALL: [Slider; 2] = [Slider::Rook, Slider::Bishop];

    #[must_use]
    pub const fn directions(self) -> [Direction; 4] {
        match self {
            Slider::Rook => [
                Direction::North,
                Direction::South,
                Direction::East,
                Direction::West,
            ],
            Slider::Bishop => [
                Direction::NorthEast,
                Direction::SouthEast,
                Direction::SouthWest,
                Direction::NorthWest,
            ],
        }
    }
}

/// Squares reached from `square` in `direction`, up to and including the
/// first square in `blockers`.
#[must_use]
pub fn ray(square: usize, direction: Direction, blockers: Bitboard) -> Bitboard {
    let mut result = 0;
    let mut cursor = square_bb(square);
    while cursor != 0 && result & blockers == 0 {
        cursor = shift(cursor, direction);
        result |= cursor;
    }
    result
}

/// Attack set found by walking every ray of `slider`. This is the reference
/// the magic tables are built from and checked against.
#[must_use]
pub fn ray_cast_attacks(square: usize, blockers: Bitboard, slider: Slider) -> Bitboard {
    slider
        .directions()
        .into_iter()
        .fold(0, |acc, dir| acc | ray(square, dir, blockers))
}

/// Squares whose occupancy can change the attack set of `slider` on `square`.
/// The last square of each ray is left out since nothing lies behind it.
#[must_use]
pub fn relevant_mask(square: usize, slider: Slider) -> Bitboard {
    match slider {
        Slider::Rook => {
            (ray(square, Direction::North, 0) & !RANK_8)
                | (ray(square, Direction::South, 0) & !RANK_1)
                | (ray(square, Direction::East, 0) & !FILE_H)
                | (ray(square, Direction::West, 0) & !FILE_A)
        }
        Slider::Bishop => ray_cast_attacks(square, 0, slider) & !BOARD_EDGE,
    }
}

/// The `index`-th subset of `mask`: bit `j` of `index` decides whether the
/// `j`-th lowest square of `mask` is occupied.
#[must_use]
pub fn blocker_subset(index: usize, mask: Bitboard) -> Bitboard {
    squares(mask)
        .enumerate()
        .filter(|(bit, _)| index & (1 << bit) != 0)
        .fold(0, |acc, (_, sq)| acc | square_bb(sq))
}

/// Sparse random candidate: AND of three draws leaves roughly 8 bits set.
fn candidate<R: Rng>(rng: &mut R, mask: Bitboard) -> Bitboard {
    loop {
        let magic = rng.gen::<u64>() & rng.gen::<u64>() & rng.gen::<u64>();
        if popcount(magic.wrapping_mul(mask) & HIGH_BYTE) >= MIN_HIGH_BYTE_BITS {
            return magic;
        }
    }
}

/// Collision-free hashing data for one square and slider.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MagicEntry {
    shift: u32,
    mask: Bitboard,
    magic: Bitboard,
    attacks: Box<[Bitboard]>,
}

impl MagicEntry {
    /// Searches until a working magic is found.
    ///
    /// The search is unbounded; for real board geometry it finishes within
    /// a few thousand candidates.
    pub fn find<R: Rng>(square: usize, slider: Slider, rng: &mut R) -> Self {
        let pairs = BlockerTable::new(square, slider);
        let mut attempts = 0u64;
        loop {
            attempts += 1;
            if let Some(entry) = pairs.try_magic(candidate(rng, pairs.mask)) {
                entry.log_found(square, slider, attempts);
                return entry;
            }
        }
    }

    /// Like [`MagicEntry::find`] but gives up after `max_attempts` candidates.
    pub fn try_find<R: Rng>(
        square: usize,
        slider: Slider,
        rng: &mut R,
        max_attempts: u64,
    ) -> Result<Self, AttackTableError> {
        let pairs = BlockerTable::new(square, slider);
        for attempts in 1..=max_attempts {
            if let Some(entry) = pairs.try_magic(candidate(rng, pairs.mask)) {
                entry.log_found(square, slider, attempts);
                return Ok(entry);
            }
        }
        Err(AttackTableError::MagicSearchExhausted {
            square,
            slider,
            attempts: max_attempts,
        })
    }

    fn log_found(&self, square: usize, slider: Slider, attempts: u64) {
        debug!(
            "{slider:?} magic for square {square}: {:#018x} (shift {}, {attempts} candidates)",
            self.magic, self.shift
        );
    }

    /// Table slot for an occupancy; bits outside the mask are ignored.
    #[inline(always)]
    #[must_use]
    pub fn index(&self, occupancy: Bitboard) -> usize {
        ((occupancy & self.mask).wrapping_mul(self.magic) >> (64 - self.shift)) as usize
    }

    #[inline(always)]
    #[must_use]
    pub fn attacks(&self, occupancy: Bitboard) -> Bitboard {
        self.attacks[self.index(occupancy)]
    }

    /// Number of relevant bits; the table holds `1 << shift` entries.
    #[must_use]
    pub fn shift(&self) -> u32 {
        self.shift
    }

    #[must_use]
    pub fn mask(&self) -> Bitboard {
        self.mask
    }

    #[must_use]
    pub fn magic(&self) -> Bitboard {
        self.magic
    }

    #[must_use]
    pub fn table(&self) -> &[Bitboard] {
        &self.attacks
    }
}

/// Every blocker subset of a square's mask paired with its true attack set.
struct BlockerTable {
    shift: u32,
    mask: Bitboard,
    blockers: Vec<Bitboard>,
    attacks: Vec<Bitboard>,
}

impl BlockerTable {
    fn new(square: usize, slider: Slider) -> Self {
        let mask = relevant_mask(square, slider);
        let shift = popcount(mask);
        let blockers: Vec<Bitboard> = (0..1usize << shift)
            .map(|i| blocker_subset(i, mask))
            .collect();
        let attacks = blockers
            .iter()
            .map(|&b| ray_cast_attacks(square, b, slider))
            .collect();
        BlockerTable {
            shift,
            mask,
            blockers,
            attacks,
        }
    }

    /// Places every pair with `magic`, or returns `None` on a harmful collision.
    /// An empty slot is 0 since every slider attacks at least one square.
    fn try_magic(&self, magic: Bitboard) -> Option<MagicEntry> {
        let mut table = vec![0; 1 << self.shift].into_boxed_slice();
        for (&blockers, &attacks) in self.blockers.iter().zip(&self.attacks) {
            let index = (blockers.wrapping_mul(magic) >> (64 - self.shift)) as usize;
            if table[index] == 0 {
                table[index] = attacks;
            } else if table[index] != attacks {
                trace!("magic {magic:#018x} rejected at slot {index}");
                return None;
            }
        }
        Some(MagicEntry {
            shift: self.shift,
            mask: self.mask,
            magic,
            attacks: table,
        })
    }
}
