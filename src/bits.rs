//! Bitboard type and bit-level primitives.
//!
//! Square `i` is bit `i`, row-major from rank 1. Within a rank bit 0 is the
//! h-file and bit 7 the a-file, so h1 = 0, a1 = 7, e4 = 27 and a8 = 63.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A 64-bit board mask, one bit per square.
pub type Bitboard = u64;

pub const EMPTY: Bitboard = 0;
pub const ALL: Bitboard = !0;

pub const FILE_A: Bitboard = 0x8080_8080_8080_8080;
pub const FILE_B: Bitboard = FILE_A >> 1;
pub const FILE_G: Bitboard = FILE_A >> 6;
pub const FILE_H: Bitboard = FILE_A >> 7;

pub const RANK_1: Bitboard = 0xff;
pub const RANK_2: Bitboard = RANK_1 << 8;
pub const RANK_7: Bitboard = RANK_1 << 48;
pub const RANK_8: Bitboard = RANK_1 << 56;

/// Outer ring of the board.
pub const BOARD_EDGE: Bitboard = FILE_A | FILE_H | RANK_1 | RANK_8;

/// Compass directions, from White's point of view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum Direction {
    North,
    East,
    South,
    West,
    NorthEast,
    SouthEast,
    SouthWest,
    NorthWest,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
        Direction::NorthEast,
        Direction::SouthEast,
        Direction::SouthWest,
        Direction::NorthWest,
    ];
}

/// Single-bit board for a square index (0-63).
#[inline(always)]
#[must_use]
pub const fn square_bb(square: usize) -> Bitboard {
    1u64 << square
}

#[inline(always)]
#[must_use]
pub const fn test_bit(board: Bitboard, square: usize) -> bool {
    board & square_bb(square) != 0
}

#[inline(always)]
#[must_use]
pub const fn set_bit(board: Bitboard, square: usize) -> Bitboard {
    board | square_bb(square)
}

#[inline(always)]
#[must_use]
pub const fn clear_bit(board: Bitboard, square: usize) -> Bitboard {
    board & !square_bb(square)
}

/// Clears the lowest set bit. An empty board stays empty.
#[inline(always)]
#[must_use]
pub const fn pop_lsb(board: Bitboard) -> Bitboard {
    board & board.wrapping_sub(1)
}

/// Index of the lowest set bit, or `None` for an empty board.
///
/// `None` is the sentinel for "no square"; callers on hot paths that already
/// know the board is non-empty can use `trailing_zeros` directly.
#[inline(always)]
#[must_use]
pub const fn bitscan(board: Bitboard) -> Option<u32> {
    if board == 0 {
        None
    } else {
        Some(board.trailing_zeros())
    }
}

#[inline(always)]
#[must_use]
pub const fn popcount(board: Bitboard) -> u32 {
    board.count_ones()
}

/// Moves every bit one step in `direction`.
///
/// Bits that would leave the board are dropped; nothing wraps from one edge
/// file to the other.
#[inline(always)]
#[must_use]
pub const fn shift(board: Bitboard, direction: Direction) -> Bitboard {
    match direction {
        Direction::North => board << 8,
        Direction::South => board >> 8,
        Direction::East => (board >> 1) & !FILE_A,
        Direction::West => (board << 1) & !FILE_H,
        Direction::NorthEast => (board << 7) & !FILE_A,
        Direction::SouthEast => (board >> 9) & !FILE_A,
        Direction::NorthWest => (board << 9) & !FILE_H,
        Direction::SouthWest => (board >> 7) & !FILE_H,
    }
}

/// Iterator over the set squares of a bitboard, lowest first.
pub struct Squares(Bitboard);

impl Iterator for Squares {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        let square = bitscan(self.0)?;
        self.0 = pop_lsb(self.0);
        Some(square as usize)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = popcount(self.0) as usize;
        (n, Some(n))
    }
}

impl ExactSizeIterator for Squares {}

#[inline]
#[must_use]
pub fn squares(board: Bitboard) -> Squares {
    Squares(board)
}

/// Renders a board as eight rows of `0`/`1`, rank 8 first and the a-file on
/// the left.
#[must_use]
pub fn repr(board: Bitboard) -> String {
    let mut out = String::with_capacity(8 * 17);
    for rank in (0..8).rev() {
        for file in (0..8).rev() {
            out.push(if test_bit(board, rank * 8 + file) { '1' } else { '0' });
            out.push(' ');
        }
        out.push('\n');
    }
    out
}
