//! Precomputed attack tables for leaper pieces (knights, kings).

use crate::bits::{shift, square_bb, Bitboard, Direction};

pub(crate) fn king_attacks_from(square: usize) -> Bitboard {
    let bb = square_bb(square);
    Direction::ALL
        .into_iter()
        .fold(0, |acc, dir| acc | shift(bb, dir))
}

pub(crate) fn knight_attacks_from(square: usize) -> Bitboard {
    use Direction::*;
    let bb = square_bb(square);
    // one orthogonal step followed by a diagonal step away from it
    [
        (North, NorthEast),
        (East, NorthEast),
        (East, SouthEast),
        (South, SouthEast),
        (South, SouthWest),
        (West, SouthWest),
        (West, NorthWest),
        (North, NorthWest),
    ]
    .into_iter()
    .fold(0, |acc, (first, second)| acc | shift(shift(bb, first), second))
}

pub(crate) fn king_table() -> [Bitboard; 64] {
    std::array::from_fn(king_attacks_from)
}

pub(crate) fn knight_table() -> [Bitboard; 64] {
    std::array::from_fn(knight_attacks_from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_knight_attacks() {
        assert_eq!(knight_attacks_from(27), 0x0000_1422_0022_1400); // e4
        assert_eq!(knight_attacks_from(11), 0x0000_0000_1422_0022); // e2
        assert_eq!(knight_attacks_from(51), 0x2200_2214_0000_0000); // e7
        assert_eq!(knight_attacks_from(31), 0x0000_4020_0020_4000); // a4
        assert_eq!(knight_attacks_from(24), 0x0000_0204_0004_0200); // h4
    }

    #[test]
    fn test_knight_corner() {
        // h1 reaches f2 and g3
        assert_eq!(knight_attacks_from(0), square_bb(10) | square_bb(17));
    }

    #[test]
    fn test_king_attacks() {
        assert_eq!(king_attacks_from(27), 0x0000_001c_141c_0000);
        assert_eq!(king_attacks_from(3), 0x0000_0000_0000_1c14);
        assert_eq!(king_attacks_from(59), 0x141c_0000_0000_0000);
        assert_eq!(king_attacks_from(31), 0x0000_00c0_40c0_0000);
        assert_eq!(king_attacks_from(24), 0x0000_0003_0203_0000);
    }

    #[test]
    fn test_leaper_counts() {
        let kings = king_table();
        let knights = knight_table();
        assert_eq!(kings[0].count_ones(), 3);
        assert_eq!(kings[36].count_ones(), 8);
        assert_eq!(knights[7].count_ones(), 2);
        assert_eq!(knights[36].count_ones(), 8);
        assert_eq!(kings.iter().map(|b| b.count_ones()).sum::<u32>(), 420);
        assert_eq!(knights.iter().map(|b| b.count_ones()).sum::<u32>(), 336);
    }
}
