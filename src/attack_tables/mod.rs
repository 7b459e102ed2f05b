//! Attack tables for move generation.
//!
//! Sliding attacks use magic bitboards: per square, the occupancy is masked to
//! the relevant blocker squares, multiplied by a magic constant and shifted to
//! an index into a dense table of precomputed attack sets. The magics are
//! searched for at startup with a seedable random source.
//!
//! The tables are built once into an immutable [`AttackMaps`]. The process-wide
//! instance is created by [`init_attack_maps`] the first time any thread asks
//! for it and is then shared read-only.

mod magic;
mod tables;

use std::time::Instant;

use log::{info, warn};
use once_cell::sync::OnceCell;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;

use crate::bits::Bitboard;
use crate::error::AttackTableError;

pub use magic::{
    blocker_subset, ray, ray_cast_attacks, relevant_mask, MagicEntry, Slider, MAX_TABLE_SIZE,
};

/// All precomputed attack data.
pub struct AttackMaps {
    rook: Vec<MagicEntry>,
    bishop: Vec<MagicEntry>,
    king: [Bitboard; 64],
    knight: [Bitboard; 64],
}

impl AttackMaps {
    /// Builds every table, drawing one seed per square and slider from `rng`.
    ///
    /// The squares are searched in parallel, each with its own generator
    /// seeded from `rng`, so a seeded `rng` gives identical tables every run.
    pub fn from_rng<R: Rng>(rng: &mut R) -> Self {
        let seeds = SquareSeeds::draw(rng);
        let build = |slider: Slider, seeds: &[u64; 64]| -> Vec<MagicEntry> {
            seeds
                .par_iter()
                .enumerate()
                .map(|(sq, &seed)| MagicEntry::find(sq, slider, &mut StdRng::seed_from_u64(seed)))
                .collect()
        };
        AttackMaps {
            rook: build(Slider::Rook, &seeds.rook),
            bishop: build(Slider::Bishop, &seeds.bishop),
            king: tables::king_table(),
            knight: tables::knight_table(),
        }
    }

    /// Like [`AttackMaps::from_rng`] with at most `max_attempts` magic
    /// candidates per square.
    pub fn try_from_rng<R: Rng>(rng: &mut R, max_attempts: u64) -> Result<Self, AttackTableError> {
        let seeds = SquareSeeds::draw(rng);
        let build = |slider: Slider, seeds: &[u64; 64]| {
            seeds
                .par_iter()
                .enumerate()
                .map(|(sq, &seed)| {
                    let mut rng = StdRng::seed_from_u64(seed);
                    MagicEntry::try_find(sq, slider, &mut rng, max_attempts)
                })
                .collect::<Result<Vec<_>, AttackTableError>>()
        };
        Ok(AttackMaps {
            rook: build(Slider::Rook, &seeds.rook)?,
            bishop: build(Slider::Bishop, &seeds.bishop)?,
            king: tables::king_table(),
            knight: tables::knight_table(),
        })
    }

    /// Builds from a fixed seed.
    #[must_use]
    pub fn from_seed(seed: u64) -> Self {
        Self::from_rng(&mut StdRng::seed_from_u64(seed))
    }

    /// Magic data for one square and slider.
    #[inline]
    #[must_use]
    pub fn magic(&self, square: usize, slider: Slider) -> &MagicEntry {
        match slider {
            Slider::Rook => &self.rook[square],
            Slider::Bishop => &self.bishop[square],
        }
    }

    #[inline(always)]
    #[must_use]
    pub fn sliding_attacks(&self, square: usize, occupancy: Bitboard, slider: Slider) -> Bitboard {
        self.magic(square, slider).attacks(occupancy)
    }

    #[inline(always)]
    #[must_use]
    pub fn rook_attacks(&self, square: usize, occupancy: Bitboard) -> Bitboard {
        self.rook[square].attacks(occupancy)
    }

    #[inline(always)]
    #[must_use]
    pub fn bishop_attacks(&self, square: usize, occupancy: Bitboard) -> Bitboard {
        self.bishop[square].attacks(occupancy)
    }

    #[inline(always)]
    #[must_use]
    pub fn queen_attacks(&self, square: usize, occupancy: Bitboard) -> Bitboard {
        self.rook_attacks(square, occupancy) | self.bishop_attacks(square, occupancy)
    }

    #[inline(always)]
    #[must_use]
    pub fn king_attacks(&self, square: usize) -> Bitboard {
        self.king[square]
    }

    #[inline(always)]
    #[must_use]
    pub fn knight_attacks(&self, square: usize) -> Bitboard {
        self.knight[square]
    }
}

struct SquareSeeds {
    rook: [u64; 64],
    bishop: [u64; 64],
}

impl SquareSeeds {
    fn draw<R: Rng>(rng: &mut R) -> Self {
        SquareSeeds {
            rook: std::array::from_fn(|_| rng.gen()),
            bishop: std::array::from_fn(|_| rng.gen()),
        }
    }
}

static ATTACK_MAPS: OnceCell<AttackMaps> = OnceCell::new();

/// Returns the process-wide attack maps, generating them on the first call.
///
/// Safe to call from any number of threads; generation runs exactly once and
/// concurrent callers block until it is done.
pub fn init_attack_maps() -> &'static AttackMaps {
    init_attack_maps_with(None)
}

/// Like [`init_attack_maps`], seeding the magic search with `seed` (entropy
/// when `None`). The seed only matters for the call that performs the
/// generation; later calls return the existing maps.
pub fn init_attack_maps_with(seed: Option<u64>) -> &'static AttackMaps {
    init_in(&ATTACK_MAPS, seed)
}

/// Generation runs on a private thread pool. Threads waiting in `get_or_init`
/// may be workers of the global rayon pool, which could then never pick up
/// the build's parallel jobs.
fn init_in(cell: &OnceCell<AttackMaps>, seed: Option<u64>) -> &AttackMaps {
    cell.get_or_init(|| {
        info!("Initializing attack maps");
        let start = Instant::now();
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pool = ThreadPoolBuilder::new()
            .thread_name(|i| format!("attack-maps-{i}"))
            .build();
        let maps = match pool {
            Ok(pool) => pool.install(|| AttackMaps::from_rng(&mut rng)),
            Err(err) => {
                warn!("No private pool for attack maps ({err}), using the global pool");
                AttackMaps::from_rng(&mut rng)
            }
        };
        info!("Attack maps initialized in {:?}", start.elapsed());
        maps
    })
}

/// Rook attacks from `square` given all occupied squares.
#[inline]
pub fn rook_attacks(square: usize, occupancy: Bitboard) -> Bitboard {
    init_attack_maps().rook_attacks(square, occupancy)
}

/// Bishop attacks from `square` given all occupied squares.
#[inline]
pub fn bishop_attacks(square: usize, occupancy: Bitboard) -> Bitboard {
    init_attack_maps().bishop_attacks(square, occupancy)
}

/// Queen attacks (rook | bishop).
#[inline]
pub fn queen_attacks(square: usize, occupancy: Bitboard) -> Bitboard {
    init_attack_maps().queen_attacks(square, occupancy)
}

#[inline]
pub fn king_attacks(square: usize) -> Bitboard {
    init_attack_maps().king_attacks(square)
}

#[inline]
pub fn knight_attacks(square: usize) -> Bitboard {
    init_attack_maps().knight_attacks(square)
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCKERS_RING: Bitboard = 0xffff_c3c3_c3c3_ffff;

    #[test]
    fn test_bishop_attacks_e4() {
        assert_eq!(bishop_attacks(27, 0), 0x8041_2214_0014_2241);
        assert_eq!(bishop_attacks(27, 0xffff_ff00_0000_ffff), 0x0000_2214_0014_2200);
    }

    #[test]
    fn test_rook_attacks_e4() {
        assert_eq!(rook_attacks(27, 0), 0x0808_0808_f708_0808);
        assert_eq!(rook_attacks(27, BLOCKERS_RING), 0x0008_0808_7608_0800);
    }

    #[test]
    fn test_queen_attacks_e4() {
        assert_eq!(queen_attacks(27, 0), 0x8849_2a1c_f71c_2a49);
        assert_eq!(queen_attacks(27, BLOCKERS_RING), 0x0048_2a1c_761c_2a00);
    }

    #[test]
    fn test_leaper_lookups() {
        assert_eq!(knight_attacks(27), 0x0000_1422_0022_1400);
        assert_eq!(king_attacks(27), 0x0000_001c_141c_0000);
    }

    #[test]
    fn test_init_returns_same_instance() {
        let a = init_attack_maps() as *const AttackMaps;
        let b = init_attack_maps_with(Some(99)) as *const AttackMaps;
        assert_eq!(a, b);
    }

    #[test]
    fn test_init_while_global_pool_waits_completes() {
        let cell = OnceCell::new();
        let addrs: Vec<usize> = std::thread::scope(|scope| {
            let outside = scope.spawn(|| init_in(&cell, Some(11)) as *const AttackMaps as usize);
            let mut addrs: Vec<usize> = (0..rayon::current_num_threads() * 4)
                .into_par_iter()
                .map(|_| init_in(&cell, Some(11)) as *const AttackMaps as usize)
                .collect();
            addrs.push(outside.join().unwrap());
            addrs
        });
        assert!(addrs.windows(2).all(|w| w[0] == w[1]));
        assert_eq!(
            cell.get().map(|maps| maps.rook_attacks(27, 0)),
            Some(0x0808_0808_f708_0808)
        );
    }

    #[test]
    fn test_occupancy_outside_mask_is_ignored() {
        let maps = init_attack_maps();
        for sq in [0, 27, 63] {
            for slider in Slider::ALL {
                let mask = maps.magic(sq, slider).mask();
                let noise = !mask;
                assert_eq!(
                    maps.sliding_attacks(sq, noise, slider),
                    maps.sliding_attacks(sq, 0, slider)
                );
            }
        }
    }

    #[test]
    fn test_seeded_maps_are_reproducible() {
        let a = AttackMaps::from_seed(2024);
        let b = AttackMaps::from_seed(2024);
        for sq in 0..64 {
            for slider in Slider::ALL {
                assert_eq!(a.magic(sq, slider).magic(), b.magic(sq, slider).magic());
            }
        }
    }

    #[test]
    fn test_bounded_generation_reports_exhaustion() {
        let mut rng = StdRng::seed_from_u64(5);
        match AttackMaps::try_from_rng(&mut rng, 0) {
            Err(AttackTableError::MagicSearchExhausted { attempts, .. }) => assert_eq!(attempts, 0),
            Ok(_) => panic!("zero attempts cannot succeed"),
        }
    }
}
