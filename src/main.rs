//! Command-line driver for the attack tables and the hash table.

use std::io::Write;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use chess_core::bits::{repr, Bitboard};
use chess_core::config::EngineOptions;
use chess_core::square::{square_from_name, square_name};
use chess_core::tt::{HashEntry, SharedHashTable};
use chess_core::{init_attack_maps_with, Slider};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Seed for the magic search (OS entropy when omitted)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print shift, mask and magic for every square
    Magics {
        #[arg(long, value_enum)]
        slider: Option<SliderArg>,
    },
    /// Print the attack set of a piece on a square
    Attacks {
        /// Square name (e4) or index (0-63)
        square: String,
        #[arg(long, value_enum, default_value_t = PieceArg::Queen)]
        piece: PieceArg,
        /// Occupied squares as a hex bitboard
        #[arg(long, default_value = "0")]
        occupancy: String,
    },
    /// Concurrent stash/probe stress run
    HashBench {
        #[arg(long, default_value_t = 16)]
        hash_mb: usize,
        #[arg(long, default_value_t = 1)]
        threads: usize,
        /// Operations per thread
        #[arg(long, default_value_t = 1_000_000)]
        ops: u64,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SliderArg {
    Rook,
    Bishop,
}

impl From<SliderArg> for Slider {
    fn from(arg: SliderArg) -> Self {
        match arg {
            SliderArg::Rook => Slider::Rook,
            SliderArg::Bishop => Slider::Bishop,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PieceArg {
    Rook,
    Bishop,
    Queen,
    King,
    Knight,
}

fn main() -> Result<()> {
    let args = Args::parse();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match args.command {
        Command::Magics { slider } => print_magics(args.seed, slider),
        Command::Attacks {
            square,
            piece,
            occupancy,
        } => print_attacks(args.seed, &square, piece, &occupancy),
        Command::HashBench {
            hash_mb,
            threads,
            ops,
        } => hash_bench(hash_mb, threads, ops),
    }
}

fn print_magics(seed: Option<u64>, slider: Option<SliderArg>) -> Result<()> {
    let maps = init_attack_maps_with(seed);
    let sliders = match slider {
        Some(s) => vec![Slider::from(s)],
        None => Slider::ALL.to_vec(),
    };
    let mut out = std::io::stdout().lock();
    for slider in sliders {
        writeln!(out, "{slider:?}")?;
        for sq in 0..64 {
            let entry = maps.magic(sq, slider);
            writeln!(
                out,
                "  {:>2} {}  shift {:>2}  mask {:#018x}  magic {:#018x}",
                sq,
                square_name(sq),
                entry.shift(),
                entry.mask(),
                entry.magic()
            )?;
        }
    }
    Ok(())
}

fn parse_square(text: &str) -> Result<usize> {
    if let Some(sq) = square_from_name(text) {
        return Ok(sq);
    }
    let sq: usize = text
        .parse()
        .with_context(|| format!("'{text}' is not a square name or index"))?;
    if sq >= 64 {
        bail!("square index {sq} out of range 0-63");
    }
    Ok(sq)
}

fn parse_bitboard(text: &str) -> Result<Bitboard> {
    let digits = text.trim_start_matches("0x").replace('_', "");
    Bitboard::from_str_radix(&digits, 16).with_context(|| format!("invalid hex bitboard '{text}'"))
}

fn print_attacks(seed: Option<u64>, square: &str, piece: PieceArg, occupancy: &str) -> Result<()> {
    let square = parse_square(square)?;
    let occupancy = parse_bitboard(occupancy)?;
    let maps = init_attack_maps_with(seed);
    let attacks = match piece {
        PieceArg::Rook => maps.rook_attacks(square, occupancy),
        PieceArg::Bishop => maps.bishop_attacks(square, occupancy),
        PieceArg::Queen => maps.queen_attacks(square, occupancy),
        PieceArg::King => maps.king_attacks(square),
        PieceArg::Knight => maps.knight_attacks(square),
    };
    println!(
        "{piece:?} on {} with occupancy {occupancy:#018x}: {attacks:#018x}",
        square_name(square)
    );
    print!("{}", repr(attacks));
    Ok(())
}

/// Data word derived from the key so any hit can be checked.
fn expected_entry(key: u64) -> HashEntry {
    HashEntry::new((key >> 48) as u16, (key >> 32) as i16, key as u16, key)
}

/// Options and table for a stress run, with the requested size applied.
fn configure_bench(hash_mb: usize, threads: usize) -> Result<(EngineOptions, SharedHashTable)> {
    let mut options = EngineOptions::default();
    let table = SharedHashTable::new(options.hash_mb);
    if let Some(action) = options
        .set_option("Hash", Some(&hash_mb.to_string()))
        .context("hash size")?
    {
        EngineOptions::apply(action, &table);
    }
    options
        .set_option("Threads", Some(&threads.to_string()))
        .context("thread count")?;
    Ok((options, table))
}

/// Returns total (hits, misses, inconsistent) over all workers.
fn run_workers(table: &SharedHashTable, threads: usize, ops: u64) -> Result<(u64, u64, u64)> {
    std::thread::scope(|scope| {
        let workers: Vec<_> = (0..threads)
            .map(|id| {
                let table = table.clone();
                scope.spawn(move || {
                    let session = table.session();
                    let mut rng = StdRng::seed_from_u64(id as u64);
                    let (mut hits, mut misses, mut corrupt) = (0u64, 0u64, 0u64);
                    for _ in 0..ops {
                        // small key space so threads contend for slots
                        let key = rng.gen::<u64>() & 0xffff_0000_000f_ffff;
                        if rng.gen_bool(0.5) {
                            session.stash(expected_entry(key));
                        } else {
                            match session.probe(key) {
                                Some(entry) if entry == expected_entry(key) => hits += 1,
                                Some(_) => corrupt += 1,
                                None => misses += 1,
                            }
                        }
                    }
                    (hits, misses, corrupt)
                })
            })
            .collect();
        workers
            .into_iter()
            .map(|w| w.join().map_err(|_| anyhow!("hash-bench worker panicked")))
            .try_fold((0, 0, 0), |acc, r| {
                r.map(|r| (acc.0 + r.0, acc.1 + r.1, acc.2 + r.2))
            })
    })
}

fn hash_bench(hash_mb: usize, threads: usize, ops: u64) -> Result<()> {
    let (options, table) = configure_bench(hash_mb, threads)?;
    let start = Instant::now();
    let (hits, misses, corrupt) = run_workers(&table, options.threads, ops)?;
    let elapsed = start.elapsed();
    let total = ops * options.threads as u64;

    println!(
        "{} entries, {} threads, {total} ops in {elapsed:?}",
        table.size(),
        options.threads
    );
    println!("hits {hits}  misses {misses}  inconsistent {corrupt}");
    println!(
        "{:.1} Mops/s, hashfull {}",
        total as f64 / elapsed.as_secs_f64().max(f64::EPSILON) / 1e6,
        table.session().hashfull_per_mille()
    );
    Ok(())
}
