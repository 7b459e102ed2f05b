//! Transposition table for caching search results.
//!
//! A power-of-two array of fixed-width slots indexed by the low bits of the
//! position's Zobrist hash. Every stash overwrites its slot.
//!
//! `stash` and `probe` take `&self` and use only relaxed atomic loads and
//! stores, so any number of search threads may call them concurrently with no
//! locking. A slot is written as three separate words (key, data, checksum),
//! which means a reader can observe a half-written slot. Each slot carries
//! `checksum = data ^ key`; a probe that sees words from different writes will
//! almost always fail that check and report a miss. A torn read that happens
//! to satisfy the equation is accepted.
//!
//! An all-zero slot is empty, so it never matches key 0. The one entry that
//! cannot be stored is the all-zero entry itself.
//!
//! `resize` and `clear` need exclusive access. [`SharedHashTable`] provides
//! that across threads with a read/write lock that is taken once per search
//! session, never per probe.

use std::mem;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use log::{debug, info};
use parking_lot::{RwLock, RwLockReadGuard};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Zobrist hash of a position.
pub type HashKey = u64;

const BYTES_PER_MB: usize = 1024 * 1024;

/// Packed data format:
/// - bits 0-15:  best move
/// - bits 16-31: eval (i16 as u16)
/// - bits 32-47: depth
const MOVE_SHIFT: u32 = 0;
const EVAL_SHIFT: u32 = 16;
const DEPTH_SHIFT: u32 = 32;
const FIELD_MASK: u64 = 0xffff;

/// One cached search result.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct HashEntry {
    key: HashKey,
    data: u64,
    checksum: u64,
}

impl HashEntry {
    #[must_use]
    pub fn new(depth: u16, eval: i16, best_move: u16, key: HashKey) -> Self {
        let data = (u64::from(depth) << DEPTH_SHIFT)
            | (u64::from(eval as u16) << EVAL_SHIFT)
            | (u64::from(best_move) << MOVE_SHIFT);
        HashEntry {
            key,
            data,
            checksum: data ^ key,
        }
    }

    #[inline]
    #[must_use]
    pub fn key(&self) -> HashKey {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn depth(&self) -> u16 {
        ((self.data >> DEPTH_SHIFT) & FIELD_MASK) as u16
    }

    #[inline]
    #[must_use]
    pub fn eval(&self) -> i16 {
        ((self.data >> EVAL_SHIFT) & FIELD_MASK) as u16 as i16
    }

    #[inline]
    #[must_use]
    pub fn best_move(&self) -> u16 {
        ((self.data >> MOVE_SHIFT) & FIELD_MASK) as u16
    }

    /// Raw packed `depth | eval | best_move` word.
    #[inline]
    #[must_use]
    pub fn data(&self) -> u64 {
        self.data
    }

    #[inline]
    #[must_use]
    pub fn checksum(&self) -> u64 {
        self.checksum
    }

    #[inline]
    fn is_consistent(&self) -> bool {
        self.checksum == self.data ^ self.key
    }

    #[inline]
    fn is_empty(&self) -> bool {
        self.key == 0 && self.data == 0 && self.checksum == 0
    }
}

/// Storage for one entry. Same layout and size as [`HashEntry`].
#[derive(Default)]
#[repr(C)]
struct HashSlot {
    key: AtomicU64,
    data: AtomicU64,
    checksum: AtomicU64,
}

impl HashSlot {
    #[inline]
    fn store(&self, entry: &HashEntry) {
        self.key.store(entry.key, Ordering::Relaxed);
        self.data.store(entry.data, Ordering::Relaxed);
        self.checksum.store(entry.checksum, Ordering::Relaxed);
    }

    #[inline]
    fn load(&self) -> HashEntry {
        HashEntry {
            key: self.key.load(Ordering::Relaxed),
            data: self.data.load(Ordering::Relaxed),
            checksum: self.checksum.load(Ordering::Relaxed),
        }
    }

    fn reset(&mut self) {
        *self.key.get_mut() = 0;
        *self.data.get_mut() = 0;
        *self.checksum.get_mut() = 0;
    }
}

/// Number of entries that fit in `megabytes`: the largest power of two whose
/// total size does not exceed the budget, and never less than one.
#[must_use]
pub fn capacity_for(megabytes: usize) -> usize {
    let entries = megabytes.saturating_mul(BYTES_PER_MB) / mem::size_of::<HashEntry>();
    match entries {
        0 => 1,
        n => 1usize << (usize::BITS - 1 - n.leading_zeros()),
    }
}

/// Fixed-size, always-replace transposition table.
pub struct HashTable {
    slots: Box<[HashSlot]>,
    mask: usize,
}

impl HashTable {
    /// Create a table using at most `megabytes` of entry storage.
    #[must_use]
    pub fn new(megabytes: usize) -> Self {
        let mut table = HashTable {
            slots: Box::default(),
            mask: 0,
        };
        table.resize(megabytes);
        table
    }

    /// Reallocate to the capacity for `megabytes`, discarding all entries.
    pub fn resize(&mut self, megabytes: usize) {
        let capacity = capacity_for(megabytes);
        // Free the old storage before allocating the new one.
        self.slots = Box::default();
        self.slots = (0..capacity).map(|_| HashSlot::default()).collect();
        self.mask = capacity - 1;
        info!(
            "Hash table resized to {capacity} entries ({} bytes)",
            capacity * mem::size_of::<HashEntry>()
        );
    }

    /// Reset every entry to the empty value.
    pub fn clear(&mut self) {
        self.slots.par_iter_mut().for_each(HashSlot::reset);
        debug!("Hash table cleared ({} entries)", self.slots.len());
    }

    #[inline]
    fn slot(&self, key: HashKey) -> &HashSlot {
        &self.slots[(key as usize) & self.mask]
    }

    /// Store `entry` in its slot, replacing whatever was there.
    ///
    /// The checksum is recomputed from the entry's key and data.
    #[inline]
    pub fn stash(&self, mut entry: HashEntry) {
        entry.checksum = entry.data ^ entry.key;
        self.slot(entry.key).store(&entry);
    }

    /// Look up `key`. Returns `None` when the slot is empty, holds another
    /// key, or holds a torn write that fails the checksum.
    #[inline]
    #[must_use]
    pub fn probe(&self, key: HashKey) -> Option<HashEntry> {
        let stored = self.slot(key).load();
        (stored.key == key && stored.is_consistent() && !stored.is_empty()).then_some(stored)
    }

    /// Number of entries.
    #[inline]
    #[must_use]
    pub fn size(&self) -> usize {
        self.slots.len()
    }

    /// Entries per thousand that are non-empty, sampled from the first 1000 slots.
    #[must_use]
    pub fn hashfull_per_mille(&self) -> u32 {
        let sample = self.slots.len().min(1000);
        let used = self.slots[..sample]
            .iter()
            .filter(|slot| !slot.load().is_empty())
            .count();
        ((used * 1000) / sample) as u32
    }
}

/// A [`HashTable`] shared by a pool of search threads.
///
/// Workers hold a [`SharedHashTable::session`] guard for the length of a
/// search and stash/probe through it freely. `resize` and `clear` wait for all
/// sessions to end.
#[derive(Clone)]
pub struct SharedHashTable(Arc<RwLock<HashTable>>);

impl SharedHashTable {
    #[must_use]
    pub fn new(megabytes: usize) -> Self {
        SharedHashTable(Arc::new(RwLock::new(HashTable::new(megabytes))))
    }

    /// Shared access for the duration of a search.
    #[must_use]
    pub fn session(&self) -> RwLockReadGuard<'_, HashTable> {
        self.0.read()
    }

    pub fn resize(&self, megabytes: usize) {
        self.0.write().resize(megabytes);
    }

    pub fn clear(&self) {
        self.0.write().clear();
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.0.read().size()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_fields() {
        let entry = HashEntry::new(5, 100, 0x905, 0xffff);
        assert_eq!(entry.depth(), 5);
        assert_eq!(entry.eval(), 100);
        assert_eq!(entry.best_move(), 0x905);
        assert_eq!(entry.key(), 0xffff);
        assert_eq!(entry.checksum(), entry.data() ^ entry.key());
    }

    #[test]
    fn test_entry_extreme_values() {
        let entry = HashEntry::new(u16::MAX, i16::MIN, u16::MAX, u64::MAX);
        assert_eq!(entry.depth(), u16::MAX);
        assert_eq!(entry.eval(), i16::MIN);
        assert_eq!(entry.best_move(), u16::MAX);
        assert_eq!(HashEntry::new(1, -1, 0, 0).eval(), -1);
    }

    #[test]
    fn test_slot_matches_entry_size() {
        assert_eq!(mem::size_of::<HashEntry>(), 24);
        assert_eq!(mem::size_of::<HashSlot>(), mem::size_of::<HashEntry>());
    }

    #[test]
    fn test_resize_sizes() {
        let mut tt = HashTable::new(1);
        for mb in [24, 12, 10, 5, 1, 3, 7, 64] {
            tt.resize(mb);
            let size = tt.size();
            let bytes = size * mem::size_of::<HashEntry>();
            assert!(size.is_power_of_two(), "{mb} MB -> {size}");
            assert!(bytes <= mb * BYTES_PER_MB, "{mb} MB -> {bytes} bytes");
            assert!(bytes > mb * BYTES_PER_MB / 2, "{mb} MB -> {bytes} bytes");
        }
    }

    #[test]
    fn test_zero_budget_gives_single_slot() {
        assert_eq!(capacity_for(0), 1);
        let tt = HashTable::new(0);
        assert_eq!(tt.size(), 1);
        tt.stash(HashEntry::new(3, 7, 1, 0xabc));
        assert_eq!(tt.probe(0xabc).map(|e| e.depth()), Some(3));
    }

    #[test]
    fn test_stash_probe_no_collision() {
        let tt = HashTable::new(1);
        let entry = HashEntry::new(5, 100, 0x60, 0xff);
        tt.stash(entry);
        assert!(tt.probe(0xfe).is_none());
        let found = tt.probe(0xff).expect("stashed entry");
        assert_eq!(found.depth(), 5);
        assert_eq!(found.eval(), 100);
        assert_eq!(found.best_move(), 0x60);
    }

    #[test]
    fn test_stash_same_key_overwrites() {
        let tt = HashTable::new(1);
        tt.stash(HashEntry::new(5, 100, 0x60, 0xff));
        tt.stash(HashEntry::new(8, 150, 0x90, 0xff));
        let found = tt.probe(0xff).expect("stashed entry");
        assert_eq!(found, HashEntry::new(8, 150, 0x90, 0xff));
    }

    #[test]
    fn test_colliding_keys_keep_latest() {
        let tt = HashTable::new(1);
        let first = 0x1234;
        let second = first + tt.size() as u64;
        tt.stash(HashEntry::new(9, 1, 1, first));
        tt.stash(HashEntry::new(2, 2, 2, second));
        assert!(tt.probe(first).is_none());
        assert_eq!(tt.probe(second).map(|e| e.depth()), Some(2));
    }

    #[test]
    fn test_clear() {
        let mut tt = HashTable::new(1);
        let keys = [0xff_u64, 0x1_0000_0100, 0xdead_beef, 42];
        for (i, &key) in keys.iter().enumerate() {
            tt.stash(HashEntry::new(i as u16 + 1, 0, 0, key));
        }
        assert!(keys.iter().all(|&k| tt.probe(k).is_some()));
        tt.clear();
        assert!(keys.iter().all(|&k| tt.probe(k).is_none()));
        assert_eq!(tt.hashfull_per_mille(), 0);
    }

    #[test]
    fn test_key_zero_misses_on_empty_and_cleared_table() {
        let mut tt = HashTable::new(1);
        assert!(tt.probe(0).is_none());
        let entry = HashEntry::new(9, -50, 0x1234, 0);
        tt.stash(entry);
        assert_eq!(tt.probe(0), Some(entry));
        tt.clear();
        assert!(tt.probe(0).is_none());
        tt.resize(1);
        assert!(tt.probe(0).is_none());
    }

    #[test]
    fn test_all_zero_entry_reads_as_empty() {
        let tt = HashTable::new(1);
        tt.stash(HashEntry::new(0, 0, 0, 0));
        assert!(tt.probe(0).is_none());
        tt.stash(HashEntry::new(0, 0, 1, 0));
        assert_eq!(tt.probe(0).map(|e| e.best_move()), Some(1));
    }

    #[test]
    fn test_stash_recomputes_checksum() {
        let tt = HashTable::new(1);
        let mut entry = HashEntry::new(4, 4, 4, 0x77);
        entry.checksum = 0;
        tt.stash(entry);
        assert_eq!(tt.probe(0x77).map(|e| e.depth()), Some(4));
    }

    #[test]
    fn test_torn_slot_is_a_miss() {
        let tt = HashTable::new(1);
        let a = HashEntry::new(10, 10, 10, 0x55);
        let b = HashEntry::new(20, 20, 20, 0x55 + tt.size() as u64);
        tt.stash(a);
        // Simulate a reader catching writer `b` halfway: b's key and data, a's checksum.
        let slot = tt.slot(0x55);
        slot.key.store(b.key, Ordering::Relaxed);
        slot.data.store(b.data, Ordering::Relaxed);
        assert!(tt.probe(b.key).is_none());
        assert!(tt.probe(a.key).is_none());
        slot.checksum.store(b.checksum, Ordering::Relaxed);
        assert_eq!(tt.probe(b.key), Some(b));
    }

    #[test]
    fn test_hashfull() {
        let tt = HashTable::new(1);
        assert_eq!(tt.hashfull_per_mille(), 0);
        for key in 0..500u64 {
            tt.stash(HashEntry::new(1, 0, 0, key));
        }
        assert_eq!(tt.hashfull_per_mille(), 500);
    }

    #[test]
    fn test_shared_table_resize_and_clear() {
        let shared = SharedHashTable::new(1);
        {
            let tt = shared.session();
            tt.stash(HashEntry::new(6, -30, 0x1f, 0xbeef));
            assert!(tt.probe(0xbeef).is_some());
        }
        shared.clear();
        assert!(shared.session().probe(0xbeef).is_none());
        shared.resize(2);
        assert_eq!(shared.size(), capacity_for(2));
    }
}
