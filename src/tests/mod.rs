//! Crate-level tests.
//!
//! - `proptest.rs` - Property-based tests for bit primitives and the hash table
