// resampler
// Copyright (c) 2024 The resampler Contributors.
//
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! A minimal stand-in for the assumed external reference-counted memory pool (§1).
//!
//! The real collaborator this type models is fixed-max-block-size, concurrency-safe, and
//! reference counted by `acquire`/`release`. Per the design notes, the acquire/release lease is
//! re-architected here as ordinary Rust ownership: a [`Block`] is a reference-counted byte buffer,
//! and "acquiring" it for mutation is simply calling [`Block::with_mut`], whose closure-scoped
//! borrow the borrow checker statically confines to a single scope. Blocks are built on `Arc` +
//! `Mutex`, matching the real pool's concurrency-safe contract (§5) even though a single resampler
//! instance never actually shares one across threads.

use std::sync::{Arc, Mutex};

/// A reference-counted, growable byte block leased from a [`Pool`].
#[derive(Debug, Clone)]
pub struct Block(Arc<Mutex<Vec<u8>>>);

impl Block {
    fn new(len: usize) -> Block {
        Block(Arc::new(Mutex::new(vec![0u8; len])))
    }

    /// Current length in bytes.
    pub fn len(&self) -> usize {
        self.0.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrow the block's bytes immutably for the duration of the closure.
    pub fn with<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.0.lock().unwrap())
    }

    /// Borrow the block's bytes mutably for the duration of the closure.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut [u8]) -> R) -> R {
        f(&mut self.0.lock().unwrap())
    }
}

/// A source of [`Block`]s bounded by a maximum block size, mirroring the external pool's
/// fixed-max-block-size contract.
#[derive(Debug, Clone)]
pub struct Pool {
    max_block_size: usize,
}

impl Pool {
    pub fn new(max_block_size: usize) -> Pool {
        Pool { max_block_size }
    }

    pub fn max_block_size(&self) -> usize {
        self.max_block_size
    }

    /// Allocate a new block of exactly `len` bytes. `len` may exceed `max_block_size`; the pool's
    /// maximum is advisory sizing guidance for `max_block_size()` accounting, not a hard cap
    /// enforced here (mirrors the reference pool, where oversized allocations fall back to a
    /// dedicated allocation rather than failing).
    pub fn alloc(&self, len: usize) -> Block {
        Block::new(len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_block_mutation_is_visible_through_clones() {
        let pool = Pool::new(4096);
        let block = pool.alloc(4);
        let clone = block.clone();
        block.with_mut(|bytes| bytes[0] = 0xAB);
        clone.with(|bytes| assert_eq!(bytes[0], 0xAB));
    }
}
