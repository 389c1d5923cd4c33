/*
 * This file is a part of chainht
 *
 * Copyright (c) 2026, the chainht authors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU Affero General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU Affero General Public License for more details.
 *
 * You should have received a copy of the GNU Affero General Public License
 * along with this program. If not, see <https://www.gnu.org/licenses/>.
 *
*/

//! The safe, ergonomic public entry point: `Table<K, E>` turns the
//! `RawTable`'s C-style `(key: &[u8], elt: &[u8])` calling convention
//! into fixed-size-array methods, and owns the optional capability
//! closures as a `Capabilities` bundle.

use std::marker::PhantomData;

use crate::error::{AllocHandler, InitError};
use crate::raw::{InitParams, RawTable};

/// Optional behaviour the table doesn't get for free from a byte-exact
/// comparison / position-stable reduction / no-op element teardown.
/// Every field defaults to `None`.
pub struct Capabilities<const K: usize, const E: usize> {
    /// Compares two keys for equality; defaults to a raw byte compare.
    pub cmp_key: Option<Box<dyn Fn(&[u8], &[u8]) -> bool + Send + Sync>>,
    /// Reduces a key to a machine word; defaults to little-endian
    /// byte-position folding.
    pub reduce_key: Option<Box<dyn Fn(&[u8]) -> usize + Send + Sync>>,
    /// Invoked on an element's bytes immediately before its node is
    /// freed by `delete`, a batch overwrite, or table drop. Use this for
    /// indirect (handle-like) elements that own a resource.
    pub free_elt: Option<Box<dyn Fn(&mut [u8]) + Send + Sync>>,
    /// Handles allocator failure; defaults to logging and aborting.
    pub handler: Option<Box<dyn AllocHandler>>,
    _key_elt_sizes: PhantomData<fn() -> ([u8; K], [u8; E])>,
}

impl<const K: usize, const E: usize> Default for Capabilities<K, E> {
    fn default() -> Self {
        Capabilities {
            cmp_key: None,
            reduce_key: None,
            free_elt: None,
            handler: None,
            _key_elt_sizes: PhantomData,
        }
    }
}

/// A concurrent, chained hash table over `K`-byte keys and `E`-byte
/// elements.
pub struct Table<const K: usize, const E: usize> {
    raw: RawTable,
    _key_elt_sizes: PhantomData<fn() -> ([u8; K], [u8; E])>,
}

impl<const K: usize, const E: usize> Table<K, E> {
    /// Builds a table whose load factor is `alpha_n / 2^alpha_log_d` and
    /// whose initial modulus is chosen so `capacity() >= min_num` as
    /// soon as the ladder allows.
    pub fn new(min_num: usize, alpha_n: usize, alpha_log_d: u32) -> Result<Self, InitError> {
        Self::with_capabilities(min_num, alpha_n, alpha_log_d, Capabilities::default())
    }

    /// As [`Table::new`], with explicit [`Capabilities`].
    pub fn with_capabilities(
        min_num: usize,
        alpha_n: usize,
        alpha_log_d: u32,
        caps: Capabilities<K, E>,
    ) -> Result<Self, InitError> {
        Self::with_alignment(min_num, alpha_n, alpha_log_d, 1, caps)
    }

    /// As [`Table::with_capabilities`], additionally requesting that
    /// each element region be aligned to `elt_align` bytes (a power of
    /// two) -- useful when `E` bytes are reinterpreted as a type with a
    /// non-trivial alignment requirement.
    pub fn with_alignment(
        min_num: usize,
        alpha_n: usize,
        alpha_log_d: u32,
        elt_align: usize,
        caps: Capabilities<K, E>,
    ) -> Result<Self, InitError> {
        let raw = RawTable::init(InitParams {
            key_size: K,
            elt_size: E,
            min_num,
            alpha_n,
            alpha_log_d,
            elt_align,
            cmp_key: caps.cmp_key,
            reduce_key: caps.reduce_key,
            free_elt: caps.free_elt,
            handler: caps.handler,
        })?;
        Ok(Table {
            raw,
            _key_elt_sizes: PhantomData,
        })
    }

    /// Inserts (or overwrites, for a key already present) a single
    /// `(key, elt)` pair.
    pub fn insert_one(&self, key: &[u8; K], elt: &[u8; E]) {
        self.raw.insert_one(key, elt);
    }

    /// Inserts (or overwrites) every `(key, elt)` pair in the batch.
    /// `keys` and `elts` must be the same length.
    pub fn insert_batch(&self, keys: &[[u8; K]], elts: &[[u8; E]]) {
        let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
        let elt_refs: Vec<&[u8]> = elts.iter().map(|e| e.as_slice()).collect();
        self.raw.insert(&key_refs, &elt_refs);
    }

    /// Returns a copy of the element stored for `key`, if present.
    pub fn search(&self, key: &[u8; K]) -> Option<[u8; E]> {
        self.raw.search(key).map(|v| elt_array(v))
    }

    /// Removes `key` if present, returning its element. A no-op if the
    /// key is absent.
    pub fn remove(&self, key: &[u8; K]) -> Option<[u8; E]> {
        self.raw.remove(key).map(|v| elt_array(v))
    }

    /// Removes and frees `key`, invoking the `free_elt` capability on
    /// its element first if one was supplied. A no-op if the key is
    /// absent.
    pub fn delete(&self, key: &[u8; K]) {
        self.raw.delete(key);
    }

    /// Symmetric batch form of [`Table::remove`].
    pub fn remove_batch(&self, keys: &[[u8; K]]) -> Vec<Option<[u8; E]>> {
        let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
        self.raw.remove_batch(&key_refs).into_iter().map(|o| o.map(elt_array)).collect()
    }

    /// Symmetric batch form of [`Table::delete`].
    pub fn delete_batch(&self, keys: &[[u8; K]]) {
        let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
        self.raw.delete_batch(&key_refs);
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The current load-factor threshold (`floor(M * alpha)`); exceeding
    /// it triggers a grow on the next insert, unless the ladder is
    /// already saturated.
    pub fn capacity(&self) -> usize {
        self.raw.capacity()
    }

    /// Whether the prime ladder has no larger rung left: the table will
    /// keep accepting inserts, but chains will grow rather than the
    /// bucket array.
    pub fn is_saturated(&self) -> bool {
        self.raw.is_saturated()
    }
}

fn elt_array<const E: usize>(v: Vec<u8>) -> [u8; E] {
    v.try_into().unwrap_or_else(|v: Vec<u8>| {
        panic!("element length {} did not match table element size {}", v.len(), E)
    })
}
