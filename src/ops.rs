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

//! Search, remove and delete: the single-key (and batch-remove/delete)
//! read/write paths, sharing the same gate-shared/slot-exclusive (or
//! slot-shared for search) locking discipline as [`crate::insert`].

use crate::node;
use crate::raw::RawTable;

impl RawTable {
    /// Returns a pointer into the live node's element region for `key`,
    /// or null if absent -- the unsafe, spec-literal `search(table, key)
    /// -> ptr | null` of spec.md §6. Because a grow only relinks nodes
    /// and never reallocates them (Invariant 6 / Testable Property 8),
    /// this pointer stays valid across any number of grows; it is
    /// invalidated only by a `remove`/`delete` of the same key or by the
    /// table itself being dropped. Enforcing that no such call races
    /// with a live use of the pointer is the caller's responsibility,
    /// per spec.md §4.7/§5 -- the table only guarantees the lookup
    /// itself is linearisable.
    ///
    /// # Safety
    /// `key.len()` must equal `key_size`. The returned pointer must not
    /// be read or written after a `remove`/`delete` of `key`, or after
    /// the table is dropped.
    pub unsafe fn search_ptr(&self, key: &[u8]) -> *mut u8 {
        assert_eq!(key.len(), self.key_size, "key length does not match table key_size");

        let gate = self.gate.read();
        let modulus = gate.ladder.modulus();
        let bucket = self.bucket_of(key, modulus);
        let stripe = self.stripes.stripe_of(bucket);
        let _slot = self.stripes.read(stripe);
        // SAFETY: shared slot lock for `bucket`'s stripe is held.
        let head = gate.buckets.head(bucket);
        // SAFETY: `key` was length-checked above.
        match node::search_key(head, key, &self.layout, self.key_size, self.cmp()) {
            Some(n) => n.elt_ptr(&self.layout),
            None => std::ptr::null_mut(),
        }
    }

    /// Returns a copy of the element stored for `key`, if present.
    /// `key.len()` must equal `key_size`.
    pub fn search(&self, key: &[u8]) -> Option<Vec<u8>> {
        assert_eq!(key.len(), self.key_size, "key length does not match table key_size");

        let gate = self.gate.read();
        let modulus = gate.ladder.modulus();
        let bucket = self.bucket_of(key, modulus);
        let stripe = self.stripes.stripe_of(bucket);
        let _slot = self.stripes.read(stripe);
        // SAFETY: shared slot lock for `bucket`'s stripe is held.
        let head = unsafe { gate.buckets.head(bucket) };
        // SAFETY: `key` was length-checked above.
        unsafe {
            node::search_key(head, key, &self.layout, self.key_size, self.cmp())
                .map(|n| n.elt(&self.layout, self.elt_size).to_vec())
        }
    }

    /// Removes `key` if present, returning its element. A no-op (and
    /// `None`) if the key is absent, per the table's contract that
    /// removing an absent key is never an error.
    pub fn remove(&self, key: &[u8]) -> Option<Vec<u8>> {
        assert_eq!(key.len(), self.key_size, "key length does not match table key_size");

        let gate = self.gate.read();
        let modulus = gate.ladder.modulus();
        let bucket = self.bucket_of(key, modulus);
        let stripe = self.stripes.stripe_of(bucket);
        let _slot = self.stripes.write(stripe);
        // SAFETY: exclusive slot lock for `bucket`'s stripe is held.
        let head = unsafe { gate.buckets.head_mut(bucket) };
        let removed = unsafe {
            node::search_key(*head, key, &self.layout, self.key_size, self.cmp()).map(|n| {
                let elt = n.elt(&self.layout, self.elt_size).to_vec();
                node::remove(head, n);
                elt
            })
        };
        drop(_slot);
        drop(gate);
        if removed.is_some() {
            self.decrement_count(1);
        }
        removed
    }

    /// Removes and frees `key`'s node, invoking the destructor on its
    /// element first if one was supplied at construction. A no-op if
    /// the key is absent.
    pub fn delete(&self, key: &[u8]) {
        assert_eq!(key.len(), self.key_size, "key length does not match table key_size");

        let mut deleted = false;
        {
            let gate = self.gate.read();
            let modulus = gate.ladder.modulus();
            let bucket = self.bucket_of(key, modulus);
            let stripe = self.stripes.stripe_of(bucket);
            let _slot = self.stripes.write(stripe);
            // SAFETY: exclusive slot lock for `bucket`'s stripe is held.
            let head = unsafe { gate.buckets.head_mut(bucket) };
            unsafe {
                if let Some(n) = node::search_key(*head, key, &self.layout, self.key_size, self.cmp()) {
                    node::delete(head, n, &self.layout, self.destructor());
                    deleted = true;
                }
            }
        }
        if deleted {
            self.decrement_count(1);
        }
    }

    /// Removes every key in `keys`, symmetric to [`RawTable::insert`]'s
    /// batch shape. Keys absent from the table are silently skipped.
    pub fn remove_batch(&self, keys: &[&[u8]]) -> Vec<Option<Vec<u8>>> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            out.push(self.remove(key));
        }
        out
    }

    /// Deletes every key in `keys`, symmetric to [`RawTable::insert`]'s
    /// batch shape.
    pub fn delete_batch(&self, keys: &[&[u8]]) {
        for key in keys {
            self.delete(key);
        }
    }

    pub(crate) fn decrement_count(&self, delta: usize) {
        let mut gate = self.gate.write();
        gate.count = gate.count.saturating_sub(delta);
    }
}
