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

//! The batch insert engine: partitions a batch of keys by slot-lock
//! stripe under one shared gate hold, mutates each touched stripe
//! exclusively (update-in-place on a duplicate key, prepend on a new
//! one), then takes the gate exclusively once to fold the net new-key
//! count into the table and trigger a grow if the load factor demands
//! it.

use crate::node;
use crate::raw::RawTable;

impl RawTable {
    /// Inserts (or, for a key already present, overwrites the element
    /// of) every `(key, elt)` pair in the batch. `keys[i]`/`elts[i]` must
    /// each be exactly `key_size`/`elt_size` bytes; panics otherwise.
    pub fn insert(&self, keys: &[&[u8]], elts: &[&[u8]]) {
        assert_eq!(keys.len(), elts.len(), "keys and elts batches must be the same length");
        if keys.is_empty() {
            return;
        }
        for (k, e) in keys.iter().zip(elts.iter()) {
            assert_eq!(k.len(), self.key_size, "key length does not match table key_size");
            assert_eq!(e.len(), self.elt_size, "elt length does not match table elt_size");
        }

        let stripe_count = self.stripes.count();
        let mut per_stripe: Vec<Vec<usize>> = vec![Vec::new(); stripe_count];
        let mut new_keys = 0usize;

        {
            // Held shared across the whole stripe-mutation section: see
            // `crate::lock` for why this makes a mid-flight stale
            // snapshot impossible.
            let gate = self.gate.read();
            let modulus = gate.ladder.modulus();

            for (idx, key) in keys.iter().enumerate() {
                let bucket = self.bucket_of(key, modulus);
                let stripe = self.stripes.stripe_of(bucket);
                per_stripe[stripe].push(idx);
            }

            for stripe in 0..stripe_count {
                if per_stripe[stripe].is_empty() {
                    continue;
                }
                let _slot = self.stripes.write(stripe);
                for &idx in &per_stripe[stripe] {
                    let key = keys[idx];
                    let elt = elts[idx];
                    let bucket = self.bucket_of(key, modulus);
                    // SAFETY: exclusive slot lock for `bucket`'s stripe is held.
                    let head = unsafe { gate.buckets.head_mut(bucket) };
                    // SAFETY: `key`/`elt` were length-checked above; `head`
                    // only reaches nodes inserted with this table's layout.
                    unsafe {
                        match node::search_key(*head, key, &self.layout, self.key_size, self.cmp()) {
                            Some(existing) => {
                                if let Some(f) = self.destructor() {
                                    f(existing.elt(&self.layout, self.elt_size));
                                }
                                std::ptr::copy_nonoverlapping(
                                    elt.as_ptr(),
                                    existing.elt_ptr(&self.layout),
                                    self.elt_size,
                                );
                            }
                            None => {
                                node::prepend_new(head, key, elt, &self.layout, self.handler.as_ref());
                                new_keys += 1;
                            }
                        }
                    }
                }
            }
        }

        if new_keys > 0 {
            self.bump_count_and_maybe_grow(new_keys);
        }
    }

    /// Convenience wrapper for a single-key insert.
    pub fn insert_one(&self, key: &[u8], elt: &[u8]) {
        self.insert(&[key], &[elt]);
    }

    /// Adds `delta` newly-inserted keys to the count and, if the result
    /// exceeds the current threshold, grows the table while still
    /// holding the gate exclusively (see [`crate::grow`]).
    pub(crate) fn bump_count_and_maybe_grow(&self, delta: usize) {
        let mut gate = self.gate.write();
        gate.count += delta;
        if gate.count > gate.max_count && !gate.ladder.is_saturated_or_exhausted() {
            self.grow(&mut gate);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::raw::{InitParams, RawTable};

    fn table(min_num: usize) -> RawTable {
        RawTable::init(InitParams {
            key_size: 8,
            elt_size: 8,
            min_num,
            alpha_n: 3,
            alpha_log_d: 2,
            elt_align: 1,
            cmp_key: None,
            reduce_key: None,
            free_elt: None,
            handler: None,
        })
        .unwrap()
    }

    #[test]
    fn insert_one_then_many_tracks_count() {
        let t = table(16);
        t.insert_one(&1u64.to_le_bytes(), &10u64.to_le_bytes());
        assert_eq!(t.len(), 1);

        let keys: Vec<[u8; 8]> = (2u64..10).map(|k| k.to_le_bytes()).collect();
        let elts: Vec<[u8; 8]> = (2u64..10).map(|k| (k * 10).to_le_bytes()).collect();
        let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
        let elt_refs: Vec<&[u8]> = elts.iter().map(|e| e.as_slice()).collect();
        t.insert(&key_refs, &elt_refs);
        assert_eq!(t.len(), 9);
    }

    #[test]
    fn duplicate_key_updates_in_place_without_growing_count() {
        let t = table(16);
        t.insert_one(&1u64.to_le_bytes(), &10u64.to_le_bytes());
        t.insert_one(&1u64.to_le_bytes(), &99u64.to_le_bytes());
        assert_eq!(t.len(), 1);
        let found = t.search(&1u64.to_le_bytes()).unwrap();
        assert_eq!(found.as_slice(), &99u64.to_le_bytes()[..]);
    }

    #[test]
    fn insert_batch_mixing_new_and_duplicate_keys() {
        let t = table(16);
        t.insert_one(&1u64.to_le_bytes(), &1u64.to_le_bytes());
        let keys = [1u64.to_le_bytes(), 2u64.to_le_bytes()];
        let elts = [100u64.to_le_bytes(), 200u64.to_le_bytes()];
        let key_refs: Vec<&[u8]> = keys.iter().map(|k| k.as_slice()).collect();
        let elt_refs: Vec<&[u8]> = elts.iter().map(|e| e.as_slice()).collect();
        t.insert(&key_refs, &elt_refs);
        assert_eq!(t.len(), 2);
        assert_eq!(t.search(&1u64.to_le_bytes()).unwrap().as_slice(), &100u64.to_le_bytes()[..]);
        assert_eq!(t.search(&2u64.to_le_bytes()).unwrap().as_slice(), &200u64.to_le_bytes()[..]);
    }
}
