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

//! `RawTable`: the unsafe, spec-literal implementation the safe
//! [`crate::table::Table`] facade is built on. Holds everything the
//! locking discipline needs to snapshot, mutate, and grow: the gate
//! state behind one `parking_lot::RwLock`, and the slot-lock stripes
//! alongside it.

use parking_lot::RwLock;

use crate::bucket::{self, BucketArray, Reducer};
use crate::error::{AllocHandler, DefaultAllocHandler, InitError};
use crate::lock::Stripes;
use crate::mem::NodeLayout;
use crate::node::{Destructor, KeyCmp};
use crate::prime::Ladder;

/// Table-wide metadata the gate lock protects: the current modulus, the
/// bucket array it indexes, and the running/threshold counts that drive
/// growth. Guarded as a unit so a reader's snapshot of `(modulus,
/// buckets)` is always internally consistent.
pub(crate) struct GateState {
    pub(crate) ladder: Ladder,
    pub(crate) buckets: BucketArray,
    pub(crate) count: usize,
    pub(crate) max_count: usize,
}

/// The minimum number of stripes; kept a compile-time constant so the
/// number of distinct mutexes grown-out tables need is bounded and
/// predictable. Chosen as a power of two well above typical core counts
/// without letting a tiny table pay for thousands of rarely-touched
/// locks.
pub(crate) const STRIPE_COUNT: usize = 64;

/// The direct, unsafe implementation of the division-method chained hash
/// table described by C1 through C8: division-method hashing over a
/// fixed prime ladder, chaining via circular doubly-linked nodes, and a
/// gate-lock-plus-striped-slot-lock concurrency discipline.
///
/// Every method here takes keys/elements as raw byte slices of exactly
/// `key_size`/`elt_size` bytes; the safe, ergonomic, const-generic
/// wrapper lives in [`crate::table`].
pub struct RawTable {
    pub(crate) key_size: usize,
    pub(crate) elt_size: usize,
    pub(crate) layout: NodeLayout,
    pub(crate) alpha_n: usize,
    pub(crate) alpha_log_d: u32,
    pub(crate) cmp_key: Option<Box<KeyCmp>>,
    pub(crate) reduce_key: Option<Box<Reducer>>,
    pub(crate) free_elt: Option<Box<Destructor>>,
    pub(crate) handler: Box<dyn AllocHandler>,
    pub(crate) gate: RwLock<GateState>,
    pub(crate) stripes: Stripes,
}

/// Construction parameters for [`RawTable::init`], grouped the way
/// `ht_divchn_pthread_init`'s parameter list groups them.
pub struct InitParams {
    pub key_size: usize,
    pub elt_size: usize,
    pub min_num: usize,
    pub alpha_n: usize,
    pub alpha_log_d: u32,
    pub elt_align: usize,
    pub cmp_key: Option<Box<KeyCmp>>,
    pub reduce_key: Option<Box<Reducer>>,
    pub free_elt: Option<Box<Destructor>>,
    pub handler: Option<Box<dyn AllocHandler>>,
}

impl RawTable {
    /// Validates `params` and builds a table whose initial modulus is the
    /// first prime in the ladder at least `min_num` large enough that
    /// `max_count(modulus) >= min_num` is satisfied as early as possible
    /// (mirrors `ht_divchn_init`'s starting-point search, trimmed to the
    /// ladder's first rung since the ladder's own growth loop will carry
    /// a table upward from there regardless).
    pub fn init(params: InitParams) -> Result<Self, InitError> {
        if params.key_size == 0 {
            return Err(InitError::ZeroKeySize);
        }
        if params.elt_size == 0 {
            return Err(InitError::ZeroEltSize);
        }
        if params.alpha_n == 0 {
            return Err(InitError::ZeroAlphaNumerator);
        }
        if params.alpha_log_d >= crate::modmath::WORD_BITS {
            return Err(InitError::AlphaLogDenomOutOfRange);
        }
        if !params.elt_align.is_power_of_two() {
            return Err(InitError::BadAlignment);
        }

        let handler = params.handler.unwrap_or_else(|| Box::new(DefaultAllocHandler));
        let layout = NodeLayout::compute(
            crate::node::HEADER_SIZE,
            crate::node::HEADER_ALIGN,
            params.key_size,
            params.elt_size,
            params.elt_align,
        );

        let mut ladder = Ladder::first();
        let mut max_count = crate::modmath::max_count(ladder.modulus(), params.alpha_n, params.alpha_log_d);
        while max_count < params.min_num {
            match ladder.advance() {
                crate::prime::AdvanceStatus::Ok => {
                    max_count = crate::modmath::max_count(ladder.modulus(), params.alpha_n, params.alpha_log_d);
                }
                crate::prime::AdvanceStatus::Saturated | crate::prime::AdvanceStatus::Exhausted => {
                    log::warn!(
                        "chainht: ladder saturated during init while seeking min_num={}; capping at modulus {}",
                        params.min_num,
                        ladder.modulus()
                    );
                    break;
                }
            }
        }

        log::debug!(
            "chainht: table initialised (key_size={}, elt_size={}, modulus={}, max_count={})",
            params.key_size,
            params.elt_size,
            ladder.modulus(),
            max_count
        );

        let buckets = BucketArray::new(ladder.modulus());
        Ok(RawTable {
            key_size: params.key_size,
            elt_size: params.elt_size,
            layout,
            alpha_n: params.alpha_n,
            alpha_log_d: params.alpha_log_d,
            cmp_key: params.cmp_key,
            reduce_key: params.reduce_key,
            free_elt: params.free_elt,
            handler,
            gate: RwLock::new(GateState {
                ladder,
                buckets,
                count: 0,
                max_count,
            }),
            stripes: Stripes::new(STRIPE_COUNT),
        })
    }

    /// Re-establishes the element region's alignment to `align` bytes (a
    /// power of two), per spec.md §6: "must be called before any other
    /// operation other than `init`". Recomputing the node layout is only
    /// sound while the table is still empty, so this panics if any key
    /// has already been inserted.
    pub fn align_elements(&mut self, align: usize) -> Result<(), InitError> {
        assert_eq!(
            self.gate.get_mut().count,
            0,
            "align_elements must be called before any other operation on the table"
        );
        if !align.is_power_of_two() {
            return Err(InitError::BadAlignment);
        }
        self.layout = NodeLayout::compute(
            crate::node::HEADER_SIZE,
            crate::node::HEADER_ALIGN,
            self.key_size,
            self.elt_size,
            align,
        );
        Ok(())
    }

    #[inline]
    pub(crate) fn bucket_of(&self, key: &[u8], modulus: usize) -> usize {
        let reduced = bucket::reduce(key, self.reduce_key.as_deref());
        bucket::bucket_index(reduced, modulus)
    }

    #[inline]
    pub(crate) fn cmp(&self) -> Option<&KeyCmp> {
        self.cmp_key.as_deref()
    }

    #[inline]
    pub(crate) fn destructor(&self) -> Option<&Destructor> {
        self.free_elt.as_deref()
    }

    pub fn len(&self) -> usize {
        self.gate.read().count
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.gate.read().max_count
    }

    pub fn is_saturated(&self) -> bool {
        self.gate.read().ladder.is_saturated_or_exhausted()
    }

    /// Releases every chain and resets the bucket array to empty, per
    /// spec.md §6's `free(table)`. Does not release the table struct
    /// itself -- the table is left valid and empty, and may be inserted
    /// into again afterward. `Drop` calls this same teardown on scope
    /// exit, so an explicit call is only needed to free memory early.
    pub fn free(&mut self) {
        self.clear_all();
    }

    /// Frees every chain still resident in the table, leaving it empty.
    /// Intended for use from `Drop`.
    pub(crate) fn clear_all(&mut self) {
        let gate = self.gate.get_mut();
        // SAFETY: `&mut self` gives exclusive access to the whole table,
        // so every bucket's slot lock is uncontended here.
        unsafe {
            for i in 0..gate.buckets.len() {
                let head = gate.buckets.head_mut(i);
                crate::node::free_all(head, &self.layout, self.free_elt.as_deref());
            }
        }
        gate.count = 0;
    }
}

impl Drop for RawTable {
    fn drop(&mut self) {
        self.clear_all();
    }
}

// SAFETY: every field is itself `Send + Sync` (the trait objects are
// bounded as such in their type aliases; `NodePtr`s reachable only
// through the gate/stripe locks are never touched without holding the
// relevant lock).
unsafe impl Send for RawTable {}
unsafe impl Sync for RawTable {}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(key_size: usize, elt_size: usize, min_num: usize, alpha_n: usize, alpha_log_d: u32) -> InitParams {
        InitParams {
            key_size,
            elt_size,
            min_num,
            alpha_n,
            alpha_log_d,
            elt_align: 1,
            cmp_key: None,
            reduce_key: None,
            free_elt: None,
            handler: None,
        }
    }

    #[test]
    fn init_rejects_zero_sizes() {
        assert_eq!(RawTable::init(params(0, 8, 1, 1, 1)).unwrap_err(), InitError::ZeroKeySize);
        assert_eq!(RawTable::init(params(8, 0, 1, 1, 1)).unwrap_err(), InitError::ZeroEltSize);
    }

    #[test]
    fn init_rejects_bad_alpha() {
        assert_eq!(RawTable::init(params(8, 8, 1, 0, 1)).unwrap_err(), InitError::ZeroAlphaNumerator);
        let mut p = params(8, 8, 1, 1, 1);
        p.alpha_log_d = crate::modmath::WORD_BITS;
        assert_eq!(RawTable::init(p).unwrap_err(), InitError::AlphaLogDenomOutOfRange);
    }

    #[test]
    fn init_rejects_bad_alignment() {
        let mut p = params(8, 8, 1, 1, 1);
        p.elt_align = 3;
        assert_eq!(RawTable::init(p).unwrap_err(), InitError::BadAlignment);
    }

    #[test]
    fn init_starts_empty_with_first_modulus() {
        let t = RawTable::init(params(8, 8, 1, 1, 1)).unwrap();
        assert_eq!(t.len(), 0);
        assert_eq!(t.gate.read().ladder.modulus(), 1543);
    }

    #[test]
    fn init_advances_ladder_to_meet_min_num() {
        // alpha = 1/8 at modulus 1543 gives max_count 192; ask for more.
        let t = RawTable::init(params(8, 8, 1000, 1, 3)).unwrap();
        assert!(t.capacity() >= 1000);
        assert!(t.gate.read().ladder.modulus() > 1543);
    }

    #[test]
    fn align_elements_rejects_non_power_of_two() {
        let mut t = RawTable::init(params(8, 8, 1, 1, 1)).unwrap();
        assert_eq!(t.align_elements(3).unwrap_err(), InitError::BadAlignment);
    }

    #[test]
    fn align_elements_changes_layout_before_any_insert() {
        let mut t = RawTable::init(params(8, 8, 1, 1, 1)).unwrap();
        t.align_elements(16).unwrap();
        assert_eq!(t.layout.elt_offset % 16, 0);
        t.insert_one(&1u64.to_le_bytes(), &2u64.to_le_bytes());
        assert_eq!(t.search(&1u64.to_le_bytes()).unwrap().as_slice(), &2u64.to_le_bytes()[..]);
    }

    #[test]
    #[should_panic(expected = "align_elements must be called before any other operation")]
    fn align_elements_panics_after_first_insert() {
        let mut t = RawTable::init(params(8, 8, 1, 1, 1)).unwrap();
        t.insert_one(&1u64.to_le_bytes(), &2u64.to_le_bytes());
        let _ = t.align_elements(16);
    }

    #[test]
    fn free_empties_the_table_and_leaves_it_usable() {
        let mut t = RawTable::init(params(8, 8, 1, 1, 1)).unwrap();
        t.insert_one(&1u64.to_le_bytes(), &2u64.to_le_bytes());
        assert_eq!(t.len(), 1);
        t.free();
        assert_eq!(t.len(), 0);
        assert!(t.search(&1u64.to_le_bytes()).is_none());

        t.insert_one(&3u64.to_le_bytes(), &4u64.to_le_bytes());
        assert_eq!(t.search(&3u64.to_le_bytes()).unwrap().as_slice(), &4u64.to_le_bytes()[..]);
    }
}
