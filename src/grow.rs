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

//! Grow/rehash: advance the prime ladder until the new modulus's
//! threshold clears the current count (or the ladder gives out),
//! allocate the new bucket array, and migrate every chain into it by
//! relinking nodes, never copying them.
//!
//! Called from [`crate::insert::RawTable::bump_count_and_maybe_grow`]
//! while the caller already holds the gate exclusively, so no slot lock
//! is acquired here: every operation that touches a bucket takes the
//! gate in shared mode first, and an exclusive gate hold (this one)
//! can only begin once every such shared hold -- and the stripe-locked
//! section nested inside it -- has already finished. There is therefore
//! nobody else touching any bucket for the duration of this call.

use parking_lot::RwLockWriteGuard;

use crate::bucket::BucketArray;
use crate::modmath;
use crate::node;
use crate::prime::AdvanceStatus;
use crate::raw::{GateState, RawTable};

impl RawTable {
    pub(crate) fn grow(&self, gate: &mut RwLockWriteGuard<'_, GateState>) {
        let old_modulus = gate.ladder.modulus();
        let count = gate.count;

        let new_max = loop {
            match gate.ladder.advance() {
                AdvanceStatus::Ok => {
                    let candidate = modmath::max_count(gate.ladder.modulus(), self.alpha_n, self.alpha_log_d);
                    if candidate >= count {
                        break candidate;
                    }
                }
                AdvanceStatus::Saturated | AdvanceStatus::Exhausted => {
                    log::warn!(
                        "chainht: prime ladder saturated at modulus {} with count {}; chains will keep growing",
                        old_modulus,
                        count
                    );
                    return;
                }
            }
        };

        let new_modulus = gate.ladder.modulus();
        let new_buckets = BucketArray::new(new_modulus);
        for i in 0..gate.buckets.len() {
            // SAFETY: no other operation can be touching any bucket
            // while this call holds the gate exclusively (see module
            // doc comment).
            let head = unsafe { gate.buckets.head_mut(i) };
            unsafe {
                node::drain_chain(head, |n| {
                    let key = n.key(&self.layout, self.key_size);
                    let new_bucket = self.bucket_of(key, new_modulus);
                    let new_head = new_buckets.head_mut(new_bucket);
                    node::prepend(new_head, n);
                });
            }
        }

        gate.buckets = new_buckets;
        gate.max_count = new_max;

        log::debug!(
            "chainht: grew from modulus {} to {} (count={}, max_count={})",
            old_modulus,
            new_modulus,
            count,
            new_max
        );
    }
}
