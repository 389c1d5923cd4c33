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

//! Key reduction to a machine word, and the bucket array the reduced
//! word is folded into via the division method.

use std::cell::UnsafeCell;

use crate::modmath::WORD_BITS;
use crate::node::Head;

/// A caller-supplied reduction of a key to a machine word, used in place
/// of the default byte-folding reduction.
pub type Reducer = dyn Fn(&[u8]) -> usize + Send + Sync;

/// Folds `key` into a `usize` by treating it as a little-endian integer
/// modulo `2^WORD_BITS`: each byte contributes at its own position, so
/// the result is well-defined regardless of host endianness.
fn default_reduce(key: &[u8]) -> usize {
    let mut word: usize = 0;
    for (i, &byte) in key.iter().enumerate() {
        let shift = (i as u32 * 8) % WORD_BITS;
        word = word.wrapping_add((byte as usize) << shift);
    }
    word
}

/// Reduces `key` to a machine word, using `reducer` if supplied.
#[inline]
pub fn reduce(key: &[u8], reducer: Option<&Reducer>) -> usize {
    match reducer {
        Some(f) => f(key),
        None => default_reduce(key),
    }
}

/// The bucket index a reduced key falls into under modulus `m`.
#[inline]
pub fn bucket_index(reduced: usize, modulus: usize) -> usize {
    reduced % modulus
}

/// A contiguous array of chain-head pointers, one per bucket.
///
/// Wrapped in `UnsafeCell` rather than plain `Vec` because a bucket's
/// contents are made exclusive by the *slot lock* covering its stripe,
/// not by any borrow of `BucketArray` itself: two threads routinely hold
/// only a shared reference to the same `BucketArray` (taken from the
/// gate lock in shared mode) while each exclusively mutates a disjoint
/// stripe of its buckets through their own slot lock. `head`/`head_mut`
/// push that requirement onto the caller instead of the type system,
/// which is exactly the contract the table's locking discipline exists
/// to uphold.
pub struct BucketArray {
    heads: UnsafeCell<Vec<Head>>,
}

impl BucketArray {
    pub fn new(modulus: usize) -> Self {
        BucketArray {
            heads: UnsafeCell::new(vec![None; modulus]),
        }
    }

    /// Length is fixed at construction and never changes for a given
    /// array (growth builds a new, larger `BucketArray` rather than
    /// resizing this one), so reading it needs no external lock.
    #[inline]
    pub fn len(&self) -> usize {
        unsafe { (*self.heads.get()).len() }
    }

    /// # Safety
    /// The caller must hold (at least) the shared slot lock for the
    /// stripe covering bucket `i`.
    #[inline]
    pub unsafe fn head(&self, i: usize) -> Head {
        (*self.heads.get())[i]
    }

    /// # Safety
    /// The caller must hold the exclusive slot lock for the stripe
    /// covering bucket `i`.
    #[inline]
    #[allow(clippy::mut_from_ref)]
    pub unsafe fn head_mut(&self, i: usize) -> &mut Head {
        &mut (*self.heads.get())[i]
    }
}

// SAFETY: access to the cell's contents is externally synchronized by
// the table's slot locks, per the safety contracts on `head`/`head_mut`.
unsafe impl Sync for BucketArray {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_reduce_is_byte_position_stable() {
        let a = default_reduce(&[1, 2, 3]);
        let b = default_reduce(&[1, 2, 3]);
        assert_eq!(a, b);
        let c = default_reduce(&[3, 2, 1]);
        assert_ne!(a, c, "byte order must matter");
    }

    #[test]
    fn custom_reducer_is_honored() {
        let r: &Reducer = &|_k: &[u8]| 42;
        assert_eq!(reduce(b"anything", Some(r)), 42);
    }

    #[test]
    fn bucket_index_wraps_by_modulus() {
        assert_eq!(bucket_index(1543, 1543), 0);
        assert_eq!(bucket_index(1544, 1543), 1);
    }

    #[test]
    fn bucket_array_starts_empty() {
        let b = BucketArray::new(7);
        assert_eq!(b.len(), 7);
        unsafe {
            for i in 0..7 {
                assert!(b.head(i).is_none());
            }
        }
    }
}
