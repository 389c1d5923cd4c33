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

//! The table's two-tier locking discipline: a single gate lock over
//! table-wide metadata (held by [`crate::raw::RawTable`] directly as a
//! `parking_lot::RwLock<GateState>`), and the fixed-size, power-of-two
//! striped array of slot locks defined here, each guarding the bucket
//! chains whose index is congruent to the stripe mod the stripe count.
//!
//! Every non-growing operation holds the gate in shared mode for the
//! full duration of its stripe-locked section (not merely for an instant
//! to snapshot the modulus), releasing it only before re-acquiring the
//! gate exclusively to update the count and, rarely, grow. That keeps
//! the bucket array a single object whose identity never changes out
//! from under a reader: a grow cannot even begin acquiring the gate
//! exclusively until every in-flight operation -- including one still
//! waiting on a stripe lock a grow itself wants -- has released its
//! shared hold, so there is no window in which an operation's view of
//! `(modulus, buckets)` can go stale mid-flight.

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// A read/write lock abstraction over a unit-guarded cell, kept distinct
/// from `parking_lot::RwLock` itself so the locking discipline above it
/// (gate + stripes) is stated against an interface rather than a
/// concrete lock type. `unlock_sh`/`unlock_ex` are expressed as guard
/// drop rather than an explicit call, which is the idiomatic Rust
/// rendition of the same contract.
pub trait RwLockLike {
    type Shared<'a>: 'a
    where
        Self: 'a;
    type Exclusive<'a>: 'a
    where
        Self: 'a;

    fn lock_sh(&self) -> Self::Shared<'_>;
    fn lock_ex(&self) -> Self::Exclusive<'_>;
}

impl RwLockLike for RwLock<()> {
    type Shared<'a> = RwLockReadGuard<'a, ()>;
    type Exclusive<'a> = RwLockWriteGuard<'a, ()>;

    #[inline]
    fn lock_sh(&self) -> Self::Shared<'_> {
        self.read()
    }

    #[inline]
    fn lock_ex(&self) -> Self::Exclusive<'_> {
        self.write()
    }
}

/// A fixed-size, power-of-two array of slot locks.
pub struct Stripes {
    locks: Vec<RwLock<()>>,
}

impl Stripes {
    /// `count` must be a power of two.
    pub fn new(count: usize) -> Self {
        debug_assert!(count.is_power_of_two(), "stripe count must be a power of two");
        let mut locks = Vec::with_capacity(count);
        locks.resize_with(count, || RwLock::new(()));
        Stripes { locks }
    }

    #[inline]
    pub fn count(&self) -> usize {
        self.locks.len()
    }

    /// The stripe a bucket index falls under. `count()` is a power of
    /// two, so this is a mask rather than a division.
    #[inline]
    pub fn stripe_of(&self, bucket_index: usize) -> usize {
        bucket_index & (self.locks.len() - 1)
    }

    #[inline]
    pub fn read(&self, stripe: usize) -> RwLockReadGuard<'_, ()> {
        self.locks[stripe].lock_sh()
    }

    #[inline]
    pub fn write(&self, stripe: usize) -> RwLockWriteGuard<'_, ()> {
        self.locks[stripe].lock_ex()
    }
}
