/*
 * This file is a part of chainht
 *
 * chainht is a concurrent, chained hash table for fixed-size binary keys
 * and fixed-size element payloads, built for workloads that batch-insert
 * many distinct keys from multiple threads and then search from multiple
 * threads, with amortised growth as the load factor crosses a configurable
 * bound.
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

#![allow(dead_code)]

//! # chainht
//!
//! A concurrent division-method hash table with chaining.
//!
//! The modulus is drawn from a fixed ladder of primes spanning the
//! representable range of the machine word. Collisions are resolved with
//! circular doubly-linked chains whose nodes co-locate key and element
//! bytes with the node header in a single allocation. Concurrency is
//! provided by a single gate lock guarding global table state and a
//! striped array of slot locks guarding disjoint groups of buckets, so
//! that readers never block other readers and writers on disjoint stripes
//! never contend.
//!
//! This crate provides no iteration order, no snapshot iterator, no
//! shrink, no persistence, no per-key TTL and no cryptographic hashing.

mod bucket;
mod error;
mod grow;
mod insert;
mod lock;
mod mem;
mod modmath;
mod node;
mod ops;
mod prime;
mod raw;
mod table;

pub use error::{AllocHandler, DefaultAllocHandler, InitError};
pub use table::{Capabilities, Table};
