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

use std::fmt;

/// Errors detected at `init` time, before any allocation is attempted.
///
/// None of these are recoverable mid-operation: the contract is that a
/// table is either constructed with valid parameters or not constructed
/// at all.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum InitError {
    /// `key_size` was zero.
    ZeroKeySize,
    /// `elt_size` was zero.
    ZeroEltSize,
    /// `alpha_n` (load factor numerator) was zero.
    ZeroAlphaNumerator,
    /// `alpha_log_d` was not less than the bit width of the machine word.
    AlphaLogDenomOutOfRange,
    /// the requested element alignment was not a power of two.
    BadAlignment,
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroKeySize => write!(f, "key size must be non-zero"),
            Self::ZeroEltSize => write!(f, "element size must be non-zero"),
            Self::ZeroAlphaNumerator => write!(f, "load factor numerator must be non-zero"),
            Self::AlphaLogDenomOutOfRange => write!(
                f,
                "log2 of load factor denominator must be less than {}",
                usize::BITS
            ),
            Self::BadAlignment => write!(f, "element alignment must be a power of two"),
        }
    }
}

impl std::error::Error for InitError {}

/// The host-supplied handler for conditions the table cannot itself
/// recover from: allocator failure, and (vacuously, under `parking_lot`,
/// which cannot fail to lock) thread-primitive failure.
///
/// The default handler logs at `error!` and aborts the process. Callers
/// embedding the table in an environment with its own fatal-error path
/// (e.g. one that unwinds to a supervisor, or writes a crash report
/// first) can supply their own.
pub trait AllocHandler: Send + Sync {
    /// Called when the global allocator fails to satisfy a request. Must
    /// not return.
    fn on_alloc_failure(&self, what: &str) -> !;
}

/// The default [`AllocHandler`]: logs and aborts.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultAllocHandler;

impl AllocHandler for DefaultAllocHandler {
    fn on_alloc_failure(&self, what: &str) -> ! {
        log::error!("chainht: allocation failure while {what}; aborting");
        std::process::abort();
    }
}
