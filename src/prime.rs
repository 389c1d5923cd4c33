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

//! The fixed prime ladder the table's modulus is drawn from.
//!
//! Primes are stored as 16-bit parts, grouped by how many parts compose
//! each prime (1, 2, 3 or 4 parts -- i.e. up to 64 bits on a 64-bit word).
//! The ladder roughly doubles in magnitude and avoids values close to
//! powers of two or ten, to damp hashing regularities in structured keys.

use crate::modmath::WORD_BITS;

const BUILD_SHIFT: u32 = 16;

/// Flat array of 16-bit prime parts, in increasing order of the primes
/// they build. `GROUP_PARTS_PER_PRIME[g]` parts are consumed per prime in
/// group `g`; see [`GROUP_ACC_OFFSETS`] for where each group starts.
#[rustfmt::skip]
const PRIME_PARTS: [u16; 6 * 1 + 16 * (2 + 3 + 4)] = [
    0x0607,                                 // 1543
    0x0c2f,                                 // 3119
    0x1843,                                 // 6211
    0x3037,                                 // 12343
    0x5dad,                                 // 23981
    0xbe21,                                 // 48673
    0x5b0b, 0x0001,                         // 88843
    0xd8d5, 0x0002,                         // 186581
    0xc219, 0x0005,                         // 377369
    0x0077, 0x000c,                         // 786551
    0xa243, 0x0016,                         // 1483331
    0x2029, 0x0031,                         // 3219497
    0xcc21, 0x005f,                         // 6278177
    0x5427, 0x00bf,                         // 12538919
    0x037f, 0x0180,                         // 25166719
    0x42bb, 0x030f,                         // 51331771
    0x1c75, 0x06b7,                         // 112663669
    0x96ad, 0x0c98,                         // 211326637
    0x96b7, 0x1898,                         // 412653239
    0xc10f, 0x2ecf,                         // 785367311
    0x425b, 0x600f,                         // 1611612763
    0x0007, 0xc000,                         // 3221225479
    0x016f, 0x8000, 0x0001,                 // 6442451311
    0x9345, 0xffc8, 0x0002,                 // 12881269573
    0x5523, 0xf272, 0x0005,                 // 25542415651
    0x1575, 0x0a63, 0x000c,                 // 51713873269
    0x22fb, 0xca07, 0x001b,                 // 119353582331
    0xc513, 0x4d6b, 0x0031,                 // 211752305939
    0xa6cd, 0x50f3, 0x0061,                 // 417969972941
    0xa021, 0x5460, 0x00be,                 // 817459404833
    0xea29, 0x7882, 0x0179,                 // 1621224516137
    0xeaaf, 0x7c3d, 0x02f5,                 // 3253374675631
    0xab5f, 0x5a69, 0x05ff,                 // 6594291673951
    0x6b1f, 0x29ef, 0x0c24,                 // 13349461912351
    0xc81b, 0x35a7, 0x17fe,                 // 26380589320219
    0x57b7, 0xccbe, 0x2ffb,                 // 52758518323127
    0xc8fb, 0x1da8, 0x6bf3,                 // 118691918825723
    0x82c3, 0x2c9f, 0xc2cc,                 // 214182177768131
    0x3233, 0x1c54, 0x7d40, 0x0001,         // 419189283369523
    0x60ad, 0x46a1, 0xf55e, 0x0002,         // 832735214133421
    0x6bab, 0x40c4, 0xf12a, 0x0005,         // 1672538661088171
    0xb24d, 0x6765, 0x38b5, 0x000b,         // 3158576518771277
    0x789f, 0xfd94, 0xc6b2, 0x0017,         // 6692396525189279
    0x0d35, 0x5443, 0xff54, 0x0030,         // 13791536538127669
    0x2465, 0x74f9, 0x42d1, 0x005e,         // 26532115188884581
    0xd017, 0x90c7, 0x37b3, 0x00c6,         // 55793289756397591
    0x5055, 0x5a82, 0x64df, 0x0193,         // 113545326073368661
    0x6f8f, 0x423b, 0x8949, 0x0304,         // 217449629757435791
    0xd627, 0x08e0, 0x0b2f, 0x05fe,         // 431794910914467367
    0xbbc1, 0x662c, 0x4d90, 0x0bad,         // 841413987972987841
    0xf7d3, 0x45a1, 0x8ccb, 0x185d,         // 1755714234418853843
    0xc647, 0x3c91, 0x46b2, 0x2e9b,         // 3358355678469146183
    0x58a1, 0xbd96, 0x2836, 0x5f8c,         // 6884922145916737697
    0x8969, 0x4c70, 0x6dbe, 0xdad8,         // 15769474759331449193
];

const PRIME_PARTS_COUNT: usize = PRIME_PARTS.len();
const GROUP_PARTS_PER_PRIME: [usize; 4] = [1, 2, 3, 4];
/// Flat-array offset at which each group ends (and the next begins).
const GROUP_ACC_OFFSETS: [usize; 4] = [6, 6 + 16 * 2, 6 + 16 * (2 + 3), 6 + 16 * (2 + 3 + 4)];

/// Outcome of attempting to move the ladder to its next prime.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum AdvanceStatus {
    /// The ladder advanced to a new, larger prime.
    Ok,
    /// The next prime in the ladder needs more bits than the host word;
    /// the ladder must not be advanced further, but growth may be
    /// retried later (chains simply lengthen in the meantime).
    Saturated,
    /// The ladder is fully consumed; identical treatment to `Saturated`
    /// from the caller's perspective, kept distinct so a caller can tell
    /// the two apart for diagnostics.
    Exhausted,
}

/// A cursor into the prime ladder: the current modulus plus enough state
/// to resume advancing it.
#[derive(Debug, Clone, Copy)]
pub struct Ladder {
    /// Flat offset into `PRIME_PARTS` of the first part of the current
    /// prime, or `None` once the ladder is saturated/exhausted.
    index: Option<usize>,
    group: usize,
    modulus: usize,
}

impl Ladder {
    /// The smallest prime in the ladder (index 0, group 0).
    pub fn first() -> Self {
        Ladder {
            index: Some(0),
            group: 0,
            modulus: build_prime(0, GROUP_PARTS_PER_PRIME[0]),
        }
    }

    pub fn modulus(&self) -> usize {
        self.modulus
    }

    pub fn is_saturated_or_exhausted(&self) -> bool {
        self.index.is_none()
    }

    /// Attempts to move to the next prime in the ladder. Returns the
    /// status of the attempt; on `Ok`, `self.modulus()` reflects the new,
    /// larger modulus. On `Saturated`/`Exhausted`, `self` is left
    /// unchanged apart from being marked as such, and further calls
    /// return the same status without panicking.
    pub fn advance(&mut self) -> AdvanceStatus {
        let Some(mut ix) = self.index else {
            return AdvanceStatus::Exhausted;
        };
        ix += GROUP_PARTS_PER_PRIME[self.group];
        let mut group = self.group;
        if group < GROUP_ACC_OFFSETS.len() && ix == GROUP_ACC_OFFSETS[group] {
            group += 1;
        }
        if ix == PRIME_PARTS_COUNT {
            self.index = None;
            return AdvanceStatus::Exhausted;
        }
        if is_overflow(ix, GROUP_PARTS_PER_PRIME[group]) {
            self.index = None;
            return AdvanceStatus::Saturated;
        }
        self.modulus = build_prime(ix, GROUP_PARTS_PER_PRIME[group]);
        self.index = Some(ix);
        self.group = group;
        AdvanceStatus::Ok
    }
}

/// Tests whether the prime starting at `start` (`count` 16-bit parts)
/// would need more bits than the host word to represent.
fn is_overflow(start: usize, count: usize) -> bool {
    let mut top = PRIME_PARTS[start + (count - 1)];
    let mut bits_needed = 0u32;
    while top != 0 {
        top >>= 1;
        bits_needed += 1;
    }
    bits_needed + (count as u32 - 1) * BUILD_SHIFT > WORD_BITS
}

/// Reconstructs the prime built from `count` parts starting at `start`.
fn build_prime(start: usize, count: usize) -> usize {
    let mut p: usize = 0;
    for i in 0..count {
        let part = (PRIME_PARTS[start + i] as usize) << (i as u32 * BUILD_SHIFT);
        p |= part;
    }
    p
}
