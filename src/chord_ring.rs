//! Identifier-space arithmetic on a ring of size `2^bits`.
//!
//! Every routing decision reduces to one of the interval predicates below.
//! Intervals whose lower bound is not below the upper bound cross zero; they
//! are "unfolded" by adding the modulus to the upper bound (and to the
//! element when it sits before the wrap).

use log::warn;
use num_bigint::BigUint;

use crate::chord_error::{Error, Result};
use crate::chord_interface::{Identifier, MAX_BITS};

/// Ring of identifiers `[0, 2^bits)`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentifierSpace {
    bits: u32,
    modulus: Identifier,
}

impl IdentifierSpace {
    /// Build a ring for `bits`.
    ///
    /// `bits` above 160 is clamped to 160 and a value that is not a multiple
    /// of 4 is rounded up to the next one, so that ids are whole hex digits.
    /// Zero is rejected.
    pub fn new(bits: u32) -> Result<Self> {
        if bits == 0 {
            return Err(Error::Configuration(
                "identifier bits must be positive".to_string(),
            ));
        }

        let mut b = bits;
        if b > MAX_BITS {
            warn!("b should be at most {}; {} changed to {}", MAX_BITS, b, MAX_BITS);
            b = MAX_BITS;
        }
        if b % 4 != 0 {
            let rounded = b + (4 - b % 4);
            warn!("b should be a multiple of 4; {} changed to {}", b, rounded);
            b = rounded;
        }

        Ok(Self {
            bits: b,
            modulus: BigUint::from(1u8) << b,
        })
    }

    pub fn bits(&self) -> u32 {
        self.bits
    }

    /// `2^bits`
    pub fn modulus(&self) -> &Identifier {
        &self.modulus
    }

    /// Hex digits needed to write any id of this ring
    pub fn hex_digits(&self) -> usize {
        (self.bits / 4) as usize
    }

    pub fn contains(&self, x: &Identifier) -> bool {
        x < &self.modulus
    }

    /// `(a + b) mod 2^bits`
    pub fn add(&self, a: &Identifier, b: &Identifier) -> Identifier {
        (a + b) % &self.modulus
    }

    /// `2^k` for `0 <= k < bits`
    pub fn power_offset(&self, k: u32) -> Identifier {
        debug_assert!(k < self.bits, "finger index {} out of range", k);
        BigUint::from(1u8) << k
    }

    /// Nominal target of finger `k` of `id`: `(id + 2^k) mod 2^bits`
    pub fn finger_target(&self, id: &Identifier, k: u32) -> Identifier {
        self.add(id, &self.power_offset(k))
    }

    /// `lo < x < hi` on the integer line; false when `lo >= hi`.
    pub fn strictly_between(x: &Identifier, lo: &Identifier, hi: &Identifier) -> bool {
        lo < hi && lo < x && x < hi
    }

    /// `x` in `(lo, hi)` on the ring. `(v, v)` is every id except `v`.
    pub fn in_open_interval(&self, x: &Identifier, lo: &Identifier, hi: &Identifier) -> bool {
        if lo < hi {
            return Self::strictly_between(x, lo, hi);
        }

        let unfolded_hi = hi + &self.modulus;
        Self::strictly_between(x, lo, &unfolded_hi)
            || Self::strictly_between(&(x + &self.modulus), lo, &unfolded_hi)
    }

    /// `x` in `(lo, hi]` on the ring.
    pub fn in_closed_right_interval(
        &self,
        x: &Identifier,
        lo: &Identifier,
        hi: &Identifier,
    ) -> bool {
        if self.in_open_interval(x, lo, hi) || x == hi {
            return true;
        }

        lo > hi && *x == hi + &self.modulus
    }
}
