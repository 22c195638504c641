#![warn(missing_docs, unused_imports)]

//! Arithmetic modulo primes of at most 62 bits.

pub mod primes;

use std::ops::Deref;

use crate::errors::{Error, Result};
use itertools::{izip, Itertools};
use num_bigint::BigUint;
use num_traits::cast::ToPrimitive;
use pulp::Arch;
use rand::Rng;
use switchkey_util::is_prime;

/// cond ? on_true : on_false
const fn const_time_cond_select(on_true: u64, on_false: u64, cond: bool) -> u64 {
    let mask = -(cond as i64) as u64;
    let diff = on_true ^ on_false;
    (diff & mask) ^ on_false
}

/// A modulus of at most 62 bits together with its Barrett constant, so that
/// products of two residues (and sums of such products) can be reduced in
/// fixed time.
#[derive(Debug, Clone)]
pub struct Modulus {
    pub(crate) p: u64,
    barrett_hi: u64,
    barrett_lo: u64,
    arch: Arch,
}

impl Eq for Modulus {}

impl PartialEq for Modulus {
    fn eq(&self, other: &Self) -> bool {
        let Self {
            p,
            barrett_hi: _,
            barrett_lo: _,
            arch: _,
        } = self;
        let Self {
            p: other_p,
            barrett_hi: _,
            barrett_lo: _,
            arch: _,
        } = other;

        // The other fields are derived from p.
        p == other_p
    }
}

impl Deref for Modulus {
    type Target = u64;

    fn deref(&self) -> &Self::Target {
        &self.p
    }
}

impl Modulus {
    /// Create a modulus from an integer of at most 62 bits.
    pub fn new(p: u64) -> Result<Self> {
        if p < 2 || (p >> 62) != 0 {
            return Err(Error::InvalidModulus(p));
        }

        // floor(2^128 / p)
        let barrett = ((BigUint::from(1u64) << 128usize) / p)
            .to_u128()
            .ok_or(Error::InvalidModulus(p))?;
        Ok(Self {
            p,
            barrett_hi: (barrett >> 64) as u64,
            barrett_lo: barrett as u64,
            arch: Arch::new(),
        })
    }

    /// Returns the value of the modulus.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.p
    }

    /// Performs the modular addition of a and b in constant time.
    /// Aborts if a >= p or b >= p in debug mode.
    #[must_use]
    pub const fn add(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + b, self.p)
    }

    /// Performs the modular subtraction of a and b in constant time.
    /// Aborts if a >= p or b >= p in debug mode.
    #[must_use]
    pub const fn sub(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        Self::reduce1(a + self.p - b, self.p)
    }

    /// Performs the modular multiplication of a and b in constant time.
    /// Aborts if a >= p or b >= p in debug mode.
    #[must_use]
    pub const fn mul(&self, a: u64, b: u64) -> u64 {
        debug_assert!(a < self.p && b < self.p);
        self.reduce_u128((a as u128) * (b as u128))
    }

    /// Computes acc + a * b modulo p in constant time, using a 128-bit
    /// intermediate.
    /// Aborts if acc, a or b is >= p in debug mode.
    #[must_use]
    pub const fn mul_add(&self, acc: u64, a: u64, b: u64) -> u64 {
        debug_assert!(acc < self.p && a < self.p && b < self.p);
        self.reduce_u128((a as u128) * (b as u128) + (acc as u128))
    }

    /// Modular negation in constant time.
    ///
    /// Aborts if a >= p in debug mode.
    #[must_use]
    pub const fn neg(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);
        Self::reduce1(self.p - a, self.p)
    }

    /// Compute the Shoup representation of a.
    ///
    /// Aborts if a >= p in debug mode.
    #[must_use]
    pub const fn shoup(&self, a: u64) -> u64 {
        debug_assert!(a < self.p);

        (((a as u128) << 64) / (self.p as u128)) as u64
    }

    /// Shoup multiplication of a and b in constant time.
    ///
    /// Aborts if b >= p or b_shoup != shoup(b) in debug mode.
    #[must_use]
    pub const fn mul_shoup(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
        Self::reduce1(self.lazy_mul_shoup(a, b, b_shoup), self.p)
    }

    /// Lazy Shoup multiplication of a and b in constant time.
    /// The output is in the interval [0, 2 * p).
    ///
    /// Aborts if b >= p or b_shoup != shoup(b) in debug mode.
    #[must_use]
    pub const fn lazy_mul_shoup(&self, a: u64, b: u64, b_shoup: u64) -> u64 {
        debug_assert!(b < self.p);
        debug_assert!(b_shoup == self.shoup(b));

        let q = ((a as u128) * (b_shoup as u128)) >> 64;
        let r = ((a as u128) * (b as u128) - q * (self.p as u128)) as u64;

        debug_assert!(r < 2 * self.p);

        r
    }

    /// Modular addition of vectors in place in constant time.
    ///
    /// Aborts if a and b differ in size, and if any of their values is >= p in
    /// debug mode.
    pub fn add_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        self.arch.dispatch(|| {
            izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.add(*ai, *bi))
        })
    }

    /// Modular subtraction of vectors in place in constant time.
    ///
    /// Aborts if a and b differ in size, and if any of their values is >= p in
    /// debug mode.
    pub fn sub_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        self.arch.dispatch(|| {
            izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.sub(*ai, *bi))
        })
    }

    /// Modular multiplication of vectors in place in constant time.
    ///
    /// Aborts if a and b differ in size, and if any of their values is >= p in
    /// debug mode.
    pub fn mul_vec(&self, a: &mut [u64], b: &[u64]) {
        debug_assert_eq!(a.len(), b.len());
        self.arch.dispatch(|| {
            izip!(a.iter_mut(), b.iter()).for_each(|(ai, bi)| *ai = self.mul(*ai, *bi))
        })
    }

    /// Multiply-accumulate of vectors in place in constant time:
    /// `acc[i] = acc[i] + a[i] * b[i] mod p`.
    ///
    /// Aborts if the vectors differ in size, and if any of their values is
    /// >= p in debug mode.
    pub fn mul_add_vec(&self, acc: &mut [u64], a: &[u64], b: &[u64]) {
        debug_assert_eq!(acc.len(), a.len());
        debug_assert_eq!(acc.len(), b.len());
        self.arch.dispatch(|| {
            izip!(acc.iter_mut(), a.iter(), b.iter())
                .for_each(|(acc_i, ai, bi)| *acc_i = self.mul_add(*acc_i, *ai, *bi))
        })
    }

    /// Modular addition of a scalar to a vector in place in constant time.
    ///
    /// Aborts if b or any of the values in a is >= p in debug mode.
    pub fn add_scalar_vec(&self, a: &mut [u64], b: u64) {
        self.arch
            .dispatch(|| a.iter_mut().for_each(|ai| *ai = self.add(*ai, b)))
    }

    /// Modular subtraction of a scalar from a vector in place in constant
    /// time.
    ///
    /// Aborts if b or any of the values in a is >= p in debug mode.
    pub fn sub_scalar_vec(&self, a: &mut [u64], b: u64) {
        self.arch
            .dispatch(|| a.iter_mut().for_each(|ai| *ai = self.sub(*ai, b)))
    }

    /// Modular scalar multiplication of vectors in place in constant time.
    ///
    /// Aborts if b or any of the values in a is >= p in debug mode.
    pub fn scalar_mul_vec(&self, a: &mut [u64], b: u64) {
        let b_shoup = self.shoup(b);
        self.arch.dispatch(|| {
            a.iter_mut()
                .for_each(|ai| *ai = self.mul_shoup(*ai, b, b_shoup))
        })
    }

    /// Compute the Shoup representation of a vector.
    ///
    /// Aborts if any of the values of the vector is >= p in debug mode.
    #[must_use]
    pub fn shoup_vec(&self, a: &[u64]) -> Vec<u64> {
        self.arch
            .dispatch(|| a.iter().map(|ai| self.shoup(*ai)).collect_vec())
    }

    /// Reduce a vector in place in constant time.
    pub fn reduce_vec(&self, a: &mut [u64]) {
        self.arch
            .dispatch(|| a.iter_mut().for_each(|ai| *ai = self.reduce(*ai)))
    }

    /// Modular exponentiation in variable time.
    ///
    /// Aborts if a >= p or n >= p in debug mode.
    #[must_use]
    pub fn pow(&self, a: u64, n: u64) -> u64 {
        debug_assert!(a < self.p && n < self.p);

        if n == 0 {
            1
        } else if n == 1 {
            a
        } else {
            let mut r = a;
            let mut i = (62 - n.leading_zeros()) as isize;
            while i >= 0 {
                r = self.mul(r, r);
                if (n >> i) & 1 == 1 {
                    r = self.mul(r, a);
                }
                i -= 1;
            }
            r
        }
    }

    /// Modular inversion in variable time.
    ///
    /// Returns None if p is not prime or a = 0.
    /// Aborts if a >= p in debug mode.
    #[must_use]
    pub fn inv(&self, a: u64) -> Option<u64> {
        if !is_prime(self.p) || a == 0 {
            None
        } else {
            let r = self.pow(a, self.p - 2);
            debug_assert_eq!(self.mul(a, r), 1);
            Some(r)
        }
    }

    /// Modular reduction of a u128 in constant time.
    #[must_use]
    pub const fn reduce_u128(&self, a: u128) -> u64 {
        Self::reduce1(self.lazy_reduce_u128(a), self.p)
    }

    /// Modular reduction of a u64 in constant time.
    #[must_use]
    pub const fn reduce(&self, a: u64) -> u64 {
        Self::reduce1(self.lazy_reduce(a), self.p)
    }

    /// Return x mod p in constant time.
    /// Aborts if x >= 2 * p in debug mode.
    pub(crate) const fn reduce1(x: u64, p: u64) -> u64 {
        debug_assert!(p >> 63 == 0);
        debug_assert!(x < 2 * p);

        let r = const_time_cond_select(x, x.wrapping_sub(p), x < p);

        debug_assert!(r == x % p);

        r
    }

    /// Lazy modular reduction of a in constant time.
    /// The output is in the interval [0, 2 * p).
    #[must_use]
    pub const fn lazy_reduce_u128(&self, a: u128) -> u64 {
        let a_lo = a as u64;
        let a_hi = (a >> 64) as u64;
        let p_lo_lo = ((a_lo as u128) * (self.barrett_lo as u128)) >> 64;
        let p_hi_lo = (a_hi as u128) * (self.barrett_lo as u128);
        let p_lo_hi = (a_lo as u128) * (self.barrett_hi as u128);

        let q = ((p_lo_hi + p_hi_lo + p_lo_lo) >> 64) + (a_hi as u128) * (self.barrett_hi as u128);
        let r = (a - q * (self.p as u128)) as u64;

        debug_assert!((r as u128) < 2 * (self.p as u128));
        debug_assert!(r % self.p == (a % (self.p as u128)) as u64);

        r
    }

    /// Lazy modular reduction of a in constant time.
    /// The output is in the interval [0, 2 * p).
    #[must_use]
    pub const fn lazy_reduce(&self, a: u64) -> u64 {
        let p_lo_lo = ((a as u128) * (self.barrett_lo as u128)) >> 64;
        let p_lo_hi = (a as u128) * (self.barrett_hi as u128);

        let q = (p_lo_hi + p_lo_lo) >> 64;
        let r = (a as u128 - q * (self.p as u128)) as u64;

        debug_assert!((r as u128) < 2 * (self.p as u128));
        debug_assert!(r % self.p == a % self.p);

        r
    }

    /// Returns a vector of uniformly random residues.
    pub fn random_vec<R: Rng>(&self, size: usize, rng: &mut R) -> Vec<u64> {
        (0..size).map(|_| rng.random_range(0..self.p)).collect_vec()
    }
}
