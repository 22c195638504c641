#![crate_name = "switchkey_util"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Utilities for the switchkey library.

#[cfg(test)]
#[macro_use]
extern crate proptest;

use num_bigint_dig::{prime::probably_prime, BigUint, ModInverse};
use num_traits::cast::ToPrimitive;
use std::panic::UnwindSafe;

/// Define catch_unwind to silence the panic in unit tests.
pub fn catch_unwind<F, R>(f: F) -> std::thread::Result<R>
where
    F: FnOnce() -> R + UnwindSafe,
{
    let prev_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(|_| {}));
    let r = std::panic::catch_unwind(f);
    std::panic::set_hook(prev_hook);
    r
}

/// Returns whether the modulus p is prime; this function is 100% accurate.
pub fn is_prime(p: u64) -> bool {
    probably_prime(&BigUint::from(p), 0)
}

/// Computes the modular multiplicative inverse of `a` modulo `p`. Returns
/// `None` if `a` is not invertible modulo `p`.
pub fn inverse(a: u64, p: u64) -> Option<u64> {
    let p = BigUint::from(p);
    let a = BigUint::from(a);
    a.mod_inverse(p)?.to_u64()
}

/// Reverses the `nbits` least significant bits of `i`.
///
/// Aborts if `i >= 2^nbits` or `nbits == 0` in debug mode.
pub const fn bit_reverse(i: usize, nbits: u32) -> usize {
    debug_assert!(nbits > 0 && nbits <= usize::BITS);
    debug_assert!(nbits == usize::BITS || i >> nbits == 0);
    i.reverse_bits() >> (usize::BITS - nbits)
}
