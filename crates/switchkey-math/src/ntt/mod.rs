//! Negacyclic Number-Theoretic Transform in ZZ_q.

use switchkey_util::is_prime;

mod native;

pub use native::NttOperator;

/// Returns whether a modulus p is prime and supports the Number Theoretic
/// Transform of size n, where n must be a power of 2 that is >= 8.
pub fn supports_ntt(p: u64, n: usize) -> bool {
    n >= 8 && n.is_power_of_two() && p % ((n as u64) << 1) == 1 && is_prime(p)
}
