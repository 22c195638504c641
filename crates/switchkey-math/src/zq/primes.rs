//! Generation of NTT-friendly primes.

use switchkey_util::is_prime;

/// Generate a `num_bits`-bit prime, congruent to 1 mod `modulo`, strictly
/// smaller than `upper_bound`. Note that `num_bits` must belong to (10..=62),
/// and upper_bound must be <= 1 << num_bits.
///
/// Calling it with `modulo = 2 * n` yields moduli supporting the negacyclic
/// NTT of size `n`.
pub fn generate_prime(num_bits: usize, modulo: u64, upper_bound: u64) -> Option<u64> {
    if !(10..=62).contains(&num_bits) {
        return None;
    }

    debug_assert!(
        (1u64 << num_bits) >= upper_bound,
        "upper_bound larger than number of bits"
    );

    let leading_zeros = (64 - num_bits) as u32;

    let mut tentative_prime = upper_bound - 1;
    while tentative_prime % modulo != 1 && tentative_prime.leading_zeros() == leading_zeros {
        tentative_prime -= 1
    }

    while tentative_prime.leading_zeros() == leading_zeros
        && !is_prime(tentative_prime)
        && tentative_prime >= modulo
    {
        tentative_prime -= modulo
    }

    if tentative_prime.leading_zeros() == leading_zeros && is_prime(tentative_prime) {
        Some(tentative_prime)
    } else {
        None
    }
}

/// Generate `count` distinct `num_bits`-bit primes supporting the NTT of size
/// `degree`, in decreasing order.
///
/// Returns None if not enough such primes exist.
pub fn generate_ntt_primes(num_bits: usize, degree: usize, count: usize) -> Option<Vec<u64>> {
    if num_bits > 62 {
        return None;
    }
    let mut primes = Vec::with_capacity(count);
    let mut upper_bound = 1u64 << num_bits;
    while primes.len() < count {
        let p = generate_prime(num_bits, 2 * degree as u64, upper_bound)?;
        primes.push(p);
        upper_bound = p;
    }
    Some(primes)
}
