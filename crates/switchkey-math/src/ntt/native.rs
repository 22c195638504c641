use crate::zq::Modulus;
use itertools::Itertools;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::iter::successors;
use switchkey_util::bit_reverse;

/// Negacyclic Number-Theoretic Transform operator.
///
/// The forward transform maps coefficients in natural order to evaluations in
/// bit-reversed order, using the smallest primitive 2n-th root of unity
/// modulo p. This is the convention of SEAL-compatible NTT-form ciphertexts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NttOperator {
    p: Modulus,
    p_twice: u64,
    size: usize,
    root: u64,
    omegas: Box<[u64]>,
    omegas_shoup: Box<[u64]>,
    zetas_inv: Box<[u64]>,
    zetas_inv_shoup: Box<[u64]>,
    size_inv: u64,
    size_inv_shoup: u64,
}

impl NttOperator {
    /// Create an NTT operator given a modulus for a specific size.
    ///
    /// Returns None if the size is not a power of 2 that is >= 8, or if the
    /// modulus does not support the NTT for this specific size.
    pub fn new(p: &Modulus, size: usize) -> Option<Self> {
        if !super::supports_ntt(p.p, size) {
            return None;
        }

        let size_inv = p.inv(size as u64)?;

        let omega = Self::minimal_primitive_root(size, p)?;
        let omega_inv = p.inv(omega)?;

        let powers = successors(Some(1u64), |n| Some(p.mul(*n, omega)))
            .take(size)
            .collect_vec();
        let powers_inv = successors(Some(omega_inv), |n| Some(p.mul(*n, omega_inv)))
            .take(size)
            .collect_vec();

        let log_size = size.trailing_zeros();
        let (omegas, zetas_inv): (Vec<u64>, Vec<u64>) = (0..size)
            .map(|i| {
                let j = bit_reverse(i, log_size);
                (powers[j], powers_inv[j])
            })
            .unzip();

        let omegas_shoup = p.shoup_vec(&omegas);
        let zetas_inv_shoup = p.shoup_vec(&zetas_inv);

        Some(Self {
            p: p.clone(),
            p_twice: p.p * 2,
            size,
            root: omega,
            omegas: omegas.into_boxed_slice(),
            omegas_shoup: omegas_shoup.into_boxed_slice(),
            zetas_inv: zetas_inv.into_boxed_slice(),
            zetas_inv_shoup: zetas_inv_shoup.into_boxed_slice(),
            size_inv,
            size_inv_shoup: p.shoup(size_inv),
        })
    }

    /// Returns the size of the transform.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Returns the modulus of the transform.
    #[must_use]
    pub const fn modulus(&self) -> &Modulus {
        &self.p
    }

    /// Returns the primitive 2n-th root of unity used by the transform.
    #[must_use]
    pub const fn root(&self) -> u64 {
        self.root
    }

    /// Compute the forward NTT in place.
    /// Aborts if a is not of the size handled by the operator, or if one of
    /// its values is >= 4 * p, in debug mode.
    pub fn forward(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.size);

        let mut l = self.size >> 1;
        let mut k = 1;
        while l > 0 {
            for chunk in a.chunks_exact_mut(2 * l) {
                let omega = self.omegas[k];
                let omega_shoup = self.omegas_shoup[k];
                k += 1;

                let (left, right) = chunk.split_at_mut(l);
                if l == 1 {
                    // The last level should reduce the output
                    self.butterfly(&mut left[0], &mut right[0], omega, omega_shoup);
                    left[0] = self.reduce3(left[0]);
                    right[0] = self.reduce3(right[0]);
                } else {
                    for (x, y) in left.iter_mut().zip(right.iter_mut()) {
                        self.butterfly(x, y, omega, omega_shoup);
                    }
                }
            }
            l >>= 1;
        }
    }

    /// Compute the backward NTT in place.
    /// Aborts if a is not of the size handled by the operator, or if one of
    /// its values is >= 2 * p, in debug mode.
    pub fn backward(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.size);

        let mut k = 0;
        let mut l = 1;

        while l < self.size {
            for chunk in a.chunks_exact_mut(2 * l) {
                let zeta_inv = self.zetas_inv[k];
                let zeta_inv_shoup = self.zetas_inv_shoup[k];
                k += 1;

                let (left, right) = chunk.split_at_mut(l);
                for (x, y) in left.iter_mut().zip(right.iter_mut()) {
                    self.inv_butterfly(x, y, zeta_inv, zeta_inv_shoup);
                }
            }
            l <<= 1;
        }

        a.iter_mut()
            .for_each(|ai| *ai = self.p.mul_shoup(*ai, self.size_inv, self.size_inv_shoup));
    }

    /// Reduce a modulo p.
    ///
    /// Aborts if a >= 4 * p.
    const fn reduce3(&self, a: u64) -> u64 {
        debug_assert!(a < 4 * self.p.p);

        let y = Modulus::reduce1(a, self.p_twice);
        Modulus::reduce1(y, self.p.p)
    }

    /// NTT Butterfly.
    fn butterfly(&self, x: &mut u64, y: &mut u64, w: u64, w_shoup: u64) {
        debug_assert!(*x < 4 * self.p.p);
        debug_assert!(*y < 4 * self.p.p);
        debug_assert!(w < self.p.p);
        debug_assert_eq!(self.p.shoup(w), w_shoup);

        *x = Modulus::reduce1(*x, self.p_twice);
        let t = self.p.lazy_mul_shoup(*y, w, w_shoup);
        *y = *x + self.p_twice - t;
        *x += t;

        debug_assert!(*x < 4 * self.p.p);
        debug_assert!(*y < 4 * self.p.p);
    }

    /// Inverse NTT butterfly.
    fn inv_butterfly(&self, x: &mut u64, y: &mut u64, z: u64, z_shoup: u64) {
        debug_assert!(*x < self.p_twice);
        debug_assert!(*y < self.p_twice);
        debug_assert!(z < self.p.p);
        debug_assert_eq!(self.p.shoup(z), z_shoup);

        let t = *x;
        *x = Modulus::reduce1(*y + t, self.p_twice);
        *y = self.p.lazy_mul_shoup(self.p_twice + t - *y, z, z_shoup);

        debug_assert!(*x < self.p_twice);
        debug_assert!(*y < self.p_twice);
    }

    /// Returns the smallest primitive 2n-th root of unity modulo p.
    ///
    /// The primitive 2n-th roots are exactly the odd powers of any one of
    /// them, so a single root found by sampling is enough to enumerate all.
    fn minimal_primitive_root(n: usize, p: &Modulus) -> Option<u64> {
        let root = Self::primitive_root(n, p)?;
        let root_squared = p.mul(root, root);
        successors(Some(root), |r| Some(p.mul(*r, root_squared)))
            .take(n)
            .min()
    }

    /// Returns a 2n-th primitive root modulo p.
    ///
    /// Aborts if p is not prime or n is not a power of 2 that is >= 8 in
    /// debug mode.
    fn primitive_root(n: usize, p: &Modulus) -> Option<u64> {
        debug_assert!(super::supports_ntt(p.p, n));

        let lambda = (p.p - 1) / (2 * n as u64);

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..100 {
            let root = p.pow(rng.random_range(0..p.p), lambda);
            if Self::is_primitive_root(root, 2 * n, p) {
                return Some(root);
            }
        }

        None
    }

    /// Returns whether a is a n-th primitive root of unity, for n a power
    /// of two.
    ///
    /// Aborts if a >= p in debug mode.
    fn is_primitive_root(a: u64, n: usize, p: &Modulus) -> bool {
        debug_assert!(a < p.p);

        // x^n = 1 mod p, and x^(n/2) != 1 mod p since 2 is the only prime
        // dividing n.
        (p.pow(a, n as u64) == 1) && (p.pow(a, (n / 2) as u64) != 1)
    }
}
