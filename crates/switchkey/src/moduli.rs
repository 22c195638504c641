//! Ordered table of key-basis moduli.

use crate::{Error, Result};
use itertools::Itertools;
use switchkey_math::zq::Modulus;
use switchkey_util::is_prime;

/// The moduli of the key basis, in order, with their reduction constants.
///
/// The last modulus is the special modulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModulusTable {
    moduli_u64: Box<[u64]>,
    moduli: Box<[Modulus]>,
}

impl ModulusTable {
    /// Create a table from a list of distinct primes.
    ///
    /// Returns an error if the list is empty, or if one of the values is not
    /// a prime of at most 62 bits, or if a prime appears twice.
    pub fn new(moduli: &[u64]) -> Result<Self> {
        if moduli.is_empty() {
            return Err(Error::DefaultError("The list of moduli is empty".to_string()));
        }

        let moduli_structs = moduli
            .iter()
            .map(|p| {
                let q = Modulus::new(*p)?;
                if !is_prime(*p) {
                    return Err(Error::DefaultError(format!("Modulus {p} is not prime")));
                }
                Ok(q)
            })
            .collect::<Result<Vec<_>>>()?;

        if !moduli.iter().all_unique() {
            return Err(Error::DefaultError(
                "The moduli are not coprime".to_string(),
            ));
        }

        Ok(Self {
            moduli_u64: moduli.into(),
            moduli: moduli_structs.into_boxed_slice(),
        })
    }

    /// Returns the number of moduli.
    #[must_use]
    pub fn len(&self) -> usize {
        self.moduli.len()
    }

    /// Returns whether the table is empty; a constructed table never is.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moduli.is_empty()
    }

    /// Returns the moduli as integers.
    #[must_use]
    pub fn moduli(&self) -> &[u64] {
        &self.moduli_u64
    }

    /// Returns the modulus at index j.
    ///
    /// Panics if j is out of bounds.
    #[must_use]
    pub fn modulus(&self, j: usize) -> &Modulus {
        &self.moduli[j]
    }

    /// Returns the modulus at index j, if any.
    #[must_use]
    pub fn get(&self, j: usize) -> Option<&Modulus> {
        self.moduli.get(j)
    }

    /// Returns an iterator over the moduli.
    pub fn iter(&self) -> std::slice::Iter<'_, Modulus> {
        self.moduli.iter()
    }

    /// Returns the special modulus, i.e. the last one.
    #[must_use]
    pub fn special(&self) -> &Modulus {
        &self.moduli[self.moduli.len() - 1]
    }

    /// Reduce a 128-bit accumulator modulo the modulus at index j.
    ///
    /// The kernel reduces its per-modulus scalars with it; vectors go through
    /// the [`Modulus`] vector operations.
    ///
    /// Panics if j is out of bounds.
    #[must_use]
    pub fn reduce(&self, j: usize, acc: u128) -> u64 {
        self.moduli[j].reduce_u128(acc)
    }

    /// Compute acc + a * b modulo the modulus at index j, on a single residue.
    ///
    /// Panics if j is out of bounds; aborts if an input is not reduced in
    /// debug mode.
    #[must_use]
    pub fn mul_add(&self, j: usize, acc: u64, a: u64, b: u64) -> u64 {
        self.moduli[j].mul_add(acc, a, b)
    }
}
