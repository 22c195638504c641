//! Key-switching key material.

use crate::{Error, Result};
use itertools::Itertools;
use ndarray::{s, Array3, ArrayView1, ArrayView3};

/// Key-switching key vectors, one per decomposition slot.
///
/// Each slot holds `key_component_count * key_modulus_size * coeff_count`
/// residues in NTT form, indexed by (component, key modulus, coefficient).
/// The residues of key modulus j are reduced modulo the j-th key modulus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeySwitchKeyMaterial {
    slots: Box<[Array3<u64>]>,
}

impl KeySwitchKeyMaterial {
    /// Create the key material from owned key vectors.
    pub fn new(
        key_vectors: &[Vec<u64>],
        key_component_count: usize,
        key_modulus_size: usize,
        coeff_count: usize,
    ) -> Result<Self> {
        let slices = key_vectors.iter().map(|v| v.as_slice()).collect_vec();
        Self::from_slices(&slices, key_component_count, key_modulus_size, coeff_count)
    }

    /// Create the key material by copying borrowed key vectors.
    ///
    /// Returns an error if there is no key vector, if a dimension is zero, or
    /// if a key vector does not have `key_component_count *
    /// key_modulus_size * coeff_count` residues.
    pub fn from_slices(
        key_vectors: &[&[u64]],
        key_component_count: usize,
        key_modulus_size: usize,
        coeff_count: usize,
    ) -> Result<Self> {
        if key_vectors.is_empty() {
            return Err(Error::DefaultError(
                "The key material has no key vector".to_string(),
            ));
        }
        if key_component_count == 0 || key_modulus_size == 0 || coeff_count == 0 {
            return Err(Error::DefaultError(
                "The key material dimensions must be non-zero".to_string(),
            ));
        }

        let slots = key_vectors
            .iter()
            .map(|v| {
                shaped(v, key_component_count, key_modulus_size, coeff_count)
                    .map(|view| view.to_owned())
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            slots: slots.into_boxed_slice(),
        })
    }

    /// Returns the number of decomposition slots.
    #[must_use]
    pub fn decomp_modulus_size(&self) -> usize {
        self.slots.len()
    }

    /// Returns the number of key components.
    #[must_use]
    pub fn key_component_count(&self) -> usize {
        self.slots[0].dim().0
    }

    /// Returns the number of key moduli.
    #[must_use]
    pub fn key_modulus_size(&self) -> usize {
        self.slots[0].dim().1
    }

    /// Returns the number of coefficients.
    #[must_use]
    pub fn coeff_count(&self) -> usize {
        self.slots[0].dim().2
    }

    /// Returns a residue, or None if an index is out of bounds.
    #[must_use]
    pub fn get(&self, slot: usize, component: usize, modulus: usize, coeff: usize) -> Option<u64> {
        self.slots.get(slot)?.get((component, modulus, coeff)).copied()
    }

    /// Returns the residues of a component under a key modulus, or None if an
    /// index is out of bounds.
    #[must_use]
    pub fn row(&self, slot: usize, component: usize, modulus: usize) -> Option<ArrayView1<'_, u64>> {
        let key = self.slots.get(slot)?;
        let (c, k, _) = key.dim();
        (component < c && modulus < k).then(|| key.slice(s![component, modulus, ..]))
    }

    /// Returns a view of every key vector.
    #[must_use]
    pub fn views(&self) -> Vec<ArrayView3<'_, u64>> {
        self.slots.iter().map(|key| key.view()).collect_vec()
    }
}

/// View a flat key vector as a (component, key modulus, coefficient) array.
pub(crate) fn shaped(
    key_vector: &[u64],
    key_component_count: usize,
    key_modulus_size: usize,
    coeff_count: usize,
) -> Result<ArrayView3<'_, u64>> {
    let expected = key_component_count * key_modulus_size * coeff_count;
    if key_vector.len() != expected {
        return Err(Error::mismatch("key vector", key_vector.len(), expected));
    }
    ArrayView3::from_shape(
        (key_component_count, key_modulus_size, coeff_count),
        key_vector,
    )
    .map_err(|e| Error::DefaultError(e.to_string()))
}
