//! The key-switching kernel.
//!
//! Given the decomposition of a polynomial over the first moduli of the key
//! basis, the kernel computes its inner product with a key-switching key over
//! the decomposition moduli and the special modulus, and divides the result by
//! the special modulus. The rescaled products are added to the switched region
//! of the buffer, and the target tier is copied after it.

use crate::key::{shaped, KeySwitchKeyMaterial};
use crate::layout::{contiguous, contiguous_mut, InPlaceBufferWriter};
use crate::{
    Error, ModSwitchFactorTable, ModulusTable, ParametersError, Result, SwitchKeyParameters,
    SwitchKeyParametersBuilder,
};
use itertools::izip;
use log::{debug, trace};
use ndarray::{s, Array3, ArrayView2, ArrayView3};
use std::iter::once;
use switchkey_math::ntt::NttOperator;

/// Key-switching kernel for fixed parameters and moduli.
///
/// The kernel is immutable once created and can be shared between threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchKeyKernel {
    par: SwitchKeyParameters,
    moduli: ModulusTable,
    ops: Box<[NttOperator]>,
}

impl SwitchKeyKernel {
    /// Create a kernel from parameters and the key basis.
    ///
    /// Returns an error if the number of moduli is not the number of key
    /// moduli, or if a modulus does not support the NTT of size
    /// `coeff_count`.
    pub fn new(par: &SwitchKeyParameters, moduli: ModulusTable) -> Result<Self> {
        if moduli.len() != par.key_modulus_size() {
            return Err(Error::mismatch(
                "moduli",
                moduli.len(),
                par.key_modulus_size(),
            ));
        }

        let n = par.coeff_count();
        let ops = moduli
            .iter()
            .map(|q| {
                NttOperator::new(q, n).ok_or(Error::ParametersError(
                    ParametersError::UnsupportedModulus(q.value(), n),
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        debug!(
            "Created key-switching kernel: coeff_count={}, decomp_modulus_size={}, key_modulus_size={}, key_component_count={}",
            n,
            par.decomp_modulus_size(),
            par.key_modulus_size(),
            par.key_component_count()
        );

        Ok(Self {
            par: *par,
            moduli,
            ops: ops.into_boxed_slice(),
        })
    }

    /// Returns the parameters of the kernel.
    #[must_use]
    pub const fn parameters(&self) -> &SwitchKeyParameters {
        &self.par
    }

    /// Returns the key basis of the kernel.
    #[must_use]
    pub const fn moduli(&self) -> &ModulusTable {
        &self.moduli
    }

    /// Switch the key of the target tier, updating the buffer in place.
    ///
    /// The buffer must contain `key_component_count` polynomials over the
    /// decomposition moduli in NTT form, followed by room for the target
    /// tier. The key-switched components are added to those polynomials, and
    /// the target tier is copied after them, so the buffer holds
    /// `(key_component_count + 1) * decomp_modulus_size * coeff_count`
    /// residues.
    ///
    /// The target tier holds one polynomial in NTT form per decomposition
    /// modulus, that is `decomp_modulus_size * coeff_count` residues (see
    /// [`SwitchKeyParameters::target_tier_len`]). The mod-switch factors need
    /// not be reduced.
    ///
    /// Returns an error, without modifying the buffer, if an input does not
    /// have the dimensions of the parameters. Aborts if an input residue is
    /// not reduced in debug mode.
    pub fn switch_key(
        &self,
        buffer: &mut [u64],
        target_tier: &[u64],
        key: &KeySwitchKeyMaterial,
        factors: &ModSwitchFactorTable,
    ) -> Result<()> {
        self.switch_key_views(buffer, target_tier, &key.views(), factors.as_slice())
    }

    /// Same as [`SwitchKeyKernel::switch_key`], with one borrowed
    /// (component, key modulus, coefficient) view per decomposition slot.
    pub fn switch_key_views(
        &self,
        buffer: &mut [u64],
        target_tier: &[u64],
        key_vectors: &[ArrayView3<'_, u64>],
        factors: &[u64],
    ) -> Result<()> {
        self.validate(buffer, target_tier, key_vectors, factors)?;
        self.debug_check_reduced(buffer, target_tier, key_vectors);
        trace!(
            "Switching key of {} residues over {} decomposition moduli",
            target_tier.len(),
            key_vectors.len()
        );

        let target = ArrayView2::from_shape(
            (self.par.decomp_modulus_size(), self.par.coeff_count()),
            target_tier,
        )
        .map_err(|e| Error::DefaultError(e.to_string()))?;
        let products = self.accumulate(&target, key_vectors)?;

        let mut writer = InPlaceBufferWriter::new(self.par.layout(), buffer)?;
        self.mod_down(&mut writer, &products, factors)?;
        writer.write_tail(target_tier)
    }

    fn validate(
        &self,
        buffer: &[u64],
        target_tier: &[u64],
        key_vectors: &[ArrayView3<'_, u64>],
        factors: &[u64],
    ) -> Result<()> {
        let par = &self.par;
        let layout = par.layout();
        if buffer.len() != layout.buffer_len() {
            return Err(Error::mismatch("buffer", buffer.len(), layout.buffer_len()));
        }
        if target_tier.len() != par.target_tier_len() {
            return Err(Error::mismatch(
                "target tier",
                target_tier.len(),
                par.target_tier_len(),
            ));
        }
        if key_vectors.len() != par.decomp_modulus_size() {
            return Err(Error::mismatch(
                "key vectors",
                key_vectors.len(),
                par.decomp_modulus_size(),
            ));
        }
        for key in key_vectors {
            let (c, k, n) = key.dim();
            if c != par.key_component_count() {
                return Err(Error::mismatch("key components", c, par.key_component_count()));
            }
            if k != par.key_modulus_size() {
                return Err(Error::mismatch("key moduli", k, par.key_modulus_size()));
            }
            if n != par.coeff_count() {
                return Err(Error::mismatch("key coefficients", n, par.coeff_count()));
            }
        }
        if factors.len() != par.decomp_modulus_size() {
            return Err(Error::mismatch(
                "mod-switch factors",
                factors.len(),
                par.decomp_modulus_size(),
            ));
        }
        Ok(())
    }

    fn debug_check_reduced(
        &self,
        buffer: &[u64],
        target_tier: &[u64],
        key_vectors: &[ArrayView3<'_, u64>],
    ) {
        if !cfg!(debug_assertions) {
            return;
        }

        let n = self.par.coeff_count();
        let d = self.par.decomp_modulus_size();
        let q = |j: usize| self.moduli.modulus(j).value();
        let switched = &buffer[..self.par.layout().switched_len()];
        for (idx, v) in switched.iter().enumerate() {
            debug_assert!(*v < q((idx / n) % d), "Unreduced buffer residue at {idx}");
        }
        for (idx, v) in target_tier.iter().enumerate() {
            debug_assert!(*v < q(idx / n), "Unreduced target tier residue at {idx}");
        }
        for (slot, key) in key_vectors.iter().enumerate() {
            for ((c, j, k), v) in key.indexed_iter() {
                debug_assert!(*v < q(j), "Unreduced key residue at ({slot}, {c}, {j}, {k})");
            }
        }
    }

    /// Returns, for each component, the inner products of the target tier
    /// with the key vectors under each decomposition modulus, followed by the
    /// inner product under the special modulus.
    fn accumulate(
        &self,
        target: &ArrayView2<'_, u64>,
        key_vectors: &[ArrayView3<'_, u64>],
    ) -> Result<Array3<u64>> {
        let n = self.par.coeff_count();
        let d = self.par.decomp_modulus_size();

        let mut coefficients = target.to_owned();
        for (row, op) in izip!(coefficients.outer_iter_mut(), self.ops.iter()) {
            op.backward(contiguous_mut(row)?);
        }

        let mut products = Array3::<u64>::zeros((self.par.key_component_count(), d + 1, n));
        let mut lifted = vec![0u64; n];
        for (r, key_index) in (0..d).chain(once(self.par.special_index())).enumerate() {
            let q = self.moduli.modulus(key_index);
            let op = &self.ops[key_index];

            for (j, key) in key_vectors.iter().enumerate() {
                let operand: &[u64] = if j == key_index {
                    contiguous(target.row(j))?
                } else {
                    lifted.copy_from_slice(contiguous(coefficients.row(j))?);
                    if self.moduli.modulus(j).value() > q.value() {
                        q.reduce_vec(&mut lifted);
                    }
                    op.forward(&mut lifted);
                    lifted.as_slice()
                };

                for (c, mut acc) in products.outer_iter_mut().enumerate() {
                    let key_row = contiguous(key.slice(s![c, key_index, ..]))?;
                    q.mul_add_vec(contiguous_mut(acc.row_mut(r))?, operand, key_row);
                }
            }
        }

        Ok(products)
    }

    /// Divide the products by the special modulus, rounding the special row
    /// to its centered representative, and add them to the buffer.
    fn mod_down(
        &self,
        writer: &mut InPlaceBufferWriter<'_>,
        products: &Array3<u64>,
        factors: &[u64],
    ) -> Result<()> {
        let n = self.par.coeff_count();
        let d = self.par.decomp_modulus_size();
        let special = self.moduli.special();
        let special_op = &self.ops[self.par.special_index()];
        let half = special.value() >> 1;

        let mut last = vec![0u64; n];
        let mut correction = vec![0u64; n];
        let mut delta = vec![0u64; n];
        for (c, component) in products.outer_iter().enumerate() {
            last.copy_from_slice(contiguous(component.row(d))?);
            special_op.backward(&mut last);
            special.add_scalar_vec(&mut last, half);

            for (i, (qi, op, factor)) in
                izip!(self.moduli.iter(), self.ops.iter(), factors.iter()).enumerate()
            {
                correction.copy_from_slice(&last);
                if special.value() > qi.value() {
                    qi.reduce_vec(&mut correction);
                }
                qi.sub_scalar_vec(&mut correction, self.moduli.reduce(i, u128::from(half)));
                op.forward(&mut correction);

                delta.copy_from_slice(contiguous(component.row(i))?);
                qi.sub_vec(&mut delta, &correction);
                qi.scalar_mul_vec(&mut delta, self.moduli.reduce(i, u128::from(*factor)));
                writer.add_to_row(c, i, &delta, qi)?;
            }
        }

        Ok(())
    }
}

/// Switch the key of the target tier, from flat inputs.
///
/// `key_vectors` holds one vector per decomposition modulus, each of
/// `key_component_count * key_modulus_size * coeff_count` residues, and
/// `mod_switch_factors` holds the inverse of the special modulus modulo each
/// decomposition modulus. `target_tier` holds
/// `decomp_modulus_size * coeff_count` residues, one polynomial per
/// decomposition modulus, whatever the number of key components. See
/// [`SwitchKeyKernel::switch_key`] for the layout of the buffer.
#[expect(
    clippy::too_many_arguments,
    reason = "flat interface over caller-owned buffers"
)]
pub fn switch_key(
    buffer: &mut [u64],
    target_tier: &[u64],
    coeff_count: usize,
    decomp_modulus_size: usize,
    key_modulus_size: usize,
    rns_modulus_size: usize,
    key_component_count: usize,
    moduli: &[u64],
    key_vectors: &[&[u64]],
    mod_switch_factors: &[u64],
) -> Result<()> {
    let par = SwitchKeyParametersBuilder::new()
        .set_coeff_count(coeff_count)
        .set_decomp_modulus_size(decomp_modulus_size)
        .set_key_modulus_size(key_modulus_size)
        .set_rns_modulus_size(rns_modulus_size)
        .set_key_component_count(key_component_count)
        .build()?;
    let kernel = SwitchKeyKernel::new(&par, ModulusTable::new(moduli)?)?;
    let key_vectors = key_vectors
        .iter()
        .map(|v| shaped(v, key_component_count, key_modulus_size, coeff_count))
        .collect::<Result<Vec<_>>>()?;
    kernel.switch_key_views(buffer, target_tier, &key_vectors, mod_switch_factors)
}
