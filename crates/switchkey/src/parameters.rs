//! Dimension parameters of the key-switching kernel.

use crate::layout::BufferLayout;
use crate::{Error, ParametersError, Result};
use std::sync::Arc;

/// Dimensions of a key-switching invocation.
///
/// A set of parameters describes `key_modulus_size` moduli, the first
/// `decomp_modulus_size` of which index the decomposition slots and the last
/// of which is the special modulus removed by the modulus switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchKeyParameters {
    /// Number of coefficients in a polynomial.
    coeff_count: usize,

    /// Number of decomposition moduli.
    decomp_modulus_size: usize,

    /// Number of moduli in the key basis, special modulus included.
    key_modulus_size: usize,

    /// Number of key components, i.e. of output polynomials.
    key_component_count: usize,
}

impl SwitchKeyParameters {
    /// Returns the number of coefficients in a polynomial.
    #[must_use]
    pub const fn coeff_count(&self) -> usize {
        self.coeff_count
    }

    /// Returns the number of decomposition moduli.
    #[must_use]
    pub const fn decomp_modulus_size(&self) -> usize {
        self.decomp_modulus_size
    }

    /// Returns the number of moduli in the key basis.
    #[must_use]
    pub const fn key_modulus_size(&self) -> usize {
        self.key_modulus_size
    }

    /// Returns the number of output moduli. It always equals the number of
    /// key moduli.
    #[must_use]
    pub const fn rns_modulus_size(&self) -> usize {
        self.key_modulus_size
    }

    /// Returns the number of key components.
    #[must_use]
    pub const fn key_component_count(&self) -> usize {
        self.key_component_count
    }

    /// Returns the index of the special modulus in the key basis.
    #[must_use]
    pub const fn special_index(&self) -> usize {
        self.key_modulus_size - 1
    }

    /// Returns the expected length of each key vector.
    #[must_use]
    pub const fn key_vector_len(&self) -> usize {
        self.key_component_count * self.key_modulus_size * self.coeff_count
    }

    /// Returns the expected length of the target tier.
    #[must_use]
    pub const fn target_tier_len(&self) -> usize {
        self.decomp_modulus_size * self.coeff_count
    }

    /// Returns the layout of the buffer updated by the kernel.
    #[must_use]
    pub const fn layout(&self) -> BufferLayout {
        BufferLayout::new(
            self.coeff_count,
            self.decomp_modulus_size,
            self.key_component_count,
        )
    }
}

/// Builder for the parameters of the key-switching kernel.
#[derive(Debug)]
pub struct SwitchKeyParametersBuilder {
    coeff_count: usize,
    decomp_modulus_size: usize,
    key_modulus_size: usize,
    rns_modulus_size: Option<usize>,
    key_component_count: usize,
}

impl SwitchKeyParametersBuilder {
    /// Creates a new instance of the builder
    #[expect(
        clippy::new_without_default,
        reason = "builder requires explicit configuration"
    )]
    #[must_use]
    pub fn new() -> Self {
        Self {
            coeff_count: Default::default(),
            decomp_modulus_size: Default::default(),
            key_modulus_size: Default::default(),
            rns_modulus_size: None,
            key_component_count: 2,
        }
    }

    /// Sets the number of coefficients. Building fails if it is not a power
    /// of two larger or equal to 8.
    pub fn set_coeff_count(&mut self, coeff_count: usize) -> &mut Self {
        self.coeff_count = coeff_count;
        self
    }

    /// Sets the number of decomposition moduli.
    pub fn set_decomp_modulus_size(&mut self, decomp_modulus_size: usize) -> &mut Self {
        self.decomp_modulus_size = decomp_modulus_size;
        self
    }

    /// Sets the number of key moduli, special modulus included.
    pub fn set_key_modulus_size(&mut self, key_modulus_size: usize) -> &mut Self {
        self.key_modulus_size = key_modulus_size;
        self
    }

    /// Sets the number of output moduli. Defaults to the number of key
    /// moduli, and building fails if they differ.
    pub fn set_rns_modulus_size(&mut self, rns_modulus_size: usize) -> &mut Self {
        self.rns_modulus_size = Some(rns_modulus_size);
        self
    }

    /// Sets the number of key components. Defaults to 2.
    pub fn set_key_component_count(&mut self, key_component_count: usize) -> &mut Self {
        self.key_component_count = key_component_count;
        self
    }

    /// Build a new `SwitchKeyParameters` inside an `Arc`.
    pub fn build_arc(&self) -> Result<Arc<SwitchKeyParameters>> {
        self.build().map(Arc::new)
    }

    /// Build a new `SwitchKeyParameters`.
    pub fn build(&self) -> Result<SwitchKeyParameters> {
        if self.coeff_count < 8 || !self.coeff_count.is_power_of_two() {
            return Err(Error::ParametersError(ParametersError::InvalidDegree(
                self.coeff_count,
            )));
        }

        if self.key_component_count == 0 {
            return Err(Error::ParametersError(
                ParametersError::InvalidComponentCount(self.key_component_count),
            ));
        }

        let rns_modulus_size = self.rns_modulus_size.unwrap_or(self.key_modulus_size);
        if rns_modulus_size != self.key_modulus_size {
            return Err(Error::ParametersError(
                ParametersError::ModulusCountMismatch(rns_modulus_size, self.key_modulus_size),
            ));
        }

        // The special modulus sits after the decomposition moduli.
        if self.decomp_modulus_size == 0 || self.decomp_modulus_size >= self.key_modulus_size {
            return Err(Error::ParametersError(
                ParametersError::InvalidDecompositionSize(
                    self.decomp_modulus_size,
                    self.key_modulus_size.saturating_sub(1),
                ),
            ));
        }

        Ok(SwitchKeyParameters {
            coeff_count: self.coeff_count,
            decomp_modulus_size: self.decomp_modulus_size,
            key_modulus_size: self.key_modulus_size,
            key_component_count: self.key_component_count,
        })
    }
}
