//! Modulus-switch correction factors.

use crate::{moduli::ModulusTable, Error, ParametersError, Result};

/// One correction factor per decomposition slot.
///
/// For the i-th decomposition modulus q_i and the special modulus q_s, the
/// factor is the inverse of q_s modulo q_i.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModSwitchFactorTable {
    factors: Box<[u64]>,
}

impl ModSwitchFactorTable {
    /// Create a table from precomputed factors.
    pub fn new(factors: &[u64]) -> Result<Self> {
        if factors.is_empty() {
            return Err(Error::DefaultError(
                "The list of mod-switch factors is empty".to_string(),
            ));
        }
        Ok(Self {
            factors: factors.into(),
        })
    }

    /// Derive the factors of the first `decomp_modulus_size` moduli from the
    /// special modulus of the table.
    pub fn from_moduli(moduli: &ModulusTable, decomp_modulus_size: usize) -> Result<Self> {
        if decomp_modulus_size == 0 || decomp_modulus_size >= moduli.len() {
            return Err(Error::ParametersError(
                ParametersError::InvalidDecompositionSize(decomp_modulus_size, moduli.len() - 1),
            ));
        }

        let special = moduli.special().value();
        let factors = moduli
            .iter()
            .take(decomp_modulus_size)
            .map(|qi| {
                qi.inv(qi.reduce(special)).ok_or_else(|| {
                    Error::DefaultError(format!(
                        "Modulus {special} is not invertible modulo {}",
                        qi.value()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            factors: factors.into_boxed_slice(),
        })
    }

    /// Returns the factor of a decomposition slot.
    #[must_use]
    pub fn get(&self, slot: usize) -> Option<u64> {
        self.factors.get(slot).copied()
    }

    /// Returns the number of factors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.factors.len()
    }

    /// Returns whether the table is empty; a constructed table never is.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.factors.is_empty()
    }

    /// Returns the factors.
    #[must_use]
    pub fn as_slice(&self) -> &[u64] {
        &self.factors
    }
}
