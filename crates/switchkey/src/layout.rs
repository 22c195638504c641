//! Layout of the buffer updated in place by the kernel.
//!
//! The buffer starts with the switched region, ordered by component, then by
//! decomposition modulus, then by coefficient. The target tier follows,
//! copied verbatim.

use crate::{Error, Result};
use ndarray::{s, ArrayView1, ArrayView3, ArrayViewMut1, ArrayViewMut3};
use switchkey_math::zq::Modulus;

/// Dimensions and offsets of the in-place buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferLayout {
    coeff_count: usize,
    decomp_modulus_size: usize,
    key_component_count: usize,
}

impl BufferLayout {
    /// Create a layout.
    #[must_use]
    pub const fn new(
        coeff_count: usize,
        decomp_modulus_size: usize,
        key_component_count: usize,
    ) -> Self {
        Self {
            coeff_count,
            decomp_modulus_size,
            key_component_count,
        }
    }

    /// Returns the number of residues in the switched region.
    #[must_use]
    pub const fn switched_len(&self) -> usize {
        self.key_component_count * self.decomp_modulus_size * self.coeff_count
    }

    /// Returns the number of residues in the tail region.
    #[must_use]
    pub const fn tail_len(&self) -> usize {
        self.decomp_modulus_size * self.coeff_count
    }

    /// Returns the total length of the buffer.
    #[must_use]
    pub const fn buffer_len(&self) -> usize {
        self.switched_len() + self.tail_len()
    }

    /// Returns the offset of coefficient k of component c under the i-th
    /// decomposition modulus.
    #[must_use]
    pub const fn offset(&self, c: usize, i: usize, k: usize) -> usize {
        debug_assert!(c < self.key_component_count);
        debug_assert!(i < self.decomp_modulus_size);
        debug_assert!(k < self.coeff_count);
        (c * self.decomp_modulus_size + i) * self.coeff_count + k
    }

    /// Split a buffer into a view of the switched region and the tail.
    pub fn split<'a>(&self, buffer: &'a [u64]) -> Result<(ArrayView3<'a, u64>, &'a [u64])> {
        if buffer.len() != self.buffer_len() {
            return Err(Error::mismatch("buffer", buffer.len(), self.buffer_len()));
        }
        let (switched, tail) = buffer.split_at(self.switched_len());
        let switched = ArrayView3::from_shape(self.shape(), switched)
            .map_err(|e| Error::DefaultError(e.to_string()))?;
        Ok((switched, tail))
    }

    const fn shape(&self) -> (usize, usize, usize) {
        (
            self.key_component_count,
            self.decomp_modulus_size,
            self.coeff_count,
        )
    }
}

/// Writer over a caller-owned buffer.
///
/// The switched region is only ever accumulated into, and the tail is only
/// ever overwritten by the target tier.
#[derive(Debug)]
pub struct InPlaceBufferWriter<'a> {
    layout: BufferLayout,
    switched: ArrayViewMut3<'a, u64>,
    tail: &'a mut [u64],
}

impl<'a> InPlaceBufferWriter<'a> {
    /// Create a writer; the buffer must have the length of the layout.
    pub fn new(layout: BufferLayout, buffer: &'a mut [u64]) -> Result<Self> {
        if buffer.len() != layout.buffer_len() {
            return Err(Error::mismatch("buffer", buffer.len(), layout.buffer_len()));
        }
        let (switched, tail) = buffer.split_at_mut(layout.switched_len());
        let switched = ArrayViewMut3::from_shape(layout.shape(), switched)
            .map_err(|e| Error::DefaultError(e.to_string()))?;
        Ok(Self {
            layout,
            switched,
            tail,
        })
    }

    /// Returns the layout of the buffer.
    #[must_use]
    pub const fn layout(&self) -> &BufferLayout {
        &self.layout
    }

    /// Returns a view of the switched region.
    #[must_use]
    pub fn switched(&self) -> ArrayView3<'_, u64> {
        self.switched.view()
    }

    /// Returns the tail region.
    #[must_use]
    pub fn tail(&self) -> &[u64] {
        &self.tail[..]
    }

    /// Add `delta` modulo q to the residues of component c under the i-th
    /// decomposition modulus.
    pub fn add_to_row(&mut self, c: usize, i: usize, delta: &[u64], q: &Modulus) -> Result<()> {
        let (components, decomp, n) = self.layout.shape();
        if c >= components || i >= decomp {
            return Err(Error::DefaultError(format!(
                "Row ({c}, {i}) is outside of the switched region"
            )));
        }
        if delta.len() != n {
            return Err(Error::mismatch("row", delta.len(), n));
        }
        let row = contiguous_mut(self.switched.slice_mut(s![c, i, ..]))?;
        q.add_vec(row, delta);
        Ok(())
    }

    /// Overwrite the tail with the target tier.
    pub fn write_tail(&mut self, target_tier: &[u64]) -> Result<()> {
        if target_tier.len() != self.tail.len() {
            return Err(Error::mismatch(
                "target tier",
                target_tier.len(),
                self.tail.len(),
            ));
        }
        self.tail.copy_from_slice(target_tier);
        Ok(())
    }
}

/// Returns the residues of a lane as a slice.
pub(crate) fn contiguous<'a>(view: ArrayView1<'a, u64>) -> Result<&'a [u64]> {
    view.to_slice()
        .ok_or_else(|| Error::DefaultError("Residues are not contiguous".to_string()))
}

/// Returns the residues of a mutable lane as a slice.
pub(crate) fn contiguous_mut<'a>(view: ArrayViewMut1<'a, u64>) -> Result<&'a mut [u64]> {
    view.into_slice()
        .ok_or_else(|| Error::DefaultError("Residues are not contiguous".to_string()))
}
