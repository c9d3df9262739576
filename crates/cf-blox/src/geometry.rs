//! Image geometry: extent, origin and spacing in `D` dimensions.
//!
//! Voxel `i` sits at the physical location `origin + i ⊙ spacing`, so physical
//! coordinates name voxel centres. Linear storage runs with the first axis
//! varying fastest.

use nalgebra::{Point, SVector};

use crate::error::{BloxError, BloxResult};

/// A discrete voxel index, one component per image axis.
pub type VoxelIndex<const D: usize> = [usize; D];

/// Extent, origin and spacing shared by a source image and its blox grid.
///
/// # Example
///
/// ```
/// use cf_blox::ImageGeometry;
/// use nalgebra::{Point2, Vector2};
///
/// let geometry = ImageGeometry::new(
///     [4, 3],
///     Point2::new(10.0, 20.0),
///     Vector2::new(0.5, 2.0),
/// )
/// .unwrap();
///
/// assert_eq!(geometry.voxel_count(), 12);
/// assert_eq!(geometry.index_to_physical(&[2, 1]), Point2::new(11.0, 22.0));
/// assert_eq!(geometry.physical_to_index(&Point2::new(11.1, 21.9)), Some([2, 1]));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ImageGeometry<const D: usize> {
    size: [usize; D],
    origin: Point<f64, D>,
    spacing: SVector<f64, D>,
    voxel_count: usize,
}

impl<const D: usize> ImageGeometry<D> {
    /// Creates a geometry from an extent, an origin and per-axis spacing.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if any spacing component is not
    /// positive and finite, if the origin is not finite, or if the voxel count
    /// overflows `usize`.
    pub fn new(
        size: [usize; D],
        origin: Point<f64, D>,
        spacing: SVector<f64, D>,
    ) -> BloxResult<Self> {
        if let Some(bad) = spacing.iter().find(|s| !(s.is_finite() && **s > 0.0)) {
            return Err(BloxError::InvalidConfiguration(format!(
                "spacing must be positive and finite, got {bad}"
            )));
        }
        if origin.iter().any(|c| !c.is_finite()) {
            return Err(BloxError::InvalidConfiguration(
                "origin must be finite".to_string(),
            ));
        }
        let voxel_count = size
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n))
            .ok_or_else(|| {
                BloxError::InvalidConfiguration(format!("voxel count of {size:?} overflows"))
            })?;

        Ok(Self {
            size,
            origin,
            spacing,
            voxel_count,
        })
    }

    /// Creates a geometry with the origin at zero and unit spacing.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if the voxel count overflows.
    pub fn with_size(size: [usize; D]) -> BloxResult<Self> {
        Self::new(size, Point::origin(), SVector::repeat(1.0))
    }

    /// Returns the number of voxels along each axis.
    #[must_use]
    pub const fn size(&self) -> &[usize; D] {
        &self.size
    }

    /// Returns the physical location of voxel `[0; D]`.
    #[must_use]
    pub const fn origin(&self) -> &Point<f64, D> {
        &self.origin
    }

    /// Returns the physical distance between neighbouring voxels along each axis.
    #[must_use]
    pub const fn spacing(&self) -> &SVector<f64, D> {
        &self.spacing
    }

    /// Returns the total number of voxels.
    #[must_use]
    pub const fn voxel_count(&self) -> usize {
        self.voxel_count
    }

    /// Returns `true` if the index lies within the extent on every axis.
    #[must_use]
    pub fn contains(&self, index: &VoxelIndex<D>) -> bool {
        index.iter().zip(&self.size).all(|(i, n)| i < n)
    }

    /// Converts a voxel index to its offset in linear storage.
    ///
    /// Returns `None` if the index is out of bounds.
    #[must_use]
    pub fn linear_offset(&self, index: &VoxelIndex<D>) -> Option<usize> {
        if !self.contains(index) {
            return None;
        }
        let mut offset = 0;
        let mut stride = 1;
        for (i, n) in index.iter().zip(&self.size) {
            offset += i * stride;
            stride *= n;
        }
        Some(offset)
    }

    /// Converts a linear storage offset back to a voxel index.
    ///
    /// Returns `None` if the offset is past the last voxel.
    #[must_use]
    pub fn index_of(&self, offset: usize) -> Option<VoxelIndex<D>> {
        (offset < self.voxel_count).then(|| self.unravel(offset))
    }

    /// Unchecked variant of [`Self::index_of`] for offsets known to be in range.
    pub(crate) fn unravel(&self, mut offset: usize) -> VoxelIndex<D> {
        let mut index = [0; D];
        for (slot, &n) in index.iter_mut().zip(&self.size) {
            if n == 0 {
                break;
            }
            *slot = offset % n;
            offset /= n;
        }
        index
    }

    /// Iterates over every voxel index in storage order.
    pub fn indices(&self) -> impl Iterator<Item = VoxelIndex<D>> + '_ {
        (0..self.voxel_count).map(|offset| self.unravel(offset))
    }

    /// Returns the physical location of a voxel.
    ///
    /// The index is not bounds-checked; locations outside the extent are
    /// extrapolated along the same lattice.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn index_to_physical(&self, index: &VoxelIndex<D>) -> Point<f64, D> {
        let mut point = self.origin;
        for axis in 0..D {
            point[axis] = (index[axis] as f64).mul_add(self.spacing[axis], self.origin[axis]);
        }
        point
    }

    /// Returns the continuous (fractional) index of a physical point.
    #[must_use]
    pub fn continuous_index(&self, point: &Point<f64, D>) -> SVector<f64, D> {
        (point - self.origin).component_div(&self.spacing)
    }

    /// Maps a physical point to the nearest voxel index.
    ///
    /// Returns `None` if the point rounds to a voxel outside the extent.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn physical_to_index(&self, point: &Point<f64, D>) -> Option<VoxelIndex<D>> {
        let continuous = self.continuous_index(point);
        let mut index = [0; D];
        for axis in 0..D {
            let rounded = continuous[axis].round();
            // NaN fails both comparisons and lands here too
            if !(rounded >= 0.0 && rounded < self.size[axis] as f64) {
                return None;
            }
            index[axis] = rounded as usize;
        }
        Some(index)
    }
}
