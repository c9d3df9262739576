//! Gradient sources that boundary-point extraction reads from.
//!
//! The extractor only needs a geometry and a gradient per voxel, captured by
//! [`GradientSource`]. Two sources are provided:
//!
//! - [`GradientImage`] - a vector image holding a precomputed gradient field
//! - [`ScalarImage`] - an intensity image differentiated on demand with central
//!   differences in physical units
//!
//! # Example
//!
//! ```
//! use cf_blox::{GradientSource, ImageGeometry, ScalarImage};
//! use nalgebra::Vector2;
//!
//! let geometry = ImageGeometry::with_size([5, 1]).unwrap();
//! let ramp = ScalarImage::from_fn(geometry, |index| 3.0 * index[0] as f64);
//!
//! assert_eq!(ramp.gradient(&[2, 0]), Some(Vector2::new(3.0, 0.0)));
//! ```

use nalgebra::SVector;
use rayon::prelude::*;

use crate::error::{BloxError, BloxResult};
use crate::geometry::{ImageGeometry, VoxelIndex};

/// Anything that can report a gradient vector for each voxel of its geometry.
///
/// Implementations return `None` for voxels where no valid gradient exists;
/// the extractor treats those voxels as below threshold.
pub trait GradientSource<const D: usize>: Sync {
    /// Returns the geometry of the source image.
    fn geometry(&self) -> &ImageGeometry<D>;

    /// Returns the gradient at a voxel, or `None` if it is undefined there.
    fn gradient(&self, index: &VoxelIndex<D>) -> Option<SVector<f64, D>>;
}

fn check_len<const D: usize>(geometry: &ImageGeometry<D>, actual: usize) -> BloxResult<()> {
    if geometry.voxel_count() == actual {
        Ok(())
    } else {
        Err(BloxError::SizeMismatch {
            expected: geometry.voxel_count(),
            actual,
        })
    }
}

fn all_finite<const D: usize>(v: &SVector<f64, D>) -> bool {
    v.iter().all(|c| c.is_finite())
}

/// A vector image holding one gradient per voxel.
#[derive(Debug, Clone, PartialEq)]
pub struct GradientImage<const D: usize> {
    geometry: ImageGeometry<D>,
    data: Vec<SVector<f64, D>>,
}

impl<const D: usize> GradientImage<D> {
    /// Wraps a buffer of gradients laid out in storage order.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::SizeMismatch`] if `data` does not hold exactly one
    /// gradient per voxel.
    pub fn from_vec(geometry: ImageGeometry<D>, data: Vec<SVector<f64, D>>) -> BloxResult<Self> {
        check_len(&geometry, data.len())?;
        Ok(Self { geometry, data })
    }

    /// Builds a gradient image by evaluating `f` at every voxel index.
    pub fn from_fn<F>(geometry: ImageGeometry<D>, mut f: F) -> Self
    where
        F: FnMut(&VoxelIndex<D>) -> SVector<f64, D>,
    {
        let data = geometry.indices().map(|index| f(&index)).collect();
        Self { geometry, data }
    }

    /// Returns the stored gradient at an index without validating it.
    #[must_use]
    pub fn get(&self, index: &VoxelIndex<D>) -> Option<&SVector<f64, D>> {
        self.geometry
            .linear_offset(index)
            .and_then(|offset| self.data.get(offset))
    }

    /// Returns the raw gradient buffer in storage order.
    #[must_use]
    pub fn data(&self) -> &[SVector<f64, D>] {
        &self.data
    }
}

impl<const D: usize> GradientSource<D> for GradientImage<D> {
    fn geometry(&self) -> &ImageGeometry<D> {
        &self.geometry
    }

    fn gradient(&self, index: &VoxelIndex<D>) -> Option<SVector<f64, D>> {
        self.get(index).copied().filter(all_finite)
    }
}

/// A scalar intensity image.
///
/// Its gradient is a central difference divided by the physical distance
/// between the two samples. At the borders the neighbour index is clamped,
/// which degrades to a one-sided difference; an axis of extent 1 contributes
/// a zero component.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarImage<const D: usize> {
    geometry: ImageGeometry<D>,
    data: Vec<f64>,
}

impl<const D: usize> ScalarImage<D> {
    /// Wraps a buffer of intensities laid out in storage order.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::SizeMismatch`] if `data` does not hold exactly one
    /// value per voxel.
    pub fn from_vec(geometry: ImageGeometry<D>, data: Vec<f64>) -> BloxResult<Self> {
        check_len(&geometry, data.len())?;
        Ok(Self { geometry, data })
    }

    /// Builds an image by evaluating `f` at every voxel index.
    pub fn from_fn<F>(geometry: ImageGeometry<D>, mut f: F) -> Self
    where
        F: FnMut(&VoxelIndex<D>) -> f64,
    {
        let data = geometry.indices().map(|index| f(&index)).collect();
        Self { geometry, data }
    }

    /// Returns the intensity at an index, or `None` if it is out of bounds.
    #[must_use]
    pub fn value(&self, index: &VoxelIndex<D>) -> Option<f64> {
        self.geometry
            .linear_offset(index)
            .and_then(|offset| self.data.get(offset))
            .copied()
    }

    /// Returns the raw intensity buffer in storage order.
    #[must_use]
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Computes the full gradient field in parallel.
    ///
    /// Voxels without a valid gradient are filled with NaN components, which
    /// [`GradientImage`] reports as undefined.
    #[must_use]
    pub fn gradient_image(&self) -> GradientImage<D> {
        let data = (0..self.geometry.voxel_count())
            .into_par_iter()
            .map(|offset| {
                let index = self.geometry.unravel(offset);
                self.central_difference(&index)
                    .unwrap_or_else(|| SVector::repeat(f64::NAN))
            })
            .collect();

        GradientImage {
            geometry: self.geometry.clone(),
            data,
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn central_difference(&self, index: &VoxelIndex<D>) -> Option<SVector<f64, D>> {
        if !self.value(index)?.is_finite() {
            return None;
        }

        let size = self.geometry.size();
        let spacing = self.geometry.spacing();
        let mut gradient = SVector::<f64, D>::zeros();

        for axis in 0..D {
            let extent = size[axis];
            if extent < 2 {
                continue;
            }
            let lo = index[axis].saturating_sub(1);
            let hi = (index[axis] + 1).min(extent - 1);

            let mut lo_index = *index;
            lo_index[axis] = lo;
            let mut hi_index = *index;
            hi_index[axis] = hi;

            let rise = self.value(&hi_index)? - self.value(&lo_index)?;
            gradient[axis] = rise / ((hi - lo) as f64 * spacing[axis]);
        }

        all_finite(&gradient).then_some(gradient)
    }
}

impl<const D: usize> GradientSource<D> for ScalarImage<D> {
    fn geometry(&self) -> &ImageGeometry<D> {
        &self.geometry
    }

    fn gradient(&self, index: &VoxelIndex<D>) -> Option<SVector<f64, D>> {
        self.central_difference(index)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp, clippy::cast_precision_loss)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Vector2, Vector3};

    #[test]
    fn test_gradient_image_size_mismatch() {
        let geometry = ImageGeometry::<2>::with_size([2, 2]).unwrap();
        let result = GradientImage::from_vec(geometry, vec![Vector2::zeros(); 3]);
        assert!(matches!(
            result,
            Err(BloxError::SizeMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_gradient_image_lookup() {
        let geometry = ImageGeometry::<2>::with_size([3, 2]).unwrap();
        let image = GradientImage::from_fn(geometry, |index| {
            Vector2::new(index[0] as f64, index[1] as f64)
        });
        assert_eq!(image.gradient(&[2, 1]), Some(Vector2::new(2.0, 1.0)));
        assert_eq!(image.gradient(&[3, 0]), None);
        assert_eq!(image.data().len(), 6);
    }

    #[test]
    fn test_gradient_image_rejects_non_finite() {
        let geometry = ImageGeometry::<2>::with_size([2, 1]).unwrap();
        let image = GradientImage::from_vec(
            geometry,
            vec![Vector2::new(f64::NAN, 0.0), Vector2::new(1.0, 0.0)],
        )
        .unwrap();
        assert_eq!(image.gradient(&[0, 0]), None);
        assert!(image.gradient(&[1, 0]).is_some());
    }

    #[test]
    fn test_scalar_size_mismatch() {
        let geometry = ImageGeometry::<3>::with_size([2, 2, 2]).unwrap();
        let result = ScalarImage::from_vec(geometry, vec![0.0; 9]);
        assert!(matches!(result, Err(BloxError::SizeMismatch { .. })));
    }

    #[test]
    fn test_scalar_linear_ramp_is_exact() {
        let geometry =
            ImageGeometry::new([6, 5], Point2::new(1.0, -3.0), Vector2::new(0.5, 2.0)).unwrap();
        // f(x, y) = 2x - 3y in physical coordinates
        let g = geometry.clone();
        let image = ScalarImage::from_fn(geometry, |index| {
            let p = g.index_to_physical(index);
            2.0f64.mul_add(p.x, -3.0 * p.y)
        });

        for index in image.geometry().indices() {
            let gradient = image.gradient(&index).unwrap();
            assert_relative_eq!(gradient.x, 2.0, epsilon = 1e-9);
            assert_relative_eq!(gradient.y, -3.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_scalar_degenerate_axis_contributes_zero() {
        let geometry = ImageGeometry::<3>::with_size([4, 1, 1]).unwrap();
        let image = ScalarImage::from_fn(geometry, |index| index[0] as f64);
        assert_eq!(image.gradient(&[1, 0, 0]), Some(Vector3::new(1.0, 0.0, 0.0)));
    }

    #[test]
    fn test_scalar_nan_neighbour_yields_none() {
        let geometry = ImageGeometry::<2>::with_size([3, 1]).unwrap();
        let image = ScalarImage::from_vec(geometry, vec![0.0, 1.0, f64::NAN]).unwrap();
        assert_eq!(image.gradient(&[1, 0]), None);
        assert_eq!(image.gradient(&[2, 0]), None);
        assert_eq!(image.gradient(&[0, 0]), Some(Vector2::new(1.0, 0.0)));
    }

    #[test]
    fn test_gradient_image_matches_on_demand() {
        let geometry = ImageGeometry::<2>::with_size([5, 4]).unwrap();
        let image = ScalarImage::from_fn(geometry, |index| {
            let x = index[0] as f64;
            let y = index[1] as f64;
            x * x + y
        });
        let field = image.gradient_image();
        for index in image.geometry().indices() {
            assert_eq!(field.gradient(&index), image.gradient(&index));
        }
    }
}
