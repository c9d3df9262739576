//! Boundary points and the per-voxel buckets that hold them.

use nalgebra::{Point, SVector, Unit};
use smallvec::SmallVec;

use crate::norm::{stable_norm, unit_direction};

/// A location whose gradient magnitude passed the detection threshold.
///
/// Boundary points are created during a detection pass and never mutated
/// afterwards; the bucket that stores one owns it.
///
/// # Example
///
/// ```
/// use cf_blox::BoundaryPoint;
/// use nalgebra::{Point2, Vector2};
///
/// let bp = BoundaryPoint::new(Point2::new(1.0, 2.0), Vector2::new(3.0, 4.0));
/// assert!((bp.gradient_magnitude() - 5.0).abs() < 1e-12);
///
/// let dir = bp.direction().unwrap();
/// assert!((dir.into_inner() - Vector2::new(0.6, 0.8)).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryPoint<const D: usize> {
    location: Point<f64, D>,
    gradient: SVector<f64, D>,
}

impl<const D: usize> BoundaryPoint<D> {
    /// Creates a boundary point from a physical location and its un-normalized gradient.
    #[must_use]
    pub const fn new(location: Point<f64, D>, gradient: SVector<f64, D>) -> Self {
        Self { location, gradient }
    }

    /// Returns the physical location.
    #[must_use]
    pub const fn location(&self) -> &Point<f64, D> {
        &self.location
    }

    /// Returns the gradient as it was measured.
    #[must_use]
    pub const fn gradient(&self) -> &SVector<f64, D> {
        &self.gradient
    }

    /// Returns the Euclidean norm of the gradient.
    #[must_use]
    pub fn gradient_magnitude(&self) -> f64 {
        stable_norm(&self.gradient)
    }

    /// Returns the unit gradient direction, or `None` for a zero or non-finite gradient.
    #[must_use]
    pub fn direction(&self) -> Option<Unit<SVector<f64, D>>> {
        unit_direction(&self.gradient)
    }
}

/// The boundary points stored in one voxel of a blox grid.
///
/// Usually empty or holding a single point, but any number is allowed. A
/// single point is stored inline without a heap allocation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BoundaryBucket<const D: usize> {
    points: SmallVec<[BoundaryPoint<D>; 1]>,
}

impl<const D: usize> BoundaryBucket<D> {
    /// Creates an empty bucket.
    #[must_use]
    pub fn new() -> Self {
        Self {
            points: SmallVec::new(),
        }
    }

    /// Appends a boundary point.
    pub fn push(&mut self, point: BoundaryPoint<D>) {
        self.points.push(point);
    }

    /// Removes every point from the bucket.
    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Returns the number of stored points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the bucket holds no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Returns the first stored point, if any.
    #[must_use]
    pub fn first(&self) -> Option<&BoundaryPoint<D>> {
        self.points.first()
    }

    /// Iterates over the stored points.
    pub fn iter(&self) -> std::slice::Iter<'_, BoundaryPoint<D>> {
        self.points.iter()
    }

    /// Returns the stored points as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[BoundaryPoint<D>] {
        self.points.as_slice()
    }
}

impl<'a, const D: usize> IntoIterator for &'a BoundaryBucket<D> {
    type Item = &'a BoundaryPoint<D>;
    type IntoIter = std::slice::Iter<'a, BoundaryPoint<D>>;

    fn into_iter(self) -> Self::IntoIter {
        self.points.iter()
    }
}

impl<const D: usize> Extend<BoundaryPoint<D>> for BoundaryBucket<D> {
    fn extend<I: IntoIterator<Item = BoundaryPoint<D>>>(&mut self, iter: I) {
        self.points.extend(iter);
    }
}
