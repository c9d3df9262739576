//! Spherical interior/exterior function.

use nalgebra::Point;

use super::{Classification, SpatialFunction};
use crate::boundary::BoundaryPoint;
use crate::error::{BloxError, BloxResult};
use crate::norm::stable_norm;

/// A closed ball: points at most `radius` from `center` are inside.
///
/// # Example
///
/// ```
/// use cf_blox::{Classification, SpatialFunction, SphereFunction};
/// use nalgebra::Point3;
///
/// let mut sphere = SphereFunction::default();
/// sphere.set_center(Point3::new(1.0, 1.0, 1.0));
/// sphere.set_radius(5.0).unwrap();
///
/// // (4, 5, 1) is exactly 5 away: the surface counts as inside
/// assert_eq!(sphere.evaluate(&Point3::new(4.0, 5.0, 1.0)), Classification::Inside);
/// assert_eq!(sphere.evaluate(&Point3::new(7.0, 1.0, 1.0)), Classification::Outside);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "SphereParts<D>")
)]
pub struct SphereFunction<const D: usize> {
    center: Point<f64, D>,
    radius: f64,
}

/// Unvalidated wire form of [`SphereFunction`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct SphereParts<const D: usize> {
    center: Point<f64, D>,
    radius: f64,
}

#[cfg(feature = "serde")]
impl<const D: usize> TryFrom<SphereParts<D>> for SphereFunction<D> {
    type Error = BloxError;

    fn try_from(parts: SphereParts<D>) -> BloxResult<Self> {
        Self::new(parts.center, parts.radius)
    }
}

impl<const D: usize> Default for SphereFunction<D> {
    /// A unit sphere at the origin.
    fn default() -> Self {
        Self {
            center: Point::origin(),
            radius: 1.0,
        }
    }
}

impl<const D: usize> SphereFunction<D> {
    /// Creates a sphere with the given center and radius.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if `radius` is negative or not finite.
    pub fn new(center: Point<f64, D>, radius: f64) -> BloxResult<Self> {
        let mut sphere = Self {
            center,
            radius: 0.0,
        };
        sphere.set_radius(radius)?;
        Ok(sphere)
    }

    /// Creates a sphere centered on a boundary point's location.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if `radius` is negative or not finite.
    pub fn around(point: &BoundaryPoint<D>, radius: f64) -> BloxResult<Self> {
        Self::new(*point.location(), radius)
    }

    /// Returns the center.
    #[must_use]
    pub const fn center(&self) -> &Point<f64, D> {
        &self.center
    }

    /// Returns the radius.
    #[must_use]
    pub const fn radius(&self) -> f64 {
        self.radius
    }

    /// Moves the sphere.
    pub fn set_center(&mut self, center: Point<f64, D>) {
        self.center = center;
    }

    /// Sets the radius.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if `radius` is negative or not
    /// finite. The previous radius is kept on error.
    pub fn set_radius(&mut self, radius: f64) -> BloxResult<()> {
        if !(radius.is_finite() && radius >= 0.0) {
            return Err(BloxError::InvalidConfiguration(format!(
                "sphere radius must be finite and non-negative, got {radius}"
            )));
        }
        self.radius = radius;
        Ok(())
    }
}

impl<const D: usize> SpatialFunction<D> for SphereFunction<D> {
    fn evaluate(&self, point: &Point<f64, D>) -> Classification {
        let dist = stable_norm(&(point - self.center));
        Classification::from_inside(dist <= self.radius)
    }
}
