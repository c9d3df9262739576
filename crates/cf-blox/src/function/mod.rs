//! Interior/exterior spatial functions.
//!
//! A spatial function classifies a physical point as [`Classification::Inside`]
//! (value 0) or [`Classification::Outside`] (value 1) of a region. Two regions
//! are provided, both anchored on boundary-point attributes:
//!
//! - [`SphereFunction`] - a closed ball around a center
//! - [`ConicShellFunction`] - a distance annulus restricted to a cone along a
//!   gradient direction
//!
//! [`SpatialPredicate`] wraps either one when callers need to store or pass
//! them uniformly.
//!
//! # Example
//!
//! ```
//! use cf_blox::{Classification, SpatialFunction, SpatialPredicate, SphereFunction};
//! use nalgebra::Point3;
//!
//! let sphere = SphereFunction::new(Point3::origin(), 2.0).unwrap();
//! let predicate = SpatialPredicate::from(sphere);
//!
//! assert_eq!(predicate.evaluate(&Point3::new(0.0, 2.0, 0.0)), Classification::Inside);
//! assert_eq!(predicate.evaluate(&Point3::new(0.0, 2.1, 0.0)).value(), 1);
//! ```

mod conic_shell;
mod sphere;

pub use conic_shell::ConicShellFunction;
pub use sphere::SphereFunction;

use std::fmt;

use nalgebra::Point;

/// Result of evaluating a spatial function at a point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Classification {
    /// The point is inside the region or on its boundary.
    Inside,
    /// The point is outside the region.
    Outside,
}

impl Classification {
    /// Maps a membership test result to a classification.
    #[must_use]
    pub const fn from_inside(inside: bool) -> Self {
        if inside { Self::Inside } else { Self::Outside }
    }

    /// Returns the numeric form: 0 for inside, 1 for outside.
    #[must_use]
    pub const fn value(self) -> u8 {
        match self {
            Self::Inside => 0,
            Self::Outside => 1,
        }
    }

    /// Returns `true` for [`Classification::Inside`].
    #[must_use]
    pub const fn is_inside(self) -> bool {
        matches!(self, Self::Inside)
    }
}

impl From<Classification> for u8 {
    fn from(classification: Classification) -> Self {
        classification.value()
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inside => f.write_str("inside"),
            Self::Outside => f.write_str("outside"),
        }
    }
}

/// A region in `D`-dimensional physical space that can classify points.
///
/// Evaluation is pure, so a configured function can be shared across threads.
pub trait SpatialFunction<const D: usize>: Send + Sync {
    /// Classifies a physical point against the region.
    fn evaluate(&self, point: &Point<f64, D>) -> Classification;

    /// Returns `true` if the point is inside the region.
    fn is_inside(&self, point: &Point<f64, D>) -> bool {
        self.evaluate(point).is_inside()
    }
}

/// The closed set of spatial functions provided by this crate.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SpatialPredicate<const D: usize> {
    /// A closed ball.
    Sphere(SphereFunction<D>),
    /// A directional annulus sector.
    ConicShell(ConicShellFunction<D>),
}

impl<const D: usize> SpatialFunction<D> for SpatialPredicate<D> {
    fn evaluate(&self, point: &Point<f64, D>) -> Classification {
        match self {
            Self::Sphere(sphere) => sphere.evaluate(point),
            Self::ConicShell(shell) => shell.evaluate(point),
        }
    }
}

impl<const D: usize> From<SphereFunction<D>> for SpatialPredicate<D> {
    fn from(sphere: SphereFunction<D>) -> Self {
        Self::Sphere(sphere)
    }
}

impl<const D: usize> From<ConicShellFunction<D>> for SpatialPredicate<D> {
    fn from(shell: ConicShellFunction<D>) -> Self {
        Self::ConicShell(shell)
    }
}
