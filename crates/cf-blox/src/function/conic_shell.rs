//! Conic shell interior/exterior function.
//!
//! The conic shell is the search region used to look for a second boundary
//! point facing a first one. Around the first point's location it keeps the
//! points whose distance lies in `[distance_min, distance_max]` and whose
//! direction is within an angular tolerance of the gradient line. The angular
//! test takes the dot product of the unit gradient with the unit offset to the
//! candidate and compares it against `1 - epsilon`. `polarity` picks which half
//! of the gradient line is searched: `true` looks along the gradient, `false`
//! against it.

use nalgebra::{Point, SVector, Unit};

use super::{Classification, SpatialFunction};
use crate::boundary::BoundaryPoint;
use crate::error::{BloxError, BloxResult};
use crate::norm::unit_direction;

/// Slack on the distance and angle comparisons so points exactly on the
/// shell's surfaces survive floating-point rounding.
const TOLERANCE: f64 = 1e-12;

/// Default inner radius of the shell.
const DEFAULT_DISTANCE_MIN: f64 = 10.0;
/// Default outer radius of the shell.
const DEFAULT_DISTANCE_MAX: f64 = 50.0;
/// Default angular tolerance.
const DEFAULT_EPSILON: f64 = 1e-2;

/// A distance annulus restricted to a cone around a gradient direction.
///
/// The gradient is stored normalized, so only its direction affects
/// evaluation. The origin itself is always outside because no direction is
/// defined there.
///
/// # Example
///
/// ```
/// use cf_blox::{Classification, ConicShellFunction, SpatialFunction};
/// use nalgebra::{Point2, Vector2};
///
/// let mut shell = ConicShellFunction::new(Point2::origin(), Vector2::new(0.0, 3.0)).unwrap();
/// shell.set_distance_range(1.0, 4.0).unwrap();
/// shell.set_epsilon(0.1).unwrap();
///
/// assert_eq!(shell.evaluate(&Point2::new(0.0, 2.0)), Classification::Inside);
/// // Too close, too far, and off-axis
/// assert_eq!(shell.evaluate(&Point2::new(0.0, 0.5)), Classification::Outside);
/// assert_eq!(shell.evaluate(&Point2::new(0.0, 5.0)), Classification::Outside);
/// assert_eq!(shell.evaluate(&Point2::new(2.0, 2.0)), Classification::Outside);
///
/// // Flip polarity to search against the gradient
/// shell.set_polarity(false);
/// assert_eq!(shell.evaluate(&Point2::new(0.0, -2.0)), Classification::Inside);
/// assert_eq!(shell.evaluate(&Point2::new(0.0, 2.0)), Classification::Outside);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "ConicShellParts<D>")
)]
pub struct ConicShellFunction<const D: usize> {
    origin: Point<f64, D>,
    direction: Unit<SVector<f64, D>>,
    distance_min: f64,
    distance_max: f64,
    epsilon: f64,
    polarity: bool,
}

/// Unvalidated wire form of [`ConicShellFunction`].
#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct ConicShellParts<const D: usize> {
    origin: Point<f64, D>,
    direction: SVector<f64, D>,
    distance_min: f64,
    distance_max: f64,
    epsilon: f64,
    polarity: bool,
}

#[cfg(feature = "serde")]
impl<const D: usize> TryFrom<ConicShellParts<D>> for ConicShellFunction<D> {
    type Error = BloxError;

    fn try_from(parts: ConicShellParts<D>) -> BloxResult<Self> {
        let mut shell = Self::new(parts.origin, parts.direction)?;
        shell.set_distance_range(parts.distance_min, parts.distance_max)?;
        shell.set_epsilon(parts.epsilon)?;
        shell.set_polarity(parts.polarity);
        Ok(shell)
    }
}

impl<const D: usize> ConicShellFunction<D> {
    /// Creates a shell at `origin` oriented along `origin_gradient`.
    ///
    /// Distances default to `[10, 50]`, epsilon to `0.01`, and polarity to
    /// `true` (search along the gradient).
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if the gradient is zero or not finite.
    pub fn new(origin: Point<f64, D>, origin_gradient: SVector<f64, D>) -> BloxResult<Self> {
        Ok(Self {
            origin,
            direction: normalize_gradient(origin_gradient)?,
            distance_min: DEFAULT_DISTANCE_MIN,
            distance_max: DEFAULT_DISTANCE_MAX,
            epsilon: DEFAULT_EPSILON,
            polarity: true,
        })
    }

    /// Creates a shell anchored at a boundary point's location and gradient.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if the point's gradient is zero.
    pub fn from_boundary_point(point: &BoundaryPoint<D>) -> BloxResult<Self> {
        Self::new(*point.location(), *point.gradient())
    }

    /// Returns the apex of the shell.
    #[must_use]
    pub const fn origin(&self) -> &Point<f64, D> {
        &self.origin
    }

    /// Returns the unit gradient direction at the origin.
    #[must_use]
    pub const fn origin_gradient(&self) -> &Unit<SVector<f64, D>> {
        &self.direction
    }

    /// Returns the inner radius.
    #[must_use]
    pub const fn distance_min(&self) -> f64 {
        self.distance_min
    }

    /// Returns the outer radius.
    #[must_use]
    pub const fn distance_max(&self) -> f64 {
        self.distance_max
    }

    /// Returns the angular tolerance.
    #[must_use]
    pub const fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Returns `true` if the shell opens along the gradient, `false` if against it.
    #[must_use]
    pub const fn polarity(&self) -> bool {
        self.polarity
    }

    /// Moves the apex of the shell.
    pub fn set_origin(&mut self, origin: Point<f64, D>) {
        self.origin = origin;
    }

    /// Re-orients the shell. Only the direction of `gradient` is kept.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if the gradient is zero or not finite.
    pub fn set_origin_gradient(&mut self, gradient: SVector<f64, D>) -> BloxResult<()> {
        self.direction = normalize_gradient(gradient)?;
        Ok(())
    }

    /// Sets both radii at once.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] unless
    /// `0 <= min <= max` and both are finite.
    pub fn set_distance_range(&mut self, min: f64, max: f64) -> BloxResult<()> {
        validate_distance("distance_min", min)?;
        validate_distance("distance_max", max)?;
        if min > max {
            return Err(BloxError::InvalidConfiguration(format!(
                "distance_min ({min}) exceeds distance_max ({max})"
            )));
        }
        self.distance_min = min;
        self.distance_max = max;
        Ok(())
    }

    /// Sets the inner radius, keeping the current outer radius.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if `min` is negative, not
    /// finite, or greater than the current `distance_max`.
    pub fn set_distance_min(&mut self, min: f64) -> BloxResult<()> {
        self.set_distance_range(min, self.distance_max)
    }

    /// Sets the outer radius, keeping the current inner radius.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if `max` is not finite or is
    /// less than the current `distance_min`.
    pub fn set_distance_max(&mut self, max: f64) -> BloxResult<()> {
        self.set_distance_range(self.distance_min, max)
    }

    /// Sets the angular tolerance.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if `epsilon` is outside `[0, 1]`.
    pub fn set_epsilon(&mut self, epsilon: f64) -> BloxResult<()> {
        if !(0.0..=1.0).contains(&epsilon) {
            return Err(BloxError::InvalidConfiguration(format!(
                "epsilon must lie in [0, 1], got {epsilon}"
            )));
        }
        self.epsilon = epsilon;
        Ok(())
    }

    /// Chooses the half of the gradient line to search.
    pub fn set_polarity(&mut self, polarity: bool) {
        self.polarity = polarity;
    }
}

impl<const D: usize> SpatialFunction<D> for ConicShellFunction<D> {
    fn evaluate(&self, point: &Point<f64, D>) -> Classification {
        let offset = point - self.origin;
        if offset.iter().any(|c| c.is_nan()) {
            return Classification::Outside;
        }
        let scale = offset.amax();
        if scale <= 0.0 || scale.is_infinite() {
            return Classification::Outside;
        }

        // Work on the offset scaled to a unit largest component
        let reduced = offset / scale;
        let reduced_norm = reduced.norm();
        let dist = reduced_norm * scale;
        if !dist.is_finite() {
            return Classification::Outside;
        }

        let slack = TOLERANCE * dist;
        if dist + slack < self.distance_min || dist - slack > self.distance_max {
            return Classification::Outside;
        }

        let cos_theta = self.direction.dot(&reduced) / reduced_norm;
        let limit = 1.0 - self.epsilon - TOLERANCE;
        let inside = if self.polarity {
            cos_theta >= limit
        } else {
            cos_theta <= -limit
        };
        Classification::from_inside(inside)
    }
}

fn normalize_gradient<const D: usize>(
    gradient: SVector<f64, D>,
) -> BloxResult<Unit<SVector<f64, D>>> {
    if gradient.iter().any(|c| !c.is_finite()) {
        return Err(BloxError::InvalidConfiguration(
            "origin gradient must be finite".to_string(),
        ));
    }
    unit_direction(&gradient).ok_or_else(|| {
        BloxError::InvalidConfiguration("origin gradient must be non-zero".to_string())
    })
}

fn validate_distance(name: &str, value: f64) -> BloxResult<()> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(BloxError::InvalidConfiguration(format!(
            "{name} must be finite and non-negative, got {value}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Point2, Point3, Vector2, Vector3};

    fn shell_3d(polarity: bool, epsilon: f64) -> ConicShellFunction<3> {
        let mut shell =
            ConicShellFunction::new(Point3::new(1.0, 2.0, 3.0), Vector3::new(1.0, 1.0, 0.0))
                .unwrap();
        shell.set_distance_range(2.0, 6.0).unwrap();
        shell.set_epsilon(epsilon).unwrap();
        shell.set_polarity(polarity);
        shell
    }

    #[test]
    fn test_defaults() {
        let shell = ConicShellFunction::new(Point2::origin(), Vector2::new(0.0, 2.0)).unwrap();
        assert_eq!(shell.distance_min(), DEFAULT_DISTANCE_MIN);
        assert_eq!(shell.distance_max(), DEFAULT_DISTANCE_MAX);
        assert_eq!(shell.epsilon(), DEFAULT_EPSILON);
        assert!(shell.polarity());
        assert_eq!(shell.origin_gradient().into_inner(), Vector2::new(0.0, 1.0));
    }

    #[test]
    fn test_along_gradient_inside_for_any_epsilon() {
        for epsilon in [0.0, 1e-6, 0.01, 0.5, 1.0] {
            let shell = shell_3d(true, epsilon);
            let dir = shell.origin_gradient().into_inner();
            for k in [2.0, 2.5, 3.7, 5.0, 6.0] {
                let p = shell.origin() + dir * k;
                assert_eq!(
                    shell.evaluate(&p),
                    Classification::Inside,
                    "k = {k}, epsilon = {epsilon}"
                );
            }
        }
    }

    #[test]
    fn test_negative_polarity_rejects_along_gradient() {
        for epsilon in [0.0, 0.01, 0.5] {
            let shell = shell_3d(false, epsilon);
            let dir = shell.origin_gradient().into_inner();
            for k in [2.0, 4.0, 6.0] {
                assert_eq!(
                    shell.evaluate(&(shell.origin() + dir * k)),
                    Classification::Outside
                );
                assert_eq!(
                    shell.evaluate(&(shell.origin() - dir * k)),
                    Classification::Inside
                );
            }
        }
    }

    #[test]
    fn test_distance_bounds() {
        let shell = shell_3d(true, 0.01);
        let dir = shell.origin_gradient().into_inner();
        assert_eq!(
            shell.evaluate(&(shell.origin() + dir * 1.9)),
            Classification::Outside
        );
        assert_eq!(
            shell.evaluate(&(shell.origin() + dir * 6.1)),
            Classification::Outside
        );
    }

    #[test]
    fn test_angular_tolerance() {
        let mut shell = ConicShellFunction::new(Point2::origin(), Vector2::x()).unwrap();
        shell.set_distance_range(0.0, 100.0).unwrap();

        // 30 degrees off-axis: cos = 0.866
        let p = Point2::new(30f64.to_radians().cos(), 30f64.to_radians().sin()) * 10.0;
        shell.set_epsilon(0.1).unwrap();
        assert_eq!(shell.evaluate(&p), Classification::Outside);
        shell.set_epsilon(0.2).unwrap();
        assert_eq!(shell.evaluate(&p), Classification::Inside);

        // Perpendicular points only pass with epsilon = 1
        let side = Point2::new(0.0, 10.0);
        assert_eq!(shell.evaluate(&side), Classification::Outside);
        shell.set_epsilon(1.0).unwrap();
        assert_eq!(shell.evaluate(&side), Classification::Inside);
    }

    #[test]
    fn test_gradient_scale_invariance() {
        let base = shell_3d(true, 0.05);
        let samples = [
            Point3::new(4.0, 5.0, 3.0),
            Point3::new(4.0, 5.2, 3.1),
            Point3::new(-1.0, 0.0, 3.0),
            Point3::new(1.0, 6.0, 3.0),
            Point3::new(3.0, 4.0, 3.0),
        ];
        for scale in [1e-6, 0.5, 3.0, 1e6] {
            let mut scaled = base;
            scaled
                .set_origin_gradient(Vector3::new(1.0, 1.0, 0.0) * scale)
                .unwrap();
            for p in &samples {
                assert_eq!(scaled.evaluate(p), base.evaluate(p), "scale {scale}");
            }
        }
    }

    #[test]
    fn test_extreme_gradient_scales() {
        let base = shell_3d(true, 0.05);
        for scale in [1e-300, 1e-170, 1e170, 1e300] {
            let mut scaled = base;
            scaled
                .set_origin_gradient(Vector3::new(1.0, 1.0, 0.0) * scale)
                .unwrap();
            assert_eq!(scaled.origin_gradient(), base.origin_gradient(), "scale {scale}");
            assert_relative_eq!(scaled.origin_gradient().norm(), 1.0, epsilon = 1e-12);

            let on_axis = scaled.origin() + scaled.origin_gradient().into_inner() * 4.0;
            assert_eq!(scaled.evaluate(&on_axis), Classification::Inside);
        }
    }

    #[test]
    fn test_extreme_distances() {
        let mut shell = ConicShellFunction::new(Point3::origin(), Vector3::x()).unwrap();

        shell.set_distance_range(1e200, 3e200).unwrap();
        assert!(shell.is_inside(&Point3::new(2e200, 0.0, 0.0)));
        assert!(shell.is_inside(&Point3::new(2e200, 1e199, 0.0)));
        assert!(!shell.is_inside(&Point3::new(2e200, 2e200, 0.0)));
        assert!(!shell.is_inside(&Point3::new(4e200, 0.0, 0.0)));
        assert!(!shell.is_inside(&Point3::new(f64::MAX, f64::MAX, 0.0)));

        shell.set_distance_range(1e-200, 3e-200).unwrap();
        assert!(shell.is_inside(&Point3::new(2e-200, 0.0, 0.0)));
        assert!(!shell.is_inside(&Point3::new(5e-201, 0.0, 0.0)));
        assert!(!shell.is_inside(&Point3::new(-2e-200, 0.0, 0.0)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_round_trip() {
        let shell = shell_3d(false, 0.25);
        let json = serde_json::to_string(&shell).unwrap();
        let back: ConicShellFunction<3> = serde_json::from_str(&json).unwrap();

        assert_eq!(back.origin(), shell.origin());
        assert_relative_eq!(
            back.origin_gradient().into_inner(),
            shell.origin_gradient().into_inner(),
            epsilon = 1e-12
        );
        assert_eq!(back.distance_min(), shell.distance_min());
        assert_eq!(back.distance_max(), shell.distance_max());
        assert_eq!(back.epsilon(), shell.epsilon());
        assert!(!back.polarity());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_serde_rejects_invalid_fields() {
        let valid = serde_json::to_value(shell_3d(true, 0.1)).unwrap();
        let invalid = |field: &str, replacement: serde_json::Value| {
            let mut value = valid.clone();
            value[field] = replacement;
            serde_json::from_value::<ConicShellFunction<3>>(value).is_err()
        };

        assert!(invalid("direction", serde_json::json!([0.0, 0.0, 0.0])));
        assert!(invalid("distance_min", serde_json::json!(60.0)));
        assert!(invalid("distance_max", serde_json::json!(-1.0)));
        assert!(invalid("epsilon", serde_json::json!(5.0)));
        assert!(!invalid("polarity", serde_json::json!(false)));
    }

    #[test]
    fn test_origin_is_outside() {
        let mut shell = shell_3d(true, 1.0);
        shell.set_distance_range(0.0, 6.0).unwrap();
        assert_eq!(shell.evaluate(shell.origin()), Classification::Outside);
    }

    #[test]
    fn test_nan_point_is_outside() {
        let mut shell = shell_3d(true, 1.0);
        shell.set_distance_range(0.0, f64::MAX).unwrap();
        assert_eq!(
            shell.evaluate(&Point3::new(f64::NAN, 0.0, 0.0)),
            Classification::Outside
        );
    }

    #[test]
    fn test_rejects_zero_gradient() {
        assert!(matches!(
            ConicShellFunction::new(Point2::origin(), Vector2::zeros()),
            Err(BloxError::InvalidConfiguration(_))
        ));

        let mut shell = shell_3d(true, 0.1);
        let before = *shell.origin_gradient();
        assert!(shell.set_origin_gradient(Vector3::zeros()).is_err());
        assert!(
            shell
                .set_origin_gradient(Vector3::new(f64::INFINITY, 0.0, 0.0))
                .is_err()
        );
        assert_eq!(*shell.origin_gradient(), before);
    }

    #[test]
    fn test_rejects_bad_distances() {
        let mut shell = shell_3d(true, 0.1);
        assert!(shell.set_distance_range(5.0, 4.0).is_err());
        assert!(shell.set_distance_range(-1.0, 4.0).is_err());
        assert!(shell.set_distance_range(1.0, f64::INFINITY).is_err());
        assert!(shell.set_distance_min(7.0).is_err());
        assert!(shell.set_distance_max(1.0).is_err());
        assert_eq!(shell.distance_min(), 2.0);
        assert_eq!(shell.distance_max(), 6.0);

        shell.set_distance_max(8.0).unwrap();
        shell.set_distance_min(7.0).unwrap();
        assert_eq!(shell.distance_min(), 7.0);
        assert_eq!(shell.distance_max(), 8.0);
    }

    #[test]
    fn test_rejects_bad_epsilon() {
        let mut shell = shell_3d(true, 0.1);
        for epsilon in [-0.1, 1.5, f64::NAN] {
            assert!(shell.set_epsilon(epsilon).is_err());
        }
        assert_eq!(shell.epsilon(), 0.1);
    }

    #[test]
    fn test_from_boundary_point() {
        let bp = BoundaryPoint::new(Point2::new(5.0, 5.0), Vector2::new(-2.0, 0.0));
        let mut shell = ConicShellFunction::from_boundary_point(&bp).unwrap();
        shell.set_distance_range(1.0, 3.0).unwrap();
        assert!(shell.is_inside(&Point2::new(3.0, 5.0)));
        assert!(!shell.is_inside(&Point2::new(7.0, 5.0)));

        let flat = BoundaryPoint::new(Point2::origin(), Vector2::zeros());
        assert!(ConicShellFunction::from_boundary_point(&flat).is_err());
    }
}
