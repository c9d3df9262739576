//! Boundary-point extraction.
//!
//! One pass walks every voxel of a [`GradientSource`], thresholds the gradient
//! magnitude and stores a [`BoundaryPoint`] in the matching bucket of a
//! [`BoundaryPointGrid`]. Each voxel only touches its own bucket, so the pass
//! runs in parallel over disjoint buckets without locking.
//!
//! Re-running a pass replaces bucket contents; points never accumulate across
//! passes.

use rayon::prelude::*;
use tracing::{debug, info};

use crate::boundary::{BoundaryBucket, BoundaryPoint};
use crate::error::{BloxError, BloxResult};
use crate::geometry::ImageGeometry;
use crate::grid::BoundaryPointGrid;
use crate::norm::stable_norm;
use crate::source::GradientSource;

/// Parameters for boundary-point extraction.
///
/// # Example
///
/// ```
/// use cf_blox::ExtractionParams;
///
/// let params = ExtractionParams::default().threshold(12.5).parallel(false);
/// assert!((params.threshold - 12.5).abs() < 1e-10);
/// assert!(!params.parallel);
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractionParams {
    /// Minimum gradient magnitude; voxels must strictly exceed it.
    pub threshold: f64,

    /// Whether to sweep voxels in parallel (via rayon).
    pub parallel: bool,
}

impl Default for ExtractionParams {
    fn default() -> Self {
        Self {
            threshold: 0.0,
            parallel: true,
        }
    }
}

impl ExtractionParams {
    /// Create params with a custom threshold.
    #[must_use]
    pub const fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            parallel: true,
        }
    }

    /// Set the threshold.
    #[must_use]
    pub const fn threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Enable or disable the parallel sweep.
    #[must_use]
    pub const fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    fn validate(&self) -> BloxResult<()> {
        validate_threshold(self.threshold)
    }
}

fn validate_threshold(threshold: f64) -> BloxResult<()> {
    if threshold.is_finite() && threshold >= 0.0 {
        Ok(())
    } else {
        Err(BloxError::InvalidConfiguration(format!(
            "threshold must be finite and non-negative, got {threshold}"
        )))
    }
}

/// Counts from one extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExtractionSummary {
    /// Number of voxels visited.
    pub voxels_scanned: usize,
    /// Number of boundary points stored.
    pub boundary_points: usize,
    /// Number of voxels skipped because the source had no valid gradient there.
    pub voxels_rejected: usize,
}

/// Outcome of examining a single voxel.
enum VoxelOutcome {
    Below,
    Boundary,
    Rejected,
}

/// Finds boundary points in a gradient source and stores them in a blox grid.
///
/// The extractor borrows its source for as long as it is attached and owns
/// the grid it fills. The workflow is:
///
/// 1. [`set_source_image`](Self::set_source_image)
/// 2. [`update_source_parameters`](Self::update_source_parameters) to capture
///    the source geometry and allocate the grid
/// 3. [`set_threshold`](Self::set_threshold)
/// 4. [`find_boundary_points`](Self::find_boundary_points)
///
/// # Example
///
/// ```
/// use cf_blox::{BoundaryPointExtractor, GradientImage, ImageGeometry};
/// use nalgebra::Vector2;
///
/// let geometry = ImageGeometry::with_size([5, 5]).unwrap();
/// let image = GradientImage::from_fn(geometry, |index| {
///     if index[0] == 2 { Vector2::new(4.0, 0.0) } else { Vector2::zeros() }
/// });
///
/// let mut extractor = BoundaryPointExtractor::<2>::new();
/// extractor.set_source_image(&image);
/// extractor.update_source_parameters().unwrap();
/// extractor.set_threshold(1.0).unwrap();
///
/// let summary = extractor.find_boundary_points().unwrap();
/// assert_eq!(summary.boundary_points, 5);
/// assert_eq!(extractor.grid().bucket(&[2, 3]).unwrap().len(), 1);
/// ```
pub struct BoundaryPointExtractor<'a, const D: usize> {
    source: Option<&'a dyn GradientSource<D>>,
    source_geometry: Option<ImageGeometry<D>>,
    params: ExtractionParams,
    grid: BoundaryPointGrid<D>,
}

impl<const D: usize> Default for BoundaryPointExtractor<'_, D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> std::fmt::Debug for BoundaryPointExtractor<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryPointExtractor")
            .field("has_source", &self.source.is_some())
            .field("source_geometry", &self.source_geometry)
            .field("params", &self.params)
            .field("points", &self.grid.point_count())
            .finish()
    }
}

impl<'a, const D: usize> BoundaryPointExtractor<'a, D> {
    /// Creates an extractor with default parameters and no source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: None,
            source_geometry: None,
            params: ExtractionParams::default(),
            grid: BoundaryPointGrid::new(),
        }
    }

    /// Creates an extractor with the given parameters.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if the threshold is negative or not finite.
    pub fn with_params(params: ExtractionParams) -> BloxResult<Self> {
        params.validate()?;
        Ok(Self {
            params,
            ..Self::new()
        })
    }

    /// Attaches the image to read gradients from.
    ///
    /// The source geometry is not captured until
    /// [`update_source_parameters`](Self::update_source_parameters) is called.
    pub fn set_source_image(&mut self, source: &'a dyn GradientSource<D>) {
        self.source = Some(source);
    }

    /// Captures the source geometry and allocates the grid to match it.
    ///
    /// Any points from a previous pass are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::NoSourceImage`] if no source is attached.
    pub fn update_source_parameters(&mut self) -> BloxResult<()> {
        let source = self.source.ok_or(BloxError::NoSourceImage)?;
        let geometry = source.geometry().clone();
        debug!(
            voxels = geometry.voxel_count(),
            size = ?geometry.size(),
            "Captured source parameters"
        );
        self.grid.allocate(geometry.clone());
        self.source_geometry = Some(geometry);
        Ok(())
    }

    /// Sets the minimum gradient magnitude for a boundary point.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::InvalidConfiguration`] if the threshold is negative
    /// or not finite. The previous threshold is kept on error.
    pub fn set_threshold(&mut self, threshold: f64) -> BloxResult<()> {
        validate_threshold(threshold)?;
        self.params.threshold = threshold;
        Ok(())
    }

    /// Returns the current threshold.
    #[must_use]
    pub const fn threshold(&self) -> f64 {
        self.params.threshold
    }

    /// Enables or disables the parallel sweep.
    pub fn set_parallel(&mut self, parallel: bool) {
        self.params.parallel = parallel;
    }

    /// Returns the current parameters.
    #[must_use]
    pub const fn params(&self) -> &ExtractionParams {
        &self.params
    }

    /// Returns the grid filled by the last pass.
    #[must_use]
    pub const fn grid(&self) -> &BoundaryPointGrid<D> {
        &self.grid
    }

    /// Returns the grid for modification.
    #[must_use]
    pub fn grid_mut(&mut self) -> &mut BoundaryPointGrid<D> {
        &mut self.grid
    }

    /// Consumes the extractor, returning its grid.
    #[must_use]
    pub fn into_grid(self) -> BoundaryPointGrid<D> {
        self.grid
    }

    /// Walks the source, storing a boundary point in every voxel whose gradient
    /// magnitude exceeds the threshold.
    ///
    /// Every bucket is cleared before it is refilled. Voxels without a valid
    /// gradient are counted as rejected and left empty.
    ///
    /// # Errors
    ///
    /// - [`BloxError::NoSourceImage`] if no source is attached.
    /// - [`BloxError::StaleParameters`] if source parameters were never captured,
    ///   or the attached source's geometry differs from the captured one.
    pub fn find_boundary_points(&mut self) -> BloxResult<ExtractionSummary> {
        let source = self.source.ok_or(BloxError::NoSourceImage)?;
        let captured = self.source_geometry.as_ref().ok_or_else(|| {
            BloxError::StaleParameters("source parameters were never captured".to_string())
        })?;
        if captured != source.geometry() {
            return Err(BloxError::StaleParameters(
                "source geometry changed since parameters were captured".to_string(),
            ));
        }
        self.grid.ensure_geometry(captured)?;

        let threshold = self.params.threshold;
        let parallel = self.params.parallel;
        info!(
            voxels = captured.voxel_count(),
            threshold, parallel, "Starting boundary point extraction"
        );

        let visit = |(offset, bucket): (usize, &mut BoundaryBucket<D>)| {
            bucket.clear();
            let index = captured.unravel(offset);
            let Some(gradient) = source.gradient(&index) else {
                return VoxelOutcome::Rejected;
            };
            if !gradient.iter().all(|c| c.is_finite()) {
                return VoxelOutcome::Rejected;
            }
            if stable_norm(&gradient) > threshold {
                let location = captured.index_to_physical(&index);
                bucket.push(BoundaryPoint::new(location, gradient));
                VoxelOutcome::Boundary
            } else {
                VoxelOutcome::Below
            }
        };

        let buckets = self.grid.buckets_mut();
        let outcomes: Vec<VoxelOutcome> = if parallel {
            buckets.par_iter_mut().enumerate().map(visit).collect()
        } else {
            buckets.iter_mut().enumerate().map(visit).collect()
        };

        let mut summary = ExtractionSummary {
            voxels_scanned: outcomes.len(),
            ..ExtractionSummary::default()
        };
        for outcome in &outcomes {
            match outcome {
                VoxelOutcome::Boundary => summary.boundary_points += 1,
                VoxelOutcome::Rejected => summary.voxels_rejected += 1,
                VoxelOutcome::Below => {}
            }
        }

        info!(
            boundary_points = summary.boundary_points,
            rejected = summary.voxels_rejected,
            "Boundary point extraction complete"
        );
        Ok(summary)
    }
}
