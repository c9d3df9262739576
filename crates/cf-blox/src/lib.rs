//! Boundary-point blox grids and interior/exterior spatial functions.
//!
//! This crate provides the building blocks of a medial-axis / core-atom
//! segmentation pipeline over n-dimensional images:
//!
//! - [`BoundaryPointExtractor`] - Thresholds gradient magnitude and records boundary points
//! - [`BoundaryPointGrid`] - One bucket of [`BoundaryPoint`]s per source voxel
//! - [`SphereFunction`] - Closed-ball membership test
//! - [`ConicShellFunction`] - Directional annulus test along a boundary point's gradient
//! - [`GradientImage`] and [`ScalarImage`] - Sources the extractor reads from
//!
//! The image dimension is a const generic `D` carried by nalgebra's
//! [`Point`](nalgebra::Point) and [`SVector`](nalgebra::SVector).
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Coordinate Systems
//!
//! Images have an extent, an origin and per-axis spacing ([`ImageGeometry`]).
//! Voxel `i` lies at `origin + i ⊙ spacing`, so physical coordinates name voxel
//! centres, and a physical point maps to the nearest voxel.
//!
//! # Example
//!
//! ```
//! use cf_blox::{
//!     BoundaryPointExtractor, ConicShellFunction, ImageGeometry, ScalarImage, SpatialFunction,
//! };
//! use nalgebra::{Point2, Vector2};
//!
//! // A bright bar between x = 4 and x = 8 on a dark background
//! let geometry = ImageGeometry::new([16, 8], Point2::origin(), Vector2::new(1.0, 1.0)).unwrap();
//! let image = ScalarImage::from_fn(geometry, |i| if (4..=8).contains(&i[0]) { 100.0 } else { 0.0 });
//!
//! let mut extractor = BoundaryPointExtractor::<2>::new();
//! extractor.set_source_image(&image);
//! extractor.update_source_parameters().unwrap();
//! extractor.set_threshold(10.0).unwrap();
//! extractor.find_boundary_points().unwrap();
//!
//! let grid = extractor.grid();
//! let left = grid.bucket(&[4, 3]).unwrap().first().unwrap();
//!
//! // Look across the bar, along the gradient, for the facing boundary
//! let mut shell = ConicShellFunction::from_boundary_point(left).unwrap();
//! shell.set_distance_range(2.0, 6.0).unwrap();
//! shell.set_epsilon(0.05).unwrap();
//!
//! let partners = grid.points_inside(&shell);
//! assert!(!partners.is_empty());
//! assert!(partners.iter().all(|bp| bp.gradient().x < 0.0));
//! ```
//!
//! # Quality Standards
//!
//! - Zero `unwrap`/`expect` in library code
//! - Configuration errors surface at the setter; evaluation never fails

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod boundary;
mod error;
mod extract;
mod function;
mod geometry;
mod grid;
mod norm;
mod source;

pub use boundary::{BoundaryBucket, BoundaryPoint};
pub use error::{BloxError, BloxResult};
pub use extract::{BoundaryPointExtractor, ExtractionParams, ExtractionSummary};
pub use function::{
    Classification, ConicShellFunction, SpatialFunction, SpatialPredicate, SphereFunction,
};
pub use geometry::{ImageGeometry, VoxelIndex};
pub use grid::BoundaryPointGrid;
pub use source::{GradientImage, GradientSource, ScalarImage};

// Re-export nalgebra types for convenience
pub use nalgebra::{Point, SVector};
