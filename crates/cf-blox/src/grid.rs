//! The blox grid: one bucket of boundary points per source voxel.

use nalgebra::Point;

use crate::boundary::{BoundaryBucket, BoundaryPoint};
use crate::error::{BloxError, BloxResult};
use crate::function::SpatialFunction;
use crate::geometry::{ImageGeometry, VoxelIndex};

/// An n-dimensional grid of [`BoundaryBucket`]s sharing a source image's geometry.
///
/// The grid starts unallocated. [`BoundaryPointGrid::allocate`] gives it an
/// extent, origin and spacing, and every lookup after that is bounds-checked.
/// Physical points map to the voxel whose centre is nearest.
///
/// # Example
///
/// ```
/// use cf_blox::{BoundaryPoint, BoundaryPointGrid, ImageGeometry};
/// use nalgebra::{Point2, Vector2};
///
/// let geometry = ImageGeometry::new([8, 8], Point2::origin(), Vector2::new(0.5, 0.5)).unwrap();
/// let mut grid = BoundaryPointGrid::new();
/// grid.allocate(geometry);
///
/// grid.insert(BoundaryPoint::new(Point2::new(1.0, 1.5), Vector2::new(1.0, 0.0))).unwrap();
///
/// assert_eq!(grid.map_physical_to_index(&Point2::new(1.1, 1.4)).unwrap(), [2, 3]);
/// assert_eq!(grid.bucket(&[2, 3]).unwrap().len(), 1);
/// assert_eq!(grid.point_count(), 1);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BoundaryPointGrid<const D: usize> {
    geometry: Option<ImageGeometry<D>>,
    buckets: Vec<BoundaryBucket<D>>,
}

impl<const D: usize> Default for BoundaryPointGrid<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const D: usize> BoundaryPointGrid<D> {
    /// Creates an unallocated grid.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            geometry: None,
            buckets: Vec::new(),
        }
    }

    /// Creates a grid already allocated to `geometry`.
    #[must_use]
    pub fn with_geometry(geometry: ImageGeometry<D>) -> Self {
        let mut grid = Self::new();
        grid.allocate(geometry);
        grid
    }

    /// Resizes the grid to `geometry` and empties every bucket.
    pub fn allocate(&mut self, geometry: ImageGeometry<D>) {
        self.buckets.clear();
        self.buckets
            .resize_with(geometry.voxel_count(), BoundaryBucket::new);
        self.geometry = Some(geometry);
    }

    /// Returns `true` once [`Self::allocate`] has been called.
    #[must_use]
    pub const fn is_allocated(&self) -> bool {
        self.geometry.is_some()
    }

    /// Returns the grid geometry, if allocated.
    #[must_use]
    pub const fn geometry(&self) -> Option<&ImageGeometry<D>> {
        self.geometry.as_ref()
    }

    fn allocated_geometry(&self) -> BloxResult<&ImageGeometry<D>> {
        self.geometry.as_ref().ok_or(BloxError::NotAllocated)
    }

    /// Checks that the grid was allocated for exactly `geometry`.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::StaleParameters`] if the grid is unallocated or its
    /// extent, origin or spacing differ.
    pub fn ensure_geometry(&self, geometry: &ImageGeometry<D>) -> BloxResult<()> {
        match &self.geometry {
            Some(current) if current == geometry => Ok(()),
            Some(current) => Err(BloxError::StaleParameters(format!(
                "grid was allocated for {current:?}, source is now {geometry:?}"
            ))),
            None => Err(BloxError::StaleParameters(
                "source parameters were never captured".to_string(),
            )),
        }
    }

    /// Maps a physical point to the index of the voxel containing it.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::NotAllocated`] before allocation and
    /// [`BloxError::OutOfBounds`] if the point lies outside the extent.
    pub fn map_physical_to_index(&self, point: &Point<f64, D>) -> BloxResult<VoxelIndex<D>> {
        self.allocated_geometry()?
            .physical_to_index(point)
            .ok_or_else(|| BloxError::OutOfBounds {
                point: point.iter().copied().collect(),
            })
    }

    fn offset(&self, index: &VoxelIndex<D>) -> BloxResult<usize> {
        self.allocated_geometry()?
            .linear_offset(index)
            .ok_or_else(|| BloxError::IndexOutOfBounds {
                index: index.to_vec(),
            })
    }

    /// Returns the bucket at a voxel index.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::NotAllocated`] before allocation and
    /// [`BloxError::IndexOutOfBounds`] for an index outside the extent.
    pub fn bucket(&self, index: &VoxelIndex<D>) -> BloxResult<&BoundaryBucket<D>> {
        let offset = self.offset(index)?;
        Ok(&self.buckets[offset])
    }

    /// Returns the bucket at a voxel index for modification.
    ///
    /// # Errors
    ///
    /// Same as [`Self::bucket`].
    pub fn bucket_mut(&mut self, index: &VoxelIndex<D>) -> BloxResult<&mut BoundaryBucket<D>> {
        let offset = self.offset(index)?;
        Ok(&mut self.buckets[offset])
    }

    /// Returns the bucket of the voxel containing a physical point.
    ///
    /// # Errors
    ///
    /// Same as [`Self::map_physical_to_index`].
    pub fn bucket_at(&self, point: &Point<f64, D>) -> BloxResult<&BoundaryBucket<D>> {
        let index = self.map_physical_to_index(point)?;
        self.bucket(&index)
    }

    /// Appends a boundary point to the bucket of the voxel containing its location.
    ///
    /// # Errors
    ///
    /// Returns [`BloxError::NotAllocated`] before allocation and
    /// [`BloxError::OutOfBounds`] if the location lies outside the extent.
    pub fn insert(&mut self, point: BoundaryPoint<D>) -> BloxResult<VoxelIndex<D>> {
        let index = self.map_physical_to_index(point.location())?;
        self.bucket_mut(&index)?.push(point);
        Ok(index)
    }

    /// Empties every bucket, keeping the geometry.
    pub fn clear(&mut self) {
        self.buckets.iter_mut().for_each(BoundaryBucket::clear);
    }

    /// Returns the total number of stored boundary points.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.buckets.iter().map(BoundaryBucket::len).sum()
    }

    /// Returns `true` if no bucket holds a point.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(BoundaryBucket::is_empty)
    }

    /// Returns every bucket in storage order.
    #[must_use]
    pub fn buckets(&self) -> &[BoundaryBucket<D>] {
        &self.buckets
    }

    pub(crate) fn buckets_mut(&mut self) -> &mut [BoundaryBucket<D>] {
        &mut self.buckets
    }

    /// Iterates over the non-empty buckets together with their indices.
    pub fn occupied_buckets(
        &self,
    ) -> impl Iterator<Item = (VoxelIndex<D>, &BoundaryBucket<D>)> + '_ {
        self.geometry.iter().flat_map(move |geometry| {
            self.buckets
                .iter()
                .enumerate()
                .filter(|(_, bucket)| !bucket.is_empty())
                .map(move |(offset, bucket)| (geometry.unravel(offset), bucket))
        })
    }

    /// Iterates over every stored boundary point.
    pub fn points(&self) -> impl Iterator<Item = &BoundaryPoint<D>> + '_ {
        self.buckets.iter().flat_map(BoundaryBucket::iter)
    }

    /// Collects the stored boundary points whose location `function` classifies as inside.
    ///
    /// # Example
    ///
    /// ```
    /// use cf_blox::{BoundaryPoint, BoundaryPointGrid, ImageGeometry, SphereFunction};
    /// use nalgebra::{Point2, Vector2};
    ///
    /// let mut grid = BoundaryPointGrid::with_geometry(ImageGeometry::with_size([10, 10]).unwrap());
    /// grid.insert(BoundaryPoint::new(Point2::new(2.0, 2.0), Vector2::x())).unwrap();
    /// grid.insert(BoundaryPoint::new(Point2::new(8.0, 8.0), Vector2::x())).unwrap();
    ///
    /// let sphere = SphereFunction::new(Point2::new(1.0, 1.0), 2.0).unwrap();
    /// let found = grid.points_inside(&sphere);
    /// assert_eq!(found.len(), 1);
    /// assert_eq!(found[0].location(), &Point2::new(2.0, 2.0));
    /// ```
    #[must_use]
    pub fn points_inside<F>(&self, function: &F) -> Vec<&BoundaryPoint<D>>
    where
        F: SpatialFunction<D> + ?Sized,
    {
        self.points()
            .filter(|point| function.is_inside(point.location()))
            .collect()
    }
}
