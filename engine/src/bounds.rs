use {
    crate::{
        error::Error,
        scene::{Hierarchy, NodeId, TransformAccess as _},
    },
    nalgebra as na,
};

/// Smallest half-size considered non-degenerate.
pub const MIN_EXTENT: f32 = 1e-3;

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct BoundingVolume {
    pub center: na::Vector3<f32>,

    /// Half sizes along each axis.
    pub extents: na::Vector3<f32>,
}

impl BoundingVolume {
    pub fn new(center: na::Vector3<f32>, extents: na::Vector3<f32>) -> Self {
        BoundingVolume { center, extents }
    }

    pub fn from_min_max(
        min: na::Vector3<f32>,
        max: na::Vector3<f32>,
    ) -> Self {
        BoundingVolume {
            center: (min + max) * 0.5,
            extents: (max - min) * 0.5,
        }
    }

    /// Smallest volume containing all points.
    /// Returns `None` for empty iterator.
    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = na::Vector3<f32>>,
    {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = BoundingVolume::new(first, na::Vector3::zeros());
        for point in points {
            bounds.encapsulate(point);
        }
        Some(bounds)
    }

    pub fn min(&self) -> na::Vector3<f32> {
        self.center - self.extents
    }

    pub fn max(&self) -> na::Vector3<f32> {
        self.center + self.extents
    }

    pub fn size(&self) -> na::Vector3<f32> {
        self.extents * 2.0
    }

    /// Grows the volume to include `point`.
    pub fn encapsulate(&mut self, point: na::Vector3<f32>) {
        let min = self.min().inf(&point);
        let max = self.max().sup(&point);
        *self = BoundingVolume::from_min_max(min, max);
    }

    /// Largest half-size. Non-finite extents count as zero.
    pub fn largest_extent(&self) -> f32 {
        self.extents
            .iter()
            .map(|e| e.abs())
            .filter(|e| e.is_finite())
            .fold(0.0, f32::max)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.largest_extent() > MIN_EXTENT)
            || !self.center.iter().all(|c| c.is_finite())
    }

    /// Returns `self` unless it is too small or invalid to frame.
    pub fn non_degenerate(self) -> Result<Self, Error> {
        if self.is_degenerate() {
            Err(Error::DegenerateBounds)
        } else {
            Ok(self)
        }
    }
}

/// Computes bounding volumes of scene targets.
pub trait BoundsProvider {
    type Target;

    fn bounds(&self, target: Self::Target) -> BoundingVolume;
}

/// Bounds over the joint positions of a subtree.
/// Good enough to frame skeletons when no geometry is available.
impl BoundsProvider for Hierarchy {
    type Target = NodeId;

    fn bounds(&self, target: NodeId) -> BoundingVolume {
        let points = self
            .subtree(target)
            .into_iter()
            .map(|node| self.world_position(node));

        BoundingVolume::from_points(points).unwrap_or_else(|| {
            BoundingVolume::new(na::Vector3::zeros(), na::Vector3::zeros())
        })
    }
}
