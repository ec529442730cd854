//! Bounding boxes and rigid poses using glam types
//!
//! The spatial index speaks parry's `Aabb`; everything else in the crate uses the
//! glam-based [`Aabb`] defined here and converts at the index boundary.

use glam::{Mat3, Quat, Vec3};
use rapier3d::parry::bounding_volume::Aabb as ParryAabb;

/// Axis-Aligned Bounding Box using glam types
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max corners
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// An inverted box that any `expand_to_include` call will overwrite
    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::MAX),
            max: Vec3::splat(f32::MIN),
        }
    }

    /// Smallest box containing every point
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut aabb = Self::empty();
        for point in points {
            aabb.expand_to_include(point);
        }
        aabb
    }

    /// Build a box from two arbitrary corners, sorting each component
    ///
    /// Used after a component-wise multiply by a possibly negative scale, which
    /// can swap min and max on that axis.
    pub fn from_corners(a: Vec3, b: Vec3) -> Self {
        Self {
            min: a.min(b),
            max: a.max(b),
        }
    }

    /// Test intersection with another AABB
    ///
    /// # Returns
    /// `true` if the AABBs overlap (including touching at edges/faces)
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Calculate the center point of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Expand the AABB to include a point
    pub fn expand_to_include(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    /// Create an AABB that encompasses both AABBs
    pub fn union(&self, other: &Aabb) -> Aabb {
        Aabb {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Grow the box by `margin` on every side
    pub fn loosened(&self, margin: f32) -> Aabb {
        Aabb {
            min: self.min - Vec3::splat(margin),
            max: self.max + Vec3::splat(margin),
        }
    }

    /// Shift the box by `offset`
    pub fn translated(&self, offset: Vec3) -> Aabb {
        Aabb {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    /// World-axis-aligned bound of this box after rotation
    ///
    /// Computes a tight AABB around the rotated box (OBB → AABB transformation).
    pub fn rotated(&self, rotation: Quat) -> Aabb {
        let basis = Mat3::from_quat(rotation);
        let center = basis * self.center();
        let half = (self.max - self.min) * 0.5;
        let extent = basis.x_axis.abs() * half.x
            + basis.y_axis.abs() * half.y
            + basis.z_axis.abs() * half.z;
        Aabb {
            min: center - extent,
            max: center + extent,
        }
    }

    pub(crate) fn to_parry(self) -> ParryAabb {
        ParryAabb::new(self.min.to_array().into(), self.max.to_array().into())
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Vec3::ZERO)
    }
}

/// Position and orientation of a shape in world space
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Transform a point from this pose's local frame into world space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_from_corners_sorts_components() {
        let aabb = Aabb::from_corners(Vec3::new(1.0, -2.0, 3.0), Vec3::new(-1.0, 2.0, -3.0));
        assert_eq!(aabb.min, Vec3::new(-1.0, -2.0, -3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_intersects_touching() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let c = Aabb::new(Vec3::new(1.1, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
    }

    #[test]
    fn test_rotated_quarter_turn() {
        let aabb = Aabb::new(Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0));
        let rotated = aabb.rotated(Quat::from_rotation_z(FRAC_PI_2));

        assert!((rotated.min - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5);
        assert!((rotated.max - Vec3::new(0.0, 2.0, 1.0)).length() < 1e-5);
    }

    #[test]
    fn test_from_points_and_loosened() {
        let aabb = Aabb::from_points([Vec3::new(1.0, 2.0, 3.0), Vec3::new(-1.0, 0.0, 5.0)]);
        assert_eq!(aabb.min, Vec3::new(-1.0, 0.0, 3.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 2.0, 5.0));

        let loose = aabb.loosened(0.5);
        assert_eq!(loose.min, Vec3::new(-1.5, -0.5, 2.5));
        assert_eq!(loose.max, Vec3::new(1.5, 2.5, 5.5));
    }

    #[test]
    fn test_pose_transform_point() {
        let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(FRAC_PI_2));
        // A quarter turn about Y takes +X to -Z
        let world = pose.transform_point(Vec3::X);
        assert!((world - Vec3::new(1.0, 2.0, 2.0)).length() < 1e-5);
    }
}
