//! Shape kinds and the capabilities the collision pipeline asks of them
//!
//! The set of shapes is closed: two convex primitives, triangle meshes and compounds
//! of any of those. Each kind answers the same capability set:
//!
//! | Capability              | Sphere | Cuboid | Mesh | Compound |
//! |-------------------------|--------|--------|------|----------|
//! | `compute_bounds`        | yes    | yes    | yes  | yes      |
//! | `ray_test`              | yes    | yes    | no   | children |
//! | `find_local_overlaps`   | no     | no     | yes  | yes      |

use crate::collision::{Aabb, Pose};
use crate::error::CollisionError;
use crate::mesh::Mesh;
use glam::{Quat, Vec3};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sphere {
    pub radius: f32,
}

impl Sphere {
    pub fn new(radius: f32) -> Self {
        Self { radius }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Cuboid {
    pub half_extents: Vec3,
}

impl Cuboid {
    pub fn new(half_extents: Vec3) -> Self {
        Self { half_extents }
    }
}

#[derive(Clone, Debug)]
pub struct CompoundChild {
    /// Pose relative to the compound's origin
    pub pose: Pose,
    pub shape: ShapeKind,
}

#[derive(Clone, Debug, Default)]
pub struct Compound {
    children: Vec<CompoundChild>,
}

impl Compound {
    pub fn new(children: Vec<CompoundChild>) -> Self {
        Self { children }
    }

    pub fn children(&self) -> &[CompoundChild] {
        &self.children
    }
}

/// Closest ray intersection
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// Distance along the ray in units of the ray direction's length
    pub t: f32,
    /// World-space surface normal at the hit
    pub normal: Vec3,
}

#[derive(Clone, Debug)]
pub enum ShapeKind {
    Sphere(Sphere),
    Cuboid(Cuboid),
    Mesh(Arc<Mesh>),
    Compound(Arc<Compound>),
}

impl ShapeKind {
    pub fn name(&self) -> &'static str {
        match self {
            ShapeKind::Sphere(_) => "sphere",
            ShapeKind::Cuboid(_) => "cuboid",
            ShapeKind::Mesh(_) => "mesh",
            ShapeKind::Compound(_) => "compound",
        }
    }

    /// World-axis-aligned bound under `orientation`, translation excluded
    pub fn compute_bounds(&self, orientation: Quat) -> Aabb {
        match self {
            ShapeKind::Sphere(sphere) => {
                Aabb::new(Vec3::splat(-sphere.radius), Vec3::splat(sphere.radius))
            }
            ShapeKind::Cuboid(cuboid) => {
                Aabb::new(-cuboid.half_extents, cuboid.half_extents).rotated(orientation)
            }
            ShapeKind::Mesh(mesh) => mesh.compute_bounds(orientation),
            ShapeKind::Compound(compound) => {
                let mut children = compound.children.iter().map(|child| {
                    child
                        .shape
                        .compute_bounds(orientation * child.pose.orientation)
                        .translated(orientation * child.pose.position)
                });
                match children.next() {
                    Some(first) => children.fold(first, |bounds, child| bounds.union(&child)),
                    None => Aabb::default(),
                }
            }
        }
    }

    /// Closest hit of the ray `origin + t * direction` for `t` in `[0, max_t]`
    ///
    /// Meshes do not support ray tests; a compound containing a mesh reports the same
    /// error.
    pub fn ray_test(
        &self,
        pose: &Pose,
        origin: Vec3,
        direction: Vec3,
        max_t: f32,
    ) -> Result<Option<RayHit>, CollisionError> {
        match self {
            ShapeKind::Sphere(sphere) => Ok(ray_sphere(sphere, pose, origin, direction, max_t)),
            ShapeKind::Cuboid(cuboid) => Ok(ray_cuboid(cuboid, pose, origin, direction, max_t)),
            ShapeKind::Mesh(_) => Err(CollisionError::RayTestUnsupported(self.name())),
            ShapeKind::Compound(compound) => {
                let mut closest: Option<RayHit> = None;
                for child in &compound.children {
                    let child_pose = Pose::new(
                        pose.transform_point(child.pose.position),
                        pose.orientation * child.pose.orientation,
                    );
                    let limit = closest.map_or(max_t, |hit| hit.t);
                    if let Some(hit) = child.shape.ray_test(&child_pose, origin, direction, limit)? {
                        closest = Some(hit);
                    }
                }
                Ok(closest)
            }
        }
    }

    /// Append the indices of children whose bounds overlap `[min, max]`
    ///
    /// The query is in the shape's local frame. Only meshes and compounds have
    /// children.
    pub fn find_local_overlaps(
        &self,
        min: Vec3,
        max: Vec3,
        overlaps: &mut Vec<u32>,
    ) -> Result<(), CollisionError> {
        match self {
            ShapeKind::Mesh(mesh) => {
                mesh.find_local_overlaps(min, max, overlaps);
                Ok(())
            }
            ShapeKind::Compound(compound) => {
                let query = Aabb::new(min, max);
                for (index, child) in compound.children.iter().enumerate() {
                    let bounds = child
                        .shape
                        .compute_bounds(child.pose.orientation)
                        .translated(child.pose.position);
                    if bounds.intersects(&query) {
                        overlaps.push(index as u32);
                    }
                }
                Ok(())
            }
            ShapeKind::Sphere(_) | ShapeKind::Cuboid(_) => {
                Err(CollisionError::NotACompound(self.name()))
            }
        }
    }
}

fn ray_sphere(sphere: &Sphere, pose: &Pose, origin: Vec3, direction: Vec3, max_t: f32) -> Option<RayHit> {
    let a = direction.length_squared();
    if a == 0.0 {
        return None;
    }
    let oc = origin - pose.position;
    let b = oc.dot(direction);
    let c = oc.length_squared() - sphere.radius * sphere.radius;
    if c > 0.0 && b > 0.0 {
        return None;
    }
    let discriminant = b * b - a * c;
    if discriminant < 0.0 {
        return None;
    }

    let t = ((-b - discriminant.sqrt()) / a).max(0.0);
    if t > max_t {
        return None;
    }

    let normal = if t == 0.0 {
        -direction.normalize()
    } else {
        (origin + direction * t - pose.position).normalize()
    };
    Some(RayHit { t, normal })
}

fn ray_cuboid(cuboid: &Cuboid, pose: &Pose, origin: Vec3, direction: Vec3, max_t: f32) -> Option<RayHit> {
    let to_local = pose.orientation.inverse();
    let local_origin = to_local * (origin - pose.position);
    let local_direction = to_local * direction;
    let half = cuboid.half_extents.to_array();
    let o = local_origin.to_array();
    let d = local_direction.to_array();

    let mut t_min = 0.0f32;
    let mut t_max = max_t;
    let mut entry_normal: Option<Vec3> = None;

    for axis in 0..3 {
        if d[axis].abs() < 1e-12 {
            if o[axis].abs() > half[axis] {
                return None;
            }
            continue;
        }

        let inverse = 1.0 / d[axis];
        let t_low = (-half[axis] - o[axis]) * inverse;
        let t_high = (half[axis] - o[axis]) * inverse;
        let (near, far, sign) = if t_low < t_high {
            (t_low, t_high, -1.0)
        } else {
            (t_high, t_low, 1.0)
        };

        if near > t_min {
            t_min = near;
            let mut normal = Vec3::ZERO;
            normal[axis] = sign;
            entry_normal = Some(normal);
        }
        t_max = t_max.min(far);
        if t_min > t_max {
            return None;
        }
    }

    let normal = match entry_normal {
        Some(local_normal) => pose.orientation * local_normal,
        // Origin is inside the box
        None => -direction.normalize(),
    };
    Some(RayHit { t: t_min, normal })
}
