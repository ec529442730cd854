//! Static triangle mesh with runtime scale
//!
//! Triangles and their index live in the mesh's intrinsic (unscaled) frame. Scale is
//! applied only when bounds are computed, when queries come in and when triangles are
//! handed to a tester, so rescaling a large mesh never rebuilds the index.
//!
//! # Frames
//!
//! - **Intrinsic**: the frame triangles were authored in; the index lives here.
//! - **Local**: intrinsic × `scale`. Queries and extracted triangles use this frame.
//! - **World**: local rotated by the mesh orientation and offset by its position.

mod index;

use crate::collision::Aabb;
use crate::triangle::Triangle;
use glam::{Mat3, Quat, Vec3};
use index::TriangleIndex;
use std::fmt;

/// Immutable triangle soup with a prebuilt spatial index
pub struct Mesh {
    /// Triangles in the intrinsic frame, addressed by index
    triangles: Vec<Triangle>,

    /// BVH over intrinsic triangle bounds; leaf index == triangle index
    index: TriangleIndex,

    scale: Vec3,

    /// Component-wise reciprocal of `scale`, kept in lock-step
    inverse_scale: Vec3,
}

impl Mesh {
    /// Create a mesh and build its triangle index
    ///
    /// # Arguments
    /// * `triangles` - Triangles in the intrinsic frame
    /// * `scale` - Initial scale; no component may be zero
    pub fn new(triangles: Vec<Triangle>, scale: Vec3) -> Self {
        let bounds: Vec<Aabb> = triangles.iter().map(Triangle::bounds).collect();
        let index = TriangleIndex::build(&bounds);

        tracing::debug!(
            "[Mesh] Built triangle index over {} triangles",
            index.leaf_count()
        );

        let mut mesh = Self {
            triangles,
            index,
            scale: Vec3::ONE,
            inverse_scale: Vec3::ONE,
        };
        mesh.set_scale(scale);
        mesh
    }

    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    pub fn inverse_scale(&self) -> Vec3 {
        self.inverse_scale
    }

    /// Replace the scale without touching the index
    pub fn set_scale(&mut self, scale: Vec3) {
        debug_assert!(
            scale.x != 0.0 && scale.y != 0.0 && scale.z != 0.0,
            "mesh scale components must be non-zero, got {scale}"
        );
        self.scale = scale;
        self.inverse_scale = scale.recip();
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    /// Intrinsic (unscaled) triangles
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// World-axis-aligned bound of the scaled mesh under `orientation`
    ///
    /// Translation is not applied. Visits every vertex, so the cost is linear in the
    /// triangle count; fine for meshes that are static or rarely re-oriented.
    pub fn compute_bounds(&self, orientation: Quat) -> Aabb {
        if self.triangles.is_empty() {
            return Aabb::default();
        }

        let basis = Mat3::from_quat(orientation);
        Aabb::from_points(
            self.triangles
                .iter()
                .flat_map(Triangle::vertices)
                .map(|vertex| basis * (vertex * self.scale)),
        )
    }

    /// Append the index of every triangle whose bound overlaps `[min, max]`
    ///
    /// The query is in the local (scaled) frame. `overlaps` is only appended to; no
    /// ordering is guaranteed among the appended indices.
    pub fn find_local_overlaps(&self, min: Vec3, max: Vec3, overlaps: &mut Vec<u32>) {
        let query = Aabb::from_corners(min * self.inverse_scale, max * self.inverse_scale);
        self.index
            .for_each_overlap(&query, |triangle_index| overlaps.push(triangle_index));
    }

    /// Gather scaled triangles for `indices` into `triangles`
    ///
    /// `triangles` must be exactly as long as `indices`. This is where scale gets baked
    /// into vertices for the narrow phase.
    pub fn get_triangles(&self, indices: &[u32], triangles: &mut [Triangle]) {
        debug_assert_eq!(
            indices.len(),
            triangles.len(),
            "destination must hold one triangle per index"
        );
        for (target, &index) in triangles.iter_mut().zip(indices) {
            *target = self.triangles[index as usize].scaled(self.scale);
        }
    }

    /// Single scaled triangle in the local frame
    pub fn get_local_child(&self, index: u32) -> Triangle {
        self.triangles[index as usize].scaled(self.scale)
    }

    /// Export the scaled mesh as a parry trimesh
    ///
    /// Returns None if the mesh is empty or parry rejects the topology.
    pub fn to_trimesh(&self) -> Option<rapier3d::prelude::SharedShape> {
        use rapier3d::prelude::*;

        if self.triangles.is_empty() {
            return None;
        }

        let to_point = |v: Vec3| Point::new(v.x, v.y, v.z);
        let mut vertices: Vec<Point<Real>> = Vec::with_capacity(self.triangles.len() * 3);
        let mut indices = Vec::with_capacity(self.triangles.len());

        for (tri_idx, triangle) in self.triangles.iter().enumerate() {
            let scaled = triangle.scaled(self.scale);
            let base_idx = (tri_idx * 3) as u32;
            vertices.push(to_point(scaled.a));
            vertices.push(to_point(scaled.b));
            vertices.push(to_point(scaled.c));
            indices.push([base_idx, base_idx + 1, base_idx + 2]);
        }

        SharedShape::trimesh(vertices, indices).ok()
    }
}

impl fmt::Debug for Mesh {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mesh")
            .field("triangle_count", &self.triangles.len())
            .field("scale", &self.scale)
            .finish()
    }
}

/// Run one local overlap query per lane
///
/// Lanes are laid out as parallel slices: lane `i` queries `meshes[i]` with
/// `[mins[i], maxs[i]]` and appends into `overlaps[i]`. Meshes are only borrowed.
pub fn find_local_overlaps_batch(
    meshes: &[&Mesh],
    mins: &[Vec3],
    maxs: &[Vec3],
    overlaps: &mut [Vec<u32>],
) {
    debug_assert!(
        meshes.len() == mins.len() && mins.len() == maxs.len() && maxs.len() == overlaps.len(),
        "batched overlap query lanes must have equal length"
    );
    for (((mesh, &min), &max), lane) in meshes
        .iter()
        .zip(mins)
        .zip(maxs)
        .zip(overlaps.iter_mut())
    {
        mesh.find_local_overlaps(min, max, lane);
    }
}
