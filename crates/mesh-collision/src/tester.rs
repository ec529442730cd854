//! Per-triangle narrow-phase tests feeding a [`MeshReduction`](crate::MeshReduction)

use crate::config::NarrowPhaseConfig;
use crate::contact::{Contact, ConvexContactManifold, FACE_COLLISION_FLAG};
use crate::shape::ShapeKind;
use crate::triangle::Triangle;
use glam::{Quat, Vec3};

/// Tests the convex shape in slot A against one mesh triangle in slot B
pub trait TriangleTester {
    /// # Arguments
    /// * `triangle` - Scaled triangle in the mesh's local frame
    /// * `offset_b` - Mesh origin relative to the convex shape's origin
    /// * `mesh_orientation` - World orientation of the mesh
    /// * `speculative_margin` - Separation below which a contact is still reported
    ///
    /// The returned manifold follows the crate conventions: offsets from the convex
    /// shape's origin, normal pointing from the mesh toward the convex shape. Contacts
    /// produced by a direct face hit carry [`FACE_COLLISION_FLAG`].
    fn test(
        &self,
        triangle: &Triangle,
        offset_b: Vec3,
        mesh_orientation: Quat,
        speculative_margin: f32,
    ) -> ConvexContactManifold;

    /// Whether this tester models `shape`; bounds come from the shape, contacts from the
    /// tester, so the two must describe the same geometry
    fn supports(&self, shape: &ShapeKind) -> bool;
}

/// Region of a triangle that a closest point landed on
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum TriangleFeature {
    Face,
    EdgeAB,
    EdgeBC,
    EdgeCA,
    VertexA,
    VertexB,
    VertexC,
}

impl TriangleFeature {
    fn id(self) -> u32 {
        match self {
            TriangleFeature::Face => 0,
            TriangleFeature::EdgeAB => 1,
            TriangleFeature::EdgeBC => 2,
            TriangleFeature::EdgeCA => 3,
            TriangleFeature::VertexA => 4,
            TriangleFeature::VertexB => 5,
            TriangleFeature::VertexC => 6,
        }
    }
}

/// Closest point on a triangle to `p`, by Voronoi region
fn closest_point_on_triangle(triangle: &Triangle, p: Vec3) -> (Vec3, TriangleFeature) {
    let Triangle { a, b, c } = *triangle;
    let ab = b - a;
    let ac = c - a;

    let ap = p - a;
    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, TriangleFeature::VertexA);
    }

    let bp = p - b;
    let d3 = ab.dot(bp);
    let d4 = ac.dot(bp);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, TriangleFeature::VertexB);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, TriangleFeature::EdgeAB);
    }

    let cp = p - c;
    let d5 = ab.dot(cp);
    let d6 = ac.dot(cp);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, TriangleFeature::VertexC);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, TriangleFeature::EdgeCA);
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return (b + (c - b) * w, TriangleFeature::EdgeBC);
    }

    let denominator = 1.0 / (va + vb + vc);
    let v = vb * denominator;
    let w = vc * denominator;
    (a + ab * v + ac * w, TriangleFeature::Face)
}

/// One-sided sphere-vs-triangle test
///
/// Spheres behind a triangle's front face produce nothing, so a body below a floor is
/// not pushed up through it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SphereTriangleTester {
    pub radius: f32,
    pub minimum_dot_for_face_collision: f32,
}

impl SphereTriangleTester {
    pub fn new(radius: f32, config: &NarrowPhaseConfig) -> Self {
        Self {
            radius,
            minimum_dot_for_face_collision: config.minimum_dot_for_face_collision,
        }
    }
}

impl TriangleTester for SphereTriangleTester {
    fn supports(&self, shape: &ShapeKind) -> bool {
        matches!(shape, ShapeKind::Sphere(sphere) if sphere.radius == self.radius)
    }

    fn test(
        &self,
        triangle: &Triangle,
        offset_b: Vec3,
        mesh_orientation: Quat,
        speculative_margin: f32,
    ) -> ConvexContactManifold {
        let center = mesh_orientation.inverse() * -offset_b;
        let face_normal = triangle.normal();

        if (center - triangle.a).dot(face_normal) < 0.0 {
            return ConvexContactManifold::new(offset_b, Vec3::ZERO);
        }

        let (closest, feature) = closest_point_on_triangle(triangle, center);
        let separation = center - closest;
        let distance = separation.length();
        let depth = self.radius - distance;
        if depth < -speculative_margin {
            return ConvexContactManifold::new(offset_b, Vec3::ZERO);
        }

        let local_normal = if distance > 1e-7 {
            separation / distance
        } else {
            face_normal
        };

        let mut feature_id = feature.id();
        if local_normal.dot(face_normal) >= self.minimum_dot_for_face_collision {
            feature_id |= FACE_COLLISION_FLAG;
        }

        ConvexContactManifold::with_contacts(
            offset_b,
            mesh_orientation * local_normal,
            vec![Contact::new(
                offset_b + mesh_orientation * closest,
                depth,
                feature_id,
            )],
        )
    }
}
