use crate::triangle::Triangle;
use glam::Vec3;

/// Face and edge-fence planes of one triangle, built for a single correction pass
///
/// Fence normals lie in the triangle's plane, perpendicular to their edge, and point
/// away from the interior. Each plane is anchored at its edge's first vertex; the face
/// plane is anchored at `a`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TestTriangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
    pub normal: Vec3,
    pub edge_plane_ab: Vec3,
    pub edge_plane_bc: Vec3,
    pub edge_plane_ca: Vec3,
    /// Slop applied to all four plane tests, proportional to the triangle's size
    pub distance_threshold: f32,
    /// Reduction slot this triangle belongs to
    pub child_index: usize,
}

/// Signed distances of a point from a [`TestTriangle`]'s planes
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneDistances {
    pub face: f32,
    pub ab: f32,
    pub bc: f32,
    pub ca: f32,
}

impl TestTriangle {
    /// # Arguments
    /// * `triangle` - Triangle in the mesh's local frame
    /// * `child_index` - Reduction slot the triangle was tested in
    /// * `threshold_scale` - Threshold relative to the longer of edges AB and BC
    pub fn new(triangle: &Triangle, child_index: usize, threshold_scale: f32) -> Self {
        let ab = triangle.b - triangle.a;
        let bc = triangle.c - triangle.b;
        let ca = triangle.a - triangle.c;

        let normal = ab.cross(-ca).normalize();

        Self {
            a: triangle.a,
            b: triangle.b,
            c: triangle.c,
            normal,
            edge_plane_ab: ab.cross(normal).normalize(),
            edge_plane_bc: bc.cross(normal).normalize(),
            edge_plane_ca: ca.cross(normal).normalize(),
            distance_threshold: threshold_scale
                * ab.length_squared().max(bc.length_squared()).sqrt(),
            child_index,
        }
    }

    pub fn plane_distances(&self, point: Vec3) -> PlaneDistances {
        PlaneDistances {
            face: (point - self.a).dot(self.normal),
            ab: (point - self.a).dot(self.edge_plane_ab),
            bc: (point - self.b).dot(self.edge_plane_bc),
            ca: (point - self.c).dot(self.edge_plane_ca),
        }
    }

    /// Whether this triangle's face claims a contact reported against a neighbor
    ///
    /// `contacts` and `normal` are in the mesh's local frame, with the normal pointing
    /// from the other shape into the mesh. A contact is claimed when it sits within the
    /// face slab and either lies inside all three edges or lies on an edge while the
    /// normal leans across that edge into the face region.
    pub fn blocks_normal(&self, contacts: &[Vec3], normal: Vec3, infringement_epsilon: f32) -> bool {
        let threshold = self.distance_threshold;
        let negative_threshold = -threshold;

        for &contact in contacts {
            let distances = self.plane_distances(contact);
            if distances.face.abs() > threshold
                || distances.ab > threshold
                || distances.bc > threshold
                || distances.ca > threshold
            {
                continue;
            }

            let on_ab = distances.ab >= negative_threshold;
            let on_bc = distances.bc >= negative_threshold;
            let on_ca = distances.ca >= negative_threshold;
            if !on_ab && !on_bc && !on_ca {
                return true;
            }

            if (on_ab && self.edge_plane_ab.dot(normal) > infringement_epsilon)
                || (on_bc && self.edge_plane_bc.dot(normal) > infringement_epsilon)
                || (on_ca && self.edge_plane_ca.dot(normal) > infringement_epsilon)
            {
                return true;
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 5e-5;

    // Unit right triangle on y = 0, CCW from +Y
    fn make_triangle() -> TestTriangle {
        let triangle = Triangle::new(
            Vec3::ZERO,
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 0.0, 0.0),
        );
        TestTriangle::new(&triangle, 3, 1e-4)
    }

    #[test]
    fn test_planes_point_outward() {
        let tri = make_triangle();
        assert!((tri.normal - Vec3::Y).length() < 1e-6);

        // Centroid is inside every fence
        let centroid = (tri.a + tri.b + tri.c) / 3.0;
        let d = tri.plane_distances(centroid);
        assert!(d.face.abs() < 1e-6);
        assert!(d.ab < 0.0 && d.bc < 0.0 && d.ca < 0.0);

        // Each fence normal is unit length, perpendicular to the face
        for fence in [tri.edge_plane_ab, tri.edge_plane_bc, tri.edge_plane_ca] {
            assert!((fence.length() - 1.0).abs() < 1e-6);
            assert!(fence.dot(tri.normal).abs() < 1e-6);
        }

        // AB runs along +Z at x = 0; outside is -X
        assert!((tri.edge_plane_ab - Vec3::NEG_X).length() < 1e-6);
        // CA runs along x at z = 0; outside is -Z
        assert!((tri.edge_plane_ca - Vec3::NEG_Z).length() < 1e-6);
    }

    #[test]
    fn test_threshold_scales_with_edges() {
        let tri = make_triangle();
        // |AB| = 1, |BC| = sqrt(2)
        assert!((tri.distance_threshold - 1e-4 * 2f32.sqrt()).abs() < 1e-9);
        assert_eq!(tri.child_index, 3);

        let big = TestTriangle::new(
            &Triangle::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 10.0), Vec3::new(10.0, 0.0, 0.0)),
            0,
            1e-4,
        );
        assert!((big.distance_threshold - 10.0 * tri.distance_threshold).abs() < 1e-7);
    }

    #[test]
    fn test_interior_contact_blocks_any_normal() {
        let tri = make_triangle();
        let contact = [Vec3::new(0.25, 0.0, 0.25)];
        assert!(tri.blocks_normal(&contact, Vec3::NEG_Y, EPSILON));
        assert!(tri.blocks_normal(&contact, Vec3::new(1.0, 0.0, 0.0), EPSILON));
    }

    #[test]
    fn test_edge_contact_blocks_only_infringing_normal() {
        let tri = make_triangle();
        // On edge AB (x = 0)
        let contact = [Vec3::new(0.0, 0.0, 0.5)];

        // Straight down into the face: parallel to the fence plane
        assert!(!tri.blocks_normal(&contact, Vec3::NEG_Y, EPSILON));
        // Leaning toward -X, across the fence into the face region
        assert!(tri.blocks_normal(&contact, Vec3::new(-0.5, -1.0, 0.0).normalize(), EPSILON));
        // Leaning away from the face region
        assert!(!tri.blocks_normal(&contact, Vec3::new(0.5, -1.0, 0.0).normalize(), EPSILON));
    }

    #[test]
    fn test_distant_contact_never_blocks() {
        let tri = make_triangle();
        let above = [Vec3::new(0.25, 0.01, 0.25)];
        let outside = [Vec3::new(-0.01, 0.0, 0.5)];
        for normal in [
            Vec3::X,
            Vec3::NEG_X,
            Vec3::Y,
            Vec3::NEG_Y,
            Vec3::Z,
            Vec3::NEG_Z,
            Vec3::new(-1.0, -1.0, -1.0).normalize(),
        ] {
            assert!(!tri.blocks_normal(&above, normal, EPSILON));
            assert!(!tri.blocks_normal(&outside, normal, EPSILON));
        }
    }

    #[test]
    fn test_face_slab_is_inclusive_on_both_sides() {
        let tri = make_triangle();
        let t = tri.distance_threshold;

        for height in [0.5 * t, -0.5 * t] {
            let contact = [Vec3::new(0.25, height, 0.25)];
            assert!(tri.blocks_normal(&contact, Vec3::NEG_Y, EPSILON), "height {height}");
        }
        for height in [2.0 * t, -2.0 * t] {
            let contact = [Vec3::new(0.25, height, 0.25)];
            assert!(!tri.blocks_normal(&contact, Vec3::NEG_Y, EPSILON), "height {height}");
        }
    }

    #[test]
    fn test_fence_crust_within_threshold() {
        let tri = make_triangle();
        let t = tri.distance_threshold;
        // Leans across edge AB (x = 0) into the face region
        let normal = Vec3::new(-0.5, -1.0, 0.0).normalize();

        let inside_crust = [Vec3::new(-0.5 * t, 0.0, 0.5)];
        assert!(tri.blocks_normal(&inside_crust, normal, EPSILON));

        let beyond_crust = [Vec3::new(-2.0 * t, 0.0, 0.5)];
        assert!(!tri.blocks_normal(&beyond_crust, normal, EPSILON));
    }

    #[test]
    fn test_infringement_epsilon_boundary() {
        let tri = make_triangle();
        let contact = [Vec3::new(0.0, 0.0, 0.5)];
        // Fence AB is -X, so the fence dot is exactly `lean`
        let leaning = |lean: f32| Vec3::new(-lean, -(1.0 - lean * lean).sqrt(), 0.0);

        assert!(!tri.blocks_normal(&contact, leaning(3e-5), EPSILON));
        assert!(tri.blocks_normal(&contact, leaning(1e-4), EPSILON));
    }

    #[test]
    fn test_any_claimed_contact_blocks() {
        let tri = make_triangle();
        let contacts = [Vec3::new(5.0, 0.0, 5.0), Vec3::new(0.2, 0.0, 0.2)];
        assert!(tri.blocks_normal(&contacts, Vec3::NEG_Y, EPSILON));
    }
}
