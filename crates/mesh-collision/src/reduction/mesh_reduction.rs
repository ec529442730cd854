//! Per-pair continuation for convex-vs-mesh collisions
//!
//! Collects one manifold per tested triangle. When the last one arrives, contacts that a
//! per-triangle test attributed to an edge or vertex are checked against every other
//! tested triangle: if a neighbor's face claims the contact, the manifold takes the
//! neighbor's face normal and loses any positive depth. This removes the bumps a body
//! would otherwise feel sliding across a seam between triangles.

use super::nonconvex::{ChildReport, NonconvexReduction, NonconvexReductionChild};
use super::test_triangle::TestTriangle;
use crate::config::ReductionConfig;
use crate::contact::{
    ConvexContactManifold, NonconvexContactManifold, PairId, FACE_COLLISION_FLAG,
};
use crate::pool::BufferPool;
use crate::triangle::Triangle;
use glam::{Mat3, Quat, Vec3};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReductionState {
    /// Waiting for children; `completed < child_count`
    Accumulating,
    /// Flushed; the reduction must not be reused
    Flushed,
}

#[derive(Debug)]
pub struct MeshReduction {
    /// Scaled triangles in the mesh's local frame, one per child slot
    triangles: Vec<Triangle>,

    /// Whether the manifolds treat the mesh as shape B
    requires_flip: bool,

    /// Mesh orientation at the time the children were tested
    mesh_orientation: Quat,

    inner: NonconvexReduction,
    config: ReductionConfig,
    state: ReductionState,
}

impl MeshReduction {
    /// Create a reduction with one slot per triangle
    ///
    /// # Arguments
    /// * `triangles` - Scaled local triangle for each child slot, usually from a
    ///   [`BufferPool`]; it is given back to the pool on flush
    /// * `mesh_orientation` - World orientation of the mesh
    /// * `requires_flip` - True when contacts were generated with the mesh as shape B
    /// * `config` - Correction thresholds and contact cap
    pub fn create(
        triangles: Vec<Triangle>,
        mesh_orientation: Quat,
        requires_flip: bool,
        config: &ReductionConfig,
    ) -> Self {
        Self {
            inner: NonconvexReduction::create(triangles.len(), config.max_contacts),
            triangles,
            requires_flip,
            mesh_orientation,
            config: *config,
            state: ReductionState::Accumulating,
        }
    }

    pub fn state(&self) -> ReductionState {
        self.state
    }

    pub fn child_count(&self) -> usize {
        self.inner.child_count()
    }

    pub fn completed_child_count(&self) -> usize {
        self.inner.completed_child_count()
    }

    pub fn requires_flip(&self) -> bool {
        self.requires_flip
    }

    pub fn mesh_orientation(&self) -> Quat {
        self.mesh_orientation
    }

    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Record a child's manifold; correction waits until every child is in
    pub fn on_child_completed(&mut self, report: &ChildReport, manifold: &ConvexContactManifold) {
        debug_assert_eq!(self.state, ReductionState::Accumulating);
        self.inner.on_child_completed(report, manifold);
    }

    /// Record a child that produced no contacts
    pub fn on_child_completed_empty(&mut self, report: &ChildReport) {
        debug_assert_eq!(self.state, ReductionState::Accumulating);
        self.inner.on_child_completed_empty(report);
    }

    /// Correct and merge the children once all of them have completed
    ///
    /// Returns None without doing anything while children are outstanding, and on any
    /// call after the reduction has flushed.
    pub fn try_flush(
        &mut self,
        pair_id: PairId,
        pool: &mut BufferPool,
    ) -> Option<NonconvexContactManifold> {
        if self.state == ReductionState::Flushed {
            tracing::warn!(
                "[MeshReduction] try_flush on already flushed pair {:?}",
                pair_id
            );
            return None;
        }
        debug_assert!(
            self.inner.child_count() > 0,
            "mesh reduction flushed without any children"
        );
        if !self.inner.is_complete() {
            return None;
        }

        let mut active = pool.test_triangles.take(self.inner.child_count());
        let corrected = reduce_manifolds(
            &self.triangles,
            &mut self.inner.children,
            self.requires_flip,
            self.mesh_orientation,
            &self.config,
            &mut active,
        );
        pool.test_triangles.give_back(active);
        pool.triangles.give_back(std::mem::take(&mut self.triangles));

        let manifold = self.inner.flush(pair_id);
        self.state = ReductionState::Flushed;

        tracing::debug!(
            "[MeshReduction] Pair {:?}: {} children, {} corrected, {} contacts",
            pair_id,
            self.inner.completed_child_count(),
            corrected,
            manifold.len()
        );

        Some(manifold)
    }
}

/// Transform a manifold's contacts and normal into the mesh's local frame
///
/// The returned normal points from the other shape into the mesh whichever slot the
/// mesh occupied.
fn compute_mesh_space_contacts(
    manifold: &ConvexContactManifold,
    inverse_mesh_orientation: &Mat3,
    requires_flip: bool,
    mesh_space_contacts: &mut Vec<Vec3>,
) -> Vec3 {
    mesh_space_contacts.clear();
    if requires_flip {
        mesh_space_contacts.extend(
            manifold
                .contacts
                .iter()
                .map(|contact| *inverse_mesh_orientation * (contact.offset - manifold.offset_b)),
        );
        *inverse_mesh_orientation * -manifold.normal
    } else {
        mesh_space_contacts.extend(
            manifold
                .contacts
                .iter()
                .map(|contact| *inverse_mesh_orientation * contact.offset),
        );
        *inverse_mesh_orientation * manifold.normal
    }
}

/// Boundary-correct every child manifold in place
///
/// `triangles[slot]` is the triangle child `slot` was tested against. `active` is
/// scratch space for the pass. Neighbors are tried in slot order and the first one
/// whose face claims a contact wins. Returns the number of corrected manifolds.
pub fn reduce_manifolds(
    triangles: &[Triangle],
    children: &mut [NonconvexReductionChild],
    requires_flip: bool,
    mesh_orientation: Quat,
    config: &ReductionConfig,
    active: &mut Vec<TestTriangle>,
) -> usize {
    debug_assert_eq!(triangles.len(), children.len());

    active.clear();
    active.extend(
        children
            .iter()
            .enumerate()
            .filter(|(_, child)| !child.manifold.is_empty())
            .map(|(slot, _)| {
                TestTriangle::new(&triangles[slot], slot, config.distance_threshold_scale)
            }),
    );

    let mesh_orientation = Mat3::from_quat(mesh_orientation);
    let inverse_mesh_orientation = mesh_orientation.transpose();
    let mut mesh_space_contacts = Vec::with_capacity(4);
    let mut corrected = 0;

    for (i, source) in active.iter().enumerate() {
        let manifold = &mut children[source.child_index].manifold;

        if !manifold.contacts[0].is_face_collision() {
            let mesh_space_normal = compute_mesh_space_contacts(
                manifold,
                &inverse_mesh_orientation,
                requires_flip,
                &mut mesh_space_contacts,
            );

            let blocking = active.iter().enumerate().find(|&(j, neighbor)| {
                j != i
                    && neighbor.blocks_normal(
                        &mesh_space_contacts,
                        mesh_space_normal,
                        config.infringement_epsilon,
                    )
            });

            if let Some((_, neighbor)) = blocking {
                for contact in &mut manifold.contacts {
                    contact.depth = contact.depth.min(0.0);
                }
                let local_normal = if requires_flip {
                    neighbor.normal
                } else {
                    -neighbor.normal
                };
                manifold.normal = mesh_orientation * local_normal;
                corrected += 1;

                tracing::trace!(
                    "[MeshReduction] Child {} takes face normal of child {}",
                    source.child_index,
                    neighbor.child_index
                );
            }
        }

        for contact in &mut manifold.contacts {
            contact.feature_id &= !FACE_COLLISION_FLAG;
        }
    }

    corrected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::Contact;
    use std::f32::consts::FRAC_PI_2;

    const TOLERANCE: f32 = 1e-5;

    /// Two CCW (+Y facing) triangles on y = 0 sharing the edge x = 0, z in [-1, 1]
    fn coplanar_pair() -> [Triangle; 2] {
        let b = Vec3::new(0.0, 0.0, 1.0);
        let c = Vec3::new(0.0, 0.0, -1.0);
        [
            Triangle::new(Vec3::new(-1.0, 0.0, 0.0), b, c),
            Triangle::new(c, b, Vec3::new(1.0, 0.0, 0.0)),
        ]
    }

    /// Roof: both triangles slope down away from a ridge along z at the origin
    fn ridge_pair(drop: f32) -> [Triangle; 2] {
        let b = Vec3::new(0.0, 0.0, 1.0);
        let c = Vec3::new(0.0, 0.0, -1.0);
        [
            Triangle::new(Vec3::new(-1.0, -drop, 0.0), b, c),
            Triangle::new(c, b, Vec3::new(1.0, -drop, 0.0)),
        ]
    }

    /// Manifold for a convex body in slot A and the mesh in slot B at the origin
    ///
    /// The body sits at `body` in mesh space, so contact offsets are `point - body`.
    fn flipped_manifold(body: Vec3, normal: Vec3, points: &[(Vec3, f32, u32)]) -> ConvexContactManifold {
        ConvexContactManifold::with_contacts(
            -body,
            normal,
            points
                .iter()
                .map(|&(point, depth, id)| Contact::new(point - body, depth, id))
                .collect(),
        )
    }

    fn run(
        triangles: &[Triangle],
        manifolds: Vec<ConvexContactManifold>,
        requires_flip: bool,
        orientation: Quat,
    ) -> (Vec<NonconvexReductionChild>, usize) {
        let mut children: Vec<NonconvexReductionChild> = manifolds
            .into_iter()
            .map(|manifold| NonconvexReductionChild {
                manifold,
                ..Default::default()
            })
            .collect();
        let mut active = Vec::new();
        let corrected = reduce_manifolds(
            triangles,
            &mut children,
            requires_flip,
            orientation,
            &ReductionConfig::default(),
            &mut active,
        );
        (children, corrected)
    }

    #[test]
    fn test_coplanar_shared_edge_face_normal_untouched() {
        let triangles = coplanar_pair();
        let body = Vec3::new(0.0, 0.5, 0.0);
        let on_edge = Vec3::new(0.0, 0.0, 0.25);
        let manifolds = vec![
            flipped_manifold(body, Vec3::Y, &[(on_edge, 0.01, 1)]),
            flipped_manifold(body, Vec3::Y, &[(on_edge, 0.01, 2)]),
        ];
        let original = manifolds.clone();

        let (children, corrected) = run(&triangles, manifolds, true, Quat::IDENTITY);

        assert_eq!(corrected, 0);
        for (child, before) in children.iter().zip(&original) {
            assert_eq!(&child.manifold, before);
        }
    }

    #[test]
    fn test_convex_ridge_infringing_normal_corrected() {
        let triangles = ridge_pair(0.5);
        let neighbor_normal = triangles[1].normal();
        let body = Vec3::new(0.3, 0.4, 0.0);
        let ridge_point = Vec3::new(0.0, 0.0, 0.1);

        // Child 0 reports an edge normal leaning past the neighbor's face
        let leaning = Vec3::new(1.0, 0.2, 0.0).normalize();
        let manifolds = vec![
            flipped_manifold(body, leaning, &[(ridge_point, 0.05, 4), (ridge_point + Vec3::Z * 0.2, -0.01, 5)]),
            flipped_manifold(
                body,
                neighbor_normal,
                &[(Vec3::new(0.3, -0.15, 0.0), 0.02, 6 | FACE_COLLISION_FLAG)],
            ),
        ];

        let (children, corrected) = run(&triangles, manifolds, true, Quat::IDENTITY);

        assert_eq!(corrected, 1);
        let fixed = &children[0].manifold;
        assert!((fixed.normal - neighbor_normal).length() < TOLERANCE);
        assert_eq!(fixed.contacts[0].depth, 0.0);
        // Negative depths are left alone
        assert_eq!(fixed.contacts[1].depth, -0.01);

        // The face hit keeps its normal and depth and only loses the flag
        let face = &children[1].manifold;
        assert_eq!(face.normal, neighbor_normal);
        assert_eq!(face.contacts[0].depth, 0.02);
        assert_eq!(face.contacts[0].feature_id, 6);
    }

    #[test]
    fn test_convex_ridge_between_faces_untouched() {
        let triangles = ridge_pair(0.5);
        let body = Vec3::new(0.0, 0.5, 0.0);
        let ridge_point = Vec3::new(0.0, 0.0, 0.1);
        let manifolds = vec![
            flipped_manifold(body, Vec3::Y, &[(ridge_point, 0.05, 1)]),
            flipped_manifold(body, Vec3::Y, &[(ridge_point, 0.05, 2)]),
        ];

        let (children, corrected) = run(&triangles, manifolds, true, Quat::IDENTITY);

        assert_eq!(corrected, 0);
        for child in &children {
            assert_eq!(child.manifold.normal, Vec3::Y);
            assert_eq!(child.manifold.contacts[0].depth, 0.05);
        }
    }

    #[test]
    fn test_contact_inside_neighbor_face_corrected() {
        let triangles = coplanar_pair();
        let body = Vec3::new(0.4, 0.5, 0.0);
        // Child 0's test found the body's contact beyond its own edge, inside triangle 1
        let tilted = Vec3::new(0.6, 0.8, 0.0);
        let manifolds = vec![
            flipped_manifold(body, tilted, &[(Vec3::new(0.4, 0.0, 0.0), 0.03, 1)]),
            flipped_manifold(
                body,
                Vec3::Y,
                &[(Vec3::new(0.4, 0.0, 0.0), 0.03, 2 | FACE_COLLISION_FLAG)],
            ),
        ];

        let (children, corrected) = run(&triangles, manifolds, true, Quat::IDENTITY);

        assert_eq!(corrected, 1);
        assert!((children[0].manifold.normal - Vec3::Y).length() < TOLERANCE);
        assert_eq!(children[0].manifold.contacts[0].depth, 0.0);
    }

    #[test]
    fn test_distant_contact_never_corrected() {
        let triangles = coplanar_pair();
        let body = Vec3::new(5.0, 3.0, 5.0);
        for normal in [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z] {
            let manifolds = vec![
                flipped_manifold(body, normal, &[(Vec3::new(5.0, 2.0, 5.0), 0.1, 1)]),
                flipped_manifold(body, Vec3::Y, &[(Vec3::new(0.5, 0.0, 0.0), 0.1, 2)]),
            ];
            let (children, _) = run(&triangles, manifolds, true, Quat::IDENTITY);
            assert_eq!(children[0].manifold.normal, normal);
            assert_eq!(children[0].manifold.contacts[0].depth, 0.1);
        }
    }

    #[test]
    fn test_face_flagged_manifold_only_loses_flag() {
        let triangles = coplanar_pair();
        let body = Vec3::new(0.4, 0.5, 0.0);
        // Inside triangle 1 with a strange normal; the face flag exempts it
        let strange = Vec3::new(0.6, 0.8, 0.0);
        let manifolds = vec![
            flipped_manifold(
                body,
                strange,
                &[(Vec3::new(0.4, 0.0, 0.0), 0.03, 9 | FACE_COLLISION_FLAG)],
            ),
            flipped_manifold(body, Vec3::Y, &[(Vec3::new(0.5, 0.0, 0.1), 0.03, 2 | FACE_COLLISION_FLAG)]),
        ];

        let (children, corrected) = run(&triangles, manifolds, true, Quat::IDENTITY);

        assert_eq!(corrected, 0);
        assert_eq!(children[0].manifold.normal, strange);
        assert_eq!(children[0].manifold.contacts[0].depth, 0.03);
        assert_eq!(children[0].manifold.contacts[0].feature_id, 9);
        assert_eq!(children[1].manifold.contacts[0].feature_id, 2);
    }

    #[test]
    fn test_empty_children_are_ignored() {
        let triangles = coplanar_pair();
        let body = Vec3::new(0.4, 0.5, 0.0);
        let manifolds = vec![
            flipped_manifold(body, Vec3::new(0.6, 0.8, 0.0), &[(Vec3::new(0.4, 0.0, 0.0), 0.03, 1)]),
            ConvexContactManifold::new(-body, Vec3::Y),
        ];

        let (children, corrected) = run(&triangles, manifolds, true, Quat::IDENTITY);

        assert_eq!(corrected, 0);
        assert_eq!(children[0].manifold.contacts[0].depth, 0.03);
    }

    #[test]
    fn test_unflipped_rotated_mesh() {
        // Mesh in slot A at the origin, rotated a quarter turn about X so local +Y
        // faces world +Z. Normals point from the body (B) into the mesh (A).
        let orientation = Quat::from_rotation_x(FRAC_PI_2);
        let triangles = coplanar_pair();
        let local_point = Vec3::new(0.4, 0.0, 0.0);
        let world_point = orientation * local_point;
        let world_tilted = orientation * -Vec3::new(0.6, 0.8, 0.0);

        let manifolds = vec![
            ConvexContactManifold::with_contacts(
                Vec3::new(0.4, 0.0, 0.5),
                world_tilted,
                vec![Contact::new(world_point, 0.03, 1)],
            ),
            ConvexContactManifold::with_contacts(
                Vec3::new(0.4, 0.0, 0.5),
                orientation * Vec3::NEG_Y,
                vec![Contact::new(world_point, 0.03, 2 | FACE_COLLISION_FLAG)],
            ),
        ];

        let (children, corrected) = run(&triangles, manifolds, false, orientation);

        assert_eq!(corrected, 1);
        let expected = orientation * Vec3::NEG_Y;
        assert!((children[0].manifold.normal - expected).length() < TOLERANCE);
        assert!((expected - Vec3::NEG_Z).length() < TOLERANCE);
    }

    #[test]
    fn test_try_flush_lifecycle() {
        let mut pool = BufferPool::default();
        let mut triangles = pool.triangles.take(2);
        triangles.extend(coplanar_pair());

        let mut reduction =
            MeshReduction::create(triangles, Quat::IDENTITY, true, &ReductionConfig::default());
        assert_eq!(reduction.child_count(), 2);
        assert_eq!(reduction.state(), ReductionState::Accumulating);
        assert!(reduction.requires_flip());
        assert_eq!(reduction.mesh_orientation(), Quat::IDENTITY);

        let body = Vec3::new(0.4, 0.5, 0.0);
        reduction.on_child_completed(
            &ChildReport::new(0, 0, 0),
            &flipped_manifold(body, Vec3::new(0.6, 0.8, 0.0), &[(Vec3::new(0.4, 0.0, 0.0), 0.03, 1)]),
        );
        // Not every child is in yet: no work, nothing returned
        assert!(reduction.try_flush(PairId(7), &mut pool).is_none());
        assert!(reduction.try_flush(PairId(7), &mut pool).is_none());
        assert_eq!(reduction.state(), ReductionState::Accumulating);
        assert_eq!(pool.triangles.outstanding(), 1);

        reduction.on_child_completed(
            &ChildReport::new(1, 0, 1),
            &flipped_manifold(
                body,
                Vec3::Y,
                &[(Vec3::new(0.4, 0.0, 0.0), 0.03, 2 | FACE_COLLISION_FLAG)],
            ),
        );
        assert_eq!(reduction.completed_child_count(), 2);

        let manifold = reduction
            .try_flush(PairId(7), &mut pool)
            .expect("all children completed");
        assert_eq!(reduction.state(), ReductionState::Flushed);
        assert_eq!(manifold.len(), 2);
        for contact in &manifold.contacts {
            assert!((contact.normal - Vec3::Y).length() < TOLERANCE);
        }

        // Buffers went back to the pool exactly once
        assert_eq!(pool.outstanding(), 0);
        assert!(reduction.triangles().is_empty());

        // A flushed reduction stays flushed
        assert!(reduction.try_flush(PairId(7), &mut pool).is_none());
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn test_try_flush_with_only_empty_children() {
        let mut pool = BufferPool::default();
        let mut triangles = pool.triangles.take(2);
        triangles.extend(coplanar_pair());
        let mut reduction =
            MeshReduction::create(triangles, Quat::IDENTITY, true, &ReductionConfig::default());

        reduction.on_child_completed_empty(&ChildReport::new(0, 0, 0));
        reduction.on_child_completed_empty(&ChildReport::new(1, 0, 1));

        let manifold = reduction.try_flush(PairId(1), &mut pool).expect("complete");
        assert!(manifold.is_empty());
    }
}
