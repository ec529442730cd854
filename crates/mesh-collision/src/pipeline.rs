//! Drives one convex-vs-mesh pair from overlap query to final manifold
//!
//! The pair fans out into one tester call per overlapping triangle. Every child reports
//! into a [`MeshReduction`], which is polled after each completion; the completion that
//! fills the last slot runs boundary correction and produces the manifold.

use crate::collision::Pose;
use crate::config::MeshCollisionConfig;
use crate::contact::{ConvexContactManifold, NonconvexContactManifold, PairId};
use crate::mesh::Mesh;
use crate::pool::BufferPool;
use crate::reduction::{ChildReport, MeshReduction};
use crate::shape::ShapeKind;
use crate::tester::TriangleTester;
use crate::triangle::Triangle;

/// Collide a convex shape (slot A) against a mesh (slot B)
///
/// The result's normals point from the mesh toward the convex shape and its offsets are
/// measured from the convex shape's origin.
#[allow(clippy::too_many_arguments)]
pub fn collide_convex_mesh(
    convex: &ShapeKind,
    tester: &impl TriangleTester,
    pose_a: Pose,
    mesh: &Mesh,
    pose_b: Pose,
    pair_id: PairId,
    config: &MeshCollisionConfig,
    pool: &mut BufferPool,
) -> NonconvexContactManifold {
    collide_pair(convex, tester, pose_a, mesh, pose_b, true, pair_id, config, pool)
}

/// Collide a mesh (slot A) against a convex shape (slot B)
///
/// Tester output is mirrored into this slot order before reduction, so normals point
/// from the convex shape toward the mesh and offsets are measured from the mesh origin.
#[allow(clippy::too_many_arguments)]
pub fn collide_mesh_convex(
    mesh: &Mesh,
    pose_a: Pose,
    convex: &ShapeKind,
    tester: &impl TriangleTester,
    pose_b: Pose,
    pair_id: PairId,
    config: &MeshCollisionConfig,
    pool: &mut BufferPool,
) -> NonconvexContactManifold {
    collide_pair(convex, tester, pose_b, mesh, pose_a, false, pair_id, config, pool)
}

/// Swap a tester manifold's slots so the mesh becomes shape A
fn mirror_manifold(manifold: &mut ConvexContactManifold) {
    let convex_offset = -manifold.offset_b;
    for contact in &mut manifold.contacts {
        contact.offset += convex_offset;
    }
    manifold.offset_b = convex_offset;
    manifold.normal = -manifold.normal;
}

#[allow(clippy::too_many_arguments)]
fn collide_pair(
    convex: &ShapeKind,
    tester: &impl TriangleTester,
    convex_pose: Pose,
    mesh: &Mesh,
    mesh_pose: Pose,
    mesh_in_slot_b: bool,
    pair_id: PairId,
    config: &MeshCollisionConfig,
    pool: &mut BufferPool,
) -> NonconvexContactManifold {
    debug_assert!(
        tester.supports(convex),
        "triangle tester does not model the {} it was paired with",
        convex.name()
    );

    // Mesh origin relative to the convex origin, as every tester sees it
    let mesh_offset = mesh_pose.position - convex_pose.position;
    let offset_b = if mesh_in_slot_b { mesh_offset } else { -mesh_offset };
    let margin = config.narrow_phase.speculative_margin;

    let inverse_mesh_orientation = mesh_pose.orientation.inverse();
    let query = convex
        .compute_bounds(inverse_mesh_orientation * convex_pose.orientation)
        .translated(inverse_mesh_orientation * -mesh_offset)
        .loosened(margin);

    let mut overlaps = pool.indices.take(16);
    mesh.find_local_overlaps(query.min, query.max, &mut overlaps);
    if overlaps.is_empty() {
        pool.indices.give_back(overlaps);
        return NonconvexContactManifold {
            offset_b,
            contacts: Vec::new(),
        };
    }

    tracing::trace!(
        "[collide_pair] Pair {:?}: {} vs {} triangles",
        pair_id,
        convex.name(),
        overlaps.len()
    );

    let mut triangles = pool.triangles.take(overlaps.len());
    triangles.resize(overlaps.len(), Triangle::default());
    mesh.get_triangles(&overlaps, &mut triangles);

    let mut reduction = MeshReduction::create(
        triangles,
        mesh_pose.orientation,
        mesh_in_slot_b,
        &config.reduction,
    );

    let mut result = None;
    for (slot, &triangle_index) in overlaps.iter().enumerate() {
        let mut manifold = tester.test(
            &reduction.triangles()[slot],
            mesh_offset,
            mesh_pose.orientation,
            margin,
        );
        let report = if mesh_in_slot_b {
            ChildReport::new(slot, 0, triangle_index)
        } else {
            ChildReport::new(slot, triangle_index, 0)
        };

        if manifold.is_empty() {
            reduction.on_child_completed_empty(&report);
        } else {
            if !mesh_in_slot_b {
                mirror_manifold(&mut manifold);
            }
            reduction.on_child_completed(&report, &manifold);
        }

        if let Some(flushed) = reduction.try_flush(pair_id, pool) {
            result = Some(flushed);
        }
    }
    pool.indices.give_back(overlaps);

    let mut manifold = result.unwrap_or_default();
    manifold.offset_b = offset_b;
    manifold
}
