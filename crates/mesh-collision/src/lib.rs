//! Narrow-phase collision between convex shapes and static triangle meshes
//!
//! A convex-vs-mesh pair fans out into one convex-vs-triangle test per overlapping
//! triangle. Each test produces its own manifold; [`MeshReduction`] recombines them,
//! correcting normals that would otherwise produce bumps at triangle seams, before the
//! final [`NonconvexReduction`] caps the contact count.
//!
//! # Usage
//!
//! ```ignore
//! use crossworld_mesh_collision::*;
//!
//! let mesh = Mesh::new(triangles, Vec3::ONE);
//! let sphere = Sphere::new(0.5);
//! let mut pool = BufferPool::default();
//! let manifold = collide_convex_mesh(
//!     &ShapeKind::Sphere(sphere),
//!     &SphereTriangleTester::new(sphere.radius, &NarrowPhaseConfig::default()),
//!     Pose::from_position(Vec3::new(0.0, 0.45, 0.0)),
//!     &mesh,
//!     Pose::IDENTITY,
//!     PairId(0),
//!     &MeshCollisionConfig::default(),
//!     &mut pool,
//! );
//! ```

pub mod collision;
pub mod config;
pub mod contact;
mod error;
pub mod mesh;
pub mod pipeline;
pub mod pool;
pub mod reduction;
pub mod shape;
pub mod tester;
mod triangle;

pub use collision::{Aabb, Pose};
pub use config::{MeshCollisionConfig, NarrowPhaseConfig, ReductionConfig};
pub use contact::{
    Contact, ConvexContactManifold, NonconvexContact, NonconvexContactManifold, PairId,
    FACE_COLLISION_FLAG, MINIMUM_DOT_FOR_FACE_COLLISION,
};
pub use error::{CollisionError, ConfigError};
pub use mesh::{find_local_overlaps_batch, Mesh};
pub use pipeline::{collide_convex_mesh, collide_mesh_convex};
pub use pool::{BufferPool, Pool};
pub use reduction::{ChildReport, MeshReduction, NonconvexReduction, TestTriangle};
pub use shape::{Compound, CompoundChild, Cuboid, RayHit, ShapeKind, Sphere};
pub use tester::{SphereTriangleTester, TriangleTester};
pub use triangle::Triangle;

// Re-export for convenience
pub use glam;
pub use rapier3d;
