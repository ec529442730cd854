//! Manifold reduction for pairs involving a mesh
//!
//! - [`MeshReduction`]: per-pair continuation with boundary-normal correction
//! - [`NonconvexReduction`]: bounded merge of child manifolds it delegates to
//! - [`TestTriangle`]: face and edge planes used by the correction pass

mod mesh_reduction;
mod nonconvex;
mod test_triangle;

pub use mesh_reduction::{reduce_manifolds, MeshReduction, ReductionState};
pub use nonconvex::{ChildReport, NonconvexReduction, NonconvexReductionChild};
pub use test_triangle::{PlaneDistances, TestTriangle};
