//! Static triangle index
//!
//! Thin wrapper over parry's BVH. Leaves are triangle indices; the tree is built once
//! with the binned builder and only ever queried afterwards.

use crate::collision::Aabb;
use rapier3d::parry::partitioning::{Bvh, BvhBuildStrategy};

pub(crate) struct TriangleIndex {
    bvh: Bvh,
    leaf_count: usize,
}

impl TriangleIndex {
    /// Build over one bound per triangle; leaf `i` is `bounds[i]`
    pub(crate) fn build(bounds: &[Aabb]) -> Self {
        let leaves: Vec<_> = bounds.iter().map(|bounds| bounds.to_parry()).collect();

        let bvh = if !leaves.is_empty() {
            Bvh::from_leaves(BvhBuildStrategy::Binned, &leaves)
        } else {
            Bvh::default()
        };

        Self {
            bvh,
            leaf_count: leaves.len(),
        }
    }

    pub(crate) fn leaf_count(&self) -> usize {
        self.leaf_count
    }

    /// Invoke `visitor` once per leaf whose bound overlaps `query`, in no particular order
    pub(crate) fn for_each_overlap(&self, query: &Aabb, mut visitor: impl FnMut(u32)) {
        if self.leaf_count == 0 {
            return;
        }

        let query = query.to_parry();
        for leaf in self.bvh.intersect_aabb(&query) {
            visitor(leaf);
        }
    }
}
