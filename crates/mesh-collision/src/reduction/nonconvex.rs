//! Fixed-capacity merge of many child manifolds into one
//!
//! Each child of a non-convex pair reports a convex manifold into its own slot. Once
//! every slot is filled, [`NonconvexReduction::flush`] flattens them and keeps at most
//! `max_contacts`: the deepest contact first, then whichever remaining contact is
//! farthest from everything already kept, counting normal disagreement as distance.

use crate::contact::{ConvexContactManifold, NonconvexContact, NonconvexContactManifold, PairId};
use glam::Vec3;

/// Identifies the child that just completed
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChildReport {
    /// Slot in the reduction, in `0..child_count`
    pub slot: usize,
    /// Child index within shape A (0 for convex shapes)
    pub child_index_a: u32,
    /// Child index within shape B (0 for convex shapes)
    pub child_index_b: u32,
    /// Child origin relative to shape A's origin
    pub offset_a: Vec3,
}

impl ChildReport {
    pub fn new(slot: usize, child_index_a: u32, child_index_b: u32) -> Self {
        Self {
            slot,
            child_index_a,
            child_index_b,
            offset_a: Vec3::ZERO,
        }
    }
}

/// One child slot of a [`NonconvexReduction`]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NonconvexReductionChild {
    pub manifold: ConvexContactManifold,
    pub offset_a: Vec3,
    pub child_index_a: u32,
    pub child_index_b: u32,
}

#[derive(Clone, Debug, Default)]
pub struct NonconvexReduction {
    pub children: Vec<NonconvexReductionChild>,
    completed_child_count: usize,
    max_contacts: usize,
}

impl NonconvexReduction {
    /// Create with `child_count` empty slots
    pub fn create(child_count: usize, max_contacts: usize) -> Self {
        debug_assert!(max_contacts > 0, "reduction must keep at least one contact");
        Self {
            children: vec![NonconvexReductionChild::default(); child_count],
            completed_child_count: 0,
            max_contacts,
        }
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }

    pub fn completed_child_count(&self) -> usize {
        self.completed_child_count
    }

    pub fn is_complete(&self) -> bool {
        self.completed_child_count == self.children.len()
    }

    /// Store a child's manifold verbatim
    pub fn on_child_completed(&mut self, report: &ChildReport, manifold: &ConvexContactManifold) {
        let child = self.record(report);
        child.manifold.clone_from(manifold);
    }

    /// Record a child that produced no contacts
    pub fn on_child_completed_empty(&mut self, report: &ChildReport) {
        let child = self.record(report);
        child.manifold.contacts.clear();
    }

    fn record(&mut self, report: &ChildReport) -> &mut NonconvexReductionChild {
        debug_assert!(
            report.slot < self.children.len(),
            "child slot {} out of range for {} children",
            report.slot,
            self.children.len()
        );
        debug_assert!(
            self.completed_child_count < self.children.len(),
            "more children completed than were created"
        );
        self.completed_child_count += 1;

        let child = &mut self.children[report.slot];
        child.offset_a = report.offset_a;
        child.child_index_a = report.child_index_a;
        child.child_index_b = report.child_index_b;
        child
    }

    /// Merge every child manifold into one bounded manifold
    ///
    /// Consumes the slots; the reduction is empty afterwards.
    pub fn flush(&mut self, pair_id: PairId) -> NonconvexContactManifold {
        debug_assert!(self.is_complete(), "flushing before every child completed");

        let children = std::mem::take(&mut self.children);
        let offset_b = children
            .iter()
            .find(|child| !child.manifold.is_empty())
            .map(|child| child.manifold.offset_b)
            .unwrap_or_default();

        let mut candidates: Vec<NonconvexContact> = children
            .iter()
            .flat_map(|child| {
                let feature_offset = (child.child_index_a << 8) ^ (child.child_index_b << 16);
                child.manifold.contacts.iter().map(move |contact| NonconvexContact {
                    offset: child.offset_a + contact.offset,
                    normal: child.manifold.normal,
                    depth: contact.depth,
                    feature_id: contact.feature_id ^ feature_offset,
                })
            })
            .collect();

        let candidate_count = candidates.len();
        if candidates.len() > self.max_contacts {
            candidates = select_contacts(candidates, self.max_contacts);
        }

        tracing::trace!(
            "[NonconvexReduction] Pair {:?}: kept {} of {} contacts",
            pair_id,
            candidates.len(),
            candidate_count
        );

        NonconvexContactManifold {
            offset_b,
            contacts: candidates,
        }
    }
}

fn select_contacts(mut candidates: Vec<NonconvexContact>, max_contacts: usize) -> Vec<NonconvexContact> {
    let centroid =
        candidates.iter().map(|c| c.offset).sum::<Vec3>() / candidates.len() as f32;
    let extent_squared = candidates
        .iter()
        .map(|c| (c.offset - centroid).length_squared())
        .fold(0.0f32, f32::max)
        .max(1e-12);

    let mut selected = Vec::with_capacity(max_contacts);

    let deepest = candidates
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.depth.total_cmp(&b.depth))
        .map(|(index, _)| index)
        .unwrap_or(0);
    selected.push(candidates.swap_remove(deepest));

    while selected.len() < max_contacts && !candidates.is_empty() {
        let mut best_index = 0;
        let mut best_score = f32::MIN;
        for (index, candidate) in candidates.iter().enumerate() {
            let separation = selected
                .iter()
                .map(|kept: &NonconvexContact| {
                    (candidate.offset - kept.offset).length_squared()
                        + extent_squared * (1.0 - candidate.normal.dot(kept.normal))
                })
                .fold(f32::MAX, f32::min);
            // Speculative contacts only win when they add real coverage
            let score = if candidate.depth < 0.0 {
                separation * 0.5
            } else {
                separation
            };
            if score > best_score {
                best_score = score;
                best_index = index;
            }
        }
        selected.push(candidates.swap_remove(best_index));
    }
    selected
}
