//! Contact manifolds exchanged between testers and reductions
//!
//! # Conventions
//!
//! - Contact offsets are measured from the origin of shape A.
//! - `offset_b` is the origin of shape B relative to shape A.
//! - Normals point from shape B toward shape A.
//! - Positive depth means penetration; negative depth is a speculative gap.
//!
//! # Feature id layout
//!
//! Bit 15 ([`FACE_COLLISION_FLAG`]) is reserved: triangle testers set it when a contact
//! came from a direct face hit, and [`MeshReduction`](crate::MeshReduction) reads and
//! clears it. Every other bit is an opaque tester-defined identifier used to match
//! contacts across frames. Testers must keep their own ids below bit 15.

use glam::Vec3;

/// Feature id bit marking a contact generated by a triangle face hit
pub const FACE_COLLISION_FLAG: u32 = 1 << 15;

/// Dot between contact normal and triangle normal above which testers set the face flag
pub const MINIMUM_DOT_FOR_FACE_COLLISION: f32 = 0.999999;

/// Identifies a collision pair in the caller's pair table
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PairId(pub u32);

/// One contact of a convex manifold
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Contact {
    pub offset: Vec3,
    pub depth: f32,
    pub feature_id: u32,
}

impl Contact {
    pub fn new(offset: Vec3, depth: f32, feature_id: u32) -> Self {
        Self {
            offset,
            depth,
            feature_id,
        }
    }

    pub fn is_face_collision(&self) -> bool {
        self.feature_id & FACE_COLLISION_FLAG != 0
    }
}

/// Contacts sharing a single normal, as produced by one convex-vs-triangle test
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConvexContactManifold {
    pub offset_b: Vec3,
    pub normal: Vec3,
    pub contacts: Vec<Contact>,
}

impl ConvexContactManifold {
    pub fn new(offset_b: Vec3, normal: Vec3) -> Self {
        Self {
            offset_b,
            normal,
            contacts: Vec::new(),
        }
    }

    pub fn with_contacts(offset_b: Vec3, normal: Vec3, contacts: Vec<Contact>) -> Self {
        Self {
            offset_b,
            normal,
            contacts,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }
}

/// Contact with its own normal, as produced by the non-convex reduction
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct NonconvexContact {
    pub offset: Vec3,
    pub normal: Vec3,
    pub depth: f32,
    pub feature_id: u32,
}

/// Final manifold for a pair involving a non-convex shape
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NonconvexContactManifold {
    pub offset_b: Vec3,
    pub contacts: Vec<NonconvexContact>,
}

impl NonconvexContactManifold {
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    /// Deepest contact, if any
    pub fn deepest(&self) -> Option<&NonconvexContact> {
        self.contacts
            .iter()
            .max_by(|a, b| a.depth.total_cmp(&b.depth))
    }
}
