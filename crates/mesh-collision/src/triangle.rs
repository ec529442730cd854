use crate::collision::Aabb;
use glam::Vec3;

/// A mesh triangle
///
/// Front face is the counter-clockwise side: `normalize((b - a) × (c - a))`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    /// Compute the AABB for a triangle
    pub fn bounds(&self) -> Aabb {
        Aabb::new(
            self.a.min(self.b).min(self.c),
            self.a.max(self.b).max(self.c),
        )
    }

    /// Component-wise scaled copy
    pub fn scaled(&self, scale: Vec3) -> Triangle {
        Triangle {
            a: self.a * scale,
            b: self.b * scale,
            c: self.c * scale,
        }
    }

    /// Unit face normal; not finite for degenerate triangles
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize()
    }

    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }
}
