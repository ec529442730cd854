//! Pooled scratch buffers for pair and query lifetimes
//!
//! Buffers are handed out as owned `Vec`s and come back through [`Pool::give_back`],
//! which consumes them, so a buffer cannot be returned twice.

use crate::reduction::TestTriangle;
use crate::triangle::Triangle;

/// Free list of reusable vectors of one element type
#[derive(Debug)]
pub struct Pool<T> {
    free: Vec<Vec<T>>,
    outstanding: usize,
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self {
            free: Vec::new(),
            outstanding: 0,
        }
    }
}

impl<T> Pool<T> {
    /// Take an empty buffer with room for at least `capacity` elements
    pub fn take(&mut self, capacity: usize) -> Vec<T> {
        self.outstanding += 1;
        match self.free.pop() {
            Some(mut buffer) => {
                buffer.reserve(capacity);
                buffer
            }
            None => Vec::with_capacity(capacity),
        }
    }

    /// Return a buffer taken from this pool
    pub fn give_back(&mut self, mut buffer: Vec<T>) {
        debug_assert!(self.outstanding > 0, "returned a buffer that was never taken");
        self.outstanding = self.outstanding.saturating_sub(1);
        buffer.clear();
        self.free.push(buffer);
    }

    /// Buffers currently taken and not yet returned
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Buffers waiting for reuse
    pub fn available(&self) -> usize {
        self.free.len()
    }
}

/// Memory shared by every pair processed on one thread
#[derive(Debug, Default)]
pub struct BufferPool {
    /// Per-pair scaled triangle buffers, released on flush
    pub triangles: Pool<Triangle>,
    /// Per-query overlap index lists
    pub indices: Pool<u32>,
    /// Active-triangle working set of one correction pass
    pub test_triangles: Pool<TestTriangle>,
}

impl BufferPool {
    /// Buffers taken from any sub-pool and not yet returned
    pub fn outstanding(&self) -> usize {
        self.triangles.outstanding() + self.indices.outstanding() + self.test_triangles.outstanding()
    }
}
