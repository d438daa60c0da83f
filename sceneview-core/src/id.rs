//! Stable node identities

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Integer identity assigned to a scene node when it is created.
///
/// Ids are handed out in creation order by a [`NodeIdAllocator`] and never
/// derived from node content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Raw integer value of this id
    pub fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u32> for NodeId {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// Monotonic id source shared by everything that creates nodes for one scene.
///
/// Cloning the allocator shares the counter, so a loader running on another
/// task keeps allocating from the same sequence as its viewer.
#[derive(Debug, Clone, Default)]
pub struct NodeIdAllocator {
    next: Arc<AtomicU32>,
}

impl NodeIdAllocator {
    /// Create an allocator whose first id is 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an allocator whose first id is `start`
    pub fn starting_at(start: u32) -> Self {
        Self {
            next: Arc::new(AtomicU32::new(start)),
        }
    }

    /// Allocate the next id
    pub fn allocate(&self) -> NodeId {
        NodeId(self.next.fetch_add(1, Ordering::Relaxed))
    }

    /// Id the next call to [`allocate`](Self::allocate) will return
    pub fn peek(&self) -> NodeId {
        NodeId(self.next.load(Ordering::Relaxed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocation_is_monotonic() {
        let ids = NodeIdAllocator::new();
        assert_eq!(ids.allocate(), NodeId(0));
        assert_eq!(ids.allocate(), NodeId(1));
        assert_eq!(ids.peek(), NodeId(2));
    }

    #[test]
    fn test_clones_share_sequence() {
        let ids = NodeIdAllocator::starting_at(10);
        let other = ids.clone();
        assert_eq!(ids.allocate(), NodeId(10));
        assert_eq!(other.allocate(), NodeId(11));
        assert_eq!(ids.allocate(), NodeId(12));
    }
}
