//! Identity types for the flow graph.
//!
//! Both IDs are newtypes over `u32` that index directly into the flow's
//! storage vectors.

use std::fmt;

/// Index into the flow's actor list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ActorId(pub u32);

impl ActorId {
    pub const INVALID: ActorId = ActorId(u32::MAX);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }

    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == Self::INVALID {
            write!(f, "ActorId(INVALID)")
        } else {
            write!(f, "ActorId({})", self.0)
        }
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Index into the flow's edge list.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeId(pub u32);

impl EdgeId {
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_id() {
        let id = ActorId(42);
        assert!(id.is_valid());
        assert_eq!(id.index(), 42);
        assert!(!ActorId::INVALID.is_valid());
        assert_eq!(format!("{}", ActorId::INVALID), "ActorId(INVALID)");
    }

    #[test]
    fn test_edge_id() {
        assert_eq!(EdgeId(5).index(), 5);
        assert_eq!(format!("{:?}", EdgeId(5)), "EdgeId(5)");
    }
}
