use std::collections::HashMap;

use crate::world::{StateId, WorldState};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Membership {
    Closed,
    /// Same hash as a closed state, different configuration.
    HashCollision,
    Absent,
}

/// Expanded states bucketed by `state_hash`. A hit only counts once the
/// configurations compare equal, so a collision never prunes a new state.
#[derive(Debug, Default)]
pub struct ClosedSet {
    buckets: HashMap<u64, Vec<StateId>>,
    len: usize,
}

impl ClosedSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lookup(&self, hash: u64, state: &WorldState, arena: &[WorldState]) -> Membership {
        match self.buckets.get(&hash) {
            None => Membership::Absent,
            Some(ids) => {
                if ids.iter().any(|&id| arena[id].same_configuration(state)) {
                    Membership::Closed
                } else {
                    Membership::HashCollision
                }
            }
        }
    }

    /// Records `id` unless an equal configuration is already closed.
    pub fn insert(&mut self, hash: u64, id: StateId, arena: &[WorldState]) -> bool {
        let ids = self.buckets.entry(hash).or_default();
        if ids.iter().any(|&other| arena[other].same_configuration(&arena[id])) {
            return false;
        }
        ids.push(id);
        self.len += 1;
        true
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Agent;
    use crate::map::Map;
    use crate::world::CollisionRule;

    fn arena() -> Vec<WorldState> {
        let map = Map::open(3, 1);
        let root = WorldState::new(&map, &[Agent::new(0, (1, 0), (2, 0))]).unwrap();
        let mut arena = vec![root.clone(), root.clone()];
        arena.extend(root.expand(CollisionRule::SwapOnly).unwrap());
        arena
    }

    #[test]
    fn test_closed_matches_equal_configuration() {
        let arena = arena();
        let mut closed = ClosedSet::new();
        let hash = arena[0].state_hash();

        assert_eq!(closed.lookup(hash, &arena[1], &arena), Membership::Absent);
        assert!(closed.insert(hash, 0, &arena));
        assert_eq!(closed.lookup(hash, &arena[1], &arena), Membership::Closed);

        // Second copy of the same configuration is not stored again.
        assert!(!closed.insert(hash, 1, &arena));
        assert_eq!(closed.len(), 1);
    }

    #[test]
    fn test_forced_collision_is_not_a_duplicate() {
        let arena = arena();
        let mut closed = ClosedSet::new();

        // Pretend two different states hash to the same bucket.
        closed.insert(42, 0, &arena);
        assert_eq!(closed.lookup(42, &arena[2], &arena), Membership::HashCollision);
        assert!(closed.insert(42, 2, &arena));
        assert_eq!(closed.lookup(42, &arena[2], &arena), Membership::Closed);
        assert_eq!(closed.len(), 2);
        assert!(!closed.is_empty());
    }
}
