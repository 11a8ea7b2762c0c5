use std::collections::VecDeque;

use crate::world::StateId;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    f: f64,
    id: StateId,
}

/// Open list kept sorted by ascending `f`. A new entry goes behind every
/// entry whose `f` is not greater than its own, so equal costs pop in
/// insertion order.
#[derive(Debug, Default)]
pub struct Frontier {
    entries: VecDeque<Entry>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, id: StateId, f: f64) {
        let index = self.entries.partition_point(|entry| entry.f <= f);
        self.entries.insert(index, Entry { f, id });
    }

    pub fn pop(&mut self) -> Option<StateId> {
        self.entries.pop_front().map(|entry| entry.id)
    }

    pub fn peek_f(&self) -> Option<f64> {
        self.entries.front().map(|entry| entry.f)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries front to back as `(id, f)`.
    pub fn iter(&self) -> impl Iterator<Item = (StateId, f64)> + '_ {
        self.entries.iter().map(|entry| (entry.id, entry.f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontier_sorted_with_fifo_ties() {
        let mut frontier = Frontier::new();
        for (id, f) in [(0, 3.0), (1, 1.5), (2, 3.0), (3, 0.5), (4, 1.5), (5, 9.0), (6, 3.0)] {
            frontier.push(id, f);
        }

        let order: Vec<_> = frontier.iter().collect();
        assert_eq!(
            order,
            vec![
                (3, 0.5),
                (1, 1.5),
                (4, 1.5),
                (0, 3.0),
                (2, 3.0),
                (6, 3.0),
                (5, 9.0)
            ]
        );
        assert_eq!(frontier.peek_f(), Some(0.5));
        assert_eq!(frontier.len(), 7);
    }

    #[test]
    fn test_frontier_pop_drains_in_order() {
        let mut frontier = Frontier::new();
        assert!(frontier.is_empty());
        assert_eq!(frontier.pop(), None);

        frontier.push(10, 2.0);
        frontier.push(11, 1.0);
        frontier.push(12, 2.0);
        assert_eq!(frontier.pop(), Some(11));
        frontier.push(13, 1.0);
        assert_eq!(frontier.pop(), Some(13));
        assert_eq!(frontier.pop(), Some(10));
        assert_eq!(frontier.pop(), Some(12));
        assert!(frontier.is_empty());
    }
}
