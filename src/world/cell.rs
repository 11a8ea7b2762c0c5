/// One grid location: an obstacle, an agent, or nothing. Never both.
///
/// `agent` is the slot of the occupying agent in the owning state's agent
/// list, so copying a state never lets a cell point into another state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cell {
    obstacle: bool,
    agent: Option<usize>,
}

impl Cell {
    pub fn obstacle() -> Self {
        Cell {
            obstacle: true,
            agent: None,
        }
    }

    pub fn is_obstacle(&self) -> bool {
        self.obstacle
    }

    pub fn agent(&self) -> Option<usize> {
        self.agent
    }

    pub fn is_empty(&self) -> bool {
        !self.obstacle && self.agent.is_none()
    }

    /// Callers check `is_empty` first and raise a `WorldError` otherwise.
    pub(super) fn occupy(&mut self, slot: usize) {
        debug_assert!(self.is_empty());
        self.agent = Some(slot);
    }

    pub(super) fn sanity_check(&self) -> bool {
        !(self.obstacle && self.agent.is_some())
    }
}
