use std::collections::HashSet;
use std::fmt;
use std::fmt::Write as _;

use tracing::trace;

use super::{Cell, CollisionRule, StateId, WorldError};
use crate::common::{euclidean, Agent, Position};
use crate::map::Map;

/// Snapshot of the grid and every agent at one node of the search tree.
///
/// Children are always full copies of their parent with exactly one change
/// applied, so no two states ever share a grid or an agent list.
#[derive(Debug, Clone)]
pub struct WorldState {
    grid: Vec<Vec<Cell>>,
    agents: Vec<Agent>,
    next_unassigned: usize,
    steps_so_far: usize,
    parent: Option<StateId>,
}

impl WorldState {
    pub fn new(map: &Map, agents: &[Agent]) -> Result<Self, WorldError> {
        let mut ids = HashSet::new();
        for agent in agents {
            if !ids.insert(agent.id) {
                return Err(WorldError::DuplicateAgentId { agent: agent.id });
            }
        }

        let grid = map
            .grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|tile| {
                        if tile.is_passable() {
                            Cell::default()
                        } else {
                            Cell::obstacle()
                        }
                    })
                    .collect()
            })
            .collect();

        let mut state = WorldState {
            grid,
            agents: agents
                .iter()
                .map(|agent| Agent::new(agent.id, agent.start, agent.goal))
                .collect(),
            next_unassigned: 0,
            steps_so_far: 0,
            parent: None,
        };

        for (slot, agent) in agents.iter().enumerate() {
            state.place(slot, agent.start)?;
        }
        Ok(state)
    }

    pub fn width(&self) -> usize {
        self.grid.first().map_or(0, Vec::len)
    }

    pub fn height(&self) -> usize {
        self.grid.len()
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<&Cell> {
        self.grid.get(y).and_then(|row| row.get(x))
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn next_unassigned(&self) -> usize {
        self.next_unassigned
    }

    pub fn steps_so_far(&self) -> usize {
        self.steps_so_far
    }

    /// True on clean timestep boundaries, where nobody holds an assignment.
    pub fn is_committed(&self) -> bool {
        self.next_unassigned == 0
    }

    pub fn is_fully_assigned(&self) -> bool {
        self.next_unassigned == self.agents.len()
    }

    pub fn parent(&self) -> Option<StateId> {
        self.parent
    }

    pub(crate) fn set_parent(&mut self, parent: StateId) {
        self.parent = Some(parent);
    }

    /// Grid coordinates of every agent, by slot.
    pub fn agent_positions(&self) -> Result<Vec<Position>, WorldError> {
        let mut positions = vec![None; self.agents.len()];
        for (y, row) in self.grid.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let Some(slot) = cell.agent() {
                    positions[slot] = Some((x, y));
                }
            }
        }
        positions
            .into_iter()
            .zip(&self.agents)
            .map(|(position, agent)| position.ok_or(WorldError::MissingAgent { agent: agent.id }))
            .collect()
    }

    fn locate(&self, slot: usize) -> Result<Position, WorldError> {
        for (y, row) in self.grid.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if cell.agent() == Some(slot) {
                    return Ok((x, y));
                }
            }
        }
        Err(WorldError::MissingAgent {
            agent: self.agents[slot].id,
        })
    }

    fn place(&mut self, slot: usize, (x, y): Position) -> Result<(), WorldError> {
        let agent = self.agents[slot].id;
        let (width, height) = (self.width(), self.height());
        let cell = self
            .grid
            .get_mut(y)
            .and_then(|row| row.get_mut(x))
            .ok_or(WorldError::AgentOutOfBounds {
                agent,
                position: (x, y),
                width,
                height,
            })?;

        if cell.is_obstacle() {
            return Err(WorldError::AgentOnObstacle {
                agent,
                position: (x, y),
            });
        }
        if let Some(occupant) = cell.agent() {
            return Err(WorldError::CellOccupied {
                position: (x, y),
                occupant: self.agents[occupant].id,
                incoming: agent,
            });
        }
        cell.occupy(slot);
        Ok(())
    }

    /// Re-checks the cell and occupancy invariants of the whole grid.
    pub fn check_invariants(&self) -> Result<(), WorldError> {
        let mut seen = vec![false; self.agents.len()];
        for (y, row) in self.grid.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                let Some(slot) = cell.agent() else {
                    continue;
                };
                let agent = self.agents[slot].id;
                if !cell.sanity_check() {
                    return Err(WorldError::AgentOnObstacle {
                        agent,
                        position: (x, y),
                    });
                }
                if seen[slot] {
                    return Err(WorldError::DuplicateAgentId { agent });
                }
                seen[slot] = true;
            }
        }
        match seen.iter().position(|found| !found) {
            Some(slot) => Err(WorldError::MissingAgent {
                agent: self.agents[slot].id,
            }),
            None => Ok(()),
        }
    }

    /// All agents stand on their goals.
    pub fn goal_test(&self) -> bool {
        self.grid.iter().enumerate().all(|(y, row)| {
            row.iter().enumerate().all(|(x, cell)| match cell.agent() {
                Some(slot) => self.agents[slot].goal == (x, y),
                None => true,
            })
        })
    }

    /// Committed rounds so far. Not a shortest-path cost.
    pub fn g(&self) -> usize {
        self.steps_so_far
    }

    /// Sum of straight-line distances to the goals, measured from the
    /// in-flight assignment when one is set.
    ///
    /// Each term is a lower bound for its own agent, but the sum is not known
    /// to be admissible for the joint problem.
    pub fn h(&self) -> f64 {
        let mut distance = 0.0;
        for (y, row) in self.grid.iter().enumerate() {
            for (x, cell) in row.iter().enumerate() {
                if let Some(slot) = cell.agent() {
                    let agent = &self.agents[slot];
                    let current = agent.assignment.unwrap_or((x, y));
                    distance += euclidean(current, agent.goal);
                }
            }
        }
        distance
    }

    pub fn f(&self) -> f64 {
        self.g() as f64 + self.h()
    }

    /// Whether the agent in `slot`, standing on `from`, may move to `to` in
    /// the round being planned.
    pub fn is_legal_assignment(
        &self,
        slot: usize,
        from: Position,
        to: (isize, isize),
        rule: CollisionRule,
    ) -> bool {
        let (tx, ty) = to;
        if tx < 0 || ty < 0 || tx as usize >= self.width() || ty as usize >= self.height() {
            return false;
        }
        let target = (tx as usize, ty as usize);
        let cell = &self.grid[target.1][target.0];

        if cell.is_obstacle() {
            return false;
        }

        // Somebody already claimed this cell for the next timestep.
        if self
            .agents
            .iter()
            .enumerate()
            .any(|(other, agent)| other != slot && agent.assignment == Some(target))
        {
            return false;
        }

        // Direct swap with the occupant.
        if let Some(occupant) = cell.agent() {
            if occupant != slot && self.agents[occupant].assignment == Some(from) {
                return false;
            }
        }

        if rule == CollisionRule::NoCrossing && target.0 != from.0 && target.1 != from.1 {
            let corner_a = (target.0, from.1);
            let corner_b = (from.0, target.1);
            if self.moves_between(corner_a, corner_b) || self.moves_between(corner_b, corner_a) {
                return false;
            }
        }

        true
    }

    fn moves_between(&self, from: Position, to: Position) -> bool {
        self.grid[from.1][from.0]
            .agent()
            .is_some_and(|occupant| self.agents[occupant].assignment == Some(to))
    }

    /// Successors of this state. Children have no parent set; the search
    /// arena links them once it knows where this state lives.
    ///
    /// While agents remain unassigned, the next one in line gets one child per
    /// legal cell of its 3x3 neighbourhood (none if it is boxed in). Once all
    /// are assigned, the single child moves everybody at once.
    pub fn expand(&self, rule: CollisionRule) -> Result<Vec<WorldState>, WorldError> {
        if self.next_unassigned >= self.agents.len() {
            return Ok(vec![self.commit()?]);
        }

        let slot = self.next_unassigned;
        let (cx, cy) = self.locate(slot)?;

        let mut children = Vec::new();
        for dy in -1..=1_isize {
            for dx in -1..=1_isize {
                let to = (cx as isize + dx, cy as isize + dy);
                if !self.is_legal_assignment(slot, (cx, cy), to, rule) {
                    continue;
                }
                let mut child = self.clone();
                child.agents[slot].assignment = Some((to.0 as usize, to.1 as usize));
                child.next_unassigned += 1;
                child.parent = None;
                children.push(child);
            }
        }

        trace!(
            "agent {} at {:?}: {} legal assignments",
            self.agents[slot].id,
            (cx, cy),
            children.len()
        );
        Ok(children)
    }

    fn commit(&self) -> Result<WorldState, WorldError> {
        let targets = self
            .agents
            .iter()
            .map(|agent| {
                agent
                    .assignment
                    .ok_or(WorldError::UnassignedAgentAtCommit { agent: agent.id })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut child = self.clone();
        child.grid = self
            .grid
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        if cell.is_obstacle() {
                            Cell::obstacle()
                        } else {
                            Cell::default()
                        }
                    })
                    .collect()
            })
            .collect();

        for (slot, target) in targets.into_iter().enumerate() {
            child.place(slot, target)?;
        }
        for agent in child.agents.iter_mut() {
            agent.assignment = None;
        }
        child.next_unassigned = 0;
        child.steps_so_far += 1;
        child.parent = None;
        Ok(child)
    }

    /// Row-major occupancy (`x` obstacle, agent id, `_` empty) followed by
    /// every agent's text form.
    pub fn canonical_string(&self) -> String {
        let mut key = String::new();
        for row in &self.grid {
            for cell in row {
                if cell.is_obstacle() {
                    key.push('x');
                } else if let Some(slot) = cell.agent() {
                    let _ = write!(key, "{}", self.agents[slot].id);
                } else {
                    key.push('_');
                }
            }
        }
        for agent in &self.agents {
            let _ = write!(key, "{agent}");
        }
        key
    }

    /// Polynomial rolling hash (base 101) of `canonical_string`. Distinct
    /// states may collide; use `same_configuration` to confirm a match.
    pub fn state_hash(&self) -> u64 {
        self.canonical_string()
            .chars()
            .fold(0u64, |hash, c| hash.wrapping_mul(101).wrapping_add(c as u64))
    }

    /// Exact version of what the hash approximates: same obstacles, same
    /// agent on every cell, same agents with the same assignments.
    pub fn same_configuration(&self, other: &WorldState) -> bool {
        if self.agents != other.agents || self.grid.len() != other.grid.len() {
            return false;
        }
        self.grid.iter().zip(&other.grid).all(|(row, other_row)| {
            row.len() == other_row.len()
                && row.iter().zip(other_row).all(|(cell, other_cell)| {
                    cell.is_obstacle() == other_cell.is_obstacle()
                        && cell.agent().map(|slot| self.agents[slot].id)
                            == other_cell.agent().map(|slot| other.agents[slot].id)
                })
        })
    }
}

impl fmt::Display for WorldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.grid {
            for cell in row {
                if cell.is_obstacle() {
                    write!(f, "x ")?;
                } else if let Some(slot) = cell.agent() {
                    write!(f, "{} ", self.agents[slot].id)?;
                } else {
                    write!(f, "_ ")?;
                }
            }
            writeln!(f)?;
        }
        for agent in &self.agents {
            writeln!(f, "{agent}")?;
        }
        write!(f, "next unassigned agent = {}", self.next_unassigned)
    }
}
