use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, trace};

use super::{ClosedSet, Frontier, Membership};
use crate::common::{Path, Solution};
use crate::stat::Stats;
use crate::world::{CollisionRule, StateId, WorldError, WorldState};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    pub collision_rule: CollisionRule,
    /// Run fully-assigned states through the closed set like every other
    /// state. When off they are always expanded and never recorded.
    pub dedup_commit_states: bool,
    /// Stop with `LimitReached` after this many expansions.
    pub max_expansions: Option<usize>,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            collision_rule: CollisionRule::SwapOnly,
            dedup_commit_states: true,
            max_expansions: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchStatus {
    NotStarted,
    Searching,
    GoalFound(StateId),
    /// Frontier ran dry: no solution.
    Exhausted,
    LimitReached,
}

impl SearchStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SearchStatus::NotStarted | SearchStatus::Searching)
    }
}

/// Best-first search over operator-decomposed world states.
///
/// Every generated state lives in `arena`; `parent` links are indices into
/// it. The frontier and closed set only grow, `max_expansions` is the only
/// bound.
pub struct OdSearch {
    arena: Vec<WorldState>,
    frontier: Frontier,
    closed: ClosedSet,
    status: SearchStatus,
    options: SearchOptions,
    stats: Stats,
}

impl OdSearch {
    pub fn new(root: WorldState, options: SearchOptions) -> Self {
        OdSearch {
            arena: vec![root],
            frontier: Frontier::new(),
            closed: ClosedSet::new(),
            status: SearchStatus::NotStarted,
            options,
            stats: Stats::default(),
        }
    }

    pub fn root(&self) -> &WorldState {
        &self.arena[0]
    }

    pub fn state(&self, id: StateId) -> &WorldState {
        &self.arena[id]
    }

    pub fn status(&self) -> SearchStatus {
        self.status
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn frontier(&self) -> &Frontier {
        &self.frontier
    }

    pub fn closed(&self) -> &ClosedSet {
        &self.closed
    }

    /// Number of states generated so far, root included.
    pub fn generated(&self) -> usize {
        self.arena.len()
    }

    /// Expands the root without testing or closing it.
    pub fn start(&mut self) -> Result<(), WorldError> {
        if self.status != SearchStatus::NotStarted {
            return Ok(());
        }
        self.expand_into_frontier(0)?;
        self.status = SearchStatus::Searching;
        Ok(())
    }

    /// Pops and handles one frontier node. Terminal states are sticky.
    pub fn step(&mut self) -> Result<SearchStatus, WorldError> {
        match self.status {
            SearchStatus::NotStarted => {
                self.start()?;
                return Ok(self.status);
            }
            SearchStatus::Searching => {}
            terminal => return Ok(terminal),
        }

        if self
            .options
            .max_expansions
            .is_some_and(|limit| self.stats.expanded_nodes >= limit)
        {
            debug!("expansion limit reached");
            self.status = SearchStatus::LimitReached;
            return Ok(self.status);
        }

        let Some(id) = self.frontier.pop() else {
            debug!("frontier exhausted");
            self.status = SearchStatus::Exhausted;
            return Ok(self.status);
        };

        let state = &self.arena[id];
        trace!("pop node {id}: g {} f {:.3}", state.g(), state.f());

        if state.goal_test() {
            debug!("goal found at node {id}, steps {}", state.g());
            self.stats.costs = state.g();
            self.status = SearchStatus::GoalFound(id);
            return Ok(self.status);
        }

        if state.is_fully_assigned() && !self.options.dedup_commit_states {
            self.expand_into_frontier(id)?;
            return Ok(self.status);
        }

        let hash = state.state_hash();
        match self.closed.lookup(hash, state, &self.arena) {
            Membership::Closed => {
                self.stats.duplicates_skipped += 1;
            }
            membership => {
                if membership == Membership::HashCollision {
                    debug!("hash collision on {hash} at node {id}");
                    self.stats.hash_collisions += 1;
                }
                self.expand_into_frontier(id)?;
            }
        }
        self.closed.insert(hash, id, &self.arena);

        Ok(self.status)
    }

    #[instrument(skip_all, name = "od_search", level = "debug")]
    pub fn run(&mut self) -> Result<SearchStatus, WorldError> {
        let start_time = Instant::now();
        while !self.status.is_terminal() {
            self.step()?;
        }
        self.stats.time_us = start_time.elapsed().as_micros() as usize;
        info!("search finished: {:?}", self.status);
        Ok(self.status)
    }

    fn expand_into_frontier(&mut self, id: StateId) -> Result<(), WorldError> {
        let children = self.arena[id].expand(self.options.collision_rule)?;
        self.stats.expanded_nodes += 1;

        for mut child in children {
            child.check_invariants()?;
            child.set_parent(id);
            let f = child.f();
            let child_id = self.arena.len();
            self.arena.push(child);
            self.frontier.push(child_id, f);
            self.stats.generated_nodes += 1;
        }
        self.stats.max_frontier = self.stats.max_frontier.max(self.frontier.len());
        Ok(())
    }

    /// Ids from the root down to `goal`.
    pub fn reconstruct_path(&self, goal: StateId) -> Vec<StateId> {
        let mut ids = vec![goal];
        let mut current = goal;
        while let Some(parent) = self.arena[current].parent() {
            ids.push(parent);
            current = parent;
        }
        ids.reverse();
        ids
    }

    /// Committed states on the way to `goal`, one per timestep.
    pub fn timesteps(&self, goal: StateId) -> Vec<&WorldState> {
        self.reconstruct_path(goal)
            .into_iter()
            .map(|id| &self.arena[id])
            .filter(|state| state.is_committed())
            .collect()
    }

    /// Per-agent paths of the goal found, if any.
    pub fn solution(&self) -> Result<Option<Solution>, WorldError> {
        let SearchStatus::GoalFound(goal) = self.status else {
            return Ok(None);
        };

        let mut paths: Vec<Path> = self
            .root()
            .agents()
            .iter()
            .map(|agent| Path {
                agent: agent.id,
                steps: Vec::new(),
            })
            .collect();

        for state in self.timesteps(goal) {
            for (path, position) in paths.iter_mut().zip(state.agent_positions()?) {
                path.steps.push(position);
            }
        }
        Ok(Some(Solution { paths }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Agent;
    use crate::map::Map;

    fn init_tracing() {
        let _ = tracing_subscriber::fmt().with_env_filter("debug").try_init();
    }

    fn search(map: &Map, agents: &[Agent], options: SearchOptions) -> OdSearch {
        OdSearch::new(WorldState::new(map, agents).unwrap(), options)
    }

    #[test]
    fn test_start_expands_root_only() {
        init_tracing();
        let map = Map::open(3, 3);
        let mut od = search(&map, &[Agent::new(0, (0, 0), (2, 2))], SearchOptions::default());
        assert_eq!(od.status(), SearchStatus::NotStarted);

        od.start().unwrap();
        assert_eq!(od.status(), SearchStatus::Searching);
        assert_eq!(od.frontier().len(), 4);
        assert!(od.closed().is_empty());
        assert_eq!(od.stats().expanded_nodes, 1);

        // Best child heads diagonally.
        let (best, _) = od.frontier().iter().next().unwrap();
        assert_eq!(od.state(best).agents()[0].assignment, Some((1, 1)));
        assert_eq!(od.state(best).parent(), Some(0));
    }

    #[test]
    fn test_diagonal_plan_takes_two_steps() {
        init_tracing();
        let map = Map::open(3, 3);
        let agents = [Agent::new(0, (0, 0), (2, 2))];
        let mut od = search(&map, &agents, SearchOptions::default());

        let SearchStatus::GoalFound(goal) = od.run().unwrap() else {
            panic!("expected a goal");
        };
        assert_eq!(od.state(goal).g(), 2);

        let path = od.reconstruct_path(goal);
        assert_eq!(path.first(), Some(&0));
        assert_eq!(path.last(), Some(&goal));
        let steps: Vec<_> = od.timesteps(goal).iter().map(|state| state.g()).collect();
        assert_eq!(steps, vec![0, 1, 2]);

        let solution = od.solution().unwrap().unwrap();
        assert_eq!(solution.paths[0].steps, vec![(0, 0), (1, 1), (2, 2)]);
        assert!(solution.verify(&map, &agents));
        assert_eq!(od.stats().costs, 2);
    }

    #[test]
    fn test_corridor_swap_is_exhausted() {
        init_tracing();
        let map = Map::open(2, 1);
        let agents = [Agent::new(0, (0, 0), (1, 0)), Agent::new(1, (1, 0), (0, 0))];

        for options in [
            SearchOptions::default(),
            SearchOptions {
                dedup_commit_states: false,
                ..SearchOptions::default()
            },
        ] {
            let mut od = search(&map, &agents, options);
            assert_eq!(od.run().unwrap(), SearchStatus::Exhausted);
            assert!(od.solution().unwrap().is_none());
            assert!(od.stats().duplicates_skipped > 0);
        }
    }

    #[test]
    fn test_expansion_limit() {
        let map = Map::open(6, 6);
        let agents = [Agent::new(0, (0, 0), (5, 5)), Agent::new(1, (5, 5), (0, 0))];
        let mut od = search(
            &map,
            &agents,
            SearchOptions {
                max_expansions: Some(3),
                ..SearchOptions::default()
            },
        );
        assert_eq!(od.run().unwrap(), SearchStatus::LimitReached);
        assert_eq!(od.stats().expanded_nodes, 3);
        // Terminal status does not move.
        assert_eq!(od.step().unwrap(), SearchStatus::LimitReached);
    }

    #[test]
    fn test_goal_already_reached() {
        let map = Map::open(2, 2);
        let agents = [Agent::new(0, (1, 1), (1, 1))];
        let mut od = search(&map, &agents, SearchOptions::default());
        let SearchStatus::GoalFound(goal) = od.run().unwrap() else {
            panic!("expected a goal");
        };
        assert_eq!(od.state(goal).g(), 0);
        let solution = od.solution().unwrap().unwrap();
        assert_eq!(solution.paths[0].steps, vec![(1, 1)]);
    }
}
