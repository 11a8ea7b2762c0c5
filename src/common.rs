use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::map::Map;

/// Grid coordinate as `(x, y)`: `x` is the column, `y` the row.
pub type Position = (usize, usize);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Agent {
    pub id: usize,
    pub start: Position,
    pub goal: Position,
    /// Planned next cell for the current round, cleared on commit.
    #[serde(skip)]
    pub assignment: Option<Position>,
}

impl Agent {
    pub fn new(id: usize, start: Position, goal: Position) -> Self {
        Agent {
            id,
            start,
            goal,
            assignment: None,
        }
    }

    pub fn verify(&self, map: &Map) -> bool {
        map.is_passable(self.start.0, self.start.1) && map.is_passable(self.goal.0, self.goal.1)
    }
}

// This text is part of the canonical state string, keep it stable.
impl fmt::Display for Agent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "agent {} start ({}, {}) goal ({}, {}) assignment ",
            self.id, self.start.0, self.start.1, self.goal.0, self.goal.1
        )?;
        match self.assignment {
            Some((x, y)) => write!(f, "({x}, {y})"),
            None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Path {
    pub agent: usize,
    pub steps: Vec<Position>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Solution {
    pub paths: Vec<Path>,
}

impl Solution {
    /// Number of committed timesteps, every path has `makespan + 1` entries.
    pub fn makespan(&self) -> usize {
        self.paths
            .iter()
            .map(|path| path.steps.len().saturating_sub(1))
            .max()
            .unwrap_or(0)
    }

    pub fn verify(&self, map: &Map, agents: &[Agent]) -> bool {
        if self.paths.len() != agents.len() {
            return false;
        }

        for (path, agent) in self.paths.iter().zip(agents) {
            if path.agent != agent.id
                || path.steps.first() != Some(&agent.start)
                || path.steps.last() != Some(&agent.goal)
            {
                return false;
            }

            for window in path.steps.windows(2) {
                let (from, to) = (window[0], window[1]);
                if !map.is_passable(to.0, to.1) || chebyshev(from, to) > 1 {
                    return false;
                }
            }
        }

        let makespan = self.makespan();
        for time in 0..=makespan {
            let mut occupied = HashSet::new();
            for path in &self.paths {
                if !occupied.insert(position_at(path, time)) {
                    return false;
                }
            }

            if time == 0 {
                continue;
            }

            // Literal swaps: a goes to b's cell while b goes to a's cell.
            for i in 0..self.paths.len() {
                for j in (i + 1)..self.paths.len() {
                    let (a_prev, a_now) = (
                        position_at(&self.paths[i], time - 1),
                        position_at(&self.paths[i], time),
                    );
                    let (b_prev, b_now) = (
                        position_at(&self.paths[j], time - 1),
                        position_at(&self.paths[j], time),
                    );
                    if a_prev != a_now && a_now == b_prev && b_now == a_prev {
                        return false;
                    }
                }
            }
        }

        true
    }
}

fn position_at(path: &Path, time: usize) -> Position {
    path.steps
        .get(time)
        .copied()
        .unwrap_or_else(|| path.steps[path.steps.len() - 1])
}

pub fn chebyshev(a: Position, b: Position) -> usize {
    a.0.abs_diff(b.0).max(a.1.abs_diff(b.1))
}

pub fn euclidean(a: Position, b: Position) -> f64 {
    let dx = a.0 as f64 - b.0 as f64;
    let dy = a.1 as f64 - b.1 as f64;
    dx.hypot(dy)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_map() -> Map {
        Map::parse("type octile\nheight 3\nwidth 3\nmap\n...\n...\n...\n").unwrap()
    }

    #[test]
    fn test_agent_display_tracks_assignment() {
        let mut agent = Agent::new(3, (0, 1), (2, 2));
        assert_eq!(
            agent.to_string(),
            "agent 3 start (0, 1) goal (2, 2) assignment none"
        );
        agent.assignment = Some((1, 1));
        assert_eq!(
            agent.to_string(),
            "agent 3 start (0, 1) goal (2, 2) assignment (1, 1)"
        );
    }

    #[test]
    fn test_distances() {
        assert_eq!(chebyshev((0, 0), (2, 1)), 2);
        assert_eq!(chebyshev((1, 1), (1, 1)), 0);
        assert!((euclidean((0, 0), (3, 4)) - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_verify_accepts_diagonal_plan() {
        let map = open_map();
        let agents = vec![Agent::new(0, (0, 0), (2, 2))];
        let solution = Solution {
            paths: vec![Path {
                agent: 0,
                steps: vec![(0, 0), (1, 1), (2, 2)],
            }],
        };
        assert_eq!(solution.makespan(), 2);
        assert!(solution.verify(&map, &agents));
    }

    #[test]
    fn test_verify_rejects_swap_and_jump() {
        let map = open_map();
        let agents = vec![Agent::new(0, (0, 0), (1, 0)), Agent::new(1, (1, 0), (0, 0))];
        let swap = Solution {
            paths: vec![
                Path {
                    agent: 0,
                    steps: vec![(0, 0), (1, 0)],
                },
                Path {
                    agent: 1,
                    steps: vec![(1, 0), (0, 0)],
                },
            ],
        };
        assert!(!swap.verify(&map, &agents));

        let jump = Solution {
            paths: vec![Path {
                agent: 0,
                steps: vec![(0, 0), (2, 2)],
            }],
        };
        assert!(!jump.verify(&map, &[Agent::new(0, (0, 0), (2, 2))]));
    }
}
