mod cell;
mod state;

pub use cell::Cell;
pub use state::WorldState;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::common::Position;

/// Index of a state inside the search arena.
pub type StateId = usize;

/// Broken grid invariants. These are logic defects: whoever sees one should
/// stop the search instead of carrying on with a corrupted state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WorldError {
    #[error("agent {agent} placed on obstacle cell {position:?}")]
    AgentOnObstacle { agent: usize, position: Position },

    #[error("agent {incoming} placed on {position:?} already held by agent {occupant}")]
    CellOccupied {
        position: Position,
        occupant: usize,
        incoming: usize,
    },

    #[error("agent {agent} at {position:?} is outside the {width}x{height} grid")]
    AgentOutOfBounds {
        agent: usize,
        position: Position,
        width: usize,
        height: usize,
    },

    #[error("agent {agent} is not on the grid")]
    MissingAgent { agent: usize },

    #[error("agent id {agent} appears more than once")]
    DuplicateAgentId { agent: usize },

    #[error("agent {agent} has no assignment at commit")]
    UnassignedAgentAtCommit { agent: usize },
}

/// Which simultaneous moves count as a collision besides two agents
/// claiming the same cell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionRule {
    /// Only a literal two-cell swap is rejected. Two agents may still cut
    /// across each other diagonally in the same timestep.
    #[default]
    SwapOnly,
    /// Also rejects diagonal moves that cross another agent's diagonal move
    /// through the same 2x2 block.
    NoCrossing,
}
