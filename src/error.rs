//! Error types shared by every sandbox subsystem.
//!
//! All domain errors are recoverable: callers inspect the result and branch,
//! nothing here should abort the frame loop.

use thiserror::Error;

use crate::game::occupancy::Claimant;
use crate::protocol::Cell;

/// Why a cell refused a segment or footprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementBlock {
    /// The terrain has no tile at the cell.
    NoTerrain,
    /// Another claimant already holds the cell.
    Occupied,
}

#[derive(Debug, Error)]
pub enum SandboxError {
    #[error("cannot place at {cell}: {reason:?}")]
    InvalidPlacement { cell: Cell, reason: PlacementBlock },

    #[error("no path from {start} to {goal}")]
    PathNotFound { start: Cell, goal: Cell },

    #[error("no endpoint reachable from {from}")]
    EndpointUnavailable { from: Cell },

    /// A double claim or a free of a cell the claimant does not hold.
    /// This is a broken caller contract, not a normal runtime condition.
    #[error("occupancy violation at {cell}: {claimant:?} collides with {holder:?}")]
    OccupancyViolation {
        cell: Cell,
        claimant: Claimant,
        holder: Option<Claimant>,
    },

    #[error("cannot afford {price} with {balance} money")]
    InsufficientFunds { price: i64, balance: i64 },

    #[error("unknown building `{0}`")]
    UnknownBuilding(String),

    #[error("entity {0:?} is not a building")]
    NotABuilding(hecs::Entity),

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SandboxError>;
