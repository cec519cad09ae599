use crate::game::buildings::Footprint;
use crate::protocol::{AgentStateKind, Cell, Vec2};

// ── Marker Components ────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Agent;

#[derive(Debug, Clone)]
pub struct Building;

// ── Spatial ──────────────────────────────────────────────────────────

/// Continuous world-space position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn vec(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

impl From<Vec2> for Position {
    fn from(v: Vec2) -> Self {
        Position { x: v.x, y: v.y }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Facing {
    pub left: bool,
}

// ── Building Components ──────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct BuildingName {
    pub name: String,
}

/// Cell the footprint offsets are applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub cell: Cell,
}

#[derive(Debug, Clone)]
pub struct BuildingFootprint {
    pub footprint: Footprint,
}

/// What one agent visit pays out.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuildingYield {
    pub money: i64,
    pub faith: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragPhase {
    Idle,
    /// Footprint cells are released while in this phase.
    Dragging {
        /// Anchor before the drag began; restored on cancel or failed drop.
        origin: Cell,
        /// Offset from the anchor to the grabbed cell.
        grab: Cell,
    },
}

#[derive(Debug, Clone, Copy)]
pub struct BuildingDrag {
    pub phase: DragPhase,
}

impl Default for BuildingDrag {
    fn default() -> Self {
        BuildingDrag {
            phase: DragPhase::Idle,
        }
    }
}

// ── Agent Components ─────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct AgentState {
    pub state: AgentStateKind,
}

/// Current route as world-space waypoints.
#[derive(Debug, Clone, Default)]
pub struct AgentRoute {
    /// Logical cell of the agent: the entrance at spawn, then the goal of
    /// the latest route.
    pub cell: Cell,
    pub waypoints: Vec<Vec2>,
    pub next_waypoint: usize,
}

impl AgentRoute {
    pub fn at(cell: Cell) -> Self {
        AgentRoute {
            cell,
            waypoints: Vec::new(),
            next_waypoint: 0,
        }
    }

    pub fn current_waypoint(&self) -> Option<Vec2> {
        self.waypoints.get(self.next_waypoint).copied()
    }

    pub fn advance_waypoint(&mut self) {
        if self.next_waypoint < self.waypoints.len() {
            self.next_waypoint += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.next_waypoint >= self.waypoints.len()
    }

    pub fn set(&mut self, goal: Cell, waypoints: Vec<Vec2>) {
        self.cell = goal;
        self.waypoints = waypoints;
        self.next_waypoint = 0;
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RouteSwitches {
    pub count: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ScanTimer {
    pub elapsed: f32,
}
