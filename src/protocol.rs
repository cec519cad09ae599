use std::fmt;

use serde::{Deserialize, Serialize};

// ── Core type aliases ──────────────────────────────────────────────

pub type EntityId = u64;
pub type Tick = u64;

// ── Geometry ───────────────────────────────────────────────────────

/// Integer grid coordinate. The derived ordering (`x`, then `y`) is only
/// used to enumerate cells deterministically.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
pub struct Cell {
    pub x: i32,
    pub y: i32,
}

impl Cell {
    pub const fn new(x: i32, y: i32) -> Self {
        Cell { x, y }
    }

    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Cell {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    pub fn step(self, dir: Direction) -> Self {
        let (dx, dy) = dir.delta();
        self.offset(dx, dy)
    }

    /// The four orthogonal neighbours in `Direction::ALL` order.
    pub fn neighbors(self) -> [Cell; 4] {
        Direction::ALL.map(|dir| self.step(dir))
    }

    /// Euclidean distance between the centres of two cells, in cell units.
    pub fn distance(self, other: Cell) -> f32 {
        let dx = (self.x - other.x) as f32;
        let dy = (self.y - other.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Orthogonal grid directions. `y` grows upwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Right,
    Left,
    Down,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Right,
        Direction::Left,
        Direction::Down,
    ];

    pub const fn delta(self) -> (i32, i32) {
        match self {
            Direction::Up => (0, 1),
            Direction::Right => (1, 0),
            Direction::Left => (-1, 0),
            Direction::Down => (0, -1),
        }
    }

    /// Bit of this direction in a connectivity mask (`up<<3 | right<<2 | left<<1 | down`).
    pub const fn bit(self) -> u8 {
        match self {
            Direction::Up => 0b1000,
            Direction::Right => 0b0100,
            Direction::Left => 0b0010,
            Direction::Down => 0b0001,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

// ── Networks & autotiling ──────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkKind {
    Path,
    Wall,
}

impl fmt::Display for NetworkKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkKind::Path => f.write_str("path"),
            NetworkKind::Wall => f.write_str("wall"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CanonicalShape {
    Isolated,
    Stub,
    Straight,
    Turn,
    TJunction,
    Cross,
}

/// Clockwise rotation applied to a base sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Rotation {
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    pub const ALL: [Rotation; 4] = [
        Rotation::Deg0,
        Rotation::Deg90,
        Rotation::Deg180,
        Rotation::Deg270,
    ];

    pub const fn quarter_turns(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    pub const fn degrees(self) -> u16 {
        self.quarter_turns() as u16 * 90
    }
}

/// What the rendering layer needs to draw one segment: a base sprite plus
/// its transform. The core never picks concrete art assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteKey {
    pub shape: CanonicalShape,
    pub rotation: Rotation,
    pub flip_x: bool,
}

// ── Agents ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStateKind {
    Idle,
    MovingAlongPath,
    Returning,
    Despawning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Money,
    Faith,
}

// ── Input ──────────────────────────────────────────────────────────

/// Discrete gestures delivered by whatever input layer drives the sandbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gesture {
    Press { cell: Cell },
    DragTo { cell: Cell },
    Release,
    Cancel,
}

/// Which tool the gestures are currently routed to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ToolMode {
    Inactive,
    Path,
    Wall,
    Building { name: String },
    Mover,
    Remover,
    Eraser,
}

// ── Render snapshots (core → rendering layer) ──────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SegmentSnapshot {
    pub cell: Cell,
    pub kind: NetworkKind,
    pub mask: u8,
    pub sprite: SpriteKey,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewSnapshot {
    pub cell: Cell,
    pub kind: NetworkKind,
    pub sprite: SpriteKey,
    pub placeable: bool,
}

/// One cell of a building footprint being placed or dragged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FootprintCellSnapshot {
    pub cell: Cell,
    pub placeable: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    pub id: EntityId,
    pub name: String,
    pub anchor: Cell,
    pub cells: Vec<Cell>,
    pub dragging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: EntityId,
    pub position: Vec2,
    pub state: AgentStateKind,
    pub facing_left: bool,
    pub route_switches: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurseSnapshot {
    pub money: i64,
    pub faith: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderSnapshot {
    pub tick: Tick,
    pub segments: Vec<SegmentSnapshot>,
    pub preview: Vec<PreviewSnapshot>,
    pub footprint_preview: Vec<FootprintCellSnapshot>,
    pub buildings: Vec<BuildingSnapshot>,
    pub agents: Vec<AgentSnapshot>,
    pub purse: PurseSnapshot,
}
