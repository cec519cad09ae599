use std::collections::{HashMap, HashSet};

use noise::{NoiseFn, Simplex};

use crate::protocol::{Cell, Vec2};

pub const CHUNK_SIZE: usize = 32;

/// Read-only oracle of which cells can hold anything, and how cells map to
/// world space.
pub trait TerrainProvider {
    fn has_tile_at(&self, cell: Cell) -> bool;

    /// World-space edge length of one cell.
    fn tile_size(&self) -> f32;

    /// World-space centre of `cell`.
    fn cell_to_world(&self, cell: Cell) -> Vec2 {
        let size = self.tile_size();
        Vec2 {
            x: (cell.x as f32 + 0.5) * size,
            y: (cell.y as f32 + 0.5) * size,
        }
    }

    fn world_to_cell(&self, point: Vec2) -> Cell {
        let size = self.tile_size();
        Cell {
            x: (point.x / size).floor() as i32,
            y: (point.y / size).floor() as i32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terrain {
    Grass,
    Stone,
    Water,
    Dirt,
}

impl Terrain {
    /// Water is the only terrain that carries no placeable tile.
    pub fn is_placeable(self) -> bool {
        self != Terrain::Water
    }
}

pub struct Chunk {
    pub cx: i32,
    pub cy: i32,
    pub tiles: [[Terrain; CHUNK_SIZE]; CHUNK_SIZE],
}

impl Chunk {
    /// Generate terrain for a chunk using simplex noise.
    ///
    /// Noise value thresholds:
    /// - < -0.3 => Water
    /// - < 0.0  => Dirt
    /// - > 0.5  => Stone
    /// - else   => Grass
    pub fn generate(cx: i32, cy: i32, seed: u32) -> Self {
        let noise_fn = Simplex::new(seed);
        let mut tiles = [[Terrain::Grass; CHUNK_SIZE]; CHUNK_SIZE];

        let scale = 0.05;

        for ty in 0..CHUNK_SIZE {
            for tx in 0..CHUNK_SIZE {
                let world_x = (cx as f64 * CHUNK_SIZE as f64 + tx as f64) * scale;
                let world_y = (cy as f64 * CHUNK_SIZE as f64 + ty as f64) * scale;

                let value = noise_fn.get([world_x, world_y]);

                tiles[ty][tx] = if value < -0.3 {
                    Terrain::Water
                } else if value < 0.0 {
                    Terrain::Dirt
                } else if value > 0.5 {
                    Terrain::Stone
                } else {
                    Terrain::Grass
                };
            }
        }

        Chunk { cx, cy, tiles }
    }

    pub fn terrain_at(&self, tx: usize, ty: usize) -> Terrain {
        self.tiles[ty][tx]
    }
}

/// Noise-generated world made of fixed-size chunks. Only generated chunks
/// carry tiles; everything beyond them is off the map.
pub struct TileMap {
    pub chunks: HashMap<(i32, i32), Chunk>,
    pub seed: u32,
    pub tile_size: f32,
}

impl TileMap {
    pub fn new(seed: u32) -> Self {
        TileMap {
            chunks: HashMap::new(),
            seed,
            tile_size: 1.0,
        }
    }

    pub fn with_tile_size(mut self, tile_size: f32) -> Self {
        self.tile_size = tile_size;
        self
    }

    /// Lazily generate and return a reference to the chunk at (cx, cy).
    pub fn get_or_generate(&mut self, cx: i32, cy: i32) -> &Chunk {
        self.chunks
            .entry((cx, cy))
            .or_insert_with(|| Chunk::generate(cx, cy, self.seed))
    }

    /// Generate every chunk within `radius` chunks of the chunk holding `center`.
    pub fn generate_around(&mut self, center: Cell, radius: i32) {
        let (ccx, ccy) = Self::cell_to_chunk(center);
        for cy in ccy - radius..=ccy + radius {
            for cx in ccx - radius..=ccx + radius {
                self.get_or_generate(cx, cy);
            }
        }
    }

    pub fn cell_to_chunk(cell: Cell) -> (i32, i32) {
        (
            cell.x.div_euclid(CHUNK_SIZE as i32),
            cell.y.div_euclid(CHUNK_SIZE as i32),
        )
    }

    pub fn terrain_at(&self, cell: Cell) -> Option<Terrain> {
        let chunk = self.chunks.get(&Self::cell_to_chunk(cell))?;
        let tx = cell.x.rem_euclid(CHUNK_SIZE as i32) as usize;
        let ty = cell.y.rem_euclid(CHUNK_SIZE as i32) as usize;
        Some(chunk.terrain_at(tx, ty))
    }
}

impl TerrainProvider for TileMap {
    fn has_tile_at(&self, cell: Cell) -> bool {
        self.terrain_at(cell).is_some_and(Terrain::is_placeable)
    }

    fn tile_size(&self) -> f32 {
        self.tile_size
    }
}

/// Rectangular patch of ground, inclusive on both corners, with optional holes.
#[derive(Debug, Clone)]
pub struct BoundedTerrain {
    pub min: Cell,
    pub max: Cell,
    pub tile_size: f32,
    pub holes: HashSet<Cell>,
}

impl BoundedTerrain {
    pub fn new(min: Cell, max: Cell) -> Self {
        BoundedTerrain {
            min,
            max,
            tile_size: 1.0,
            holes: HashSet::new(),
        }
    }

    pub fn with_tile_size(mut self, tile_size: f32) -> Self {
        self.tile_size = tile_size;
        self
    }

    pub fn with_hole(mut self, cell: Cell) -> Self {
        self.holes.insert(cell);
        self
    }
}

impl TerrainProvider for BoundedTerrain {
    fn has_tile_at(&self, cell: Cell) -> bool {
        (self.min.x..=self.max.x).contains(&cell.x)
            && (self.min.y..=self.max.y).contains(&cell.y)
            && !self.holes.contains(&cell)
    }

    fn tile_size(&self) -> f32 {
        self.tile_size
    }
}
