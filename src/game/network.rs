use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{PlacementBlock, Result, SandboxError};
use crate::game::autotile::{connectivity_mask, sprite_for_mask};
use crate::game::line::cells_between;
use crate::game::occupancy::{Claimant, GridOccupancy};
use crate::game::tilemap::TerrainProvider;
use crate::protocol::{Cell, Direction, NetworkKind, PreviewSnapshot, SegmentSnapshot, SpriteKey};

/// One network member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    pub kind: NetworkKind,
    pub mask: u8,
    pub sprite: SpriteKey,
}

impl Segment {
    fn new(kind: NetworkKind, mask: u8) -> Self {
        Segment {
            kind,
            mask,
            sprite: sprite_for_mask(mask),
        }
    }
}

/// Outcome of placing a run of segments along a drag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinePlacement {
    pub placed: Vec<Cell>,
    pub rejected: Vec<(Cell, PlacementBlock)>,
}

/// Check whether a cell can take a new claimant.
pub fn check_cell(
    cell: Cell,
    terrain: &dyn TerrainProvider,
    occupancy: &GridOccupancy,
) -> std::result::Result<(), PlacementBlock> {
    if !terrain.has_tile_at(cell) {
        Err(PlacementBlock::NoTerrain)
    } else if occupancy.is_occupied(cell) {
        Err(PlacementBlock::Occupied)
    } else {
        Ok(())
    }
}

/// Incrementally maintained network of same-kind segments.
///
/// Every placement or removal claims/frees the cell in the shared occupancy
/// and updates the map in the same call, then recomputes the masks of the
/// touched cell and its orthogonal members once the map is settled.
#[derive(Debug)]
pub struct TileNetwork {
    kind: NetworkKind,
    segments: HashMap<Cell, Segment>,
}

impl TileNetwork {
    pub fn new(kind: NetworkKind) -> Self {
        TileNetwork {
            kind,
            segments: HashMap::new(),
        }
    }

    pub fn kind(&self) -> NetworkKind {
        self.kind
    }

    fn claimant(&self) -> Claimant {
        Claimant::Segment(self.kind)
    }

    pub fn contains(&self, cell: Cell) -> bool {
        self.segments.contains_key(&cell)
    }

    pub fn segment(&self, cell: Cell) -> Option<&Segment> {
        self.segments.get(&cell)
    }

    pub fn sprite_at(&self, cell: Cell) -> Option<SpriteKey> {
        self.segments.get(&cell).map(|s| s.sprite)
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// All member cells, sorted.
    pub fn cells(&self) -> Vec<Cell> {
        let mut cells: Vec<Cell> = self.segments.keys().copied().collect();
        cells.sort();
        cells
    }

    pub fn place_segment(
        &mut self,
        cell: Cell,
        terrain: &dyn TerrainProvider,
        occupancy: &mut GridOccupancy,
    ) -> Result<()> {
        if let Err(reason) = check_cell(cell, terrain, occupancy) {
            debug!("cannot place {} at {}: {:?}", self.kind, cell, reason);
            return Err(SandboxError::InvalidPlacement { cell, reason });
        }

        occupancy.mark_occupied(cell, self.claimant())?;
        self.segments.insert(cell, Segment::new(self.kind, 0));
        self.refresh_around(cell);

        debug!("{} placed at {}", self.kind, cell);
        Ok(())
    }

    /// Remove the segment at `cell`. Returns `false` if there was none.
    pub fn remove_segment(&mut self, cell: Cell, occupancy: &mut GridOccupancy) -> Result<bool> {
        if !self.contains(cell) {
            return Ok(false);
        }

        occupancy.mark_unoccupied(cell, self.claimant())?;
        self.segments.remove(&cell);
        self.refresh_around(cell);

        debug!("{} removed at {}", self.kind, cell);
        Ok(true)
    }

    /// Place a segment on every cell of the digital line from `start` to
    /// `end`, in order. Each cell is validated when it is reached, so earlier
    /// placements along the same drag are already visible to it.
    pub fn place_line(
        &mut self,
        start: Cell,
        end: Cell,
        terrain: &dyn TerrainProvider,
        occupancy: &mut GridOccupancy,
    ) -> Result<LinePlacement> {
        let mut report = LinePlacement::default();
        for cell in cells_between(start, end) {
            match self.place_segment(cell, terrain, occupancy) {
                Ok(()) => report.placed.push(cell),
                Err(SandboxError::InvalidPlacement { cell, reason }) => {
                    report.rejected.push((cell, reason))
                }
                Err(e) => return Err(e),
            }
        }
        info!(
            "{} drag {} -> {}: {} placed, {} rejected",
            self.kind,
            start,
            end,
            report.placed.len(),
            report.rejected.len()
        );
        Ok(report)
    }

    /// Lay a straight run of `len` cells from `start` heading `dir`.
    /// Returns how many were placed.
    pub fn seed_run(
        &mut self,
        start: Cell,
        dir: Direction,
        len: u32,
        terrain: &dyn TerrainProvider,
        occupancy: &mut GridOccupancy,
    ) -> Result<usize> {
        let len = i32::try_from(len)
            .map_err(|_| SandboxError::Config(format!("run of {} cells does not fit the grid", len)))?;
        let (dx, dy) = dir.delta();
        let mut placed = 0;
        for i in 0..len {
            let cell = start.offset(dx * i, dy * i);
            match self.place_segment(cell, terrain, occupancy) {
                Ok(()) => placed += 1,
                Err(SandboxError::InvalidPlacement { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(placed)
    }

    /// Number of orthogonal neighbours that are members.
    pub fn degree(&self, cell: Cell) -> usize {
        cell.neighbors()
            .iter()
            .filter(|n| self.segments.contains_key(n))
            .count()
    }

    pub fn is_endpoint(&self, cell: Cell) -> bool {
        self.contains(cell) && self.degree(cell) == 1
    }

    /// Member cells of degree exactly one, sorted.
    pub fn endpoints(&self) -> Vec<Cell> {
        let mut ends: Vec<Cell> = self
            .segments
            .keys()
            .copied()
            .filter(|c| self.degree(*c) == 1)
            .collect();
        ends.sort();
        ends
    }

    /// Orthogonal members of `cell`, in `Direction::ALL` order.
    pub fn neighbors(&self, cell: Cell) -> impl Iterator<Item = Cell> + '_ {
        cell.neighbors()
            .into_iter()
            .filter(move |n| self.segments.contains_key(n))
    }

    pub fn snapshot(&self) -> Vec<SegmentSnapshot> {
        self.cells()
            .into_iter()
            .filter_map(|cell| {
                self.segments.get(&cell).map(|seg| SegmentSnapshot {
                    cell,
                    kind: seg.kind,
                    mask: seg.mask,
                    sprite: seg.sprite,
                })
            })
            .collect()
    }

    fn refresh(&mut self, cell: Cell) {
        let mask = connectivity_mask(cell, |c| self.segments.contains_key(&c));
        if let Some(seg) = self.segments.get_mut(&cell) {
            seg.mask = mask;
            seg.sprite = sprite_for_mask(mask);
        }
    }

    fn refresh_around(&mut self, cell: Cell) {
        self.refresh(cell);
        for neighbor in cell.neighbors() {
            self.refresh(neighbor);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewCell {
    pub mask: u8,
    pub sprite: SpriteKey,
    pub placeable: bool,
}

/// Throwaway mirror of a drag for UI feedback. Masks are computed against the
/// preview cells only, and nothing here ever touches occupancy.
#[derive(Debug)]
pub struct SegmentPreview {
    kind: NetworkKind,
    cells: HashMap<Cell, PreviewCell>,
}

impl SegmentPreview {
    pub fn new(kind: NetworkKind) -> Self {
        SegmentPreview {
            kind,
            cells: HashMap::new(),
        }
    }

    pub fn rebuild(
        &mut self,
        start: Cell,
        end: Cell,
        terrain: &dyn TerrainProvider,
        occupancy: &GridOccupancy,
    ) {
        self.cells.clear();
        for cell in cells_between(start, end) {
            let placeable = check_cell(cell, terrain, occupancy).is_ok();
            self.cells.insert(
                cell,
                PreviewCell {
                    mask: 0,
                    sprite: sprite_for_mask(0),
                    placeable,
                },
            );
        }

        let masks: Vec<(Cell, u8)> = self
            .cells
            .keys()
            .map(|&cell| (cell, connectivity_mask(cell, |c| self.cells.contains_key(&c))))
            .collect();
        for (cell, mask) in masks {
            if let Some(preview) = self.cells.get_mut(&cell) {
                preview.mask = mask;
                preview.sprite = sprite_for_mask(mask);
            }
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn get(&self, cell: Cell) -> Option<&PreviewCell> {
        self.cells.get(&cell)
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn snapshot(&self) -> Vec<PreviewSnapshot> {
        let mut out: Vec<PreviewSnapshot> = self
            .cells
            .iter()
            .map(|(cell, p)| PreviewSnapshot {
                cell: *cell,
                kind: self.kind,
                sprite: p.sprite,
                placeable: p.placeable,
            })
            .collect();
        out.sort_by_key(|p| p.cell);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tilemap::BoundedTerrain;
    use crate::protocol::{CanonicalShape, Rotation};

    fn terrain() -> BoundedTerrain {
        BoundedTerrain::new(Cell::new(-10, -10), Cell::new(10, 10))
    }

    fn masks_around(net: &TileNetwork, cell: Cell) -> Vec<Option<u8>> {
        std::iter::once(cell)
            .chain(cell.neighbors())
            .map(|c| net.segment(c).map(|s| s.mask))
            .collect()
    }

    #[test]
    fn place_claims_cell_and_sets_isolated_sprite() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        net.place_segment(Cell::new(0, 0), &t, &mut occ).unwrap();
        assert!(net.contains(Cell::new(0, 0)));
        assert_eq!(
            occ.claimant(Cell::new(0, 0)),
            Some(Claimant::Segment(NetworkKind::Path))
        );
        assert_eq!(
            net.sprite_at(Cell::new(0, 0)).unwrap().shape,
            CanonicalShape::Isolated
        );
    }

    #[test]
    fn placement_fans_out_to_neighbours() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        net.place_segment(Cell::new(0, 0), &t, &mut occ).unwrap();
        net.place_segment(Cell::new(1, 0), &t, &mut occ).unwrap();
        assert_eq!(net.segment(Cell::new(0, 0)).unwrap().mask, 0b0100);
        assert_eq!(net.segment(Cell::new(1, 0)).unwrap().mask, 0b0010);

        net.place_segment(Cell::new(2, 0), &t, &mut occ).unwrap();
        let middle = net.sprite_at(Cell::new(1, 0)).unwrap();
        assert_eq!(middle.shape, CanonicalShape::Straight);
        assert_eq!(middle.rotation, Rotation::Deg90);
    }

    #[test]
    fn rejects_missing_terrain_and_occupied_cells() {
        let t = terrain().with_hole(Cell::new(3, 3));
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        let mut walls = TileNetwork::new(NetworkKind::Wall);

        let err = net.place_segment(Cell::new(3, 3), &t, &mut occ).unwrap_err();
        assert!(matches!(
            err,
            SandboxError::InvalidPlacement { reason: PlacementBlock::NoTerrain, .. }
        ));

        walls.place_segment(Cell::new(0, 0), &t, &mut occ).unwrap();
        let err = net.place_segment(Cell::new(0, 0), &t, &mut occ).unwrap_err();
        assert!(matches!(
            err,
            SandboxError::InvalidPlacement { reason: PlacementBlock::Occupied, .. }
        ));
        assert!(!net.contains(Cell::new(0, 0)));
        assert_eq!(occ.len(), 1);
    }

    #[test]
    fn place_then_remove_restores_neighbourhood() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Wall);
        for cell in [Cell::new(0, 1), Cell::new(1, 0), Cell::new(-1, 0), Cell::new(1, 1)] {
            net.place_segment(cell, &t, &mut occ).unwrap();
        }
        let centre = Cell::new(0, 0);
        let before = masks_around(&net, centre);
        let occupied_before = occ.len();

        net.place_segment(centre, &t, &mut occ).unwrap();
        assert_ne!(masks_around(&net, centre), before);

        assert!(net.remove_segment(centre, &mut occ).unwrap());
        assert_eq!(masks_around(&net, centre), before);
        assert_eq!(occ.len(), occupied_before);
        assert!(!occ.is_occupied(centre));
    }

    #[test]
    fn removing_absent_segment_is_noop() {
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        assert!(!net.remove_segment(Cell::new(5, 5), &mut occ).unwrap());
    }

    #[test]
    fn line_placement_skips_blocked_cells() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut walls = TileNetwork::new(NetworkKind::Wall);
        let mut paths = TileNetwork::new(NetworkKind::Path);
        walls.place_segment(Cell::new(2, 0), &t, &mut occ).unwrap();

        let report = paths
            .place_line(Cell::new(0, 0), Cell::new(4, 0), &t, &mut occ)
            .unwrap();
        assert_eq!(
            report.placed,
            vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(3, 0), Cell::new(4, 0)]
        );
        assert_eq!(report.rejected, vec![(Cell::new(2, 0), PlacementBlock::Occupied)]);
        assert_eq!(paths.endpoints(), vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(3, 0), Cell::new(4, 0)]);
    }

    #[test]
    fn line_endpoints_and_degrees() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        net.place_line(Cell::new(0, 0), Cell::new(0, 3), &t, &mut occ)
            .unwrap();
        assert_eq!(net.endpoints(), vec![Cell::new(0, 0), Cell::new(0, 3)]);
        assert_eq!(net.degree(Cell::new(0, 1)), 2);
        assert!(!net.is_endpoint(Cell::new(0, 2)));
    }

    #[test]
    fn cross_has_four_tips() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        net.place_line(Cell::new(-1, 0), Cell::new(1, 0), &t, &mut occ)
            .unwrap();
        net.place_segment(Cell::new(0, 1), &t, &mut occ).unwrap();
        net.place_segment(Cell::new(0, -1), &t, &mut occ).unwrap();

        assert_eq!(net.degree(Cell::new(0, 0)), 4);
        assert!(!net.is_endpoint(Cell::new(0, 0)));
        assert_eq!(
            net.sprite_at(Cell::new(0, 0)).unwrap().shape,
            CanonicalShape::Cross
        );
        let mut tips = Cell::new(0, 0).neighbors().to_vec();
        tips.sort();
        assert_eq!(net.endpoints(), tips);
    }

    #[test]
    fn seed_run_lays_straight_road() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        let placed = net
            .seed_run(Cell::new(0, -10), Direction::Up, 12, &t, &mut occ)
            .unwrap();
        assert_eq!(placed, 12);
        assert_eq!(net.endpoints(), vec![Cell::new(0, -10), Cell::new(0, 1)]);
    }

    #[test]
    fn seed_run_longer_than_the_grid_is_refused() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        let err = net
            .seed_run(Cell::new(0, 0), Direction::Up, u32::MAX, &t, &mut occ)
            .unwrap_err();
        assert!(matches!(err, SandboxError::Config(_)));
        assert!(net.is_empty());
        assert!(occ.is_empty());
    }

    #[test]
    fn preview_never_touches_occupancy() {
        let t = terrain().with_hole(Cell::new(2, 0));
        let occ = GridOccupancy::new();
        let mut preview = SegmentPreview::new(NetworkKind::Path);
        preview.rebuild(Cell::new(0, 0), Cell::new(3, 0), &t, &occ);

        assert_eq!(preview.len(), 4);
        assert!(occ.is_empty());
        assert!(!preview.get(Cell::new(2, 0)).unwrap().placeable);
        assert!(preview.get(Cell::new(1, 0)).unwrap().placeable);
        assert_eq!(
            preview.get(Cell::new(1, 0)).unwrap().sprite.shape,
            CanonicalShape::Straight
        );
        assert_eq!(preview.get(Cell::new(0, 0)).unwrap().sprite.shape, CanonicalShape::Stub);

        preview.clear();
        assert!(preview.is_empty());
    }
}
