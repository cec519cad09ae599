use tracing::debug;

use crate::error::Result;
use crate::game::network::{LinePlacement, SegmentPreview, TileNetwork};
use crate::game::occupancy::GridOccupancy;
use crate::game::tilemap::TerrainProvider;
use crate::protocol::{Cell, Gesture, NetworkKind, PreviewSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentToolState {
    Idle,
    Placing { start: Cell, end: Cell },
}

/// Press-drag-release line tool for one network kind.
///
/// While placing, the line is mirrored into a throwaway preview. Release
/// commits the line into the network; cancel discards it without touching
/// anything else.
#[derive(Debug)]
pub struct SegmentTool {
    state: SegmentToolState,
    preview: SegmentPreview,
}

impl SegmentTool {
    pub fn new(kind: NetworkKind) -> Self {
        SegmentTool {
            state: SegmentToolState::Idle,
            preview: SegmentPreview::new(kind),
        }
    }

    pub fn state(&self) -> SegmentToolState {
        self.state
    }

    pub fn preview(&self) -> &SegmentPreview {
        &self.preview
    }

    pub fn preview_snapshot(&self) -> Vec<PreviewSnapshot> {
        self.preview.snapshot()
    }

    /// Feed one gesture. Returns the placement report when a release
    /// committed a line.
    pub fn handle(
        &mut self,
        gesture: Gesture,
        network: &mut TileNetwork,
        terrain: &dyn TerrainProvider,
        occupancy: &mut GridOccupancy,
    ) -> Result<Option<LinePlacement>> {
        match (self.state, gesture) {
            (SegmentToolState::Idle, Gesture::Press { cell }) => {
                // Drags only start on ground.
                if terrain.has_tile_at(cell) {
                    self.state = SegmentToolState::Placing {
                        start: cell,
                        end: cell,
                    };
                    self.preview.rebuild(cell, cell, terrain, occupancy);
                }
                Ok(None)
            }
            (SegmentToolState::Placing { start, .. }, Gesture::DragTo { cell }) => {
                self.state = SegmentToolState::Placing { start, end: cell };
                self.preview.rebuild(start, cell, terrain, occupancy);
                Ok(None)
            }
            (SegmentToolState::Placing { start, end }, Gesture::Release) => {
                self.preview.clear();
                self.state = SegmentToolState::Idle;
                let report = network.place_line(start, end, terrain, occupancy)?;
                Ok(Some(report))
            }
            (_, Gesture::Cancel) => {
                self.cancel();
                Ok(None)
            }
            _ => Ok(None),
        }
    }

    pub fn cancel(&mut self) {
        if self.state != SegmentToolState::Idle {
            debug!("line drag cancelled");
        }
        self.preview.clear();
        self.state = SegmentToolState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tilemap::BoundedTerrain;

    fn terrain() -> BoundedTerrain {
        BoundedTerrain::new(Cell::new(0, 0), Cell::new(9, 9))
    }

    #[test]
    fn press_drag_release_commits_line() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        let mut tool = SegmentTool::new(NetworkKind::Path);

        tool.handle(Gesture::Press { cell: Cell::new(1, 1) }, &mut net, &t, &mut occ)
            .unwrap();
        tool.handle(Gesture::DragTo { cell: Cell::new(4, 1) }, &mut net, &t, &mut occ)
            .unwrap();
        assert_eq!(tool.preview().len(), 4);
        assert!(net.is_empty());
        assert!(occ.is_empty());

        let report = tool
            .handle(Gesture::Release, &mut net, &t, &mut occ)
            .unwrap()
            .unwrap();
        assert_eq!(report.placed.len(), 4);
        assert_eq!(net.len(), 4);
        assert!(tool.preview().is_empty());
        assert_eq!(tool.state(), SegmentToolState::Idle);
    }

    #[test]
    fn press_off_ground_does_not_start() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Wall);
        let mut tool = SegmentTool::new(NetworkKind::Wall);
        tool.handle(Gesture::Press { cell: Cell::new(-1, 0) }, &mut net, &t, &mut occ)
            .unwrap();
        assert_eq!(tool.state(), SegmentToolState::Idle);
        assert!(tool
            .handle(Gesture::Release, &mut net, &t, &mut occ)
            .unwrap()
            .is_none());
    }

    #[test]
    fn cancel_discards_preview() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        let mut tool = SegmentTool::new(NetworkKind::Path);
        tool.handle(Gesture::Press { cell: Cell::new(0, 0) }, &mut net, &t, &mut occ)
            .unwrap();
        tool.handle(Gesture::DragTo { cell: Cell::new(0, 5) }, &mut net, &t, &mut occ)
            .unwrap();
        tool.handle(Gesture::Cancel, &mut net, &t, &mut occ).unwrap();

        assert!(tool.preview().is_empty());
        assert!(net.is_empty());
        assert!(occ.is_empty());
        assert!(tool
            .handle(Gesture::Release, &mut net, &t, &mut occ)
            .unwrap()
            .is_none());
    }
}
