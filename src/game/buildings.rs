use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{PlacementBlock, Result, SandboxError};
use crate::game::network::check_cell;
use crate::game::occupancy::GridOccupancy;
use crate::game::tilemap::TerrainProvider;
use crate::protocol::Cell;

/// Ordered offsets from a building's anchor cell. The first offset is the
/// cell the player grabs when placing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Footprint {
    pub offsets: Vec<Cell>,
}

impl Footprint {
    pub fn new(offsets: Vec<Cell>) -> Self {
        Footprint { offsets }
    }

    /// A `width` x `height` rectangle growing right and up from the anchor.
    pub fn rect(width: i32, height: i32) -> Self {
        let offsets = (0..height)
            .flat_map(|dy| (0..width).map(move |dx| Cell::new(dx, dy)))
            .collect();
        Footprint { offsets }
    }

    pub fn cells_at(&self, anchor: Cell) -> Vec<Cell> {
        self.offsets
            .iter()
            .map(|o| anchor.offset(o.x, o.y))
            .collect()
    }

    /// Anchor that puts the first footprint cell on `picked`.
    pub fn anchor_for_pick(&self, picked: Cell) -> Cell {
        match self.offsets.first() {
            Some(first) => picked.offset(-first.x, -first.y),
            None => picked,
        }
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }
}

/// Per-cell verdict for a footprint at a candidate anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FootprintReport {
    pub cells: Vec<(Cell, Option<PlacementBlock>)>,
}

impl FootprintReport {
    pub fn is_valid(&self) -> bool {
        self.cells.iter().all(|(_, block)| block.is_none())
    }

    pub fn first_block(&self) -> Option<(Cell, PlacementBlock)> {
        self.cells
            .iter()
            .find_map(|(cell, block)| block.map(|b| (*cell, b)))
    }
}

pub fn footprint_report(
    footprint: &Footprint,
    anchor: Cell,
    terrain: &dyn TerrainProvider,
    occupancy: &GridOccupancy,
) -> FootprintReport {
    let cells = footprint
        .cells_at(anchor)
        .into_iter()
        .map(|cell| (cell, check_cell(cell, terrain, occupancy).err()))
        .collect();
    FootprintReport { cells }
}

/// One veto is enough: the first invalid cell fails the whole footprint.
pub fn validate_footprint(
    footprint: &Footprint,
    anchor: Cell,
    terrain: &dyn TerrainProvider,
    occupancy: &GridOccupancy,
) -> Result<Vec<Cell>> {
    let cells = footprint.cells_at(anchor);
    for &cell in &cells {
        if let Err(reason) = check_cell(cell, terrain, occupancy) {
            return Err(SandboxError::InvalidPlacement { cell, reason });
        }
    }
    Ok(cells)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingDef {
    pub name: String,
    pub footprint: Footprint,
    #[serde(default)]
    pub price: i64,
    #[serde(default)]
    pub money_per_visitor: i64,
    #[serde(default)]
    pub faith_per_visitor: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildingCatalog {
    pub buildings: Vec<BuildingDef>,
}

impl Default for BuildingCatalog {
    fn default() -> Self {
        BuildingCatalog {
            buildings: vec![
                BuildingDef {
                    name: "shrine".to_string(),
                    footprint: Footprint::rect(1, 1),
                    price: 5,
                    money_per_visitor: 0,
                    faith_per_visitor: 2,
                },
                BuildingDef {
                    name: "house".to_string(),
                    footprint: Footprint::rect(2, 1),
                    price: 10,
                    money_per_visitor: 2,
                    faith_per_visitor: 0,
                },
                BuildingDef {
                    name: "market".to_string(),
                    footprint: Footprint::new(vec![
                        Cell::new(0, 0),
                        Cell::new(1, 0),
                        Cell::new(0, 1),
                    ]),
                    price: 15,
                    money_per_visitor: 4,
                    faith_per_visitor: 0,
                },
                BuildingDef {
                    name: "temple".to_string(),
                    footprint: Footprint::rect(2, 2),
                    price: 25,
                    money_per_visitor: 1,
                    faith_per_visitor: 5,
                },
            ],
        }
    }
}

impl BuildingCatalog {
    /// Parse a catalog, rejecting definitions that could never be placed.
    pub fn from_json(contents: &str) -> Result<Self> {
        let catalog: BuildingCatalog =
            serde_json::from_str(contents).map_err(|e| SandboxError::Config(e.to_string()))?;

        let mut names = HashSet::new();
        for def in &catalog.buildings {
            if def.footprint.is_empty() {
                return Err(SandboxError::Config(format!(
                    "building `{}` has an empty footprint",
                    def.name
                )));
            }
            let distinct: HashSet<&Cell> = def.footprint.offsets.iter().collect();
            if distinct.len() != def.footprint.len() {
                return Err(SandboxError::Config(format!(
                    "building `{}` repeats a footprint offset",
                    def.name
                )));
            }
            if !names.insert(def.name.as_str()) {
                return Err(SandboxError::Config(format!(
                    "building `{}` is defined twice",
                    def.name
                )));
            }
        }
        Ok(catalog)
    }

    /// Load the catalog from a JSON file on disk.
    /// Falls back to the built-in catalog if the file is missing or malformed.
    pub fn load_from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(catalog) => {
                    info!(
                        "Loaded building catalog with {} buildings",
                        catalog.buildings.len()
                    );
                    catalog
                }
                Err(e) => {
                    warn!(
                        "Failed to parse building catalog at {}: {}. Using built-in catalog.",
                        path.display(),
                        e
                    );
                    BuildingCatalog::default()
                }
            },
            Err(e) => {
                warn!(
                    "Failed to read building catalog at {}: {}. Using built-in catalog.",
                    path.display(),
                    e
                );
                BuildingCatalog::default()
            }
        }
    }

    pub fn get(&self, name: &str) -> Result<&BuildingDef> {
        self.buildings
            .iter()
            .find(|b| b.name == name)
            .ok_or_else(|| SandboxError::UnknownBuilding(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::occupancy::Claimant;
    use crate::game::tilemap::BoundedTerrain;
    use crate::protocol::NetworkKind;

    fn terrain() -> BoundedTerrain {
        BoundedTerrain::new(Cell::new(0, 0), Cell::new(5, 5))
    }

    #[test]
    fn rect_offsets_are_row_major() {
        assert_eq!(
            Footprint::rect(2, 2).offsets,
            vec![Cell::new(0, 0), Cell::new(1, 0), Cell::new(0, 1), Cell::new(1, 1)]
        );
    }

    #[test]
    fn anchor_for_pick_aligns_first_offset() {
        let fp = Footprint::new(vec![Cell::new(1, 0), Cell::new(2, 0)]);
        let anchor = fp.anchor_for_pick(Cell::new(4, 4));
        assert_eq!(anchor, Cell::new(3, 4));
        assert_eq!(fp.cells_at(anchor)[0], Cell::new(4, 4));
    }

    #[test]
    fn report_marks_each_bad_cell() {
        let mut occ = GridOccupancy::new();
        occ.mark_occupied(Cell::new(1, 0), Claimant::Segment(NetworkKind::Path))
            .unwrap();
        let fp = Footprint::rect(2, 2);

        let report = footprint_report(&fp, Cell::new(0, 0), &terrain(), &occ);
        assert!(!report.is_valid());
        assert_eq!(report.first_block(), Some((Cell::new(1, 0), PlacementBlock::Occupied)));

        let report = footprint_report(&fp, Cell::new(5, 5), &terrain(), &occ);
        let blocked: Vec<_> = report.cells.iter().filter(|(_, b)| b.is_some()).collect();
        assert_eq!(blocked.len(), 3);
        assert!(blocked.iter().all(|(_, b)| *b == Some(PlacementBlock::NoTerrain)));
    }

    #[test]
    fn validate_rejects_on_single_veto() {
        let mut occ = GridOccupancy::new();
        occ.mark_occupied(Cell::new(3, 3), Claimant::Segment(NetworkKind::Wall))
            .unwrap();
        let fp = Footprint::rect(2, 1);
        assert!(validate_footprint(&fp, Cell::new(2, 3), &terrain(), &occ).is_err());
        assert_eq!(
            validate_footprint(&fp, Cell::new(0, 0), &terrain(), &occ).unwrap(),
            vec![Cell::new(0, 0), Cell::new(1, 0)]
        );
    }

    #[test]
    fn catalog_json_uses_defaults_for_yields() {
        let json = r#"{"buildings":[{"name":"hut","footprint":[{"x":0,"y":0}]}]}"#;
        let catalog = BuildingCatalog::from_json(json).unwrap();
        let hut = catalog.get("hut").unwrap();
        assert_eq!(hut.price, 0);
        assert_eq!(hut.footprint.len(), 1);
        assert!(matches!(
            catalog.get("castle"),
            Err(SandboxError::UnknownBuilding(_))
        ));
    }

    #[test]
    fn catalog_rejects_broken_footprints() {
        let empty = r#"{"buildings":[{"name":"void","footprint":[]}]}"#;
        assert!(BuildingCatalog::from_json(empty).is_err());
        let repeated = r#"{"buildings":[{"name":"dup","footprint":[{"x":0,"y":0},{"x":0,"y":0}]}]}"#;
        assert!(BuildingCatalog::from_json(repeated).is_err());
    }

    #[test]
    fn missing_catalog_file_falls_back() {
        let catalog = BuildingCatalog::load_from_file(Path::new("/nonexistent/buildings.json"));
        assert!(catalog.get("temple").is_ok());
    }

    #[test]
    fn catalog_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("buildings.json");
        let json = serde_json::to_string(&BuildingCatalog::default()).unwrap();
        std::fs::write(&path, json).unwrap();
        let loaded = BuildingCatalog::load_from_file(&path);
        assert_eq!(loaded.buildings.len(), 4);
        assert_eq!(loaded.get("market").unwrap().footprint.len(), 3);
    }
}
