use std::collections::HashMap;

use tracing::error;

use crate::error::{Result, SandboxError};
use crate::protocol::{Cell, NetworkKind};

/// Who holds a claimed cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Claimant {
    Segment(NetworkKind),
    Building(hecs::Entity),
}

/// Authoritative record of which cells are claimed, and by whom.
///
/// Every claimant (path segment, wall segment, building footprint cell) goes
/// through here, so a cell can never be held twice. The claimant map doubles
/// as the cell-keyed spatial index used for hit testing buildings.
#[derive(Debug, Default)]
pub struct GridOccupancy {
    claims: HashMap<Cell, Claimant>,
}

impl GridOccupancy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_occupied(&self, cell: Cell) -> bool {
        self.claims.contains_key(&cell)
    }

    pub fn claimant(&self, cell: Cell) -> Option<Claimant> {
        self.claims.get(&cell).copied()
    }

    /// Hit test: the building whose footprint covers `cell`, if any.
    pub fn building_at(&self, cell: Cell) -> Option<hecs::Entity> {
        match self.claims.get(&cell) {
            Some(Claimant::Building(entity)) => Some(*entity),
            _ => None,
        }
    }

    /// Claim `cell` for `claimant`. Re-claiming by the same claimant is a no-op.
    pub fn mark_occupied(&mut self, cell: Cell, claimant: Claimant) -> Result<()> {
        match self.claims.get(&cell) {
            Some(holder) if *holder == claimant => Ok(()),
            Some(holder) => Err(violation(cell, claimant, Some(*holder))),
            None => {
                self.claims.insert(cell, claimant);
                Ok(())
            }
        }
    }

    /// Release `cell`. Only the current holder may free it.
    pub fn mark_unoccupied(&mut self, cell: Cell, claimant: Claimant) -> Result<()> {
        match self.claims.get(&cell) {
            Some(holder) if *holder == claimant => {
                self.claims.remove(&cell);
                Ok(())
            }
            holder => Err(violation(cell, claimant, holder.copied())),
        }
    }

    /// Claim every cell or none of them.
    pub fn claim_all(&mut self, cells: &[Cell], claimant: Claimant) -> Result<()> {
        if let Some(&cell) = cells
            .iter()
            .find(|c| matches!(self.claims.get(c), Some(h) if *h != claimant))
        {
            return Err(violation(cell, claimant, self.claimant(cell)));
        }
        for &cell in cells {
            self.claims.insert(cell, claimant);
        }
        Ok(())
    }

    /// Free every cell or none of them.
    pub fn release_all(&mut self, cells: &[Cell], claimant: Claimant) -> Result<()> {
        if let Some(&cell) = cells.iter().find(|c| self.claims.get(c) != Some(&claimant)) {
            return Err(violation(cell, claimant, self.claimant(cell)));
        }
        for cell in cells {
            self.claims.remove(cell);
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.claims.len()
    }

    pub fn is_empty(&self) -> bool {
        self.claims.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (Cell, Claimant)> + '_ {
        self.claims.iter().map(|(cell, claimant)| (*cell, *claimant))
    }
}

fn violation(cell: Cell, claimant: Claimant, holder: Option<Claimant>) -> SandboxError {
    error!(
        "occupancy violation at {}: {:?} collides with {:?}",
        cell, claimant, holder
    );
    SandboxError::OccupancyViolation {
        cell,
        claimant,
        holder,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: Claimant = Claimant::Segment(NetworkKind::Path);
    const WALL: Claimant = Claimant::Segment(NetworkKind::Wall);

    #[test]
    fn mark_and_unmark() {
        let mut occ = GridOccupancy::new();
        let c = Cell::new(1, 1);
        assert!(!occ.is_occupied(c));
        occ.mark_occupied(c, PATH).unwrap();
        assert!(occ.is_occupied(c));
        assert_eq!(occ.claimant(c), Some(PATH));
        occ.mark_unoccupied(c, PATH).unwrap();
        assert!(!occ.is_occupied(c));
        assert!(occ.is_empty());
    }

    #[test]
    fn reclaim_by_same_holder_is_idempotent() {
        let mut occ = GridOccupancy::new();
        let c = Cell::new(0, 0);
        occ.mark_occupied(c, PATH).unwrap();
        occ.mark_occupied(c, PATH).unwrap();
        assert_eq!(occ.len(), 1);
    }

    #[test]
    fn double_claim_by_other_holder_is_violation() {
        let mut occ = GridOccupancy::new();
        let c = Cell::new(0, 0);
        occ.mark_occupied(c, PATH).unwrap();
        let err = occ.mark_occupied(c, WALL).unwrap_err();
        assert!(matches!(
            err,
            SandboxError::OccupancyViolation { holder: Some(PATH), .. }
        ));
        assert_eq!(occ.claimant(c), Some(PATH));
    }

    #[test]
    fn double_free_is_violation() {
        let mut occ = GridOccupancy::new();
        let c = Cell::new(0, 0);
        occ.mark_occupied(c, PATH).unwrap();
        occ.mark_unoccupied(c, PATH).unwrap();
        assert!(occ.mark_unoccupied(c, PATH).is_err());
    }

    #[test]
    fn free_by_wrong_holder_leaves_claim() {
        let mut occ = GridOccupancy::new();
        let c = Cell::new(4, 4);
        occ.mark_occupied(c, PATH).unwrap();
        assert!(occ.mark_unoccupied(c, WALL).is_err());
        assert!(occ.is_occupied(c));
    }

    #[test]
    fn claim_all_is_all_or_nothing() {
        let mut world = hecs::World::new();
        let building = Claimant::Building(world.spawn(()));
        let mut occ = GridOccupancy::new();
        occ.mark_occupied(Cell::new(1, 0), PATH).unwrap();

        let cells = [Cell::new(0, 0), Cell::new(1, 0)];
        assert!(occ.claim_all(&cells, building).is_err());
        assert!(!occ.is_occupied(Cell::new(0, 0)));
        assert_eq!(occ.claimant(Cell::new(1, 0)), Some(PATH));
    }

    #[test]
    fn release_all_is_all_or_nothing() {
        let mut world = hecs::World::new();
        let entity = world.spawn(());
        let building = Claimant::Building(entity);
        let mut occ = GridOccupancy::new();
        occ.claim_all(&[Cell::new(0, 0)], building).unwrap();

        let cells = [Cell::new(0, 0), Cell::new(1, 0)];
        assert!(occ.release_all(&cells, building).is_err());
        assert_eq!(occ.building_at(Cell::new(0, 0)), Some(entity));
    }
}
