use hecs::World;
use tracing::{debug, info, warn};

use crate::ecs::components::{Anchor, BuildingDrag, BuildingFootprint, DragPhase};
use crate::error::{Result, SandboxError};
use crate::game::buildings::{footprint_report, validate_footprint, FootprintReport};
use crate::game::occupancy::{Claimant, GridOccupancy};
use crate::game::tilemap::TerrainProvider;
use crate::protocol::Cell;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropOutcome {
    Moved { from: Cell, to: Cell },
    /// The drop target was invalid; the building is back where it started.
    Restored { at: Cell },
}

/// Relocates buildings by drag. Holds the single global drag token: at most
/// one building is in `DragPhase::Dragging` at any time.
#[derive(Debug, Default)]
pub struct BuildingMover {
    token: Option<hecs::Entity>,
}

impl BuildingMover {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dragged(&self) -> Option<hecs::Entity> {
        self.token
    }

    pub fn is_dragging(&self) -> bool {
        self.token.is_some()
    }

    /// Start dragging the building whose footprint covers `cell`. Its cells
    /// are released for the duration of the drag. Returns `false` when the
    /// press hits nothing or another drag is already active.
    pub fn press(&mut self, world: &mut World, occupancy: &mut GridOccupancy, cell: Cell) -> Result<bool> {
        if self.token.is_some() {
            return Ok(false);
        }
        let Some(entity) = occupancy.building_at(cell) else {
            return Ok(false);
        };

        let (anchor, cells) = footprint_at_anchor(world, entity)?;
        occupancy.release_all(&cells, Claimant::Building(entity))?;

        let mut drag = world
            .get::<&mut BuildingDrag>(entity)
            .map_err(|_| SandboxError::NotABuilding(entity))?;
        drag.phase = DragPhase::Dragging {
            origin: anchor,
            grab: Cell::new(cell.x - anchor.x, cell.y - anchor.y),
        };
        self.token = Some(entity);

        debug!("drag started on {:?} at {}", entity, anchor);
        Ok(true)
    }

    /// Follow the pointer: the grabbed cell stays under `cell`.
    pub fn drag_to(&mut self, world: &mut World, cell: Cell) -> Result<()> {
        let Some(entity) = self.token else {
            return Ok(());
        };
        let grab = match dragging_phase(world, entity)? {
            DragPhase::Dragging { grab, .. } => grab,
            DragPhase::Idle => return Ok(()),
        };
        let mut anchor = world
            .get::<&mut Anchor>(entity)
            .map_err(|_| SandboxError::NotABuilding(entity))?;
        anchor.cell = Cell::new(cell.x - grab.x, cell.y - grab.y);
        Ok(())
    }

    /// Drop the building where it currently hovers. Either every new cell is
    /// claimed, or the building snaps back and re-claims exactly the cells it
    /// held before the drag.
    pub fn release(
        &mut self,
        world: &mut World,
        occupancy: &mut GridOccupancy,
        terrain: &dyn TerrainProvider,
    ) -> Result<Option<DropOutcome>> {
        let Some(entity) = self.token.take() else {
            return Ok(None);
        };
        let origin = match dragging_phase(world, entity)? {
            DragPhase::Dragging { origin, .. } => origin,
            DragPhase::Idle => return Ok(None),
        };

        let (target, _) = footprint_at_anchor(world, entity)?;
        let footprint = world
            .get::<&BuildingFootprint>(entity)
            .map_err(|_| SandboxError::NotABuilding(entity))?
            .footprint
            .clone();

        let claimed = validate_footprint(&footprint, target, terrain, occupancy)
            .and_then(|cells| occupancy.claim_all(&cells, Claimant::Building(entity)));

        match claimed {
            Ok(()) => {
                set_idle(world, entity)?;
                info!("building {:?} moved {} -> {}", entity, origin, target);
                Ok(Some(DropOutcome::Moved {
                    from: origin,
                    to: target,
                }))
            }
            Err(e) => {
                warn!("drop at {} failed ({}); restoring {}", target, e, origin);
                if let Err(e) = restore(world, occupancy, entity, origin) {
                    self.token = Some(entity);
                    return Err(e);
                }
                Ok(Some(DropOutcome::Restored { at: origin }))
            }
        }
    }

    /// Abort the drag, putting the building back exactly as it was. If the
    /// original cells were taken in the meantime the drag stays active and
    /// the building keeps hovering.
    pub fn cancel(&mut self, world: &mut World, occupancy: &mut GridOccupancy) -> Result<bool> {
        let Some(entity) = self.token.take() else {
            return Ok(false);
        };
        let origin = match dragging_phase(world, entity)? {
            DragPhase::Dragging { origin, .. } => origin,
            DragPhase::Idle => return Ok(false),
        };
        if let Err(e) = restore(world, occupancy, entity, origin) {
            self.token = Some(entity);
            return Err(e);
        }
        debug!("drag on {:?} cancelled", entity);
        Ok(true)
    }

    /// Per-cell validity of the dragged building at its hover position.
    pub fn preview(
        &self,
        world: &World,
        terrain: &dyn TerrainProvider,
        occupancy: &GridOccupancy,
    ) -> Option<FootprintReport> {
        let entity = self.token?;
        let mut query = world
            .query_one::<(&Anchor, &BuildingFootprint)>(entity)
            .ok()?;
        let (anchor, footprint) = query.get()?;
        Some(footprint_report(
            &footprint.footprint,
            anchor.cell,
            terrain,
            occupancy,
        ))
    }
}

fn footprint_at_anchor(world: &World, entity: hecs::Entity) -> Result<(Cell, Vec<Cell>)> {
    let mut query = world
        .query_one::<(&Anchor, &BuildingFootprint)>(entity)
        .map_err(|_| SandboxError::NotABuilding(entity))?;
    let (anchor, footprint) = query.get().ok_or(SandboxError::NotABuilding(entity))?;
    Ok((anchor.cell, footprint.footprint.cells_at(anchor.cell)))
}

fn dragging_phase(world: &World, entity: hecs::Entity) -> Result<DragPhase> {
    world
        .get::<&BuildingDrag>(entity)
        .map(|d| d.phase)
        .map_err(|_| SandboxError::NotABuilding(entity))
}

fn set_idle(world: &mut World, entity: hecs::Entity) -> Result<()> {
    let mut drag = world
        .get::<&mut BuildingDrag>(entity)
        .map_err(|_| SandboxError::NotABuilding(entity))?;
    drag.phase = DragPhase::Idle;
    Ok(())
}

/// Re-claim the cells at `origin`, then settle the building there. Nothing
/// changes when the claim fails.
fn restore(
    world: &mut World,
    occupancy: &mut GridOccupancy,
    entity: hecs::Entity,
    origin: Cell,
) -> Result<()> {
    let cells = world
        .get::<&BuildingFootprint>(entity)
        .map_err(|_| SandboxError::NotABuilding(entity))?
        .footprint
        .cells_at(origin);
    occupancy.claim_all(&cells, Claimant::Building(entity))?;

    world
        .get::<&mut Anchor>(entity)
        .map_err(|_| SandboxError::NotABuilding(entity))?
        .cell = origin;
    set_idle(world, entity)
}
