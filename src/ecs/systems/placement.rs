use hecs::World;
use tracing::{debug, info, warn};

use crate::ecs::components::{
    Anchor, Building, BuildingDrag, BuildingFootprint, BuildingName, BuildingYield,
};
use crate::error::{Result, SandboxError};
use crate::game::buildings::{validate_footprint, BuildingDef};
use crate::game::occupancy::{Claimant, GridOccupancy};
use crate::game::tilemap::TerrainProvider;
use crate::protocol::Cell;

/// Attempts to place a building with its footprint at `anchor`.
///
/// Every footprint cell must have terrain and be free; if any is not, nothing
/// changes and no entity exists afterwards. On success the new entity holds
/// all of its cells in `occupancy`.
pub fn place_building(
    world: &mut World,
    occupancy: &mut GridOccupancy,
    terrain: &dyn TerrainProvider,
    def: &BuildingDef,
    anchor: Cell,
) -> Result<hecs::Entity> {
    // ── Validate the whole footprint first ──────────────────────────
    let cells = validate_footprint(&def.footprint, anchor, terrain, occupancy).map_err(|e| {
        debug!("{} rejected at {}: {}", def.name, anchor, e);
        e
    })?;

    // ── Spawn, then claim; undo the spawn if the claim fails ────────
    let entity = world.spawn((
        Building,
        BuildingName {
            name: def.name.clone(),
        },
        Anchor { cell: anchor },
        BuildingFootprint {
            footprint: def.footprint.clone(),
        },
        BuildingYield {
            money: def.money_per_visitor,
            faith: def.faith_per_visitor,
        },
        BuildingDrag::default(),
    ));

    if let Err(e) = occupancy.claim_all(&cells, Claimant::Building(entity)) {
        if world.despawn(entity).is_err() {
            warn!("rollback of {} at {} found no entity to despawn", def.name, anchor);
        }
        return Err(e);
    }

    info!("{} placed at {} ({} cells)", def.name, anchor, cells.len());
    Ok(entity)
}

/// Footprint cells of a building at its current anchor.
pub fn building_cells(world: &World, entity: hecs::Entity) -> Result<Vec<Cell>> {
    let mut query = world
        .query_one::<(&Anchor, &BuildingFootprint)>(entity)
        .map_err(|_| SandboxError::NotABuilding(entity))?;
    let (anchor, footprint) = query.get().ok_or(SandboxError::NotABuilding(entity))?;
    Ok(footprint.footprint.cells_at(anchor.cell))
}

/// Frees every footprint cell and despawns the building.
pub fn remove_building(
    world: &mut World,
    occupancy: &mut GridOccupancy,
    entity: hecs::Entity,
) -> Result<()> {
    let cells = building_cells(world, entity)?;
    occupancy.release_all(&cells, Claimant::Building(entity))?;
    let name = world
        .get::<&BuildingName>(entity)
        .map(|n| n.name.clone())
        .unwrap_or_default();
    world
        .despawn(entity)
        .map_err(|_| SandboxError::NotABuilding(entity))?;
    info!("{} removed ({} cells freed)", name, cells.len());
    Ok(())
}

/// Remover tool: destroy whichever building covers `cell`.
/// Returns `false` when no building is there.
pub fn remove_building_at(
    world: &mut World,
    occupancy: &mut GridOccupancy,
    cell: Cell,
) -> Result<bool> {
    match occupancy.building_at(cell) {
        Some(entity) => {
            remove_building(world, occupancy, entity)?;
            Ok(true)
        }
        None => Ok(false),
    }
}
