use hecs::World;
use tracing::debug;

use crate::ecs::components::{Agent, BuildingName, BuildingYield, Position, ScanTimer};
use crate::ecs::systems::agent_route::AgentParams;
use crate::game::economy::EconomySink;
use crate::game::occupancy::GridOccupancy;
use crate::game::tilemap::TerrainProvider;
use crate::protocol::{ResourceKind, Vec2};

/// Buildings with a footprint cell centre within `radius` of `point`, in
/// first-found order, each listed once.
pub fn buildings_near(
    point: Vec2,
    radius: f32,
    occupancy: &GridOccupancy,
    terrain: &dyn TerrainProvider,
) -> Vec<hecs::Entity> {
    let centre = terrain.world_to_cell(point);
    let reach = (radius / terrain.tile_size()).ceil() as i32 + 1;
    let mut found = Vec::new();

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let cell = centre.offset(dx, dy);
            if terrain.cell_to_world(cell).distance(point) > radius {
                continue;
            }
            if let Some(building) = occupancy.building_at(cell) {
                if !found.contains(&building) {
                    found.push(building);
                }
            }
        }
    }
    found
}

/// Runs the building scan for one frame.
///
/// Each agent's timer advances by `dt` regardless of what the agent is
/// doing; whenever it crosses `scan_interval`, every building in range pays
/// its per-visitor yield into `sink`. Returns the number of visits paid.
pub fn agent_scan_system(
    world: &mut World,
    occupancy: &GridOccupancy,
    terrain: &dyn TerrainProvider,
    params: &AgentParams,
    sink: &mut dyn EconomySink,
    dt: f32,
) -> usize {
    // ── Advance timers, remember who is due ─────────────────────────
    let mut due: Vec<(Vec2, u32)> = Vec::new();
    for (_entity, (pos, timer)) in
        world.query_mut::<hecs::With<(&Position, &mut ScanTimer), &Agent>>()
    {
        timer.elapsed += dt;
        let mut scans = 0;
        while timer.elapsed >= params.scan_interval {
            timer.elapsed -= params.scan_interval;
            scans += 1;
        }
        if scans > 0 {
            due.push((pos.vec(), scans));
        }
    }

    // ── Pay out ─────────────────────────────────────────────────────
    let mut visits = 0;
    for (point, scans) in due {
        for building in buildings_near(point, params.scan_radius, occupancy, terrain) {
            let Ok(yields) = world.get::<&BuildingYield>(building) else {
                continue;
            };
            for _ in 0..scans {
                sink.add_resource(ResourceKind::Money, yields.money);
                sink.add_resource(ResourceKind::Faith, yields.faith);
                visits += 1;
            }
            if let Ok(name) = world.get::<&BuildingName>(building) {
                debug!(
                    "visited {}: money +{}, faith +{}",
                    name.name, yields.money, yields.faith
                );
            }
        }
    }
    visits
}
