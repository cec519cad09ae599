use hecs::World;
use tracing::{debug, info, warn};

use crate::ecs::components::{
    Agent, AgentRoute, AgentState, Facing, Position, RouteSwitches, ScanTimer,
};
use crate::game::network::TileNetwork;
use crate::game::tilemap::TerrainProvider;
use crate::protocol::{AgentStateKind, Cell};

/// Spawn an idle agent standing on `entrance`.
pub fn spawn_agent(world: &mut World, terrain: &dyn TerrainProvider, entrance: Cell) -> hecs::Entity {
    world.spawn((
        Agent,
        Position::from(terrain.cell_to_world(entrance)),
        Facing::default(),
        AgentState {
            state: AgentStateKind::Idle,
        },
        AgentRoute::at(entrance),
        RouteSwitches::default(),
        ScanTimer::default(),
    ))
}

/// Periodic agent source at the entrance.
#[derive(Debug, Clone)]
pub struct AgentSpawner {
    pub interval: f32,
    pub population_cap: Option<usize>,
    elapsed: f32,
}

impl AgentSpawner {
    pub fn new(interval: f32, population_cap: Option<usize>) -> Self {
        AgentSpawner {
            interval,
            population_cap,
            elapsed: 0.0,
        }
    }
}

/// Runs the spawner for a single frame.
///
/// Every `interval` seconds one agent appears at the entrance, provided the
/// path network is non-empty, the entrance is on it, and the population cap
/// (if any) has room.
pub fn agent_spawn_system(
    world: &mut World,
    spawner: &mut AgentSpawner,
    network: &TileNetwork,
    terrain: &dyn TerrainProvider,
    entrance: Cell,
    dt: f32,
) -> Option<hecs::Entity> {
    spawner.elapsed += dt;
    if spawner.elapsed < spawner.interval {
        return None;
    }
    spawner.elapsed -= spawner.interval;

    if network.is_empty() {
        warn!("No path available to follow");
        return None;
    }
    if !network.contains(entrance) {
        warn!("Entrance {} is not on the path network", entrance);
        return None;
    }
    if let Some(cap) = spawner.population_cap {
        let live = world.query::<&Agent>().iter().count();
        if live >= cap {
            debug!("population cap {} reached", cap);
            return None;
        }
    }

    let entity = spawn_agent(world, terrain, entrance);
    info!("agent {:?} spawned at {}", entity, entrance);
    Some(entity)
}
