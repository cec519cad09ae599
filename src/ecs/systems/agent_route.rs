use hecs::World;
use rand::Rng;
use tracing::{debug, info, warn};

use crate::config::SandboxConfig;
use crate::ecs::components::{Agent, AgentRoute, AgentState, Facing, Position, RouteSwitches};
use crate::error::SandboxError;
use crate::game::network::TileNetwork;
use crate::game::pathfinding::{available_endpoints, find_path};
use crate::game::tilemap::TerrainProvider;
use crate::protocol::{AgentStateKind, Cell, Vec2};

/// Agent tuning in world units, derived from the config and the tile size.
#[derive(Debug, Clone, Copy)]
pub struct AgentParams {
    pub entrance: Cell,
    pub speed: f32,
    pub arrival_epsilon: f32,
    pub max_route_switches: u32,
    pub scan_interval: f32,
    pub scan_radius: f32,
}

impl AgentParams {
    pub fn from_config(config: &SandboxConfig, tile_size: f32) -> Self {
        AgentParams {
            entrance: config.entrance,
            speed: config.agent_speed * tile_size,
            arrival_epsilon: config.arrival_epsilon * tile_size,
            max_route_switches: config.max_route_switches,
            scan_interval: config.scan_interval,
            scan_radius: config.scan_radius * tile_size,
        }
    }
}

#[derive(Debug, Default)]
pub struct AgentRouteResult {
    pub routes_started: usize,
    pub returning: usize,
    pub despawned: Vec<hecs::Entity>,
}

/// Runs the agent state machine for one frame.
///
/// Idle agents pick their first route. Moving agents walk towards their
/// current waypoint and pick a new route after the last one. Returning
/// agents walk home and are removed once they stand on the entrance cell.
pub fn agent_route_system(
    world: &mut World,
    network: &TileNetwork,
    terrain: &dyn TerrainProvider,
    params: &AgentParams,
    rng: &mut impl Rng,
    dt: f32,
) -> AgentRouteResult {
    let mut result = AgentRouteResult::default();
    let step = params.speed * dt;

    for (entity, (state, pos, facing, route, switches)) in world.query_mut::<hecs::With<
        (
            &mut AgentState,
            &mut Position,
            &mut Facing,
            &mut AgentRoute,
            &mut RouteSwitches,
        ),
        &Agent,
    >>() {
        let before = state.state;
        let started = match state.state {
            AgentStateKind::Idle => {
                select_route(state, route, switches, network, terrain, params, rng)
            }
            AgentStateKind::MovingAlongPath => {
                step_along(pos, facing, route, step, params.arrival_epsilon)
                    && select_route(state, route, switches, network, terrain, params, rng)
            }
            AgentStateKind::Returning => {
                step_along(pos, facing, route, step, params.arrival_epsilon);
                if terrain.world_to_cell(pos.vec()) == params.entrance {
                    state.state = AgentStateKind::Despawning;
                }
                false
            }
            AgentStateKind::Despawning => false,
        };

        if started {
            result.routes_started += 1;
        }
        match state.state {
            AgentStateKind::Returning if before != AgentStateKind::Returning => {
                result.returning += 1
            }
            AgentStateKind::Despawning => result.despawned.push(entity),
            _ => {}
        }
    }

    for &entity in &result.despawned {
        if world.despawn(entity).is_ok() {
            info!("agent {:?} left through the entrance", entity);
        }
    }

    result
}

/// Move towards the current waypoint by at most `max_step`. Returns `true`
/// once the last waypoint has been reached.
fn step_along(
    pos: &mut Position,
    facing: &mut Facing,
    route: &mut AgentRoute,
    max_step: f32,
    arrival_epsilon: f32,
) -> bool {
    let Some(target) = route.current_waypoint() else {
        return true;
    };

    let here = pos.vec();
    let dist = here.distance(target);
    if dist <= max_step {
        *pos = Position::from(target);
    } else {
        pos.x += (target.x - here.x) / dist * max_step;
        pos.y += (target.y - here.y) / dist * max_step;
    }

    if target.x > here.x {
        facing.left = false;
    } else if target.x < here.x {
        facing.left = true;
    }

    if pos.vec().distance(target) < arrival_epsilon {
        route.advance_waypoint();
    }
    route.is_complete()
}

fn waypoints(path: &[Cell], terrain: &dyn TerrainProvider) -> Vec<Vec2> {
    path.iter().map(|c| terrain.cell_to_world(*c)).collect()
}

/// Pick a random endpoint and head there, or turn for home when the agent
/// has used up its switches or has nowhere to go. Returns `true` when a new
/// outbound route was started.
fn select_route(
    state: &mut AgentState,
    route: &mut AgentRoute,
    switches: &mut RouteSwitches,
    network: &TileNetwork,
    terrain: &dyn TerrainProvider,
    params: &AgentParams,
    rng: &mut impl Rng,
) -> bool {
    if switches.count >= params.max_route_switches {
        begin_return(state, route, network, terrain, params.entrance);
        return false;
    }

    // The entrance is only off limits for the first route.
    let excluded = (switches.count == 0).then_some(params.entrance);
    let endpoints = available_endpoints(network, route.cell, excluded);
    if endpoints.is_empty() {
        warn!("{}", SandboxError::EndpointUnavailable { from: route.cell });
        begin_return(state, route, network, terrain, params.entrance);
        return false;
    }

    let goal = endpoints[rng.gen_range(0..endpoints.len())];
    match find_path(network, route.cell, goal) {
        Ok(path) => {
            switches.count += 1;
            debug!(
                "route {} -> {} ({} cells, switch {})",
                route.cell,
                goal,
                path.len(),
                switches.count
            );
            route.set(goal, waypoints(&path, terrain));
            state.state = AgentStateKind::MovingAlongPath;
            true
        }
        Err(e) => {
            warn!("{}", e);
            begin_return(state, route, network, terrain, params.entrance);
            false
        }
    }
}

fn begin_return(
    state: &mut AgentState,
    route: &mut AgentRoute,
    network: &TileNetwork,
    terrain: &dyn TerrainProvider,
    entrance: Cell,
) {
    match find_path(network, route.cell, entrance) {
        Ok(path) => {
            debug!("returning {} -> {}", route.cell, entrance);
            route.set(entrance, waypoints(&path, terrain));
            state.state = AgentStateKind::Returning;
        }
        Err(e) => {
            warn!("{}; agent removed where it stands", e);
            state.state = AgentStateKind::Despawning;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::systems::agent_spawn::spawn_agent;
    use crate::game::occupancy::GridOccupancy;
    use crate::game::tilemap::BoundedTerrain;
    use crate::protocol::{Direction, NetworkKind};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn terrain() -> BoundedTerrain {
        BoundedTerrain::new(Cell::new(-10, -10), Cell::new(10, 10))
    }

    fn params(max_route_switches: u32) -> AgentParams {
        AgentParams {
            entrance: Cell::new(0, 0),
            speed: 2.0,
            arrival_epsilon: 0.1,
            max_route_switches,
            scan_interval: 5.0,
            scan_radius: 1.0,
        }
    }

    fn road(len: u32) -> TileNetwork {
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        net.seed_run(Cell::new(0, 0), Direction::Up, len, &terrain(), &mut occ)
            .unwrap();
        net
    }

    fn state_of(world: &World, e: hecs::Entity) -> AgentStateKind {
        world.get::<&AgentState>(e).unwrap().state
    }

    #[test]
    fn first_route_avoids_entrance() {
        let t = terrain();
        let net = road(4);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(1);
        let e = spawn_agent(&mut world, &t, Cell::new(0, 0));

        let result = agent_route_system(&mut world, &net, &t, &params(4), &mut rng, 0.0);
        assert_eq!(result.routes_started, 1);
        assert_eq!(state_of(&world, e), AgentStateKind::MovingAlongPath);
        assert_eq!(world.get::<&AgentRoute>(e).unwrap().cell, Cell::new(0, 3));
        assert_eq!(world.get::<&RouteSwitches>(e).unwrap().count, 1);
    }

    #[test]
    fn walks_out_and_back_then_despawns() {
        let t = terrain();
        let net = road(4);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(7);
        let e = spawn_agent(&mut world, &t, Cell::new(0, 0));
        let p = params(2);

        let mut seen = vec![state_of(&world, e)];
        for _ in 0..200 {
            agent_route_system(&mut world, &net, &t, &p, &mut rng, 0.1);
            if !world.contains(e) {
                break;
            }
            let s = state_of(&world, e);
            if seen.last() != Some(&s) {
                seen.push(s);
            }
        }
        assert!(!world.contains(e));
        assert_eq!(
            seen,
            vec![
                AgentStateKind::Idle,
                AgentStateKind::MovingAlongPath,
                AgentStateKind::Returning
            ]
        );
    }

    #[test]
    fn no_endpoints_sends_agent_home() {
        let t = terrain();
        // A single cell has no degree-one members.
        let net = road(1);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(3);
        let e = spawn_agent(&mut world, &t, Cell::new(0, 0));

        agent_route_system(&mut world, &net, &t, &params(4), &mut rng, 0.1);
        assert_eq!(state_of(&world, e), AgentStateKind::Returning);
        let result = agent_route_system(&mut world, &net, &t, &params(4), &mut rng, 0.1);
        assert_eq!(result.despawned, vec![e]);
        assert!(!world.contains(e));
    }

    #[test]
    fn unreachable_entrance_removes_agent_immediately() {
        let t = terrain();
        let net = TileNetwork::new(NetworkKind::Path);
        let mut world = World::new();
        let mut rng = StdRng::seed_from_u64(3);
        let e = spawn_agent(&mut world, &t, Cell::new(0, 0));

        let result = agent_route_system(&mut world, &net, &t, &params(4), &mut rng, 0.1);
        assert_eq!(result.despawned, vec![e]);
    }

    #[test]
    fn facing_follows_horizontal_motion() {
        let mut pos = Position { x: 0.0, y: 0.0 };
        let mut facing = Facing::default();
        let mut route = AgentRoute::at(Cell::new(0, 0));
        route.set(Cell::new(-3, 0), vec![Vec2::new(-3.0, 0.0)]);

        assert!(!step_along(&mut pos, &mut facing, &mut route, 1.0, 0.1));
        assert!(facing.left);
        assert_eq!(pos, Position { x: -1.0, y: 0.0 });

        assert!(!step_along(&mut pos, &mut facing, &mut route, 1.0, 0.1));
        assert!(step_along(&mut pos, &mut facing, &mut route, 5.0, 0.1));
        assert_eq!(pos, Position { x: -3.0, y: 0.0 });
    }

    #[test]
    fn same_seed_same_choices() {
        let t = terrain();
        let mut occ = GridOccupancy::new();
        let mut net = TileNetwork::new(NetworkKind::Path);
        net.place_line(Cell::new(-3, 0), Cell::new(3, 0), &t, &mut occ).unwrap();
        net.place_line(Cell::new(0, 1), Cell::new(0, 3), &t, &mut occ).unwrap();
        net.place_line(Cell::new(0, -1), Cell::new(0, -3), &t, &mut occ).unwrap();

        let goals = |seed: u64| {
            let mut world = World::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let e = spawn_agent(&mut world, &t, Cell::new(0, 0));
            let mut goals = Vec::new();
            for _ in 0..400 {
                agent_route_system(&mut world, &net, &t, &params(4), &mut rng, 0.1);
                let Ok(route) = world.get::<&AgentRoute>(e) else {
                    break;
                };
                if goals.last() != Some(&route.cell) {
                    goals.push(route.cell);
                }
            }
            goals
        };
        assert_eq!(goals(11), goals(11));
    }
}
