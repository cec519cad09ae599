pub mod agent_route;
pub mod agent_scan;
pub mod agent_spawn;
pub mod building_drag;
pub mod placement;
