pub mod autotile;
pub mod buildings;
pub mod economy;
pub mod line;
pub mod network;
pub mod occupancy;
pub mod pathfinding;
pub mod tilemap;
pub mod tools;
