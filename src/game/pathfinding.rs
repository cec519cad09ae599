use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use tracing::{debug, warn};

use crate::error::{Result, SandboxError};
use crate::game::network::TileNetwork;
use crate::protocol::Cell;

#[derive(Debug, Clone, Copy)]
struct OpenNode {
    cell: Cell,
    g_cost: f32,
    h_cost: f32,
    f_cost: f32,
    insertion_order: u64,
}

/// Lowest f, then lowest h, then whichever was pushed first.
fn open_node_order(a: &OpenNode, b: &OpenNode) -> Ordering {
    a.f_cost
        .total_cmp(&b.f_cost)
        .then(a.h_cost.total_cmp(&b.h_cost))
        .then(a.insertion_order.cmp(&b.insertion_order))
}

fn pick_best_open_node_index(open: &[OpenNode]) -> usize {
    let mut best_index = 0usize;
    for index in 1..open.len() {
        if open_node_order(&open[index], &open[best_index]) == Ordering::Less {
            best_index = index;
        }
    }
    best_index
}

fn reconstruct_path(parent: &HashMap<Cell, Cell>, start: Cell, goal: Cell) -> Vec<Cell> {
    let mut path = vec![goal];
    let mut cursor = goal;
    while cursor != start {
        match parent.get(&cursor) {
            Some(prev) => {
                cursor = *prev;
                path.push(cursor);
            }
            None => break,
        }
    }
    path.reverse();
    path
}

/// A* over the members of `network`, moving orthogonally.
///
/// Both ends must be members. Returns the cells from `start` to `goal`
/// inclusive; a search from a cell to itself is the single-cell route.
pub fn find_path(network: &TileNetwork, start: Cell, goal: Cell) -> Result<Vec<Cell>> {
    if !network.contains(start) || !network.contains(goal) {
        return Err(SandboxError::PathNotFound { start, goal });
    }
    if start == goal {
        return Ok(vec![start]);
    }

    let mut closed: HashSet<Cell> = HashSet::new();
    let mut best_g: HashMap<Cell, f32> = HashMap::new();
    let mut parent: HashMap<Cell, Cell> = HashMap::new();
    let mut open: Vec<OpenNode> = Vec::new();
    let mut next_insertion = 0u64;

    let start_h = start.distance(goal);
    open.push(OpenNode {
        cell: start,
        g_cost: 0.0,
        h_cost: start_h,
        f_cost: start_h,
        insertion_order: next_insertion,
    });
    next_insertion += 1;
    best_g.insert(start, 0.0);

    while !open.is_empty() {
        let current = open.swap_remove(pick_best_open_node_index(&open));
        if !closed.insert(current.cell) {
            continue;
        }

        if current.cell == goal {
            let path = reconstruct_path(&parent, start, goal);
            debug!("path {} -> {}: {} cells", start, goal, path.len());
            return Ok(path);
        }

        for neighbor in network.neighbors(current.cell) {
            if closed.contains(&neighbor) {
                continue;
            }
            let tentative_g = current.g_cost + current.cell.distance(neighbor);
            if best_g
                .get(&neighbor)
                .is_some_and(|known| tentative_g >= *known)
            {
                continue;
            }

            best_g.insert(neighbor, tentative_g);
            parent.insert(neighbor, current.cell);
            let h_cost = neighbor.distance(goal);
            open.push(OpenNode {
                cell: neighbor,
                g_cost: tentative_g,
                h_cost,
                f_cost: tentative_g + h_cost,
                insertion_order: next_insertion,
            });
            next_insertion += 1;
        }
    }

    Err(SandboxError::PathNotFound { start, goal })
}

/// Lenient form of [`find_path`]: an unreachable goal yields an empty route.
pub fn get_path(network: &TileNetwork, start: Cell, goal: Cell) -> Vec<Cell> {
    match find_path(network, start, goal) {
        Ok(path) => path,
        Err(e) => {
            warn!("{}", e);
            Vec::new()
        }
    }
}

/// Endpoints an agent standing on `current` may head for next, sorted.
///
/// `excluded_entrance` drops that cell as well; callers pass the entrance
/// only when choosing an agent's first route.
pub fn available_endpoints(
    network: &TileNetwork,
    current: Cell,
    excluded_entrance: Option<Cell>,
) -> Vec<Cell> {
    network
        .endpoints()
        .into_iter()
        .filter(|c| *c != current && Some(*c) != excluded_entrance)
        .collect()
}
