use std::error::Error;

use grid_sandbox::game::buildings::BuildingCatalog;
use grid_sandbox::game::tilemap::{BoundedTerrain, TerrainProvider, TileMap};
use grid_sandbox::protocol::{Cell, Gesture, ToolMode};
use grid_sandbox::{GestureOutcome, Sandbox, SandboxConfig, FIXED_DT};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Simulated seconds the demo runs for.
const DEMO_SECONDS: f32 = 60.0;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Noise terrain around the entrance, or a plain rectangle when
/// `SANDBOX_FLAT` is set.
fn build_terrain(config: &SandboxConfig) -> Box<dyn TerrainProvider> {
    if std::env::var("SANDBOX_FLAT").is_ok_and(|v| !v.is_empty()) {
        let e = config.entrance;
        return Box::new(
            BoundedTerrain::new(e.offset(-16, -2), e.offset(16, 30)).with_tile_size(config.tile_size),
        );
    }
    let mut map = TileMap::new(config.terrain_seed).with_tile_size(config.tile_size);
    map.generate_around(config.entrance, 1);
    Box::new(map)
}

fn drag(sandbox: &mut Sandbox, from: Cell, to: Cell) -> grid_sandbox::Result<GestureOutcome> {
    sandbox.handle(Gesture::Press { cell: from })?;
    sandbox.handle(Gesture::DragTo { cell: to })?;
    sandbox.handle(Gesture::Release)
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();

    let config = SandboxConfig::from_env();
    let catalog = match &config.buildings_path {
        Some(path) => BuildingCatalog::load_from_file(path),
        None => BuildingCatalog::default(),
    };
    let terrain = build_terrain(&config);
    let mut sandbox = Sandbox::new(config, catalog, terrain)?;

    // ── Lay out a small town through the gesture API ────────────────
    let top = sandbox.config().entrance.offset(0, sandbox.config().entrance_run as i32 - 1);
    sandbox.set_mode(ToolMode::Path)?;
    for (from, to) in [
        (top, top.offset(-6, 0)),
        (top, top.offset(6, 0)),
        (top.offset(6, 0), top.offset(6, 6)),
    ] {
        if let GestureOutcome::Line(report) = drag(&mut sandbox, from, to)? {
            info!(
                "road {} -> {}: {} placed, {} rejected",
                from,
                to,
                report.placed.len(),
                report.rejected.len()
            );
        }
    }

    sandbox.set_mode(ToolMode::Wall)?;
    drag(&mut sandbox, top.offset(-6, 2), top.offset(-2, 2))?;

    for (name, cell) in [("shrine", top.offset(-3, 1)), ("shrine", top.offset(3, 1))] {
        sandbox.set_mode(ToolMode::Building {
            name: name.to_string(),
        })?;
        match sandbox.handle(Gesture::Press { cell }) {
            Ok(outcome) => info!("{} at {}: {:?}", name, cell, outcome),
            Err(e) => warn!("{} at {}: {}", name, cell, e),
        }
    }
    sandbox.set_mode(ToolMode::Inactive)?;

    // ── Run the simulation ──────────────────────────────────────────
    let frames = (DEMO_SECONDS / FIXED_DT) as usize;
    let mut peak_agents = 0;
    for _ in 0..frames {
        sandbox.advance(FIXED_DT);
        peak_agents = peak_agents.max(sandbox.agent_count());
    }

    let purse = sandbox.purse();
    info!(
        "after {} ticks: {} agents live (peak {}), money {}, faith {}",
        sandbox.tick_count(),
        sandbox.agent_count(),
        peak_agents,
        purse.money,
        purse.faith
    );

    println!("{}", serde_json::to_string_pretty(&sandbox.snapshot())?);
    Ok(())
}
