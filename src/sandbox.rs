//! The sandbox facade: owns every subsystem, routes gestures to the active
//! tool and runs the fixed-timestep simulation.

use hecs::World;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::config::SandboxConfig;
use crate::ecs::components::{
    Agent, AgentState, Anchor, BuildingDrag, BuildingFootprint, BuildingName, DragPhase, Facing,
    Position, RouteSwitches,
};
use crate::ecs::systems::agent_route::{agent_route_system, AgentParams};
use crate::ecs::systems::agent_scan::agent_scan_system;
use crate::ecs::systems::agent_spawn::{agent_spawn_system, AgentSpawner};
use crate::ecs::systems::building_drag::{BuildingMover, DropOutcome};
use crate::ecs::systems::placement::{place_building, remove_building, remove_building_at};
use crate::error::{Result, SandboxError};
use crate::game::buildings::{footprint_report, BuildingCatalog, FootprintReport};
use crate::game::economy::Purse;
use crate::game::network::{LinePlacement, TileNetwork};
use crate::game::occupancy::{Claimant, GridOccupancy};
use crate::game::pathfinding::{available_endpoints, find_path, get_path};
use crate::game::tilemap::TerrainProvider;
use crate::game::tools::SegmentTool;
use crate::protocol::{
    AgentSnapshot, BuildingSnapshot, Cell, Direction, FootprintCellSnapshot, Gesture,
    NetworkKind, RenderSnapshot, Tick, ToolMode,
};

/// Simulation step: 20 ticks per second.
pub const FIXED_DT: f32 = 1.0 / 20.0;

/// What a gesture did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    Nothing,
    Line(LinePlacement),
    BuildingPlaced(hecs::Entity),
    BuildingRemoved,
    DragStarted(hecs::Entity),
    Dropped(DropOutcome),
    Erased(Cell),
    Cancelled,
}

#[derive(Debug, Default)]
pub struct TickReport {
    pub spawned: Option<hecs::Entity>,
    pub routes_started: usize,
    pub returning: usize,
    pub despawned: usize,
    pub visits: usize,
}

pub struct Sandbox {
    config: SandboxConfig,
    params: AgentParams,
    terrain: Box<dyn TerrainProvider>,
    catalog: BuildingCatalog,

    world: World,
    occupancy: GridOccupancy,
    paths: TileNetwork,
    walls: TileNetwork,
    purse: Purse,

    mode: ToolMode,
    path_tool: SegmentTool,
    wall_tool: SegmentTool,
    mover: BuildingMover,
    /// Anchor under the pointer while the building tool is active.
    hover: Option<Cell>,
    erasing: bool,

    spawner: AgentSpawner,
    rng: StdRng,
    tick: Tick,
    accumulator: f32,
}

impl Sandbox {
    /// Build a sandbox on `terrain` and lay the entrance road.
    pub fn new(
        config: SandboxConfig,
        catalog: BuildingCatalog,
        terrain: Box<dyn TerrainProvider>,
    ) -> Result<Self> {
        config.validate()?;

        let params = AgentParams::from_config(&config, terrain.tile_size());
        let mut sandbox = Sandbox {
            params,
            catalog,
            world: World::new(),
            occupancy: GridOccupancy::new(),
            paths: TileNetwork::new(NetworkKind::Path),
            walls: TileNetwork::new(NetworkKind::Wall),
            purse: Purse::new(config.starting_money, config.starting_faith),
            mode: ToolMode::Inactive,
            path_tool: SegmentTool::new(NetworkKind::Path),
            wall_tool: SegmentTool::new(NetworkKind::Wall),
            mover: BuildingMover::new(),
            hover: None,
            erasing: false,
            spawner: AgentSpawner::new(config.spawn_interval, config.population_cap),
            rng: StdRng::seed_from_u64(config.rng_seed),
            tick: 0,
            accumulator: 0.0,
            terrain,
            config,
        };

        let entrance = sandbox.config.entrance;
        let laid = sandbox.paths.seed_run(
            entrance,
            Direction::Up,
            sandbox.config.entrance_run,
            sandbox.terrain.as_ref(),
            &mut sandbox.occupancy,
        )?;
        if laid < sandbox.config.entrance_run as usize {
            warn!(
                "entrance road at {}: only {} of {} cells had free ground",
                entrance, laid, sandbox.config.entrance_run
            );
        }
        info!("sandbox ready, entrance {} with {} road cells", entrance, laid);
        Ok(sandbox)
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn occupancy(&self) -> &GridOccupancy {
        &self.occupancy
    }

    pub fn terrain(&self) -> &dyn TerrainProvider {
        self.terrain.as_ref()
    }

    pub fn catalog(&self) -> &BuildingCatalog {
        &self.catalog
    }

    pub fn network(&self, kind: NetworkKind) -> &TileNetwork {
        match kind {
            NetworkKind::Path => &self.paths,
            NetworkKind::Wall => &self.walls,
        }
    }

    pub fn purse(&self) -> &Purse {
        &self.purse
    }

    pub fn mode(&self) -> &ToolMode {
        &self.mode
    }

    pub fn tick_count(&self) -> Tick {
        self.tick
    }

    pub fn agent_count(&self) -> usize {
        self.world.query::<&Agent>().iter().count()
    }

    // ── Direct operations ───────────────────────────────────────────

    pub fn place_segment(&mut self, kind: NetworkKind, cell: Cell) -> Result<()> {
        self.settle_drag()?;
        let terrain = self.terrain.as_ref();
        match kind {
            NetworkKind::Path => self.paths.place_segment(cell, terrain, &mut self.occupancy),
            NetworkKind::Wall => self.walls.place_segment(cell, terrain, &mut self.occupancy),
        }
    }

    pub fn remove_segment(&mut self, kind: NetworkKind, cell: Cell) -> Result<bool> {
        let occupancy = &mut self.occupancy;
        match kind {
            NetworkKind::Path => self.paths.remove_segment(cell, occupancy),
            NetworkKind::Wall => self.walls.remove_segment(cell, occupancy),
        }
    }

    pub fn place_line(&mut self, kind: NetworkKind, start: Cell, end: Cell) -> Result<LinePlacement> {
        self.settle_drag()?;
        let terrain = self.terrain.as_ref();
        match kind {
            NetworkKind::Path => self.paths.place_line(start, end, terrain, &mut self.occupancy),
            NetworkKind::Wall => self.walls.place_line(start, end, terrain, &mut self.occupancy),
        }
    }

    /// Place a catalog building at `anchor` without charging for it.
    pub fn place_building(&mut self, name: &str, anchor: Cell) -> Result<hecs::Entity> {
        self.settle_drag()?;
        let def = self.catalog.get(name)?;
        place_building(
            &mut self.world,
            &mut self.occupancy,
            self.terrain.as_ref(),
            def,
            anchor,
        )
    }

    pub fn remove_building(&mut self, entity: hecs::Entity) -> Result<()> {
        self.settle_drag()?;
        remove_building(&mut self.world, &mut self.occupancy, entity)
    }

    /// A lifted building holds no cells, so direct edits first put it back
    /// where it came from.
    fn settle_drag(&mut self) -> Result<()> {
        if self.mover.cancel(&mut self.world, &mut self.occupancy)? {
            debug!("building drag rolled back before a direct edit");
        }
        Ok(())
    }

    pub fn footprint_report(&self, name: &str, anchor: Cell) -> Result<FootprintReport> {
        let def = self.catalog.get(name)?;
        Ok(footprint_report(
            &def.footprint,
            anchor,
            self.terrain.as_ref(),
            &self.occupancy,
        ))
    }

    pub fn find_path(&self, start: Cell, goal: Cell) -> Result<Vec<Cell>> {
        find_path(&self.paths, start, goal)
    }

    pub fn get_path(&self, start: Cell, goal: Cell) -> Vec<Cell> {
        get_path(&self.paths, start, goal)
    }

    /// Endpoints reachable as a next goal from `current`. The entrance is
    /// left out when choosing a first route.
    pub fn available_endpoints(&self, current: Cell, first_route: bool) -> Vec<Cell> {
        let excluded = first_route.then_some(self.config.entrance);
        available_endpoints(&self.paths, current, excluded)
    }

    // ── Gesture routing ─────────────────────────────────────────────

    /// Switch tools. Anything in progress under the old tool is cancelled
    /// with full rollback.
    pub fn set_mode(&mut self, mode: ToolMode) -> Result<()> {
        if let ToolMode::Building { name } = &mode {
            self.catalog.get(name)?;
        }
        self.cancel_all()?;
        debug!("tool mode {:?} -> {:?}", self.mode, mode);
        self.mode = mode;
        Ok(())
    }

    fn cancel_all(&mut self) -> Result<bool> {
        let was_busy = !self.path_tool.preview().is_empty()
            || !self.wall_tool.preview().is_empty()
            || self.hover.is_some()
            || self.erasing;
        self.path_tool.cancel();
        self.wall_tool.cancel();
        self.hover = None;
        self.erasing = false;
        let dragged = self.mover.cancel(&mut self.world, &mut self.occupancy)?;
        Ok(was_busy || dragged)
    }

    pub fn handle(&mut self, gesture: Gesture) -> Result<GestureOutcome> {
        if gesture == Gesture::Cancel {
            return Ok(if self.cancel_all()? {
                GestureOutcome::Cancelled
            } else {
                GestureOutcome::Nothing
            });
        }

        match self.mode.clone() {
            ToolMode::Inactive => Ok(GestureOutcome::Nothing),
            ToolMode::Path => {
                let report = self.path_tool.handle(
                    gesture,
                    &mut self.paths,
                    self.terrain.as_ref(),
                    &mut self.occupancy,
                )?;
                Ok(report.map_or(GestureOutcome::Nothing, GestureOutcome::Line))
            }
            ToolMode::Wall => {
                let report = self.wall_tool.handle(
                    gesture,
                    &mut self.walls,
                    self.terrain.as_ref(),
                    &mut self.occupancy,
                )?;
                Ok(report.map_or(GestureOutcome::Nothing, GestureOutcome::Line))
            }
            ToolMode::Building { name } => self.handle_building_tool(&name, gesture),
            ToolMode::Mover => self.handle_mover(gesture),
            ToolMode::Remover => match gesture {
                Gesture::Press { cell } => {
                    if remove_building_at(&mut self.world, &mut self.occupancy, cell)? {
                        Ok(GestureOutcome::BuildingRemoved)
                    } else {
                        Ok(GestureOutcome::Nothing)
                    }
                }
                _ => Ok(GestureOutcome::Nothing),
            },
            ToolMode::Eraser => self.handle_eraser(gesture),
        }
    }

    fn handle_building_tool(&mut self, name: &str, gesture: Gesture) -> Result<GestureOutcome> {
        let def = self.catalog.get(name)?;
        match gesture {
            Gesture::DragTo { cell } => {
                self.hover = Some(def.footprint.anchor_for_pick(cell));
                Ok(GestureOutcome::Nothing)
            }
            Gesture::Press { cell } => {
                let anchor = def.footprint.anchor_for_pick(cell);
                self.hover = Some(anchor);
                if !self.purse.can_afford(def.price) {
                    return Err(SandboxError::InsufficientFunds {
                        price: def.price,
                        balance: self.purse.money,
                    });
                }
                let entity = place_building(
                    &mut self.world,
                    &mut self.occupancy,
                    self.terrain.as_ref(),
                    def,
                    anchor,
                )?;
                self.purse.spend(def.price);
                Ok(GestureOutcome::BuildingPlaced(entity))
            }
            _ => Ok(GestureOutcome::Nothing),
        }
    }

    fn handle_mover(&mut self, gesture: Gesture) -> Result<GestureOutcome> {
        match gesture {
            Gesture::Press { cell } => {
                if self.mover.press(&mut self.world, &mut self.occupancy, cell)? {
                    Ok(self
                        .mover
                        .dragged()
                        .map_or(GestureOutcome::Nothing, GestureOutcome::DragStarted))
                } else {
                    Ok(GestureOutcome::Nothing)
                }
            }
            Gesture::DragTo { cell } => {
                self.mover.drag_to(&mut self.world, cell)?;
                Ok(GestureOutcome::Nothing)
            }
            Gesture::Release => {
                let outcome =
                    self.mover
                        .release(&mut self.world, &mut self.occupancy, self.terrain.as_ref())?;
                Ok(outcome.map_or(GestureOutcome::Nothing, GestureOutcome::Dropped))
            }
            Gesture::Cancel => Ok(GestureOutcome::Nothing),
        }
    }

    fn handle_eraser(&mut self, gesture: Gesture) -> Result<GestureOutcome> {
        let cell = match gesture {
            Gesture::Press { cell } => {
                self.erasing = true;
                cell
            }
            Gesture::DragTo { cell } if self.erasing => cell,
            Gesture::Release => {
                self.erasing = false;
                return Ok(GestureOutcome::Nothing);
            }
            _ => return Ok(GestureOutcome::Nothing),
        };

        let kind = match self.occupancy.claimant(cell) {
            Some(Claimant::Segment(kind)) => kind,
            _ => return Ok(GestureOutcome::Nothing),
        };
        let occupancy = &mut self.occupancy;
        let removed = match kind {
            NetworkKind::Path => self.paths.remove_segment(cell, occupancy)?,
            NetworkKind::Wall => self.walls.remove_segment(cell, occupancy)?,
        };
        Ok(if removed {
            GestureOutcome::Erased(cell)
        } else {
            GestureOutcome::Nothing
        })
    }

    // ── Simulation ──────────────────────────────────────────────────

    /// Advance the simulation by one step of `dt` seconds.
    pub fn tick(&mut self, dt: f32) -> TickReport {
        let terrain = self.terrain.as_ref();
        let mut report = TickReport {
            spawned: agent_spawn_system(
                &mut self.world,
                &mut self.spawner,
                &self.paths,
                terrain,
                self.params.entrance,
                dt,
            ),
            ..TickReport::default()
        };

        let routes = agent_route_system(
            &mut self.world,
            &self.paths,
            terrain,
            &self.params,
            &mut self.rng,
            dt,
        );
        report.routes_started = routes.routes_started;
        report.returning = routes.returning;
        report.despawned = routes.despawned.len();

        report.visits = agent_scan_system(
            &mut self.world,
            &self.occupancy,
            terrain,
            &self.params,
            &mut self.purse,
            dt,
        );

        self.tick += 1;
        report
    }

    /// Feed wall-clock time; runs as many `FIXED_DT` ticks as fit and keeps
    /// the remainder for the next call. Returns the number of ticks run.
    pub fn advance(&mut self, elapsed: f32) -> usize {
        self.accumulator += elapsed;
        let mut ticks = 0;
        while self.accumulator >= FIXED_DT {
            self.accumulator -= FIXED_DT;
            self.tick(FIXED_DT);
            ticks += 1;
        }
        ticks
    }

    // ── Rendering ───────────────────────────────────────────────────

    pub fn snapshot(&self) -> RenderSnapshot {
        let mut segments = self.paths.snapshot();
        segments.extend(self.walls.snapshot());

        let mut preview = self.path_tool.preview_snapshot();
        preview.extend(self.wall_tool.preview_snapshot());

        let footprint = match (&self.mode, self.hover) {
            (ToolMode::Building { name }, Some(anchor)) => {
                self.footprint_report(name, anchor).ok()
            }
            _ => self
                .mover
                .preview(&self.world, self.terrain.as_ref(), &self.occupancy),
        };
        let footprint_preview = footprint
            .map(|report| {
                report
                    .cells
                    .into_iter()
                    .map(|(cell, block)| FootprintCellSnapshot {
                        cell,
                        placeable: block.is_none(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut buildings: Vec<BuildingSnapshot> = self
            .world
            .query::<(&BuildingName, &Anchor, &BuildingFootprint, &BuildingDrag)>()
            .iter()
            .map(|(entity, (name, anchor, footprint, drag))| BuildingSnapshot {
                id: entity.to_bits().get(),
                name: name.name.clone(),
                anchor: anchor.cell,
                cells: footprint.footprint.cells_at(anchor.cell),
                dragging: matches!(drag.phase, DragPhase::Dragging { .. }),
            })
            .collect();
        buildings.sort_by_key(|b| b.id);

        let mut agents: Vec<AgentSnapshot> = self
            .world
            .query::<hecs::With<(&Position, &AgentState, &Facing, &RouteSwitches), &Agent>>()
            .iter()
            .map(|(entity, (pos, state, facing, switches))| AgentSnapshot {
                id: entity.to_bits().get(),
                position: pos.vec(),
                state: state.state,
                facing_left: facing.left,
                route_switches: switches.count,
            })
            .collect();
        agents.sort_by_key(|a| a.id);

        RenderSnapshot {
            tick: self.tick,
            segments,
            preview,
            footprint_preview,
            buildings,
            agents,
            purse: self.purse.snapshot(),
        }
    }
}
