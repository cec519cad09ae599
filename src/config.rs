//! Runtime tunables for the sandbox.
//!
//! Values come from built-in defaults, optionally replaced by a JSON file
//! (`SANDBOX_CONFIG`), then by individual environment overrides. A `.env`
//! file in the working directory is honoured.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Result, SandboxError};
use crate::protocol::Cell;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// World units per cell.
    pub tile_size: f32,
    /// Where agents spawn and return to.
    pub entrance: Cell,
    /// Length of the straight road laid upwards from the entrance at start-up.
    pub entrance_run: u32,
    /// Agent speed in cells per second.
    pub agent_speed: f32,
    /// Waypoint arrival distance, in cells.
    pub arrival_epsilon: f32,
    pub max_route_switches: u32,
    /// Seconds between building scans.
    pub scan_interval: f32,
    /// Scan radius, in cells.
    pub scan_radius: f32,
    /// Seconds between agent spawns.
    pub spawn_interval: f32,
    /// Maximum live agents. `None` is unbounded.
    pub population_cap: Option<usize>,
    pub starting_money: i64,
    pub starting_faith: i64,
    pub terrain_seed: u32,
    pub rng_seed: u64,
    /// Optional building catalog file.
    pub buildings_path: Option<PathBuf>,
}

impl Default for SandboxConfig {
    fn default() -> Self {
        SandboxConfig {
            tile_size: 1.0,
            entrance: Cell::new(0, -21),
            entrance_run: 12,
            agent_speed: 2.0,
            arrival_epsilon: 0.1,
            max_route_switches: 4,
            scan_interval: 5.0,
            scan_radius: 1.0,
            spawn_interval: 3.0,
            population_cap: None,
            starting_money: 10,
            starting_faith: 10,
            terrain_seed: 42,
            rng_seed: 0,
            buildings_path: None,
        }
    }
}

impl SandboxConfig {
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: SandboxConfig =
            serde_json::from_str(contents).map_err(|e| SandboxError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file on disk.
    /// Falls back to the defaults if the file is missing or malformed.
    pub fn load_from_file(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => match Self::from_json(&contents) {
                Ok(config) => {
                    info!("Loaded sandbox config from {}", path.display());
                    config
                }
                Err(e) => {
                    warn!(
                        "Failed to parse sandbox config at {}: {}. Using defaults.",
                        path.display(),
                        e
                    );
                    SandboxConfig::default()
                }
            },
            Err(e) => {
                warn!(
                    "Failed to read sandbox config at {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                SandboxConfig::default()
            }
        }
    }

    /// Defaults, then `SANDBOX_CONFIG`, then the individual env overrides.
    pub fn from_env() -> Self {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!("Failed to load .env: {}", e);
            }
        }

        let mut config = match std::env::var("SANDBOX_CONFIG") {
            Ok(path) if !path.is_empty() => Self::load_from_file(Path::new(&path)),
            _ => SandboxConfig::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Apply `SANDBOX_SEED`, `SANDBOX_MAX_SWITCHES` and `SANDBOX_BUILDINGS`
    /// from `lookup`. Unparseable values are ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup("SANDBOX_SEED").filter(|v| !v.is_empty()) {
            match raw.parse::<u64>() {
                Ok(seed) => {
                    self.rng_seed = seed;
                    self.terrain_seed = seed as u32;
                }
                Err(e) => warn!("Ignoring SANDBOX_SEED={}: {}", raw, e),
            }
        }
        if let Some(raw) = lookup("SANDBOX_MAX_SWITCHES").filter(|v| !v.is_empty()) {
            match raw.parse::<u32>() {
                Ok(n) => self.max_route_switches = n,
                Err(e) => warn!("Ignoring SANDBOX_MAX_SWITCHES={}: {}", raw, e),
            }
        }
        if let Some(raw) = lookup("SANDBOX_BUILDINGS").filter(|v| !v.is_empty()) {
            self.buildings_path = Some(PathBuf::from(raw));
        }
    }

    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("tile_size", self.tile_size),
            ("agent_speed", self.agent_speed),
            ("arrival_epsilon", self.arrival_epsilon),
            ("scan_interval", self.scan_interval),
            ("spawn_interval", self.spawn_interval),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(SandboxError::Config(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(self.scan_radius.is_finite() && self.scan_radius >= 0.0) {
            return Err(SandboxError::Config(format!(
                "scan_radius must not be negative, got {}",
                self.scan_radius
            )));
        }
        Ok(())
    }
}
