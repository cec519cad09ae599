pub mod config;
pub mod ecs;
pub mod error;
pub mod game;
pub mod protocol;
pub mod sandbox;

pub use config::SandboxConfig;
pub use error::{Result, SandboxError};
pub use sandbox::{GestureOutcome, Sandbox, TickReport, FIXED_DT};
