// SLV-Physics: rigid-body simulation for the viewer render loop
// Bodies follow renderables, renderables follow bodies

pub mod utils;
pub mod config;
pub mod app;

pub mod rendering;
pub mod world;

// Re-export commonly used types for convenience
pub use config::{PhysicsSettings, SettingsError};
pub use rendering::scene::{NodeId, Object, SceneGraph};
pub use world::{
    EntityDescriptor, EntityId, ErrorCategory, PhysicsError, PhysicsResult, PhysicsScene,
    SceneHandle, SimulationWorld, WorldStepper,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
