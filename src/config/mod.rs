pub mod settings;

// Re-export commonly used types
pub use settings::{
    PhysicsSettings, TimingSettings, ShapeSettings, MaterialSettings, SettingsError,
    MIN_TIMESTEP_HZ, SUBSTEP_THRESHOLD_HZ, SLOW_FRAME_SUB_STEPS, DEFAULT_CONVEX_RADIUS, DEFAULT_GRAVITY,
    physics_config_path, save_physics_settings, load_physics_settings,
    save_physics_settings_to, load_physics_settings_from,
};
