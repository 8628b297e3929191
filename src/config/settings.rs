use std::fs;
use std::path::{Path, PathBuf};
use directories::ProjectDirs;
use serde::{Serialize, Deserialize};

const PHYSICS_CONFIG_FILE: &str = "physics.toml";
const ENV_PREFIX: &str = "SLV_PHYSICS";

/// Frame rate below which frame time is clamped.
pub const MIN_TIMESTEP_HZ: f32 = 30.0;
/// Frame rate below which a frame is split into sub-steps.
pub const SUBSTEP_THRESHOLD_HZ: f32 = 55.0;
/// Sub-steps used once a frame crosses the threshold.
pub const SLOW_FRAME_SUB_STEPS: u32 = 2;
/// Margin kept around box shapes.
pub const DEFAULT_CONVEX_RADIUS: f32 = 0.05;
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -10.0, 0.0];

// =============================================================================
// Physics Configuration
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub gravity: [f32; 3],
    pub timing: TimingSettings,
    pub shapes: ShapeSettings,
    pub materials: MaterialSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub min_timestep_hz: f32,
    pub substep_threshold_hz: f32,
    pub slow_frame_sub_steps: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeSettings {
    pub convex_radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MaterialSettings {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            timing: TimingSettings::default(),
            shapes: ShapeSettings::default(),
            materials: MaterialSettings::default(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            min_timestep_hz: MIN_TIMESTEP_HZ,
            substep_threshold_hz: SUBSTEP_THRESHOLD_HZ,
            slow_frame_sub_steps: SLOW_FRAME_SUB_STEPS,
        }
    }
}

impl Default for ShapeSettings {
    fn default() -> Self {
        Self {
            convex_radius: DEFAULT_CONVEX_RADIUS,
        }
    }
}

impl Default for MaterialSettings {
    fn default() -> Self {
        Self {
            restitution: 0.0,
            friction: 0.5,
            density: 1.0,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid physics setting {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Failed to read physics settings: {0}")]
    Source(#[from] config::ConfigError),

    #[error("Failed to parse physics settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write physics settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Physics settings I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl PhysicsSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if !self.gravity.iter().all(|g| g.is_finite()) {
            return Err(SettingsError::Invalid {
                field: "gravity",
                reason: format!("{:?} is not finite", self.gravity),
            });
        }
        let timing = &self.timing;
        if !(timing.min_timestep_hz.is_finite() && timing.min_timestep_hz > 0.0) {
            return Err(SettingsError::Invalid {
                field: "timing.min_timestep_hz",
                reason: format!("{} must be positive", timing.min_timestep_hz),
            });
        }
        if !(timing.substep_threshold_hz.is_finite()
            && timing.substep_threshold_hz >= timing.min_timestep_hz)
        {
            return Err(SettingsError::Invalid {
                field: "timing.substep_threshold_hz",
                reason: format!(
                    "{} must be at least min_timestep_hz ({})",
                    timing.substep_threshold_hz, timing.min_timestep_hz
                ),
            });
        }
        if timing.slow_frame_sub_steps == 0 {
            return Err(SettingsError::Invalid {
                field: "timing.slow_frame_sub_steps",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.shapes.convex_radius.is_finite() && self.shapes.convex_radius >= 0.0) {
            return Err(SettingsError::Invalid {
                field: "shapes.convex_radius",
                reason: format!("{} must be non-negative", self.shapes.convex_radius),
            });
        }
        let materials = &self.materials;
        if !(materials.restitution.is_finite() && materials.restitution >= 0.0) {
            return Err(SettingsError::Invalid {
                field: "materials.restitution",
                reason: format!("{} must be non-negative", materials.restitution),
            });
        }
        if !(materials.friction.is_finite() && materials.friction >= 0.0) {
            return Err(SettingsError::Invalid {
                field: "materials.friction",
                reason: format!("{} must be non-negative", materials.friction),
            });
        }
        if !(materials.density.is_finite() && materials.density > 0.0) {
            return Err(SettingsError::Invalid {
                field: "materials.density",
                reason: format!("{} must be positive", materials.density),
            });
        }
        Ok(())
    }

    pub fn from_toml_str(data: &str) -> Result<Self, SettingsError> {
        let settings: PhysicsSettings = toml::from_str(data)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Layers an optional TOML file and `SLV_PHYSICS__*` environment overrides
    /// on top of the defaults.
    pub fn load_layered(path: Option<&Path>) -> Result<Self, SettingsError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path.to_path_buf()).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );
        let settings: PhysicsSettings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }
}

// Physics configuration file management
pub fn physics_config_path() -> Option<PathBuf> {
    ProjectDirs::from("com", "slv", "slv-physics")
        .map(|proj| proj.config_dir().join(PHYSICS_CONFIG_FILE))
}

pub fn save_physics_settings_to(settings: &PhysicsSettings, path: &Path) -> Result<(), SettingsError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, settings.to_toml_string()?)?;
    Ok(())
}

pub fn load_physics_settings_from(path: &Path) -> Result<PhysicsSettings, SettingsError> {
    let data = fs::read_to_string(path)?;
    PhysicsSettings::from_toml_str(&data)
}

pub fn save_physics_settings(settings: &PhysicsSettings) -> Result<(), SettingsError> {
    match physics_config_path() {
        Some(path) => save_physics_settings_to(settings, &path),
        None => Ok(()),
    }
}

pub fn load_physics_settings() -> Option<PhysicsSettings> {
    let path = physics_config_path()?;
    match load_physics_settings_from(&path) {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::debug!("No usable physics settings at {}: {}", path.display(), e);
            None
        }
    }
}
