use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::PhysicsSettings;
use crate::world::{EntityDescriptor, EntityId, PhysicsScene};

/// One entry of a scene description file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneEntity {
    pub name: String,
    #[serde(default = "default_material")]
    pub material: String,
    pub body: EntityDescriptor,
}

fn default_material() -> String {
    "default".to_string()
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SceneFile {
    pub entities: Vec<SceneEntity>,
}

impl SceneFile {
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scene file {}", path.display()))?;
        toml::from_str(&data).with_context(|| format!("Invalid scene file {}", path.display()))
    }

    /// Floor, a falling box, a bouncing ball and a kinematic platform.
    pub fn demo() -> Self {
        let entity = |name: &str, material: &str, body: EntityDescriptor| SceneEntity {
            name: name.to_string(),
            material: material.to_string(),
            body,
        };
        Self {
            entities: vec![
                entity(
                    "floor",
                    "grass",
                    EntityDescriptor::new("box", vec![100.0, 1.0, 100.0], "static", (0.0, -1.0, 0.0)),
                ),
                entity(
                    "crate",
                    "wood",
                    EntityDescriptor::new("box", vec![1.0, 1.0, 1.0], "dynamic", (0.0, 10.0, 0.0))
                        .with_restitution(0.5),
                ),
                entity(
                    "ball",
                    "rubber",
                    EntityDescriptor::new("sphere", vec![0.5], "dynamic", (2.0, 6.0, 0.0))
                        .with_restitution(0.7),
                ),
                entity(
                    "platform",
                    "metal",
                    EntityDescriptor::new("box", vec![3.0, 0.25, 3.0], "kinematic", (-4.0, 1.0, 0.0)),
                ),
            ],
        }
    }

    /// Adds `count` boxes dropped from random heights above the origin.
    pub fn scatter(&mut self, count: usize, seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        for i in 0..count {
            let x = rng.random_range(-3.0..3.0);
            let y = rng.random_range(4.0..16.0);
            let z = rng.random_range(-3.0..3.0);
            let edge = rng.random_range(0.3..1.0);
            self.entities.push(SceneEntity {
                name: format!("debris-{}", i),
                material: default_material(),
                body: EntityDescriptor::new("box", vec![edge, edge, edge], "dynamic", (x, y, z))
                    .with_restitution(0.2),
            });
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub frames: u64,
    pub frame_rate: f32,
    /// Pace frames against the wall clock instead of feeding fixed deltas.
    pub real_time: bool,
    pub scene_path: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
    pub scatter: usize,
    pub seed: u64,
    pub report_every: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            frames: 600,
            frame_rate: 60.0,
            real_time: false,
            scene_path: None,
            settings_path: None,
            scatter: 0,
            seed: 7,
            report_every: 60,
        }
    }
}

impl AppConfig {
    /// Parses `--frames N`, `--rate HZ`, `--real-time`, `--scene PATH`,
    /// `--settings PATH`, `--scatter N`, `--seed N` and `--report-every N`.
    pub fn from_args<I>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = String>,
    {
        let mut config = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            let mut value = |name: &str| {
                args.next()
                    .with_context(|| format!("Missing value for {}", name))
            };
            match arg.as_str() {
                "--frames" => config.frames = value("--frames")?.parse().context("Invalid --frames")?,
                "--rate" => config.frame_rate = value("--rate")?.parse().context("Invalid --rate")?,
                "--real-time" => config.real_time = true,
                "--scene" => config.scene_path = Some(PathBuf::from(value("--scene")?)),
                "--settings" => config.settings_path = Some(PathBuf::from(value("--settings")?)),
                "--scatter" => config.scatter = value("--scatter")?.parse().context("Invalid --scatter")?,
                "--seed" => config.seed = value("--seed")?.parse().context("Invalid --seed")?,
                "--report-every" => {
                    config.report_every = value("--report-every")?.parse().context("Invalid --report-every")?
                }
                other => anyhow::bail!("Unknown argument: {}", other),
            }
        }
        if !(config.frame_rate.is_finite() && config.frame_rate > 0.0) {
            anyhow::bail!("Frame rate must be positive, got {}", config.frame_rate);
        }
        Ok(config)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BodySnapshot {
    pub name: String,
    pub position: [f32; 3],
    pub rotation: [f32; 4],
}

#[derive(Debug, Clone, Serialize)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub simulated_time: f64,
    pub bodies: Vec<BodySnapshot>,
}

/// Wall-clock frame timer.
pub struct FrameClock {
    last: Instant,
}

impl FrameClock {
    pub fn start() -> Self {
        Self { last: Instant::now() }
    }

    /// Seconds since the previous call.
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last);
        self.last = now;
        elapsed.as_secs_f32()
    }
}

pub struct App {
    config: AppConfig,
    scene: PhysicsScene,
    names: Vec<(String, EntityId)>,
    platform: Option<(EntityId, (f32, f32, f32))>,
}

impl App {
    pub async fn new(config: AppConfig) -> Result<Self> {
        let settings = PhysicsSettings::load_layered(config.settings_path.as_deref())
            .context("Failed to load physics settings")?;
        crate::utils::logging::log_physics_settings(&settings);

        let mut scene_file = match &config.scene_path {
            Some(path) => SceneFile::load(path)?,
            None => SceneFile::demo(),
        };
        scene_file.scatter(config.scatter, config.seed);

        let mut scene = PhysicsScene::load(settings).await?;
        let mut names = Vec::with_capacity(scene_file.entities.len());
        let mut platform = None;
        for entry in &scene_file.entities {
            let object = entry.body.to_object(entry.material.clone());
            let entity = scene
                .spawn(object, &entry.body)
                .with_context(|| format!("Failed to spawn {}", entry.name))?;
            if entry.body.motion_class.eq_ignore_ascii_case("kinematic") && platform.is_none() {
                platform = Some((entity, entry.body.position));
            }
            names.push((entry.name.clone(), entity));
        }
        info!("Scene loaded with {} entities", names.len());

        Ok(Self {
            config,
            scene,
            names,
            platform,
        })
    }

    pub fn scene(&self) -> &PhysicsScene {
        &self.scene
    }

    pub fn snapshot(&self) -> FrameSnapshot {
        let bodies = self
            .names
            .iter()
            .filter_map(|(name, entity)| {
                let object = self.scene.object(*entity)?;
                let r = object.rotation;
                Some(BodySnapshot {
                    name: name.clone(),
                    position: [object.position.x, object.position.y, object.position.z],
                    rotation: [r.v.x, r.v.y, r.v.z, r.s],
                })
            })
            .collect();
        FrameSnapshot {
            frame: self.scene.stepper().frames(),
            simulated_time: self.scene.world().map_or(0.0, |world| world.simulated_time()),
            bodies,
        }
    }

    /// Sways the first kinematic body back and forth.
    fn drive_platform(&mut self, time: f64) -> Result<()> {
        if let Some((entity, (x, y, z))) = self.platform {
            let offset = (time * 0.5).sin() as f32 * 2.0;
            self.scene.move_kinematic(entity, (x, y, z + offset), (0.0, 0.0, 0.0, 1.0))?;
        }
        Ok(())
    }

    /// Runs the configured number of frames and returns the final snapshot.
    pub async fn run(&mut self) -> Result<FrameSnapshot> {
        let frame_time = 1.0 / self.config.frame_rate;
        let mut interval = tokio::time::interval(Duration::from_secs_f32(frame_time));
        let mut clock = FrameClock::start();

        for frame in 1..=self.config.frames {
            let raw_delta = if self.config.real_time {
                interval.tick().await;
                clock.tick()
            } else {
                frame_time
            };

            let time = self.scene.world().map_or(0.0, |world| world.simulated_time());
            self.drive_platform(time)?;
            let step = self
                .scene
                .frame(raw_delta)
                .with_context(|| format!("Frame {} failed", frame))?;
            debug!("Frame {}: {:?}", frame, step);

            if self.config.report_every > 0 && frame % self.config.report_every == 0 {
                for body in self.snapshot().bodies {
                    info!("[frame {}] {} at {:?}", frame, body.name, body.position);
                }
            }
        }
        Ok(self.snapshot())
    }
}
