//! World stepper
//!
//! Owns the simulation world and drives it once per rendered frame: clamp
//! the frame time, pick a sub-step count, advance the engine, then copy every
//! registered body's transform into its renderable.

use std::fmt;

use tracing::{debug, error, info, trace};

use crate::config::{PhysicsSettings, TimingSettings};
use super::registry::BodyRegistry;
use super::simulation::SimulationWorld;
use super::{PhysicsError, PhysicsResult, RenderableProvider, TransformTarget};

/// Time step chosen for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameStep {
    /// Seconds simulated this frame, after clamping.
    pub delta: f32,
    /// Equal engine steps `delta` is split into.
    pub sub_steps: u32,
}

impl FrameStep {
    pub fn sub_step_delta(&self) -> f32 {
        self.delta / self.sub_steps as f32
    }
}

/// Two-tier timestep policy.
///
/// Frame time is capped at one `min_timestep_hz` frame so a stall cannot
/// snowball into ever longer steps. Frames slower than `substep_threshold_hz`
/// are split into `slow_frame_sub_steps` steps, everything else runs as one.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepTiming {
    pub max_delta: f32,
    pub substep_threshold: f32,
    pub slow_frame_sub_steps: u32,
}

impl StepTiming {
    pub fn from_settings(timing: &TimingSettings) -> Self {
        Self {
            max_delta: 1.0 / timing.min_timestep_hz,
            substep_threshold: 1.0 / timing.substep_threshold_hz,
            slow_frame_sub_steps: timing.slow_frame_sub_steps.max(1),
        }
    }

    pub fn frame_step(&self, raw_delta: f32) -> FrameStep {
        // NaN and negative frame times (clock hiccups) simulate nothing
        let delta = if raw_delta.is_nan() || raw_delta <= 0.0 {
            0.0
        } else {
            raw_delta.min(self.max_delta)
        };
        let sub_steps = if delta > self.substep_threshold {
            self.slow_frame_sub_steps
        } else {
            1
        };
        FrameStep { delta, sub_steps }
    }
}

impl Default for StepTiming {
    fn default() -> Self {
        Self::from_settings(&TimingSettings::default())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepperState {
    Uninitialized,
    Running,
}

impl fmt::Display for StepperState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StepperState::Uninitialized => write!(f, "Uninitialized"),
            StepperState::Running => write!(f, "Running"),
        }
    }
}

pub struct WorldStepper {
    settings: PhysicsSettings,
    timing: StepTiming,
    world: Option<SimulationWorld>,
    frames: u64,
    last_step: Option<FrameStep>,
    faulted: bool,
}

impl WorldStepper {
    pub fn new(settings: PhysicsSettings) -> Self {
        let timing = StepTiming::from_settings(&settings.timing);
        Self {
            settings,
            timing,
            world: None,
            frames: 0,
            last_step: None,
            faulted: false,
        }
    }

    /// Stepper that is already running on `world`.
    pub fn with_world(settings: PhysicsSettings, world: SimulationWorld) -> Self {
        let mut stepper = Self::new(settings);
        stepper.world = Some(world);
        stepper
    }

    /// Loads the simulation world. Runs once; frames cannot tick before it
    /// resolves.
    pub async fn initialize(&mut self) -> PhysicsResult<()> {
        if self.world.is_some() {
            return Err(PhysicsError::AlreadyInitialized);
        }
        let world = SimulationWorld::load(self.settings.clone()).await?;
        self.world = Some(world);
        info!("World stepper running");
        Ok(())
    }

    pub fn state(&self) -> StepperState {
        if self.world.is_some() {
            StepperState::Running
        } else {
            StepperState::Uninitialized
        }
    }

    pub fn timing(&self) -> &StepTiming {
        &self.timing
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    pub fn world(&self) -> PhysicsResult<&SimulationWorld> {
        self.world.as_ref().ok_or(PhysicsError::WorldNotReady)
    }

    pub fn world_mut(&mut self) -> PhysicsResult<&mut SimulationWorld> {
        self.world.as_mut().ok_or(PhysicsError::WorldNotReady)
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn last_step(&self) -> Option<FrameStep> {
        self.last_step
    }

    pub fn is_faulted(&self) -> bool {
        self.faulted
    }

    /// Runs one frame: simulate, then sync every registered body.
    ///
    /// Any error leaves the stepper faulted and every later tick fails.
    pub fn tick<R: RenderableProvider>(
        &mut self,
        raw_delta: f32,
        registry: &BodyRegistry,
        renderables: &mut R,
    ) -> PhysicsResult<FrameStep> {
        if self.faulted {
            return Err(PhysicsError::EngineFault {
                reason: "stepper halted after an earlier fault".to_string(),
            });
        }
        let step = self.timing.frame_step(raw_delta);
        let world = self.world.as_mut().ok_or(PhysicsError::WorldNotReady)?;

        let result = world
            .step(step.delta, step.sub_steps)
            .and_then(|()| sync_transforms(world, registry, renderables));
        match result {
            Ok(synced) => {
                self.frames += 1;
                self.last_step = Some(step);
                trace!(
                    "Frame {}: {:.5}s in {} sub-steps, {} bodies synced",
                    self.frames,
                    step.delta,
                    step.sub_steps,
                    synced
                );
                if raw_delta > self.timing.max_delta {
                    debug!("Frame time {:.4}s clamped to {:.4}s", raw_delta, step.delta);
                }
                Ok(step)
            }
            Err(e) => {
                error!("Frame {} failed: {}", self.frames + 1, e);
                self.faulted = true;
                Err(e)
            }
        }
    }
}

/// Copies every registered body's transform into its renderable.
///
/// Either every record is written or the frame fails; a record whose body or
/// renderable cannot be resolved aborts the pass.
pub fn sync_transforms<R: RenderableProvider>(
    world: &SimulationWorld,
    registry: &BodyRegistry,
    renderables: &mut R,
) -> PhysicsResult<usize> {
    let mut synced = 0;
    registry.try_for_each(|entity, record| {
        let transform = world
            .body_transform(record.body)
            .ok_or(PhysicsError::UnknownBody { body: record.body })?;
        let target = renderables
            .target_mut(record.renderable)
            .ok_or(PhysicsError::RenderableMissing { entity, node: record.renderable })?;
        let [x, y, z] = transform.position;
        target.set_position(x, y, z);
        let [qx, qy, qz, qw] = transform.rotation;
        target.set_orientation(qx, qy, qz, qw);
        synced += 1;
        Ok(())
    })?;
    Ok(synced)
}
