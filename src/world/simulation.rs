//! The simulation world
//!
//! Owns every piece of rapier state for one running scene. There is exactly
//! one world per scene; it is created when the scene loads and dropped with it.

use rapier3d::na::Vector3;
use rapier3d::prelude::*;
use tracing::{debug, error, info};

use crate::config::PhysicsSettings;
use crate::utils::math::{from_engine_rotation, from_engine_vector, is_finite3, to_engine_vector};
use super::{PhysicsError, PhysicsResult};

/// Opaque reference to a body living in a [`SimulationWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub(crate) RigidBodyHandle);

/// World-space transform of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyTransform {
    pub position: [f32; 3],
    /// (x, y, z, w)
    pub rotation: [f32; 4],
}

impl BodyTransform {
    pub fn is_finite(&self) -> bool {
        self.position.iter().chain(self.rotation.iter()).all(|v| v.is_finite())
    }
}

pub struct SimulationWorld {
    gravity: Vector3<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    simulated_time: f64,
    engine_steps: u64,
}

impl SimulationWorld {
    /// Builds a world directly. Prefer [`SimulationWorld::load`] from async
    /// contexts so the frame loop never waits on engine setup.
    pub fn new(settings: &PhysicsSettings) -> Self {
        let [gx, gy, gz] = settings.gravity;
        Self {
            gravity: to_engine_vector((gx, gy, gz)),
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            simulated_time: 0.0,
            engine_steps: 0,
        }
    }

    /// Sets up the engine off the calling task and resolves once it is ready.
    pub async fn load(settings: PhysicsSettings) -> PhysicsResult<Self> {
        let world = tokio::task::spawn_blocking(move || SimulationWorld::new(&settings))
            .await
            .map_err(|e| PhysicsError::EngineFault {
                reason: format!("world initialization failed: {}", e),
            })?;
        info!("Simulation world ready, gravity {:?}", world.gravity());
        Ok(world)
    }

    pub fn gravity(&self) -> [f32; 3] {
        from_engine_vector(&self.gravity)
    }

    pub fn set_gravity(&mut self, gravity: [f32; 3]) {
        let [gx, gy, gz] = gravity;
        self.gravity = to_engine_vector((gx, gy, gz));
        for (_, body) in self.bodies.iter_mut() {
            body.wake_up(true);
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn collider_count(&self) -> usize {
        self.colliders.len()
    }

    pub fn contains(&self, handle: BodyHandle) -> bool {
        self.bodies.contains(handle.0)
    }

    /// Total time advanced by [`SimulationWorld::step`], in seconds.
    pub fn simulated_time(&self) -> f64 {
        self.simulated_time
    }

    /// Number of engine sub-steps taken so far.
    pub fn engine_steps(&self) -> u64 {
        self.engine_steps
    }

    pub(crate) fn insert_body(&mut self, body: RigidBody, collider: Collider) -> BodyHandle {
        let handle = self.bodies.insert(body);
        self.colliders.insert_with_parent(collider, handle, &mut self.bodies);
        BodyHandle(handle)
    }

    /// Wakes a body so the next step integrates it.
    pub fn activate(&mut self, handle: BodyHandle) -> PhysicsResult<()> {
        let body = self
            .bodies
            .get_mut(handle.0)
            .ok_or(PhysicsError::UnknownBody { body: handle })?;
        body.wake_up(true);
        Ok(())
    }

    pub fn is_awake(&self, handle: BodyHandle) -> bool {
        self.bodies.get(handle.0).map_or(false, |body| !body.is_sleeping())
    }

    pub fn is_kinematic(&self, handle: BodyHandle) -> bool {
        self.bodies.get(handle.0).map_or(false, |body| body.is_kinematic())
    }

    /// Removes a body together with its colliders.
    pub fn destroy_body(&mut self, handle: BodyHandle) -> PhysicsResult<()> {
        self.bodies
            .remove(
                handle.0,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            )
            .ok_or(PhysicsError::UnknownBody { body: handle })?;
        debug!("Destroyed body {:?}", handle);
        Ok(())
    }

    pub fn body_transform(&self, handle: BodyHandle) -> Option<BodyTransform> {
        let body = self.bodies.get(handle.0)?;
        Some(BodyTransform {
            position: from_engine_vector(body.translation()),
            rotation: from_engine_rotation(body.rotation()),
        })
    }

    pub fn linear_velocity(&self, handle: BodyHandle) -> Option<[f32; 3]> {
        self.bodies.get(handle.0).map(|body| from_engine_vector(body.linvel()))
    }

    /// Queues the pose a kinematic body reaches by the end of the next step.
    pub fn set_kinematic_target(&mut self, handle: BodyHandle, pose: Isometry<Real>) -> PhysicsResult<()> {
        let body = self
            .bodies
            .get_mut(handle.0)
            .ok_or(PhysicsError::UnknownBody { body: handle })?;
        body.set_next_kinematic_position(pose);
        Ok(())
    }

    /// Advances the world by `delta` seconds in `sub_steps` equal engine steps.
    ///
    /// Any body left with a non-finite transform is reported as an engine
    /// fault; the world should not be stepped again after that.
    pub fn step(&mut self, delta: f32, sub_steps: u32) -> PhysicsResult<()> {
        if !(delta.is_finite() && delta >= 0.0) || sub_steps == 0 {
            return Err(PhysicsError::EngineFault {
                reason: format!("invalid step request: {} s in {} sub-steps", delta, sub_steps),
            });
        }
        if delta == 0.0 {
            return Ok(());
        }

        self.integration_parameters.dt = delta / sub_steps as Real;
        for _ in 0..sub_steps {
            self.pipeline.step(
                &self.gravity,
                &self.integration_parameters,
                &mut self.islands,
                &mut self.broad_phase,
                &mut self.narrow_phase,
                &mut self.bodies,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                &mut self.ccd_solver,
                None,
                &(),
                &(),
            );
            self.engine_steps += 1;
        }
        self.simulated_time += delta as f64;

        for (handle, body) in self.bodies.iter() {
            let translation = body.translation();
            let rotation = body.rotation();
            let finite = is_finite3((translation.x, translation.y, translation.z))
                && rotation.coords.iter().all(|c| c.is_finite());
            if !finite {
                error!("Body {:?} diverged after step: {:?}", handle, translation);
                return Err(PhysicsError::EngineFault {
                    reason: format!("body {:?} has a non-finite transform", handle),
                });
            }
        }
        Ok(())
    }
}
