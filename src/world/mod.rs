//! Rigid-body physics for scene objects
//!
//! Keeps a set of renderable scene nodes in lockstep with rapier-simulated
//! bodies. Shapes and bodies are built from per-entity descriptors, tracked in
//! a registry keyed by entity id, advanced once per frame and copied back into
//! the renderables during the sync pass.

pub mod shapes;
pub mod bodies;
pub mod registry;
pub mod simulation;
pub mod stepper;
pub mod lifecycle;
pub mod events;
pub mod scene;

pub use shapes::{create_shape, ShapeDescriptor, ShapeHandle, ShapeKind};
pub use bodies::{create_body, BodySpec, Material, MotionClass, Pose};
pub use registry::{BodyRecord, BodyRegistry};
pub use simulation::{BodyHandle, BodyTransform, SimulationWorld};
pub use stepper::{FrameStep, StepTiming, StepperState, WorldStepper};
pub use lifecycle::LifecycleCoordinator;
pub use events::{EntityDescriptor, EntityId, SceneHandle, SceneRequest};
pub use scene::PhysicsScene;

use crate::rendering::scene::NodeId;
use thiserror::Error;

/// Broad classes of physics failures. None of them are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Bad shape or motion input; the entity never enters the simulation.
    Configuration,
    /// Registry bookkeeping went out of step with the entity lifecycle.
    RegistryConsistency,
    /// The engine or the frame loop can no longer be trusted.
    EngineFault,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PhysicsError {
    #[error("Unsupported shape kind: {kind}")]
    UnsupportedShapeKind { kind: String },

    #[error("Unsupported motion class: {class}")]
    UnsupportedMotionClass { class: String },

    #[error("Invalid dimensions for {kind}: {reason}")]
    InvalidDimensions { kind: String, reason: String },

    #[error("Invalid pose: {reason}")]
    InvalidPose { reason: String },

    #[error("Invalid material: {reason}")]
    InvalidMaterial { reason: String },

    #[error("Entity {entity} is already registered")]
    DuplicateEntity { entity: EntityId },

    #[error("Entity {entity} is not registered")]
    UnknownEntity { entity: EntityId },

    #[error("Entity {entity} does not have a kinematic body")]
    NotKinematic { entity: EntityId },

    #[error("Renderable {node} is missing for entity {entity}")]
    RenderableMissing { entity: EntityId, node: NodeId },

    #[error("Body {body:?} is not present in the simulation world")]
    UnknownBody { body: BodyHandle },

    #[error("Simulation world is not running")]
    WorldNotReady,

    #[error("Simulation world is already initialized")]
    AlreadyInitialized,

    #[error("Physics engine fault: {reason}")]
    EngineFault { reason: String },
}

impl PhysicsError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            PhysicsError::UnsupportedShapeKind { .. }
            | PhysicsError::UnsupportedMotionClass { .. }
            | PhysicsError::InvalidDimensions { .. }
            | PhysicsError::InvalidPose { .. }
            | PhysicsError::InvalidMaterial { .. } => ErrorCategory::Configuration,
            PhysicsError::DuplicateEntity { .. }
            | PhysicsError::UnknownEntity { .. }
            | PhysicsError::NotKinematic { .. }
            | PhysicsError::RenderableMissing { .. }
            | PhysicsError::UnknownBody { .. } => ErrorCategory::RegistryConsistency,
            PhysicsError::WorldNotReady
            | PhysicsError::AlreadyInitialized
            | PhysicsError::EngineFault { .. } => ErrorCategory::EngineFault,
        }
    }

    pub fn is_configuration(&self) -> bool {
        self.category() == ErrorCategory::Configuration
    }
}

pub type PhysicsResult<T> = Result<T, PhysicsError>;

/// A renderable transform the sync pass writes into.
pub trait TransformTarget {
    fn set_position(&mut self, x: f32, y: f32, z: f32);

    /// Orientation as an (x, y, z, w) quaternion.
    fn set_orientation(&mut self, x: f32, y: f32, z: f32, w: f32);
}

/// Lookup-only access to the renderables owned by the scene.
///
/// The physics side never owns a renderable; it resolves a [`NodeId`] each
/// time it needs one and treats a failed lookup as a dead reference.
pub trait RenderableProvider {
    type Target: TransformTarget;

    fn is_live(&self, node: NodeId) -> bool;

    fn target_mut(&mut self, node: NodeId) -> Option<&mut Self::Target>;
}
