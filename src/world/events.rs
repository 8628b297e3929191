use std::fmt;
use std::time::SystemTime;

use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::rendering::scene::Object;
use crate::utils::math::IDENTITY_ROTATION;

/// Unique id of one live renderable instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Physics description handed over by the renderable side when an entity is
/// created. Kind names and motion classes stay as strings until validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDescriptor {
    pub shape_kind: String,
    pub dimensions: Vec<f32>,
    pub motion_class: String,
    pub position: (f32, f32, f32),
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<(f32, f32, f32, f32)>, // quaternion (x, y, z, w)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restitution: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friction: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub density: Option<f32>,
}

impl EntityDescriptor {
    pub fn new(
        shape_kind: impl Into<String>,
        dimensions: Vec<f32>,
        motion_class: impl Into<String>,
        position: (f32, f32, f32),
    ) -> Self {
        Self {
            shape_kind: shape_kind.into(),
            dimensions,
            motion_class: motion_class.into(),
            position,
            rotation: None,
            restitution: None,
            friction: None,
            density: None,
        }
    }

    pub fn with_rotation(mut self, rotation: (f32, f32, f32, f32)) -> Self {
        self.rotation = Some(rotation);
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = Some(restitution);
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = Some(friction);
        self
    }

    /// Renderable matching this descriptor: placed at the initial pose, scaled
    /// to the shape's dimensions.
    pub fn to_object(&self, material_id: impl Into<String>) -> Object {
        let mesh = self.shape_kind.trim().to_ascii_lowercase();
        let (x, y, z) = self.position;
        let mut object = Object::new(mesh, material_id).with_position(x, y, z);
        match self.dimensions.as_slice() {
            [w, h, d] => object = object.with_scale(*w, *h, *d),
            [s] => object = object.with_scale(*s, *s, *s),
            _ => {}
        }
        let (qx, qy, qz, qw) = self.rotation.unwrap_or(IDENTITY_ROTATION);
        object.rotation = cgmath::Quaternion::new(qw, qx, qy, qz);
        object
    }
}

/// Requests funneled into the frame-driving context.
#[derive(Debug, Clone)]
pub enum SceneRequest {
    Spawn {
        entity: EntityId,
        object: Object,
        descriptor: EntityDescriptor,
        timestamp: SystemTime,
    },
    Despawn {
        entity: EntityId,
        timestamp: SystemTime,
    },
    MoveKinematic {
        entity: EntityId,
        position: (f32, f32, f32),
        rotation: (f32, f32, f32, f32),
        timestamp: SystemTime,
    },
}

impl SceneRequest {
    pub fn entity(&self) -> EntityId {
        match self {
            SceneRequest::Spawn { entity, .. }
            | SceneRequest::Despawn { entity, .. }
            | SceneRequest::MoveKinematic { entity, .. } => *entity,
        }
    }
}

/// Cloneable sender for code outside the frame loop. Requests are applied at
/// the start of the next frame, before the simulation step.
#[derive(Debug, Clone)]
pub struct SceneHandle {
    sender: Sender<SceneRequest>,
}

impl SceneHandle {
    pub(crate) fn channel() -> (SceneHandle, Receiver<SceneRequest>) {
        let (sender, receiver) = crossbeam_channel::unbounded();
        (SceneHandle { sender }, receiver)
    }

    /// Queues a new entity and returns the id it will be registered under.
    /// Returns `None` once the scene has been dropped.
    pub fn spawn(&self, object: Object, descriptor: EntityDescriptor) -> Option<EntityId> {
        let entity = EntityId::new();
        self.send(SceneRequest::Spawn {
            entity,
            object,
            descriptor,
            timestamp: SystemTime::now(),
        })
        .then_some(entity)
    }

    pub fn despawn(&self, entity: EntityId) -> bool {
        self.send(SceneRequest::Despawn {
            entity,
            timestamp: SystemTime::now(),
        })
    }

    pub fn move_kinematic(
        &self,
        entity: EntityId,
        position: (f32, f32, f32),
        rotation: (f32, f32, f32, f32),
    ) -> bool {
        self.send(SceneRequest::MoveKinematic {
            entity,
            position,
            rotation,
            timestamp: SystemTime::now(),
        })
    }

    fn send(&self, request: SceneRequest) -> bool {
        match self.sender.try_send(request) {
            Ok(()) => true,
            Err(TrySendError::Disconnected(request)) => {
                tracing::warn!("Scene is gone, dropping request for entity {}", request.entity());
                false
            }
            Err(TrySendError::Full(_)) => false,
        }
    }
}
