pub mod graph;

pub use graph::SceneGraph;

use cgmath::{One, Quaternion, Vector3};
use std::fmt;

use crate::world::TransformTarget;

/// Identifier of a node in the [`SceneGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub scale: Vector3<f32>,
    pub mesh_id: String,
    pub material_id: String,
}

impl Object {
    pub fn new(mesh_id: impl Into<String>, material_id: impl Into<String>) -> Self {
        Self {
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::one(),
            scale: Vector3::new(1.0, 1.0, 1.0),
            mesh_id: mesh_id.into(),
            material_id: material_id.into(),
        }
    }

    pub fn with_position(mut self, x: f32, y: f32, z: f32) -> Self {
        self.position = Vector3::new(x, y, z);
        self
    }

    pub fn with_scale(mut self, x: f32, y: f32, z: f32) -> Self {
        self.scale = Vector3::new(x, y, z);
        self
    }
}

impl TransformTarget for Object {
    fn set_position(&mut self, x: f32, y: f32, z: f32) {
        self.position.x = x;
        self.position.y = y;
        self.position.z = z;
    }

    fn set_orientation(&mut self, x: f32, y: f32, z: f32, w: f32) {
        // cgmath stores the scalar part first
        self.rotation = Quaternion::new(w, x, y, z);
    }
}
