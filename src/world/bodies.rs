//! Body factory
//!
//! Maps a motion class onto the engine's body type and collision layer, then
//! creates, attaches and activates the body in the simulation world.

use std::fmt;
use std::str::FromStr;

use rapier3d::prelude::{
    ColliderBuilder, Group, InteractionGroups, RigidBodyBuilder, RigidBodyType,
};
use rapier3d::na::UnitQuaternion;
use rapier3d::prelude::Real;
use tracing::debug;

use crate::config::PhysicsSettings;
use crate::utils::math::{is_finite3, to_engine_isometry, to_engine_rotation, IDENTITY_ROTATION};
use super::events::EntityDescriptor;
use super::shapes::{create_shape, ShapeDescriptor, ShapeHandle};
use super::simulation::{BodyHandle, SimulationWorld};
use super::{PhysicsError, PhysicsResult};

/// Layer for bodies that never move.
pub const NON_MOVING_LAYER: Group = Group::GROUP_1;
/// Layer for kinematic and dynamic bodies.
pub const MOVING_LAYER: Group = Group::GROUP_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MotionClass {
    Static,
    Kinematic,
    Dynamic,
}

impl MotionClass {
    pub fn body_type(self) -> RigidBodyType {
        match self {
            MotionClass::Static => RigidBodyType::Fixed,
            MotionClass::Kinematic => RigidBodyType::KinematicPositionBased,
            MotionClass::Dynamic => RigidBodyType::Dynamic,
        }
    }

    /// Static bodies only meet moving ones; moving bodies meet everything.
    pub fn collision_groups(self) -> InteractionGroups {
        match self {
            MotionClass::Static => InteractionGroups::new(NON_MOVING_LAYER, MOVING_LAYER),
            MotionClass::Kinematic | MotionClass::Dynamic => {
                InteractionGroups::new(MOVING_LAYER, NON_MOVING_LAYER | MOVING_LAYER)
            }
        }
    }

    pub fn is_moving(self) -> bool {
        self != MotionClass::Static
    }
}

impl fmt::Display for MotionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotionClass::Static => write!(f, "static"),
            MotionClass::Kinematic => write!(f, "kinematic"),
            MotionClass::Dynamic => write!(f, "dynamic"),
        }
    }
}

impl FromStr for MotionClass {
    type Err = PhysicsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "static" | "fixed" => Ok(MotionClass::Static),
            "kinematic" => Ok(MotionClass::Kinematic),
            "dynamic" => Ok(MotionClass::Dynamic),
            _ => Err(PhysicsError::UnsupportedMotionClass { class: s.to_string() }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Material {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
}

impl Material {
    pub fn with_restitution(restitution: f32) -> Self {
        Self {
            restitution,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> PhysicsResult<()> {
        let non_negative = |v: f32| v.is_finite() && v >= 0.0;
        if !non_negative(self.restitution) || !non_negative(self.friction) {
            return Err(PhysicsError::InvalidMaterial {
                reason: format!(
                    "restitution {} and friction {} must be finite and non-negative",
                    self.restitution, self.friction
                ),
            });
        }
        if !(self.density.is_finite() && self.density > 0.0) {
            return Err(PhysicsError::InvalidMaterial {
                reason: format!("density {} must be positive", self.density),
            });
        }
        Ok(())
    }
}

impl Default for Material {
    fn default() -> Self {
        Self {
            restitution: 0.0,
            friction: 0.5,
            density: 1.0,
        }
    }
}

/// Initial world transform of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: (f32, f32, f32),
    /// (x, y, z, w)
    pub rotation: (f32, f32, f32, f32),
}

impl Pose {
    pub fn at(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: (x, y, z),
            rotation: IDENTITY_ROTATION,
        }
    }

    pub fn with_rotation(mut self, x: f32, y: f32, z: f32, w: f32) -> Self {
        self.rotation = (x, y, z, w);
        self
    }

    fn engine_rotation(&self) -> PhysicsResult<UnitQuaternion<Real>> {
        if !is_finite3(self.position) {
            return Err(PhysicsError::InvalidPose {
                reason: format!("position {:?} is not finite", self.position),
            });
        }
        to_engine_rotation(self.rotation).ok_or_else(|| PhysicsError::InvalidPose {
            reason: format!("rotation {:?} is not a usable quaternion", self.rotation),
        })
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(0.0, 0.0, 0.0)
    }
}

/// A fully validated body request.
#[derive(Debug, Clone, PartialEq)]
pub struct BodySpec {
    pub shape: ShapeDescriptor,
    pub motion: MotionClass,
    pub pose: Pose,
    pub material: Material,
}

impl BodySpec {
    pub fn new(shape: ShapeDescriptor, motion: MotionClass, pose: Pose) -> Self {
        Self {
            shape,
            motion,
            pose,
            material: Material::default(),
        }
    }

    pub fn with_material(mut self, material: Material) -> Self {
        self.material = material;
        self
    }

    /// Validates a raw descriptor from the renderable side. Nothing touches the
    /// engine until this succeeds.
    pub fn from_descriptor(descriptor: &EntityDescriptor, settings: &PhysicsSettings) -> PhysicsResult<Self> {
        let shape = ShapeDescriptor::parse(&descriptor.shape_kind, &descriptor.dimensions)?;
        let motion: MotionClass = descriptor.motion_class.parse()?;
        let pose = Pose {
            position: descriptor.position,
            rotation: descriptor.rotation.unwrap_or(IDENTITY_ROTATION),
        };
        pose.engine_rotation()?;
        let defaults = &settings.materials;
        let material = Material {
            restitution: descriptor.restitution.unwrap_or(defaults.restitution),
            friction: descriptor.friction.unwrap_or(defaults.friction),
            density: descriptor.density.unwrap_or(defaults.density),
        };
        material.validate()?;
        Ok(Self { shape, motion, pose, material })
    }

    /// Builds the shape and the body for this spec.
    pub fn build(&self, world: &mut SimulationWorld, convex_radius: f32) -> PhysicsResult<BodyHandle> {
        let shape = create_shape(&self.shape, convex_radius)?;
        create_body(world, &shape, self.motion, self.pose, &self.material)
    }
}

/// Creates a body for `shape`, adds it to `world` and activates it.
pub fn create_body(
    world: &mut SimulationWorld,
    shape: &ShapeHandle,
    motion: MotionClass,
    pose: Pose,
    material: &Material,
) -> PhysicsResult<BodyHandle> {
    let rotation = pose.engine_rotation()?;
    material.validate()?;

    let body = RigidBodyBuilder::new(motion.body_type())
        .position(to_engine_isometry(pose.position, rotation))
        .build();
    let collider = ColliderBuilder::new(shape.shared_shape().clone())
        .restitution(material.restitution)
        .friction(material.friction)
        .density(material.density)
        .collision_groups(motion.collision_groups())
        .build();

    let handle = world.insert_body(body, collider);
    world.activate(handle)?;
    debug!(
        "Created {} {} body {:?} at {:?}",
        motion,
        shape.kind(),
        handle,
        pose.position
    );
    Ok(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::shapes::ShapeKind;

    fn descriptor(kind: &str, dims: &[f32], motion: &str) -> EntityDescriptor {
        EntityDescriptor::new(kind, dims.to_vec(), motion, (0.0, 1.0, 0.0))
    }

    #[test]
    fn test_motion_class_mapping() {
        assert_eq!(MotionClass::Static.body_type(), RigidBodyType::Fixed);
        assert_eq!(MotionClass::Kinematic.body_type(), RigidBodyType::KinematicPositionBased);
        assert_eq!(MotionClass::Dynamic.body_type(), RigidBodyType::Dynamic);
        assert!(!MotionClass::Static.is_moving());
        assert!(MotionClass::Kinematic.is_moving());
    }

    #[test]
    fn test_layers_keep_static_bodies_apart() {
        let stat = MotionClass::Static.collision_groups();
        let dynamic = MotionClass::Dynamic.collision_groups();
        let kinematic = MotionClass::Kinematic.collision_groups();

        assert!(!stat.test(stat));
        assert!(stat.test(dynamic));
        assert!(dynamic.test(dynamic));
        assert!(kinematic.test(dynamic));
    }

    #[test]
    fn test_motion_class_parse() {
        assert_eq!("Dynamic".parse::<MotionClass>().unwrap(), MotionClass::Dynamic);
        assert_eq!("fixed".parse::<MotionClass>().unwrap(), MotionClass::Static);
        let err = "floating".parse::<MotionClass>().unwrap_err();
        assert_eq!(err, PhysicsError::UnsupportedMotionClass { class: "floating".to_string() });
    }

    #[test]
    fn test_spec_from_descriptor_uses_material_defaults() {
        let settings = PhysicsSettings::default();
        let spec = BodySpec::from_descriptor(&descriptor("box", &[1.0, 1.0, 1.0], "dynamic"), &settings).unwrap();

        assert_eq!(spec.shape.kind(), ShapeKind::Box);
        assert_eq!(spec.motion, MotionClass::Dynamic);
        assert_eq!(spec.pose, Pose::at(0.0, 1.0, 0.0));
        assert_eq!(spec.material.friction, settings.materials.friction);

        let grippy = descriptor("sphere", &[0.5], "dynamic").with_friction(1.2);
        let spec = BodySpec::from_descriptor(&grippy, &settings).unwrap();
        assert_eq!(spec.material.friction, 1.2);
        assert_eq!(spec.material.density, settings.materials.density);
    }

    #[test]
    fn test_spec_rejects_bad_input() {
        let settings = PhysicsSettings::default();
        assert!(matches!(
            BodySpec::from_descriptor(&descriptor("cone", &[1.0], "dynamic"), &settings),
            Err(PhysicsError::UnsupportedShapeKind { .. })
        ));
        assert!(matches!(
            BodySpec::from_descriptor(&descriptor("sphere", &[1.0], "ghost"), &settings),
            Err(PhysicsError::UnsupportedMotionClass { .. })
        ));

        let mut zero_rotation = descriptor("sphere", &[1.0], "dynamic");
        zero_rotation.rotation = Some((0.0, 0.0, 0.0, 0.0));
        assert!(matches!(
            BodySpec::from_descriptor(&zero_rotation, &settings),
            Err(PhysicsError::InvalidPose { .. })
        ));

        let mut bouncy = descriptor("sphere", &[1.0], "dynamic");
        bouncy.restitution = Some(-1.0);
        assert!(matches!(
            BodySpec::from_descriptor(&bouncy, &settings),
            Err(PhysicsError::InvalidMaterial { .. })
        ));
    }

    #[test]
    fn test_create_body_registers_and_activates() {
        let mut world = SimulationWorld::new(&PhysicsSettings::default());
        let shape = create_shape(&ShapeDescriptor::sphere(0.5), 0.05).unwrap();
        let pose = Pose::at(1.0, 2.0, 3.0).with_rotation(0.0, 0.0, 0.0, 1.0);

        let handle = create_body(&mut world, &shape, MotionClass::Dynamic, pose, &Material::with_restitution(0.4)).unwrap();

        assert_eq!(world.body_count(), 1);
        assert_eq!(world.collider_count(), 1);
        assert!(world.is_awake(handle));
        let transform = world.body_transform(handle).unwrap();
        assert_eq!(transform.position, [1.0, 2.0, 3.0]);
        assert_eq!(transform.rotation, [0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_create_body_rejects_nan_position() {
        let mut world = SimulationWorld::new(&PhysicsSettings::default());
        let shape = create_shape(&ShapeDescriptor::sphere(0.5), 0.05).unwrap();
        let result = create_body(&mut world, &shape, MotionClass::Dynamic, Pose::at(f32::NAN, 0.0, 0.0), &Material::default());

        assert!(matches!(result, Err(PhysicsError::InvalidPose { .. })));
        assert_eq!(world.body_count(), 0);
    }
}
