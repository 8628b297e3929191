//! Lifecycle coordinator
//!
//! Ties entity creation and destruction to body creation and destruction.
//! An entity has at most one body; a body never outlives its entity. The
//! registry entry goes first on removal, then the body.

use tracing::{debug, info, warn};

use crate::config::PhysicsSettings;
use crate::rendering::scene::NodeId;
use crate::utils::math::{is_finite3, to_engine_isometry, to_engine_rotation};
use super::bodies::BodySpec;
use super::events::{EntityDescriptor, EntityId};
use super::registry::BodyRegistry;
use super::simulation::{BodyHandle, SimulationWorld};
use super::{PhysicsError, PhysicsResult, RenderableProvider};

/// Borrowed view over the world and registry for the mutation phase of a frame.
pub struct LifecycleCoordinator<'a> {
    world: &'a mut SimulationWorld,
    registry: &'a mut BodyRegistry,
    settings: &'a PhysicsSettings,
}

impl<'a> LifecycleCoordinator<'a> {
    pub fn new(
        world: &'a mut SimulationWorld,
        registry: &'a mut BodyRegistry,
        settings: &'a PhysicsSettings,
    ) -> Self {
        Self {
            world,
            registry,
            settings,
        }
    }

    /// Validates `descriptor` and gives `entity` its body.
    pub fn on_entity_created(
        &mut self,
        entity: EntityId,
        renderable: NodeId,
        descriptor: &EntityDescriptor,
    ) -> PhysicsResult<BodyHandle> {
        let spec = BodySpec::from_descriptor(descriptor, self.settings)?;
        self.create_from_spec(entity, renderable, &spec)
    }

    pub fn create_from_spec(
        &mut self,
        entity: EntityId,
        renderable: NodeId,
        spec: &BodySpec,
    ) -> PhysicsResult<BodyHandle> {
        if self.registry.contains(entity) {
            return Err(PhysicsError::DuplicateEntity { entity });
        }
        let handle = spec.build(self.world, self.settings.shapes.convex_radius)?;
        if let Err(e) = self.registry.register(entity, handle, renderable) {
            self.world.destroy_body(handle)?;
            return Err(e);
        }
        debug!("Entity {} bound to body {:?} ({})", entity, handle, renderable);
        Ok(handle)
    }

    /// Unregisters `entity` and destroys its body.
    pub fn on_entity_destroyed(&mut self, entity: EntityId) -> PhysicsResult<NodeId> {
        let record = self.registry.unregister(entity)?;
        self.world.destroy_body(record.body)?;
        debug!("Entity {} released body {:?}", entity, record.body);
        Ok(record.renderable)
    }

    pub fn move_kinematic(
        &mut self,
        entity: EntityId,
        position: (f32, f32, f32),
        rotation: (f32, f32, f32, f32),
    ) -> PhysicsResult<()> {
        let record = self
            .registry
            .get(entity)
            .copied()
            .ok_or(PhysicsError::UnknownEntity { entity })?;
        if !self.world.is_kinematic(record.body) {
            return Err(PhysicsError::NotKinematic { entity });
        }
        let rotation = to_engine_rotation(rotation).ok_or_else(|| PhysicsError::InvalidPose {
            reason: format!("rotation {:?} is not a usable quaternion", rotation),
        })?;
        if !is_finite3(position) {
            return Err(PhysicsError::InvalidPose {
                reason: format!("position {:?} is not finite", position),
            });
        }
        self.world
            .set_kinematic_target(record.body, to_engine_isometry(position, rotation))
    }

    /// Drops every record whose renderable has disappeared from `renderables`.
    pub fn prune_stale<R: RenderableProvider>(&mut self, renderables: &R) -> PhysicsResult<usize> {
        let stale = self
            .registry
            .entities_where(|_, record| !renderables.is_live(record.renderable));
        for entity in &stale {
            warn!("Renderable for entity {} vanished, releasing its body", entity);
            self.on_entity_destroyed(*entity)?;
        }
        Ok(stale.len())
    }

    /// Releases every body. Keeps going past individual failures so nothing
    /// is left behind; returns how many bodies were released.
    pub fn teardown(&mut self) -> usize {
        let mut released = 0;
        for entity in self.registry.entities() {
            match self.on_entity_destroyed(entity) {
                Ok(_) => released += 1,
                Err(e) => warn!("Failed to release entity {}: {}", entity, e),
            }
        }
        info!("Released {} bodies, {} remain in the world", released, self.world.body_count());
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rendering::scene::{Object, SceneGraph};

    fn floor() -> EntityDescriptor {
        EntityDescriptor::new("box", vec![100.0, 1.0, 100.0], "static", (0.0, -1.0, 0.0))
    }

    fn crate_box() -> EntityDescriptor {
        EntityDescriptor::new("box", vec![1.0, 1.0, 1.0], "dynamic", (0.0, 10.0, 0.0))
    }

    #[test]
    fn test_create_then_destroy_leaves_nothing_behind() {
        let settings = PhysicsSettings::default();
        let mut world = SimulationWorld::new(&settings);
        let mut registry = BodyRegistry::new();
        let before = world.body_count();
        let entity = EntityId::new();

        let mut lifecycle = LifecycleCoordinator::new(&mut world, &mut registry, &settings);
        let handle = lifecycle.on_entity_created(entity, NodeId(1), &crate_box()).unwrap();
        assert_eq!(lifecycle.on_entity_destroyed(entity).unwrap(), NodeId(1));

        assert!(!registry.contains(entity));
        assert!(!world.contains(handle));
        assert_eq!(world.body_count(), before);
    }

    #[test]
    fn test_bad_descriptor_creates_nothing() {
        let settings = PhysicsSettings::default();
        let mut world = SimulationWorld::new(&settings);
        let mut registry = BodyRegistry::new();
        let mut descriptor = crate_box();
        descriptor.shape_kind = "capsule".to_string();

        let mut lifecycle = LifecycleCoordinator::new(&mut world, &mut registry, &settings);
        let err = lifecycle.on_entity_created(EntityId::new(), NodeId(1), &descriptor).unwrap_err();

        assert!(err.is_configuration());
        assert_eq!(world.body_count(), 0);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_second_body_for_entity_rejected() {
        let settings = PhysicsSettings::default();
        let mut world = SimulationWorld::new(&settings);
        let mut registry = BodyRegistry::new();
        let entity = EntityId::new();

        let mut lifecycle = LifecycleCoordinator::new(&mut world, &mut registry, &settings);
        lifecycle.on_entity_created(entity, NodeId(1), &crate_box()).unwrap();
        let err = lifecycle.on_entity_created(entity, NodeId(1), &crate_box()).unwrap_err();

        assert_eq!(err, PhysicsError::DuplicateEntity { entity });
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_destroying_unknown_entity_fails() {
        let settings = PhysicsSettings::default();
        let mut world = SimulationWorld::new(&settings);
        let mut registry = BodyRegistry::new();
        let entity = EntityId::new();

        let mut lifecycle = LifecycleCoordinator::new(&mut world, &mut registry, &settings);
        assert_eq!(
            lifecycle.on_entity_destroyed(entity),
            Err(PhysicsError::UnknownEntity { entity })
        );
    }

    #[test]
    fn test_prune_stale_releases_orphans() {
        let settings = PhysicsSettings::default();
        let mut world = SimulationWorld::new(&settings);
        let mut registry = BodyRegistry::new();
        let mut graph = SceneGraph::new();
        let kept_node = graph.add_object(Object::new("box", "floor"));
        let lost_node = graph.add_object(Object::new("box", "crate"));
        let kept = EntityId::new();
        let lost = EntityId::new();

        {
            let mut lifecycle = LifecycleCoordinator::new(&mut world, &mut registry, &settings);
            lifecycle.on_entity_created(kept, kept_node, &floor()).unwrap();
            lifecycle.on_entity_created(lost, lost_node, &crate_box()).unwrap();
        }
        graph.remove_object(lost_node);

        let mut lifecycle = LifecycleCoordinator::new(&mut world, &mut registry, &settings);
        assert_eq!(lifecycle.prune_stale(&graph).unwrap(), 1);
        assert!(registry.contains(kept));
        assert!(!registry.contains(lost));
        assert_eq!(world.body_count(), 1);
    }

    #[test]
    fn test_move_kinematic_only_for_kinematic_bodies() {
        let settings = PhysicsSettings::default();
        let mut world = SimulationWorld::new(&settings);
        let mut registry = BodyRegistry::new();
        let platform = EntityId::new();
        let falling = EntityId::new();
        let mut descriptor = crate_box();
        descriptor.motion_class = "kinematic".to_string();

        let mut lifecycle = LifecycleCoordinator::new(&mut world, &mut registry, &settings);
        lifecycle.on_entity_created(platform, NodeId(1), &descriptor).unwrap();
        lifecycle.on_entity_created(falling, NodeId(2), &crate_box()).unwrap();

        assert!(lifecycle.move_kinematic(platform, (1.0, 2.0, 0.0), (0.0, 0.0, 0.0, 1.0)).is_ok());
        assert_eq!(
            lifecycle.move_kinematic(falling, (1.0, 2.0, 0.0), (0.0, 0.0, 0.0, 1.0)),
            Err(PhysicsError::NotKinematic { entity: falling })
        );
    }

    #[test]
    fn test_teardown_releases_everything() {
        let settings = PhysicsSettings::default();
        let mut world = SimulationWorld::new(&settings);
        let mut registry = BodyRegistry::new();

        let mut lifecycle = LifecycleCoordinator::new(&mut world, &mut registry, &settings);
        lifecycle.on_entity_created(EntityId::new(), NodeId(1), &floor()).unwrap();
        lifecycle.on_entity_created(EntityId::new(), NodeId(2), &crate_box()).unwrap();
        assert_eq!(lifecycle.teardown(), 2);

        assert!(registry.is_empty());
        assert_eq!(world.body_count(), 0);
    }
}
