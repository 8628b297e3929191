//! Per-frame orchestration
//!
//! [`PhysicsScene`] is the frame-driving context. It exclusively owns the
//! scene graph, the body registry and the world stepper. Every frame runs the
//! same phases in order: queued lifecycle requests, stale-renderable pruning,
//! simulation, transform sync.

use crossbeam_channel::Receiver;
use tracing::{debug, info, warn};

use crate::config::PhysicsSettings;
use crate::rendering::scene::{Object, SceneGraph};
use super::bodies::BodySpec;
use super::events::{EntityDescriptor, EntityId, SceneHandle, SceneRequest};
use super::lifecycle::LifecycleCoordinator;
use super::registry::BodyRegistry;
use super::simulation::{BodyTransform, SimulationWorld};
use super::stepper::{FrameStep, WorldStepper};
use super::PhysicsResult;

pub struct PhysicsScene {
    settings: PhysicsSettings,
    stepper: WorldStepper,
    registry: BodyRegistry,
    graph: SceneGraph,
    handle: SceneHandle,
    requests: Receiver<SceneRequest>,
}

impl PhysicsScene {
    /// Loads the simulation world and returns a scene ready to tick.
    pub async fn load(settings: PhysicsSettings) -> PhysicsResult<Self> {
        let mut stepper = WorldStepper::new(settings.clone());
        stepper.initialize().await?;
        Ok(Self::from_stepper(settings, stepper))
    }

    /// Scene over an already built world, for synchronous callers.
    pub fn with_world(settings: PhysicsSettings, world: SimulationWorld) -> Self {
        let stepper = WorldStepper::with_world(settings.clone(), world);
        Self::from_stepper(settings, stepper)
    }

    fn from_stepper(settings: PhysicsSettings, stepper: WorldStepper) -> Self {
        let (handle, requests) = SceneHandle::channel();
        Self {
            settings,
            stepper,
            registry: BodyRegistry::new(),
            graph: SceneGraph::new(),
            handle,
            requests,
        }
    }

    /// Sender for code that cannot touch the scene directly.
    pub fn handle(&self) -> SceneHandle {
        self.handle.clone()
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Direct scene graph access. Removing an object here without
    /// [`PhysicsScene::despawn`] leaves a dangling record that the next frame
    /// prunes.
    pub fn graph_mut(&mut self) -> &mut SceneGraph {
        &mut self.graph
    }

    pub fn registry(&self) -> &BodyRegistry {
        &self.registry
    }

    pub fn world(&self) -> PhysicsResult<&SimulationWorld> {
        self.stepper.world()
    }

    pub fn stepper(&self) -> &WorldStepper {
        &self.stepper
    }

    pub fn body_count(&self) -> usize {
        self.stepper.world().map_or(0, |world| world.body_count())
    }

    /// Simulated transform of `entity`'s body.
    pub fn body_transform(&self, entity: EntityId) -> Option<BodyTransform> {
        let record = self.registry.get(entity)?;
        self.stepper.world().ok()?.body_transform(record.body)
    }

    pub fn object(&self, entity: EntityId) -> Option<&Object> {
        let record = self.registry.get(entity)?;
        self.graph.get(record.renderable)
    }

    /// Adds `object` to the scene with a body described by `descriptor`.
    ///
    /// The descriptor is validated before anything is created; on failure the
    /// scene, registry and world are left as they were.
    pub fn spawn(&mut self, object: Object, descriptor: &EntityDescriptor) -> PhysicsResult<EntityId> {
        let entity = EntityId::new();
        self.spawn_as(entity, object, descriptor)?;
        Ok(entity)
    }

    fn spawn_as(&mut self, entity: EntityId, object: Object, descriptor: &EntityDescriptor) -> PhysicsResult<()> {
        let spec = BodySpec::from_descriptor(descriptor, &self.settings)?;
        let world = self.stepper.world_mut()?;
        let node = self.graph.add_object(object);
        let mut lifecycle = LifecycleCoordinator::new(world, &mut self.registry, &self.settings);
        if let Err(e) = lifecycle.create_from_spec(entity, node, &spec) {
            self.graph.remove_object(node);
            return Err(e);
        }
        debug!("Spawned entity {} as {}", entity, node);
        Ok(())
    }

    /// Removes `entity`'s body, then its renderable. Returns `None` when the
    /// renderable was already gone from the scene graph.
    pub fn despawn(&mut self, entity: EntityId) -> PhysicsResult<Option<Object>> {
        let world = self.stepper.world_mut()?;
        let node = LifecycleCoordinator::new(world, &mut self.registry, &self.settings)
            .on_entity_destroyed(entity)?;
        let object = self.graph.remove_object(node);
        if object.is_none() {
            debug!("Renderable {} of entity {} was already removed", node, entity);
        }
        debug!("Despawned entity {}", entity);
        Ok(object)
    }

    pub fn move_kinematic(
        &mut self,
        entity: EntityId,
        position: (f32, f32, f32),
        rotation: (f32, f32, f32, f32),
    ) -> PhysicsResult<()> {
        let world = self.stepper.world_mut()?;
        LifecycleCoordinator::new(world, &mut self.registry, &self.settings)
            .move_kinematic(entity, position, rotation)
    }

    /// Applies queued requests in arrival order. Stops at the first failure;
    /// requests behind it stay queued.
    pub fn apply_pending(&mut self) -> PhysicsResult<usize> {
        let mut applied = 0;
        while let Ok(request) = self.requests.try_recv() {
            match request {
                SceneRequest::Spawn { entity, object, descriptor, .. } => {
                    self.spawn_as(entity, object, &descriptor)?
                }
                SceneRequest::Despawn { entity, .. } => {
                    self.despawn(entity)?;
                }
                SceneRequest::MoveKinematic { entity, position, rotation, .. } => {
                    self.move_kinematic(entity, position, rotation)?
                }
            }
            applied += 1;
        }
        Ok(applied)
    }

    /// Runs one frame.
    pub fn frame(&mut self, raw_delta: f32) -> PhysicsResult<FrameStep> {
        let applied = self.apply_pending()?;
        if applied > 0 {
            debug!("Applied {} scene requests", applied);
        }

        let world = self.stepper.world_mut()?;
        let pruned = LifecycleCoordinator::new(world, &mut self.registry, &self.settings)
            .prune_stale(&self.graph)?;
        if pruned > 0 {
            warn!("Pruned {} bodies whose renderables were removed", pruned);
        }

        self.stepper.tick(raw_delta, &self.registry, &mut self.graph)
    }

    /// Releases every body and renderable owned through the registry.
    pub fn teardown(&mut self) -> usize {
        let Ok(world) = self.stepper.world_mut() else {
            return 0;
        };
        let mut nodes = Vec::with_capacity(self.registry.len());
        self.registry.for_each(|_, record| nodes.push(record.renderable));
        let released = LifecycleCoordinator::new(world, &mut self.registry, &self.settings).teardown();
        for node in nodes {
            self.graph.remove_object(node);
        }
        released
    }
}

impl Drop for PhysicsScene {
    fn drop(&mut self) {
        if !self.registry.is_empty() {
            let released = self.teardown();
            info!("Scene dropped, released {} bodies", released);
        }
    }
}
