use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use slv_physics::config::PhysicsSettings;
use slv_physics::world::{
    EntityDescriptor, ErrorCategory, PhysicsError, PhysicsScene, SimulationWorld, StepTiming,
    StepperState, WorldStepper,
};

const FRAME: f32 = 1.0 / 60.0;

fn floor() -> EntityDescriptor {
    EntityDescriptor::new("box", vec![100.0, 1.0, 100.0], "static", (0.0, -1.0, 0.0))
}

fn falling_box() -> EntityDescriptor {
    EntityDescriptor::new("box", vec![1.0, 1.0, 1.0], "dynamic", (0.0, 10.0, 0.0)).with_restitution(0.0)
}

async fn loaded_scene() -> PhysicsScene {
    PhysicsScene::load(PhysicsSettings::default()).await.unwrap()
}

#[tokio::test]
async fn test_box_comes_to_rest_on_floor() {
    let mut scene = loaded_scene().await;
    let ground = floor();
    scene.spawn(ground.to_object("grass"), &ground).unwrap();
    let descriptor = falling_box();
    let entity = scene.spawn(descriptor.to_object("wood"), &descriptor).unwrap();

    for _ in 0..600 {
        scene.frame(FRAME).unwrap();
    }

    let y = scene.object(entity).unwrap().position.y;
    assert!((y - 0.0).abs() < 0.05, "box settled at y = {}", y);

    for _ in 0..120 {
        scene.frame(FRAME).unwrap();
        let y = scene.object(entity).unwrap().position.y;
        assert!(y > -0.05 && y < 0.05, "box drifted to y = {}", y);
    }

    // the renderable mirrors the simulated body exactly after each frame
    let transform = scene.body_transform(entity).unwrap();
    let object = scene.object(entity).unwrap();
    assert_eq!(transform.position, [object.position.x, object.position.y, object.position.z]);
}

#[tokio::test]
async fn test_static_floor_never_moves() {
    let mut scene = loaded_scene().await;
    let ground = floor();
    let entity = scene.spawn(ground.to_object("grass"), &ground).unwrap();

    for _ in 0..60 {
        scene.frame(FRAME).unwrap();
    }
    assert_eq!(scene.body_transform(entity).unwrap().position, [0.0, -1.0, 0.0]);
}

#[tokio::test]
async fn test_random_frame_times_follow_timestep_policy() {
    let timing = StepTiming::default();
    let mut rng = StdRng::seed_from_u64(0x5eed);

    for _ in 0..10_000 {
        let raw_delta: f32 = rng.random_range(-0.1..0.5);
        let step = timing.frame_step(raw_delta);

        assert!(step.delta <= 1.0 / 30.0);
        assert!(step.delta >= 0.0);
        if raw_delta > 0.0 {
            assert_eq!(step.delta, raw_delta.min(1.0 / 30.0));
        }
        let expected = if step.delta > 1.0 / 55.0 { 2 } else { 1 };
        assert_eq!(step.sub_steps, expected, "raw delta {}", raw_delta);
    }

    assert_eq!(timing.frame_step(f32::NAN).delta, 0.0);
}

#[tokio::test]
async fn test_random_frames_keep_bodies_finite() {
    let mut scene = loaded_scene().await;
    let ground = floor();
    scene.spawn(ground.to_object("grass"), &ground).unwrap();
    let mut rng = StdRng::seed_from_u64(11);
    let mut entities = Vec::new();
    for _ in 0..8 {
        let position = (rng.random_range(-2.0..2.0), rng.random_range(1.0..8.0), rng.random_range(-2.0..2.0));
        let descriptor = EntityDescriptor::new("sphere", vec![0.4], "dynamic", position);
        entities.push(scene.spawn(descriptor.to_object("rubber"), &descriptor).unwrap());
    }

    for _ in 0..240 {
        let step = scene.frame(rng.random_range(0.0..0.2)).unwrap();
        assert!(step.delta <= 1.0 / 30.0);
    }

    for entity in entities {
        let transform = scene.body_transform(entity).unwrap();
        assert!(transform.is_finite());
        assert!(transform.position[1] > -1.0);
    }
}

#[tokio::test]
async fn test_create_destroy_without_tick() {
    let mut scene = loaded_scene().await;
    let before = scene.body_count();

    let descriptor = falling_box();
    let entity = scene.spawn(descriptor.to_object("wood"), &descriptor).unwrap();
    assert_eq!(scene.body_count(), before + 1);
    scene.despawn(entity).unwrap();

    assert_eq!(scene.body_count(), before);
    assert!(scene.registry().is_empty());
    assert_eq!(scene.stepper().frames(), 0);
}

#[tokio::test]
async fn test_unknown_shape_kind_is_configuration_error() {
    let mut scene = loaded_scene().await;
    let descriptor = EntityDescriptor::new("torus", vec![1.0, 0.25], "dynamic", (0.0, 1.0, 0.0));

    let err = scene.spawn(descriptor.to_object("default"), &descriptor).unwrap_err();
    assert_eq!(err, PhysicsError::UnsupportedShapeKind { kind: "torus".to_string() });
    assert_eq!(err.category(), ErrorCategory::Configuration);
    assert_eq!(scene.body_count(), 0);
    assert!(scene.graph().is_empty());
}

#[tokio::test]
async fn test_bad_dimensions_are_configuration_errors() {
    let mut scene = loaded_scene().await;
    let cases = [
        EntityDescriptor::new("box", vec![1.0, -1.0, 1.0], "dynamic", (0.0, 1.0, 0.0)),
        EntityDescriptor::new("box", vec![1.0, 1.0], "dynamic", (0.0, 1.0, 0.0)),
        EntityDescriptor::new("sphere", vec![0.0], "dynamic", (0.0, 1.0, 0.0)),
        EntityDescriptor::new("sphere", vec![f32::NAN], "static", (0.0, 1.0, 0.0)),
    ];

    for descriptor in cases {
        let err = scene.spawn(descriptor.to_object("default"), &descriptor).unwrap_err();
        assert!(err.is_configuration(), "{:?} gave {}", descriptor, err);
    }
    assert_eq!(scene.body_count(), 0);
}

#[tokio::test]
async fn test_drop_releases_bodies() {
    let mut scene = loaded_scene().await;
    for i in 0..5 {
        let descriptor = EntityDescriptor::new("sphere", vec![0.5], "dynamic", (0.0, 2.0 + i as f32, 0.0));
        scene.spawn(descriptor.to_object("default"), &descriptor).unwrap();
    }
    scene.frame(FRAME).unwrap();

    let handle = scene.handle();
    assert_eq!(scene.teardown(), 5);
    assert_eq!(scene.body_count(), 0);
    assert!(scene.graph().is_empty());

    drop(scene);
    let descriptor = falling_box();
    assert!(handle.spawn(descriptor.to_object("wood"), descriptor).is_none());
}

#[tokio::test]
async fn test_stepper_lifecycle() {
    let mut stepper = WorldStepper::new(PhysicsSettings::default());
    assert_eq!(stepper.state(), StepperState::Uninitialized);
    assert!(matches!(stepper.world(), Err(PhysicsError::WorldNotReady)));

    stepper.initialize().await.unwrap();
    assert_eq!(stepper.state(), StepperState::Running);
    assert_eq!(stepper.initialize().await, Err(PhysicsError::AlreadyInitialized));
}

#[tokio::test]
async fn test_kinematic_body_follows_target() {
    let settings = PhysicsSettings::default();
    let mut scene = PhysicsScene::with_world(settings.clone(), SimulationWorld::new(&settings));
    let platform = EntityDescriptor::new("box", vec![3.0, 0.25, 3.0], "kinematic", (0.0, 1.0, 0.0));
    let entity = scene.spawn(platform.to_object("metal"), &platform).unwrap();

    scene.move_kinematic(entity, (0.0, 1.0, 0.5), (0.0, 0.0, 0.0, 1.0)).unwrap();
    scene.frame(FRAME).unwrap();

    let z = scene.object(entity).unwrap().position.z;
    assert!((z - 0.5).abs() < 1e-4, "platform at z = {}", z);

    let ball = EntityDescriptor::new("sphere", vec![0.5], "dynamic", (0.0, 4.0, 0.0));
    let ball = scene.spawn(ball.to_object("rubber"), &ball).unwrap();
    let err = scene.move_kinematic(ball, (0.0, 0.0, 0.0), (0.0, 0.0, 0.0, 1.0)).unwrap_err();
    assert_eq!(err, PhysicsError::NotKinematic { entity: ball });
}
