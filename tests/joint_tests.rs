use glam::{Quat, Vec3};
use tremor::*;

const DT: f32 = 1.0 / 60.0;

fn world_with_gravity() -> World {
    World::new(Vec3::new(0.0, -10.0, 0.0))
}

fn anchor_body(world: &mut World, position: Vec3) -> BodyId {
    world.create_body(&BodyDef::static_at(position))
}

fn box_body(world: &mut World, position: Vec3, half: Vec3) -> BodyId {
    let mut def = BodyDef::dynamic_at(position);
    def.linear_damping = Vec3::splat(0.2);
    def.angular_damping = Vec3::splat(0.2);
    let body = world.create_body(&def);
    world.create_fixture(
        body,
        &FixtureDef::new(Shape::cuboid(half)).with_density(1.0),
    );
    body
}

#[test]
fn weld_holds_two_boxes_rigid() {
    let mut world = world_with_gravity();
    let base = anchor_body(&mut world, Vec3::new(0.0, 5.0, 0.0));
    let arm = box_body(&mut world, Vec3::new(1.0, 5.0, 0.0), Vec3::new(0.5, 0.2, 0.2));
    world.create_joint(&JointDef::Weld(WeldJointDef::new(
        base,
        arm,
        Vec3::new(0.5, 5.0, 0.0),
    )));

    for _ in 0..300 {
        world.step(DT, 8, 3);
    }

    let body = world.body(arm).unwrap();
    // The weld keeps the cantilever horizontal against gravity.
    let offset = body.transform.position - Vec3::new(1.0, 5.0, 0.0);
    assert!(offset.length() < 0.05, "arm sagged by {offset:?}");
    let angle = body.transform.rotation.angle_between(Quat::IDENTITY);
    assert!(angle < 0.05, "arm rotated by {angle}");
}

#[test]
fn revolute_motor_spins_the_wheel() {
    let mut world = world_with_gravity();
    let base = anchor_body(&mut world, Vec3::ZERO);
    let wheel = box_body(&mut world, Vec3::ZERO, Vec3::splat(0.5));

    let mut def = RevoluteJointDef::new(base, wheel, Vec3::ZERO, Vec3::Y);
    def.enable_motor = true;
    def.motor_speed = 5.0;
    def.max_motor_torque = 100.0;
    world.create_joint(&JointDef::Revolute(def));

    // Motors fight the sleep threshold; keep the wheel awake.
    world.body_mut(wheel).unwrap().allow_sleep = false;

    for _ in 0..120 {
        world.step(DT, 8, 2);
    }

    let body = world.body(wheel).unwrap();
    assert!(
        (body.angular_velocity.y - 5.0).abs() < 0.2,
        "motor speed {}",
        body.angular_velocity.y
    );
    // The hinge holds the wheel in place while it spins.
    assert!(body.transform.position.length() < 0.02);
}

#[test]
fn revolute_limit_stops_the_swing() {
    let mut world = world_with_gravity();
    let base = anchor_body(&mut world, Vec3::new(0.0, 5.0, 0.0));
    let pendulum = box_body(&mut world, Vec3::new(1.0, 5.0, 0.0), Vec3::new(0.5, 0.1, 0.1));

    let mut def = RevoluteJointDef::new(base, pendulum, Vec3::new(0.0, 5.0, 0.0), Vec3::Z);
    def.enable_limit = true;
    def.lower_angle = -0.5;
    def.upper_angle = 0.5;
    world.create_joint(&JointDef::Revolute(def));

    for _ in 0..600 {
        world.step(DT, 8, 3);
    }

    // Gravity pulls the arm down; the limit must stop it near 0.5 rad.
    let body = world.body(pendulum).unwrap();
    let angle = body.transform.rotation.angle_between(Quat::IDENTITY);
    assert!(angle < 0.6, "limit exceeded: {angle} rad");
    assert!(angle > 0.3, "arm never swung: {angle} rad");
}

#[test]
fn prismatic_slides_only_along_its_axis() {
    let mut world = world_with_gravity();
    let base = anchor_body(&mut world, Vec3::new(0.0, 5.0, 0.0));
    let slider = box_body(&mut world, Vec3::new(0.0, 4.0, 0.0), Vec3::splat(0.25));

    let mut def = PrismaticJointDef::new(base, slider, Vec3::new(0.0, 4.0, 0.0), Vec3::Y);
    def.enable_limit = true;
    def.lower_translation = -2.0;
    def.upper_translation = 0.5;
    world.create_joint(&JointDef::Prismatic(def));

    for _ in 0..600 {
        world.step(DT, 8, 3);
    }

    let body = world.body(slider).unwrap();
    // Lateral drift locked, vertical fall stopped by the lower limit.
    assert!(body.transform.position.x.abs() < 0.01);
    assert!(body.transform.position.z.abs() < 0.01);
    assert!(
        body.transform.position.y > 4.0 - 2.0 - 1.1,
        "slider fell past the limit: {}",
        body.transform.position.y
    );
    let angle = body.transform.rotation.angle_between(Quat::IDENTITY);
    assert!(angle < 0.05, "slider rotated by {angle}");
}

#[test]
fn spring_joint_oscillates_and_relaxes_to_rest_length() {
    let mut world = world_with_gravity();
    let base = anchor_body(&mut world, Vec3::new(0.0, 8.0, 0.0));
    let bob = world.create_body(&BodyDef::dynamic_at(Vec3::new(0.0, 6.0, 0.0)));
    world.create_fixture(bob, &FixtureDef::new(Shape::sphere(0.25)).with_density(1.0));

    let mut def = SpringJointDef::new(base, bob, Vec3::new(0.0, 8.0, 0.0), Vec3::new(0.0, 6.0, 0.0));
    def.frequency = 2.0;
    def.damping_ratio = 0.7;
    world.create_joint(&JointDef::Spring(def));

    for _ in 0..900 {
        world.step(DT, 8, 2);
    }

    // The damped spring settles with a static sag of g / ω².
    let sag = 10.0 / (std::f32::consts::TAU * 2.0_f32).powi(2);
    let y = world.body(bob).unwrap().transform.position.y;
    assert!(
        (y - (6.0 - sag)).abs() < 0.1,
        "spring rest position {y}, expected {}",
        6.0 - sag
    );
}

#[test]
fn rigid_spring_acts_as_a_rod() {
    let mut world = world_with_gravity();
    let base = anchor_body(&mut world, Vec3::new(0.0, 8.0, 0.0));
    let bob = world.create_body(&BodyDef::dynamic_at(Vec3::new(2.0, 8.0, 0.0)));
    world.create_fixture(bob, &FixtureDef::new(Shape::sphere(0.25)).with_density(1.0));

    // Zero frequency: a pendulum rod of fixed length.
    world.create_joint(&JointDef::Spring(SpringJointDef::new(
        base,
        bob,
        Vec3::new(0.0, 8.0, 0.0),
        Vec3::new(2.0, 8.0, 0.0),
    )));

    for _ in 0..600 {
        world.step(DT, 8, 3);
    }

    let position = world.body(bob).unwrap().transform.position;
    let length = (position - Vec3::new(0.0, 8.0, 0.0)).length();
    assert!((length - 2.0).abs() < 0.05, "rod length {length}");
}

#[test]
fn cone_joint_caps_the_swing_angle() {
    let mut world = world_with_gravity();
    let base = anchor_body(&mut world, Vec3::new(0.0, 6.0, 0.0));

    let mut def = BodyDef::dynamic_at(Vec3::new(1.0, 6.0, 0.0));
    def.angular_damping = Vec3::splat(0.5);
    def.linear_damping = Vec3::splat(0.5);
    let arm = world.create_body(&def);
    world.create_fixture(
        arm,
        &FixtureDef::new(Shape::capsule(
            Vec3::new(-0.5, 0.0, 0.0),
            Vec3::new(0.5, 0.0, 0.0),
            0.1,
        ))
        .with_density(1.0),
    );

    // Cone axis along +x with a 60 degree opening.
    world.create_joint(&JointDef::Cone(ConeJointDef::new(
        base,
        arm,
        Vec3::new(0.5, 6.0, 0.0),
        Vec3::X,
        std::f32::consts::FRAC_PI_3,
    )));

    for _ in 0..600 {
        world.step(DT, 8, 3);
    }

    // The arm hangs as low as the cone allows: its x axis within ~30° of
    // the cone axis (plus solver tolerance).
    let q = world.body(arm).unwrap().transform.rotation;
    let axis = q * Vec3::X;
    let angle = axis.dot(Vec3::X).clamp(-1.0, 1.0).acos();
    assert!(
        angle < std::f32::consts::FRAC_PI_6 + 0.1,
        "swing angle {angle} exceeds the cone"
    );
}

#[test]
fn motor_joint_drives_relative_velocity() {
    let mut world = World::new(Vec3::ZERO);
    let base = anchor_body(&mut world, Vec3::ZERO);
    let mut def = BodyDef::dynamic_at(Vec3::new(0.0, 2.0, 0.0));
    def.allow_sleep = false;
    let rider = world.create_body(&def);
    world.create_fixture(rider, &FixtureDef::new(Shape::sphere(0.25)).with_density(1.0));

    let mut motor = MotorJointDef::new(base, rider);
    motor.linear_velocity = Vec3::new(1.5, 0.0, 0.0);
    motor.max_force = 50.0;
    motor.max_torque = 50.0;
    world.create_joint(&JointDef::Motor(motor));

    for _ in 0..120 {
        world.step(DT, 8, 2);
    }

    let v = world.body(rider).unwrap().linear_velocity;
    assert!((v.x - 1.5).abs() < 0.1, "motor velocity {v:?}");
}

#[test]
fn wheel_joint_suspension_carries_the_chassis() {
    let mut world = world_with_gravity();

    // Ground for the wheel to rest on.
    let ground = world.create_body(&BodyDef::static_at(Vec3::new(0.0, -1.0, 0.0)));
    world.create_fixture(
        ground,
        &FixtureDef::new(Shape::cuboid(Vec3::new(20.0, 1.0, 20.0))).with_friction(0.8),
    );

    let chassis = box_body(&mut world, Vec3::new(0.0, 1.5, 0.0), Vec3::new(0.8, 0.2, 0.4));
    let wheel = world.create_body(&BodyDef::dynamic_at(Vec3::new(0.0, 0.5, 0.0)));
    world.create_fixture(
        wheel,
        &FixtureDef::new(Shape::sphere(0.5))
            .with_density(2.0)
            .with_friction(0.9),
    );

    let def = WheelJointDef::new(chassis, wheel, Vec3::new(0.0, 0.5, 0.0), Vec3::Y, Vec3::Z);
    world.create_joint(&JointDef::Wheel(def));

    for _ in 0..600 {
        world.step(DT, 8, 3);
    }

    // The suspension holds the chassis above the wheel.
    let chassis_y = world.body(chassis).unwrap().transform.position.y;
    let wheel_y = world.body(wheel).unwrap().transform.position.y;
    assert!((wheel_y - 0.5).abs() < 0.1, "wheel sits at {wheel_y}");
    assert!(chassis_y > wheel_y + 0.4, "chassis collapsed to {chassis_y}");
}

#[test]
fn mouse_joint_drags_a_body_to_the_target() {
    let mut world = World::new(Vec3::ZERO);
    let base = anchor_body(&mut world, Vec3::ZERO);
    let mut def = BodyDef::dynamic_at(Vec3::ZERO);
    def.allow_sleep = false;
    let grabbed = world.create_body(&def);
    world.create_fixture(
        grabbed,
        &FixtureDef::new(Shape::cuboid(Vec3::splat(0.25))).with_density(1.0),
    );

    let mut def = MouseJointDef::new(base, grabbed, Vec3::ZERO, 200.0);
    def.target = Vec3::new(3.0, 1.0, 0.0);
    world.create_joint(&JointDef::Mouse(def));

    for _ in 0..300 {
        world.step(DT, 8, 2);
    }

    let position = world.body(grabbed).unwrap().transform.position;
    let error = (position - Vec3::new(3.0, 1.0, 0.0)).length();
    assert!(error < 0.1, "drag missed the target by {error}");
}
