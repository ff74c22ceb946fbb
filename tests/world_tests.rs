use glam::{Quat, Vec3};
use tremor::*;

const DT: f32 = 1.0 / 60.0;

fn ground(world: &mut World) -> BodyId {
    let body = world.create_body(&BodyDef::static_at(Vec3::new(0.0, -1.0, 0.0)));
    world.create_fixture(
        body,
        &FixtureDef::new(Shape::cuboid(Vec3::new(50.0, 1.0, 50.0))).with_friction(0.5),
    );
    body
}

fn dynamic_sphere(world: &mut World, position: Vec3, radius: f32, restitution: f32) -> BodyId {
    let body = world.create_body(&BodyDef::dynamic_at(position));
    world.create_fixture(
        body,
        &FixtureDef::new(Shape::sphere(radius))
            .with_density(1.0)
            .with_friction(0.3)
            .with_restitution(restitution),
    );
    body
}

fn dynamic_box(world: &mut World, position: Vec3, half: Vec3) -> BodyId {
    let body = world.create_body(&BodyDef::dynamic_at(position));
    world.create_fixture(
        body,
        &FixtureDef::new(Shape::cuboid(half))
            .with_density(1.0)
            .with_friction(0.5),
    );
    body
}

#[test]
fn falling_sphere_settles_on_ground_and_sleeps() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    ground(&mut world);
    let sphere = dynamic_sphere(&mut world, Vec3::new(0.0, 10.0, 0.0), 0.5, 0.0);

    for _ in 0..150 {
        world.step(DT, 8, 2);
    }

    let body = world.body(sphere).unwrap();
    let y = body.transform.position.y;
    assert!((y - 0.5).abs() < 0.02, "resting height off: y={y}");
    assert!(body.linear_velocity.length() < 0.05);
    assert!(!body.is_awake(), "settled sphere should be asleep");
}

#[test]
fn box_stack_stays_put() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    ground(&mut world);

    let mut boxes = Vec::new();
    for i in 0..5 {
        boxes.push(dynamic_box(
            &mut world,
            Vec3::new(0.0, 0.5 + i as f32, 0.0),
            Vec3::splat(0.5),
        ));
    }
    let initial: Vec<f32> = boxes
        .iter()
        .map(|id| world.body(*id).unwrap().transform.position.y)
        .collect();

    for _ in 0..300 {
        world.step(DT, 8, 3);
    }

    for (id, y0) in boxes.iter().zip(initial.iter()) {
        let body = world.body(*id).unwrap();
        let y = body.transform.position.y;
        assert!(
            (y - y0).abs() < 0.04,
            "box drifted: start {y0}, end {y}"
        );
        // Orientation within 5 degrees of identity.
        let angle = body.transform.rotation.angle_between(Quat::IDENTITY);
        assert!(angle < 5.0_f32.to_radians(), "box tipped by {angle} rad");
    }
}

#[test]
fn restitution_decays_until_the_ball_rests() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    ground(&mut world);
    let ball = dynamic_sphere(&mut world, Vec3::new(0.0, 5.0, 0.0), 0.5, 0.8);

    let mut prev_vy = 0.0_f32;
    let mut impact_speed = 0.0_f32;
    let mut bounce_speed = 0.0_f32;

    for _ in 0..240 {
        world.step(DT, 8, 2);
        let vy = world.body(ball).unwrap().linear_velocity.y;
        if bounce_speed == 0.0 && prev_vy < -1.0 && vy > 0.0 {
            impact_speed = -prev_vy;
            bounce_speed = vy;
        }
        prev_vy = vy;
    }

    assert!(impact_speed > 8.0, "ball never hit: {impact_speed}");
    let ratio = bounce_speed / impact_speed;
    assert!(
        (0.6..=0.95).contains(&ratio),
        "bounce ratio {ratio} out of range"
    );

    // Long after the bounces die out the ball must sleep on the ground.
    for _ in 0..1800 {
        world.step(DT, 8, 2);
    }
    let body = world.body(ball).unwrap();
    assert!(!body.is_awake(), "ball still awake after decay");
    assert!((body.transform.position.y - 0.5).abs() < 0.02);
}

#[test]
fn hinge_chain_keeps_anchors_tight() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));

    let anchor_body = world.create_body(&BodyDef::static_at(Vec3::new(0.0, 10.0, 0.0)));

    let mut prev = anchor_body;
    let mut links = Vec::new();
    for i in 0..10 {
        let mut def = BodyDef::dynamic_at(Vec3::new(1.0 + i as f32, 10.0, 0.0));
        def.linear_damping = Vec3::splat(0.5);
        def.angular_damping = Vec3::splat(0.5);
        let link = world.create_body(&def);
        world.create_fixture(
            link,
            &FixtureDef::new(Shape::cuboid(Vec3::new(0.5, 0.1, 0.1))).with_density(1.0),
        );
        links.push(link);

        let hinge = RevoluteJointDef::new(
            prev,
            link,
            Vec3::new(0.5 + i as f32, 10.0, 0.0),
            Vec3::Z,
        );
        world.create_joint(&JointDef::Revolute(hinge));
        prev = link;
    }

    for _ in 0..500 {
        world.step(DT, 8, 3);
    }

    // Each consecutive pair must still meet at the hinge anchor.
    let mut prev = anchor_body;
    for (i, link) in links.iter().enumerate() {
        let xf_a = world.body(prev).unwrap().transform;
        let xf_b = world.body(*link).unwrap().transform;
        // The anchor sat at +0.5 along x from each link center at rest.
        let anchor_from_a = xf_a.transform_point(Vec3::new(0.5, 0.0, 0.0));
        let anchor_from_b = xf_b.transform_point(Vec3::new(-0.5, 0.0, 0.0));
        let error = (anchor_from_a - anchor_from_b).length();
        assert!(error < 0.02, "joint {i} anchor error {error}");
        prev = *link;
    }
}

#[test]
fn upright_cylinder_settles_on_its_cap() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    ground(&mut world);

    let drum = world.create_body(&BodyDef::dynamic_at(Vec3::new(0.0, 2.0, 0.0)));
    world.create_fixture(
        drum,
        &FixtureDef::new(Shape::cylinder(0.5, 0.4))
            .with_density(1.0)
            .with_friction(0.5),
    );

    for _ in 0..240 {
        world.step(DT, 8, 2);
    }

    let body = world.body(drum).unwrap();
    assert!(
        (body.transform.position.y - 0.5).abs() < 0.03,
        "rest height {}",
        body.transform.position.y
    );
    let angle = body.transform.rotation.angle_between(Quat::IDENTITY);
    assert!(angle < 5.0_f32.to_radians(), "drum tipped by {angle} rad");
    assert!(!body.is_awake());
}

#[test]
fn sleeping_island_wakes_on_impact() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    ground(&mut world);
    let resting = dynamic_box(&mut world, Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5));

    for _ in 0..240 {
        world.step(DT, 8, 2);
    }
    assert!(!world.body(resting).unwrap().is_awake());

    // Drop a sphere onto the sleeping box.
    let sphere = dynamic_sphere(&mut world, Vec3::new(0.0, 4.0, 0.0), 0.5, 0.0);
    let mut woke = false;
    for _ in 0..120 {
        world.step(DT, 8, 2);
        if world.body(resting).unwrap().is_awake() {
            woke = true;
            break;
        }
    }
    assert!(woke, "impact must wake the sleeping box");
    let _ = sphere;
}

#[test]
fn kinematic_bodies_move_without_forces() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    let mut def = BodyDef::kinematic_at(Vec3::ZERO);
    def.linear_velocity = Vec3::new(1.0, 0.0, 0.0);
    def.allow_sleep = false;
    let mover = world.create_body(&def);
    world.create_fixture(mover, &FixtureDef::new(Shape::cuboid(Vec3::splat(0.5))));

    for _ in 0..60 {
        world.step(DT, 4, 2);
    }
    let body = world.body(mover).unwrap();
    // One second at 1 m/s, gravity ignored.
    assert!((body.transform.position.x - 1.0).abs() < 1e-3);
    assert!(body.transform.position.y.abs() < 1e-4);
}

#[test]
fn fixed_rotation_axes_ignore_torques() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    ground(&mut world);

    let mut def = BodyDef::dynamic_at(Vec3::new(0.0, 2.0, 0.0));
    def.fixed_rotation_x = true;
    def.fixed_rotation_z = true;
    let body_id = world.create_body(&def);
    world.create_fixture(
        body_id,
        &FixtureDef::new(Shape::cuboid(Vec3::new(0.2, 0.8, 0.2))).with_density(1.0),
    );

    // A diagonal kick only spins the free axis.
    world
        .body_mut(body_id)
        .unwrap()
        .apply_angular_impulse(Vec3::new(5.0, 5.0, 5.0));
    world.step(DT, 8, 2);

    let body = world.body(body_id).unwrap();
    assert!(body.angular_velocity.x.abs() < 1e-4);
    assert!(body.angular_velocity.z.abs() < 1e-4);
    assert!(body.angular_velocity.y > 1.0);
}

#[test]
fn destroying_a_body_removes_its_contacts_and_joints() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    ground(&mut world);
    let a = dynamic_box(&mut world, Vec3::new(0.0, 0.5, 0.0), Vec3::splat(0.5));
    let b = dynamic_box(&mut world, Vec3::new(0.0, 1.5, 0.0), Vec3::splat(0.5));
    let joint = world.create_joint(&JointDef::Weld(WeldJointDef::new(
        a,
        b,
        Vec3::new(0.0, 1.0, 0.0),
    )));

    for _ in 0..30 {
        world.step(DT, 8, 2);
    }
    assert!(world.contact_count() > 0);

    world.destroy_body(b);
    assert!(world.joint(joint).is_none(), "joint must die with its body");

    for _ in 0..30 {
        world.step(DT, 8, 2);
    }
    // Only ground↔a contact remains.
    for id in world.contact_ids() {
        let contact = world.contact(id).unwrap();
        let fa = world.fixture(contact.fixture_a).unwrap();
        let fb = world.fixture(contact.fixture_b).unwrap();
        assert!(world.body(fa.body).is_some());
        assert!(world.body(fb.body).is_some());
    }
}

#[test]
fn gravity_scale_and_damping_shape_motion() {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));

    let mut floaty = BodyDef::dynamic_at(Vec3::ZERO);
    floaty.gravity_scale = Vec3::ZERO;
    floaty.linear_velocity = Vec3::new(2.0, 0.0, 0.0);
    floaty.linear_damping = Vec3::new(1.0, 0.0, 0.0);
    floaty.allow_sleep = false;
    let body_id = world.create_body(&floaty);
    world.create_fixture(
        body_id,
        &FixtureDef::new(Shape::sphere(0.2)).with_density(1.0),
    );

    for _ in 0..60 {
        world.step(DT, 4, 2);
    }
    let body = world.body(body_id).unwrap();
    // No gravity, and the damped x velocity decayed noticeably.
    assert!(body.transform.position.y.abs() < 1e-4);
    assert!(body.linear_velocity.x < 2.0 * 0.5);
    assert!(body.linear_velocity.x > 0.0);
}
