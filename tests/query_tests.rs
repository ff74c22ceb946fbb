use glam::Vec3;
use tremor::core::fixture::FixtureId;
use tremor::*;

fn static_box_at(world: &mut World, position: Vec3, half: Vec3) -> (BodyId, FixtureId) {
    let body = world.create_body(&BodyDef::static_at(position));
    let fixture = world.create_fixture(body, &FixtureDef::new(Shape::cuboid(half)));
    (body, fixture)
}

#[test]
fn single_ray_hits_the_first_box_in_the_row() {
    let mut world = World::new(Vec3::ZERO);
    let (_, first) = static_box_at(&mut world, Vec3::new(-5.0, 0.0, 0.0), Vec3::splat(0.5));
    static_box_at(&mut world, Vec3::new(0.0, 0.0, 0.0), Vec3::splat(0.5));
    static_box_at(&mut world, Vec3::new(5.0, 0.0, 0.0), Vec3::splat(0.5));

    // Proxies pair up lazily; one step settles the broad phase.
    world.step(1.0 / 60.0, 1, 1);

    let hit = world
        .ray_cast_single(None, Vec3::new(-10.0, 0.25, 0.0), Vec3::new(10.0, 0.25, 0.0))
        .expect("ray should hit the row");

    assert_eq!(hit.fixture, first);
    assert!(
        (0.225 - 0.002..=0.225 + 0.002).contains(&hit.fraction),
        "fraction {}",
        hit.fraction
    );
    assert!((hit.normal.x + 1.0).abs() < 1e-4);
    assert!((hit.point.x + 5.5).abs() < 1e-3);
}

#[test]
fn ray_listener_can_keep_collecting() {
    struct CollectAll {
        hits: Vec<FixtureId>,
    }
    impl RayCastListener for CollectAll {
        fn report_fixture(
            &mut self,
            fixture: FixtureId,
            _point: Vec3,
            _normal: Vec3,
            _fraction: f32,
        ) -> f32 {
            self.hits.push(fixture);
            // Keep the ray at full length to see everything.
            1.0
        }
    }

    let mut world = World::new(Vec3::ZERO);
    static_box_at(&mut world, Vec3::new(-5.0, 0.0, 0.0), Vec3::splat(0.5));
    static_box_at(&mut world, Vec3::new(0.0, 0.0, 0.0), Vec3::splat(0.5));
    static_box_at(&mut world, Vec3::new(5.0, 0.0, 0.0), Vec3::splat(0.5));
    world.step(1.0 / 60.0, 1, 1);

    let mut listener = CollectAll { hits: Vec::new() };
    world.ray_cast(
        &mut listener,
        None,
        Vec3::new(-10.0, 0.0, 0.0),
        Vec3::new(10.0, 0.0, 0.0),
    );
    assert_eq!(listener.hits.len(), 3);
}

#[test]
fn ray_filter_skips_fixtures() {
    struct SkipMarked;
    impl RayCastFilter for SkipMarked {
        fn should_ray_cast(&self, fixture: &Fixture) -> bool {
            fixture.user_data != 7
        }
    }

    let mut world = World::new(Vec3::ZERO);
    let near = world.create_body(&BodyDef::static_at(Vec3::new(-5.0, 0.0, 0.0)));
    let mut def = FixtureDef::new(Shape::cuboid(Vec3::splat(0.5)));
    def.user_data = 7;
    world.create_fixture(near, &def);
    let (_, far) = static_box_at(&mut world, Vec3::new(0.0, 0.0, 0.0), Vec3::splat(0.5));
    world.step(1.0 / 60.0, 1, 1);

    let hit = world
        .ray_cast_single(
            Some(&SkipMarked),
            Vec3::new(-10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 0.0),
        )
        .expect("the unmarked box should be hit");
    assert_eq!(hit.fixture, far);
}

#[test]
fn aabb_query_reports_overlapping_fixtures() {
    struct Collect {
        found: Vec<FixtureId>,
    }
    impl QueryListener for Collect {
        fn report_fixture(&mut self, fixture: FixtureId) -> bool {
            self.found.push(fixture);
            true
        }
    }

    let mut world = World::new(Vec3::ZERO);
    let (_, a) = static_box_at(&mut world, Vec3::ZERO, Vec3::splat(0.5));
    static_box_at(&mut world, Vec3::new(20.0, 0.0, 0.0), Vec3::splat(0.5));

    let mut listener = Collect { found: Vec::new() };
    world.query_aabb(
        &mut listener,
        None,
        &Aabb::from_center(Vec3::ZERO, Vec3::splat(2.0)),
    );
    assert_eq!(listener.found, vec![a]);
}

#[test]
fn shape_cast_single_finds_the_wall() {
    let mut world = World::new(Vec3::ZERO);
    static_box_at(&mut world, Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.5, 5.0, 5.0));
    world.step(1.0 / 60.0, 1, 1);

    let probe = Shape::sphere(0.5);
    let hit = world
        .shape_cast_single(
            None,
            &probe,
            &Transform::from_position(Vec3::ZERO),
            Vec3::new(20.0, 0.0, 0.0),
        )
        .expect("cast should reach the wall");

    // Sphere surface meets the wall face at x = 9.5, center at 9.0.
    assert!((hit.fraction - 9.0 / 20.0).abs() < 0.01, "t={}", hit.fraction);
    assert!(hit.normal.x < -0.9);
}

#[test]
fn shape_cast_misses_when_aimed_away() {
    let mut world = World::new(Vec3::ZERO);
    static_box_at(&mut world, Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.5, 5.0, 5.0));
    world.step(1.0 / 60.0, 1, 1);

    let probe = Shape::sphere(0.5);
    let hit = world.shape_cast_single(
        None,
        &probe,
        &Transform::from_position(Vec3::ZERO),
        Vec3::new(-20.0, 0.0, 0.0),
    );
    assert!(hit.is_none());
}

#[test]
fn sensors_report_but_do_not_push() {
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Events {
        begins: usize,
        ends: usize,
    }
    struct Recorder(Rc<RefCell<Events>>);
    impl ContactListener for Recorder {
        fn begin_contact(&mut self, _c: ContactId, _a: FixtureId, _b: FixtureId) {
            self.0.borrow_mut().begins += 1;
        }
        fn end_contact(&mut self, _c: ContactId, _a: FixtureId, _b: FixtureId) {
            self.0.borrow_mut().ends += 1;
        }
    }

    let events = Rc::new(RefCell::new(Events::default()));

    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    world.set_contact_listener(Some(Box::new(Recorder(events.clone()))));

    // A sensor volume floating at y = 2.
    let sensor_body = world.create_body(&BodyDef::static_at(Vec3::new(0.0, 2.0, 0.0)));
    world.create_fixture(
        sensor_body,
        &FixtureDef::new(Shape::cuboid(Vec3::splat(0.5))).sensor(),
    );

    let faller = world.create_body(&BodyDef::dynamic_at(Vec3::new(0.0, 5.0, 0.0)));
    world.create_fixture(
        faller,
        &FixtureDef::new(Shape::sphere(0.3)).with_density(1.0),
    );

    for _ in 0..120 {
        world.step(1.0 / 60.0, 4, 2);
    }

    let events = events.borrow();
    assert!(events.begins >= 1, "sensor never saw the sphere");
    assert!(events.ends >= 1, "sensor never saw it leave");
    // The sphere passed straight through.
    assert!(world.body(faller).unwrap().transform.position.y < 0.0);
}

#[test]
fn debug_draw_receives_every_shape_primitive() {
    #[derive(Default)]
    struct Recorder {
        spheres: usize,
        cylinders: usize,
        capsules: usize,
        polygons: usize,
        aabbs: usize,
    }
    impl DebugDraw for Recorder {
        fn draw_point(&mut self, _p: Vec3, _s: f32, _c: [f32; 4]) {}
        fn draw_segment(&mut self, _a: Vec3, _b: Vec3, _c: [f32; 4]) {}
        fn draw_triangle(&mut self, _a: Vec3, _b: Vec3, _v: Vec3, _c: [f32; 4]) {}
        fn draw_solid_triangle(&mut self, _n: Vec3, _a: Vec3, _b: Vec3, _v: Vec3, _c: [f32; 4]) {}
        fn draw_polygon(&mut self, _v: &[Vec3], _c: [f32; 4]) {}
        fn draw_solid_polygon(&mut self, _n: Vec3, _v: &[Vec3], _c: [f32; 4]) {
            self.polygons += 1;
        }
        fn draw_circle(&mut self, _n: Vec3, _p: Vec3, _r: f32, _c: [f32; 4]) {}
        fn draw_sphere(&mut self, _p: Vec3, _r: f32, _c: [f32; 4]) {
            self.spheres += 1;
        }
        fn draw_cylinder(&mut self, _a: Vec3, _b: Vec3, _r: f32, _c: [f32; 4]) {
            self.cylinders += 1;
        }
        fn draw_capsule(&mut self, _a: Vec3, _b: Vec3, _r: f32, _c: [f32; 4]) {
            self.capsules += 1;
        }
        fn draw_aabb(&mut self, _aabb: &Aabb, _c: [f32; 4]) {
            self.aabbs += 1;
        }
        fn draw_transform(&mut self, _xf: &Transform) {}
    }

    let mut world = World::new(Vec3::ZERO);
    let body = world.create_body(&BodyDef::static_at(Vec3::ZERO));
    world.create_fixture(body, &FixtureDef::new(Shape::sphere(0.5)));
    world.create_fixture(body, &FixtureDef::new(Shape::cylinder(0.5, 0.3)));
    world.create_fixture(
        body,
        &FixtureDef::new(Shape::capsule(Vec3::ZERO, Vec3::Y, 0.2)),
    );
    world.create_fixture(body, &FixtureDef::new(Shape::cuboid(Vec3::splat(0.5))));

    let mut recorder = Recorder::default();
    world.draw(
        &mut recorder,
        tremor::world::events::draw_flags::SHAPES | tremor::world::events::draw_flags::AABBS,
    );

    assert_eq!(recorder.spheres, 1);
    assert_eq!(recorder.cylinders, 1);
    assert_eq!(recorder.capsules, 1);
    assert_eq!(recorder.polygons, 6);
    assert_eq!(recorder.aabbs, 4);
}

#[test]
fn contact_filter_vetoes_pairs() {
    struct NoCollision;
    impl ContactFilter for NoCollision {
        fn should_collide(&self, _a: &Fixture, _b: &Fixture) -> bool {
            false
        }
    }

    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));
    world.set_contact_filter(Some(Box::new(NoCollision)));

    let ground = world.create_body(&BodyDef::static_at(Vec3::new(0.0, -1.0, 0.0)));
    world.create_fixture(
        ground,
        &FixtureDef::new(Shape::cuboid(Vec3::new(10.0, 1.0, 10.0))),
    );
    let ball = world.create_body(&BodyDef::dynamic_at(Vec3::new(0.0, 2.0, 0.0)));
    world.create_fixture(ball, &FixtureDef::new(Shape::sphere(0.5)).with_density(1.0));

    for _ in 0..120 {
        world.step(1.0 / 60.0, 4, 2);
    }
    // The filter removed the response entirely: the ball fell through.
    assert!(world.body(ball).unwrap().transform.position.y < -1.0);
}
