use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use glam::Vec3;
use tremor::*;

fn build_stack_world(columns: usize, height: usize) -> World {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));

    let ground = world.create_body(&BodyDef::static_at(Vec3::new(0.0, -1.0, 0.0)));
    world.create_fixture(
        ground,
        &FixtureDef::new(Shape::cuboid(Vec3::new(50.0, 1.0, 50.0))).with_friction(0.6),
    );

    for column in 0..columns {
        let x = column as f32 * 2.5 - columns as f32;
        for level in 0..height {
            let body = world.create_body(&BodyDef::dynamic_at(Vec3::new(
                x,
                0.5 + level as f32 * 1.01,
                0.0,
            )));
            world.create_fixture(
                body,
                &FixtureDef::new(Shape::cuboid(Vec3::splat(0.5)))
                    .with_density(1.0)
                    .with_friction(0.5),
            );
        }
    }
    world
}

fn build_terrain_world(bodies: usize) -> World {
    let mut world = World::new(Vec3::new(0.0, -10.0, 0.0));

    let mesh = Arc::new(TriangleMesh::grid(32, 32, 1.0, |ix, iz| {
        ((ix as f32 * 0.7).sin() + (iz as f32 * 0.5).cos()) * 0.3
    }));
    let terrain = world.create_body(&BodyDef::static_at(Vec3::ZERO));
    world.create_fixture(terrain, &FixtureDef::new(Shape::mesh(mesh)).with_friction(0.6));

    for i in 0..bodies {
        let x = (i % 8) as f32 * 1.5 - 6.0;
        let z = (i / 8) as f32 * 1.5 - 6.0;
        let body = world.create_body(&BodyDef::dynamic_at(Vec3::new(x, 3.0 + (i % 3) as f32, z)));
        world.create_fixture(
            body,
            &FixtureDef::new(Shape::sphere(0.4))
                .with_density(1.0)
                .with_friction(0.4),
        );
    }
    world
}

fn bench_steps(c: &mut Criterion) {
    c.bench_function("step_box_stacks_8x6", |b| {
        let mut world = build_stack_world(8, 6);
        // Settle so the bench measures steady-state solving.
        for _ in 0..60 {
            world.step(1.0 / 60.0, 8, 2);
        }
        b.iter(|| {
            world.step(1.0 / 60.0, 8, 2);
        });
    });

    c.bench_function("step_spheres_on_terrain_64", |b| {
        let mut world = build_terrain_world(64);
        for _ in 0..60 {
            world.step(1.0 / 60.0, 8, 2);
        }
        b.iter(|| {
            world.step(1.0 / 60.0, 8, 2);
        });
    });
}

criterion_group!(benches, bench_steps);
criterion_main!(benches);
