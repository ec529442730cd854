//! Slide a sphere across a triangulated floor and compare raw and reduced normals
//!
//! Run with `RUST_LOG=crossworld_mesh_collision=debug` to see per-pair reduction logs.
//! An optional first argument names a TOML config file.

use crossworld_mesh_collision::{
    collide_convex_mesh, BufferPool, ConfigError, Mesh, MeshCollisionConfig, PairId, Pose,
    ShapeKind, Sphere, SphereTriangleTester, Triangle, TriangleTester,
};
use glam::{Quat, Vec3};
use tracing_subscriber::EnvFilter;

fn create_floor(cells: usize) -> Vec<Triangle> {
    let mut triangles = Vec::with_capacity(cells * cells * 2);
    for i in 0..cells {
        for j in 0..cells {
            let (x, z) = (i as f32, j as f32);
            let p00 = Vec3::new(x, 0.0, z);
            let p10 = Vec3::new(x + 1.0, 0.0, z);
            let p01 = Vec3::new(x, 0.0, z + 1.0);
            let p11 = Vec3::new(x + 1.0, 0.0, z + 1.0);
            triangles.push(Triangle::new(p00, p01, p11));
            triangles.push(Triangle::new(p00, p11, p10));
        }
    }
    triangles
}

fn main() -> Result<(), ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => MeshCollisionConfig::load(path)?,
        None => MeshCollisionConfig::default(),
    };

    println!("Edge Sliding Example");
    println!("====================\n");

    let triangles = create_floor(4);
    let mesh = Mesh::new(triangles.clone(), Vec3::ONE);
    let sphere = Sphere::new(0.5);
    let shape = ShapeKind::Sphere(sphere);
    let tester = SphereTriangleTester::new(sphere.radius, &config.narrow_phase);
    let mut pool = BufferPool::default();

    println!("Floor: {} triangles", mesh.triangle_count());
    println!("Sphere radius {:.2}, resting {:.2} above the floor\n", sphere.radius, 0.49);

    let steps = 32;
    for step in 0..=steps {
        let x = 0.25 + 3.5 * step as f32 / steps as f32;
        let position = Vec3::new(x, 0.49, 1.5);

        // Worst normal any single triangle would have reported on its own
        let raw_worst = triangles
            .iter()
            .map(|triangle| {
                tester.test(
                    triangle,
                    -position,
                    Quat::IDENTITY,
                    config.narrow_phase.speculative_margin,
                )
            })
            .filter(|manifold| !manifold.is_empty())
            .map(|manifold| manifold.normal.dot(Vec3::Y))
            .fold(1.0f32, f32::min);

        let manifold = collide_convex_mesh(
            &shape,
            &tester,
            Pose::from_position(position),
            &mesh,
            Pose::IDENTITY,
            PairId(step),
            &config,
            &mut pool,
        );
        let reduced_worst = manifold
            .contacts
            .iter()
            .map(|contact| contact.normal.dot(Vec3::Y))
            .fold(1.0f32, f32::min);

        println!(
            "  x={:.3}: contacts={}, raw min dot={:.5}, reduced min dot={:.5}",
            x,
            manifold.len(),
            raw_worst,
            reduced_worst
        );
    }

    println!("\nOutstanding pool buffers: {}", pool.outstanding());
    Ok(())
}
