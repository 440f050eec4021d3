use bevy::math::{DVec3, IVec3, UVec3};
use criterion::{criterion_group, criterion_main, Criterion};

use bevy_mobnav::prelude::*;

fn field(size: u32) -> VoxelTerrain {
    let mut terrain = VoxelTerrain::new(UVec3::new(size, 8, size), IVec3::ZERO);
    let max = size as i32 - 1;
    terrain
        .fill(IVec3::ZERO, IVec3::new(max, 0, max), BlockState::SOLID)
        .unwrap();

    // Staggered walls so the search has to weave.
    for x in (4..max).step_by(6) {
        let (from, to) = if (x / 6) % 2 == 0 { (0, max - 3) } else { (3, max) };
        terrain
            .fill(IVec3::new(x, 1, from), IVec3::new(x, 2, to), BlockState::SOLID)
            .unwrap();
    }
    terrain
}

fn benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("pathfinding");
    group.sample_size(10);

    let agent = Agent::new(DVec3::new(1.5, 1.0, 1.5), 0.6, 1.8);
    let settings = SearchSettingsBuilder::new().follow_range(64.0).build();

    let terrain = field(32);
    let goal = [IVec3::new(30, 1, 30)];

    group.bench_function("walk_32x32_uncached", |b| {
        let mut finder = PathFinder::new(WalkNodeEvaluator::default(), settings);
        b.iter(|| {
            let mut context = PathfindingContext::uncached(&terrain, agent.block_position());
            finder.find_path(&mut context, &agent, &goal)
        })
    });

    let mut world = VoxelWorld::new(terrain.clone());
    group.bench_function("walk_32x32_cached", |b| {
        let mut finder = PathFinder::new(WalkNodeEvaluator::default(), settings);
        b.iter(|| {
            let mut context = world.context(agent.block_position());
            finder.find_path(&mut context, &agent, &goal)
        })
    });

    group.bench_function("fly_32x32", |b| {
        let mut finder = PathFinder::new(FlyNodeEvaluator::default(), settings);
        let flyer = Agent::new(DVec3::new(1.5, 3.0, 1.5), 0.5, 0.9);
        b.iter(|| {
            let mut context = PathfindingContext::uncached(&terrain, flyer.block_position());
            finder.find_path(&mut context, &flyer, &[IVec3::new(30, 3, 30)])
        })
    });

    group.finish();
}

criterion_group!(benches, benchmarks);
criterion_main!(benches);
