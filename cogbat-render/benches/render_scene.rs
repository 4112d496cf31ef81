use cogbat_core::stimulus::{BLACK, WHITE};
use cogbat_core::{ArrowDirection, Element, Position, Scene};
use cogbat_render::SkiaRenderer;
use cogbat_timing::HighPrecisionTimer;
use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

fn harness() -> (SkiaRenderer, Vec<u8>, HighPrecisionTimer) {
    let width = 1280u32;
    let height = 720u32;
    let r = SkiaRenderer::new(width, height, None).expect("renderer");
    let fb = vec![0u8; (width * height * 4) as usize];
    (r, fb, HighPrecisionTimer::new())
}

/// Five-arrow flanker row above fixation, the busiest frame in the battery.
fn flanker_scene() -> Scene {
    let mut scene = Scene::new(WHITE).with(Element::fixation(BLACK));
    for i in 0..5 {
        let direction = if i == 2 {
            ArrowDirection::Left
        } else {
            ArrowDirection::Right
        };
        scene.push(Element::Arrow {
            direction,
            size: 50.0,
            color: BLACK,
            at: Position::new(
                cogbat_core::Coord::FromCenter(-145.0 + i as f32 * 60.0),
                cogbat_core::Coord::FromCenter(-61.0),
            ),
        });
    }
    scene
}

pub fn bench_frame(c: &mut Criterion) {
    let mut g = c.benchmark_group("render_scene");
    g.sample_size(40);

    g.bench_function("flanker_frame", |b| {
        let scene = flanker_scene();
        b.iter_batched(
            harness,
            |(mut r, mut fb, mut t)| {
                let stats = r.render_scene(&scene, &mut fb, &mut t);
                black_box(stats)
            },
            BatchSize::SmallInput,
        )
    });

    g.finish();
}

criterion_group!(benches, bench_frame);
criterion_main!(benches);
