use criterion::{black_box, criterion_group, criterion_main, Criterion};
use skyview::coords::{Equatorial, ObserverLocation, ProjectionMode, Projector};
use skyview::lod::{partition, select_background};
use skyview::milky_way::{DensityGrid, GlowMode};
use skyview::raster::PixmapSurface;
use skyview::renderer::{FrameInput, RenderOptions, StarFieldRenderer};
use skyview::surface::RecordingSurface;
use skyview::{Star, StarCatalog, ViewState};

fn make_catalog(count: usize) -> StarCatalog {
    let stars = (0..count)
        .map(|i| {
            let ra = (i as f64 * 137.508) % 360.0;
            let dec = ((i as f64 * 0.618_034) % 1.0 * 2.0 - 1.0).asin().to_degrees();
            let vmag = -1.0 + 9.0 * ((i as f64 * 0.754_877) % 1.0);
            let star = Star::new(i as u32 + 1, ra, dec, Some(vmag), Some(0.6));
            if i % 997 == 0 {
                star.with_proper_name(format!("Bench {i}"))
            } else {
                star
            }
        })
        .collect();
    StarCatalog::new(stars)
}

fn bench_frame(c: &mut Criterion) {
    let catalog = make_catalog(20_000);
    let observer = ObserverLocation::default();
    let ortho = ViewState::new(Equatorial::new(180.0, 0.0), 1.5, ProjectionMode::Orthographic);
    let stereo = ViewState::new(Equatorial::new(180.0, 0.0), 1.5, ProjectionMode::Stereographic);

    let mut group = c.benchmark_group("draw_frame");
    for (name, view) in [("orthographic_20k", &ortho), ("stereographic_20k", &stereo)] {
        let mut renderer = StarFieldRenderer::new(RenderOptions::default());
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let frame = FrameInput {
            catalog: &catalog,
            constellations: &[],
            view,
            observer,
            time_ms: 0.0,
        };
        group.bench_function(name, |b| {
            b.iter(|| {
                surface.clear();
                black_box(renderer.draw_frame(&mut surface, black_box(&frame)))
            })
        });
    }

    if let Ok(mut pixmap) = PixmapSurface::new(800, 600) {
        let mut renderer = StarFieldRenderer::new(RenderOptions {
            show_hud: false,
            ..RenderOptions::default()
        });
        let frame = FrameInput {
            catalog: &catalog,
            constellations: &[],
            view: &ortho,
            observer,
            time_ms: 0.0,
        };
        group.sample_size(10);
        group.bench_function("raster_orthographic_20k", |b| {
            b.iter(|| black_box(renderer.draw_frame(&mut pixmap, black_box(&frame))))
        });
    }
    group.finish();
}

fn bench_lod(c: &mut Criterion) {
    let catalog = make_catalog(20_000);
    let (_, background) = partition(catalog.stars());

    c.bench_function("select_background_20k", |b| {
        b.iter(|| black_box(select_background(black_box(&background), black_box(1.5))))
    });
}

fn bench_density_grid(c: &mut Criterion) {
    let catalog = make_catalog(20_000);
    let projector = Projector::new(
        Equatorial::new(180.0, 0.0),
        1.5,
        800.0,
        600.0,
        ProjectionMode::Orthographic,
        None,
    );

    c.bench_function("density_grid_20k", |b| {
        b.iter(|| {
            let grid = DensityGrid::accumulate(&projector, catalog.stars());
            let mut surface = RecordingSurface::new(800.0, 600.0);
            black_box(grid.paint(&mut surface, GlowMode::Telescope))
        })
    });
}

criterion_group!(benches, bench_frame, bench_lod, bench_density_grid);
criterion_main!(benches);
