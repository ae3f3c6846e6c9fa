//! Right ascension / declination reference grid.
//!
//! Meridians are drawn every 15° of RA from pole to pole and parallels every
//! 15° of declination between -75° and +75°, in a faint blue. The celestial
//! equator is drawn again on top, brighter and thicker. Each line is sampled
//! along the sphere and broken into separate polylines wherever the
//! projection culls a sample, so hidden stretches never get bridged.

use crate::color::Rgba;
use crate::coords::{Projector, ScreenPoint};
use crate::surface::{DrawSurface, LineStyle};

pub const GRID_SPACING_DEG: f64 = 15.0;
pub const PARALLEL_LIMIT_DEG: f64 = 75.0;

const MERIDIAN_STEP_DEG: f64 = 2.0;
const PARALLEL_STEP_DEG: f64 = 1.0;
const EQUATOR_STEP_DEG: f64 = 0.5;

fn grid_style() -> LineStyle {
    LineStyle::new(Rgba::new(100, 150, 200, 0.25), 1.0)
}

fn equator_style() -> LineStyle {
    LineStyle::new(Rgba::new(100, 200, 255, 0.6), 2.0)
}

/// Evenly spaced samples from `start` to `end` inclusive.
fn samples(start: f64, end: f64, step: f64) -> impl Iterator<Item = f64> {
    let count = ((end - start) / step).round() as usize;
    (0..=count).map(move |i| start + i as f64 * step)
}

/// Project a sampled line and split it into visible runs.
///
/// Runs shorter than two points are dropped.
pub fn visible_runs(
    projector: &Projector,
    points: impl Iterator<Item = (f64, f64)>,
) -> Vec<Vec<ScreenPoint>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();

    for (ra, dec) in points {
        match projector.project(ra, dec) {
            Some(point) => current.push(point),
            None => {
                if current.len() >= 2 {
                    runs.push(std::mem::take(&mut current));
                } else {
                    current.clear();
                }
            }
        }
    }
    if current.len() >= 2 {
        runs.push(current);
    }
    runs
}

/// Draw the grid. Returns the number of polylines stroked.
pub fn draw_celestial_grid<S: DrawSurface + ?Sized>(surface: &mut S, projector: &Projector) -> usize {
    let mut stroked = 0;
    let style = grid_style();

    for ra in samples(0.0, 360.0 - GRID_SPACING_DEG, GRID_SPACING_DEG) {
        let meridian = samples(-90.0, 90.0, MERIDIAN_STEP_DEG).map(|dec| (ra, dec));
        for run in visible_runs(projector, meridian) {
            surface.stroke_polyline(&run, &style);
            stroked += 1;
        }
    }

    for dec in samples(-PARALLEL_LIMIT_DEG, PARALLEL_LIMIT_DEG, GRID_SPACING_DEG) {
        let parallel = samples(0.0, 360.0, PARALLEL_STEP_DEG).map(|ra| (ra, dec));
        for run in visible_runs(projector, parallel) {
            surface.stroke_polyline(&run, &style);
            stroked += 1;
        }
    }

    let equator_style = equator_style();
    let equator = samples(0.0, 360.0, EQUATOR_STEP_DEG).map(|ra| (ra, 0.0));
    for run in visible_runs(projector, equator) {
        surface.stroke_polyline(&run, &equator_style);
        stroked += 1;
    }

    stroked
}
