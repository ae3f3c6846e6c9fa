//! Diffuse Milky Way glow from faint-star density.
//!
//! Individual faint stars are far too numerous to draw, but their combined
//! light is what makes the Milky Way visible. Each frame, every on-screen
//! star of magnitude 7.5 or brighter is splatted into a coarse 96x48 grid
//! spanning the surface, with weight `7.5 - vmag` spread bilinearly over
//! the four nearest cell centers. The grid is then normalized by its peak,
//! gamma-compressed and painted as additive radial blobs beneath the stars.
//!
//! | Mode      | Gamma | Base alpha |
//! |-----------|-------|------------|
//! | Telescope | 0.65  | 0.26       |
//! | Naked eye | 0.85  | 0.12       |

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::catalog::Star;
use crate::color::Rgb;
use crate::coords::{Projector, ScreenPoint};
use crate::surface::{CompositeMode, DrawSurface, GradientStop};

pub const GRID_COLUMNS: usize = 96;
pub const GRID_ROWS: usize = 48;

/// Faintest magnitude contributing to the glow.
pub const MAX_GLOW_MAG: f64 = 7.5;

const GLOW_COLOR: Rgb = Rgb::new(200, 210, 255);
const BLOB_RADIUS_CELLS: f64 = 1.5;

/// Glow rendering style, following the observation mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum GlowMode {
    /// Strong glow with a wide dynamic range
    Telescope,
    /// Subtler glow with compressed dynamic range
    NakedEye,
}

impl GlowMode {
    pub fn gamma(&self) -> f64 {
        match self {
            GlowMode::Telescope => 0.65,
            GlowMode::NakedEye => 0.85,
        }
    }

    pub fn base_alpha(&self) -> f64 {
        match self {
            GlowMode::Telescope => 0.26,
            GlowMode::NakedEye => 0.12,
        }
    }
}

/// Weight a star contributes to the density field.
pub fn glow_weight(vmag: f64) -> f64 {
    (MAX_GLOW_MAG - vmag).max(0.0)
}

/// Per-frame star density accumulated over the surface.
///
/// Cells are indexed `[row, column]`; cell centers sit at
/// `((column + 0.5) * cell_width, (row + 0.5) * cell_height)`.
#[derive(Debug, Clone)]
pub struct DensityGrid {
    cells: Array2<f64>,
    max: f64,
    cell_width: f64,
    cell_height: f64,
}

impl DensityGrid {
    /// An empty grid spanning a surface of the given size.
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            cells: Array2::zeros((GRID_ROWS, GRID_COLUMNS)),
            max: 0.0,
            cell_width: width / GRID_COLUMNS as f64,
            cell_height: height / GRID_ROWS as f64,
        }
    }

    /// Build the grid from every qualifying star of a frame.
    ///
    /// Pass the full star set, not the LOD-reduced one, so the estimate sees
    /// the whole faint population.
    pub fn accumulate<'a>(projector: &Projector, stars: impl IntoIterator<Item = &'a Star>) -> Self {
        let mut grid = Self::new(projector.width(), projector.height());
        for star in stars {
            let Some(vmag) = star.vmag.filter(|&vmag| vmag <= MAX_GLOW_MAG) else {
                continue;
            };
            if let Some(point) = projector.project(star.ra, star.dec) {
                grid.splat(point, glow_weight(vmag));
            }
        }
        grid
    }

    /// Spread `weight` bilinearly over the four cells nearest to `point`.
    ///
    /// Cells outside the grid (points in the off-screen margin) are skipped.
    pub fn splat(&mut self, point: ScreenPoint, weight: f64) {
        if weight <= 0.0 {
            return;
        }

        let gx = point.x / self.cell_width - 0.5;
        let gy = point.y / self.cell_height - 0.5;
        let x0 = gx.floor();
        let y0 = gy.floor();
        let fx = gx - x0;
        let fy = gy - y0;

        let neighbors = [
            (y0, x0, (1.0 - fx) * (1.0 - fy)),
            (y0, x0 + 1.0, fx * (1.0 - fy)),
            (y0 + 1.0, x0, (1.0 - fx) * fy),
            (y0 + 1.0, x0 + 1.0, fx * fy),
        ];

        for (row, col, share) in neighbors {
            if share <= 0.0 || row < 0.0 || col < 0.0 {
                continue;
            }
            let (row, col) = (row as usize, col as usize);
            if let Some(cell) = self.cells.get_mut((row, col)) {
                *cell += weight * share;
                self.max = self.max.max(*cell);
            }
        }
    }

    pub fn cells(&self) -> &Array2<f64> {
        &self.cells
    }

    /// Largest cell value.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// True when nothing was accumulated.
    pub fn is_empty(&self) -> bool {
        self.max <= 0.0
    }

    /// `(row, column)` of the densest cell, if any cell is non-zero.
    pub fn peak_cell(&self) -> Option<(usize, usize)> {
        if self.is_empty() {
            return None;
        }
        self.cells
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(index, _)| index)
    }

    /// `(row, column)` of the cell containing a surface point.
    pub fn cell_containing(&self, point: ScreenPoint) -> Option<(usize, usize)> {
        if point.x < 0.0 || point.y < 0.0 {
            return None;
        }
        let col = (point.x / self.cell_width) as usize;
        let row = (point.y / self.cell_height) as usize;
        (row < GRID_ROWS && col < GRID_COLUMNS).then_some((row, col))
    }

    pub fn cell_center(&self, row: usize, col: usize) -> ScreenPoint {
        ScreenPoint::new(
            (col as f64 + 0.5) * self.cell_width,
            (row as f64 + 0.5) * self.cell_height,
        )
    }

    /// Paint the glow with additive compositing. Returns the blob count.
    ///
    /// An empty grid paints nothing and leaves the compositing mode alone.
    pub fn paint<S: DrawSurface + ?Sized>(&self, surface: &mut S, mode: GlowMode) -> usize {
        if self.is_empty() {
            return 0;
        }

        let radius = self.cell_width.max(self.cell_height) * BLOB_RADIUS_CELLS;
        let mut painted = 0;

        surface.set_composite(CompositeMode::Lighter);
        for ((row, col), &value) in self.cells.indexed_iter() {
            if value <= 0.0 {
                continue;
            }
            let intensity = (value / self.max).powf(mode.gamma()) * mode.base_alpha();
            let stops = [
                GradientStop::new(0.0, GLOW_COLOR.with_alpha(intensity)),
                GradientStop::new(0.5, GLOW_COLOR.with_alpha(intensity * 0.4)),
                GradientStop::new(1.0, GLOW_COLOR.with_alpha(0.0)),
            ];
            surface.fill_radial_gradient(self.cell_center(row, col), radius, &stops);
            painted += 1;
        }
        surface.set_composite(CompositeMode::SourceOver);

        painted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{Equatorial, ProjectionMode};
    use crate::surface::{DrawCommand, RecordingSurface};
    use approx::assert_relative_eq;

    const W: f64 = 960.0;
    const H: f64 = 480.0;

    fn projector() -> Projector {
        Projector::new(
            Equatorial::new(0.0, 0.0),
            1.0,
            W,
            H,
            ProjectionMode::Orthographic,
            None,
        )
    }

    #[test]
    fn test_glow_modes() {
        assert_eq!(GlowMode::Telescope.gamma(), 0.65);
        assert_eq!(GlowMode::NakedEye.base_alpha(), 0.12);
    }

    #[test]
    fn test_splat_at_cell_center_hits_one_cell() {
        let mut grid = DensityGrid::new(W, H);
        let center = grid.cell_center(10, 20);
        grid.splat(center, 3.0);

        assert_relative_eq!(grid.cells()[[10, 20]], 3.0, epsilon = 1e-9);
        assert_relative_eq!(grid.cells().sum(), 3.0, epsilon = 1e-9);
        assert_eq!(grid.peak_cell(), Some((10, 20)));
    }

    #[test]
    fn test_splat_conserves_weight_between_cells() {
        let mut grid = DensityGrid::new(W, H);
        // Halfway between the centers of columns 3 and 4 on row 5
        let a = grid.cell_center(5, 3);
        let b = grid.cell_center(5, 4);
        grid.splat(ScreenPoint::new((a.x + b.x) / 2.0, a.y), 2.0);

        assert_relative_eq!(grid.cells()[[5, 3]], 1.0, epsilon = 1e-9);
        assert_relative_eq!(grid.cells()[[5, 4]], 1.0, epsilon = 1e-9);
        assert_relative_eq!(grid.max(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_margin_points_only_touch_inside_cells() {
        let mut grid = DensityGrid::new(W, H);
        grid.splat(ScreenPoint::new(-50.0, -50.0), 5.0);
        assert!(grid.is_empty());

        grid.splat(ScreenPoint::new(W + 2.0, H / 2.0), 5.0);
        assert!(!grid.is_empty());
        assert!(grid.cells().column(GRID_COLUMNS - 1).sum() > 0.0);
    }

    #[test]
    fn test_cluster_produces_local_maximum() {
        let mut stars = Vec::new();
        for i in 0..40 {
            let offset = (i % 5) as f64 * 0.05;
            stars.push(Star::new(i, 20.0 + offset, 10.0 + offset, Some(6.0), None));
        }
        // Sparse faint background elsewhere
        for i in 0..20 {
            stars.push(Star::new(100 + i, 330.0 + i as f64, -20.0, Some(7.2), None));
        }
        // Too faint to count
        stars.push(Star::new(999, 20.0, 10.0, Some(8.0), None));

        let projector = projector();
        let grid = DensityGrid::accumulate(&projector, &stars);
        let cluster_point = projector.project(20.1, 10.1).unwrap();
        let (row, col) = grid.cell_containing(cluster_point).unwrap();
        let (peak_row, peak_col) = grid.peak_cell().unwrap();

        assert!(peak_row.abs_diff(row) <= 1);
        assert!(peak_col.abs_diff(col) <= 1);
    }

    #[test]
    fn test_empty_star_set_paints_nothing() {
        let grid = DensityGrid::accumulate(&projector(), &Vec::<Star>::new());
        assert!(grid.is_empty());
        assert!(grid.cells().iter().all(|&v| v == 0.0));

        let mut surface = RecordingSurface::new(W, H);
        assert_eq!(grid.paint(&mut surface, GlowMode::Telescope), 0);
        assert!(surface.commands().is_empty());
    }

    #[test]
    fn test_paint_is_additive_and_normalized() {
        let mut grid = DensityGrid::new(W, H);
        grid.splat(grid.cell_center(2, 2), 4.0);
        grid.splat(grid.cell_center(30, 60), 1.0);

        let mut surface = RecordingSurface::new(W, H);
        let painted = grid.paint(&mut surface, GlowMode::Telescope);

        assert_eq!(painted, 2);
        assert_eq!(surface.additive_gradient_count(), 2);
        assert_eq!(surface.composite(), CompositeMode::SourceOver);

        let peak_alpha = surface
            .commands()
            .iter()
            .find_map(|c| match c {
                DrawCommand::RadialGradient { stops, .. } => Some(stops[0].color.a),
                _ => None,
            })
            .unwrap();
        assert_relative_eq!(peak_alpha, 0.26, epsilon = 1e-9);
    }
}
