//! Per-frame star field pipeline.
//!
//! One call to [`StarFieldRenderer::draw_frame`] paints a complete frame:
//!
//! 1. Background fill
//! 2. Celestial grid
//! 3. Milky Way density glow, accumulated over the full star set
//! 4. Highlighted/background partition and LOD reduction of the background
//! 5. Background stars, then highlighted stars, each faintest first so
//!    brighter stars land on top
//! 6. Constellation lines
//! 7. HUD overlay
//!
//! The renderer owns the label cache and clears it whenever the label
//! preferences change.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::catalog::{ConstellationLine, Star, StarCatalog};
use crate::color::{Rgb, Rgba};
use crate::constellation::{default_line_style, draw_constellation_lines};
use crate::coords::{field_of_view, ObserverLocation, ProjectionMode, Projector, ScreenPoint};
use crate::encoder::{draw_star, LabelCache, LabelPreferences};
use crate::grid::draw_celestial_grid;
use crate::lod;
use crate::milky_way::{DensityGrid, GlowMode};
use crate::surface::{DrawSurface, TextStyle};
use crate::viewport::ViewState;

/// Night sky background, `#000814`.
pub const BACKGROUND: Rgb = Rgb::new(0x00, 0x08, 0x14);

const HUD_ORIGIN: (f64, f64) = (5.0, 5.0);
const HUD_SIZE: (f64, f64) = (350.0, 150.0);
const HUD_TEXT_X: f64 = 15.0;

/// Which pipeline stages run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub labels: LabelPreferences,
    pub show_constellation_lines: bool,
    /// `None` disables the glow stage entirely
    pub milky_way_glow: Option<GlowMode>,
    pub show_grid: bool,
    pub show_hud: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            labels: LabelPreferences::default(),
            show_constellation_lines: true,
            milky_way_glow: Some(GlowMode::Telescope),
            show_grid: true,
            show_hud: true,
        }
    }
}

/// Inputs of one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameInput<'a> {
    pub catalog: &'a StarCatalog,
    pub constellations: &'a [ConstellationLine],
    pub view: &'a ViewState,
    pub observer: ObserverLocation,
    /// Milliseconds since the loop started, drives twinkle
    pub time_ms: f64,
}

impl FrameInput<'_> {
    /// Projector for this frame. The observer is only handed to the
    /// stereographic projection.
    pub fn projector(&self, width: f64, height: f64) -> Projector {
        let observer = match self.view.projection_mode {
            ProjectionMode::Stereographic => Some(self.observer),
            ProjectionMode::Orthographic => None,
        };
        Projector::new(
            self.view.view_center,
            self.view.zoom,
            width,
            height,
            self.view.projection_mode,
            observer,
        )
    }
}

/// What a frame drew.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameStats {
    /// Stars actually drawn
    pub visible_stars: usize,
    /// Stars in the catalog
    pub total_stars: usize,
    pub highlighted: usize,
    /// Background stars left after LOD reduction
    pub background_selected: usize,
    pub glow_cells: usize,
    pub grid_lines: usize,
    pub constellation_segments: usize,
    pub elapsed: Duration,
}

type FrameObserver = Box<dyn FnMut(&FrameStats)>;

/// Draws star field frames onto any [`DrawSurface`].
pub struct StarFieldRenderer {
    options: RenderOptions,
    labels: LabelCache,
    frame_observer: Option<FrameObserver>,
}

impl StarFieldRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            labels: LabelCache::new(),
            frame_observer: None,
        }
    }

    pub fn options(&self) -> &RenderOptions {
        &self.options
    }

    /// Replace the options, dropping cached labels if label preferences changed.
    pub fn set_options(&mut self, options: RenderOptions) {
        if options.labels != self.options.labels {
            log::debug!("Label preferences changed, clearing {} cached labels", self.labels.len());
            self.labels.clear();
        }
        self.options = options;
    }

    pub fn set_label_preferences(&mut self, labels: LabelPreferences) {
        self.set_options(RenderOptions {
            labels,
            ..self.options
        });
    }

    /// Number of stars with a memoized label decision.
    pub fn cached_labels(&self) -> usize {
        self.labels.len()
    }

    /// Register a callback receiving the statistics of every frame.
    pub fn set_frame_observer(&mut self, observer: impl FnMut(&FrameStats) + 'static) {
        self.frame_observer = Some(Box::new(observer));
    }

    /// Paint one complete frame.
    pub fn draw_frame<S: DrawSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        frame: &FrameInput<'_>,
    ) -> FrameStats {
        let started = Instant::now();
        let projector = frame.projector(surface.width(), surface.height());
        let stars = frame.catalog.stars();
        let mut stats = FrameStats {
            total_stars: stars.len(),
            ..FrameStats::default()
        };

        surface.fill_background(BACKGROUND);

        if self.options.show_grid {
            stats.grid_lines = draw_celestial_grid(surface, &projector);
        }

        if let Some(mode) = self.options.milky_way_glow {
            let grid = DensityGrid::accumulate(&projector, stars);
            stats.glow_cells = grid.paint(surface, mode);
        }

        let (mut highlighted, background) = lod::partition(stars);
        let mut background = lod::select_background(&background, frame.view.zoom);
        stats.highlighted = highlighted.len();
        stats.background_selected = background.len();

        sort_faintest_first(&mut background);
        sort_faintest_first(&mut highlighted);

        for star in background.into_iter().chain(highlighted) {
            if draw_star(
                surface,
                &projector,
                star,
                frame.time_ms,
                &self.options.labels,
                &mut self.labels,
            ) {
                stats.visible_stars += 1;
            }
        }

        if self.options.show_constellation_lines && !frame.constellations.is_empty() {
            stats.constellation_segments = draw_constellation_lines(
                surface,
                frame.constellations,
                frame.catalog,
                &projector,
                &default_line_style(),
            );
        }

        if self.options.show_hud {
            draw_hud(surface, frame.view, stats.visible_stars, stats.total_stars);
        }

        stats.elapsed = started.elapsed();
        log::debug!(
            "Frame: {}/{} stars, {} glow cells, {} segments in {:.2?}",
            stats.visible_stars,
            stats.total_stars,
            stats.glow_cells,
            stats.constellation_segments,
            stats.elapsed
        );

        if let Some(observer) = self.frame_observer.as_mut() {
            observer(&stats);
        }
        stats
    }
}

impl Default for StarFieldRenderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

/// Descending magnitude; stars without one go first.
fn sort_faintest_first(stars: &mut [&Star]) {
    stars.sort_by(|a, b| b.sort_magnitude().total_cmp(&a.sort_magnitude()));
}

/// Lines of the HUD text block.
pub fn hud_lines(view: &ViewState, visible: usize, total: usize) -> Vec<String> {
    vec![
        format!("Stars: {visible} / {total}"),
        format!(
            "Center: RA {:.1}° / Dec {:.1}°",
            view.view_center.ra, view.view_center.dec
        ),
        format!("Field of view: {}°", field_of_view(view.zoom).round()),
        format!("Zoom: {:.1}x", view.zoom),
        format!("Projection: {}", view.projection_mode),
    ]
}

fn draw_hud<S: DrawSurface + ?Sized>(surface: &mut S, view: &ViewState, visible: usize, total: usize) {
    surface.fill_rect(
        HUD_ORIGIN.0,
        HUD_ORIGIN.1,
        HUD_SIZE.0,
        HUD_SIZE.1,
        Rgba::new(0, 0, 0, 0.7),
    );

    let white: Rgba = Rgb::WHITE.into();
    surface.fill_text(
        "View",
        ScreenPoint::new(HUD_TEXT_X, 25.0),
        &TextStyle::new(white, 16.0).monospace(),
    );

    let body = TextStyle::new(white, 14.0).monospace();
    for (i, line) in hud_lines(view, visible, total).iter().enumerate() {
        surface.fill_text(line, ScreenPoint::new(HUD_TEXT_X, 50.0 + 20.0 * i as f64), &body);
    }
}
