//! Drawing surface abstraction.
//!
//! The renderer paints through [`DrawSurface`], a small set of Canvas-2D-like
//! primitives: filled rectangles, radial gradient discs, solid circles,
//! strokes, text and a compositing switch for additive glow. Two
//! implementations ship with the crate:
//!
//! - [`RecordingSurface`]: keeps the issued commands in memory, for headless
//!   use and for inspecting exactly what a frame drew
//! - [`crate::raster::PixmapSurface`]: rasterizes into a `tiny-skia` pixmap

use crate::color::{Rgb, Rgba};
use crate::coords::ScreenPoint;

/// How new paint combines with what is already on the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompositeMode {
    /// Normal alpha blending
    #[default]
    SourceOver,
    /// Additive blending; overlapping paint brightens instead of clipping
    Lighter,
}

/// A color stop of a radial gradient; `offset` runs from 0 (center) to 1 (rim).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientStop {
    pub offset: f64,
    pub color: Rgba,
}

impl GradientStop {
    pub fn new(offset: f64, color: Rgba) -> Self {
        Self { offset, color }
    }
}

/// Stroke parameters for lines.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: Rgba,
    pub width: f64,
}

impl LineStyle {
    pub fn new(color: Rgba, width: f64) -> Self {
        Self { color, width }
    }
}

/// Text parameters. Text is anchored at its bottom-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub color: Rgba,
    pub size_px: f64,
    pub monospace: bool,
}

impl TextStyle {
    pub fn new(color: Rgba, size_px: f64) -> Self {
        Self {
            color,
            size_px,
            monospace: false,
        }
    }

    pub fn monospace(mut self) -> Self {
        self.monospace = true;
        self
    }
}

/// Target of all renderer drawing.
pub trait DrawSurface {
    /// Width in pixels
    fn width(&self) -> f64;

    /// Height in pixels
    fn height(&self) -> f64;

    /// Paint the whole surface with an opaque color.
    fn fill_background(&mut self, color: Rgb);

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba);

    /// Fill a disc with a radial gradient running from `center` to `radius`.
    fn fill_radial_gradient(&mut self, center: ScreenPoint, radius: f64, stops: &[GradientStop]);

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba);

    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, style: &LineStyle);

    /// Stroke a connected polyline; fewer than two points draws nothing.
    fn stroke_polyline(&mut self, points: &[ScreenPoint], style: &LineStyle) {
        for pair in points.windows(2) {
            self.stroke_line(pair[0], pair[1], style);
        }
    }

    fn fill_text(&mut self, text: &str, anchor: ScreenPoint, style: &TextStyle);

    fn set_composite(&mut self, mode: CompositeMode);
}

/// A single recorded drawing call.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Background(Rgb),
    Rect {
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        color: Rgba,
    },
    RadialGradient {
        center: ScreenPoint,
        radius: f64,
        stops: Vec<GradientStop>,
        composite: CompositeMode,
    },
    Circle {
        center: ScreenPoint,
        radius: f64,
        color: Rgba,
    },
    Line {
        from: ScreenPoint,
        to: ScreenPoint,
        style: LineStyle,
    },
    Polyline {
        points: Vec<ScreenPoint>,
        style: LineStyle,
    },
    Text {
        text: String,
        anchor: ScreenPoint,
        style: TextStyle,
    },
    Composite(CompositeMode),
}

/// Surface that records drawing calls instead of rasterizing them.
#[derive(Debug, Clone)]
pub struct RecordingSurface {
    width: f64,
    height: f64,
    composite: CompositeMode,
    commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: f64, height: f64) -> Self {
        Self {
            width,
            height,
            composite: CompositeMode::SourceOver,
            commands: Vec::new(),
        }
    }

    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    /// Drop recorded commands, keeping the surface size.
    pub fn clear(&mut self) {
        self.commands.clear();
        self.composite = CompositeMode::SourceOver;
    }

    pub fn composite(&self) -> CompositeMode {
        self.composite
    }

    /// Number of straight line segments drawn with `stroke_line`.
    pub fn line_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, DrawCommand::Line { .. }))
            .count()
    }

    /// Number of radial gradients painted with additive compositing.
    pub fn additive_gradient_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| {
                matches!(
                    c,
                    DrawCommand::RadialGradient {
                        composite: CompositeMode::Lighter,
                        ..
                    }
                )
            })
            .count()
    }

    /// All text strings drawn, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl DrawSurface for RecordingSurface {
    fn width(&self) -> f64 {
        self.width
    }

    fn height(&self) -> f64 {
        self.height
    }

    fn fill_background(&mut self, color: Rgb) {
        self.commands.push(DrawCommand::Background(color));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba) {
        self.commands.push(DrawCommand::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn fill_radial_gradient(&mut self, center: ScreenPoint, radius: f64, stops: &[GradientStop]) {
        self.commands.push(DrawCommand::RadialGradient {
            center,
            radius,
            stops: stops.to_vec(),
            composite: self.composite,
        });
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba) {
        self.commands.push(DrawCommand::Circle {
            center,
            radius,
            color,
        });
    }

    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, style: &LineStyle) {
        self.commands.push(DrawCommand::Line {
            from,
            to,
            style: *style,
        });
    }

    fn stroke_polyline(&mut self, points: &[ScreenPoint], style: &LineStyle) {
        if points.len() < 2 {
            return;
        }
        self.commands.push(DrawCommand::Polyline {
            points: points.to_vec(),
            style: *style,
        });
    }

    fn fill_text(&mut self, text: &str, anchor: ScreenPoint, style: &TextStyle) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            anchor,
            style: *style,
        });
    }

    fn set_composite(&mut self, mode: CompositeMode) {
        self.composite = mode;
        self.commands.push(DrawCommand::Composite(mode));
    }
}
