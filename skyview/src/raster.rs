//! Raster drawing surface backed by a `tiny-skia` pixmap.
//!
//! Shapes go straight to `tiny-skia`. Text is rendered by building a small SVG
//! document and rasterizing it with `resvg`, which gives proper font shaping
//! for the Greek Bayer letters. The font database and parse options are built
//! once per surface and shared by every label.

use std::path::Path;
use std::sync::Arc;

use tiny_skia::{
    BlendMode, Color, FillRule, Paint, PathBuilder, Pixmap, Point, RadialGradient, Rect,
    SpreadMode, Stroke, Transform,
};
use usvg::{fontdb, Options, Tree};

use crate::color::{Rgb, Rgba};
use crate::coords::ScreenPoint;
use crate::surface::{CompositeMode, DrawSurface, GradientStop, LineStyle, TextStyle};
use crate::{Result, SkyViewError};

const SANS_FAMILY: &str = "DejaVu Sans";
const MONO_FAMILY: &str = "DejaVu Sans Mono";

fn to_color(color: Rgba) -> Color {
    Color::from_rgba8(color.r, color.g, color.b, (color.a * 255.0).round() as u8)
}

fn blend_mode(mode: CompositeMode) -> BlendMode {
    match mode {
        CompositeMode::SourceOver => BlendMode::SourceOver,
        CompositeMode::Lighter => BlendMode::Plus,
    }
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// A [`DrawSurface`] that rasterizes into an RGBA pixmap.
pub struct PixmapSurface {
    pixmap: Pixmap,
    composite: CompositeMode,
    text_options: Options<'static>,
}

impl PixmapSurface {
    /// Allocate a transparent pixmap and load the system fonts for labels.
    pub fn new(width: u32, height: u32) -> Result<Self> {
        let pixmap = Pixmap::new(width, height).ok_or_else(|| {
            SkyViewError::Surface(format!("cannot allocate a {width}x{height} pixmap"))
        })?;

        let mut fontdb = fontdb::Database::new();
        fontdb.load_system_fonts();
        log::debug!("Loaded {} font faces for label rendering", fontdb.len());

        let text_options = Options {
            fontdb: Arc::new(fontdb),
            font_family: SANS_FAMILY.to_string(),
            ..Default::default()
        };

        Ok(Self {
            pixmap,
            composite: CompositeMode::SourceOver,
            text_options,
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    /// Color of a pixel, ignoring alpha. `None` outside the pixmap.
    pub fn pixel_rgb(&self, x: u32, y: u32) -> Option<Rgb> {
        let pixel = self.pixmap.pixel(x, y)?.demultiply();
        Some(Rgb::new(pixel.red(), pixel.green(), pixel.blue()))
    }

    /// Encode the current frame as PNG bytes.
    pub fn encode_png(&self) -> Result<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| SkyViewError::Surface(format!("PNG encoding failed: {e}")))
    }

    /// Write the current frame to a PNG file.
    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    fn paint(&self) -> Paint<'static> {
        let mut paint = Paint::default();
        paint.anti_alias = true;
        paint.blend_mode = blend_mode(self.composite);
        paint
    }

    fn solid_paint(&self, color: Rgba) -> Paint<'static> {
        let mut paint = self.paint();
        paint.set_color(to_color(color));
        paint
    }

    /// Rasterize one text run through an SVG document.
    pub fn render_text(&mut self, text: &str, anchor: ScreenPoint, style: &TextStyle) -> Result<()> {
        let family = if style.monospace { MONO_FAMILY } else { SANS_FAMILY };
        let svg = format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}"><text x="{x}" y="{y}" font-family="{family}" font-size="{size}" fill="{fill}" fill-opacity="{alpha}">{text}</text></svg>"#,
            w = self.pixmap.width(),
            h = self.pixmap.height(),
            x = anchor.x,
            y = anchor.y,
            size = style.size_px,
            fill = style.color.rgb(),
            alpha = style.color.a,
            text = escape_xml(text),
        );

        let tree =
            Tree::from_str(&svg, &self.text_options).map_err(|e| SkyViewError::Label(e.to_string()))?;
        resvg::render(&tree, Transform::identity(), &mut self.pixmap.as_mut());
        Ok(())
    }
}

impl DrawSurface for PixmapSurface {
    fn width(&self) -> f64 {
        self.pixmap.width() as f64
    }

    fn height(&self) -> f64 {
        self.pixmap.height() as f64
    }

    fn fill_background(&mut self, color: Rgb) {
        self.pixmap.fill(Color::from_rgba8(color.r, color.g, color.b, 255));
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64, color: Rgba) {
        let Some(rect) = Rect::from_xywh(x as f32, y as f32, width as f32, height as f32) else {
            return;
        };
        let paint = self.solid_paint(color);
        self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn fill_radial_gradient(&mut self, center: ScreenPoint, radius: f64, stops: &[GradientStop]) {
        let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32) else {
            return;
        };
        let point = Point::from_xy(center.x as f32, center.y as f32);
        let stops = stops
            .iter()
            .map(|stop| tiny_skia::GradientStop::new(stop.offset as f32, to_color(stop.color)))
            .collect();
        let Some(shader) = RadialGradient::new(
            point,
            point,
            radius as f32,
            stops,
            SpreadMode::Pad,
            Transform::identity(),
        ) else {
            return;
        };

        let mut paint = self.paint();
        paint.shader = shader;
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    fn fill_circle(&mut self, center: ScreenPoint, radius: f64, color: Rgba) {
        let Some(path) = PathBuilder::from_circle(center.x as f32, center.y as f32, radius as f32) else {
            return;
        };
        let paint = self.solid_paint(color);
        self.pixmap
            .fill_path(&path, &paint, FillRule::Winding, Transform::identity(), None);
    }

    fn stroke_line(&mut self, from: ScreenPoint, to: ScreenPoint, style: &LineStyle) {
        self.stroke_polyline(&[from, to], style);
    }

    fn stroke_polyline(&mut self, points: &[ScreenPoint], style: &LineStyle) {
        let Some((first, rest)) = points.split_first() else {
            return;
        };
        if rest.is_empty() {
            return;
        }

        let mut builder = PathBuilder::new();
        builder.move_to(first.x as f32, first.y as f32);
        for point in rest {
            builder.line_to(point.x as f32, point.y as f32);
        }
        let Some(path) = builder.finish() else {
            return;
        };

        let paint = self.solid_paint(style.color);
        let stroke = Stroke {
            width: style.width as f32,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }

    fn fill_text(&mut self, text: &str, anchor: ScreenPoint, style: &TextStyle) {
        if let Err(e) = self.render_text(text, anchor, style) {
            log::warn!("Dropping label {text:?}: {e}");
        }
    }

    fn set_composite(&mut self, mode: CompositeMode) {
        self.composite = mode;
    }
}
