//! Celestial sphere projection and star-field rendering.
//!
//! `skyview` projects a star catalog onto a 2-D drawing surface under two
//! projection models and renders it frame by frame:
//!
//! - **Orthographic**: the sphere seen from outside, far hemisphere culled
//! - **Stereographic**: the planetarium view from inside, X mirrored
//!
//! Each frame runs the same pipeline: celestial grid, Milky Way density glow,
//! level-of-detail reduction of the background stars, per-star encoding
//! (radius, color, twinkle, label), constellation lines and a HUD overlay.
//! Interaction (pan, wheel zoom, pinch zoom, click picking) and scripted
//! camera tours are handled by [`viewport::ViewportController`] and driven
//! by [`render_loop::RenderLoop`].
//!
//! # Example
//!
//! ```rust
//! use skyview::catalog::{Star, StarCatalog};
//! use skyview::config::RenderConfig;
//! use skyview::render_loop::{FrameStatus, RenderLoop};
//! use skyview::surface::RecordingSurface;
//!
//! let catalog = StarCatalog::new(vec![
//!     Star::new(1, 180.0, 0.0, Some(1.0), Some(0.2)),
//!     Star::new(2, 182.0, 3.0, Some(4.5), Some(1.1)),
//! ]);
//!
//! let mut render_loop = RenderLoop::new(RenderConfig::default(), catalog, Vec::new());
//! let mut surface = RecordingSurface::new(800.0, 600.0);
//! let status = render_loop.tick(0.0, Some(&mut surface));
//! assert_eq!(status, FrameStatus::Continue);
//! ```

use thiserror::Error;

pub mod catalog;
pub mod color;
pub mod config;
pub mod constellation;
pub mod coords;
pub mod encoder;
pub mod focus;
pub mod grid;
pub mod lod;
pub mod milky_way;
pub mod raster;
pub mod render_loop;
pub mod renderer;
pub mod surface;
pub mod viewport;

pub use catalog::{ConstellationLine, Star, StarCatalog};
pub use coords::{celestial_to_screen, Equatorial, ObserverLocation, ProjectionMode, ScreenPoint};
pub use render_loop::RenderLoop;
pub use renderer::StarFieldRenderer;
pub use viewport::{SkyEvent, SkyListener, ViewState, ViewportController};

/// Errors raised by the ambient parts of the crate.
///
/// The per-frame pipeline itself never fails: missing data and off-screen
/// points are skipped locally. These variants cover configuration files and
/// raster output.
#[derive(Debug, Error)]
pub enum SkyViewError {
    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration or catalog document could not be (de)serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The raster surface could not be created or encoded.
    #[error("Surface error: {0}")]
    Surface(String),

    /// A label overlay could not be parsed for rendering.
    #[error("Label rendering error: {0}")]
    Label(String),
}

/// Standard Result type for fallible skyview operations.
pub type Result<T> = std::result::Result<T, SkyViewError>;
