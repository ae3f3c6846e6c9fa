//! Spherical coordinate transforms for the sky view.
//!
//! This module holds the pure math of the renderer: equatorial to horizontal
//! conversion for an observer snapshot, equatorial to screen projection under
//! the two supported projection models, and the magnitude helpers used to
//! size and tint stars.
//!
//! # Projection Models
//!
//! ## Orthographic ("outside looking in")
//! The sphere is viewed from infinitely far away. Points on the far
//! hemisphere (`cos c < 0`, where `c` is the angular distance from the view
//! center) are culled. Screen X is not mirrored.
//!
//! ## Stereographic ("inside looking up")
//! The planetarium view. Scale factor `k = 2 / (1 + cos c)`. Visibility is
//! widened to half the field of view plus a fixed 30° margin so stars do not
//! pop at the edges. Screen X is mirrored because the observer sits inside
//! the sphere.
//!
//! Both models keep the same scale on both axes so the sphere stays round,
//! and both cull points farther than 100 px outside the surface.
//!
//! # Examples
//!
//! ```rust
//! use skyview::coords::{celestial_to_screen, Equatorial, ProjectionMode};
//!
//! let center = Equatorial::new(0.0, 0.0);
//! let p = celestial_to_screen(0.0, 0.0, center, 1.0, 800.0, 600.0, ProjectionMode::Orthographic, None)
//!     .unwrap();
//! assert!((p.x - 400.0).abs() < 1e-9 && (p.y - 300.0).abs() < 1e-9);
//!
//! // The antipode of the view center is behind the sphere
//! assert!(celestial_to_screen(180.0, 0.0, center, 1.0, 800.0, 600.0, ProjectionMode::Orthographic, None).is_none());
//! ```

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::color::Rgb;

/// Points may sit this far outside the surface before they are culled, so
/// glows centered just off-screen still reach into the visible area.
pub const OFFSCREEN_MARGIN_PX: f64 = 100.0;

/// Extra angular margin added to the stereographic visibility cone.
pub const STEREOGRAPHIC_MARGIN_DEG: f64 = 30.0;

/// Field of view at zoom 1.0, in degrees.
pub const BASE_FIELD_OF_VIEW_DEG: f64 = 90.0;

const J2000_JD: f64 = 2451545.0;
const DAYS_PER_JULIAN_CENTURY: f64 = 36525.0;

/// A point on the celestial sphere in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Equatorial {
    /// Right ascension in degrees
    pub ra: f64,
    /// Declination in degrees
    pub dec: f64,
}

impl Equatorial {
    pub fn new(ra: f64, dec: f64) -> Self {
        Self { ra, dec }
    }
}

/// Projection model used to map the sphere onto the surface.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum ProjectionMode {
    /// Sphere seen from outside; far hemisphere hidden
    #[default]
    Orthographic,
    /// Planetarium view from inside the sphere
    Stereographic,
}

impl std::fmt::Display for ProjectionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProjectionMode::Orthographic => write!(f, "orthographic"),
            ProjectionMode::Stereographic => write!(f, "stereographic"),
        }
    }
}

/// Observer position and instant, treated as an immutable snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObserverLocation {
    /// Geographic latitude in degrees, north positive
    pub latitude: f64,
    /// Geographic longitude in degrees, east positive
    pub longitude: f64,
    /// Observation instant
    pub instant: DateTime<Utc>,
}

impl ObserverLocation {
    pub fn new(latitude: f64, longitude: f64, instant: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            instant,
        }
    }

    /// Tokyo at local midnight on 2025-01-01 (2024-12-31 15:00 UTC).
    pub fn tokyo_new_year() -> Self {
        let instant = Utc
            .with_ymd_and_hms(2024, 12, 31, 15, 0, 0)
            .single()
            .unwrap_or_default();
        Self::new(35.7, 139.7, instant)
    }
}

impl Default for ObserverLocation {
    fn default() -> Self {
        Self::tokyo_new_year()
    }
}

/// Position relative to an observer's horizon.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HorizontalCoordinates {
    /// Degrees from north through east (N=0, E=90, S=180, W=270)
    pub azimuth: f64,
    /// Degrees above the horizon (zenith = 90)
    pub altitude: f64,
}

/// A position on the drawing surface in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }
}

/// Julian date of an instant, to whole-second precision.
pub fn julian_date(instant: &DateTime<Utc>) -> f64 {
    let mut year = instant.year() as f64;
    let mut month = instant.month() as f64;
    if month <= 2.0 {
        year -= 1.0;
        month += 12.0;
    }

    let a = (year / 100.0).floor();
    let b = 2.0 - a + (a / 4.0).floor();
    let day_fraction = (instant.hour() as f64
        + instant.minute() as f64 / 60.0
        + instant.second() as f64 / 3600.0)
        / 24.0;

    (365.25 * (year + 4716.0)).floor() + (30.6001 * (month + 1.0)).floor() + instant.day() as f64
        + b
        - 1524.5
        + day_fraction
}

/// Greenwich mean sidereal time in degrees, [0, 360).
pub fn greenwich_sidereal_time(instant: &DateTime<Utc>) -> f64 {
    let jd = julian_date(instant);
    let t = (jd - J2000_JD) / DAYS_PER_JULIAN_CENTURY;
    let gst = 280.46061837
        + 360.98564736629 * (jd - J2000_JD)
        + t * t * (0.000387933 - t / 38710000.0);
    gst.rem_euclid(360.0)
}

/// Local sidereal time in degrees for an east-positive longitude, [0, 360).
pub fn local_sidereal_time(instant: &DateTime<Utc>, longitude: f64) -> f64 {
    (greenwich_sidereal_time(instant) + longitude).rem_euclid(360.0)
}

/// Convert equatorial coordinates to azimuth/altitude for an observer.
///
/// # Arguments
/// * `ra` - Right ascension in degrees
/// * `dec` - Declination in degrees
/// * `observer` - Observer snapshot; must carry a valid calendar instant
pub fn equatorial_to_horizontal(
    ra: f64,
    dec: f64,
    observer: &ObserverLocation,
) -> HorizontalCoordinates {
    let lat = observer.latitude.to_radians();
    let lst = local_sidereal_time(&observer.instant, observer.longitude);

    let hour_angle = (lst - ra).rem_euclid(360.0).to_radians();
    let dec_rad = dec.to_radians();

    let sin_alt = (lat.sin() * dec_rad.sin() + lat.cos() * dec_rad.cos() * hour_angle.cos())
        .clamp(-1.0, 1.0);
    let alt_rad = sin_alt.asin();

    let cos_az = (dec_rad.sin() - lat.sin() * sin_alt) / (lat.cos() * alt_rad.cos());
    let mut azimuth = cos_az.clamp(-1.0, 1.0).acos().to_degrees();

    // Objects west of the meridian
    if hour_angle.sin() > 0.0 {
        azimuth = 360.0 - azimuth;
    }

    HorizontalCoordinates {
        azimuth,
        altitude: alt_rad.to_degrees(),
    }
}

/// Angular width of the view for a zoom factor, in degrees.
pub fn field_of_view(zoom: f64) -> f64 {
    BASE_FIELD_OF_VIEW_DEG / zoom
}

/// Frame-scoped projection with the view-center trigonometry precomputed.
///
/// Build one per frame and reuse it for every star; the view state may
/// change between frames so projectors are never kept longer.
#[derive(Debug, Clone)]
pub struct Projector {
    mode: ProjectionMode,
    width: f64,
    height: f64,
    scale: f64,
    center_ra_rad: f64,
    sin_center_dec: f64,
    cos_center_dec: f64,
    min_cos_c: f64,
    observer: Option<ObserverLocation>,
}

impl Projector {
    /// Create a projector for one frame.
    ///
    /// `zoom` must be positive; callers clamp it upstream.
    pub fn new(
        view_center: Equatorial,
        zoom: f64,
        width: f64,
        height: f64,
        mode: ProjectionMode,
        observer: Option<ObserverLocation>,
    ) -> Self {
        debug_assert!(zoom > 0.0, "zoom must be positive, got {zoom}");

        let fov = field_of_view(zoom);
        let scale = width.min(height) / 2.0 / (fov / 2.0).to_radians().tan();
        let center_dec_rad = view_center.dec.to_radians();

        let min_cos_c = match mode {
            ProjectionMode::Orthographic => 0.0,
            ProjectionMode::Stereographic => (fov / 2.0 + STEREOGRAPHIC_MARGIN_DEG)
                .to_radians()
                .cos(),
        };

        Self {
            mode,
            width,
            height,
            scale,
            center_ra_rad: view_center.ra.to_radians(),
            sin_center_dec: center_dec_rad.sin(),
            cos_center_dec: center_dec_rad.cos(),
            min_cos_c,
            observer,
        }
    }

    pub fn mode(&self) -> ProjectionMode {
        self.mode
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn observer(&self) -> Option<&ObserverLocation> {
        self.observer.as_ref()
    }

    /// Horizontal coordinates of a point for the projector's observer, if any.
    pub fn horizontal(&self, ra: f64, dec: f64) -> Option<HorizontalCoordinates> {
        self.observer
            .as_ref()
            .map(|observer| equatorial_to_horizontal(ra, dec, observer))
    }

    /// Project a celestial position onto the surface.
    ///
    /// Returns `None` for points hidden by the projection's visibility rule
    /// or lying beyond the off-screen margin.
    pub fn project(&self, ra: f64, dec: f64) -> Option<ScreenPoint> {
        let dec_rad = dec.to_radians();
        let delta_ra = ra.to_radians() - self.center_ra_rad;
        let (sin_dec, cos_dec) = dec_rad.sin_cos();
        let cos_delta_ra = delta_ra.cos();

        let cos_c = self.sin_center_dec * sin_dec + self.cos_center_dec * cos_dec * cos_delta_ra;
        if cos_c < self.min_cos_c {
            return None;
        }

        let x = cos_dec * delta_ra.sin();
        let y = self.cos_center_dec * sin_dec - self.sin_center_dec * cos_dec * cos_delta_ra;

        let (screen_x, screen_y) = match self.mode {
            ProjectionMode::Orthographic => (
                self.width / 2.0 + x * self.scale,
                self.height / 2.0 - y * self.scale,
            ),
            ProjectionMode::Stereographic => {
                let k = 2.0 / (1.0 + cos_c);
                (
                    self.width / 2.0 - k * x * self.scale,
                    self.height / 2.0 - k * y * self.scale,
                )
            }
        };

        let on_surface = screen_x >= -OFFSCREEN_MARGIN_PX
            && screen_x <= self.width + OFFSCREEN_MARGIN_PX
            && screen_y >= -OFFSCREEN_MARGIN_PX
            && screen_y <= self.height + OFFSCREEN_MARGIN_PX;

        on_surface.then(|| ScreenPoint::new(screen_x, screen_y))
    }
}

/// Project a celestial position onto a surface of the given size.
///
/// Convenience wrapper over [`Projector`] for one-off projections.
#[allow(clippy::too_many_arguments)]
pub fn celestial_to_screen(
    ra: f64,
    dec: f64,
    view_center: Equatorial,
    zoom: f64,
    width: f64,
    height: f64,
    mode: ProjectionMode,
    observer: Option<ObserverLocation>,
) -> Option<ScreenPoint> {
    Projector::new(view_center, zoom, width, height, mode, observer).project(ra, dec)
}

/// Base radius in pixels of a star of the given magnitude.
///
/// `clamp(10 - 1.5 * vmag, 1, 15)`: brighter stars are larger.
pub fn magnitude_to_radius(vmag: f64) -> f64 {
    (10.0 - vmag * 1.5).clamp(1.0, 15.0)
}

/// Scale a color's intensity by brightness: bright stars are boosted and
/// faint ones dimmed, never below half intensity.
pub fn adjust_color_by_magnitude(color: Rgb, vmag: f64) -> Rgb {
    let brightness = (1.5 - vmag * 0.1).max(0.5);
    let scale = |channel: u8| (channel as f64 * brightness).floor().min(255.0) as u8;
    Rgb::new(scale(color.r), scale(color.g), scale(color.b))
}
