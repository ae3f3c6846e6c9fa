//! Per-star visual encoding: size, color, twinkle and label.
//!
//! [`encode_star`] turns a catalog star into a [`StarAppearance`] for the
//! current frame, and [`draw_star`] paints it. Twinkle is a pure function of
//! the star id and frame time, so encoding carries no per-star mutable state
//! and is reproducible frame to frame.
//!
//! Labels are resolved through a [`LabelCache`] owned by the caller. The
//! cache is keyed only by star id; whoever changes [`LabelPreferences`] must
//! clear it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::catalog::Star;
use crate::color::{star_color, Rgb, Rgba};
use crate::coords::{magnitude_to_radius, Projector, ScreenPoint};
use crate::surface::{DrawSurface, GradientStop, TextStyle};

/// Only stars at least this bright get a label.
pub const LABEL_MAX_MAG: f64 = 3.0;

/// Stars at least this bright twinkle harder.
pub const BRIGHT_TWINKLE_MAG: f64 = 2.0;

/// Stars at least this bright get an opaque white core.
pub const CORE_MAX_MAG: f64 = 1.0;

const TWINKLE_MIN: f64 = 0.6;
const TWINKLE_MAX: f64 = 1.6;
const LABEL_FONT_PX: f64 = 14.0;

const GREEK_LETTERS: [(&str, &str); 24] = [
    ("Alp", "α"),
    ("Bet", "β"),
    ("Gam", "γ"),
    ("Del", "δ"),
    ("Eps", "ε"),
    ("Zet", "ζ"),
    ("Eta", "η"),
    ("The", "θ"),
    ("Iot", "ι"),
    ("Kap", "κ"),
    ("Lam", "λ"),
    ("Mu", "μ"),
    ("Nu", "ν"),
    ("Xi", "ξ"),
    ("Omi", "ο"),
    ("Pi", "π"),
    ("Rho", "ρ"),
    ("Sig", "σ"),
    ("Tau", "τ"),
    ("Ups", "υ"),
    ("Phi", "φ"),
    ("Chi", "χ"),
    ("Psi", "ψ"),
    ("Ome", "ω"),
];

/// Which kinds of star labels to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelPreferences {
    pub show_proper_names: bool,
    pub show_bayer_designations: bool,
}

impl Default for LabelPreferences {
    fn default() -> Self {
        Self {
            show_proper_names: true,
            show_bayer_designations: true,
        }
    }
}

/// Greek letter of the Bayer designation embedded in a catalog name.
///
/// Three-letter abbreviations match anywhere ("11Bet Cas" -> β); the
/// two-letter ones (Mu, Nu, Xi, Pi) must be followed by a space or end the
/// name so that e.g. "Pic" does not read as π. The first match in alphabet
/// order wins.
pub fn bayer_letter(name: &str) -> Option<&'static str> {
    GREEK_LETTERS
        .iter()
        .find(|(abbr, _)| {
            if abbr.len() == 3 {
                name.contains(abbr)
            } else {
                name.match_indices(abbr).any(|(at, _)| {
                    matches!(name[at + abbr.len()..].chars().next(), None | Some(' '))
                })
            }
        })
        .map(|&(_, greek)| greek)
}

/// Resolve the label of a star without caching.
pub fn resolve_label(star: &Star, preferences: &LabelPreferences) -> Option<String> {
    match star.vmag {
        Some(vmag) if vmag <= LABEL_MAX_MAG => {}
        _ => return None,
    }

    if preferences.show_proper_names {
        if let Some(proper_name) = &star.proper_name {
            return Some(proper_name.clone());
        }
    }

    if preferences.show_bayer_designations {
        return star
            .name
            .as_deref()
            .and_then(bayer_letter)
            .map(str::to_string);
    }

    None
}

/// Memoized star labels, keyed by star id.
///
/// Entries stay valid only while the label preferences they were resolved
/// with are unchanged; call [`LabelCache::clear`] when they change.
#[derive(Debug, Clone, Default)]
pub struct LabelCache {
    labels: HashMap<u32, Option<String>>,
}

impl LabelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Label of `star`, resolving and storing it on first use.
    pub fn label_for(&mut self, star: &Star, preferences: &LabelPreferences) -> Option<&str> {
        self.labels
            .entry(star.id)
            .or_insert_with(|| resolve_label(star, preferences))
            .as_deref()
    }

    pub fn clear(&mut self) {
        self.labels.clear();
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Twinkle factor applied to a star's radius at `time_ms`.
///
/// A primary sine keyed by star id and time plus a faster secondary term,
/// clamped to [0.6, 1.6]. Bright stars (vmag <= 2) get a larger amplitude.
pub fn twinkle(star_id: u32, time_ms: f64, vmag: f64) -> f64 {
    let id = star_id as f64;
    let phase = id * 0.1 + time_ms * 0.001;
    let primary = phase.sin();
    let secondary = (phase * 2.7 + id * 1.618).sin();
    let amplitude = if vmag <= BRIGHT_TWINKLE_MAG { 0.45 } else { 0.2 };

    (1.0 + amplitude * (primary + 0.3 * secondary)).clamp(TWINKLE_MIN, TWINKLE_MAX)
}

/// Everything needed to paint one star in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct StarAppearance {
    pub position: ScreenPoint,
    /// Radius before twinkle
    pub radius: f64,
    /// Radius after twinkle; the glow disc spans twice this
    pub animated_radius: f64,
    pub color: Rgb,
    /// Opacity of the white core, if the star is bright enough to have one
    pub core_alpha: Option<f64>,
}

/// Encode a star for the current frame.
///
/// Returns `None` when the star is off-screen or has no magnitude.
pub fn encode_star(projector: &Projector, star: &Star, time_ms: f64) -> Option<StarAppearance> {
    let position = projector.project(star.ra, star.dec)?;
    let vmag = star.vmag?;

    let radius = magnitude_to_radius(vmag);
    let twinkle = twinkle(star.id, time_ms, vmag);
    let core_alpha = (vmag <= CORE_MAX_MAG).then(|| (0.8 * twinkle).clamp(0.0, 1.0));

    Some(StarAppearance {
        position,
        radius,
        animated_radius: radius * twinkle,
        color: star_color(star.bv, vmag),
        core_alpha,
    })
}

/// Gradient stops of a star glow of the given color.
pub fn glow_stops(color: Rgb) -> [GradientStop; 4] {
    [
        GradientStop::new(0.0, color.with_alpha(1.0)),
        GradientStop::new(0.3, color.with_alpha(0.8)),
        GradientStop::new(0.6, color.with_alpha(0.4)),
        GradientStop::new(1.0, color.with_alpha(0.0)),
    ]
}

/// Draw a star, its core and its label. Returns whether it was drawn.
pub fn draw_star<S: DrawSurface + ?Sized>(
    surface: &mut S,
    projector: &Projector,
    star: &Star,
    time_ms: f64,
    preferences: &LabelPreferences,
    labels: &mut LabelCache,
) -> bool {
    let Some(appearance) = encode_star(projector, star, time_ms) else {
        return false;
    };

    let center = appearance.position;
    surface.fill_radial_gradient(
        center,
        appearance.animated_radius * 2.0,
        &glow_stops(appearance.color),
    );

    if let Some(core_alpha) = appearance.core_alpha {
        surface.fill_circle(center, appearance.radius * 0.3, Rgb::WHITE.with_alpha(core_alpha));
    }

    if let Some(label) = labels.label_for(star, preferences) {
        let anchor = ScreenPoint::new(
            center.x + appearance.radius + 5.0,
            center.y - appearance.radius - 2.0,
        );
        let style = TextStyle::new(Rgba::new(255, 255, 255, 0.8), LABEL_FONT_PX);
        surface.fill_text(label, anchor, &style);
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coords::{Equatorial, ProjectionMode};
    use crate::surface::{DrawCommand, RecordingSurface};
    use rstest::rstest;

    fn projector() -> Projector {
        Projector::new(
            Equatorial::new(0.0, 0.0),
            1.0,
            800.0,
            600.0,
            ProjectionMode::Orthographic,
            None,
        )
    }

    fn betelgeuse() -> Star {
        Star::new(27989, 0.0, 0.0, Some(0.45), Some(1.85))
            .with_name("58Alp Ori")
            .with_proper_name("Betelgeuse")
    }

    #[rstest]
    #[case("9Alp CMa", Some("α"))]
    #[case("11Bet Cas", Some("β"))]
    #[case("Mu  Cep", Some("μ"))]
    #[case("Pi 3Ori", Some("π"))]
    #[case("61 Cyg", None)]
    #[case("Pic", None)]
    #[case("Zet1Sco", Some("ζ"))]
    fn test_bayer_letter(#[case] name: &str, #[case] expected: Option<&str>) {
        assert_eq!(bayer_letter(name), expected);
    }

    #[test]
    fn test_label_prefers_proper_name() {
        let prefs = LabelPreferences::default();
        assert_eq!(resolve_label(&betelgeuse(), &prefs).as_deref(), Some("Betelgeuse"));
    }

    #[test]
    fn test_label_falls_back_to_bayer() {
        let prefs = LabelPreferences {
            show_proper_names: false,
            show_bayer_designations: true,
        };
        assert_eq!(resolve_label(&betelgeuse(), &prefs).as_deref(), Some("α"));

        let none = LabelPreferences {
            show_proper_names: false,
            show_bayer_designations: false,
        };
        assert_eq!(resolve_label(&betelgeuse(), &none), None);
    }

    #[test]
    fn test_faint_stars_are_never_labelled() {
        let mut star = betelgeuse();
        star.vmag = Some(3.01);
        assert_eq!(resolve_label(&star, &LabelPreferences::default()), None);
        star.vmag = None;
        assert_eq!(resolve_label(&star, &LabelPreferences::default()), None);
    }

    #[test]
    fn test_label_cache_memoizes_until_cleared() {
        let mut cache = LabelCache::new();
        let star = betelgeuse();
        let names = LabelPreferences::default();
        let greek = LabelPreferences {
            show_proper_names: false,
            show_bayer_designations: true,
        };

        assert_eq!(cache.label_for(&star, &names), Some("Betelgeuse"));
        // Stale until the caller clears it
        assert_eq!(cache.label_for(&star, &greek), Some("Betelgeuse"));
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(cache.label_for(&star, &greek), Some("α"));
    }

    #[test]
    fn test_twinkle_is_pure_and_bounded() {
        for id in [0u32, 1, 7, 12345, u32::MAX] {
            let mut t = 0.0;
            while t < 20_000.0 {
                let a = twinkle(id, t, 1.0);
                assert_eq!(a, twinkle(id, t, 1.0));
                assert!((TWINKLE_MIN..=TWINKLE_MAX).contains(&a));
                assert!((TWINKLE_MIN..=TWINKLE_MAX).contains(&twinkle(id, t, 5.0)));
                t += 37.0;
            }
        }
    }

    #[test]
    fn test_bright_stars_twinkle_harder() {
        let spread = |vmag: f64| {
            let samples: Vec<f64> = (0..2000).map(|i| twinkle(42, i as f64 * 10.0, vmag)).collect();
            let max = samples.iter().cloned().fold(f64::MIN, f64::max);
            let min = samples.iter().cloned().fold(f64::MAX, f64::min);
            max - min
        };
        assert!(spread(1.0) > spread(4.0));
    }

    #[test]
    fn test_encode_skips_null_magnitude_and_offscreen() {
        let mut star = betelgeuse();
        star.vmag = None;
        assert!(encode_star(&projector(), &star, 0.0).is_none());

        let behind = Star::new(5, 180.0, 0.0, Some(1.0), None);
        assert!(encode_star(&projector(), &behind, 0.0).is_none());
    }

    #[test]
    fn test_core_only_for_brightest() {
        let bright = encode_star(&projector(), &betelgeuse(), 0.0).unwrap();
        assert!(bright.core_alpha.is_some());

        let dim = Star::new(9, 1.0, 1.0, Some(1.5), None);
        assert!(encode_star(&projector(), &dim, 0.0).unwrap().core_alpha.is_none());
    }

    #[test]
    fn test_draw_star_paints_glow_core_and_label() {
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let mut cache = LabelCache::new();
        let drawn = draw_star(
            &mut surface,
            &projector(),
            &betelgeuse(),
            1000.0,
            &LabelPreferences::default(),
            &mut cache,
        );

        assert!(drawn);
        let commands = surface.commands();
        assert!(matches!(commands[0], DrawCommand::RadialGradient { .. }));
        assert!(matches!(commands[1], DrawCommand::Circle { .. }));
        assert_eq!(surface.texts(), vec!["Betelgeuse"]);
    }

    #[test]
    fn test_glow_radius_is_twice_animated_radius() {
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let star = Star::new(3, 5.0, 2.0, Some(5.0), Some(0.2));
        let appearance = encode_star(&projector(), &star, 2000.0).unwrap();

        draw_star(
            &mut surface,
            &projector(),
            &star,
            2000.0,
            &LabelPreferences::default(),
            &mut LabelCache::new(),
        );

        match &surface.commands()[0] {
            DrawCommand::RadialGradient { radius, stops, .. } => {
                assert_eq!(*radius, appearance.animated_radius * 2.0);
                assert_eq!(stops.last().map(|s| s.color.a), Some(0.0));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(surface.texts().is_empty());
    }
}
