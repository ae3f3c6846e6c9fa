//! Constellation stick figures.

use crate::catalog::{ConstellationLine, StarCatalog};
use crate::color::Rgba;
use crate::coords::Projector;
use crate::surface::{DrawSurface, LineStyle};

/// Gold at 60 % opacity, 1 px.
pub fn default_line_style() -> LineStyle {
    LineStyle::new(Rgba::new(255, 215, 0, 0.6), 1.0)
}

/// Draw every constellation segment whose endpoints are both known and
/// visible. Returns the number of segments drawn.
///
/// Segments referencing an id missing from the catalog, or with either end
/// culled by the projection, are skipped silently.
pub fn draw_constellation_lines<S: DrawSurface + ?Sized>(
    surface: &mut S,
    constellations: &[ConstellationLine],
    catalog: &StarCatalog,
    projector: &Projector,
    style: &LineStyle,
) -> usize {
    let mut drawn = 0;
    for constellation in constellations {
        for &(a, b) in &constellation.lines {
            let (Some(star_a), Some(star_b)) = (catalog.get(a), catalog.get(b)) else {
                continue;
            };
            let (Some(from), Some(to)) = (
                projector.project(star_a.ra, star_a.dec),
                projector.project(star_b.ra, star_b.dec),
            ) else {
                continue;
            };
            surface.stroke_line(from, to, style);
            drawn += 1;
        }
    }
    drawn
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Star;
    use crate::coords::{Equatorial, ProjectionMode};
    use crate::surface::RecordingSurface;

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

    #[test]
    fn test_draws_visible_segment() {
        let catalog = StarCatalog::new(vec![
            Star::new(1, 0.0, 0.0, Some(1.0), None),
            Star::new(2, 10.0, 10.0, Some(1.0), None),
        ]);
        let lines = vec![ConstellationLine::new("Test", vec![(1, 2)])];
        let mut surface = RecordingSurface::new(800.0, 600.0);

        let drawn = draw_constellation_lines(
            &mut surface,
            &lines,
            &catalog,
            &projector(),
            &default_line_style(),
        );
        assert_eq!(drawn, 1);
        assert_eq!(surface.line_count(), 1);
    }

    #[test]
    fn test_skips_missing_and_hidden_endpoints() {
        let catalog = StarCatalog::new(vec![
            Star::new(1, 0.0, 0.0, Some(1.0), None),
            Star::new(2, 10.0, 10.0, Some(1.0), None),
            // Far side of the sphere
            Star::new(3, 180.0, 0.0, Some(1.0), None),
        ]);
        let lines = vec![
            ConstellationLine::new("Missing", vec![(1, 42), (42, 2)]),
            ConstellationLine::new("Hidden", vec![(1, 3), (3, 2)]),
            ConstellationLine::new("Ok", vec![(2, 1)]),
        ];
        let mut surface = RecordingSurface::new(800.0, 600.0);

        let drawn = draw_constellation_lines(
            &mut surface,
            &lines,
            &catalog,
            &projector(),
            &default_line_style(),
        );
        assert_eq!(drawn, 1);
        assert_eq!(surface.line_count(), 1);
    }

    #[test]
    fn test_empty_input_draws_nothing() {
        let catalog = StarCatalog::new(Vec::new());
        let mut surface = RecordingSurface::new(800.0, 600.0);
        let drawn = draw_constellation_lines(&mut surface, &[], &catalog, &projector(), &default_line_style());
        assert_eq!(drawn, 0);
        assert!(surface.commands().is_empty());
    }
}
