//! Level-of-detail reduction of the background star set.
//!
//! Stars are split into a *highlighted* set (proper name, or magnitude 2.0
//! or brighter), which is always drawn, and a *background* set, which is
//! capped at a zoom-dependent budget:
//!
//! ```text
//! threshold = max(1500, round(8000 / max(0.5, zoom)))
//! ```
//!
//! Over budget, 60 % of the slots go to the brightest background stars and
//! the rest are filled by striding evenly through the remainder. Selection is
//! deterministic for a given input order and zoom, which keeps frame-to-frame
//! flicker low.

use crate::catalog::Star;

/// Magnitude at or below which a star is always drawn.
pub const HIGHLIGHT_MAX_MAG: f64 = 2.0;

/// Floor of the background budget.
pub const MIN_BACKGROUND_BUDGET: usize = 1500;

/// Background budget at zoom 1.0.
pub const BASE_BACKGROUND_BUDGET: f64 = 8000.0;

/// Share of the budget reserved for the brightest background stars.
pub const BRIGHT_RESERVE_FRACTION: f64 = 0.6;

/// Whether a star bypasses level-of-detail reduction.
pub fn is_highlighted(star: &Star) -> bool {
    star.proper_name.is_some() || star.vmag.is_some_and(|vmag| vmag <= HIGHLIGHT_MAX_MAG)
}

/// Split a star set into `(highlighted, background)` references.
pub fn partition(stars: &[Star]) -> (Vec<&Star>, Vec<&Star>) {
    stars.iter().partition(|star| is_highlighted(star))
}

/// Maximum number of background stars drawn at a zoom level.
pub fn background_budget(zoom: f64) -> usize {
    let scaled = (BASE_BACKGROUND_BUDGET / zoom.max(0.5)).round() as usize;
    scaled.max(MIN_BACKGROUND_BUDGET)
}

/// Reduce a background star set to the budget for `zoom`.
///
/// The result never exceeds [`background_budget`]. When the input fits, it
/// is returned unchanged.
pub fn select_background<'a>(background: &[&'a Star], zoom: f64) -> Vec<&'a Star> {
    let threshold = background_budget(zoom);
    if background.len() <= threshold {
        return background.to_vec();
    }

    let mut by_brightness = background.to_vec();
    by_brightness.sort_by(|a, b| {
        a.sort_magnitude()
            .total_cmp(&b.sort_magnitude())
            .then(a.id.cmp(&b.id))
    });

    let bright_count = (threshold as f64 * BRIGHT_RESERVE_FRACTION).floor() as usize;
    let rest = by_brightness.split_off(bright_count);
    let slots_left = threshold - bright_count;

    // rest.len() > slots_left here, so step > 1 and indices never repeat
    let step = rest.len() as f64 / slots_left as f64;
    let sampled = (0..slots_left).filter_map(|slot| rest.get((slot as f64 * step).floor() as usize));

    by_brightness.extend(sampled);

    log::trace!(
        "LOD reduced {} background stars to {} (zoom {:.2})",
        background.len(),
        by_brightness.len(),
        zoom
    );
    by_brightness
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use rstest::rstest;
    use std::collections::HashSet;

    fn background_field(count: usize, seed: u64) -> Vec<Star> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| {
                Star::new(
                    i as u32 + 1,
                    rng.random_range(0.0..360.0),
                    rng.random_range(-90.0..90.0),
                    Some(rng.random_range(2.01..9.0)),
                    None,
                )
            })
            .collect()
    }

    #[rstest]
    #[case(0.5, 16000)]
    #[case(1.0, 8000)]
    #[case(0.1, 16000)]
    #[case(3.0, 2667)]
    #[case(10.0, 1500)]
    fn test_background_budget(#[case] zoom: f64, #[case] expected: usize) {
        assert_eq!(background_budget(zoom), expected);
    }

    #[test]
    fn test_partition_rules() {
        let stars = vec![
            Star::new(1, 0.0, 0.0, Some(2.0), None),
            Star::new(2, 0.0, 0.0, Some(2.01), None),
            Star::new(3, 0.0, 0.0, Some(6.0), None).with_proper_name("Named"),
            Star::new(4, 0.0, 0.0, None, None),
        ];
        let (highlighted, background) = partition(&stars);
        let ids = |v: &[&Star]| v.iter().map(|s| s.id).collect::<Vec<_>>();
        assert_eq!(ids(&highlighted), vec![1, 3]);
        assert_eq!(ids(&background), vec![2, 4]);
    }

    #[test]
    fn test_small_sets_are_untouched() {
        let stars = background_field(1000, 1);
        let refs: Vec<&Star> = stars.iter().collect();
        let selected = select_background(&refs, 1.0);
        assert_eq!(selected.len(), 1000);
    }

    #[test]
    fn test_large_set_is_capped_and_keeps_brightest() {
        let mut stars = background_field(50_000, 7);
        stars.push(Star::new(999_999, 12.0, 34.0, Some(2.05), None));
        let refs: Vec<&Star> = stars.iter().collect();

        let selected = select_background(&refs, 1.0);
        assert!(selected.len() <= background_budget(1.0));
        assert_eq!(selected.len(), 8000);
        let selected_ids: HashSet<u32> = selected.iter().map(|s| s.id).collect();

        let min_mag = stars
            .iter()
            .filter_map(|s| s.vmag)
            .fold(f64::INFINITY, f64::min);
        for star in stars.iter().filter(|s| s.vmag == Some(min_mag)) {
            assert!(selected_ids.contains(&star.id));
        }

        // Top 60 % of the budget are exactly the brightest stars
        let mut sorted: Vec<&Star> = refs.clone();
        sorted.sort_by(|a, b| a.sort_magnitude().total_cmp(&b.sort_magnitude()));
        for star in sorted.iter().take(4800) {
            assert!(selected_ids.contains(&star.id));
        }
    }

    #[test]
    fn test_selection_is_deterministic_and_unique() {
        let stars = background_field(20_000, 99);
        let refs: Vec<&Star> = stars.iter().collect();

        let a: Vec<u32> = select_background(&refs, 4.0).iter().map(|s| s.id).collect();
        let b: Vec<u32> = select_background(&refs, 4.0).iter().map(|s| s.id).collect();
        assert_eq!(a, b);

        let mut unique = a.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), a.len());
        assert_eq!(a.len(), background_budget(4.0));
    }
}
