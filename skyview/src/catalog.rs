//! Read-only star and constellation tables consumed by the renderer.
//!
//! The data-loading collaborator owns the catalog contents; this module only
//! defines the record shapes and the id index used for constellation lookups
//! and click picking.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single catalog star.
///
/// Field names serialize in camelCase to match the catalog documents
/// produced by the loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Star {
    /// Catalog identifier (Hipparcos number), unique within a catalog
    pub id: u32,
    /// Right ascension in degrees, [0, 360)
    pub ra: f64,
    /// Declination in degrees, [-90, 90]
    pub dec: f64,
    /// Visual magnitude; smaller is brighter
    pub vmag: Option<f64>,
    /// B-V color index
    pub bv: Option<f64>,
    #[serde(default)]
    pub spectral_type: Option<String>,
    /// Catalog designation such as "9Alp CMa"
    #[serde(default)]
    pub name: Option<String>,
    /// Human-friendly proper name such as "Sirius"
    #[serde(default)]
    pub proper_name: Option<String>,
    /// IAU constellation tag
    #[serde(default)]
    pub constellation: Option<String>,
}

impl Star {
    /// Create a star with position, magnitude and color only.
    pub fn new(id: u32, ra: f64, dec: f64, vmag: Option<f64>, bv: Option<f64>) -> Self {
        Self {
            id,
            ra,
            dec,
            vmag,
            bv,
            spectral_type: None,
            name: None,
            proper_name: None,
            constellation: None,
        }
    }

    /// Attach a catalog designation.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Attach a proper name.
    pub fn with_proper_name(mut self, proper_name: impl Into<String>) -> Self {
        self.proper_name = Some(proper_name.into());
        self
    }

    /// Attach a constellation tag.
    pub fn with_constellation(mut self, constellation: impl Into<String>) -> Self {
        self.constellation = Some(constellation.into());
        self
    }

    /// Magnitude used for brightness ordering; stars without one sort last.
    pub fn sort_magnitude(&self) -> f64 {
        self.vmag.unwrap_or(99.0)
    }
}

/// Stick-figure segments of one constellation, as pairs of star ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstellationLine {
    pub constellation_id: String,
    pub lines: Vec<(u32, u32)>,
}

impl ConstellationLine {
    pub fn new(constellation_id: impl Into<String>, lines: Vec<(u32, u32)>) -> Self {
        Self {
            constellation_id: constellation_id.into(),
            lines,
        }
    }
}

/// The resident star set together with an id lookup index.
///
/// Rebuilt whenever the loader supplies a new star set; never mutated
/// while frames are being rendered.
#[derive(Debug, Clone, Default)]
pub struct StarCatalog {
    stars: Vec<Star>,
    index: HashMap<u32, usize>,
}

impl StarCatalog {
    pub fn new(stars: Vec<Star>) -> Self {
        let index = stars
            .iter()
            .enumerate()
            .map(|(position, star)| (star.id, position))
            .collect();
        Self { stars, index }
    }

    /// Look a star up by catalog id.
    pub fn get(&self, id: u32) -> Option<&Star> {
        self.index.get(&id).map(|&position| &self.stars[position])
    }

    pub fn stars(&self) -> &[Star] {
        &self.stars
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}
