//! Render configuration.
//!
//! Everything a [`crate::RenderLoop`] needs besides the star data: the
//! initial view, the observer snapshot, which pipeline stages run and the
//! surface size. Stored as JSON; every field has a default so partial files
//! load.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::coords::ObserverLocation;
use crate::renderer::RenderOptions;
use crate::viewport::ViewState;
use crate::Result;

/// Complete render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Initial view; centered on RA 180, Dec 0 at zoom 1.5
    pub view: ViewState,
    /// Observer used by the stereographic projection
    pub observer: ObserverLocation,
    pub options: RenderOptions,
    /// Surface width in pixels
    pub width: u32,
    /// Surface height in pixels
    pub height: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            view: ViewState::default(),
            observer: ObserverLocation::default(),
            options: RenderOptions::default(),
            width: 800,
            height: 600,
        }
    }
}

impl RenderConfig {
    /// Load a configuration from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)?;
        log::debug!("Loaded render config from {}", path.as_ref().display());
        Ok(config)
    }

    /// Save the configuration as pretty-printed JSON, creating parent
    /// directories as needed.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}
