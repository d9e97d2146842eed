//! Material profile files
//!
//! Profiles are stored as a flat JSON object, one number per class:
//!
//! ```json
//! { "COLPAS": 1.66, "GRANSA": 1.78, "MIXTO": 1.88, "FINOS": 2.0 }
//! ```
//!
//! Missing classes fall back to reference defaults on load.

use rustc_hash::FxHashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use super::{MaterialProfile, ProfileError};
use crate::core_types::granulometry::GranulometryClass;
use crate::core_types::units::DensityFactor;

impl MaterialProfile {
    /// Load a profile from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed, or holds a non-positive factor
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ProfileError> {
        let path = path.as_ref();
        let contents =
            fs::read_to_string(path).map_err(|e| ProfileError::LoadFailed(e.to_string()))?;

        let profile = Self::from_json(&contents)?;
        info!("Loaded material profile from {}", path.display());
        Ok(profile)
    }

    /// Parse a profile from its JSON form
    ///
    /// # Errors
    /// Returns error on malformed JSON, unknown classes or non-positive factors
    pub fn from_json(contents: &str) -> Result<Self, ProfileError> {
        let factors: FxHashMap<GranulometryClass, DensityFactor> = serde_json::from_str(contents)
            .map_err(|e| ProfileError::ParseFailed(e.to_string()))?;

        Self::try_from(factors)
    }

    /// Save the effective profile (all classes) to file
    ///
    /// # Errors
    /// Returns error if the profile cannot be serialized or the file cannot be written
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ProfileError> {
        let complete: Self = Self(self.entries().into_iter().collect());
        let contents = serde_json::to_string_pretty(&complete)
            .map_err(|e| ProfileError::SerializeFailed(e.to_string()))?;

        fs::write(path.as_ref(), contents).map_err(|e| ProfileError::SaveFailed(e.to_string()))?;

        info!("Saved material profile to {}", path.as_ref().display());
        Ok(())
    }
}
