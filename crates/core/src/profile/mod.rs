//! Density factor resolution per material class
//!
//! The [`MaterialProfile`] maps each [`GranulometryClass`] to the density
//! factor used for new measurements. It starts from the reference table in
//! [`GranulometryClass::density_range`] and only changes when an operator
//! accepts a calibration.
//!
//! [`DensityProfileResolver`] owns one profile behind an `RwLock`. It is
//! constructed by the application and handed to whoever needs factors; there
//! is no process-global profile.

mod mineral;
mod persistence;

pub use mineral::{mineral_density_hint, MineralDensityHint};

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{PoisonError, RwLock};
use tracing::{debug, info, warn};

use crate::core_types::granulometry::GranulometryClass;
use crate::core_types::units::DensityFactor;
use crate::mass::FactorResolution;

/// Reference default density factor for `class`.
pub fn default_factor(class: GranulometryClass) -> DensityFactor {
    class.density_range().default
}

/// Density factor per granulometry class
///
/// Classes absent from the map use their reference default, so a partial
/// profile file is valid. Every stored factor is finite and positive,
/// including profiles built by deserialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "FxHashMap<GranulometryClass, DensityFactor>")]
pub struct MaterialProfile(FxHashMap<GranulometryClass, DensityFactor>);

impl TryFrom<FxHashMap<GranulometryClass, DensityFactor>> for MaterialProfile {
    type Error = ProfileError;

    fn try_from(factors: FxHashMap<GranulometryClass, DensityFactor>) -> Result<Self, Self::Error> {
        if let Some((&class, &factor)) = factors.iter().find(|(_, f)| !f.is_positive()) {
            return Err(ProfileError::InvalidFactor { class, factor });
        }
        Ok(Self(factors))
    }
}

impl MaterialProfile {
    /// Profile holding the reference default of every class
    pub fn reference() -> Self {
        Self(
            GranulometryClass::ALL
                .iter()
                .map(|&class| (class, default_factor(class)))
                .collect(),
        )
    }

    /// Factor currently assigned to `class`
    pub fn factor(&self, class: GranulometryClass) -> DensityFactor {
        self.0
            .get(&class)
            .copied()
            .unwrap_or_else(|| default_factor(class))
    }

    /// Assign `factor` to `class`, returning the previous value.
    ///
    /// # Errors
    /// Returns [`ProfileError::InvalidFactor`] if `factor` is not finite and positive
    pub fn set(
        &mut self,
        class: GranulometryClass,
        factor: DensityFactor,
    ) -> Result<DensityFactor, ProfileError> {
        if !factor.is_positive() {
            return Err(ProfileError::InvalidFactor { class, factor });
        }
        let previous = self.factor(class);
        self.0.insert(class, factor);
        Ok(previous)
    }

    /// Every class with its effective factor, in reference-table order
    pub fn entries(&self) -> [(GranulometryClass, DensityFactor); 4] {
        GranulometryClass::ALL.map(|class| (class, self.factor(class)))
    }
}

/// Shared, atomically updatable material profile
#[derive(Debug, Default)]
pub struct DensityProfileResolver {
    profile: RwLock<MaterialProfile>,
}

impl DensityProfileResolver {
    /// Resolver seeded with the reference table
    pub fn new() -> Self {
        Self::with_profile(MaterialProfile::reference())
    }

    pub fn with_profile(profile: MaterialProfile) -> Self {
        Self {
            profile: RwLock::new(profile),
        }
    }

    /// Current factor for `class`
    pub fn factor(&self, class: GranulometryClass) -> DensityFactor {
        // A poisoned lock still holds a whole profile: writes are a single insert.
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .factor(class)
    }

    /// Owned copy of the whole profile, consistent across classes
    pub fn snapshot(&self) -> MaterialProfile {
        self.profile
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Overwrite the factor of `class` for all subsequent lookups.
    ///
    /// Returns the previous factor. Factors outside the class's plausible
    /// range are accepted but logged.
    pub fn update_profile(
        &self,
        class: GranulometryClass,
        factor: DensityFactor,
    ) -> Result<DensityFactor, ProfileError> {
        let previous = self
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .set(class, factor)?;

        let range = class.density_range();
        if !range.contains(factor) {
            warn!(
                "Factor {:.3} for {} is outside the plausible range {:.2}-{:.2}",
                *factor, class, *range.min, *range.max
            );
        }

        info!(
            "Material profile updated: {} {:.3} -> {:.3} t/m³",
            class, *previous, *factor
        );
        Ok(previous)
    }

    /// Replace the whole profile at once.
    pub fn replace(&self, profile: MaterialProfile) {
        *self
            .profile
            .write()
            .unwrap_or_else(PoisonError::into_inner) = profile;
        info!("Material profile replaced");
    }

    /// Pick the factor for a new measurement of `class`.
    ///
    /// Priority:
    /// 1. A valid operator override ([`FactorSource::Manual`](crate::mass::FactorSource))
    /// 2. Mean of the valid historical real factors (`Inference`)
    /// 3. The current profile value (`Default`)
    pub fn resolve_factor(
        &self,
        class: GranulometryClass,
        operator_override: Option<DensityFactor>,
        history: &[DensityFactor],
    ) -> FactorResolution {
        match operator_override {
            Some(factor) if factor.is_positive() => return FactorResolution::manual(factor),
            Some(factor) => warn!("Ignoring invalid operator factor {} for {}", *factor, class),
            None => {}
        }

        let valid: Vec<f64> = history
            .iter()
            .filter(|f| f.is_positive())
            .map(|f| f.value())
            .collect();

        if valid.is_empty() {
            return FactorResolution::default_profile(self.factor(class));
        }

        let mean = valid.iter().sum::<f64>() / valid.len() as f64;
        debug!(
            "Inferred {:.3} t/m³ for {} from {} reconciled samples",
            mean,
            class,
            valid.len()
        );
        FactorResolution::inferred(DensityFactor::new(mean))
    }
}

/// Errors from profile updates and profile files
#[derive(Debug)]
pub enum ProfileError {
    /// Factor is zero, negative or not finite
    InvalidFactor {
        class: GranulometryClass,
        factor: DensityFactor,
    },
    /// Failed to read the profile file
    LoadFailed(String),
    /// Failed to parse the profile file
    ParseFailed(String),
    /// Failed to serialize the profile
    SerializeFailed(String),
    /// Failed to write the profile file
    SaveFailed(String),
}

impl fmt::Display for ProfileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProfileError::InvalidFactor { class, factor } => {
                write!(f, "Invalid density factor {} for {class}", factor.value())
            }
            ProfileError::LoadFailed(msg) => write!(f, "Failed to load profile: {msg}"),
            ProfileError::ParseFailed(msg) => write!(f, "Failed to parse profile: {msg}"),
            ProfileError::SerializeFailed(msg) => {
                write!(f, "Failed to serialize profile: {msg}")
            }
            ProfileError::SaveFailed(msg) => write!(f, "Failed to save profile: {msg}"),
        }
    }
}

impl std::error::Error for ProfileError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mass::FactorSource;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_reference_defaults() {
        let resolver = DensityProfileResolver::new();
        assert_eq!(resolver.factor(GranulometryClass::Colpas), 1.66);
        assert_eq!(resolver.factor(GranulometryClass::Gransa), 1.78);
        assert_eq!(resolver.factor(GranulometryClass::Mixto), 1.88);
        assert_eq!(resolver.factor(GranulometryClass::Finos), 2.00);
    }

    #[test]
    fn test_update_overwrites_for_subsequent_lookups() {
        let resolver = DensityProfileResolver::new();
        let previous = resolver
            .update_profile(GranulometryClass::Gransa, DensityFactor::new(1.81))
            .unwrap();

        assert_eq!(previous, 1.78);
        assert_eq!(resolver.factor(GranulometryClass::Gransa), 1.81);
        // Other classes untouched
        assert_eq!(resolver.factor(GranulometryClass::Colpas), 1.66);
    }

    #[test]
    fn test_update_rejects_invalid_factors() {
        let resolver = DensityProfileResolver::new();
        for bad in [0.0, -1.2, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resolver.update_profile(GranulometryClass::Finos, DensityFactor::new(bad)),
                Err(ProfileError::InvalidFactor { .. })
            ));
        }
        assert_eq!(resolver.factor(GranulometryClass::Finos), 2.00);
    }

    #[test]
    fn test_profile_never_holds_invalid_factors() {
        let mut profile = MaterialProfile::reference();
        for bad in [0.0, -1.0, f64::NAN] {
            assert!(matches!(
                profile.set(GranulometryClass::Colpas, DensityFactor::new(bad)),
                Err(ProfileError::InvalidFactor { .. })
            ));
        }
        assert_eq!(profile.factor(GranulometryClass::Colpas), 1.66);

        let parsed: Result<MaterialProfile, _> = serde_json::from_str(r#"{ "COLPAS": 0.0 }"#);
        assert!(parsed.is_err());

        let parsed: MaterialProfile = serde_json::from_str(r#"{ "COLPAS": 1.7 }"#).unwrap();
        assert_eq!(parsed.factor(GranulometryClass::Colpas), 1.7);
        assert_eq!(serde_json::to_string(&parsed).unwrap(), r#"{"COLPAS":1.7}"#);
    }

    #[test]
    fn test_out_of_range_factor_is_accepted() {
        let resolver = DensityProfileResolver::new();
        resolver
            .update_profile(GranulometryClass::Colpas, DensityFactor::new(2.4))
            .unwrap();
        assert_eq!(resolver.factor(GranulometryClass::Colpas), 2.4);
    }

    #[test]
    fn test_partial_profile_falls_back_to_reference() {
        let mut profile = MaterialProfile::default();
        profile
            .set(GranulometryClass::Mixto, DensityFactor::new(1.9))
            .unwrap();

        assert_eq!(profile.factor(GranulometryClass::Mixto), 1.9);
        assert_eq!(profile.factor(GranulometryClass::Finos), 2.00);
        assert_eq!(profile.entries()[0], (GranulometryClass::Colpas, DensityFactor::new(1.66)));
    }

    #[test]
    fn test_snapshot_is_detached() {
        let resolver = DensityProfileResolver::new();
        let before = resolver.snapshot();
        resolver
            .update_profile(GranulometryClass::Colpas, DensityFactor::new(1.62))
            .unwrap();

        assert_eq!(before.factor(GranulometryClass::Colpas), 1.66);
        assert_eq!(resolver.snapshot().factor(GranulometryClass::Colpas), 1.62);
    }

    #[test]
    fn test_concurrent_readers_never_see_torn_profile() {
        let resolver = Arc::new(DensityProfileResolver::new());
        let valid = [1.66, 1.70];

        let writer = {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                for i in 0..500 {
                    let factor = valid[i % 2];
                    resolver
                        .update_profile(GranulometryClass::Colpas, DensityFactor::new(factor))
                        .unwrap();
                }
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let resolver = Arc::clone(&resolver);
                thread::spawn(move || {
                    for _ in 0..500 {
                        let f = *resolver.factor(GranulometryClass::Colpas);
                        assert!(valid.contains(&f), "torn read: {f}");
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }

    #[test]
    fn test_resolve_factor_priority() {
        let resolver = DensityProfileResolver::new();
        let history = [DensityFactor::new(1.70), DensityFactor::new(1.74)];

        let manual = resolver.resolve_factor(
            GranulometryClass::Gransa,
            Some(DensityFactor::new(1.9)),
            &history,
        );
        assert_eq!(manual.source, FactorSource::Manual);
        assert_eq!(manual.factor, 1.9);

        let inferred = resolver.resolve_factor(GranulometryClass::Gransa, None, &history);
        assert_eq!(inferred.source, FactorSource::Inference);
        assert!((*inferred.factor - 1.72).abs() < 1e-9);
        assert_eq!(inferred.confidence, 0.85);

        let fallback = resolver.resolve_factor(GranulometryClass::Gransa, None, &[]);
        assert_eq!(fallback.source, FactorSource::Default);
        assert_eq!(fallback.factor, 1.78);
    }

    #[test]
    fn test_resolve_factor_skips_invalid_inputs() {
        let resolver = DensityProfileResolver::new();

        let resolution = resolver.resolve_factor(
            GranulometryClass::Finos,
            Some(DensityFactor::ZERO),
            &[DensityFactor::ZERO, DensityFactor::new(-1.0)],
        );
        assert_eq!(resolution.source, FactorSource::Default);
        assert_eq!(resolution.factor, 2.00);
    }
}
