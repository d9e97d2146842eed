//! Density profile calibration from reconciliation history
//!
//! Every reconciled pile yields a real density factor for its material class.
//! Once a class has enough of them, their recent mean is suggested as the new
//! profile value. Suggestions are advisory: the profile only changes when an
//! operator accepts one through [`CalibrationAggregator::accept`].

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::core_types::granulometry::GranulometryClass;
use crate::core_types::units::{round_to, DensityFactor, Percent, Tonnes};
use crate::profile::{DensityProfileResolver, MaterialProfile, ProfileError};
use crate::reconciliation::ReconciliationRecord;

/// Fewest valid samples a suggestion may be based on
pub const MIN_CALIBRATION_SAMPLES: usize = 3;

/// Number of most recent samples averaged into a suggestion
pub const CALIBRATION_WINDOW: usize = 5;

/// Decimal places of a suggested factor
const SUGGESTION_DECIMALS: u32 = 3;

/// Suggest a density factor from an ordered history of real factors (oldest first).
///
/// Non-positive and non-finite entries are dropped first (a 0.0 factor means
/// the reconciliation had no usable volume). Returns `None` while fewer than
/// [`MIN_CALIBRATION_SAMPLES`] remain; otherwise the mean of the last
/// [`CALIBRATION_WINDOW`] of them, rounded to 3 decimals.
///
/// # Example
/// ```
/// use stockpile_core::calibration::suggest_calibration;
///
/// assert_eq!(suggest_calibration(&[1.60, 1.70]), None);
/// assert_eq!(suggest_calibration(&[1.60, 1.70, 1.80]).map(|f| *f), Some(1.7));
/// ```
pub fn suggest_calibration(history: &[f64]) -> Option<DensityFactor> {
    let valid: Vec<f64> = history
        .iter()
        .copied()
        .filter(|f| *f > 0.0 && f.is_finite())
        .collect();

    if valid.len() < MIN_CALIBRATION_SAMPLES {
        return None;
    }

    let window = &valid[valid.len().saturating_sub(CALIBRATION_WINDOW)..];
    let mean = window.iter().sum::<f64>() / window.len() as f64;

    Some(DensityFactor::new(round_to(mean, SUGGESTION_DECIMALS)))
}

/// Proposed profile change for one class
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationSuggestion {
    pub class: GranulometryClass,
    /// Profile value at the time of the suggestion
    pub current: DensityFactor,
    pub suggested: DensityFactor,
    /// Valid samples available for the class
    pub sample_count: usize,
    /// Relative change from `current` to `suggested`
    pub change_percent: Percent,
}

/// Estimated vs scale tonnage for one class over reconciled piles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassTonnage {
    pub class: GranulometryClass,
    /// Records counted in the totals
    pub records: usize,
    /// Records left out because they carried no usable volume or estimate
    pub insufficient: usize,
    pub estimated_t: Tonnes,
    pub real_t: Tonnes,
}

/// Calibration over a consistent snapshot of reconciliation records
#[derive(Debug, Clone)]
pub struct CalibrationAggregator {
    records: Vec<ReconciliationRecord>,
}

impl CalibrationAggregator {
    /// Take a snapshot; records are ordered by reconciliation time.
    pub fn new(records: &[ReconciliationRecord]) -> Self {
        let mut records = records.to_vec();
        records.sort_by_key(|r| r.reconciled_at_ms);
        Self { records }
    }

    /// Real factors of `class`, oldest first
    pub fn history(&self, class: GranulometryClass) -> Vec<f64> {
        self.records
            .iter()
            .filter(|r| r.granulometry == class && r.has_usable_factor())
            .map(|r| *r.real_density_factor)
            .collect()
    }

    /// Suggestion for `class` against the values in `profile`
    pub fn suggest_for(
        &self,
        class: GranulometryClass,
        profile: &MaterialProfile,
    ) -> Option<CalibrationSuggestion> {
        let history = self.history(class);
        let Some(suggested) = suggest_calibration(&history) else {
            debug!(
                "No calibration for {}: {} of {} samples",
                class,
                history.len(),
                MIN_CALIBRATION_SAMPLES
            );
            return None;
        };

        let current = profile.factor(class);
        Some(CalibrationSuggestion {
            class,
            current,
            suggested,
            sample_count: history.len(),
            change_percent: Percent::new((*suggested - *current) * 100.0 / *current),
        })
    }

    /// Suggestions for every class that has enough samples
    pub fn suggest_all(&self, profile: &MaterialProfile) -> Vec<CalibrationSuggestion> {
        GranulometryClass::ALL
            .iter()
            .filter_map(|&class| self.suggest_for(class, profile))
            .collect()
    }

    /// Apply an operator-approved suggestion to the shared profile.
    ///
    /// Returns the factor it replaced.
    pub fn accept(
        suggestion: &CalibrationSuggestion,
        resolver: &DensityProfileResolver,
    ) -> Result<DensityFactor, ProfileError> {
        info!(
            "Accepting calibration for {}: {:.3} t/m³ from {} samples",
            suggestion.class, *suggestion.suggested, suggestion.sample_count
        );
        resolver.update_profile(suggestion.class, suggestion.suggested)
    }

    /// Estimated vs real tonnage per class, in reference-table order.
    ///
    /// Records flagged `insufficient_data` are counted apart, not summed.
    pub fn tonnage_by_class(&self) -> Vec<ClassTonnage> {
        GranulometryClass::ALL
            .iter()
            .map(|&class| {
                let (insufficient, reconciled): (Vec<_>, Vec<_>) = self
                    .records
                    .iter()
                    .filter(|r| r.granulometry == class)
                    .partition(|r| r.insufficient_data);
                ClassTonnage {
                    class,
                    records: reconciled.len(),
                    insufficient: insufficient.len(),
                    estimated_t: reconciled.iter().map(|r| r.estimated_mass_t).sum(),
                    real_t: reconciled.iter().map(|r| r.real_mass_t).sum(),
                }
            })
            .collect()
    }
}
