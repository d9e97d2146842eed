//! End-to-end field workflow: capture, weigh, reconcile, calibrate
use std::sync::Arc;
use std::thread;

use approx::assert_relative_eq;
use stockpile_core::calibration::CalibrationAggregator;
use stockpile_core::measurement::reconciliation_coverage;
use stockpile_core::{
    summarize, DensityFactor, DensityProfileResolver, Dimensions, FactorSource,
    GeometricEstimator, GeometryKind, GranulometryClass, MaterialProfile, Measurement,
    ReconciliationRecord, Tonnes, VolumeInput,
};

#[ctor::ctor]
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn capture_colpas(
    resolver: &DensityProfileResolver,
    asset_id: &str,
    major: f64,
    timestamp_ms: u64,
) -> Measurement {
    let factor = resolver.resolve_factor(GranulometryClass::Colpas, None, &[]);
    Measurement::capture(
        asset_id,
        &GeometricEstimator,
        VolumeInput::new(
            GeometryKind::EllipticCone,
            Dimensions::elliptic_cone(major, 6.0, 5.0),
        ),
        GranulometryClass::Colpas,
        factor,
        timestamp_ms,
    )
    .unwrap()
}

#[test]
fn test_calibration_cycle_changes_future_estimates() {
    let resolver = DensityProfileResolver::new();

    // Three piles, each weighed about 2.4 % heavier than estimated
    let measurements: Vec<Measurement> = (0..3u8)
        .map(|i| {
            capture_colpas(
                &resolver,
                &format!("pile-{i}"),
                10.0 + f64::from(i),
                1_000 + u64::from(i),
            )
        })
        .collect();
    assert!(measurements
        .iter()
        .all(|m| m.factor_source() == FactorSource::Default && m.density_factor() == 1.66));

    let records: Vec<ReconciliationRecord> = measurements
        .iter()
        .enumerate()
        .map(|(i, m)| {
            ReconciliationRecord::from_measurement(
                m,
                Tonnes::new(*m.volume() * 1.70),
                5_000 + i as u64,
            )
        })
        .collect();
    assert!(records.iter().all(|r| r.within_tolerance));
    assert_eq!(reconciliation_coverage(&measurements, &records), 100.0);

    let aggregator = CalibrationAggregator::new(&records);
    let suggestions = aggregator.suggest_all(&resolver.snapshot());
    assert_eq!(suggestions.len(), 1);
    let suggestion = suggestions[0];
    assert_eq!(suggestion.class, GranulometryClass::Colpas);
    assert_eq!(suggestion.suggested, 1.7);

    // Suggesting alone leaves the profile untouched
    assert_eq!(resolver.factor(GranulometryClass::Colpas), 1.66);

    CalibrationAggregator::accept(&suggestion, &resolver).unwrap();
    let next = capture_colpas(&resolver, "pile-9", 10.0, 9_000);
    assert_eq!(next.density_factor(), 1.7);
    assert_relative_eq!(*next.mass(), *next.volume() * 1.7, max_relative = 1e-12);
}

#[test]
fn test_operator_override_and_history_inference() {
    let resolver = DensityProfileResolver::new();
    let class = GranulometryClass::Gransa;

    let manual = resolver.resolve_factor(class, Some(DensityFactor::new(1.81)), &[]);
    assert_eq!(manual.source, FactorSource::Manual);
    assert_eq!(manual.factor, 1.81);

    let history = [DensityFactor::new(1.74), DensityFactor::ZERO, DensityFactor::new(1.76)];
    let inferred = resolver.resolve_factor(class, None, &history);
    assert_eq!(inferred.source, FactorSource::Inference);
    assert_relative_eq!(*inferred.factor, 1.75, max_relative = 1e-12);

    let invalid = resolver.resolve_factor(class, Some(DensityFactor::new(-1.0)), &[]);
    assert_eq!(invalid.source, FactorSource::Default);
    assert_eq!(invalid.factor, 1.78);
}

#[test]
fn test_ignored_measurement_leaves_rollups() {
    let resolver = DensityProfileResolver::new();
    let mut measurements = vec![
        capture_colpas(&resolver, "a", 10.0, 1),
        capture_colpas(&resolver, "b", 14.0, 2),
    ];
    let record = ReconciliationRecord::from_measurement(&measurements[1], Tonnes::new(180.0), 3);

    let before = summarize(&measurements);
    measurements[1].set_ignored(true);
    let after = summarize(&measurements);

    assert_eq!(before.count, 2);
    assert_eq!(after.count, 1);
    assert!(after.total_mass_t < before.total_mass_t);
    assert_eq!(after.latest.as_ref().map(Measurement::asset_id), Some("a"));
    assert_eq!(reconciliation_coverage(&measurements, &[record]), 0.0);
}

#[test]
fn test_profile_file_feeds_resolver() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("profiles.json");

    let resolver = DensityProfileResolver::new();
    resolver
        .update_profile(GranulometryClass::Finos, DensityFactor::new(2.05))
        .unwrap();
    resolver.snapshot().save(&path).unwrap();

    let restored = DensityProfileResolver::with_profile(MaterialProfile::load(&path).unwrap());
    assert_eq!(restored.factor(GranulometryClass::Finos), 2.05);
    assert_eq!(restored.factor(GranulometryClass::Mixto), 1.88);
}

#[test]
fn test_readers_see_whole_updates() {
    let resolver = Arc::new(DensityProfileResolver::new());
    let writer = {
        let resolver = Arc::clone(&resolver);
        thread::spawn(move || {
            for i in 0..200 {
                let factor = if i % 2 == 0 { 1.80 } else { 1.90 };
                resolver
                    .update_profile(GranulometryClass::Mixto, DensityFactor::new(factor))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let resolver = Arc::clone(&resolver);
            thread::spawn(move || {
                for _ in 0..200 {
                    let factor = resolver.factor(GranulometryClass::Mixto);
                    assert!(factor == 1.80 || factor == 1.88 || factor == 1.90);
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(resolver.factor(GranulometryClass::Mixto), 1.90);
}
