use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use stockpile_core::calibration::CalibrationAggregator;
use stockpile_core::geometry::solve;
use stockpile_core::mass::calculate_asset;
use stockpile_core::profile::mineral_density_hint;
use stockpile_core::reconciliation::TONNAGE_TOLERANCE_PERCENT;
use stockpile_core::{
    reconcile, suggest_calibration, CubicMeters, DensityFactor, DensityProfileResolver,
    Dimensions, GeometryKind, GranulometryClass, MaterialProfile, ReconciliationRecord, Tonnes,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Stockpile volume and tonnage calculator
#[derive(Parser, Debug)]
#[command(name = "stockpile")]
#[command(about = "Stockpile volume, tonnage and density calibration", long_about = None)]
struct Args {
    /// Material profile JSON (reference table when omitted)
    #[arg(short, long, global = true)]
    profile: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Volume of a measured pile, and its tonnage when a class is given
    Volume {
        #[arg(short, long, value_enum, default_value_t = Shape::Cone)]
        shape: Shape,

        /// Base major axis, full width in metres
        #[arg(long)]
        major: Option<f64>,

        /// Base minor axis, full width in metres
        #[arg(long)]
        minor: Option<f64>,

        /// Top major axis of a flattened pile
        #[arg(long)]
        top_major: Option<f64>,

        /// Top minor axis of a flattened pile
        #[arg(long)]
        top_minor: Option<f64>,

        /// Walked base perimeter in metres
        #[arg(long)]
        base_perimeter: Option<f64>,

        /// Walked top perimeter in metres
        #[arg(long)]
        top_perimeter: Option<f64>,

        /// Pile height in metres
        #[arg(long)]
        height: f64,

        /// Granulometry class (COLPAS, GRANSA, MIXTO, FINOS)
        #[arg(short, long)]
        class: Option<GranulometryClass>,

        /// Operator density factor override (t/m³)
        #[arg(short, long)]
        factor: Option<f64>,
    },

    /// Tonnage of a known volume
    Mass {
        /// Volume in m³
        #[arg(long)]
        volume: f64,

        #[arg(short, long)]
        class: GranulometryClass,

        /// Operator density factor override (t/m³)
        #[arg(short, long)]
        factor: Option<f64>,
    },

    /// Compare an estimate with the weighbridge
    Reconcile {
        /// Measured volume in m³
        #[arg(long)]
        volume: f64,

        /// Estimated mass in tonnes
        #[arg(long)]
        estimated: f64,

        /// Scale mass in tonnes
        #[arg(long)]
        real: f64,
    },

    /// Suggest density factors from reconciliation history
    Calibrate {
        /// Real density factors, oldest first
        #[arg(long, value_delimiter = ',', conflicts_with = "records")]
        samples: Vec<f64>,

        /// JSON array of reconciliation records
        #[arg(long)]
        records: Option<PathBuf>,

        /// Write accepted suggestions back to --profile
        #[arg(long, requires = "records")]
        accept: bool,
    },

    /// Show or edit the material profile
    Profile {
        /// Set a class factor (requires --profile to persist)
        #[arg(long, requires = "factor")]
        set: Option<GranulometryClass>,

        #[arg(long)]
        factor: Option<f64>,

        /// Suggest a density for a mineral type (COBRE, HIERRO, ORO, LITIO)
        #[arg(long)]
        mineral: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Shape {
    /// Cone over an elliptical base
    Cone,
    /// Elliptical frustum
    Truncated,
    /// Circular frustum from perimeters
    Perimeter,
}

impl From<Shape> for GeometryKind {
    fn from(shape: Shape) -> Self {
        match shape {
            Shape::Cone => GeometryKind::EllipticCone,
            Shape::Truncated => GeometryKind::TruncatedEllipticCone,
            Shape::Perimeter => GeometryKind::PerimeterTruncatedCone,
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let resolver = match &args.profile {
        Some(path) if path.exists() => DensityProfileResolver::with_profile(MaterialProfile::load(path)?),
        _ => DensityProfileResolver::new(),
    };

    match args.command {
        Command::Volume {
            shape,
            major,
            minor,
            top_major,
            top_minor,
            base_perimeter,
            top_perimeter,
            height,
            class,
            factor,
        } => {
            let nan = f64::NAN;
            let dimensions = Dimensions::from_slots(&[
                major.unwrap_or(nan),
                minor.unwrap_or(nan),
                top_major.unwrap_or(nan),
                top_minor.unwrap_or(nan),
                base_perimeter.unwrap_or(nan),
                top_perimeter.unwrap_or(nan),
                height,
            ]);
            let kind = GeometryKind::from(shape);
            let volume = solve(kind, &dimensions)?;
            println!("Shape:  {kind}");
            println!("Volume: {volume:.2}");

            if let Some(class) = class {
                print_mass(&resolver, volume, class, factor);
            }
        }

        Command::Mass {
            volume,
            class,
            factor,
        } => print_mass(&resolver, CubicMeters::new(volume), class, factor),

        Command::Reconcile {
            volume,
            estimated,
            real,
        } => {
            let outcome = reconcile(
                CubicMeters::new(volume),
                Tonnes::new(estimated),
                Tonnes::new(real),
            );
            if outcome.insufficient_data {
                println!("Insufficient data: volume and estimate must be positive");
                return Ok(());
            }
            println!("Real density factor: {:.3}", outcome.real_density_factor);
            println!("Difference:          {:.2}", outcome.difference_percent);
            println!(
                "Within ±{TONNAGE_TOLERANCE_PERCENT}%:        {}",
                if outcome.within_tolerance { "yes" } else { "NO" }
            );
        }

        Command::Calibrate {
            samples,
            records,
            accept,
        } => match records {
            Some(path) => calibrate_records(&resolver, &path, accept, args.profile.as_deref())?,
            None => match suggest_calibration(&samples) {
                Some(factor) => println!("Suggested factor: {factor:.3}"),
                None => println!("Not enough samples for a suggestion ({} given)", samples.len()),
            },
        },

        Command::Profile {
            set,
            factor,
            mineral,
        } => {
            if let (Some(class), Some(factor)) = (set, factor) {
                resolver.update_profile(class, DensityFactor::new(factor))?;
                save_profile(&resolver, args.profile.as_deref())?;
            }

            if let Some(mineral) = mineral {
                let hint = mineral_density_hint(&mineral);
                println!(
                    "{}: {:.2} (confidence {:.0}%) - {}",
                    mineral.trim().to_uppercase(),
                    hint.density,
                    hint.confidence * 100.0,
                    hint.reasoning
                );
                return Ok(());
            }

            println!("Class  | Factor | Range");
            println!("-------|--------|----------");
            for (class, factor) in resolver.snapshot().entries() {
                let range = class.density_range();
                println!(
                    "{:6} | {:6.3} | {:.2}-{:.2}",
                    class.name(),
                    *factor,
                    *range.min,
                    *range.max
                );
            }
        }
    }

    Ok(())
}

fn print_mass(
    resolver: &DensityProfileResolver,
    volume: CubicMeters,
    class: GranulometryClass,
    factor: Option<f64>,
) {
    let resolution = resolver.resolve_factor(class, factor.map(DensityFactor::new), &[]);
    let calculation = calculate_asset(volume, resolution);

    println!("Class:  {class}");
    println!(
        "Factor: {:.3} ({:?}, confidence {:.2})",
        calculation.factor_applied, calculation.source, calculation.confidence
    );
    println!("Mass:   {:.2}", calculation.mass_t);
}

fn calibrate_records(
    resolver: &DensityProfileResolver,
    path: &Path,
    accept: bool,
    profile_path: Option<&Path>,
) -> Result<(), Box<dyn Error>> {
    let records: Vec<ReconciliationRecord> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
    info!("Loaded {} reconciliation records", records.len());

    let aggregator = CalibrationAggregator::new(&records);

    println!("Class  | Records | Estimated (t) | Scale (t) | No data");
    println!("-------|---------|---------------|-----------|--------");
    for totals in aggregator.tonnage_by_class() {
        println!(
            "{:6} | {:7} | {:13.2} | {:9.2} | {:7}",
            totals.class.name(),
            totals.records,
            *totals.estimated_t,
            *totals.real_t,
            totals.insufficient
        );
    }
    println!();

    let suggestions = aggregator.suggest_all(&resolver.snapshot());
    if suggestions.is_empty() {
        println!("No class has enough reconciled samples for a suggestion");
        return Ok(());
    }

    for suggestion in &suggestions {
        println!(
            "{}: {:.3} -> {:.3} ({:+.2}%, {} samples)",
            suggestion.class,
            *suggestion.current,
            *suggestion.suggested,
            *suggestion.change_percent,
            suggestion.sample_count
        );
        if accept {
            CalibrationAggregator::accept(suggestion, resolver)?;
        }
    }

    if accept {
        save_profile(resolver, profile_path)?;
    }
    Ok(())
}

fn save_profile(resolver: &DensityProfileResolver, path: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match path {
        Some(path) => resolver.snapshot().save(path)?,
        None => println!("No --profile given; change applies to this run only"),
    }
    Ok(())
}
