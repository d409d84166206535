mod config;
mod repl;

use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use clap::{ArgAction, Args, Parser, Subcommand};
use formula::{Adduct, AtomicDatabase, Formula};
use ingest::{Ingestor, MeasuredCompound, MeasuredCompoundFilter, MemoryStore, Page, PopulationReport, Sources, Store};
use log::info;
use miette::{IntoDiagnostic, Result, WrapErr, miette};

use config::Config;

/// Monoisotopic masses, adducts, and measured-compound ingestion for small-molecule mass spectrometry
#[derive(Parser, Debug)]
#[command(name = "msdb", version, about)]
struct Cli {
    /// Verbosity level (-v for info, -vv for debug); `RUST_LOG` takes precedence
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// A KDL atomic database to use instead of the bundled one
    #[arg(long, value_name = "FILE", global = true)]
    atomic_database: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load adducts, compounds, and measurements, then list the resulting measured compounds
    Populate(PopulateArgs),

    /// Print the normalized formula and monoisotopic mass of each formula
    Mass {
        #[arg(value_name = "FORMULA", required = true)]
        formulae: Vec<String>,
    },

    /// Apply an adduct (like M+H) to a formula and print the measured formula and mass
    Measure {
        formula: String,
        adduct: String,
        /// An element that adducts may add or remove (repeatable; defaults to H and Na)
        #[arg(short, long = "element", value_name = "SYMBOL")]
        elements: Vec<String>,
    },

    /// Interactively weigh formulae, written as `FORMULA [ADDUCT]`
    Repl,
}

#[derive(Args, Debug)]
struct PopulateArgs {
    /// A KDL configuration file [default: msdb.kdl, if it exists]
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// A JSON list of adducts
    #[arg(long, value_name = "FILE")]
    adducts: Option<PathBuf>,

    /// A CSV list of compounds
    #[arg(long, value_name = "FILE")]
    compounds: Option<PathBuf>,

    /// A CSV list of measurements
    #[arg(long, value_name = "FILE")]
    measurements: Option<PathBuf>,

    /// Only list measured compounds with this exact retention time
    #[arg(long)]
    retention_time: Option<f64>,

    /// Only list measured compounds of this compound type
    #[arg(long)]
    compound_type: Option<String>,

    /// Only list measured compounds whose adduct has this ion mode
    #[arg(long)]
    ion_mode: Option<String>,

    #[arg(long, default_value_t = 0)]
    skip: usize,

    #[arg(long, default_value_t = 100)]
    limit: usize,

    /// Print the load reports and measured compounds as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Populate(args) => populate(cli.atomic_database.as_deref(), args),
        Command::Mass { formulae } => {
            let db = atomic_database(cli.atomic_database.as_deref())?;
            for formula in formulae {
                let formula = Formula::normalized(&db, formula)?;
                let mass = f64::from(formula.monoisotopic_mass(&db)?);
                println!("{formula}\t{mass:.6}");
            }
            Ok(())
        }
        Command::Measure {
            formula,
            adduct,
            elements,
        } => {
            let db = atomic_database(cli.atomic_database.as_deref())?;
            let adduct = if elements.is_empty() {
                Adduct::new(adduct)?
            } else {
                Adduct::with_elements(adduct, &elements)?
            };
            let measured = Formula::normalized(&db, formula)?.apply(&adduct)?;
            let mass = f64::from(measured.monoisotopic_mass(&db)?);
            println!("{}\t{measured}\t{mass:.6}", measured.isotope_notation());
            Ok(())
        }
        Command::Repl => {
            let db = atomic_database(cli.atomic_database.as_deref())?;
            repl::run(&db)
        }
    }
}

fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

fn atomic_database(path: Option<&Path>) -> Result<AtomicDatabase> {
    let Some(path) = path else {
        return Ok(AtomicDatabase::default());
    };

    let text = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read the atomic database {}", path.display()))?;
    let db = AtomicDatabase::from_kdl(path.display().to_string(), text)?;
    info!("loaded {} elements from {}", db.len(), path.display());
    Ok(db)
}

// Populate ============================================================================================================

fn populate(atomic_database_flag: Option<&Path>, args: PopulateArgs) -> Result<()> {
    let config = Config::load(args.config.as_deref())?;
    let db = atomic_database(atomic_database_flag.or(config.atomic_database.as_deref()))?;

    let open = |flag: Option<PathBuf>, configured: Option<PathBuf>, what: &str| -> Result<File> {
        let path = flag
            .or(configured)
            .ok_or_else(|| miette!("no {what} file was given, either with --{what} or in the configuration"))?;
        File::open(&path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to open the {what} file {}", path.display()))
    };
    let sources = Sources {
        adducts: open(args.adducts, config.adducts, "adducts")?,
        compounds: open(args.compounds, config.compounds, "compounds")?,
        measurements: open(args.measurements, config.measurements, "measurements")?,
    };

    let store = MemoryStore::new();
    let mut ingestor = Ingestor::new(&db, &store);
    if let Some(whitelist) = config.whitelist {
        ingestor = ingestor.with_adduct_elements(whitelist);
    }
    let report = ingestor.populate(sources)?;

    let filter = MeasuredCompoundFilter {
        retention_time: args.retention_time,
        compound_type: args.compound_type,
        ion_mode: args.ion_mode,
    };
    let measured = store.measured_compounds(&filter, Page::new(args.skip, args.limit))?;

    if args.json {
        let output = serde_json::json!({ "report": report, "measured_compounds": measured });
        println!("{}", serde_json::to_string_pretty(&output).into_diagnostic()?);
    } else {
        print_report(&report);
        print_measured(&measured);
    }
    Ok(())
}

fn print_report(report: &PopulationReport) {
    for (what, load) in [
        ("adducts", &report.adducts),
        ("compounds", &report.compounds),
        ("measurements", &report.measurements),
    ] {
        println!("{what}: {} loaded, {} skipped", load.loaded, load.skipped.len());
        for skipped in &load.skipped {
            println!("  {}: {}", skipped.record, skipped.reason);
        }
    }
    println!();
}

fn print_measured(measured: &[MeasuredCompound]) {
    println!(
        "{:>4}  {:<24} {:<6} {:>8}  {:<20} {:>14}",
        "ID", "Compound", "Adduct", "RT", "Formula", "Mass"
    );
    for m in measured {
        println!(
            "{:>4}  {:<24} {:<6} {:>8}  {:<20} {:>14.6}",
            u64::from(m.id),
            m.compound.name,
            m.adduct.name,
            m.retention_time.value,
            m.molecular_formula,
            m.monoisotopic_mass
        );
    }
}
