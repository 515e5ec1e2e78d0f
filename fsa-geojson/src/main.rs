//! Point d'entrée CLI pour fsa-geojson

use std::process::ExitCode;

use anyhow::Result;
use boundary_shp::BoundaryError;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{fmt, EnvFilter};

use fsa_geojson::{cli, ConvertArgs};

// Charger .env au démarrage
fn load_env() {
    // Chercher .env dans le répertoire courant ou parent
    if dotenvy::dotenv().is_err() {
        // Essayer depuis le répertoire du binaire
        if let Ok(exe) = std::env::current_exe() {
            if let Some(dir) = exe.parent() {
                let _ = dotenvy::from_path(dir.join(".env"));
            }
        }
    }
}

/// Convertir les limites FSA de Statistique Canada (shapefile) en GeoJSON
#[derive(Parser)]
#[command(name = "fsa-geojson")]
#[command(author, version)]
#[command(about = "Convert the Canadian FSA boundary shapefile to GeoJSON (EPSG:4326)")]
#[command(long_about = "Reads lfsa000a21a_e/lfsa000a21a_e.shp, reprojects it to EPSG:4326 and writes canada_fsa_boundaries.geojson, then prints per-province statistics.\n\nSettings come from defaults, an optional JSON --config file, FSA_* environment variables (.env supported) and command-line flags, in increasing priority.")]
struct Cli {
    /// Augmenter la verbosité (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Mode silencieux
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(flatten)]
    convert: ConvertArgs,
}

fn main() -> ExitCode {
    // Charger .env avant tout
    load_env();

    let cli = Cli::parse();

    // Configurer le logging
    init_logging(cli.verbose, cli.quiet);

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // Entrée absente: message dédié, code 1
            match err.chain().find_map(|e| e.downcast_ref::<BoundaryError>()) {
                Some(BoundaryError::MissingInput(path)) => {
                    println!("Error: {} not found", path.display());
                }
                _ => eprintln!("Error: {:#}", err),
            }
            ExitCode::from(1)
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = cli.convert.resolve()?;
    let report = cli::cmd_convert(&config)?;
    info!(summary = %report.summary(), "Conversion complete");
    Ok(())
}

fn init_logging(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => Level::WARN,
        (_, 0) => Level::INFO,
        (_, 1) => Level::DEBUG,
        (_, _) => Level::TRACE,
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .init();
}
