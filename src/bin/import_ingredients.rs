//! Loads the ingredient catalogue from a headerless `name,measurement_unit`
//! CSV file. Pairs that already exist are left untouched.

use std::{fs::File, path::PathBuf, process::ExitCode};

use clap::Parser;
use foodgram_sdk::{import_ingredients, parse_ingredients, Settings};

#[derive(Debug, Parser)]
#[command(about = "Import ingredients from CSV into the database")]
struct Args {
    /// CSV file to read
    #[arg(default_value = "data/ingredients.csv")]
    path: PathBuf,

    /// Parse and validate the file without touching the database
    #[arg(long)]
    dry_run: bool,
}

fn describe(e: &potion::Error) -> String {
    format!("{} {}", e.code, e.info.as_deref().unwrap_or_default())
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let file = match File::open(&args.path) {
        Ok(file) => file,
        Err(e) => {
            log::error!("cannot open {}: {e}", args.path.display());
            return ExitCode::FAILURE;
        }
    };
    let records = match parse_ingredients(file) {
        Ok(records) => records,
        Err(e) => {
            log::error!("{}: {e}", args.path.display());
            return ExitCode::FAILURE;
        }
    };
    log::info!("read {} ingredients from {}", records.len(), args.path.display());

    if args.dry_run {
        return ExitCode::SUCCESS;
    }

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            log::error!("{e}");
            return ExitCode::FAILURE;
        }
    };
    let pool = match settings.connect().await {
        Ok(pool) => pool,
        Err(e) => {
            log::error!("cannot connect: {}", describe(&e));
            return ExitCode::FAILURE;
        }
    };

    match import_ingredients(&records, &pool).await {
        Ok(inserted) => {
            log::info!(
                "inserted {inserted} ingredients, {} already present",
                (records.len() as u64).saturating_sub(inserted)
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("import failed: {}", describe(&e));
            ExitCode::FAILURE
        }
    }
}
