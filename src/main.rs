//! DesaSurat - Entry Point
//!
//! Opens the village database and exports letters.

use anyhow::{bail, Context, Result};
use std::path::PathBuf;

use desa_surat::models::{AppSettings, LetterType};
use desa_surat::services::{ExportFormat, ExportService};
use desa_surat::Database;

const USAGE: &str = "usage: desa-surat [export <letter-id> <pdf|docx> [path]]";

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    tracing::info!("Starting DesaSurat v{}", env!("CARGO_PKG_VERSION"));

    let settings = AppSettings::load();
    let db_path = settings.database_path();
    let db = Database::open(&db_path)
        .with_context(|| format!("Could not open database {:?}", db_path))?;
    db.migrate().context("Database migration failed")?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        None => summary(&db),
        Some("export") => export(&db, &settings, &args[1..]),
        Some(other) => bail!("Unknown command '{}'\n{}", other, USAGE),
    }
}

fn summary(db: &Database) -> Result<()> {
    let village = db.village().get()?;
    if village.is_configured() {
        tracing::info!("Village: {}", village.name);
    } else {
        tracing::warn!("Village identity is not configured yet");
    }

    let residents = db.residents().count()?;
    let stats = db.letters().statistics()?;
    tracing::info!("{} residents, {} letters", residents, stats.total);

    for letter_type in LetterType::ALL {
        if db.templates().find_default_by_type(*letter_type)?.is_none() {
            tracing::warn!("No default template for {}", letter_type.display_name());
        }
    }
    Ok(())
}

fn export(db: &Database, settings: &AppSettings, args: &[String]) -> Result<()> {
    let (id, format) = match args {
        [id, format, ..] => (id, format),
        _ => bail!(USAGE),
    };

    let letter_id: i64 = id
        .parse()
        .with_context(|| format!("Invalid letter id '{}'", id))?;
    let Some(format) = ExportFormat::from_name(format) else {
        bail!("Unknown export format '{}'\n{}", format, USAGE);
    };
    let path = args.get(2).map(PathBuf::from);

    let result =
        ExportService::new(db, settings).export_letter(letter_id, format, path.as_deref())?;
    println!("{}", result.path.display());
    Ok(())
}
