//! CLI smoke entry point.
//!
//! # Responsibility
//! - Verify `rinkboard_core` linkage without the Flutter runtime.
//! - Given a database path, print folders with counts and unfiled drawings.

use rinkboard_core::db::open_db;
use rinkboard_core::{ListingService, SqliteEntityStore};
use std::process::ExitCode;

fn main() -> ExitCode {
    println!("rinkboard_core ping={}", rinkboard_core::ping());
    println!("rinkboard_core version={}", rinkboard_core::core_version());

    let Some(db_path) = std::env::args().nth(1) else {
        return ExitCode::SUCCESS;
    };
    match print_overview(&db_path) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn print_overview(db_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let conn = open_db(db_path)?;
    let listing = ListingService::new(SqliteEntityStore::try_new(&conn)?);

    for summary in listing.folder_overview()? {
        println!(
            "folder id={} name={:?} drawings={}",
            summary.folder.id,
            summary.folder.display_name(),
            summary.drawing_count
        );
    }
    for drawing in listing.list_unfiled_drawings()? {
        println!(
            "unfiled id={} title={:?} background={} bytes={}",
            drawing.id,
            drawing.display_title(),
            drawing.background,
            drawing.canvas_data.len()
        );
    }
    Ok(())
}
