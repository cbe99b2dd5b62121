//! The `mcqa validate` command.

use std::path::PathBuf;

use anyhow::Result;

use mcqa_core::loader::{load_csv, validate_rows};

pub fn execute(input: PathBuf) -> Result<()> {
    let rows = load_csv(&input)?;
    println!("Question file: {} ({} rows)", input.display(), rows.len());

    let warnings = validate_rows(&rows);
    for w in &warnings {
        println!("  [row {}] WARNING: {}", w.row, w.message);
    }

    if warnings.is_empty() {
        println!("All rows valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
