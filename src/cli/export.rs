// src/cli/export.rs — The `export` subcommand: persisted rows to CSV

use std::path::{Path, PathBuf};

use crate::export;
use crate::store::SqliteStore;

pub fn run_export(db: &Path, output: Option<&PathBuf>) -> anyhow::Result<()> {
    if !db.exists() {
        anyhow::bail!("database not found: {}", db.display());
    }
    let store = SqliteStore::open(db)?;
    let items = store.fetch_all_conversations()?;
    let csv = export::to_csv(&items);

    match output {
        Some(path) => {
            std::fs::write(path, csv)?;
            eprintln!("wrote {} rows to {}", items.len(), path.display());
        }
        None => print!("{csv}"),
    }
    Ok(())
}
