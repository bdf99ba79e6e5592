//! Parse-contacts command implementation.

use mist_core::import::{parse_contacts, GroupReconciler, ImportFormat};
use mist_core::{export, Representation};
use std::fs;
use std::path::Path;
use tracing::info;

/// Runs the parse-contacts command.
pub fn run(path: &Path, representation: Representation) -> Result<(), Box<dyn std::error::Error>> {
    let csv = fs::read(path)?;
    println!("{}", render(&csv, representation)?);
    Ok(())
}

/// Normalizes a Google CSV export and encodes the contacts followed by the
/// groups they use.
pub fn render(csv: &[u8], representation: Representation) -> Result<String, Box<dyn std::error::Error>> {
    let mut batch = parse_contacts(ImportFormat::GoogleCsv, csv)?;
    let contacts = batch.len();
    let groups = GroupReconciler::new(Vec::<String>::new()).reconcile(&mut batch);
    info!(contacts, groups, "contacts normalized");

    let documents = batch
        .iter()
        .map(|entry| entry.to_document())
        .collect::<Result<Vec<_>, _>>()?;
    Ok(export(documents, "contacts", representation)?.body)
}
