//! Convert-notes command implementation.

use mist_core::import::{parse_notes, NoteFormat};
use mist_core::{export, Representation};
use std::fs;
use std::path::Path;

/// Runs the convert-notes command.
pub fn run(path: &Path, to: Representation) -> Result<(), Box<dyn std::error::Error>> {
    let from = format_of(path)?;
    let archive = fs::read(path)?;
    println!("{}", convert(&archive, from, to)?);
    Ok(())
}

/// Picks the input format from the file extension.
fn format_of(path: &Path) -> Result<NoteFormat, Box<dyn std::error::Error>> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(NoteFormat::Json),
        Some("xml") => Ok(NoteFormat::Xml),
        _ => Err(format!("Cannot tell the format of {}: use .json or .xml", path.display()).into()),
    }
}

/// Converts a note archive. Internal fields are dropped on the way.
pub fn convert(
    archive: &[u8],
    from: NoteFormat,
    to: Representation,
) -> Result<String, Box<dyn std::error::Error>> {
    let notes = parse_notes(from, archive)?;
    Ok(export(notes, "notes", to)?.body)
}
