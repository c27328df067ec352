//! CSV export of score tables.
//!
//! The core returns ranked tables in memory; writing them out for downstream
//! reporting is the one tabular side effect it offers. Headers can be renamed
//! on the way out so reports carry presentation names ("VINA Score") while
//! the pipeline keeps machine names ("affinity").

use crate::core::ranking::ScoreTable;
use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

/// Writes `table` as CSV to `path`, applying `rename` to the header row.
pub fn write_csv(
    table: &ScoreTable,
    path: &Path,
    rename: &HashMap<String, String>,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_path(path)?;
    write_csv_to(table, &mut writer, rename)
}

pub fn write_csv_to<W: Write>(
    table: &ScoreTable,
    writer: &mut csv::Writer<W>,
    rename: &HashMap<String, String>,
) -> Result<(), csv::Error> {
    let headers: Vec<&str> = table
        .columns()
        .iter()
        .map(|c| rename.get(c).unwrap_or(c).as_str())
        .collect();
    writer.write_record(&headers)?;

    for row in table.rows() {
        let record: Vec<String> = row.iter().map(|cell| cell.render()).collect();
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}
