use std::io::Write;
use std::path::Path;

use super::model::Table;
use crate::error::Result;

/// Write `table` as CSV: a header row, then one line per record.
/// Dates are `YYYY-MM-DD`; nulls are empty fields.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(table.column_names())?;
    for row in &table.rows {
        wtr.write_record(row.values.iter().map(|v| v.to_csv_field()))?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_csv_file(table: &Table, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)?;
    write_csv(table, std::io::BufWriter::new(file))?;
    log::info!("Exported {} rows to {}", table.len(), path.display());
    Ok(())
}

pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buf = Vec::new();
    write_csv(table, &mut buf)?;
    String::from_utf8(buf).map_err(|e| crate::error::Error::MalformedInput(e.to_string()))
}
