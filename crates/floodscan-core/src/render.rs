use std::io::{self, Write};

use crate::dates::{DISPLAY_FORMAT, local_offset};
use crate::models::Record;

/// Write records in the console layout:
///
/// ```text
/// Record 1: <title>
/// Link: <link>
/// Published: 05/11/2025 14:00
/// Summary:
/// <summary>
///
/// Total: 1 records
/// ```
pub fn write_records<W: Write>(out: &mut W, records: &[Record]) -> io::Result<()> {
    if records.is_empty() {
        writeln!(out, "No records found.")?;
        return Ok(());
    }

    for record in records {
        writeln!(out, "Record {}: {}", record.index, record.title)?;
        writeln!(out, "Link: {}", record.link)?;
        if let Some(at) = record.published_at {
            writeln!(
                out,
                "Published: {}",
                at.with_timezone(&local_offset()).format(DISPLAY_FORMAT)
            )?;
        }
        writeln!(out, "Summary:\n{}\n", record.summary)?;
    }
    writeln!(out, "Total: {} records", records.len())?;
    Ok(())
}
