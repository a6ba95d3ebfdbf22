use std::fs::File;
use std::io::Write;
use std::path::Path;

use csv::WriterBuilder;
use tracing::info;

use crate::basic::post_processing::{voltage_records, VoltageRecord};
use crate::basic::system::NetworkSnapshot;
use crate::error::Result;

/// Writes voltage rows as CSV with a header line.
pub fn write_voltage_csv<W: Write>(writer: W, records: &[VoltageRecord]) -> Result<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(writer);
    for rec in records {
        wtr.serialize(rec)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Saves the voltage table of `snapshot` to `path`.
pub fn save_voltage_csv(path: impl AsRef<Path>, snapshot: &NetworkSnapshot) -> Result<()> {
    let records = voltage_records(snapshot);
    write_voltage_csv(File::create(path.as_ref())?, &records)?;
    info!(path = %path.as_ref().display(), rows = records.len(), "voltage table written");
    Ok(())
}
