//! Control-log collection and CSV persistence

use navigation::LogRecord;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::mpsc::Receiver;
use tracing::{info, warn};

/// Drain the log channel until every sender is gone, then persist the run as
/// one CSV file. Records accumulate in memory; the file is written once at
/// shutdown so the control loop never shares the disk.
pub fn collect_and_persist(rx: Receiver<LogRecord>, path: &Path) {
    let mut records = Vec::new();
    while let Ok(record) = rx.recv() {
        records.push(record);
    }
    match write_csv(path, &records) {
        Ok(()) => info!(count = records.len(), path = %path.display(), "control log written"),
        Err(e) => warn!(error = %e, "control log write failed"),
    }
}

fn write_csv(path: &Path, records: &[LogRecord]) -> std::io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{}", LogRecord::CSV_HEADER)?;
    for record in records {
        writeln!(writer, "{}", record.to_csv_row())?;
    }
    writer.flush()
}
