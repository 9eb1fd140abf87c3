//! Batch import and export of income records.
//!
//! Imports are line oriented and tolerant: a line that fails to parse is
//! logged, collected as a [`LineError`] and skipped, and the rest of the input
//! is still processed.

use crate::error::{EngineError, LineError, Result};
use crate::money::Money;
use crate::record::IncomeRecord;
use csv::WriterBuilder;
use log::{debug, info, warn};
use serde::Serialize;
use std::io::{BufRead, BufReader, Read, Write};

/// Column names of the comma-delimited form.
pub const CSV_HEADER: [&str; 6] = [
    "Income_Code",
    "Description",
    "Date",
    "Income_Amount",
    "WHT_Amount",
    "Checksum",
];

const HEADER_TOKENS: [&str; 3] = ["income_code", "description", "checksum"];

const TEXT_RULE: &str =
    "--------------------------------------------------------------------------------";

/// Output layouts supported by [`write_records`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Header plus `code,description,date,income,wht,checksum` rows.
    Csv,
    /// `code|description|date|income|wht` rows, no header.
    Pipe,
    /// Fixed-width report table.
    Text,
}

/// Result of reading a batch: every record that parsed, plus every line that
/// did not.
#[derive(Debug, Default)]
pub struct Import {
    pub records: Vec<IncomeRecord>,
    pub errors: Vec<LineError>,
}

impl Import {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

#[derive(Serialize)]
struct CsvRow<'a> {
    code: &'a str,
    description: &'a str,
    date: String,
    income: Money,
    withholding: Money,
    checksum: u32,
}

impl<'a> From<&'a IncomeRecord> for CsvRow<'a> {
    fn from(record: &'a IncomeRecord) -> Self {
        CsvRow {
            code: record.code(),
            description: record.description(),
            date: record.date_text(),
            income: record.income_amount(),
            withholding: record.withholding_amount(),
            checksum: record.calculated_checksum(),
        }
    }
}

/// Returns `true` if `line` looks like the column header.
pub fn is_header_line(line: &str) -> bool {
    let lower = line.to_lowercase();
    HEADER_TOKENS.iter().any(|token| lower.contains(token))
}

/// Reads comma-delimited records.
///
/// Blank lines are ignored. The first non-empty line is skipped when it is a
/// header, otherwise it is treated as data. Only I/O failures abort the read.
pub fn read_records<R: Read>(reader: R) -> Result<Import> {
    let mut import = Import::default();
    let mut first_line = true;

    for (idx, line) in BufReader::new(reader).lines().enumerate() {
        let line_num = idx + 1;
        let line = line?;
        let trimmed = line.trim();

        if trimmed.is_empty() {
            continue;
        }

        if first_line {
            first_line = false;
            if is_header_line(trimmed) {
                debug!("Line {}: skipping header", line_num);
                continue;
            }
        }

        match IncomeRecord::from_line(trimmed) {
            Ok(record) => import.records.push(record),
            Err(error) => {
                warn!("Line {}: {}", line_num, error);
                import.errors.push(LineError {
                    line: line_num,
                    text: trimmed.to_string(),
                    error,
                });
            }
        }
    }

    info!(
        "Loaded {} records, {} lines skipped",
        import.records.len(),
        import.errors.len()
    );

    Ok(import)
}

/// Writes records in the given layout.
///
/// The checksum column carries each record's calculated checksum, so records
/// should be verified (or repaired) first. The pipe layout fails with
/// [`EngineError::Unstorable`] before writing anything if a description
/// contains `|`.
pub fn write_records<W: Write>(
    mut writer: W,
    records: &[IncomeRecord],
    format: ExportFormat,
) -> Result<()> {
    match format {
        ExportFormat::Csv => {
            let mut csv_writer = WriterBuilder::new().has_headers(false).from_writer(writer);
            csv_writer.write_record(CSV_HEADER)?;
            for record in records {
                csv_writer.serialize(CsvRow::from(record))?;
            }
            csv_writer.flush()?;
        }
        ExportFormat::Pipe => {
            if let Some(record) = records.iter().find(|r| !r.is_storable()) {
                return Err(EngineError::Unstorable {
                    code: record.code().to_string(),
                    description: record.description().to_string(),
                });
            }
            for record in records {
                writeln!(writer, "{}", record.storage_line())?;
            }
            writer.flush()?;
        }
        ExportFormat::Text => {
            writeln!(writer, "Income Records Report")?;
            writeln!(writer, "{}", "=".repeat(TEXT_RULE.len()))?;
            writeln!(writer)?;
            writeln!(
                writer,
                "{:<8} {:<20} {:<12} {:>12} {:>12} {:>12} {:>8} {:>8} {:>5}",
                "Code", "Description", "Date", "Income", "WHT", "Net", "Orig.CS", "Calc.CS", "Valid"
            )?;
            writeln!(writer, "{}", TEXT_RULE)?;
            for record in records {
                writeln!(writer, "{}", record.table_row())?;
            }
            writeln!(writer)?;
            writeln!(writer, "Total Records: {}", records.len())?;
            writer.flush()?;
        }
    }

    debug!("Wrote {} records as {:?}", records.len(), format);
    Ok(())
}
