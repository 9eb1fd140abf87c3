//! WHT Ledger CLI
//!
//! Reads an income declaration CSV, verifies every record's checksum and
//! prints a validation summary followed by the tax report for the valid
//! records.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- declarations.csv
//! cargo run -- declarations.csv --repair > repaired.csv
//! ```
//!
//! `--repair` overwrites mismatching source checksums with computed ones and
//! writes the result as CSV instead of printing the report.
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Set to `debug` or `warn` to control logging verbosity

use std::env;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::process;
use wht_ledger::{
    read_records, write_records, ChecksumEngine, EngineError, ExportFormat, Result, TaxEngine,
};

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let mut input_path = None;
    let mut repair = false;

    for arg in env::args().skip(1) {
        if arg == "--repair" {
            repair = true;
        } else if arg.starts_with("--") {
            return Err(EngineError::UnknownOption(arg));
        } else {
            input_path = Some(arg);
        }
    }

    let input_path = input_path.ok_or(EngineError::MissingArgument)?;
    let file = File::open(&input_path)?;
    let import = read_records(BufReader::new(file))?;
    let mut records = import.records;

    let checksums = ChecksumEngine::new();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if repair {
        checksums.repair(&mut records);
        return write_records(out, &records, ExportFormat::Csv);
    }

    let summary = checksums.batch_verify(&mut records);
    writeln!(out, "Validation: {}", summary)?;

    if import.errors.is_empty() {
        writeln!(out, "Unparseable lines: 0")?;
    } else {
        writeln!(out, "Unparseable lines: {}", import.errors.len())?;
        for error in &import.errors {
            writeln!(out, "  {}", error)?;
        }
    }

    for record in summary.invalid() {
        writeln!(out)?;
        writeln!(out, "{}", checksums.report(record))?;
    }

    let breakdown = TaxEngine::new().compute(summary.valid());
    writeln!(out)?;
    writeln!(out, "{}", breakdown)?;
    out.flush()?;

    Ok(())
}
