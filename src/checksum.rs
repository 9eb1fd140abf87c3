//! Record integrity checksum.
//!
//! The checksum of a record is the number of uppercase `A-Z` characters plus
//! the number of digit or `.` characters in its
//! [`without_checksum`](crate::IncomeRecord::without_checksum) text. Every
//! other character is ignored. It detects accidental edits only; anyone able
//! to rewrite the file can recompute it.

use crate::record::{IncomeRecord, Validity};
use log::{debug, info, warn};
use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

/// Per-class character counts behind a checksum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChecksumCounts {
    /// Characters in `A..=Z`.
    pub uppercase: u32,
    /// Characters in `0..=9` plus `.`.
    pub numeric: u32,
}

impl ChecksumCounts {
    pub fn total(&self) -> u32 {
        self.uppercase + self.numeric
    }
}

/// Counts the checksum-relevant characters of `text`.
///
/// ```
/// use wht_ledger::checksum::checksum_of;
///
/// let counts = checksum_of("IN001,Freelance Work,25/07/2025,10000.00,1000.00");
/// assert_eq!(counts.total(), 30);
/// ```
pub fn checksum_of(text: &str) -> ChecksumCounts {
    text.chars().fold(ChecksumCounts::default(), |mut counts, c| {
        if c.is_ascii_uppercase() {
            counts.uppercase += 1;
        } else if c.is_ascii_digit() || c == '.' {
            counts.numeric += 1;
        }
        counts
    })
}

/// Computes, verifies and (on explicit request) repairs record checksums.
///
/// Verifying distinct records touches no shared state, so callers may verify
/// disjoint slices from different threads.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumEngine;

impl ChecksumEngine {
    pub fn new() -> Self {
        ChecksumEngine
    }

    /// The checksum of the record's current canonical text.
    pub fn calculate(&self, record: &IncomeRecord) -> u32 {
        checksum_of(&record.without_checksum()).total()
    }

    /// Pure query: does the record's source checksum match its content?
    ///
    /// Unlike [`verify`](Self::verify) this never touches the record.
    pub fn is_valid(&self, record: &IncomeRecord) -> bool {
        matches_source(self.calculate(record), record)
    }

    /// Computes the checksum, stores it on the record and stores the verdict.
    ///
    /// Returns `true` when the calculated value equals the original checksum.
    pub fn verify(&self, record: &mut IncomeRecord) -> bool {
        let calculated = self.calculate(record);
        let valid = matches_source(calculated, record);
        let validity = if valid {
            Validity::Valid
        } else {
            Validity::Invalid
        };
        record.record_verdict(calculated, validity);

        if !valid {
            debug!(
                "Record {}: checksum mismatch, expected {}, calculated {}",
                record.code(),
                record.original_checksum(),
                calculated
            );
        }

        valid
    }

    /// Verifies every record in input order and partitions them.
    ///
    /// The summary holds snapshots taken right after verification.
    pub fn batch_verify(&self, records: &mut [IncomeRecord]) -> ValidationSummary {
        let mut summary = ValidationSummary::default();

        if records.is_empty() {
            info!("No records to validate");
            return summary;
        }

        for record in records.iter_mut() {
            if self.verify(record) {
                summary.valid.push(record.clone());
            } else {
                summary.invalid.push(record.clone());
            }
            summary.total += 1;
        }

        info!(
            "Validated {} records: {} valid, {} invalid",
            summary.total,
            summary.valid.len(),
            summary.invalid.len()
        );

        summary
    }

    /// Refreshes `calculated_checksum` on every record without reaching a
    /// verdict. Returns the number of records updated.
    pub fn recalculate(&self, records: &mut [IncomeRecord]) -> usize {
        for record in records.iter_mut() {
            let calculated = self.calculate(record);
            record.record_calculated(calculated);
        }
        debug!("Recalculated checksums for {} records", records.len());
        records.len()
    }

    /// Overwrites the source checksum of every mismatching record with the
    /// computed value and marks it valid.
    ///
    /// This erases the evidence of any tampering, so it is never part of
    /// [`verify`](Self::verify) or [`batch_verify`](Self::batch_verify). Each
    /// overwrite is logged at warn level and returned for auditing.
    pub fn repair(&self, records: &mut [IncomeRecord]) -> RepairOutcome {
        let mut outcome = RepairOutcome::default();

        for record in records.iter_mut() {
            let calculated = self.calculate(record);
            if matches_source(calculated, record) {
                record.record_verdict(calculated, Validity::Valid);
                continue;
            }

            warn!(
                "Record {}: overwriting checksum {} with computed {}",
                record.code(),
                record.original_checksum(),
                calculated
            );
            outcome.repaired.push(RepairedChecksum {
                code: record.code().to_string(),
                previous: record.original_checksum(),
                current: calculated,
            });
            record.adopt_checksum(calculated);
        }

        if !outcome.is_empty() {
            warn!("Repaired checksums on {} records", outcome.len());
        }

        outcome
    }

    /// Detailed diagnostics for a single record. Does not modify it.
    pub fn report(&self, record: &IncomeRecord) -> ValidationReport {
        let line = record.without_checksum();
        let counts = checksum_of(&line);
        let calculated = counts.total();
        let valid = matches_source(calculated, record);

        let mut errors: Vec<String> = record
            .format_errors()
            .iter()
            .map(|e| format!("{}: {}", e.field(), e))
            .collect();
        if !valid {
            errors.push(format!(
                "Checksum mismatch: expected {}, calculated {}",
                record.original_checksum(),
                calculated
            ));
        }

        ValidationReport {
            line,
            original_checksum: record.original_checksum(),
            calculated_checksum: calculated,
            counts,
            valid,
            errors,
        }
    }
}

/// A negative source checksum never matches.
fn matches_source(calculated: u32, record: &IncomeRecord) -> bool {
    i64::from(calculated) == record.original_checksum()
}

/// Outcome of one [`ChecksumEngine::batch_verify`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationSummary {
    total: usize,
    valid: Vec<IncomeRecord>,
    invalid: Vec<IncomeRecord>,
}

impl ValidationSummary {
    /// Number of records examined.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Records whose checksum matched, in input order.
    pub fn valid(&self) -> &[IncomeRecord] {
        &self.valid
    }

    /// Records whose checksum did not match, in input order.
    pub fn invalid(&self) -> &[IncomeRecord] {
        &self.invalid
    }

    pub fn has_invalid_records(&self) -> bool {
        !self.invalid.is_empty()
    }

    /// Share of valid records as a percentage, 0 for an empty pass.
    pub fn validity_percentage(&self) -> Decimal {
        if self.total == 0 {
            return Decimal::ZERO;
        }
        Decimal::from(self.valid.len() as u64) / Decimal::from(self.total as u64)
            * Decimal::ONE_HUNDRED
    }

    /// Consumes the summary, returning the valid records.
    pub fn into_valid(self) -> Vec<IncomeRecord> {
        self.valid
    }
}

impl fmt::Display for ValidationSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} records: {} valid, {} invalid ({:.1}% valid)",
            self.total,
            self.valid.len(),
            self.invalid.len(),
            self.validity_percentage()
                .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero)
        )
    }
}

/// Checksum diagnostics for one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationReport {
    /// The canonical text the checksum was computed from.
    pub line: String,
    pub original_checksum: i64,
    pub calculated_checksum: u32,
    pub counts: ChecksumCounts,
    pub valid: bool,
    pub errors: Vec<String>,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Transaction Line: {}", self.line)?;
        writeln!(f, "  Original Checksum:   {}", self.original_checksum)?;
        writeln!(f, "  Calculated Checksum: {}", self.calculated_checksum)?;
        writeln!(f, "  Capital Letters:     {}", self.counts.uppercase)?;
        writeln!(f, "  Numbers/Decimals:    {}", self.counts.numeric)?;
        write!(f, "  Valid: {}", self.valid)?;
        for error in &self.errors {
            write!(f, "\n  - {}", error)?;
        }
        Ok(())
    }
}

/// One checksum overwritten by [`ChecksumEngine::repair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairedChecksum {
    pub code: String,
    pub previous: i64,
    pub current: u32,
}

/// Audit trail of a repair run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairOutcome {
    pub repaired: Vec<RepairedChecksum>,
}

impl RepairOutcome {
    pub fn len(&self) -> usize {
        self.repaired.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repaired.is_empty()
    }
}
