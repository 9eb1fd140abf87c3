//! # WHT Ledger
//!
//! Validates checksummed income declarations and computes the tax payable on
//! the records that pass.
//!
//! ## Pipeline
//!
//! 1. A delimited line is parsed into an [`IncomeRecord`]; field rules are
//!    enforced at construction and on every edit.
//! 2. [`ChecksumEngine::verify`] compares the record's content checksum with
//!    the one supplied by its source and caches the verdict on the record.
//! 3. [`TaxEngine::compute`] aggregates the valid records into a
//!    [`TaxBreakdown`].
//!
//! ## Design Principles
//!
//! - **Fixed-point arithmetic**: amounts are `rust_decimal` values held at 2
//!   decimal places, aggregates rounded after summation
//! - **Always-valid records**: a record never holds a value that breaks its
//!   field rules
//! - **Explicit repair**: overwriting a source checksum is a separate, logged
//!   operation, never a side effect of validation
//!
//! ## Example
//!
//! ```
//! use wht_ledger::{ChecksumEngine, IncomeRecord, TaxEngine};
//!
//! let mut record =
//!     IncomeRecord::from_line("IN001,Freelance Work,25/07/2025,200000.00,5000.00,31").unwrap();
//!
//! let checksums = ChecksumEngine::new();
//! assert!(checksums.verify(&mut record));
//!
//! let breakdown = TaxEngine::new().compute(&[record]);
//! assert_eq!(breakdown.net_tax_payable.to_string(), "1000.00");
//! ```

pub mod checksum;
pub mod error;
pub mod ledger;
pub mod money;
pub mod record;
pub mod tax;

pub use checksum::{ChecksumEngine, ValidationReport, ValidationSummary};
pub use error::{EngineError, LineError, ParseError, Result, TaxInputError, ValidationError};
pub use ledger::{read_records, write_records, ExportFormat, Import};
pub use money::Money;
pub use record::{apply_edit, Field, IncomeRecord, RecordFormat, Validity};
pub use tax::{TaxBreakdown, TaxEngine, TaxScenario};
