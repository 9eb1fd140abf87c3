//! Error types for record validation, parsing and tax calculation.

use crate::money::Money;
use crate::record::{Field, Validity};
use thiserror::Error;

/// Result type alias for top-level operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// A single record field violates its format or range rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required text field was empty after trimming
    #[error("{0} cannot be empty")]
    Empty(Field),

    #[error("Income code must be 2 letters followed by 3 digits (e.g., IN001), got {0:?}")]
    CodeFormat(String),

    #[error("Description cannot exceed {max} characters ({len} given)")]
    DescriptionTooLong { len: usize, max: usize },

    #[error("Date must be in DD/MM/YYYY format, got {0:?}")]
    DateFormat(String),

    /// Well-formed but not a real calendar day, e.g. `31/02/2025`
    #[error("Invalid date values: {0}")]
    DateOutOfRange(String),

    #[error("Income amount must be positive, got {0}")]
    IncomeNotPositive(Money),

    #[error("WHT amount cannot be negative, got {0}")]
    WithholdingNegative(Money),

    /// Above the largest amount a record may carry
    #[error("{field} cannot exceed {max}, got {value}")]
    AmountTooLarge { field: Field, value: Money, max: Money },

    /// An edited value could not be read as a number
    #[error("{field}: {value:?} is not a valid number")]
    NotANumber { field: Field, value: String },
}

impl ValidationError {
    /// The field whose rule was violated.
    pub fn field(&self) -> Field {
        match self {
            ValidationError::Empty(field) => *field,
            ValidationError::CodeFormat(_) => Field::Code,
            ValidationError::DescriptionTooLong { .. } => Field::Description,
            ValidationError::DateFormat(_) | ValidationError::DateOutOfRange(_) => Field::Date,
            ValidationError::IncomeNotPositive(_) => Field::IncomeAmount,
            ValidationError::WithholdingNegative(_) => Field::WithholdingAmount,
            ValidationError::AmountTooLarge { field, .. }
            | ValidationError::NotANumber { field, .. } => *field,
        }
    }
}

/// A raw line could not be turned into a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Line is empty")]
    Empty,

    #[error("Line must have at least {expected} fields, found {found}")]
    TooFewFields { found: usize, expected: usize },

    #[error("Storage line must have exactly {expected} fields, found {found}")]
    FieldCount { found: usize, expected: usize },

    #[error("Invalid number format in {field}: {value:?}")]
    Number { field: Field, value: String },

    #[error("Invalid checksum value: {0:?}")]
    Checksum(String),

    /// The delimited text itself could not be split
    #[error("Malformed line: {0}")]
    Malformed(String),

    #[error("Validation error: {0}")]
    Field(#[from] ValidationError),
}

/// A parse failure tied to its position in a batch import.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Line {line}: {error} - {text}")]
pub struct LineError {
    /// 1-indexed physical line number
    pub line: usize,
    pub text: String,
    pub error: ParseError,
}

/// A record set is not fit for tax calculation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaxInputError {
    #[error("Records list is empty")]
    Empty,

    #[error("Found record {code} that is not verified ({validity})")]
    NotValid { code: String, validity: Validity },

    #[error("Found negative amount in record {code}")]
    NegativeAmount { code: String },
}

/// Errors that can occur while running the pipeline end to end.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Failed to open, read or write a file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reading or writing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Missing input file argument
    #[error("Missing input file argument. Usage: wht-ledger <input.csv> [--repair]")]
    MissingArgument,

    #[error("Unknown option {0:?}. Usage: wht-ledger <input.csv> [--repair]")]
    UnknownOption(String),

    /// The description holds the storage delimiter and would not read back
    #[error("Record {code} cannot be stored: description {description:?} contains '|'")]
    Unstorable { code: String, description: String },
}
