//! Income record model: field validation, canonical text forms and parsing.
//!
//! An [`IncomeRecord`] is never observable in a state that violates its field
//! rules. Construction and every setter either leave a fully valid record or
//! fail without touching it.

use crate::error::{ParseError, ValidationError};
use crate::money::Money;
use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, StringRecord, Trim, WriterBuilder};
use rust_decimal::Decimal;
use std::fmt;
use std::str::FromStr;

/// Maximum description length, counted in characters after trimming.
pub const MAX_DESCRIPTION_LEN: usize = 20;

/// Minimum number of fields on a comma-delimited line.
pub const MIN_FIELDS: usize = 5;

const DATE_FORMAT: &str = "%d/%m/%Y";

/// The user-editable fields of a record, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Code,
    Description,
    Date,
    IncomeAmount,
    WithholdingAmount,
}

impl Field {
    /// All fields in validation order.
    pub const ALL: [Field; 5] = [
        Field::Code,
        Field::Description,
        Field::Date,
        Field::IncomeAmount,
        Field::WithholdingAmount,
    ];
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Field::Code => "Income Code",
            Field::Description => "Description",
            Field::Date => "Date",
            Field::IncomeAmount => "Income Amount",
            Field::WithholdingAmount => "WHT Amount",
        };
        f.write_str(name)
    }
}

/// Cached outcome of the last checksum comparison.
///
/// Not a source of truth: every mutation resets it to `Unvalidated`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Validity {
    #[default]
    Unvalidated,
    Valid,
    Invalid,
}

impl fmt::Display for Validity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Validity::Unvalidated => "unvalidated",
            Validity::Valid => "valid",
            Validity::Invalid => "invalid",
        };
        f.write_str(name)
    }
}

/// Delimited text forms a record can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordFormat {
    /// `code,description,date,income,wht,checksum`
    Csv,
    /// `code|description|date|income|wht`, no checksum
    Pipe,
}

/// A single income declaration.
///
/// # Invariants
///
/// - `code` matches `^[A-Z]{2}[0-9]{3}$`
/// - `description` is 1 to 20 characters with no surrounding whitespace
/// - `date` is a real calendar day
/// - `income_amount > 0` and `withholding_amount >= 0`, both at 2 decimal places
///   and no larger than [`Money::max_amount`]
/// - `original_checksum` is whatever the source supplied, negative included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncomeRecord {
    code: String,
    description: String,
    date: NaiveDate,
    income_amount: Money,
    withholding_amount: Money,
    original_checksum: i64,
    calculated_checksum: u32,
    validity: Validity,
}

impl IncomeRecord {
    /// Creates a record with no source checksum (`original_checksum == 0`).
    pub fn new(
        code: &str,
        description: &str,
        date: &str,
        income_amount: Decimal,
        withholding_amount: Decimal,
    ) -> Result<Self, ValidationError> {
        Self::with_checksum(code, description, date, income_amount, withholding_amount, 0)
    }

    /// Creates a record carrying the checksum supplied by its source line.
    ///
    /// Fields are validated in declaration order and the first violation is
    /// returned.
    pub fn with_checksum(
        code: &str,
        description: &str,
        date: &str,
        income_amount: Decimal,
        withholding_amount: Decimal,
        original_checksum: i64,
    ) -> Result<Self, ValidationError> {
        Ok(IncomeRecord {
            code: validate_code(code)?,
            description: validate_description(description)?,
            date: validate_date(date)?,
            income_amount: validate_income_amount(income_amount)?,
            withholding_amount: validate_withholding_amount(withholding_amount)?,
            original_checksum,
            calculated_checksum: 0,
            validity: Validity::Unvalidated,
        })
    }

    /// Parses a comma-delimited line.
    ///
    /// Quoted fields may contain commas. At least five fields are required; a
    /// non-empty sixth field is taken as the original checksum. Any integer is
    /// accepted there; one that can never match is caught by verification.
    pub fn from_line(line: &str) -> Result<Self, ParseError> {
        let fields = split_line(line, b',', true)?;
        if fields.len() < MIN_FIELDS {
            return Err(ParseError::TooFewFields {
                found: fields.len(),
                expected: MIN_FIELDS,
            });
        }

        let income = parse_amount(&fields[3], Field::IncomeAmount)?;
        let withholding = parse_amount(&fields[4], Field::WithholdingAmount)?;
        let checksum = match fields.get(5).map(|s| s.trim()) {
            Some(raw) if !raw.is_empty() => raw
                .parse::<i64>()
                .map_err(|_| ParseError::Checksum(raw.to_string()))?,
            _ => 0,
        };

        Ok(Self::with_checksum(
            &fields[0],
            &fields[1],
            &fields[2],
            income,
            withholding,
            checksum,
        )?)
    }

    /// Parses the pipe-delimited storage form, which has exactly five fields.
    pub fn from_storage_line(line: &str) -> Result<Self, ParseError> {
        let fields = split_line(line, b'|', false)?;
        if fields.len() != MIN_FIELDS {
            return Err(ParseError::FieldCount {
                found: fields.len(),
                expected: MIN_FIELDS,
            });
        }

        let income = parse_amount(&fields[3], Field::IncomeAmount)?;
        let withholding = parse_amount(&fields[4], Field::WithholdingAmount)?;

        Ok(Self::new(&fields[0], &fields[1], &fields[2], income, withholding)?)
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    /// The date in its `DD/MM/YYYY` text form.
    pub fn date_text(&self) -> String {
        self.date.format(DATE_FORMAT).to_string()
    }

    pub fn income_amount(&self) -> Money {
        self.income_amount
    }

    pub fn withholding_amount(&self) -> Money {
        self.withholding_amount
    }

    /// Income less withholding for this record.
    pub fn net_amount(&self) -> Money {
        self.income_amount - self.withholding_amount
    }

    pub fn original_checksum(&self) -> i64 {
        self.original_checksum
    }

    /// The checksum computed by the last verification, 0 if never verified.
    pub fn calculated_checksum(&self) -> u32 {
        self.calculated_checksum
    }

    pub fn validity(&self) -> Validity {
        self.validity
    }

    /// Returns `true` only if the last verification passed and nothing has
    /// changed since.
    pub fn is_verified(&self) -> bool {
        self.validity == Validity::Valid
    }

    pub fn set_code(&mut self, code: &str) -> Result<(), ValidationError> {
        self.code = validate_code(code)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_description(&mut self, description: &str) -> Result<(), ValidationError> {
        self.description = validate_description(description)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_date(&mut self, date: &str) -> Result<(), ValidationError> {
        self.date = validate_date(date)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_income_amount(&mut self, amount: Decimal) -> Result<(), ValidationError> {
        self.income_amount = validate_income_amount(amount)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_withholding_amount(&mut self, amount: Decimal) -> Result<(), ValidationError> {
        self.withholding_amount = validate_withholding_amount(amount)?;
        self.invalidate();
        Ok(())
    }

    pub fn set_original_checksum(&mut self, checksum: i64) {
        self.original_checksum = checksum;
        self.invalidate();
    }

    /// Replaces every editable field except the code in one step.
    ///
    /// All values are validated before any is written, so a failure leaves
    /// the record unchanged.
    pub fn update(
        &mut self,
        description: &str,
        date: &str,
        income_amount: Decimal,
        withholding_amount: Decimal,
    ) -> Result<(), ValidationError> {
        let description = validate_description(description)?;
        let date = validate_date(date)?;
        let income_amount = validate_income_amount(income_amount)?;
        let withholding_amount = validate_withholding_amount(withholding_amount)?;

        self.description = description;
        self.date = date;
        self.income_amount = income_amount;
        self.withholding_amount = withholding_amount;
        self.invalidate();
        Ok(())
    }

    /// Records the outcome of a checksum comparison.
    pub(crate) fn record_verdict(&mut self, calculated: u32, validity: Validity) {
        self.calculated_checksum = calculated;
        self.validity = validity;
    }

    /// Sets the calculated checksum without reaching a verdict.
    pub(crate) fn record_calculated(&mut self, calculated: u32) {
        self.calculated_checksum = calculated;
    }

    /// Overwrites the source checksum with a freshly computed one and marks the
    /// record valid. Only the explicit repair path may do this.
    pub(crate) fn adopt_checksum(&mut self, checksum: u32) {
        self.original_checksum = i64::from(checksum);
        self.calculated_checksum = checksum;
        self.validity = Validity::Valid;
    }

    fn invalidate(&mut self) {
        self.validity = Validity::Unvalidated;
    }

    /// `code,description,date,income,wht` with amounts at 2 decimal places.
    ///
    /// This exact text is the checksum input.
    pub fn without_checksum(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.code,
            self.description,
            self.date_text(),
            self.income_amount,
            self.withholding_amount
        )
    }

    /// [`without_checksum`](Self::without_checksum) followed by the calculated checksum.
    pub fn full(&self) -> String {
        format!("{},{}", self.without_checksum(), self.calculated_checksum)
    }

    /// `code|description|date|income|wht`.
    ///
    /// The pipe form has no quoting, so a description containing `|` does
    /// not read back; check [`is_storable`](Self::is_storable) first.
    pub fn storage_line(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            self.code,
            self.description,
            self.date_text(),
            self.income_amount,
            self.withholding_amount
        )
    }

    /// Returns `true` if the pipe form reads back as the same record.
    pub fn is_storable(&self) -> bool {
        !self.description.contains('|')
    }

    /// Writes the record in the given format.
    ///
    /// The CSV form quotes a description only when it contains a delimiter or
    /// quote, so it always parses back with [`from_line`](Self::from_line).
    pub fn serialize(&self, format: RecordFormat) -> String {
        match format {
            RecordFormat::Csv => self.quoted_line().unwrap_or_else(|| self.full()),
            RecordFormat::Pipe => self.storage_line(),
        }
    }

    fn quoted_line(&self) -> Option<String> {
        let mut writer = WriterBuilder::new().from_writer(Vec::new());
        writer
            .write_record([
                self.code.clone(),
                self.description.clone(),
                self.date_text(),
                self.income_amount.to_string(),
                self.withholding_amount.to_string(),
                self.calculated_checksum.to_string(),
            ])
            .ok()?;
        let bytes = writer.into_inner().ok()?;
        let line = String::from_utf8(bytes).ok()?;
        Some(line.trim_end_matches(['\r', '\n']).to_string())
    }

    /// Re-runs every field rule against the current values.
    ///
    /// Empty for any record obtained through this module's constructors.
    pub fn format_errors(&self) -> Vec<ValidationError> {
        let date = self.date_text();
        [
            validate_code(&self.code).err(),
            validate_description(&self.description).err(),
            validate_date(&date).err(),
            validate_income_amount(self.income_amount.amount()).err(),
            validate_withholding_amount(self.withholding_amount.amount()).err(),
        ]
        .into_iter()
        .flatten()
        .collect()
    }

    /// Fixed-width row used by the text report.
    pub fn table_row(&self) -> String {
        let mark = match self.validity {
            Validity::Valid => "✓",
            Validity::Invalid => "✗",
            Validity::Unvalidated => "-",
        };
        format!(
            "{:<8} {:<20} {:<12} {:>12} {:>12} {:>12} {:>8} {:>8} {:>5}",
            self.code,
            self.description,
            self.date_text(),
            self.income_amount.to_string(),
            self.withholding_amount.to_string(),
            self.net_amount().to_string(),
            self.original_checksum,
            self.calculated_checksum,
            mark
        )
    }
}

impl fmt::Display for IncomeRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} - {} ({}) - Income: Rs {}, WHT: Rs {}, Net: Rs {}",
            self.code,
            self.description,
            self.date_text(),
            self.income_amount,
            self.withholding_amount,
            self.net_amount()
        )
    }
}

/// Applies a single-field edit and returns the updated record.
///
/// The input is left untouched; the returned record is `Unvalidated` and must
/// be verified again before it is trusted.
pub fn apply_edit(
    record: &IncomeRecord,
    field: Field,
    value: &str,
) -> Result<IncomeRecord, ValidationError> {
    let mut edited = record.clone();
    match field {
        Field::Code => edited.set_code(value)?,
        Field::Description => edited.set_description(value)?,
        Field::Date => edited.set_date(value)?,
        Field::IncomeAmount => edited.set_income_amount(edit_amount(value, field)?)?,
        Field::WithholdingAmount => edited.set_withholding_amount(edit_amount(value, field)?)?,
    }
    Ok(edited)
}

/// Returns `true` if `code` would be accepted as an income code.
pub fn is_valid_code(code: &str) -> bool {
    validate_code(code).is_ok()
}

/// Returns `true` if `date` is a real `DD/MM/YYYY` calendar date.
pub fn is_valid_date(date: &str) -> bool {
    validate_date(date).is_ok()
}

fn validate_code(code: &str) -> Result<String, ValidationError> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(Field::Code));
    }

    let upper = trimmed.to_uppercase();
    let bytes = upper.as_bytes();
    let well_formed = bytes.len() == 5
        && bytes[..2].iter().all(u8::is_ascii_uppercase)
        && bytes[2..].iter().all(u8::is_ascii_digit);
    if !well_formed {
        return Err(ValidationError::CodeFormat(trimmed.to_string()));
    }

    Ok(upper)
}

fn validate_description(description: &str) -> Result<String, ValidationError> {
    let trimmed = description.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(Field::Description));
    }

    let len = trimmed.chars().count();
    if len > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::DescriptionTooLong {
            len,
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(trimmed.to_string())
}

fn validate_date(date: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = date.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty(Field::Date));
    }

    // DD/MM/YYYY, digits only around the separators
    let bytes = trimmed.as_bytes();
    let well_formed = bytes.len() == 10
        && bytes[2] == b'/'
        && bytes[5] == b'/'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 2 || i == 5 || b.is_ascii_digit());
    if !well_formed {
        return Err(ValidationError::DateFormat(trimmed.to_string()));
    }

    let out_of_range = || ValidationError::DateOutOfRange(trimmed.to_string());
    let day: u32 = trimmed[0..2].parse().map_err(|_| out_of_range())?;
    let month: u32 = trimmed[3..5].parse().map_err(|_| out_of_range())?;
    let year: i32 = trimmed[6..10].parse().map_err(|_| out_of_range())?;

    NaiveDate::from_ymd_opt(year, month, day)
        .filter(|d| d.year() >= 1)
        .ok_or_else(out_of_range)
}

fn validate_income_amount(amount: Decimal) -> Result<Money, ValidationError> {
    let rounded = Money::new(amount);
    if rounded <= Money::ZERO {
        return Err(ValidationError::IncomeNotPositive(rounded));
    }
    within_max(rounded, Field::IncomeAmount)
}

fn validate_withholding_amount(amount: Decimal) -> Result<Money, ValidationError> {
    if amount < Decimal::ZERO {
        return Err(ValidationError::WithholdingNegative(Money::new(amount)));
    }
    within_max(Money::new(amount), Field::WithholdingAmount)
}

fn within_max(amount: Money, field: Field) -> Result<Money, ValidationError> {
    let max = Money::max_amount();
    if amount > max {
        return Err(ValidationError::AmountTooLarge {
            field,
            value: amount,
            max,
        });
    }
    Ok(amount)
}

fn parse_amount(raw: &str, field: Field) -> Result<Decimal, ParseError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed).map_err(|_| ParseError::Number {
        field,
        value: trimmed.to_string(),
    })
}

fn edit_amount(raw: &str, field: Field) -> Result<Decimal, ValidationError> {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed).map_err(|_| ValidationError::NotANumber {
        field,
        value: trimmed.to_string(),
    })
}

/// Splits one delimited line into trimmed fields.
fn split_line(line: &str, delimiter: u8, quoting: bool) -> Result<Vec<String>, ParseError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Err(ParseError::Empty);
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .delimiter(delimiter)
        .quoting(quoting)
        .from_reader(trimmed.as_bytes());

    let mut record = StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Ok(record.iter().map(str::to_string).collect()),
        Ok(false) => Err(ParseError::Empty),
        Err(e) => Err(ParseError::Malformed(e.to_string())),
    }
}
