//! Threshold/flat-rate tax calculation over verified income records.
//!
//! ```text
//! taxable  = max(0, total income - 150,000.00)
//! gross    = taxable * 12%
//! payable  = max(0, round2(gross - total withholding))
//! ```
//!
//! Aggregates are rounded after summation, never per addend. The engine never
//! produces a refund.

use crate::error::TaxInputError;
use crate::money::Money;
use crate::record::{IncomeRecord, Validity};
use log::{debug, info};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// Income up to this amount (in cents) is not taxed.
pub const TAX_FREE_THRESHOLD_CENTS: i64 = 15_000_000;

/// Flat tax rate on income above the threshold, in percent.
pub const TAX_RATE_PERCENT: i64 = 12;

/// Computes tax liability from a set of records the caller has verified.
///
/// Holds no state between calls; `compute` is a read-only reduction and may be
/// called concurrently on the same input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxEngine {
    threshold: Money,
    rate: Decimal,
}

impl TaxEngine {
    /// Creates an engine with the statutory threshold and rate.
    pub fn new() -> Self {
        TaxEngine {
            threshold: Money::from_cents(TAX_FREE_THRESHOLD_CENTS),
            rate: Decimal::new(TAX_RATE_PERCENT, 2),
        }
    }

    pub fn threshold(&self) -> Money {
        self.threshold
    }

    /// The rate as a fraction, e.g. `0.12`.
    pub fn rate(&self) -> Decimal {
        self.rate
    }

    /// Full breakdown for `records`.
    ///
    /// Validity is not re-derived here: callers pass only records that passed
    /// verification, or check with [`input_guard`](Self::input_guard) first.
    /// An empty set yields a zero breakdown.
    pub fn compute(&self, records: &[IncomeRecord]) -> TaxBreakdown {
        if records.is_empty() {
            info!("No records provided for tax calculation");
            return TaxBreakdown::empty(self.threshold, self.rate);
        }

        let total_income: Money = records.iter().map(IncomeRecord::income_amount).sum();
        let total_withholding: Money = records.iter().map(IncomeRecord::withholding_amount).sum();
        let taxable_income = self.taxable_income(total_income);
        let gross_tax = taxable_income.amount() * self.rate;
        let net_tax_payable = net_payable(gross_tax, total_withholding);

        let count = Decimal::from(records.len() as u64);
        let effective_rate = if total_income.is_zero() {
            Decimal::ZERO
        } else {
            net_tax_payable.amount() / total_income.amount() * Decimal::ONE_HUNDRED
        };
        let withholding_coverage = if gross_tax.is_zero() {
            Decimal::ZERO
        } else {
            total_withholding.amount() / gross_tax * Decimal::ONE_HUNDRED
        };

        debug!(
            "Tax over {} records: income {}, WHT {}, taxable {}, gross {}",
            records.len(),
            total_income,
            total_withholding,
            taxable_income,
            gross_tax
        );
        info!(
            "Tax calculation completed: {} records, tax payable Rs {}",
            records.len(),
            net_tax_payable.grouped()
        );

        TaxBreakdown {
            record_count: records.len(),
            total_income,
            tax_free_threshold: self.threshold,
            taxable_income,
            tax_rate: self.rate,
            gross_tax,
            total_withholding,
            net_tax_payable,
            average_income: total_income.amount() / count,
            average_withholding: total_withholding.amount() / count,
            effective_rate,
            withholding_coverage,
        }
    }

    /// Net tax payable for `records`.
    pub fn tax_payable(&self, records: &[IncomeRecord]) -> Money {
        self.compute(records).net_tax_payable
    }

    /// Net tax payable from already-aggregated totals.
    pub fn calculate(&self, total_income: Money, total_withholding: Money) -> Money {
        let gross_tax = self.taxable_income(total_income).amount() * self.rate;
        net_payable(gross_tax, total_withholding)
    }

    /// Income above the threshold, never negative.
    pub fn taxable_income(&self, total_income: Money) -> Money {
        (total_income - self.threshold).max(Money::ZERO)
    }

    pub fn is_above_threshold(&self, income: Money) -> bool {
        income > self.threshold
    }

    /// Withholding needed for the gross tax on `total_income` to be fully covered.
    pub fn required_withholding(&self, total_income: Money) -> Decimal {
        self.taxable_income(total_income).amount() * self.rate
    }

    /// Tax payable, with no withholding, at `base + increment` for each increment.
    pub fn simulate(&self, base: Money, increments: &[Money]) -> Vec<TaxScenario> {
        increments
            .iter()
            .map(|&increment| {
                let income = base + increment;
                let tax_payable = self.calculate(income, Money::ZERO);
                let effective_rate = if income > Money::ZERO {
                    tax_payable.amount() / income.amount() * Decimal::ONE_HUNDRED
                } else {
                    Decimal::ZERO
                };
                TaxScenario {
                    income,
                    taxable_income: self.taxable_income(income),
                    tax_payable,
                    effective_rate,
                }
            })
            .collect()
    }

    /// Checks that `records` is fit for [`compute`](Self::compute).
    ///
    /// Fails on an empty set, on any record whose last verification did not
    /// pass, and on any negative amount.
    pub fn input_guard(&self, records: &[IncomeRecord]) -> Result<(), TaxInputError> {
        if records.is_empty() {
            return Err(TaxInputError::Empty);
        }

        for record in records {
            if record.validity() != Validity::Valid {
                return Err(TaxInputError::NotValid {
                    code: record.code().to_string(),
                    validity: record.validity(),
                });
            }
            if record.income_amount().is_negative() || record.withholding_amount().is_negative() {
                return Err(TaxInputError::NegativeAmount {
                    code: record.code().to_string(),
                });
            }
        }

        Ok(())
    }
}

impl Default for TaxEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn net_payable(gross_tax: Decimal, total_withholding: Money) -> Money {
    Money::new(gross_tax - total_withholding.amount()).max(Money::ZERO)
}

/// Rounds half away from zero and formats with exactly `dp` decimals.
fn fixed(value: Decimal, dp: u32) -> String {
    let rounded = value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.*}", dp as usize, rounded)
}

/// Result of one [`TaxEngine::compute`] call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxBreakdown {
    pub record_count: usize,
    pub total_income: Money,
    pub tax_free_threshold: Money,
    pub taxable_income: Money,
    /// Fraction, e.g. `0.12`.
    pub tax_rate: Decimal,
    /// Unrounded `taxable_income * tax_rate`.
    pub gross_tax: Decimal,
    pub total_withholding: Money,
    pub net_tax_payable: Money,
    pub average_income: Decimal,
    pub average_withholding: Decimal,
    /// Net tax payable as a percentage of total income.
    pub effective_rate: Decimal,
    /// Total withholding as a percentage of gross tax.
    pub withholding_coverage: Decimal,
}

impl TaxBreakdown {
    fn empty(threshold: Money, rate: Decimal) -> Self {
        TaxBreakdown {
            record_count: 0,
            total_income: Money::ZERO,
            tax_free_threshold: threshold,
            taxable_income: Money::ZERO,
            tax_rate: rate,
            gross_tax: Decimal::ZERO,
            total_withholding: Money::ZERO,
            net_tax_payable: Money::ZERO,
            average_income: Decimal::ZERO,
            average_withholding: Decimal::ZERO,
            effective_rate: Decimal::ZERO,
            withholding_coverage: Decimal::ZERO,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.record_count == 0
    }

    /// Human-readable report.
    pub fn render(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TaxBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "No records available for tax calculation.");
        }

        let rs = |value: Decimal| format!("Rs {}", Money::new(value).grouped());

        writeln!(f, "TAX CALCULATION SUMMARY")?;
        writeln!(f, "=======================")?;
        writeln!(f)?;
        writeln!(f, "Input Data:")?;
        writeln!(f, "  Number of Records: {}", self.record_count)?;
        writeln!(f, "  Total Income: Rs {}", self.total_income.grouped())?;
        writeln!(f, "  Total WHT Paid: Rs {}", self.total_withholding.grouped())?;
        writeln!(f)?;
        writeln!(f, "Tax Calculation:")?;
        writeln!(f, "  Tax-Free Threshold: Rs {}", self.tax_free_threshold.grouped())?;
        writeln!(f, "  Taxable Income: Rs {}", self.taxable_income.grouped())?;
        writeln!(f, "  Tax Rate: {}%", fixed(self.tax_rate * Decimal::ONE_HUNDRED, 1))?;
        writeln!(f, "  Gross Tax: {}", rs(self.gross_tax))?;
        writeln!(f, "  Less: WHT Paid: Rs {}", self.total_withholding.grouped())?;
        writeln!(f, "  NET TAX PAYABLE: Rs {}", self.net_tax_payable.grouped())?;
        writeln!(f)?;
        writeln!(f, "Statistics:")?;
        writeln!(f, "  Average Income per Record: {}", rs(self.average_income))?;
        writeln!(f, "  Average WHT per Record: {}", rs(self.average_withholding))?;
        writeln!(f, "  Effective Tax Rate: {}%", fixed(self.effective_rate, 2))?;
        write!(f, "  WHT Coverage: {}%", fixed(self.withholding_coverage, 1))
    }
}

/// One row of [`TaxEngine::simulate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaxScenario {
    pub income: Money,
    pub taxable_income: Money,
    pub tax_payable: Money,
    pub effective_rate: Decimal,
}

impl fmt::Display for TaxScenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "income {}, taxable {}, tax {}, rate {}%",
            self.income,
            self.taxable_income,
            self.tax_payable,
            fixed(self.effective_rate, 2)
        )
    }
}
