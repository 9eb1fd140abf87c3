//! Edge case tests for the validation and tax pipeline.
//!
//! Exercises the public library API end to end: parse, verify, partition,
//! compute.

use rust_decimal::Decimal;
use std::io::Cursor;
use std::str::FromStr;
use wht_ledger::checksum::checksum_of;
use wht_ledger::{
    apply_edit, read_records, ChecksumEngine, Field, IncomeRecord, Money, ParseError,
    RecordFormat, TaxEngine, TaxInputError, ValidationError, Validity,
};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn money(s: &str) -> Money {
    Money::from_str(s).unwrap()
}

fn record(code: &str, income: &str, wht: &str) -> IncomeRecord {
    IncomeRecord::new(code, "Income", "25/07/2025", dec(income), dec(wht)).unwrap()
}

/// Runs the whole pipeline over CSV text and returns the net tax payable.
fn pipeline(csv: &str) -> Money {
    let mut records = read_records(Cursor::new(csv)).unwrap().records;
    let summary = ChecksumEngine::new().batch_verify(&mut records);
    TaxEngine::new().compute(summary.valid()).net_tax_payable
}

// ==================== RECORD FIELD RULES ====================

#[test]
fn test_code_accepts_exactly_two_letters_three_digits() {
    let accepted = ["IN001", "in001", " ZZ999 ", "aB000"];
    let rejected = ["", "   ", "IN0011", "I0011", "IN00", "12345", "INXYZ", "IN-01", "IN001X"];

    for code in accepted {
        assert!(
            IncomeRecord::new(code, "Work", "25/07/2025", dec("1"), dec("0")).is_ok(),
            "{code:?} should be accepted"
        );
    }
    for code in rejected {
        let err = IncomeRecord::new(code, "Work", "25/07/2025", dec("1"), dec("0")).unwrap_err();
        assert_eq!(err.field(), Field::Code, "{code:?}");
    }
}

#[test]
fn test_description_counts_characters_not_bytes() {
    // 20 multi-byte characters
    let description = "é".repeat(20);
    assert!(IncomeRecord::new("IN001", &description, "25/07/2025", dec("1"), dec("0")).is_ok());

    let description = "é".repeat(21);
    assert!(IncomeRecord::new("IN001", &description, "25/07/2025", dec("1"), dec("0")).is_err());
}

#[test]
fn test_leap_day_rules() {
    for (date, ok) in [
        ("29/02/2024", true),
        ("29/02/2000", true),
        ("29/02/1900", false),
        ("29/02/2025", false),
        ("31/04/2025", false),
        ("30/04/2025", true),
        ("31/02/2025", false),
    ] {
        let result = IncomeRecord::new("IN001", "Work", date, dec("1"), dec("0"));
        assert_eq!(result.is_ok(), ok, "{date}");
    }
}

#[test]
fn test_zero_withholding_is_allowed() {
    let rec = record("IN001", "1000", "0");
    assert_eq!(rec.withholding_amount(), Money::ZERO);
    assert_eq!(rec.net_amount().to_string(), "1000.00");
}

#[test]
fn test_withholding_may_exceed_income() {
    let rec = record("IN001", "100", "150");
    assert_eq!(rec.net_amount().to_string(), "-50.00");
}

// ==================== CHECKSUM ====================

#[test]
fn test_checksum_sample_line() {
    assert_eq!(
        checksum_of("IN001,Freelance Work,25/07/2025,10000.00,1000.00").total(),
        30
    );
}

#[test]
fn test_wrong_checksum_marks_invalid() {
    let mut rec = IncomeRecord::from_line("IN001,Freelance Work,25/07/2025,10000.00,1000.00,25")
        .unwrap();
    assert!(!ChecksumEngine::new().verify(&mut rec));
    assert_eq!(rec.validity(), Validity::Invalid);
}

#[test]
fn test_description_case_changes_checksum() {
    let engine = ChecksumEngine::new();
    let lower = IncomeRecord::new("IN001", "rent", "25/07/2025", dec("1"), dec("0")).unwrap();
    let upper = IncomeRecord::new("IN001", "RENT", "25/07/2025", dec("1"), dec("0")).unwrap();
    assert_eq!(engine.calculate(&upper), engine.calculate(&lower) + 4);
}

#[test]
fn test_amount_formatting_affects_checksum_only_through_canonical_text() {
    let engine = ChecksumEngine::new();
    let a = IncomeRecord::from_line("IN001,Work,25/07/2025,100,0").unwrap();
    let b = IncomeRecord::from_line("IN001,Work,25/07/2025,100.000,0.0").unwrap();
    assert_eq!(engine.calculate(&a), engine.calculate(&b));
}

#[test]
fn test_mark_invalid_then_correct_lifecycle() {
    let engine = ChecksumEngine::new();
    // Income was edited in the file from 10000.00 to 100000.00
    let mut rec = IncomeRecord::from_line("IN001,Freelance Work,25/07/2025,100000.00,1000.00,30")
        .unwrap();
    assert!(!engine.verify(&mut rec));

    rec = apply_edit(&rec, Field::IncomeAmount, "10000.00").unwrap();
    assert_eq!(rec.validity(), Validity::Unvalidated);
    assert!(engine.verify(&mut rec));
}

// ==================== ROUND TRIP ====================

#[test]
fn test_csv_round_trip_preserves_fields() {
    let engine = ChecksumEngine::new();
    let originals = [
        IncomeRecord::new("IN001", "Freelance Work", "25/07/2025", dec("10000"), dec("1000")).unwrap(),
        IncomeRecord::new("SA002", "Q\"uoted", "01/01/2024", dec("0.01"), dec("0")).unwrap(),
        IncomeRecord::new("WK003", "a, b, c", "31/12/2025", dec("99999.999"), dec("0.005")).unwrap(),
    ];

    for mut original in originals {
        engine.verify(&mut original);
        let line = original.serialize(RecordFormat::Csv);
        let parsed = IncomeRecord::from_line(&line).unwrap();

        assert_eq!(parsed.code(), original.code());
        assert_eq!(parsed.description(), original.description());
        assert_eq!(parsed.date(), original.date());
        assert_eq!(parsed.income_amount(), original.income_amount());
        assert_eq!(parsed.withholding_amount(), original.withholding_amount());
        assert_eq!(parsed.original_checksum(), i64::from(original.calculated_checksum()));
    }
}

// ==================== TAX ====================

#[test]
fn test_scenario_withholding_covers_tax() {
    let breakdown = TaxEngine::new().compute(&[record("IN001", "200000", "10000")]);
    assert_eq!(breakdown.net_tax_payable, money("0.00"));
}

#[test]
fn test_scenario_single_record() {
    let breakdown = TaxEngine::new().compute(&[record("IN001", "200000", "5000")]);
    assert_eq!(breakdown.net_tax_payable, money("1000.00"));
}

#[test]
fn test_scenario_two_records() {
    let breakdown = TaxEngine::new().compute(&[
        record("IN001", "100000", "2000"),
        record("SA002", "100000", "3000"),
    ]);
    assert_eq!(breakdown.total_income, money("200000.00"));
    assert_eq!(breakdown.net_tax_payable, money("1000.00"));
}

#[test]
fn test_threshold_exactly() {
    let breakdown = TaxEngine::new().compute(&[
        record("IN001", "100000.00", "0"),
        record("IN002", "50000.00", "0"),
    ]);
    assert_eq!(breakdown.taxable_income, Money::ZERO);
    assert_eq!(breakdown.net_tax_payable, Money::ZERO);
}

#[test]
fn test_one_cent_over_threshold() {
    let breakdown = TaxEngine::new().compute(&[
        record("IN001", "100000.00", "0"),
        record("IN002", "50000.01", "0"),
    ]);
    assert_eq!(breakdown.taxable_income, money("0.01"));
}

#[test]
fn test_sum_rounds_aggregate_not_addends() {
    // Each amount is already rounded at construction: 0.005 -> 0.01
    let records = [
        record("IN001", "150000.00", "0"),
        record("IN002", "0.005", "0"),
        record("IN003", "0.005", "0"),
    ];
    let breakdown = TaxEngine::new().compute(&records);
    assert_eq!(breakdown.total_income, money("150000.02"));
}

#[test]
fn test_large_withholding_never_refunds() {
    let breakdown = TaxEngine::new().compute(&[record("IN001", "1000000", "999999")]);
    assert_eq!(breakdown.net_tax_payable, Money::ZERO);
    assert!(breakdown.withholding_coverage > Decimal::ONE_HUNDRED);
}

#[test]
fn test_compute_does_not_rederive_validity() {
    // Unverified records are still summed: the caller is trusted
    let records = [record("IN001", "200000", "5000")];
    assert_eq!(records[0].validity(), Validity::Unvalidated);
    assert_eq!(TaxEngine::new().tax_payable(&records), money("1000.00"));
    assert!(matches!(
        TaxEngine::new().input_guard(&records),
        Err(TaxInputError::NotValid { .. })
    ));
}

// ==================== END TO END ====================

#[test]
fn test_pipeline_excludes_tampered_records() {
    let csv = "Income_Code,Description,Date,Income_Amount,WHT_Amount,Checksum\n\
               IN001,Freelance Work,25/07/2025,200000.00,5000.00,31\n\
               IN002,Bonus,30/07/2025,900000.00,0.00,1\n";
    assert_eq!(pipeline(csv), money("1000.00"));
}

#[test]
fn test_pipeline_skips_unparseable_lines() {
    let csv = "IN001,Freelance Work,25/07/2025,200000.00,5000.00,31\n\
               garbage\n\
               IN002,Bonus,30/07/2025,not-a-number,0.00,1\n";
    let import = read_records(Cursor::new(csv)).unwrap();
    assert_eq!(import.records.len(), 1);
    assert_eq!(import.errors.len(), 2);
    assert_eq!(
        import.errors[0].error,
        ParseError::TooFewFields { found: 1, expected: 5 }
    );
    assert_eq!(pipeline(csv), money("1000.00"));
}

#[test]
fn test_oversized_amounts_are_rejected_not_summed() {
    let csv = "IN001,Huge,25/07/2025,50000000000000000000000000000,0,0\n\
               IN002,Huge,25/07/2025,50000000000000000000000000000,0,0\n\
               IN003,Freelance Work,25/07/2025,200000.00,5000.00,31\n";
    let import = read_records(Cursor::new(csv)).unwrap();
    assert_eq!(import.records.len(), 1);
    assert_eq!(import.errors.len(), 2);
    for error in &import.errors {
        assert!(matches!(
            error.error,
            ParseError::Field(ValidationError::AmountTooLarge {
                field: Field::IncomeAmount,
                ..
            })
        ));
    }

    let breakdown = TaxEngine::new().compute(&import.records);
    assert_eq!(breakdown.record_count, 1);
}

#[test]
fn test_compute_at_max_amounts() {
    let max = Money::max_amount().to_string();
    let records: Vec<_> = (0..1000).map(|_| record("IN001", &max, &max)).collect();

    let breakdown = TaxEngine::new().compute(&records);
    assert_eq!(breakdown.total_income, money("999999999999990.00"));
    assert_eq!(breakdown.total_withholding, money("999999999999990.00"));
    assert_eq!(breakdown.net_tax_payable, Money::ZERO);
}

#[test]
fn test_negative_checksum_lands_in_invalid_list() {
    let csv = "IN001,Freelance Work,25/07/2025,10000.00,1000.00,-5\n";
    let mut import = read_records(Cursor::new(csv)).unwrap();
    assert!(import.errors.is_empty());
    assert_eq!(import.records.len(), 1);

    let summary = ChecksumEngine::new().batch_verify(&mut import.records);
    assert_eq!(summary.valid().len(), 0);
    assert_eq!(summary.invalid().len(), 1);
    assert_eq!(summary.invalid()[0].validity(), Validity::Invalid);
    assert_eq!(summary.invalid()[0].original_checksum(), -5);
}

#[test]
fn test_validation_error_reports_field() {
    let err = IncomeRecord::from_line("IN001,Work,25/07/2025,100,-5").unwrap_err();
    match err {
        ParseError::Field(ValidationError::WithholdingNegative(amount)) => {
            assert_eq!(amount, money("-5"))
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_records_are_send_and_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<IncomeRecord>();
    assert_send_sync::<wht_ledger::TaxBreakdown>();
    assert_send_sync::<wht_ledger::ValidationSummary>();
}
