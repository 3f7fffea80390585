//! Accounting-period gating decisions.
//!
//! Storage tells us whether a period row covering a date exists and whether
//! it is open; everything else is a pure decision. A missing period row
//! counts as closed, except for the current calendar month, which may be
//! auto-opened on first use.

use chrono::{Datelike, NaiveDate};

use crate::ledger::error::LedgerError;
use crate::ledger::types::{VoucherHeader, VoucherLine};

/// The stored state of the period covering a date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeriodState {
    /// A covering period exists and is open.
    Open,
    /// A covering period exists and is closed.
    Closed,
    /// No covering period exists.
    Missing,
}

/// Outcome of a create-side period check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateGate {
    /// Posting is allowed against an existing open period.
    Allowed,
    /// Posting is allowed once the current month is auto-opened.
    AutoOpen,
}

/// Decides whether a voucher may be created on `posting_date`.
///
/// # Errors
///
/// Returns `PeriodClosed` when a covering period exists but is closed, and
/// `PeriodNotOpen` when none exists outside the current month.
pub fn decide_create(
    state: PeriodState,
    posting_date: NaiveDate,
    today: NaiveDate,
) -> Result<CreateGate, LedgerError> {
    match state {
        PeriodState::Open => Ok(CreateGate::Allowed),
        PeriodState::Closed => Err(LedgerError::PeriodClosed(posting_date)),
        PeriodState::Missing if same_month(posting_date, today) => Ok(CreateGate::AutoOpen),
        PeriodState::Missing => Err(LedgerError::PeriodNotOpen(posting_date)),
    }
}

/// Decides whether an update may proceed given the old and new posting
/// dates' period states.
///
/// A closed (or missing) period tolerates text-only edits: the old side
/// additionally requires the posting date to be unchanged, the new side
/// requires only that the change is text-only.
///
/// # Errors
///
/// Returns the closed-period error for whichever side blocks the update.
pub fn decide_update(
    old_state: PeriodState,
    new_state: PeriodState,
    old_date: NaiveDate,
    new_date: NaiveDate,
    text_only: bool,
) -> Result<(), LedgerError> {
    if old_state != PeriodState::Open && !(text_only && old_date == new_date) {
        return Err(closed_error(old_state, old_date));
    }
    if new_state != PeriodState::Open && !text_only {
        return Err(closed_error(new_state, new_date));
    }
    Ok(())
}

const fn closed_error(state: PeriodState, date: NaiveDate) -> LedgerError {
    match state {
        PeriodState::Missing => LedgerError::PeriodNotOpen(date),
        _ => LedgerError::PeriodClosed(date),
    }
}

/// Returns true when both dates fall in the same calendar month.
#[must_use]
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Returns the first and last day of the month containing `date`.
#[must_use]
pub fn month_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date.with_day(1).unwrap_or(date);
    let next_month = if date.month() == 12 {
        NaiveDate::from_ymd_opt(date.year() + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(date.year(), date.month() + 1, 1)
    };
    let end = next_month
        .and_then(|d| d.pred_opt())
        .unwrap_or(start);
    (start, end)
}

/// Returns true when the two payloads differ only in free-text fields.
///
/// Free text covers the header summary and memo, line notes, the volatile
/// audit fields, and the registry verification annotations (which are
/// re-stamped on every save). Everything else - dates, accounts, amounts,
/// partners, the registration number itself - is structural.
#[must_use]
pub fn is_text_only_change(
    old_header: &VoucherHeader,
    old_lines: &[VoucherLine],
    new_header: &VoucherHeader,
    new_lines: &[VoucherLine],
) -> bool {
    if strip_header(old_header) != strip_header(new_header) {
        return false;
    }
    if old_lines.len() != new_lines.len() {
        return false;
    }
    old_lines
        .iter()
        .zip(new_lines)
        .all(|(old, new)| strip_line(old) == strip_line(new))
}

fn strip_header(header: &VoucherHeader) -> VoucherHeader {
    VoucherHeader {
        summary: None,
        memo: None,
        registration_status: None,
        registration_checked_at: None,
        registrant_name: None,
        registrant_name_kana: None,
        registration_valid_from: None,
        registration_valid_to: None,
        created_at: None,
        created_by: None,
        updated_at: None,
        updated_by: None,
        ..header.clone()
    }
}

fn strip_line(line: &VoucherLine) -> VoucherLine {
    VoucherLine {
        note: None,
        ..line.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::DrCr;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_create_open_period_allowed() {
        let result = decide_create(PeriodState::Open, date(2026, 7, 15), date(2026, 8, 5));
        assert!(matches!(result, Ok(CreateGate::Allowed)));
    }

    #[test]
    fn test_create_closed_period_rejected() {
        let result = decide_create(PeriodState::Closed, date(2026, 7, 15), date(2026, 8, 5));
        assert!(matches!(result, Err(LedgerError::PeriodClosed(_))));
    }

    #[test]
    fn test_create_missing_current_month_auto_opens() {
        let result = decide_create(PeriodState::Missing, date(2026, 8, 20), date(2026, 8, 5));
        assert!(matches!(result, Ok(CreateGate::AutoOpen)));
    }

    #[test]
    fn test_create_missing_past_month_rejected() {
        let result = decide_create(PeriodState::Missing, date(2026, 7, 31), date(2026, 8, 5));
        assert!(matches!(result, Err(LedgerError::PeriodNotOpen(_))));
    }

    #[test]
    fn test_create_missing_future_month_rejected() {
        let result = decide_create(PeriodState::Missing, date(2026, 9, 1), date(2026, 8, 5));
        assert!(matches!(result, Err(LedgerError::PeriodNotOpen(_))));
    }

    #[rstest]
    // Both periods open: any change passes.
    #[case(PeriodState::Open, PeriodState::Open, false, false, true)]
    // Old period closed: text-only with unchanged date passes.
    #[case(PeriodState::Closed, PeriodState::Closed, true, false, true)]
    // Old period closed: structural change fails.
    #[case(PeriodState::Closed, PeriodState::Closed, false, false, false)]
    // Old period closed: even a text-only edit fails when the date moved.
    #[case(PeriodState::Closed, PeriodState::Open, true, true, false)]
    // New period closed: text-only passes (date moved into closed period is
    // impossible text-only, so this is the same-date case).
    #[case(PeriodState::Open, PeriodState::Closed, true, false, true)]
    // New period closed: structural change fails.
    #[case(PeriodState::Open, PeriodState::Closed, false, true, false)]
    // Missing periods behave like closed ones.
    #[case(PeriodState::Missing, PeriodState::Missing, false, false, false)]
    #[case(PeriodState::Missing, PeriodState::Missing, true, false, true)]
    fn test_decide_update_matrix(
        #[case] old_state: PeriodState,
        #[case] new_state: PeriodState,
        #[case] text_only: bool,
        #[case] date_changed: bool,
        #[case] allowed: bool,
    ) {
        let old_date = date(2026, 7, 15);
        let new_date = if date_changed {
            date(2026, 8, 1)
        } else {
            old_date
        };
        let result = decide_update(old_state, new_state, old_date, new_date, text_only);
        assert_eq!(result.is_ok(), allowed, "{result:?}");
    }

    #[test]
    fn test_update_missing_old_period_reports_not_open() {
        let result = decide_update(
            PeriodState::Missing,
            PeriodState::Open,
            date(2026, 7, 15),
            date(2026, 7, 15),
            false,
        );
        assert!(matches!(result, Err(LedgerError::PeriodNotOpen(_))));
    }

    #[test]
    fn test_month_window() {
        assert_eq!(
            month_window(date(2026, 8, 5)),
            (date(2026, 8, 1), date(2026, 8, 31))
        );
        assert_eq!(
            month_window(date(2026, 12, 31)),
            (date(2026, 12, 1), date(2026, 12, 31))
        );
        assert_eq!(
            month_window(date(2024, 2, 10)),
            (date(2024, 2, 1), date(2024, 2, 29))
        );
    }

    #[test]
    fn test_same_month() {
        assert!(same_month(date(2026, 8, 1), date(2026, 8, 31)));
        assert!(!same_month(date(2026, 8, 1), date(2026, 9, 1)));
        assert!(!same_month(date(2025, 8, 1), date(2026, 8, 1)));
    }

    fn sample_header() -> VoucherHeader {
        VoucherHeader {
            posting_date: Some(date(2026, 7, 15)),
            voucher_no: Some("202607-00001".to_string()),
            summary: Some("Office supplies".to_string()),
            ..VoucherHeader::default()
        }
    }

    fn sample_lines() -> Vec<VoucherLine> {
        vec![
            VoucherLine {
                line_no: 1,
                account_code: "5200".to_string(),
                drcr: DrCr::Debit,
                amount: dec!(1000),
                note: Some("pens".to_string()),
                ..VoucherLine::default()
            },
            VoucherLine {
                line_no: 2,
                account_code: "1110".to_string(),
                drcr: DrCr::Credit,
                amount: dec!(1000),
                ..VoucherLine::default()
            },
        ]
    }

    #[test]
    fn test_text_only_memo_and_note_edits() {
        let old_header = sample_header();
        let old_lines = sample_lines();

        let mut new_header = old_header.clone();
        new_header.memo = Some("follow-up".to_string());
        new_header.summary = Some("Office supplies (July)".to_string());
        let mut new_lines = old_lines.clone();
        new_lines[0].note = Some("pens and paper".to_string());

        assert!(is_text_only_change(
            &old_header,
            &old_lines,
            &new_header,
            &new_lines
        ));
    }

    #[test]
    fn test_amount_change_is_structural() {
        let old_header = sample_header();
        let old_lines = sample_lines();
        let mut new_lines = old_lines.clone();
        new_lines[0].amount = dec!(2000);

        assert!(!is_text_only_change(
            &old_header,
            &old_lines,
            &old_header.clone(),
            &new_lines
        ));
    }

    #[test]
    fn test_posting_date_change_is_structural() {
        let old_header = sample_header();
        let mut new_header = old_header.clone();
        new_header.posting_date = Some(date(2026, 8, 1));

        assert!(!is_text_only_change(
            &old_header,
            &sample_lines(),
            &new_header,
            &sample_lines()
        ));
    }

    #[test]
    fn test_registration_number_change_is_structural() {
        let old_header = sample_header();
        let mut new_header = old_header.clone();
        new_header.registration_no = Some("T1234567890123".to_string());

        assert!(!is_text_only_change(
            &old_header,
            &sample_lines(),
            &new_header,
            &sample_lines()
        ));
    }

    #[test]
    fn test_verification_annotations_are_volatile() {
        let old_header = sample_header();
        let mut new_header = old_header.clone();
        new_header.registration_checked_at = Some("2026-08-05T00:00:00Z".parse().unwrap());
        new_header.registrant_name = Some("Sakura Trading K.K.".to_string());
        new_header.updated_at = Some("2026-08-05T00:00:00Z".parse().unwrap());
        new_header.updated_by = Some("agent".to_string());

        assert!(is_text_only_change(
            &old_header,
            &sample_lines(),
            &new_header,
            &sample_lines()
        ));
    }

    #[test]
    fn test_added_line_is_structural() {
        let old_lines = sample_lines();
        let mut new_lines = old_lines.clone();
        new_lines.push(old_lines[0].clone());

        assert!(!is_text_only_change(
            &sample_header(),
            &old_lines,
            &sample_header(),
            &new_lines
        ));
    }
}
