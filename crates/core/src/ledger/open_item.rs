//! Open-item derivation.
//!
//! Open items are the receivable/payable subledger rows derived from a
//! voucher's lines. Derivation is a pure function of the committed payload;
//! persistence replaces the full row set for the voucher on every save, so
//! the subledger can never drift from the voucher that owns it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{ClearedItemRef, VoucherHeader, VoucherLine};

/// Back-pointer payload stored alongside each open item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenItemRefs {
    /// Voucher number of the originating voucher.
    #[serde(default)]
    pub voucher_no: Option<String>,
    /// Line number of the originating line.
    #[serde(default)]
    pub line_no: u32,
    /// For a clearing line, the open items it settled.
    #[serde(default)]
    pub cleared: Vec<ClearedItemRef>,
}

/// A derived open-item row, ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenItemDraft {
    /// Line number of the originating line within its voucher.
    pub voucher_line_no: u32,
    /// Account the originating line posts to.
    pub account_code: String,
    /// First present partner reference among customer, vendor, employee.
    pub partner_id: Option<String>,
    /// Currency of the amounts.
    pub currency: String,
    /// Document date (the voucher's posting date).
    pub doc_date: NaiveDate,
    /// Due date; falls back to the posting date.
    pub payment_date: NaiveDate,
    /// Original line amount.
    pub original_amount: Decimal,
    /// Amount still open; zero for clearing lines.
    pub residual_amount: Decimal,
    /// Whether the item is settled.
    pub cleared_flag: bool,
    /// When the item was settled.
    pub cleared_at: Option<DateTime<Utc>>,
    /// Back-pointer to the originating voucher line and cleared items.
    pub refs: OpenItemRefs,
}

/// Derives the open-item rows for a voucher payload.
///
/// Qualifying lines are non-tax lines with a positive amount posted against
/// an open-item account (per the injected lookup). A clearing line's row is
/// born settled: zero residual, cleared flag set, and the settled items
/// embedded in its refs. Returns an empty set when the header has no
/// posting date.
pub fn derive_open_items<F>(
    header: &VoucherHeader,
    lines: &[VoucherLine],
    default_currency: &str,
    now: DateTime<Utc>,
    is_open_item: F,
) -> Vec<OpenItemDraft>
where
    F: Fn(&str) -> bool,
{
    let Some(doc_date) = header.posting_date else {
        return Vec::new();
    };

    let currency = header
        .currency
        .as_deref()
        .filter(|c| !c.trim().is_empty())
        .unwrap_or(default_currency);

    lines
        .iter()
        .filter(|line| !line.is_tax_line)
        .filter(|line| line.amount > Decimal::ZERO)
        .filter(|line| is_open_item(&line.account_code))
        .map(|line| {
            let cleared = line.is_clearing;
            OpenItemDraft {
                voucher_line_no: line.line_no,
                account_code: line.account_code.clone(),
                partner_id: partner_of(line),
                currency: currency.to_string(),
                doc_date,
                payment_date: line.payment_date.unwrap_or(doc_date),
                original_amount: line.amount,
                residual_amount: if cleared { Decimal::ZERO } else { line.amount },
                cleared_flag: cleared,
                cleared_at: cleared.then_some(now),
                refs: OpenItemRefs {
                    voucher_no: header.voucher_no.clone(),
                    line_no: line.line_no,
                    cleared: line.cleared_items.clone().unwrap_or_default(),
                },
            }
        })
        .collect()
}

/// First present partner reference among customer, vendor, employee.
fn partner_of(line: &VoucherLine) -> Option<String> {
    [&line.customer_id, &line.vendor_id, &line.employee_id]
        .into_iter()
        .find_map(|value| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::DrCr;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        "2026-08-05T09:00:00Z".parse().unwrap()
    }

    fn header() -> VoucherHeader {
        VoucherHeader {
            posting_date: NaiveDate::from_ymd_opt(2026, 8, 5),
            voucher_no: Some("202608-00042".to_string()),
            ..VoucherHeader::default()
        }
    }

    fn receivable_line(line_no: u32, amount: Decimal) -> VoucherLine {
        VoucherLine {
            line_no,
            account_code: "1152".to_string(),
            drcr: DrCr::Debit,
            amount,
            customer_id: Some("CUST-001".to_string()),
            ..VoucherLine::default()
        }
    }

    #[test]
    fn test_derives_item_for_open_item_account() {
        let lines = vec![receivable_line(1, dec!(1100))];
        let items = derive_open_items(&header(), &lines, "JPY", now(), |_| true);

        assert_eq!(items.len(), 1);
        let item = &items[0];
        assert_eq!(item.voucher_line_no, 1);
        assert_eq!(item.account_code, "1152");
        assert_eq!(item.partner_id.as_deref(), Some("CUST-001"));
        assert_eq!(item.original_amount, dec!(1100));
        assert_eq!(item.residual_amount, dec!(1100));
        assert!(!item.cleared_flag);
        assert!(item.cleared_at.is_none());
        assert_eq!(item.refs.voucher_no.as_deref(), Some("202608-00042"));
        assert_eq!(item.refs.line_no, 1);
    }

    #[test]
    fn test_skips_non_open_item_accounts() {
        let lines = vec![receivable_line(1, dec!(1100))];
        let items = derive_open_items(&header(), &lines, "JPY", now(), |_| false);
        assert!(items.is_empty());
    }

    #[test]
    fn test_skips_tax_lines_and_zero_amounts() {
        let mut tax_line = receivable_line(2, dec!(100));
        tax_line.is_tax_line = true;
        let zero_line = receivable_line(3, dec!(0));
        let lines = vec![receivable_line(1, dec!(1000)), tax_line, zero_line];

        let items = derive_open_items(&header(), &lines, "JPY", now(), |_| true);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].voucher_line_no, 1);
    }

    #[test]
    fn test_partner_precedence_customer_first() {
        let mut line = receivable_line(1, dec!(500));
        line.customer_id = Some("CUST-001".to_string());
        line.vendor_id = Some("VEND-009".to_string());
        let items = derive_open_items(&header(), &[line], "JPY", now(), |_| true);
        assert_eq!(items[0].partner_id.as_deref(), Some("CUST-001"));
    }

    #[test]
    fn test_partner_falls_back_to_vendor_then_employee() {
        let mut line = receivable_line(1, dec!(500));
        line.customer_id = None;
        line.vendor_id = Some(" VEND-009 ".to_string());
        let items = derive_open_items(&header(), &[line.clone()], "JPY", now(), |_| true);
        assert_eq!(items[0].partner_id.as_deref(), Some("VEND-009"));

        line.vendor_id = None;
        line.employee_id = Some("EMP-3".to_string());
        let items = derive_open_items(&header(), &[line.clone()], "JPY", now(), |_| true);
        assert_eq!(items[0].partner_id.as_deref(), Some("EMP-3"));

        line.employee_id = None;
        let items = derive_open_items(&header(), &[line], "JPY", now(), |_| true);
        assert!(items[0].partner_id.is_none());
    }

    #[test]
    fn test_payment_date_falls_back_to_posting_date() {
        let mut line = receivable_line(1, dec!(500));
        line.payment_date = None;
        let items = derive_open_items(&header(), &[line.clone()], "JPY", now(), |_| true);
        assert_eq!(items[0].payment_date, header().posting_date.unwrap());

        line.payment_date = NaiveDate::from_ymd_opt(2026, 9, 30);
        let items = derive_open_items(&header(), &[line], "JPY", now(), |_| true);
        assert_eq!(
            items[0].payment_date,
            NaiveDate::from_ymd_opt(2026, 9, 30).unwrap()
        );
    }

    #[test]
    fn test_currency_defaults() {
        let line = receivable_line(1, dec!(500));
        let items = derive_open_items(&header(), &[line.clone()], "JPY", now(), |_| true);
        assert_eq!(items[0].currency, "JPY");

        let mut h = header();
        h.currency = Some("USD".to_string());
        let items = derive_open_items(&h, &[line], "JPY", now(), |_| true);
        assert_eq!(items[0].currency, "USD");
    }

    #[test]
    fn test_clearing_line_is_born_settled() {
        let mut line = receivable_line(1, dec!(800));
        line.is_clearing = true;
        line.cleared_items = Some(vec![ClearedItemRef {
            voucher_no: "202607-00012".to_string(),
            line_no: 2,
            amount: dec!(800),
            cleared_at: now(),
        }]);

        let items = derive_open_items(&header(), &[line], "JPY", now(), |_| true);
        let item = &items[0];
        assert!(item.cleared_flag);
        assert_eq!(item.residual_amount, Decimal::ZERO);
        assert_eq!(item.original_amount, dec!(800));
        assert_eq!(item.cleared_at, Some(now()));
        assert_eq!(item.refs.cleared.len(), 1);
        assert_eq!(item.refs.cleared[0].voucher_no, "202607-00012");
    }

    #[test]
    fn test_missing_posting_date_yields_nothing() {
        let mut h = header();
        h.posting_date = None;
        let items = derive_open_items(&h, &[receivable_line(1, dec!(100))], "JPY", now(), |_| {
            true
        });
        assert!(items.is_empty());
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let lines = vec![receivable_line(1, dec!(1100)), receivable_line(2, dec!(300))];
        let first = derive_open_items(&header(), &lines, "JPY", now(), |_| true);
        let second = derive_open_items(&header(), &lines, "JPY", now(), |_| true);
        assert_eq!(first, second);
    }
}
