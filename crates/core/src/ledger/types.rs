//! Voucher domain types.
//!
//! The voucher payload is a JSON document: a header plus an ordered line
//! array. These types are the canonical in-memory form of that document and
//! serialize to the shape persisted in the `lines` column.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::registration::RegistrationStatus;

/// Posting side of a line: debit or credit.
///
/// The side carries the sign; line amounts are non-negative magnitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrCr {
    /// Debit entry.
    #[default]
    #[serde(rename = "DR")]
    Debit,
    /// Credit entry.
    #[serde(rename = "CR")]
    Credit,
}

impl DrCr {
    /// Wire representation of the side.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debit => "DR",
            Self::Credit => "CR",
        }
    }
}

/// Accepts `DR`/`CR` case-insensitively; blank or absent defaults to debit.
fn drcr_lenient<'de, D>(deserializer: D) -> Result<DrCr, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(DrCr::Debit),
        Some(s) if s.eq_ignore_ascii_case("DR") => Ok(DrCr::Debit),
        Some(s) if s.eq_ignore_ascii_case("CR") => Ok(DrCr::Credit),
        Some(other) => Err(serde::de::Error::custom(format!(
            "invalid drcr value: {other}"
        ))),
    }
}

/// Provenance of a voucher-save request.
///
/// The trust level decides how strictly soft validations are enforced:
/// manual input fails hard on an invalid invoice registration, while agent
/// and unattended input proceed with a recorded warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoucherSource {
    /// A human entering the voucher through the UI.
    Manual,
    /// An AI agent acting on behalf of a user.
    Agent,
    /// Unattended automation, e.g. a batch importer.
    Auto,
}

impl VoucherSource {
    /// Stable key used for persistence.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Agent => "agent",
            Self::Auto => "auto",
        }
    }
}

impl std::str::FromStr for VoucherSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Self::Manual),
            "agent" => Ok(Self::Agent),
            "auto" => Ok(Self::Auto),
            other => Err(format!("unknown voucher source: {other}")),
        }
    }
}

/// Embedded tax descriptor on a voucher line.
///
/// A non-zero tax descriptor makes the normalizer synthesize a sibling tax
/// line posted against `account_code`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxInput {
    /// Tax amount (non-negative magnitude).
    pub amount: Decimal,
    /// Posting side of the tax line; defaults to the base line's side.
    #[serde(default)]
    pub side: Option<DrCr>,
    /// Account the tax line posts to.
    #[serde(default)]
    pub account_code: Option<String>,
    /// Tax classification key (e.g. purchase / sales tax kind).
    #[serde(default)]
    pub tax_type: Option<String>,
    /// Tax rate applied, as a fraction (e.g. 0.10).
    #[serde(default)]
    pub rate: Option<Decimal>,
}

/// Back-reference from a clearing line to one settled open item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedItemRef {
    /// Voucher number of the settled open item's originating voucher.
    pub voucher_no: String,
    /// Line number of the settled open item within that voucher.
    pub line_no: u32,
    /// Amount settled against the open item.
    pub amount: Decimal,
    /// When the clearing took effect.
    pub cleared_at: DateTime<Utc>,
}

/// One line of a voucher.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoucherLine {
    /// 1-based line number, reassigned on every normalize.
    #[serde(default)]
    pub line_no: u32,
    /// Account this line posts to.
    pub account_code: String,
    /// Posting side; accepts `DR`/`CR` case-insensitively, defaults to debit.
    #[serde(default, deserialize_with = "drcr_lenient")]
    pub drcr: DrCr,
    /// Non-negative amount; the side carries the sign.
    pub amount: Decimal,
    /// Customer reference, when the account requires one.
    #[serde(default)]
    pub customer_id: Option<String>,
    /// Vendor reference, when the account requires one.
    #[serde(default)]
    pub vendor_id: Option<String>,
    /// Employee reference, when the account requires one.
    #[serde(default)]
    pub employee_id: Option<String>,
    /// Department dimension, when the account requires one.
    #[serde(default)]
    pub department_id: Option<String>,
    /// Due date for receivable/payable tracking.
    #[serde(default)]
    pub payment_date: Option<NaiveDate>,
    /// Free-text note.
    #[serde(default)]
    pub note: Option<String>,
    /// Embedded tax descriptor; expanded into a sibling tax line.
    #[serde(default)]
    pub tax: Option<TaxInput>,
    /// True for synthesized tax lines.
    #[serde(default)]
    pub is_tax_line: bool,
    /// For a tax line, the line number of the base line it was derived from.
    #[serde(default)]
    pub base_line_no: Option<u32>,
    /// True when this line settles previously open items.
    #[serde(default)]
    pub is_clearing: bool,
    /// The open items this clearing line settles.
    #[serde(default)]
    pub cleared_items: Option<Vec<ClearedItemRef>>,
}

/// Voucher header fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VoucherHeader {
    /// Posting date; defaults to today when absent.
    #[serde(default)]
    pub posting_date: Option<NaiveDate>,
    /// Voucher number, unique per tenant. Assigned once; immutable except
    /// via the explicit renumber operation.
    #[serde(default)]
    pub voucher_no: Option<String>,
    /// Currency code; defaults to the tenant default.
    #[serde(default)]
    pub currency: Option<String>,
    /// One-line summary.
    #[serde(default)]
    pub summary: Option<String>,
    /// Free-text memo.
    #[serde(default)]
    pub memo: Option<String>,
    /// Invoice registration number (`T` + 13 digits), if supplied.
    #[serde(default)]
    pub registration_no: Option<String>,
    /// Outcome of the latest registry verification.
    #[serde(default)]
    pub registration_status: Option<RegistrationStatus>,
    /// When the registry was last consulted.
    #[serde(default)]
    pub registration_checked_at: Option<DateTime<Utc>>,
    /// Registrant's legal name as returned by the registry.
    #[serde(default)]
    pub registrant_name: Option<String>,
    /// Registrant's legal name in kana as returned by the registry.
    #[serde(default)]
    pub registrant_name_kana: Option<String>,
    /// First effective day of the registration.
    #[serde(default)]
    pub registration_valid_from: Option<NaiveDate>,
    /// Last effective day of the registration.
    #[serde(default)]
    pub registration_valid_to: Option<NaiveDate>,
    /// True when this voucher reverses another voucher.
    #[serde(default)]
    pub is_reversal: bool,
    /// The voucher that reversed this one, once reversed.
    #[serde(default)]
    pub reversal_voucher_id: Option<Uuid>,
    /// Creation timestamp (audit).
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Creating actor (audit).
    #[serde(default)]
    pub created_by: Option<String>,
    /// Last-update timestamp (audit).
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Last-updating actor (audit).
    #[serde(default)]
    pub updated_by: Option<String>,
}

/// Debit/credit totals of a normalized voucher.
#[derive(Debug, Clone)]
pub struct VoucherTotals {
    /// Sum of debit-side amounts, synthesized tax lines included.
    pub debit_total: Decimal,
    /// Sum of credit-side amounts, synthesized tax lines included.
    pub credit_total: Decimal,
    /// Whether debits equal credits exactly.
    pub is_balanced: bool,
}

impl VoucherTotals {
    /// Creates totals from debit and credit sums.
    #[must_use]
    pub fn new(debit_total: Decimal, credit_total: Decimal) -> Self {
        Self {
            debit_total,
            credit_total,
            is_balanced: debit_total == credit_total,
        }
    }

    /// Returns the difference between debits and credits.
    #[must_use]
    pub fn difference(&self) -> Decimal {
        self.debit_total - self.credit_total
    }
}

/// A voucher payload after normalization: canonical line set plus totals.
#[derive(Debug, Clone)]
pub struct NormalizedVoucher {
    /// Canonical line set, 1-based line numbers, tax lines appended.
    pub lines: Vec<VoucherLine>,
    /// Debit/credit totals.
    pub totals: VoucherTotals,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_drcr_default_is_debit() {
        assert_eq!(DrCr::default(), DrCr::Debit);
    }

    #[test]
    fn test_drcr_deserialize_lenient() {
        let line: VoucherLine =
            serde_json::from_str(r#"{"account_code":"1100","amount":"100","drcr":"cr"}"#).unwrap();
        assert_eq!(line.drcr, DrCr::Credit);

        let line: VoucherLine =
            serde_json::from_str(r#"{"account_code":"1100","amount":"100","drcr":" dr "}"#)
                .unwrap();
        assert_eq!(line.drcr, DrCr::Debit);

        let line: VoucherLine =
            serde_json::from_str(r#"{"account_code":"1100","amount":"100","drcr":""}"#).unwrap();
        assert_eq!(line.drcr, DrCr::Debit);

        let line: VoucherLine =
            serde_json::from_str(r#"{"account_code":"1100","amount":"100"}"#).unwrap();
        assert_eq!(line.drcr, DrCr::Debit);
    }

    #[test]
    fn test_drcr_deserialize_rejects_garbage() {
        let result = serde_json::from_str::<VoucherLine>(
            r#"{"account_code":"1100","amount":"100","drcr":"both"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_drcr_serializes_uppercase() {
        let line = VoucherLine {
            account_code: "1100".to_string(),
            amount: dec!(100),
            drcr: DrCr::Credit,
            ..VoucherLine::default()
        };
        let json = serde_json::to_value(&line).unwrap();
        assert_eq!(json["drcr"], "CR");
    }

    #[test]
    fn test_voucher_source_round_trip() {
        for source in [
            VoucherSource::Manual,
            VoucherSource::Agent,
            VoucherSource::Auto,
        ] {
            let parsed: VoucherSource = source.as_str().parse().unwrap();
            assert_eq!(parsed, source);
        }
        assert!("batch".parse::<VoucherSource>().is_err());
    }

    #[test]
    fn test_totals_balanced() {
        let totals = VoucherTotals::new(dec!(1100), dec!(1100));
        assert!(totals.is_balanced);
        assert_eq!(totals.difference(), Decimal::ZERO);
    }

    #[test]
    fn test_totals_unbalanced() {
        let totals = VoucherTotals::new(dec!(1100), dec!(1000));
        assert!(!totals.is_balanced);
        assert_eq!(totals.difference(), dec!(100));
    }
}
