//! Per-account field rules for voucher lines.
//!
//! Each account can require or hide the partner/dimension fields of lines
//! posted against it (a receivables account requires a customer, a cash
//! account hides all partners). Rules are checked in line order and the
//! first violation wins, so the user can fix their input top to bottom.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::types::VoucherLine;

/// The line fields an account can constrain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DimensionField {
    /// Customer reference.
    #[serde(rename = "customer_id")]
    Customer,
    /// Vendor reference.
    #[serde(rename = "vendor_id")]
    Vendor,
    /// Employee reference.
    #[serde(rename = "employee_id")]
    Employee,
    /// Department dimension.
    #[serde(rename = "department_id")]
    Department,
    /// Payment due date.
    #[serde(rename = "payment_date")]
    PaymentDate,
}

impl DimensionField {
    /// All constrainable fields, in validation order.
    pub const ALL: [Self; 5] = [
        Self::Customer,
        Self::Vendor,
        Self::Employee,
        Self::Department,
        Self::PaymentDate,
    ];

    /// Stable key used in rule maps and error messages.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Customer => "customer_id",
            Self::Vendor => "vendor_id",
            Self::Employee => "employee_id",
            Self::Department => "department_id",
            Self::PaymentDate => "payment_date",
        }
    }
}

impl std::fmt::Display for DimensionField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a field must be present or must be absent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldRule {
    /// The field must be present and non-empty.
    Required,
    /// The field must be absent.
    Hidden,
}

/// Per-account configuration consumed by the ledger.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccountMeta {
    /// Whether lines against this account produce open-item subledger rows.
    #[serde(default)]
    pub is_open_item: bool,
    /// Field rules keyed by dimension field.
    #[serde(default)]
    pub field_rules: HashMap<DimensionField, FieldRule>,
}

/// Validates normalized lines against their accounts' field rules.
pub struct FieldRuleValidator;

impl FieldRuleValidator {
    /// Checks every non-tax line against its account's field rules.
    ///
    /// Metadata is resolved through the injected lookup; lines whose account
    /// has no metadata (or no rules) pass. Synthesized tax lines are exempt.
    ///
    /// # Errors
    ///
    /// Returns the first violation found in line order.
    pub fn validate<F>(lines: &[VoucherLine], meta: F) -> Result<(), LedgerError>
    where
        F: Fn(&str) -> Option<AccountMeta>,
    {
        for line in lines.iter().filter(|l| !l.is_tax_line) {
            let Some(account_meta) = meta(&line.account_code) else {
                continue;
            };
            if account_meta.field_rules.is_empty() {
                continue;
            }

            for field in DimensionField::ALL {
                let Some(rule) = account_meta.field_rules.get(&field) else {
                    continue;
                };
                let present = field_present(line, field);
                match rule {
                    FieldRule::Required if !present => {
                        return Err(LedgerError::FieldRequired {
                            line_no: line.line_no,
                            account_code: line.account_code.clone(),
                            field,
                        });
                    }
                    FieldRule::Hidden if present => {
                        return Err(LedgerError::FieldHidden {
                            line_no: line.line_no,
                            account_code: line.account_code.clone(),
                            field,
                        });
                    }
                    _ => {}
                }
            }
        }

        Ok(())
    }
}

/// A field counts as present only when it is non-empty after trimming.
fn field_present(line: &VoucherLine, field: DimensionField) -> bool {
    let non_blank = |value: &Option<String>| {
        value
            .as_deref()
            .is_some_and(|s| !s.trim().is_empty())
    };

    match field {
        DimensionField::Customer => non_blank(&line.customer_id),
        DimensionField::Vendor => non_blank(&line.vendor_id),
        DimensionField::Employee => non_blank(&line.employee_id),
        DimensionField::Department => non_blank(&line.department_id),
        DimensionField::PaymentDate => line.payment_date.is_some(),
    }
}
