//! Ledger error types.
//!
//! The taxonomy matters to callers: structural and validation errors are
//! always fatal, while policy-gated errors may be downgraded to warnings
//! depending on the trust level of the request (see
//! `registration::gate_registration`).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use super::field_rules::DimensionField;

/// Errors that can occur while validating or committing a voucher.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Structural Errors ==========
    /// Voucher must have at least one line.
    #[error("Voucher must have at least one line")]
    EmptyVoucher,

    /// Line amount cannot be negative; the side carries the sign.
    #[error("Line {line_no}: amount cannot be negative")]
    NegativeAmount {
        /// 1-based line number.
        line_no: u32,
    },

    /// A line carries a tax descriptor but no tax account is configured.
    #[error("Line {line_no}: tax account is not configured")]
    TaxAccountNotConfigured {
        /// 1-based line number of the base line.
        line_no: u32,
    },

    /// Debits and credits do not balance.
    #[error("Voucher is not balanced. Debit: {debit}, Credit: {credit}")]
    Unbalanced {
        /// Total debit amount, synthesized tax lines included.
        debit: Decimal,
        /// Total credit amount, synthesized tax lines included.
        credit: Decimal,
    },

    // ========== Validation Errors ==========
    /// A field the account requires is missing.
    #[error("Line {line_no}: {field} is required for account {account_code}")]
    FieldRequired {
        /// 1-based line number.
        line_no: u32,
        /// Account whose rules were violated.
        account_code: String,
        /// The missing field.
        field: DimensionField,
    },

    /// A field the account hides was supplied.
    #[error("Line {line_no}: {field} is not allowed for account {account_code}")]
    FieldHidden {
        /// 1-based line number.
        line_no: u32,
        /// Account whose rules were violated.
        account_code: String,
        /// The forbidden field.
        field: DimensionField,
    },

    /// One or more referenced account codes do not exist.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// The registration number does not match the required format.
    #[error("Invalid invoice registration number: {0}")]
    RegistrationNumberFormat(String),

    // ========== Policy-Gated Errors ==========
    /// The registry did not confirm the registration number.
    #[error("Invoice registration {registration_no} failed verification: {message}")]
    RegistrationInvalid {
        /// The normalized registration number.
        registration_no: String,
        /// Human-readable verification outcome.
        message: String,
    },

    /// No open accounting period covers the posting date.
    #[error("No open accounting period for {0}")]
    PeriodNotOpen(NaiveDate),

    /// The accounting period covering the posting date is closed.
    #[error("Accounting period for {0} is closed")]
    PeriodClosed(NaiveDate),

    // ========== Delete Guard Errors ==========
    /// The voucher has already been reversed.
    #[error("Voucher has already been reversed")]
    AlreadyReversed,

    /// Reversal vouchers cannot be deleted directly.
    #[error("Reversal vouchers cannot be deleted")]
    CannotDeleteReversal,

    /// Open items of the voucher were cleared by another voucher.
    #[error("Voucher has open items cleared by another voucher")]
    OpenItemsCleared,
}

impl LedgerError {
    /// Returns the stable error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyVoucher => "EMPTY_VOUCHER",
            Self::NegativeAmount { .. } => "NEGATIVE_AMOUNT",
            Self::TaxAccountNotConfigured { .. } => "TAX_ACCOUNT_NOT_CONFIGURED",
            Self::Unbalanced { .. } => "UNBALANCED_VOUCHER",
            Self::FieldRequired { .. } => "FIELD_REQUIRED",
            Self::FieldHidden { .. } => "FIELD_HIDDEN",
            Self::AccountNotFound(_) => "ACCOUNT_NOT_FOUND",
            Self::RegistrationNumberFormat(_) => "REGISTRATION_NUMBER_FORMAT",
            Self::RegistrationInvalid { .. } => "REGISTRATION_INVALID",
            Self::PeriodNotOpen(_) => "PERIOD_NOT_OPEN",
            Self::PeriodClosed(_) => "PERIOD_CLOSED",
            Self::AlreadyReversed => "ALREADY_REVERSED",
            Self::CannotDeleteReversal => "CANNOT_DELETE_REVERSAL",
            Self::OpenItemsCleared => "OPEN_ITEMS_CLEARED",
        }
    }

    /// Returns true for errors whose enforcement depends on caller trust
    /// level rather than on the structure of the payload.
    #[must_use]
    pub const fn is_policy_gated(&self) -> bool {
        matches!(
            self,
            Self::RegistrationInvalid { .. } | Self::PeriodNotOpen(_) | Self::PeriodClosed(_)
        )
    }
}
