//! Voucher ledger domain logic.
//!
//! A voucher is a double-entry journal entry: a header plus a balanced set
//! of debit/credit lines. This module owns the canonical line expansion
//! (tax sub-line synthesis, line numbering, balance enforcement), per-account
//! field rules, and the derivation of open-item subledger rows.

pub mod error;
pub mod field_rules;
pub mod guard;
pub mod normalize;
pub mod open_item;
pub mod types;

pub use error::LedgerError;
pub use field_rules::{AccountMeta, DimensionField, FieldRule, FieldRuleValidator};
pub use guard::ensure_deletable;
pub use normalize::VoucherNormalizer;
pub use open_item::{derive_open_items, OpenItemDraft, OpenItemRefs};
pub use types::{
    ClearedItemRef, DrCr, NormalizedVoucher, TaxInput, VoucherHeader, VoucherLine, VoucherSource,
    VoucherTotals,
};
