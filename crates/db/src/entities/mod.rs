//! `SeaORM` entity definitions for the ledger tables.

pub mod accounting_periods;
pub mod chart_of_accounts;
pub mod open_items;
pub mod voucher_sequences;
pub mod vouchers;
