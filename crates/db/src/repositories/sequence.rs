//! Voucher number sequencer.
//!
//! Issues a unique, monotonically increasing voucher number per tenant and
//! posting period. The counter row is advanced with a single atomic upsert
//! so concurrent committers in the same period serialize on the row lock
//! the upsert takes; counting existing vouchers would race.

use chrono::{Datelike, NaiveDate};
use sea_orm::{ConnectionTrait, DatabaseTransaction, DbBackend, DbErr, Statement};

const NEXT_SQL: &str = r"
INSERT INTO voucher_sequences (company_code, period_key, last_no, updated_at)
VALUES ($1, $2, 1, now())
ON CONFLICT (company_code, period_key)
DO UPDATE SET last_no = voucher_sequences.last_no + 1, updated_at = now()
RETURNING last_no
";

/// Issues voucher numbers inside the engine's transaction.
pub struct VoucherNumberSequencer;

impl VoucherNumberSequencer {
    /// Returns the next voucher number for the tenant and posting period.
    ///
    /// Must be called on the transaction that commits the voucher, so an
    /// aborted commit does not burn a number ahead of a concurrent one
    /// that succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the upsert fails.
    pub async fn next(
        txn: &DatabaseTransaction,
        company_code: &str,
        posting_date: NaiveDate,
    ) -> Result<String, DbErr> {
        let key = period_key(posting_date);
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            NEXT_SQL,
            [company_code.into(), key.clone().into()],
        );

        let row = txn
            .query_one(stmt)
            .await?
            .ok_or_else(|| DbErr::Custom("voucher sequence upsert returned no row".to_string()))?;
        let last_no: i64 = row.try_get("", "last_no")?;

        Ok(format_voucher_no(&key, last_no))
    }
}

/// Period key for a posting date, e.g. `202608`.
fn period_key(date: NaiveDate) -> String {
    format!("{:04}{:02}", date.year(), date.month())
}

/// Formats a voucher number, e.g. `202608-00042`.
fn format_voucher_no(period_key: &str, seq: i64) -> String {
    format!("{period_key}-{seq:05}")
}
