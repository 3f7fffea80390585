//! Best-effort refresh of the monthly aggregate view.
//!
//! Reporting reads `gl_monthly_totals` instead of scanning vouchers. The
//! refresh runs after a voucher commit and is strictly advisory: a failure
//! leaves reporting stale but never fails or rolls back the voucher.

use async_trait::async_trait;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr};

/// Triggers a refresh of the derived monthly aggregate.
#[async_trait]
pub trait AggregateRefresher: Send + Sync {
    /// Refreshes the monthly totals consumed by reporting.
    ///
    /// `company_code` is a hint for implementations that maintain
    /// per-tenant aggregates.
    ///
    /// # Errors
    ///
    /// Returns an error if the refresh fails; callers log and swallow it.
    async fn refresh_monthly_totals(&self, company_code: Option<&str>) -> Result<(), DbErr>;
}

/// Refreshes the `gl_monthly_totals` materialized view.
#[derive(Debug, Clone)]
pub struct PgAggregateRefresher {
    db: DatabaseConnection,
}

impl PgAggregateRefresher {
    /// Creates a new refresher.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AggregateRefresher for PgAggregateRefresher {
    async fn refresh_monthly_totals(&self, _company_code: Option<&str>) -> Result<(), DbErr> {
        // CONCURRENTLY keeps readers unblocked while the view rebuilds.
        self.db
            .execute_unprepared("REFRESH MATERIALIZED VIEW CONCURRENTLY gl_monthly_totals")
            .await?;
        Ok(())
    }
}
