//! Accounting-period repository.
//!
//! Storage-level lookups for the period gate plus the open/close
//! maintenance operations. The gating decisions themselves are pure and
//! live in `kicho_core::period`.

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use kicho_core::period::{month_window, PeriodState};

use crate::entities::accounting_periods;

/// Error types for period maintenance operations.
#[derive(Debug, thiserror::Error)]
pub enum PeriodError {
    /// No period row matches the requested range.
    #[error("Accounting period {start_date}..{end_date} not found for {company_code}")]
    NotFound {
        /// Tenant key.
        company_code: String,
        /// Requested period start.
        start_date: NaiveDate,
        /// Requested period end.
        end_date: NaiveDate,
    },

    /// Start date must not be after end date.
    #[error("Start date must not be after end date")]
    InvalidDateRange,

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Accounting-period repository.
#[derive(Debug, Clone)]
pub struct PeriodRepository {
    db: DatabaseConnection,
}

impl PeriodRepository {
    /// Creates a new period repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds the period covering a date.
    ///
    /// When overlapping definitions exist, the most recently starting
    /// period wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_covering<C: ConnectionTrait>(
        &self,
        conn: &C,
        company_code: &str,
        date: NaiveDate,
    ) -> Result<Option<accounting_periods::Model>, DbErr> {
        accounting_periods::Entity::find()
            .filter(accounting_periods::Column::CompanyCode.eq(company_code))
            .filter(accounting_periods::Column::StartDate.lte(date))
            .filter(accounting_periods::Column::EndDate.gte(date))
            .order_by_desc(accounting_periods::Column::StartDate)
            .one(conn)
            .await
    }

    /// Resolves the gate state of the period covering a date.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn state_for<C: ConnectionTrait>(
        &self,
        conn: &C,
        company_code: &str,
        date: NaiveDate,
    ) -> Result<PeriodState, DbErr> {
        let state = match self.find_covering(conn, company_code, date).await? {
            Some(period) if period.is_open => PeriodState::Open,
            Some(_) => PeriodState::Closed,
            None => PeriodState::Missing,
        };
        Ok(state)
    }

    /// Auto-opens the calendar month containing `date`.
    ///
    /// Used by the create gate when the current month has no period row
    /// yet. Runs on the caller's transaction so the voucher commit and the
    /// period creation are atomic.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn open_month<C: ConnectionTrait>(
        &self,
        conn: &C,
        company_code: &str,
        date: NaiveDate,
    ) -> Result<accounting_periods::Model, DbErr> {
        let (start_date, end_date) = month_window(date);
        let now = chrono::Utc::now().into();

        let active = accounting_periods::ActiveModel {
            id: Set(Uuid::now_v7()),
            company_code: Set(company_code.to_string()),
            start_date: Set(start_date),
            end_date: Set(end_date),
            is_open: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        active.insert(conn).await
    }

    /// Opens (or re-opens) a period for the exact range.
    ///
    /// # Errors
    ///
    /// Returns an error when the range is invalid or the database
    /// operation fails.
    pub async fn open_period(
        &self,
        company_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<accounting_periods::Model, PeriodError> {
        if start_date > end_date {
            return Err(PeriodError::InvalidDateRange);
        }

        match self.find_exact(company_code, start_date, end_date).await? {
            Some(period) => {
                let mut active: accounting_periods::ActiveModel = period.into();
                active.is_open = Set(true);
                active.updated_at = Set(chrono::Utc::now().into());
                Ok(active.update(&self.db).await?)
            }
            None => {
                let now = chrono::Utc::now().into();
                let active = accounting_periods::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    company_code: Set(company_code.to_string()),
                    start_date: Set(start_date),
                    end_date: Set(end_date),
                    is_open: Set(true),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                Ok(active.insert(&self.db).await?)
            }
        }
    }

    /// Closes the period with the exact range.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` when no period row matches the range.
    pub async fn close_period(
        &self,
        company_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<accounting_periods::Model, PeriodError> {
        let period = self
            .find_exact(company_code, start_date, end_date)
            .await?
            .ok_or_else(|| PeriodError::NotFound {
                company_code: company_code.to_string(),
                start_date,
                end_date,
            })?;

        let mut active: accounting_periods::ActiveModel = period.into();
        active.is_open = Set(false);
        active.updated_at = Set(chrono::Utc::now().into());
        Ok(active.update(&self.db).await?)
    }

    async fn find_exact(
        &self,
        company_code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Option<accounting_periods::Model>, DbErr> {
        accounting_periods::Entity::find()
            .filter(accounting_periods::Column::CompanyCode.eq(company_code))
            .filter(accounting_periods::Column::StartDate.eq(start_date))
            .filter(accounting_periods::Column::EndDate.eq(end_date))
            .one(&self.db)
            .await
    }
}
