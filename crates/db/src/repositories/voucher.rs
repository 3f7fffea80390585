//! Voucher repository: the ledger engine.
//!
//! Owns the transaction boundary for every voucher commit. A save runs
//! registration verification outside the transaction (its result is just
//! data stamped on the header), then inside one transaction: period gate,
//! normalization, field rules, account existence, numbering, the row
//! write, and the open-item rebuild. The aggregate refresh and warning
//! task run after commit and never fail the call.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;

use kicho_core::ledger::{
    derive_open_items, ensure_deletable, AccountMeta, FieldRuleValidator, LedgerError,
    VoucherHeader, VoucherLine, VoucherNormalizer, VoucherSource,
};
use kicho_core::period::{self, CreateGate};
use kicho_core::registration::{self, RegistrationCheck, RegistrationStatus, RegistrationWarning};
use kicho_shared::registry::RegistryVerifier;
use kicho_shared::types::VoucherId;

use crate::entities::vouchers;

use super::account::{AccountError, AccountRepository};
use super::open_item::OpenItemRepository;
use super::period::PeriodRepository;
use super::refresh::AggregateRefresher;
use super::sequence::VoucherNumberSequencer;
use super::warning::{WarningTask, WarningTaskSink};

/// Error types for voucher operations.
#[derive(Debug, thiserror::Error)]
pub enum VoucherError {
    /// A ledger validation or policy error.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Voucher not found.
    #[error("Voucher not found: {0}")]
    NotFound(Uuid),

    /// The requested voucher number is taken by another voucher.
    #[error("Voucher number {0} is already in use")]
    DuplicateVoucherNo(String),

    /// The stored line payload could not be decoded.
    #[error("Stored voucher payload is invalid: {0}")]
    Payload(String),

    /// An account repository error.
    #[error(transparent)]
    Account(#[from] AccountError),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl VoucherError {
    /// Returns the stable error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Ledger(inner) => inner.error_code(),
            Self::NotFound(_) => "VOUCHER_NOT_FOUND",
            Self::DuplicateVoucherNo(_) => "DUPLICATE_VOUCHER_NO",
            Self::Payload(_) => "INVALID_PAYLOAD",
            Self::Account(AccountError::NotFound(_)) => "ACCOUNT_NOT_FOUND",
            Self::Account(AccountError::InvalidFieldRules { .. }) => "INVALID_FIELD_RULES",
            Self::Account(AccountError::Database(_)) | Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns true if the caller should retry with fresh data.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::DuplicateVoucherNo(_))
    }
}

/// Input for creating a voucher.
#[derive(Debug, Clone)]
pub struct CreateVoucherInput {
    /// Tenant key.
    pub company_code: String,
    /// Raw header.
    pub header: VoucherHeader,
    /// Raw line array.
    pub lines: Vec<VoucherLine>,
    /// Trust level of the request.
    pub source: VoucherSource,
    /// Acting user, for the audit fields.
    pub actor: Option<String>,
}

/// Input for updating a voucher.
#[derive(Debug, Clone)]
pub struct UpdateVoucherInput {
    /// Raw header; immutable fields are overwritten from the stored row.
    pub header: VoucherHeader,
    /// Raw line array, re-normalized on save.
    pub lines: Vec<VoucherLine>,
    /// Trust level of the request.
    pub source: VoucherSource,
    /// Acting user, for the audit fields.
    pub actor: Option<String>,
}

/// Result of a voucher save.
#[derive(Debug)]
pub struct VoucherSaveResult {
    /// The committed voucher row.
    pub voucher: vouchers::Model,
    /// Non-fatal registration warning carried forward for agent and
    /// unattended sources.
    pub warning: Option<RegistrationWarning>,
}

/// A voucher row with its decoded line set.
#[derive(Debug, Clone)]
pub struct VoucherWithLines {
    /// The voucher row.
    pub voucher: vouchers::Model,
    /// The decoded canonical line set.
    pub lines: Vec<VoucherLine>,
}

/// Filter options for listing vouchers.
#[derive(Debug, Clone, Default)]
pub struct VoucherFilter {
    /// Filter by posting date range start.
    pub date_from: Option<NaiveDate>,
    /// Filter by posting date range end.
    pub date_to: Option<NaiveDate>,
    /// Filter by request source.
    pub source: Option<VoucherSource>,
}

/// Voucher repository and ledger engine.
#[derive(Clone)]
pub struct VoucherRepository {
    db: DatabaseConnection,
    accounts: AccountRepository,
    periods: PeriodRepository,
    registry: Arc<dyn RegistryVerifier>,
    warning_sink: Arc<dyn WarningTaskSink>,
    refresher: Arc<dyn AggregateRefresher>,
    default_currency: String,
}

impl VoucherRepository {
    /// Creates a new voucher repository.
    #[must_use]
    pub fn new(
        db: DatabaseConnection,
        accounts: AccountRepository,
        periods: PeriodRepository,
        registry: Arc<dyn RegistryVerifier>,
        warning_sink: Arc<dyn WarningTaskSink>,
        refresher: Arc<dyn AggregateRefresher>,
        default_currency: String,
    ) -> Self {
        Self {
            db,
            accounts,
            periods,
            registry,
            warning_sink,
            refresher,
            default_currency,
        }
    }

    /// Creates a voucher.
    ///
    /// # Errors
    ///
    /// Returns structural, validation, and policy errors per the ledger
    /// taxonomy; nothing is persisted on error.
    pub async fn create_voucher(
        &self,
        input: CreateVoucherInput,
    ) -> Result<VoucherSaveResult, VoucherError> {
        let CreateVoucherInput {
            company_code,
            mut header,
            lines,
            source,
            actor,
        } = input;
        let now = Utc::now();
        let today = now.date_naive();

        header.created_at = Some(now);
        header.created_by = actor.clone();
        header.updated_at = Some(now);
        header.updated_by = actor;
        let posting_date = header.posting_date.unwrap_or(today);
        header.posting_date = Some(posting_date);
        header.currency = Some(self.currency_of(&header));

        let check = self.check_registration(&mut header, today, now).await?;
        let warning = registration::gate_registration(source, &check)?;

        let normalized = VoucherNormalizer::normalize(&lines)?;

        let txn = self.db.begin().await?;
        self.ensure_create_allowed(&txn, &company_code, posting_date, today)
            .await?;
        let metas = self.validate_lines(&company_code, &normalized.lines).await?;

        let voucher_no = VoucherNumberSequencer::next(&txn, &company_code, posting_date).await?;
        header.voucher_no = Some(voucher_no);

        let voucher_id = VoucherId::new();
        let model = self
            .insert_voucher(&txn, voucher_id, &company_code, source, &header, &normalized.lines)
            .await?;

        let drafts = derive_open_items(&header, &normalized.lines, &self.default_currency, now, |code| {
            metas.get(code).is_some_and(|m| m.is_open_item)
        });
        OpenItemRepository::rebuild(&txn, &company_code, voucher_id, &drafts).await?;
        txn.commit().await?;

        self.spawn_aggregate_refresh(&company_code);
        if source == VoucherSource::Auto {
            if let Some(warning) = &warning {
                self.emit_warning_task(&company_code, &model, warning).await;
            }
        }

        Ok(VoucherSaveResult {
            voucher: model,
            warning,
        })
    }

    /// Updates a voucher in place, re-running the full validation pipeline.
    ///
    /// The target row is locked for the duration of the transaction so
    /// concurrent editors serialize. Voucher number, tenant, reversal
    /// markers, and the create-audit fields always come from the stored
    /// row and cannot be changed through this path.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown voucher, otherwise the same
    /// taxonomy as create plus the update-path period gate.
    pub async fn update_voucher(
        &self,
        company_code: &str,
        voucher_id: VoucherId,
        input: UpdateVoucherInput,
    ) -> Result<VoucherSaveResult, VoucherError> {
        let UpdateVoucherInput {
            mut header,
            lines,
            source,
            actor,
        } = input;
        let now = Utc::now();
        let today = now.date_naive();

        let check = self.check_registration(&mut header, today, now).await?;
        let warning = registration::gate_registration(source, &check)?;

        let normalized = VoucherNormalizer::normalize(&lines)?;

        let txn = self.db.begin().await?;
        let existing = Self::lock_voucher(&txn, company_code, voucher_id).await?;

        header.voucher_no = Some(existing.voucher_no.clone());
        header.is_reversal = existing.is_reversal;
        header.reversal_voucher_id = existing.reversal_voucher_id;
        header.created_at = Some(existing.created_at.with_timezone(&Utc));
        header.created_by = existing.created_by.clone();
        header.updated_at = Some(now);
        header.updated_by = actor;
        let posting_date = header.posting_date.unwrap_or(existing.posting_date);
        header.posting_date = Some(posting_date);
        // Compare effective values: an omitted currency means the default,
        // not a change.
        header.currency = Some(self.currency_of(&header));

        let old_header = header_from_model(&existing);
        let old_lines = lines_from_model(&existing)?;
        let old_state = self
            .periods
            .state_for(&txn, company_code, existing.posting_date)
            .await?;
        let new_state = self.periods.state_for(&txn, company_code, posting_date).await?;
        let text_only =
            period::is_text_only_change(&old_header, &old_lines, &header, &normalized.lines);
        period::decide_update(
            old_state,
            new_state,
            existing.posting_date,
            posting_date,
            text_only,
        )?;

        let metas = self.validate_lines(company_code, &normalized.lines).await?;

        let mut active: vouchers::ActiveModel = existing.into();
        active.posting_date = Set(posting_date);
        active.currency = Set(self.currency_of(&header));
        active.lines = Set(lines_to_json(&normalized.lines)?);
        apply_header_columns(&mut active, &header);
        let model = active.update(&txn).await?;

        let drafts = derive_open_items(&header, &normalized.lines, &self.default_currency, now, |code| {
            metas.get(code).is_some_and(|m| m.is_open_item)
        });
        OpenItemRepository::rebuild(&txn, company_code, voucher_id, &drafts).await?;
        txn.commit().await?;

        self.spawn_aggregate_refresh(company_code);
        if source == VoucherSource::Auto {
            if let Some(warning) = &warning {
                self.emit_warning_task(company_code, &model, warning).await;
            }
        }

        Ok(VoucherSaveResult {
            voucher: model,
            warning,
        })
    }

    /// Changes a voucher's number without touching the rest of the payload.
    ///
    /// No-op when the new number equals the current one. The line set is
    /// not re-normalized; only the tenant-wide uniqueness of the number
    /// and the period gate are enforced.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateVoucherNo` when another voucher of the tenant
    /// already carries the number, and the period errors when the
    /// voucher's period is closed.
    pub async fn update_voucher_number(
        &self,
        company_code: &str,
        voucher_id: VoucherId,
        new_voucher_no: &str,
        actor: Option<String>,
    ) -> Result<vouchers::Model, VoucherError> {
        let now = Utc::now();
        let txn = self.db.begin().await?;
        let existing = Self::lock_voucher(&txn, company_code, voucher_id).await?;

        if existing.voucher_no == new_voucher_no {
            txn.commit().await?;
            return Ok(existing);
        }

        let duplicate = vouchers::Entity::find()
            .filter(vouchers::Column::CompanyCode.eq(company_code))
            .filter(vouchers::Column::VoucherNo.eq(new_voucher_no))
            .filter(vouchers::Column::Id.ne(voucher_id.into_inner()))
            .one(&txn)
            .await?;
        if duplicate.is_some() {
            return Err(VoucherError::DuplicateVoucherNo(new_voucher_no.to_string()));
        }

        // Renumbering is not a text-only edit, so a closed or missing
        // period blocks it.
        let state = self
            .periods
            .state_for(&txn, company_code, existing.posting_date)
            .await?;
        period::decide_update(
            state,
            state,
            existing.posting_date,
            existing.posting_date,
            false,
        )?;

        let mut active: vouchers::ActiveModel = existing.into();
        active.voucher_no = Set(new_voucher_no.to_string());
        active.updated_by = Set(actor);
        active.updated_at = Set(now.into());
        let model = active.update(&txn).await?;

        OpenItemRepository::update_origin_voucher_no(&txn, company_code, voucher_id, new_voucher_no)
            .await?;
        txn.commit().await?;

        Ok(model)
    }

    /// Deletes a voucher and its open items.
    ///
    /// # Errors
    ///
    /// Returns `AlreadyReversed` / `CannotDeleteReversal` for reversed and
    /// reversal vouchers, `OpenItemsCleared` when another voucher cleared
    /// any of its items, and the create-side period errors for a closed
    /// period.
    pub async fn delete_voucher(
        &self,
        company_code: &str,
        voucher_id: VoucherId,
    ) -> Result<(), VoucherError> {
        let today = Utc::now().date_naive();
        let txn = self.db.begin().await?;
        let existing = Self::lock_voucher(&txn, company_code, voucher_id).await?;

        let cleared_by_other =
            OpenItemRepository::has_items_cleared_by_other(&txn, company_code, voucher_id).await?;
        ensure_deletable(&header_from_model(&existing), cleared_by_other)?;
        self.ensure_create_allowed(&txn, company_code, existing.posting_date, today)
            .await?;

        OpenItemRepository::delete_for_voucher(&txn, company_code, voucher_id).await?;
        vouchers::Entity::delete_by_id(existing.id).exec(&txn).await?;
        txn.commit().await?;

        self.spawn_aggregate_refresh(company_code);
        Ok(())
    }

    /// Gets a voucher with its decoded line set.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown voucher.
    pub async fn get_voucher(
        &self,
        company_code: &str,
        voucher_id: VoucherId,
    ) -> Result<VoucherWithLines, VoucherError> {
        let model = vouchers::Entity::find_by_id(voucher_id.into_inner())
            .filter(vouchers::Column::CompanyCode.eq(company_code))
            .one(&self.db)
            .await?
            .ok_or(VoucherError::NotFound(voucher_id.into_inner()))?;

        let lines = lines_from_model(&model)?;
        Ok(VoucherWithLines {
            voucher: model,
            lines,
        })
    }

    /// Lists vouchers, newest posting date first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_vouchers(
        &self,
        company_code: &str,
        filter: VoucherFilter,
    ) -> Result<Vec<vouchers::Model>, VoucherError> {
        let mut query =
            vouchers::Entity::find().filter(vouchers::Column::CompanyCode.eq(company_code));

        if let Some(date_from) = filter.date_from {
            query = query.filter(vouchers::Column::PostingDate.gte(date_from));
        }
        if let Some(date_to) = filter.date_to {
            query = query.filter(vouchers::Column::PostingDate.lte(date_to));
        }
        if let Some(source) = filter.source {
            query = query.filter(vouchers::Column::Source.eq(source.as_str()));
        }

        let models = query
            .order_by_desc(vouchers::Column::PostingDate)
            .order_by_desc(vouchers::Column::CreatedAt)
            .all(&self.db)
            .await?;
        Ok(models)
    }

    // ========================================================================
    // Pipeline steps
    // ========================================================================

    /// Runs registration verification and stamps the header annotations.
    ///
    /// The registry lookup happens before the database transaction opens;
    /// its result is just data.
    async fn check_registration(
        &self,
        header: &mut VoucherHeader,
        today: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<RegistrationCheck, VoucherError> {
        match registration::prepare(header)? {
            None => Ok(RegistrationCheck::absent()),
            Some(number) => {
                let outcome = self
                    .registry
                    .verify(&number)
                    .await
                    .map_err(|e| e.to_string());
                Ok(registration::apply_lookup(header, &number, outcome, today, now))
            }
        }
    }

    /// Applies the create-side period gate, auto-opening the current month.
    async fn ensure_create_allowed(
        &self,
        txn: &DatabaseTransaction,
        company_code: &str,
        posting_date: NaiveDate,
        today: NaiveDate,
    ) -> Result<(), VoucherError> {
        let state = self.periods.state_for(txn, company_code, posting_date).await?;
        match period::decide_create(state, posting_date, today)? {
            CreateGate::Allowed => Ok(()),
            CreateGate::AutoOpen => {
                self.periods.open_month(txn, company_code, posting_date).await?;
                Ok(())
            }
        }
    }

    /// Field rules and account existence over the normalized line set.
    ///
    /// Returns the account metadata map so the open-item derivation can
    /// reuse it.
    async fn validate_lines(
        &self,
        company_code: &str,
        lines: &[VoucherLine],
    ) -> Result<HashMap<String, AccountMeta>, VoucherError> {
        let mut codes: Vec<String> = Vec::new();
        for line in lines {
            if !codes.contains(&line.account_code) {
                codes.push(line.account_code.clone());
            }
        }

        let metas = self.accounts.metas(company_code, &codes).await?;
        FieldRuleValidator::validate(lines, |code| metas.get(code).cloned())?;

        let missing = self.accounts.find_missing(company_code, &codes).await?;
        if !missing.is_empty() {
            return Err(LedgerError::AccountNotFound(missing.join(", ")).into());
        }

        Ok(metas)
    }

    async fn insert_voucher(
        &self,
        txn: &DatabaseTransaction,
        voucher_id: VoucherId,
        company_code: &str,
        source: VoucherSource,
        header: &VoucherHeader,
        lines: &[VoucherLine],
    ) -> Result<vouchers::Model, VoucherError> {
        let created_at = header.created_at.unwrap_or_else(Utc::now);

        let mut active = vouchers::ActiveModel {
            id: Set(voucher_id.into_inner()),
            company_code: Set(company_code.to_string()),
            voucher_no: Set(header.voucher_no.clone().unwrap_or_default()),
            posting_date: Set(header.posting_date.unwrap_or_else(|| created_at.date_naive())),
            currency: Set(self.currency_of(header)),
            source: Set(source.as_str().to_string()),
            is_reversal: Set(header.is_reversal),
            reversal_voucher_id: Set(header.reversal_voucher_id),
            lines: Set(lines_to_json(lines)?),
            created_by: Set(header.created_by.clone()),
            created_at: Set(created_at.into()),
            ..Default::default()
        };
        apply_header_columns(&mut active, header);

        Ok(active.insert(txn).await?)
    }

    /// Loads the voucher row under a row-level exclusive lock.
    async fn lock_voucher(
        txn: &DatabaseTransaction,
        company_code: &str,
        voucher_id: VoucherId,
    ) -> Result<vouchers::Model, VoucherError> {
        vouchers::Entity::find_by_id(voucher_id.into_inner())
            .filter(vouchers::Column::CompanyCode.eq(company_code))
            .lock_exclusive()
            .one(txn)
            .await?
            .ok_or(VoucherError::NotFound(voucher_id.into_inner()))
    }

    fn currency_of(&self, header: &VoucherHeader) -> String {
        header
            .currency
            .as_deref()
            .filter(|c| !c.trim().is_empty())
            .unwrap_or(&self.default_currency)
            .to_string()
    }

    /// Fire-and-forget refresh of the monthly aggregate view.
    fn spawn_aggregate_refresh(&self, company_code: &str) {
        let refresher = Arc::clone(&self.refresher);
        let company_code = company_code.to_string();
        tokio::spawn(async move {
            if let Err(error) = refresher.refresh_monthly_totals(Some(&company_code)).await {
                tracing::warn!(%company_code, %error, "monthly aggregate refresh failed");
            }
        });
    }

    /// Records a warning task for an unattended save; failures are logged
    /// and swallowed.
    async fn emit_warning_task(
        &self,
        company_code: &str,
        voucher: &vouchers::Model,
        warning: &RegistrationWarning,
    ) {
        let task = WarningTask {
            company_code: company_code.to_string(),
            registration_no: warning.registration_no.clone(),
            message: warning.message.clone(),
            voucher_no: voucher.voucher_no.clone(),
            voucher_id: VoucherId::from_uuid(voucher.id),
            target_user: voucher.created_by.clone(),
        };
        if let Err(error) = self.warning_sink.create_warning_task(task).await {
            tracing::warn!(
                %company_code,
                voucher_no = %voucher.voucher_no,
                %error,
                "failed to create registration warning task"
            );
        }
    }
}

// ============================================================================
// Model mapping helpers
// ============================================================================

/// Reconstructs the domain header from a stored row.
fn header_from_model(model: &vouchers::Model) -> VoucherHeader {
    VoucherHeader {
        posting_date: Some(model.posting_date),
        voucher_no: Some(model.voucher_no.clone()),
        currency: Some(model.currency.clone()),
        summary: model.summary.clone(),
        memo: model.memo.clone(),
        registration_no: model.registration_no.clone(),
        registration_status: model
            .registration_status
            .as_deref()
            .and_then(RegistrationStatus::from_key),
        registration_checked_at: model
            .registration_checked_at
            .map(|t| t.with_timezone(&Utc)),
        registrant_name: model.registrant_name.clone(),
        registrant_name_kana: model.registrant_name_kana.clone(),
        registration_valid_from: model.registration_valid_from,
        registration_valid_to: model.registration_valid_to,
        is_reversal: model.is_reversal,
        reversal_voucher_id: model.reversal_voucher_id,
        created_at: Some(model.created_at.with_timezone(&Utc)),
        created_by: model.created_by.clone(),
        updated_at: Some(model.updated_at.with_timezone(&Utc)),
        updated_by: model.updated_by.clone(),
    }
}

/// Decodes the stored JSONB line set.
fn lines_from_model(model: &vouchers::Model) -> Result<Vec<VoucherLine>, VoucherError> {
    serde_json::from_value(model.lines.clone()).map_err(|e| VoucherError::Payload(e.to_string()))
}

/// Encodes the canonical line set for the JSONB column.
fn lines_to_json(lines: &[VoucherLine]) -> Result<serde_json::Value, VoucherError> {
    serde_json::to_value(lines).map_err(|e| VoucherError::Payload(e.to_string()))
}

/// Writes the mutable header fields onto an active model.
fn apply_header_columns(active: &mut vouchers::ActiveModel, header: &VoucherHeader) {
    active.summary = Set(header.summary.clone());
    active.memo = Set(header.memo.clone());
    active.registration_no = Set(header.registration_no.clone());
    active.registration_status =
        Set(header.registration_status.map(|s| s.as_key().to_string()));
    active.registration_checked_at = Set(header.registration_checked_at.map(Into::into));
    active.registrant_name = Set(header.registrant_name.clone());
    active.registrant_name_kana = Set(header.registrant_name_kana.clone());
    active.registration_valid_from = Set(header.registration_valid_from);
    active.registration_valid_to = Set(header.registration_valid_to);
    active.updated_by = Set(header.updated_by.clone());
    active.updated_at = Set(header.updated_at.unwrap_or_else(Utc::now).into());
}

#[cfg(test)]
mod tests {
    use super::*;
    use kicho_core::ledger::DrCr;
    use rust_decimal_macros::dec;
    use serde_json::json;

    fn sample_model() -> vouchers::Model {
        let now: sea_orm::prelude::DateTimeWithTimeZone =
            "2026-08-05T09:00:00Z".parse::<DateTime<Utc>>().unwrap().into();
        vouchers::Model {
            id: Uuid::now_v7(),
            company_code: "C001".to_string(),
            voucher_no: "202608-00001".to_string(),
            posting_date: NaiveDate::from_ymd_opt(2026, 8, 5).unwrap(),
            currency: "JPY".to_string(),
            summary: Some("Office supplies".to_string()),
            memo: None,
            source: "manual".to_string(),
            registration_no: Some("T1234567890123".to_string()),
            registration_status: Some("matched".to_string()),
            registration_checked_at: Some(now),
            registrant_name: Some("Sakura Trading K.K.".to_string()),
            registrant_name_kana: None,
            registration_valid_from: NaiveDate::from_ymd_opt(2023, 10, 1),
            registration_valid_to: None,
            is_reversal: false,
            reversal_voucher_id: None,
            lines: json!([
                {
                    "line_no": 1,
                    "account_code": "5200",
                    "drcr": "DR",
                    "amount": "1000"
                },
                {
                    "line_no": 2,
                    "account_code": "1110",
                    "drcr": "CR",
                    "amount": "1000"
                }
            ]),
            created_by: Some("alex".to_string()),
            created_at: now,
            updated_by: Some("alex".to_string()),
            updated_at: now,
        }
    }

    #[test]
    fn test_header_from_model() {
        let model = sample_model();
        let header = header_from_model(&model);

        assert_eq!(header.posting_date, Some(model.posting_date));
        assert_eq!(header.voucher_no.as_deref(), Some("202608-00001"));
        assert_eq!(header.currency.as_deref(), Some("JPY"));
        assert_eq!(header.registration_status, Some(RegistrationStatus::Matched));
        assert_eq!(header.registrant_name.as_deref(), Some("Sakura Trading K.K."));
        assert_eq!(header.created_by.as_deref(), Some("alex"));
        assert!(!header.is_reversal);
    }

    #[test]
    fn test_lines_round_trip() {
        let model = sample_model();
        let lines = lines_from_model(&model).unwrap();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].line_no, 1);
        assert_eq!(lines[0].drcr, DrCr::Debit);
        assert_eq!(lines[0].amount, dec!(1000));
        assert_eq!(lines[1].drcr, DrCr::Credit);

        let json = lines_to_json(&lines).unwrap();
        let again: Vec<VoucherLine> = serde_json::from_value(json).unwrap();
        assert_eq!(lines, again);
    }

    #[test]
    fn test_lines_from_model_rejects_garbage() {
        let mut model = sample_model();
        model.lines = json!({"not": "an array"});
        assert!(matches!(
            lines_from_model(&model),
            Err(VoucherError::Payload(_))
        ));
    }

    #[test]
    fn test_error_codes_delegate_to_ledger() {
        let err = VoucherError::Ledger(LedgerError::EmptyVoucher);
        assert_eq!(err.error_code(), "EMPTY_VOUCHER");

        let err = VoucherError::NotFound(Uuid::nil());
        assert_eq!(err.error_code(), "VOUCHER_NOT_FOUND");

        let err = VoucherError::DuplicateVoucherNo("202608-00001".to_string());
        assert_eq!(err.error_code(), "DUPLICATE_VOUCHER_NO");
    }

    #[test]
    fn test_only_conflicts_are_retryable() {
        assert!(VoucherError::DuplicateVoucherNo("202608-00001".to_string()).is_retryable());
        assert!(!VoucherError::Ledger(LedgerError::EmptyVoucher).is_retryable());
        assert!(!VoucherError::NotFound(Uuid::nil()).is_retryable());
    }
}
