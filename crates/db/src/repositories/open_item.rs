//! Open-item repository.
//!
//! The open-item rows for a voucher are owned by that voucher's
//! transaction: every save deletes the full row set and reinserts the
//! freshly derived drafts. Replacing instead of diffing keeps the rebuild
//! idempotent and rules out drift between a voucher and its subledger.

use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    DbBackend, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set, Statement,
};
use uuid::Uuid;

use kicho_core::ledger::OpenItemDraft;
use kicho_shared::types::VoucherId;

use crate::entities::{open_items, vouchers};

/// Filter options for listing open items.
#[derive(Debug, Clone, Default)]
pub struct OpenItemFilter {
    /// Filter by account code.
    pub account_code: Option<String>,
    /// Filter by partner reference.
    pub partner_id: Option<String>,
    /// Only items that have not been cleared.
    pub uncleared_only: bool,
}

/// Open-item repository.
#[derive(Debug, Clone)]
pub struct OpenItemRepository {
    db: DatabaseConnection,
}

impl OpenItemRepository {
    /// Creates a new open-item repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Replaces the voucher's open-item rows with the given drafts.
    ///
    /// Items this voucher had previously cleared are un-cleared first, then
    /// the voucher's own rows are deleted and reinserted, and finally the
    /// clearing marks of the new drafts are applied to the items they
    /// settle.
    ///
    /// # Errors
    ///
    /// Returns an error if any database operation fails.
    pub async fn rebuild(
        txn: &DatabaseTransaction,
        company_code: &str,
        voucher_id: VoucherId,
        drafts: &[OpenItemDraft],
    ) -> Result<(), DbErr> {
        Self::delete_for_voucher(txn, company_code, voucher_id).await?;

        let now: sea_orm::prelude::DateTimeWithTimeZone = chrono::Utc::now().into();
        for draft in drafts {
            let active = open_items::ActiveModel {
                id: Set(Uuid::now_v7()),
                company_code: Set(company_code.to_string()),
                voucher_id: Set(voucher_id.into_inner()),
                voucher_line_no: Set(i32::try_from(draft.voucher_line_no).unwrap_or(i32::MAX)),
                account_code: Set(draft.account_code.clone()),
                partner_id: Set(draft.partner_id.clone()),
                currency: Set(draft.currency.clone()),
                doc_date: Set(draft.doc_date),
                payment_date: Set(draft.payment_date),
                original_amount: Set(draft.original_amount),
                residual_amount: Set(draft.residual_amount),
                cleared_flag: Set(draft.cleared_flag),
                cleared_at: Set(draft.cleared_at.map(Into::into)),
                cleared_by: Set(draft.cleared_flag.then(|| voucher_id.into_inner())),
                refs: Set(serde_json::to_value(&draft.refs)
                    .map_err(|e| DbErr::Custom(e.to_string()))?),
                created_at: Set(now),
                updated_at: Set(now),
            };
            active.insert(txn).await?;
        }

        Self::apply_clearing_marks(txn, company_code, voucher_id, drafts).await?;
        Ok(())
    }

    /// Un-clears items this voucher had cleared, then deletes its own rows.
    ///
    /// # Errors
    ///
    /// Returns an error if any database operation fails.
    pub async fn delete_for_voucher(
        txn: &DatabaseTransaction,
        company_code: &str,
        voucher_id: VoucherId,
    ) -> Result<(), DbErr> {
        // Items settled by this voucher revert to open before the clearing
        // line itself goes away.
        open_items::Entity::update_many()
            .filter(open_items::Column::CompanyCode.eq(company_code))
            .filter(open_items::Column::ClearedBy.eq(voucher_id.into_inner()))
            .filter(open_items::Column::VoucherId.ne(voucher_id.into_inner()))
            .col_expr(open_items::Column::ClearedFlag, Expr::value(false))
            .col_expr(
                open_items::Column::ResidualAmount,
                Expr::col(open_items::Column::OriginalAmount).into(),
            )
            .col_expr(
                open_items::Column::ClearedAt,
                Expr::value(Option::<sea_orm::prelude::DateTimeWithTimeZone>::None),
            )
            .col_expr(open_items::Column::ClearedBy, Expr::value(Option::<Uuid>::None))
            .exec(txn)
            .await?;

        open_items::Entity::delete_many()
            .filter(open_items::Column::CompanyCode.eq(company_code))
            .filter(open_items::Column::VoucherId.eq(voucher_id.into_inner()))
            .exec(txn)
            .await?;

        Ok(())
    }

    /// Returns true when any of the voucher's items were cleared by a
    /// different voucher.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn has_items_cleared_by_other(
        txn: &DatabaseTransaction,
        company_code: &str,
        voucher_id: VoucherId,
    ) -> Result<bool, DbErr> {
        let count = open_items::Entity::find()
            .filter(open_items::Column::CompanyCode.eq(company_code))
            .filter(open_items::Column::VoucherId.eq(voucher_id.into_inner()))
            .filter(open_items::Column::ClearedFlag.eq(true))
            .filter(open_items::Column::ClearedBy.is_not_null())
            .filter(open_items::Column::ClearedBy.ne(voucher_id.into_inner()))
            .count(txn)
            .await?;

        Ok(count > 0)
    }

    /// Rewrites the origin voucher number embedded in the voucher's own
    /// open-item refs after a renumber.
    ///
    /// # Errors
    ///
    /// Returns an error if the update fails.
    pub async fn update_origin_voucher_no(
        txn: &DatabaseTransaction,
        company_code: &str,
        voucher_id: VoucherId,
        voucher_no: &str,
    ) -> Result<(), DbErr> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r"
            UPDATE open_items
            SET refs = jsonb_set(refs, '{voucher_no}', to_jsonb($1::text)),
                updated_at = now()
            WHERE company_code = $2 AND voucher_id = $3
            ",
            [
                voucher_no.into(),
                company_code.into(),
                voucher_id.into_inner().into(),
            ],
        );
        txn.execute(stmt).await?;
        Ok(())
    }

    /// Lists open items for reporting collaborators.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_open(
        &self,
        company_code: &str,
        filter: OpenItemFilter,
    ) -> Result<Vec<open_items::Model>, DbErr> {
        let mut query = open_items::Entity::find()
            .filter(open_items::Column::CompanyCode.eq(company_code));

        if let Some(account_code) = filter.account_code {
            query = query.filter(open_items::Column::AccountCode.eq(account_code));
        }
        if let Some(partner_id) = filter.partner_id {
            query = query.filter(open_items::Column::PartnerId.eq(partner_id));
        }
        if filter.uncleared_only {
            query = query.filter(open_items::Column::ClearedFlag.eq(false));
        }

        query
            .order_by_asc(open_items::Column::PaymentDate)
            .order_by_asc(open_items::Column::DocDate)
            .all(&self.db)
            .await
    }

    /// Marks the items referenced by the drafts' clearing refs as settled.
    async fn apply_clearing_marks(
        txn: &DatabaseTransaction,
        company_code: &str,
        clearing_voucher_id: VoucherId,
        drafts: &[OpenItemDraft],
    ) -> Result<(), DbErr> {
        let clearing_drafts: Vec<&OpenItemDraft> = drafts
            .iter()
            .filter(|d| d.cleared_flag && !d.refs.cleared.is_empty())
            .collect();
        if clearing_drafts.is_empty() {
            return Ok(());
        }

        // Resolve the referenced voucher numbers to ids in one query.
        let mut numbers: Vec<String> = clearing_drafts
            .iter()
            .flat_map(|d| d.refs.cleared.iter().map(|r| r.voucher_no.clone()))
            .collect();
        numbers.sort();
        numbers.dedup();

        let id_by_no: std::collections::HashMap<String, Uuid> = vouchers::Entity::find()
            .filter(vouchers::Column::CompanyCode.eq(company_code))
            .filter(vouchers::Column::VoucherNo.is_in(numbers))
            .all(txn)
            .await?
            .into_iter()
            .map(|v| (v.voucher_no, v.id))
            .collect();

        for draft in clearing_drafts {
            for cleared in &draft.refs.cleared {
                let Some(target_voucher_id) = id_by_no.get(&cleared.voucher_no) else {
                    tracing::warn!(
                        company_code,
                        voucher_no = %cleared.voucher_no,
                        "clearing ref points at an unknown voucher, skipping"
                    );
                    continue;
                };

                open_items::Entity::update_many()
                    .filter(open_items::Column::CompanyCode.eq(company_code))
                    .filter(open_items::Column::VoucherId.eq(*target_voucher_id))
                    .filter(
                        open_items::Column::VoucherLineNo
                            .eq(i32::try_from(cleared.line_no).unwrap_or(i32::MAX)),
                    )
                    .col_expr(open_items::Column::ClearedFlag, Expr::value(true))
                    .col_expr(open_items::Column::ResidualAmount, Expr::value(Decimal::ZERO))
                    .col_expr(
                        open_items::Column::ClearedAt,
                        Expr::value(sea_orm::prelude::DateTimeWithTimeZone::from(
                            cleared.cleared_at,
                        )),
                    )
                    .col_expr(
                        open_items::Column::ClearedBy,
                        Expr::value(clearing_voucher_id.into_inner()),
                    )
                    .exec(txn)
                    .await?;
            }
        }

        Ok(())
    }
}
