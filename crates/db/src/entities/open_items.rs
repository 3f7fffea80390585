//! `SeaORM` Entity for the open_items table.
//!
//! One row per qualifying voucher line; the full row set for a voucher is
//! replaced whenever the voucher is saved.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "open_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_code: String,
    pub voucher_id: Uuid,
    pub voucher_line_no: i32,
    pub account_code: String,
    pub partner_id: Option<String>,
    pub currency: String,
    pub doc_date: Date,
    pub payment_date: Date,
    pub original_amount: Decimal,
    pub residual_amount: Decimal,
    pub cleared_flag: bool,
    pub cleared_at: Option<DateTimeWithTimeZone>,
    pub cleared_by: Option<Uuid>,
    pub refs: Json,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vouchers::Entity",
        from = "Column::VoucherId",
        to = "super::vouchers::Column::Id"
    )]
    Vouchers,
}

impl Related<super::vouchers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vouchers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
