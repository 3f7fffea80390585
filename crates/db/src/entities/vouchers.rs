//! `SeaORM` Entity for the vouchers table.
//!
//! The header is stored in columns; the normalized line set is a JSONB
//! document in the `lines` column.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub company_code: String,
    pub voucher_no: String,
    pub posting_date: Date,
    pub currency: String,
    pub summary: Option<String>,
    pub memo: Option<String>,
    pub source: String,
    pub registration_no: Option<String>,
    pub registration_status: Option<String>,
    pub registration_checked_at: Option<DateTimeWithTimeZone>,
    pub registrant_name: Option<String>,
    pub registrant_name_kana: Option<String>,
    pub registration_valid_from: Option<Date>,
    pub registration_valid_to: Option<Date>,
    pub is_reversal: bool,
    pub reversal_voucher_id: Option<Uuid>,
    pub lines: Json,
    pub created_by: Option<String>,
    pub created_at: DateTimeWithTimeZone,
    pub updated_by: Option<String>,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::open_items::Entity")]
    OpenItems,
}

impl Related<super::open_items::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OpenItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
