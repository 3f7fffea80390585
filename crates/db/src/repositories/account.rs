//! Chart-of-accounts repository with cached account metadata.
//!
//! Voucher validation reads account metadata on every line, so lookups go
//! through a short-TTL in-memory cache. Writers that change account
//! configuration invalidate the tenant's cached entries; readers tolerate
//! staleness up to the TTL.

use std::collections::HashMap;
use std::time::Duration;

use moka::sync::Cache;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use uuid::Uuid;

use kicho_core::ledger::{AccountMeta, DimensionField, FieldRule};

use crate::entities::chart_of_accounts;

/// Error types for account operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    /// Account not found.
    #[error("Account not found: {0}")]
    NotFound(String),

    /// The stored field rules could not be decoded.
    #[error("Invalid field rules for account {account_code}: {reason}")]
    InvalidFieldRules {
        /// The account whose rules are malformed.
        account_code: String,
        /// Decode failure detail.
        reason: String,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Input for creating or updating an account.
#[derive(Debug, Clone)]
pub struct SaveAccountInput {
    /// Tenant key.
    pub company_code: String,
    /// Account code, unique per tenant.
    pub account_code: String,
    /// Display name.
    pub name: String,
    /// Whether lines against this account produce open items.
    pub is_open_item: bool,
    /// Field rules keyed by dimension field.
    pub field_rules: HashMap<DimensionField, FieldRule>,
}

/// Chart-of-accounts repository with a TTL metadata cache.
#[derive(Clone)]
pub struct AccountRepository {
    db: DatabaseConnection,
    cache: Cache<(String, String), AccountMeta>,
}

impl AccountRepository {
    /// Creates a new account repository.
    ///
    /// `ttl_secs` bounds how long stale metadata may be served after an
    /// account configuration change on another node.
    #[must_use]
    pub fn new(db: DatabaseConnection, ttl_secs: u64, capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .support_invalidation_closures()
            .build();

        Self { db, cache }
    }

    /// Loads metadata for one account, cache-or-load.
    ///
    /// Returns `None` for unknown accounts; negative results are not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or the stored rules are
    /// malformed.
    pub async fn meta(
        &self,
        company_code: &str,
        account_code: &str,
    ) -> Result<Option<AccountMeta>, AccountError> {
        let key = (company_code.to_string(), account_code.to_string());
        if let Some(meta) = self.cache.get(&key) {
            return Ok(Some(meta));
        }

        let model = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::CompanyCode.eq(company_code))
            .filter(chart_of_accounts::Column::AccountCode.eq(account_code))
            .one(&self.db)
            .await?;

        match model {
            Some(model) => {
                let meta = meta_from_model(&model)?;
                self.cache.insert(key, meta.clone());
                Ok(Some(meta))
            }
            None => Ok(None),
        }
    }

    /// Loads metadata for a set of accounts, cache-or-load in one query.
    ///
    /// Unknown accounts are simply absent from the result map.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails or stored rules are
    /// malformed.
    pub async fn metas(
        &self,
        company_code: &str,
        account_codes: &[String],
    ) -> Result<HashMap<String, AccountMeta>, AccountError> {
        let mut result = HashMap::with_capacity(account_codes.len());
        let mut misses = Vec::new();

        for code in account_codes {
            let key = (company_code.to_string(), code.clone());
            if let Some(meta) = self.cache.get(&key) {
                result.insert(code.clone(), meta);
            } else {
                misses.push(code.clone());
            }
        }

        if !misses.is_empty() {
            let models = chart_of_accounts::Entity::find()
                .filter(chart_of_accounts::Column::CompanyCode.eq(company_code))
                .filter(chart_of_accounts::Column::AccountCode.is_in(misses))
                .all(&self.db)
                .await?;

            for model in models {
                let meta = meta_from_model(&model)?;
                self.cache.insert(
                    (company_code.to_string(), model.account_code.clone()),
                    meta.clone(),
                );
                result.insert(model.account_code, meta);
            }
        }

        Ok(result)
    }

    /// Returns the account codes from `account_codes` that do not exist.
    ///
    /// Order follows the input; duplicates are reported once.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_missing(
        &self,
        company_code: &str,
        account_codes: &[String],
    ) -> Result<Vec<String>, AccountError> {
        if account_codes.is_empty() {
            return Ok(Vec::new());
        }

        let existing: Vec<String> = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::CompanyCode.eq(company_code))
            .filter(chart_of_accounts::Column::AccountCode.is_in(account_codes.to_vec()))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|m| m.account_code)
            .collect();

        let mut missing = Vec::new();
        for code in account_codes {
            if !existing.contains(code) && !missing.contains(code) {
                missing.push(code.clone());
            }
        }
        Ok(missing)
    }

    /// Creates or updates an account and invalidates the tenant's cache.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn save_account(
        &self,
        input: SaveAccountInput,
    ) -> Result<chart_of_accounts::Model, AccountError> {
        let now = chrono::Utc::now().into();
        let rules = serde_json::to_value(&input.field_rules).map_err(|e| {
            AccountError::InvalidFieldRules {
                account_code: input.account_code.clone(),
                reason: e.to_string(),
            }
        })?;

        let existing = chart_of_accounts::Entity::find()
            .filter(chart_of_accounts::Column::CompanyCode.eq(input.company_code.as_str()))
            .filter(chart_of_accounts::Column::AccountCode.eq(input.account_code.as_str()))
            .one(&self.db)
            .await?;

        let model = match existing {
            Some(model) => {
                let mut active: chart_of_accounts::ActiveModel = model.into();
                active.name = Set(input.name);
                active.is_open_item = Set(input.is_open_item);
                active.field_rules = Set(rules);
                active.updated_at = Set(now);
                active.update(&self.db).await?
            }
            None => {
                let active = chart_of_accounts::ActiveModel {
                    id: Set(Uuid::now_v7()),
                    company_code: Set(input.company_code.clone()),
                    account_code: Set(input.account_code),
                    name: Set(input.name),
                    is_open_item: Set(input.is_open_item),
                    field_rules: Set(rules),
                    created_at: Set(now),
                    updated_at: Set(now),
                };
                active.insert(&self.db).await?
            }
        };

        self.invalidate_company(&input.company_code);
        Ok(model)
    }

    /// Drops every cached entry for the tenant.
    ///
    /// Exposed for the account-management collaborator, which must call it
    /// after mutating account configuration outside this repository.
    pub fn invalidate_company(&self, company_code: &str) {
        let company = company_code.to_string();
        // The predicate error only occurs when invalidation closures were
        // not enabled at build time.
        let _ = self.cache.invalidate_entries_if(move |key, _| key.0 == company);
    }
}

/// Decodes the entity's JSONB rule map into domain metadata.
fn meta_from_model(model: &chart_of_accounts::Model) -> Result<AccountMeta, AccountError> {
    let field_rules: HashMap<DimensionField, FieldRule> =
        serde_json::from_value(model.field_rules.clone()).map_err(|e| {
            AccountError::InvalidFieldRules {
                account_code: model.account_code.clone(),
                reason: e.to_string(),
            }
        })?;

    Ok(AccountMeta {
        is_open_item: model.is_open_item,
        field_rules,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn model(field_rules: serde_json::Value) -> chart_of_accounts::Model {
        chart_of_accounts::Model {
            id: Uuid::now_v7(),
            company_code: "C001".to_string(),
            account_code: "1152".to_string(),
            name: "Accounts receivable".to_string(),
            is_open_item: true,
            field_rules,
            created_at: chrono::Utc::now().into(),
            updated_at: chrono::Utc::now().into(),
        }
    }

    #[test]
    fn test_meta_from_model_parses_rules() {
        let meta = meta_from_model(&model(json!({
            "customer_id": "required",
            "department_id": "hidden",
        })))
        .unwrap();

        assert!(meta.is_open_item);
        assert_eq!(
            meta.field_rules.get(&DimensionField::Customer),
            Some(&FieldRule::Required)
        );
        assert_eq!(
            meta.field_rules.get(&DimensionField::Department),
            Some(&FieldRule::Hidden)
        );
        assert!(meta.field_rules.get(&DimensionField::Vendor).is_none());
    }

    #[test]
    fn test_meta_from_model_empty_rules() {
        let meta = meta_from_model(&model(json!({}))).unwrap();
        assert!(meta.field_rules.is_empty());
    }

    #[test]
    fn test_meta_from_model_rejects_malformed_rules() {
        let result = meta_from_model(&model(json!({"customer_id": "mandatory"})));
        assert!(matches!(
            result,
            Err(AccountError::InvalidFieldRules { ref account_code, .. }) if account_code == "1152"
        ));
    }
}
