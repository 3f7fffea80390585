//! Initial database migration.
//!
//! Creates the ledger tables, their indexes, and the monthly aggregate
//! materialized view consumed by reporting.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();

        // ============================================================
        // PART 1: MASTER DATA
        // ============================================================
        db.execute_unprepared(CHART_OF_ACCOUNTS_SQL).await?;
        db.execute_unprepared(ACCOUNTING_PERIODS_SQL).await?;

        // ============================================================
        // PART 2: VOUCHERS & SUBLEDGER
        // ============================================================
        db.execute_unprepared(VOUCHERS_SQL).await?;
        db.execute_unprepared(OPEN_ITEMS_SQL).await?;
        db.execute_unprepared(VOUCHER_SEQUENCES_SQL).await?;

        // ============================================================
        // PART 3: REPORTING VIEWS
        // ============================================================
        db.execute_unprepared(GL_MONTHLY_TOTALS_SQL).await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_ALL_SQL).await?;
        Ok(())
    }
}

// ============================================================
// SQL CONSTANTS
// ============================================================

const CHART_OF_ACCOUNTS_SQL: &str = r"
CREATE TABLE chart_of_accounts (
    id UUID PRIMARY KEY,
    company_code TEXT NOT NULL,
    account_code TEXT NOT NULL,
    name TEXT NOT NULL,
    is_open_item BOOLEAN NOT NULL DEFAULT FALSE,
    field_rules JSONB NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_chart_of_accounts_code UNIQUE (company_code, account_code)
);
";

const ACCOUNTING_PERIODS_SQL: &str = r"
CREATE TABLE accounting_periods (
    id UUID PRIMARY KEY,
    company_code TEXT NOT NULL,
    start_date DATE NOT NULL,
    end_date DATE NOT NULL,
    is_open BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_accounting_periods_range UNIQUE (company_code, start_date, end_date),
    CONSTRAINT ck_accounting_periods_range CHECK (start_date <= end_date)
);

CREATE INDEX idx_accounting_periods_lookup
    ON accounting_periods (company_code, start_date DESC);
";

const VOUCHERS_SQL: &str = r"
CREATE TABLE vouchers (
    id UUID PRIMARY KEY,
    company_code TEXT NOT NULL,
    voucher_no TEXT NOT NULL,
    posting_date DATE NOT NULL,
    currency TEXT NOT NULL,
    summary TEXT,
    memo TEXT,
    source TEXT NOT NULL DEFAULT 'manual',
    registration_no TEXT,
    registration_status TEXT,
    registration_checked_at TIMESTAMPTZ,
    registrant_name TEXT,
    registrant_name_kana TEXT,
    registration_valid_from DATE,
    registration_valid_to DATE,
    is_reversal BOOLEAN NOT NULL DEFAULT FALSE,
    reversal_voucher_id UUID REFERENCES vouchers(id),
    lines JSONB NOT NULL DEFAULT '[]',
    created_by TEXT,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_by TEXT,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_vouchers_company_no UNIQUE (company_code, voucher_no)
);

CREATE INDEX idx_vouchers_company_date
    ON vouchers (company_code, posting_date DESC, created_at DESC);
";

const OPEN_ITEMS_SQL: &str = r"
CREATE TABLE open_items (
    id UUID PRIMARY KEY,
    company_code TEXT NOT NULL,
    voucher_id UUID NOT NULL REFERENCES vouchers(id) ON DELETE CASCADE,
    voucher_line_no INTEGER NOT NULL,
    account_code TEXT NOT NULL,
    partner_id TEXT,
    currency TEXT NOT NULL,
    doc_date DATE NOT NULL,
    payment_date DATE NOT NULL,
    original_amount NUMERIC(18, 2) NOT NULL,
    residual_amount NUMERIC(18, 2) NOT NULL,
    cleared_flag BOOLEAN NOT NULL DEFAULT FALSE,
    cleared_at TIMESTAMPTZ,
    cleared_by UUID,
    refs JSONB NOT NULL DEFAULT '{}',
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_open_items_provenance UNIQUE (company_code, voucher_id, voucher_line_no)
);

CREATE INDEX idx_open_items_account
    ON open_items (company_code, account_code, cleared_flag);
CREATE INDEX idx_open_items_partner
    ON open_items (company_code, partner_id) WHERE partner_id IS NOT NULL;
CREATE INDEX idx_open_items_cleared_by
    ON open_items (company_code, cleared_by) WHERE cleared_by IS NOT NULL;
";

const VOUCHER_SEQUENCES_SQL: &str = r"
CREATE TABLE voucher_sequences (
    company_code TEXT NOT NULL,
    period_key TEXT NOT NULL,
    last_no BIGINT NOT NULL DEFAULT 0,
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    PRIMARY KEY (company_code, period_key)
);
";

const GL_MONTHLY_TOTALS_SQL: &str = r"
CREATE MATERIALIZED VIEW gl_monthly_totals AS
SELECT
    v.company_code,
    date_trunc('month', v.posting_date)::date AS month,
    line ->> 'account_code' AS account_code,
    SUM(CASE WHEN line ->> 'drcr' = 'DR'
        THEN (line ->> 'amount')::numeric ELSE 0 END) AS dr_total,
    SUM(CASE WHEN line ->> 'drcr' = 'CR'
        THEN (line ->> 'amount')::numeric ELSE 0 END) AS cr_total
FROM vouchers v
CROSS JOIN LATERAL jsonb_array_elements(v.lines) AS line
GROUP BY 1, 2, 3;

-- Required for REFRESH MATERIALIZED VIEW CONCURRENTLY.
CREATE UNIQUE INDEX uq_gl_monthly_totals
    ON gl_monthly_totals (company_code, month, account_code);
";

const DROP_ALL_SQL: &str = r"
DROP MATERIALIZED VIEW IF EXISTS gl_monthly_totals;
DROP TABLE IF EXISTS voucher_sequences;
DROP TABLE IF EXISTS open_items;
DROP TABLE IF EXISTS vouchers;
DROP TABLE IF EXISTS accounting_periods;
DROP TABLE IF EXISTS chart_of_accounts;
";
