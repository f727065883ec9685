//! Initial schema migration - creates all ledger tables from scratch.
//!
//! - `accounts`: bank accounts with a cached balance
//! - `investments`: capital placed into a venture, optionally funded by an account
//! - `investment_returns`: revenue captured for an investment (owned rows)
//! - `expenses`: money spent, optionally attributed to an investment
//! - `transactions`: every balance change of an account
//! - `audit_log`: append-only trail of every row mutation
//!
//! Money columns are `BIGINT` minor units (cents); they are never negative.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Accounts {
    Table,
    Id,
    Name,
    Kind,
    BankName,
    BalanceMinor,
    StartingAmountMinor,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Investments {
    Table,
    Id,
    Name,
    Kind,
    AmountMinor,
    PurchaseDate,
    AccountId,
    Notes,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum InvestmentReturns {
    Table,
    Id,
    InvestmentId,
    AmountMinor,
    ReturnDate,
    PeriodType,
    Comment,
    AccountId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    Description,
    Category,
    AmountMinor,
    Date,
    AccountId,
    InvestmentId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    AccountId,
    Kind,
    AmountMinor,
    Description,
    Date,
    RelatedType,
    RelatedId,
    SourceReturnId,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum AuditLog {
    Table,
    Id,
    TableName,
    RecordId,
    Action,
    OldValues,
    NewValues,
    Actor,
    RecordedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Accounts
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Accounts::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Accounts::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Accounts::Name).string().not_null())
                    .col(ColumnDef::new(Accounts::Kind).string().not_null())
                    .col(ColumnDef::new(Accounts::BankName).string())
                    .col(
                        ColumnDef::new(Accounts::BalanceMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Accounts::StartingAmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Accounts::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Accounts::UpdatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Investments
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Investments::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Investments::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Investments::Name).string().not_null())
                    .col(ColumnDef::new(Investments::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Investments::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Investments::PurchaseDate).date().not_null())
                    .col(ColumnDef::new(Investments::AccountId).string())
                    .col(ColumnDef::new(Investments::Notes).string())
                    .col(
                        ColumnDef::new(Investments::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Investments::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-investments-account_id")
                            .from(Investments::Table, Investments::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Investment returns
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(InvestmentReturns::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InvestmentReturns::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(InvestmentReturns::InvestmentId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvestmentReturns::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvestmentReturns::ReturnDate)
                            .date()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvestmentReturns::PeriodType)
                            .string()
                            .not_null()
                            .default("day"),
                    )
                    .col(ColumnDef::new(InvestmentReturns::Comment).string())
                    .col(ColumnDef::new(InvestmentReturns::AccountId).string())
                    .col(
                        ColumnDef::new(InvestmentReturns::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InvestmentReturns::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-investment_returns-investment_id")
                            .from(InvestmentReturns::Table, InvestmentReturns::InvestmentId)
                            .to(Investments::Table, Investments::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-investment_returns-account_id")
                            .from(InvestmentReturns::Table, InvestmentReturns::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-investment_returns-investment_id-return_date")
                    .table(InvestmentReturns::Table)
                    .col(InvestmentReturns::InvestmentId)
                    .col(InvestmentReturns::ReturnDate)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Expenses
        // ───────────────────────────────────────────────────────────────────
        // `investment_id` is a weak attribution, so it carries no foreign key.
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::Description).string().not_null())
                    .col(ColumnDef::new(Expenses::Category).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Date).date().not_null())
                    .col(ColumnDef::new(Expenses::AccountId).string())
                    .col(ColumnDef::new(Expenses::InvestmentId).string())
                    .col(ColumnDef::new(Expenses::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::UpdatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-expenses-account_id")
                            .from(Expenses::Table, Expenses::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-expenses-investment_id")
                    .table(Expenses::Table)
                    .col(Expenses::InvestmentId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::AccountId).string().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(ColumnDef::new(Transactions::Date).date().not_null())
                    .col(ColumnDef::new(Transactions::RelatedType).string())
                    .col(ColumnDef::new(Transactions::RelatedId).string())
                    .col(ColumnDef::new(Transactions::SourceReturnId).string())
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::UpdatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transactions-account_id")
                            .from(Transactions::Table, Transactions::AccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-account_id-date")
                    .table(Transactions::Table)
                    .col(Transactions::AccountId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-related")
                    .table(Transactions::Table)
                    .col(Transactions::RelatedType)
                    .col(Transactions::RelatedId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-source_return_id")
                    .table(Transactions::Table)
                    .col(Transactions::SourceReturnId)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 6. Audit log
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(AuditLog::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AuditLog::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AuditLog::TableName).string().not_null())
                    .col(ColumnDef::new(AuditLog::RecordId).string().not_null())
                    .col(ColumnDef::new(AuditLog::Action).string().not_null())
                    .col(ColumnDef::new(AuditLog::OldValues).text())
                    .col(ColumnDef::new(AuditLog::NewValues).text())
                    .col(ColumnDef::new(AuditLog::Actor).string())
                    .col(ColumnDef::new(AuditLog::RecordedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-audit_log-table_name-record_id")
                    .table(AuditLog::Table)
                    .col(AuditLog::TableName)
                    .col(AuditLog::RecordId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AuditLog::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(InvestmentReturns::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Investments::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Accounts::Table).to_owned())
            .await?;
        Ok(())
    }
}
