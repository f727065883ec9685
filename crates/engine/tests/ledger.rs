use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Statement};

use engine::{
    Account, AmountTarget, AuditAction, AuditLogFilter, CaptureRevenueCmd, DepositCmd, Engine,
    EngineError, FixedClock, FundInvestmentCmd, Money, NewAccountCmd, PayExpenseCmd, RelatedKind,
    TransactionKind, UpdateAccountCmd, UpdateAmountCmd, UpdatedRow, WithdrawCmd,
};
use migration::MigratorTrait;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn engine_with_db() -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .clock(Arc::new(FixedClock::on(date(2026, 3, 15))))
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn open_account(engine: &Engine, units: i64) -> Account {
    engine
        .create_account(NewAccountCmd::new("Main", "checking", Money::units(units)).bank_name("ACME Bank"))
        .await
        .unwrap()
}

async fn count_rows(db: &DatabaseConnection, table: &str) -> i64 {
    let backend = db.get_database_backend();
    let row = db
        .query_one(Statement::from_string(
            backend,
            format!("SELECT COUNT(*) AS n FROM {table}"),
        ))
        .await
        .unwrap()
        .unwrap();
    row.try_get::<i64>("", "n").unwrap()
}

async fn audit_count(engine: &Engine, table: &str, action: AuditAction) -> usize {
    let filter = AuditLogFilter {
        table_name: Some(table.to_string()),
        action: Some(action),
        ..AuditLogFilter::default()
    };
    let (entries, _) = engine.list_audit_log(&filter, 1000, None).await.unwrap();
    entries.len()
}

#[tokio::test]
async fn every_operation_keeps_balance_equal_to_replayed_transactions() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;

    engine
        .deposit(DepositCmd::new(account.id, Money::units(50)).description("Owner top-up"))
        .await
        .unwrap();
    engine
        .withdraw(WithdrawCmd::new(account.id, Money::units(30)))
        .await
        .unwrap();
    engine
        .pay_expense(
            PayExpenseCmd::new("Fuel", "operations", Money::units(20)).account_id(account.id),
        )
        .await
        .unwrap();
    let investment = engine
        .fund_investment(
            FundInvestmentCmd::new("Food truck", "business", Money::units(10))
                .account_id(account.id),
        )
        .await
        .unwrap();
    engine
        .capture_revenue(
            CaptureRevenueCmd::new(investment.investment.id, Money::units(5))
                .account_id(account.id),
        )
        .await
        .unwrap();

    let summary = engine.account_summary(account.id).await.unwrap();
    assert_eq!(summary.account.balance, Money::units(95));
    assert_eq!(summary.replayed_balance, Money::units(95));
    assert!(summary.is_consistent);
    assert_eq!(summary.transaction_count, 5);
    assert_eq!(summary.deposits, Money::units(50));
    assert_eq!(summary.withdrawals, Money::units(30));
    assert_eq!(summary.expenses, Money::units(20));
    assert_eq!(summary.investments, Money::units(10));
    assert_eq!(summary.revenue, Money::units(5));
}

#[tokio::test]
async fn withdraw_over_balance_is_rejected_without_side_effects() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;

    let err = engine
        .withdraw(WithdrawCmd::new(account.id, Money::units(150)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let account = engine.account(account.id).await.unwrap();
    assert_eq!(account.balance, Money::units(100));
    let (txs, _) = engine
        .list_transactions_for_account_page(account.id, 10, None)
        .await
        .unwrap();
    assert!(txs.is_empty());
}

#[tokio::test]
async fn funding_and_expenses_need_cover_from_the_account() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;

    let err = engine
        .fund_investment(
            FundInvestmentCmd::new("Van", "vehicle", Money::units(101)).account_id(account.id),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    let err = engine
        .pay_expense(PayExpenseCmd::new("Rent", "office", Money::units(500)).account_id(account.id))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));

    assert!(engine.list_investments().await.unwrap().is_empty());
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(100));
}

#[tokio::test]
async fn non_positive_amounts_are_rejected() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;

    for amount in [Money::ZERO, Money::new(-1)] {
        let err = engine
            .deposit(DepositCmd::new(account.id, amount))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }
}

#[tokio::test]
async fn unknown_rows_are_not_found() {
    let (engine, _db) = engine_with_db().await;

    let err = engine
        .deposit(DepositCmd::new(Uuid::new_v4(), Money::units(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = engine
        .capture_revenue(CaptureRevenueCmd::new(Uuid::new_v4(), Money::units(1)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));

    let err = engine
        .pay_expense(
            PayExpenseCmd::new("Fuel", "operations", Money::units(1))
                .investment_id(Uuid::new_v4()),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}

#[tokio::test]
async fn deleting_investment_cascades_and_restores_capital() {
    let (engine, db) = engine_with_db().await;
    let account = open_account(&engine, 10_000).await;

    let investment = engine
        .fund_investment(
            FundInvestmentCmd::new("Food truck", "business", Money::units(5000))
                .date(date(2026, 1, 10))
                .account_id(account.id),
        )
        .await
        .unwrap()
        .investment;
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(5000));

    for day in [11, 12, 13] {
        engine
            .capture_revenue(
                CaptureRevenueCmd::new(investment.id, Money::units(100)).date(date(2026, 1, day)),
            )
            .await
            .unwrap();
    }
    assert_eq!(engine.investment_returns(investment.id).await.unwrap().len(), 3);

    engine.delete_investment(investment.id, None).await.unwrap();

    assert_eq!(
        engine.account(account.id).await.unwrap().balance,
        Money::units(10_000)
    );
    assert!(matches!(
        engine.investment(investment.id).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
    assert_eq!(count_rows(&db, "investment_returns").await, 0);
    assert_eq!(count_rows(&db, "transactions").await, 0);

    let deletes = audit_count(&engine, "investments", AuditAction::Delete).await
        + audit_count(&engine, "investment_returns", AuditAction::Delete).await;
    assert_eq!(deletes, 4);
    assert_eq!(
        audit_count(&engine, "transactions", AuditAction::Delete).await,
        1
    );
    assert!(engine.account_summary(account.id).await.unwrap().is_consistent);
}

#[tokio::test]
async fn deleting_investment_reverses_credited_revenue() {
    let (engine, _db) = engine_with_db().await;
    let funding = open_account(&engine, 1000).await;
    let receiving = engine
        .create_account(NewAccountCmd::new("Till", "cash", Money::ZERO))
        .await
        .unwrap();

    let investment = engine
        .fund_investment(
            FundInvestmentCmd::new("Kiosk", "business", Money::units(400)).account_id(funding.id),
        )
        .await
        .unwrap()
        .investment;
    engine
        .capture_revenue(
            CaptureRevenueCmd::new(investment.id, Money::units(150)).account_id(receiving.id),
        )
        .await
        .unwrap();
    assert_eq!(engine.account(receiving.id).await.unwrap().balance, Money::units(150));

    engine.delete_investment(investment.id, None).await.unwrap();

    assert_eq!(engine.account(funding.id).await.unwrap().balance, Money::units(1000));
    assert_eq!(engine.account(receiving.id).await.unwrap().balance, Money::ZERO);
}

#[tokio::test]
async fn deleting_investment_keeps_attributed_expenses() {
    let (engine, _db) = engine_with_db().await;
    let investment = engine
        .fund_investment(FundInvestmentCmd::new("Kiosk", "business", Money::units(400)))
        .await
        .unwrap()
        .investment;
    let expense = engine
        .pay_expense(
            PayExpenseCmd::new("Paint", "maintenance", Money::units(40))
                .investment_id(investment.id),
        )
        .await
        .unwrap();

    engine.delete_investment(investment.id, None).await.unwrap();

    let kept = engine.expense(expense.id).await.unwrap();
    assert_eq!(kept.investment_id, Some(investment.id));
}

#[tokio::test]
async fn system_generated_transactions_cannot_be_deleted_directly() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;

    engine
        .pay_expense(PayExpenseCmd::new("Fuel", "operations", Money::units(20)).account_id(account.id))
        .await
        .unwrap();
    let (txs, _) = engine
        .list_transactions_for_account_page(account.id, 10, None)
        .await
        .unwrap();
    let mirror = txs
        .iter()
        .find(|tx| tx.kind == TransactionKind::Expense)
        .unwrap();
    assert!(mirror.is_system_generated());

    let err = engine.delete_transaction(mirror.id, None).await.unwrap_err();
    assert!(matches!(err, EngineError::SystemGeneratedTransaction(_)));
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(80));
}

#[tokio::test]
async fn deleting_manual_transaction_reverses_it() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;

    engine
        .deposit(DepositCmd::new(account.id, Money::units(25)))
        .await
        .unwrap();
    let (txs, _) = engine
        .list_transactions_for_account_page(account.id, 10, None)
        .await
        .unwrap();

    engine.delete_transaction(txs[0].id, Some("bob")).await.unwrap();

    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(100));
    assert!(matches!(
        engine.transaction(txs[0].id).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[tokio::test]
async fn reversal_cannot_overdraw_the_account() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 0).await;

    engine
        .deposit(DepositCmd::new(account.id, Money::units(25)))
        .await
        .unwrap();
    engine
        .withdraw(WithdrawCmd::new(account.id, Money::units(20)))
        .await
        .unwrap();
    let (txs, _) = engine
        .list_transactions_for_account_page(account.id, 10, None)
        .await
        .unwrap();
    let deposit = txs
        .iter()
        .find(|tx| tx.kind == TransactionKind::Deposit)
        .unwrap();

    let err = engine.delete_transaction(deposit.id, None).await.unwrap_err();
    assert!(matches!(err, EngineError::InsufficientFunds(_)));
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(5));
}

#[tokio::test]
async fn failure_in_second_write_rolls_back_the_first() {
    let (engine, db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;
    let audit_before = engine
        .list_audit_log(&AuditLogFilter::default(), 1000, None)
        .await
        .unwrap()
        .0
        .len();

    db.execute_unprepared(
        "CREATE TRIGGER fail_transaction_insert BEFORE INSERT ON transactions \
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
    )
    .await
    .unwrap();

    let err = engine
        .deposit(DepositCmd::new(account.id, Money::units(50)))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::AtomicityFailure(_)));

    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(100));
    assert_eq!(count_rows(&db, "transactions").await, 0);
    let audit_after = engine
        .list_audit_log(&AuditLogFilter::default(), 1000, None)
        .await
        .unwrap()
        .0
        .len();
    assert_eq!(audit_before, audit_after);
}

#[tokio::test]
async fn referenced_account_cannot_be_deleted() {
    let (engine, _db) = engine_with_db().await;
    let used = open_account(&engine, 100).await;
    engine
        .deposit(DepositCmd::new(used.id, Money::units(1)))
        .await
        .unwrap();

    let err = engine.delete_account(used.id, None).await.unwrap_err();
    assert!(matches!(err, EngineError::ReferentialConflict(_)));
    assert!(engine.account(used.id).await.is_ok());

    let unused = engine
        .create_account(NewAccountCmd::new("Spare", "savings", Money::ZERO))
        .await
        .unwrap();
    engine.delete_account(unused.id, None).await.unwrap();
    assert!(matches!(
        engine.account(unused.id).await.unwrap_err(),
        EngineError::NotFound(_)
    ));
}

#[tokio::test]
async fn account_details_update_leaves_balance_alone() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;

    let updated = engine
        .update_account(
            UpdateAccountCmd::new(account.id)
                .name("Operating")
                .bank_name(""),
        )
        .await
        .unwrap();

    assert_eq!(updated.name, "Operating");
    assert_eq!(updated.kind, "checking");
    assert_eq!(updated.bank_name, None);
    assert_eq!(updated.balance, Money::units(100));
    assert_eq!(
        audit_count(&engine, "accounts", AuditAction::Update).await,
        1
    );
}

#[tokio::test]
async fn update_amount_moves_balance_and_patches_mirror() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;
    let expense = engine
        .pay_expense(PayExpenseCmd::new("Fuel", "operations", Money::units(20)).account_id(account.id))
        .await
        .unwrap();

    let updated = engine
        .update_amount(UpdateAmountCmd::new(
            AmountTarget::Expense(expense.id),
            Money::units(50),
        ))
        .await
        .unwrap();
    let UpdatedRow::Expense(updated) = updated else {
        panic!("expected an expense");
    };
    assert_eq!(updated.amount, Money::units(50));
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(50));

    let (txs, _) = engine
        .list_transactions_for_account_page(account.id, 10, None)
        .await
        .unwrap();
    assert_eq!(txs.len(), 1);
    assert_eq!(txs[0].amount, Money::units(50));
    assert_eq!(txs[0].related_id, Some(expense.id));
    assert!(engine.account_summary(account.id).await.unwrap().is_consistent);

    let (entries, _) = engine
        .list_audit_log(
            &AuditLogFilter {
                record_id: Some(expense.id.to_string()),
                action: Some(AuditAction::Update),
                ..AuditLogFilter::default()
            },
            10,
            None,
        )
        .await
        .unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].old_values.as_ref().unwrap()["amount"], 2000);
    assert_eq!(entries[0].new_values.as_ref().unwrap()["amount"], 5000);
}

#[tokio::test]
async fn update_amount_on_returns_investments_and_manual_transactions() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 1000).await;
    let investment = engine
        .fund_investment(
            FundInvestmentCmd::new("Kiosk", "business", Money::units(400)).account_id(account.id),
        )
        .await
        .unwrap()
        .investment;
    engine
        .capture_revenue(
            CaptureRevenueCmd::new(investment.id, Money::units(100)).account_id(account.id),
        )
        .await
        .unwrap();
    let ret = engine.investment_returns(investment.id).await.unwrap()[0].clone();
    // 1000 - 400 + 100
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(700));

    engine
        .update_amount(UpdateAmountCmd::new(
            AmountTarget::InvestmentReturn(ret.id),
            Money::units(60),
        ))
        .await
        .unwrap();
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(660));

    engine
        .update_amount(UpdateAmountCmd::new(
            AmountTarget::Investment(investment.id),
            Money::units(300),
        ))
        .await
        .unwrap();
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(760));

    engine
        .deposit(DepositCmd::new(account.id, Money::units(40)))
        .await
        .unwrap();
    let (txs, _) = engine
        .list_transactions_for_account_page(account.id, 10, None)
        .await
        .unwrap();
    let manual = txs.iter().find(|tx| !tx.is_system_generated()).unwrap();
    engine
        .update_amount(UpdateAmountCmd::new(
            AmountTarget::Transaction(manual.id),
            Money::units(10),
        ))
        .await
        .unwrap();
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(770));

    let mirror = txs.iter().find(|tx| tx.is_system_generated()).unwrap();
    let err = engine
        .update_amount(UpdateAmountCmd::new(
            AmountTarget::Transaction(mirror.id),
            Money::units(10),
        ))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SystemGeneratedTransaction(_)));

    assert!(engine.account_summary(account.id).await.unwrap().is_consistent);
}

#[tokio::test]
async fn deleting_expense_and_return_gives_money_back() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;
    let expense = engine
        .pay_expense(PayExpenseCmd::new("Fuel", "operations", Money::units(30)).account_id(account.id))
        .await
        .unwrap();
    let investment = engine
        .fund_investment(FundInvestmentCmd::new("Kiosk", "business", Money::units(10)))
        .await
        .unwrap()
        .investment;
    let summary = engine
        .capture_revenue(
            CaptureRevenueCmd::new(investment.id, Money::units(15)).account_id(account.id),
        )
        .await
        .unwrap();
    assert_eq!(summary.total_returns, Money::units(15));
    assert_eq!(summary.returns_count, 1);
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(85));

    engine.delete_expense(expense.id, None).await.unwrap();
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(115));

    let ret = engine.investment_returns(investment.id).await.unwrap()[0].clone();
    engine.delete_investment_return(ret.id, None).await.unwrap();
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(100));

    let summary = engine.investment(investment.id).await.unwrap();
    assert_eq!(summary.total_returns, Money::ZERO);
    assert!(engine.account_summary(account.id).await.unwrap().is_consistent);
}

#[tokio::test]
async fn concurrent_deposits_on_one_account_serialize() {
    let (engine, _db) = engine_with_db().await;
    let engine = Arc::new(engine);
    let account = open_account(&engine, 0).await;

    let mut tasks = tokio::task::JoinSet::new();
    for _ in 0..20 {
        let engine = Arc::clone(&engine);
        tasks.spawn(async move {
            engine
                .deposit(DepositCmd::new(account.id, Money::units(5)))
                .await
        });
    }
    while let Some(result) = tasks.join_next().await {
        result.unwrap().unwrap();
    }

    let summary = engine.account_summary(account.id).await.unwrap();
    assert_eq!(summary.account.balance, Money::units(100));
    assert_eq!(summary.transaction_count, 20);
    assert!(summary.is_consistent);
}

#[tokio::test]
async fn recompute_balances_repairs_drift() {
    let (engine, db) = engine_with_db().await;
    let account = open_account(&engine, 100).await;
    engine
        .deposit(DepositCmd::new(account.id, Money::units(20)))
        .await
        .unwrap();

    db.execute_unprepared("UPDATE accounts SET balance_minor = 0")
        .await
        .unwrap();
    assert!(!engine.account_summary(account.id).await.unwrap().is_consistent);

    let fixed = engine.recompute_balances(Some("repair")).await.unwrap();
    assert_eq!(fixed.len(), 1);
    assert_eq!(fixed[0].balance, Money::units(120));
    assert!(engine.account_summary(account.id).await.unwrap().is_consistent);

    assert!(engine.recompute_balances(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn transactions_page_by_cursor() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 0).await;
    for day in 1..=5 {
        engine
            .deposit(DepositCmd::new(account.id, Money::units(1)).date(date(2026, 2, day)))
            .await
            .unwrap();
    }

    let (first, cursor) = engine
        .list_transactions_for_account_page(account.id, 2, None)
        .await
        .unwrap();
    assert_eq!(first.len(), 2);
    assert_eq!(first[0].date, date(2026, 2, 5));
    let cursor = cursor.unwrap();

    let (second, cursor) = engine
        .list_transactions_for_account_page(account.id, 2, Some(&cursor))
        .await
        .unwrap();
    assert_eq!(second[0].date, date(2026, 2, 3));

    let (third, cursor) = engine
        .list_transactions_for_account_page(account.id, 2, cursor.as_deref())
        .await
        .unwrap();
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].date, date(2026, 2, 1));
    assert!(cursor.is_none());

    let err = engine
        .list_transactions_for_account_page(account.id, 2, Some("not-a-cursor"))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidCursor(_)));
}

#[tokio::test]
async fn revenue_mirrors_link_to_their_investment_and_return() {
    let (engine, _db) = engine_with_db().await;
    let account = open_account(&engine, 1000).await;
    let investment = engine
        .fund_investment(
            FundInvestmentCmd::new("Kiosk", "business", Money::units(400)).account_id(account.id),
        )
        .await
        .unwrap()
        .investment;
    for (units, day) in [(100, 1), (50, 2)] {
        engine
            .capture_revenue(
                CaptureRevenueCmd::new(investment.id, Money::units(units))
                    .account_id(account.id)
                    .date(date(2026, 3, day)),
            )
            .await
            .unwrap();
    }
    let returns = engine.investment_returns(investment.id).await.unwrap();
    let (first, second) = (returns[0].clone(), returns[1].clone());

    let (txs, _) = engine
        .list_transactions_for_account_page(account.id, 10, None)
        .await
        .unwrap();
    let revenue: Vec<_> = txs
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Revenue)
        .collect();
    assert_eq!(revenue.len(), 2);
    for tx in &revenue {
        assert_eq!(tx.related_type, Some(RelatedKind::Investment));
        assert_eq!(tx.related_id, Some(investment.id));
    }
    let funding = txs
        .iter()
        .find(|tx| tx.kind == TransactionKind::Investment)
        .unwrap();
    assert_eq!(funding.related_id, Some(investment.id));
    assert_eq!(funding.source_return_id, None);

    // Each return still reaches its own mirror.
    engine
        .update_amount(UpdateAmountCmd::new(
            AmountTarget::InvestmentReturn(second.id),
            Money::units(80),
        ))
        .await
        .unwrap();
    engine.delete_investment_return(first.id, None).await.unwrap();

    let (txs, _) = engine
        .list_transactions_for_account_page(account.id, 10, None)
        .await
        .unwrap();
    let revenue: Vec<_> = txs
        .iter()
        .filter(|tx| tx.kind == TransactionKind::Revenue)
        .collect();
    assert_eq!(revenue.len(), 1);
    assert_eq!(revenue[0].source_return_id, Some(second.id));
    assert_eq!(revenue[0].amount, Money::units(80));
    // 1000 - 400 + 80
    assert_eq!(engine.account(account.id).await.unwrap().balance, Money::units(680));
    assert!(engine.account_summary(account.id).await.unwrap().is_consistent);
}

#[tokio::test]
async fn capture_revenue_rejects_totals_beyond_money_range() {
    let (engine, db) = engine_with_db().await;
    let investment = engine
        .fund_investment(FundInvestmentCmd::new("Kiosk", "business", Money::units(10)))
        .await
        .unwrap()
        .investment;
    let half = Money::new(i64::MAX / 2 + 10);

    let summary = engine
        .capture_revenue(CaptureRevenueCmd::new(investment.id, half))
        .await
        .unwrap();
    assert_eq!(summary.total_returns, half);

    let err = engine
        .capture_revenue(CaptureRevenueCmd::new(investment.id, half))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    assert_eq!(engine.investment_returns(investment.id).await.unwrap().len(), 1);
    assert_eq!(count_rows(&db, "investment_returns").await, 1);
    assert_eq!(audit_count(&engine, "investment_returns", AuditAction::Create).await, 1);
}

