use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sea_orm::{Database, DatabaseConnection};

use engine::{
    AuditLogFilter, CaptureRevenueCmd, Engine, EngineError, FixedClock, FundInvestmentCmd, Money,
    Month, PayExpenseCmd,
};
use migration::MigratorTrait;
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

async fn engine_on(today: NaiveDate) -> (Engine, DatabaseConnection) {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder()
        .database(db.clone())
        .clock(Arc::new(FixedClock::on(today)))
        .build()
        .await
        .unwrap();
    (engine, db)
}

async fn investment_with_returns(engine: &Engine, cost: i64, returns: &[(NaiveDate, i64)]) -> Uuid {
    let investment = engine
        .fund_investment(
            FundInvestmentCmd::new("Food truck", "business", Money::units(cost))
                .date(date(2026, 1, 10)),
        )
        .await
        .unwrap()
        .investment;
    for (on, amount) in returns {
        engine
            .capture_revenue(CaptureRevenueCmd::new(investment.id, Money::units(*amount)).date(*on))
            .await
            .unwrap();
    }
    investment.id
}

async fn audit_entries(engine: &Engine) -> usize {
    engine
        .list_audit_log(&AuditLogFilter::default(), 1000, None)
        .await
        .unwrap()
        .0
        .len()
}

#[tokio::test]
async fn break_even_is_reached_in_the_third_month() {
    let (engine, _db) = engine_on(date(2026, 3, 31)).await;
    let id = investment_with_returns(
        &engine,
        1000,
        &[
            (date(2026, 1, 20), 300),
            (date(2026, 2, 14), 300),
            (date(2026, 3, 5), 500),
        ],
    )
    .await;

    let metrics = engine.compute_metrics(id).await.unwrap();

    assert_eq!(metrics.total_cost, Money::units(1000));
    assert_eq!(metrics.total_returns, Money::units(1100));
    assert_eq!(metrics.net_profit, Money::units(100));
    assert_eq!(metrics.roi, Decimal::from(110));

    let months: Vec<Month> = metrics.monthly_series.iter().map(|p| p.month).collect();
    assert_eq!(
        months,
        vec![
            Month { year: 2026, month: 1 },
            Month { year: 2026, month: 2 },
            Month { year: 2026, month: 3 },
        ]
    );

    let percentages: Vec<Decimal> = metrics
        .break_even
        .progression
        .iter()
        .map(|p| p.percentage_to_break_even)
        .collect();
    assert_eq!(
        percentages,
        vec![Decimal::from(30), Decimal::from(60), Decimal::from(100)]
    );
    assert_eq!(metrics.break_even.break_even_month_number, Some(3));
    assert_eq!(
        metrics.break_even.break_even_month,
        Some(Month { year: 2026, month: 3 })
    );
    assert_eq!(metrics.break_even.break_even_days, Some(81));
    assert!(metrics.break_even.is_profitable);
}

#[tokio::test]
async fn attributed_expenses_raise_the_cost_basis() {
    let (engine, _db) = engine_on(date(2026, 2, 28)).await;
    let id = investment_with_returns(&engine, 1000, &[(date(2026, 2, 1), 1000)]).await;
    engine
        .pay_expense(
            PayExpenseCmd::new("Tyres", "maintenance", Money::units(250))
                .date(date(2026, 2, 3))
                .investment_id(id),
        )
        .await
        .unwrap();

    let metrics = engine.compute_metrics(id).await.unwrap();

    assert_eq!(metrics.total_cost, Money::units(1250));
    assert_eq!(metrics.net_profit, Money::units(-250));
    assert_eq!(metrics.roi, Decimal::from(80));
    assert_eq!(metrics.monthly_series[1].expenses, Money::units(250));
    assert_eq!(metrics.break_even.break_even_month, None);
    assert!(!metrics.break_even.is_profitable);
}

#[tokio::test]
async fn metrics_are_read_only_and_repeatable() {
    let (engine, _db) = engine_on(date(2026, 5, 1)).await;
    let id = investment_with_returns(&engine, 400, &[(date(2026, 2, 2), 100)]).await;
    let before = audit_entries(&engine).await;

    let first = engine.compute_metrics(id).await.unwrap();
    let second = engine.compute_metrics(id).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.monthly_series.len(), 5);
    assert_eq!(audit_entries(&engine).await, before);
}

#[tokio::test]
async fn metrics_of_unknown_investment_fail() {
    let (engine, _db) = engine_on(date(2026, 5, 1)).await;

    let err = engine.compute_metrics(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound(_)));
}
