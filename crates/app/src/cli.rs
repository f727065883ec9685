//! Command line surface of `bizledger`.
//!
//! Every command runs one engine operation and prints its result as JSON.
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use engine::{
    AmountTarget, AuditAction, AuditLogFilter, CaptureRevenueCmd, DepositCmd, Engine,
    ExpenseListFilter, FundInvestmentCmd, Money, NewAccountCmd, PayExpenseCmd, PeriodType,
    UpdateAccountCmd, UpdateAmountCmd, WithdrawCmd,
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::error::Result;

#[derive(Parser, Debug)]
#[command(name = "bizledger")]
#[command(about = "Ledger, investments and audit trail for a small business")]
pub struct Cli {
    /// Optional config file path (TOML).
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Who is acting; recorded on every audit entry.
    #[arg(long, global = true, env = "BIZLEDGER_ACTOR")]
    pub actor: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage accounts.
    Account(AccountArgs),
    /// Put money into an account.
    Deposit(MovementArgs),
    /// Take money out of an account.
    Withdraw(MovementArgs),
    /// Inspect or delete account transactions.
    Tx(TxArgs),
    /// Manage investments.
    Invest(InvestArgs),
    /// Manage investment returns.
    Revenue(RevenueArgs),
    /// Manage expenses.
    Expense(ExpenseArgs),
    /// Correct the amount of a recorded row.
    Amend(AmendArgs),
    /// ROI, monthly series and break-even of an investment.
    Metrics { investment_id: Uuid },
    /// Browse the audit trail, newest first.
    Audit(AuditArgs),
}

#[derive(Args, Debug)]
pub struct AccountArgs {
    #[command(subcommand)]
    command: AccountCommand,
}

#[derive(Subcommand, Debug)]
enum AccountCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "checking")]
        kind: String,
        #[arg(long)]
        bank_name: Option<String>,
        #[arg(long, default_value = "0")]
        starting: Money,
    },
    Update {
        id: Uuid,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        bank_name: Option<String>,
    },
    Delete {
        id: Uuid,
    },
    List,
    /// Balance breakdown replayed from the transactions.
    Show {
        id: Uuid,
    },
    /// Rebuild cached balances from the transactions.
    Recompute,
}

#[derive(Args, Debug)]
pub struct MovementArgs {
    account_id: Uuid,
    amount: Money,
    #[arg(long)]
    description: Option<String>,
    #[arg(long)]
    date: Option<NaiveDate>,
}

#[derive(Args, Debug)]
pub struct TxArgs {
    #[command(subcommand)]
    command: TxCommand,
}

#[derive(Subcommand, Debug)]
enum TxCommand {
    List {
        account_id: Uuid,
        #[arg(long, default_value_t = 50)]
        limit: u64,
        #[arg(long)]
        cursor: Option<String>,
    },
    Show {
        id: Uuid,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct InvestArgs {
    #[command(subcommand)]
    command: InvestCommand,
}

#[derive(Subcommand, Debug)]
enum InvestCommand {
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        kind: String,
        #[arg(long)]
        amount: Money,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Account that funds the purchase.
        #[arg(long)]
        account: Option<Uuid>,
        #[arg(long)]
        notes: Option<String>,
    },
    List,
    Show {
        id: Uuid,
    },
    Returns {
        id: Uuid,
    },
    /// Delete an investment with its returns, giving the money back.
    Delete {
        id: Uuid,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Period {
    Day,
    Week,
}

impl From<Period> for PeriodType {
    fn from(period: Period) -> Self {
        match period {
            Period::Day => Self::Day,
            Period::Week => Self::Week,
        }
    }
}

#[derive(Args, Debug)]
pub struct RevenueArgs {
    #[command(subcommand)]
    command: RevenueCommand,
}

#[derive(Subcommand, Debug)]
enum RevenueCommand {
    Add {
        investment_id: Uuid,
        amount: Money,
        #[arg(long, value_enum, default_value_t = Period::Day)]
        period: Period,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Account credited with the revenue.
        #[arg(long)]
        account: Option<Uuid>,
        #[arg(long)]
        comment: Option<String>,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Args, Debug)]
pub struct ExpenseArgs {
    #[command(subcommand)]
    command: ExpenseCommand,
}

#[derive(Subcommand, Debug)]
enum ExpenseCommand {
    Add {
        #[arg(long)]
        description: String,
        #[arg(long)]
        category: String,
        #[arg(long)]
        amount: Money,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Account the expense is paid from.
        #[arg(long)]
        account: Option<Uuid>,
        /// Investment the expense is attributed to.
        #[arg(long)]
        investment: Option<Uuid>,
    },
    List {
        #[arg(long)]
        from: Option<NaiveDate>,
        #[arg(long)]
        to: Option<NaiveDate>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        investment: Option<Uuid>,
    },
    Delete {
        id: Uuid,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Target {
    Investment,
    Return,
    Expense,
    Transaction,
}

#[derive(Args, Debug)]
pub struct AmendArgs {
    #[arg(value_enum)]
    target: Target,
    id: Uuid,
    amount: Money,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Action {
    Create,
    Update,
    Delete,
}

impl From<Action> for AuditAction {
    fn from(action: Action) -> Self {
        match action {
            Action::Create => Self::Create,
            Action::Update => Self::Update,
            Action::Delete => Self::Delete,
        }
    }
}

#[derive(Args, Debug)]
pub struct AuditArgs {
    #[arg(long)]
    table: Option<String>,
    #[arg(long, value_enum)]
    action: Option<Action>,
    #[arg(long)]
    record: Option<String>,
    /// Entries recorded at or after this instant (RFC 3339).
    #[arg(long)]
    from: Option<DateTime<Utc>>,
    /// Entries recorded strictly before this instant (RFC 3339).
    #[arg(long)]
    to: Option<DateTime<Utc>>,
    #[arg(long, default_value_t = 50)]
    limit: u64,
    #[arg(long)]
    cursor: Option<String>,
}

fn print<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn page<T: Serialize>(items: Vec<T>, next_cursor: Option<String>) -> Result<()> {
    print(&json!({ "items": items, "next_cursor": next_cursor }))
}

fn deleted(id: Uuid) -> Result<()> {
    print(&json!({ "deleted": id }))
}

/// Runs `command` against `engine`.
pub async fn run(engine: &Engine, command: Command, actor: Option<String>) -> Result<()> {
    let actor_ref = actor.as_deref();
    match command {
        Command::Account(args) => match args.command {
            AccountCommand::Create {
                name,
                kind,
                bank_name,
                starting,
            } => {
                let mut cmd = NewAccountCmd::new(name, kind, starting);
                cmd.bank_name = bank_name;
                cmd.actor = actor;
                print(&engine.create_account(cmd).await?)
            }
            AccountCommand::Update {
                id,
                name,
                kind,
                bank_name,
            } => {
                let mut cmd = UpdateAccountCmd::new(id);
                cmd.name = name;
                cmd.kind = kind;
                cmd.bank_name = bank_name;
                cmd.actor = actor;
                print(&engine.update_account(cmd).await?)
            }
            AccountCommand::Delete { id } => {
                engine.delete_account(id, actor_ref).await?;
                deleted(id)
            }
            AccountCommand::List => print(&engine.list_accounts().await?),
            AccountCommand::Show { id } => print(&engine.account_summary(id).await?),
            AccountCommand::Recompute => print(&engine.recompute_balances(actor_ref).await?),
        },
        Command::Deposit(args) => {
            let mut cmd = DepositCmd::new(args.account_id, args.amount);
            cmd.description = args.description;
            cmd.date = args.date;
            cmd.actor = actor;
            print(&engine.deposit(cmd).await?)
        }
        Command::Withdraw(args) => {
            let mut cmd = WithdrawCmd::new(args.account_id, args.amount);
            cmd.description = args.description;
            cmd.date = args.date;
            cmd.actor = actor;
            print(&engine.withdraw(cmd).await?)
        }
        Command::Tx(args) => match args.command {
            TxCommand::List {
                account_id,
                limit,
                cursor,
            } => {
                let (items, next) = engine
                    .list_transactions_for_account_page(account_id, limit, cursor.as_deref())
                    .await?;
                page(items, next)
            }
            TxCommand::Show { id } => print(&engine.transaction(id).await?),
            TxCommand::Delete { id } => {
                engine.delete_transaction(id, actor_ref).await?;
                deleted(id)
            }
        },
        Command::Invest(args) => match args.command {
            InvestCommand::Create {
                name,
                kind,
                amount,
                date,
                account,
                notes,
            } => {
                let mut cmd = FundInvestmentCmd::new(name, kind, amount);
                cmd.date = date;
                cmd.account_id = account;
                cmd.notes = notes;
                cmd.actor = actor;
                print(&engine.fund_investment(cmd).await?)
            }
            InvestCommand::List => print(&engine.list_investments().await?),
            InvestCommand::Show { id } => print(&engine.investment(id).await?),
            InvestCommand::Returns { id } => print(&engine.investment_returns(id).await?),
            InvestCommand::Delete { id } => {
                engine.delete_investment(id, actor_ref).await?;
                deleted(id)
            }
        },
        Command::Revenue(args) => match args.command {
            RevenueCommand::Add {
                investment_id,
                amount,
                period,
                date,
                account,
                comment,
            } => {
                let mut cmd =
                    CaptureRevenueCmd::new(investment_id, amount).period_type(period.into());
                cmd.date = date;
                cmd.account_id = account;
                cmd.comment = comment;
                cmd.actor = actor;
                print(&engine.capture_revenue(cmd).await?)
            }
            RevenueCommand::Delete { id } => {
                engine.delete_investment_return(id, actor_ref).await?;
                deleted(id)
            }
        },
        Command::Expense(args) => match args.command {
            ExpenseCommand::Add {
                description,
                category,
                amount,
                date,
                account,
                investment,
            } => {
                let mut cmd = PayExpenseCmd::new(description, category, amount);
                cmd.date = date;
                cmd.account_id = account;
                cmd.investment_id = investment;
                cmd.actor = actor;
                print(&engine.pay_expense(cmd).await?)
            }
            ExpenseCommand::List {
                from,
                to,
                category,
                investment,
            } => {
                let filter = ExpenseListFilter {
                    from,
                    to,
                    category,
                    investment_id: investment,
                };
                print(&engine.list_expenses(&filter).await?)
            }
            ExpenseCommand::Delete { id } => {
                engine.delete_expense(id, actor_ref).await?;
                deleted(id)
            }
        },
        Command::Amend(args) => {
            let target = match args.target {
                Target::Investment => AmountTarget::Investment(args.id),
                Target::Return => AmountTarget::InvestmentReturn(args.id),
                Target::Expense => AmountTarget::Expense(args.id),
                Target::Transaction => AmountTarget::Transaction(args.id),
            };
            let mut cmd = UpdateAmountCmd::new(target, args.amount);
            cmd.actor = actor;
            print(&engine.update_amount(cmd).await?)
        }
        Command::Metrics { investment_id } => print(&engine.compute_metrics(investment_id).await?),
        Command::Audit(args) => {
            let filter = AuditLogFilter {
                table_name: args.table,
                action: args.action.map(Into::into),
                record_id: args.record,
                from: args.from,
                to: args.to,
            };
            let (items, next) = engine
                .list_audit_log(&filter, args.limit, args.cursor.as_deref())
                .await?;
            page(items, next)
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_amounts_and_dates() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "bizledger",
            "--actor",
            "alice",
            "deposit",
            &id.to_string(),
            "12.50",
            "--date",
            "2026-03-01",
        ])
        .unwrap();

        assert_eq!(cli.actor.as_deref(), Some("alice"));
        let Command::Deposit(args) = cli.command else {
            panic!("expected deposit");
        };
        assert_eq!(args.account_id, id);
        assert_eq!(args.amount, Money::new(1250));
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2026, 3, 1));
    }

    #[test]
    fn rejects_malformed_amounts() {
        let id = Uuid::new_v4().to_string();
        assert!(Cli::try_parse_from(["bizledger", "deposit", &id, "12.5.0"]).is_err());
    }

    #[test]
    fn audit_accepts_a_time_window() {
        let cli = Cli::try_parse_from([
            "bizledger",
            "audit",
            "--table",
            "accounts",
            "--from",
            "2026-01-01T00:00:00Z",
            "--to",
            "2026-02-01T12:30:00+02:00",
        ])
        .unwrap();

        let Command::Audit(args) = cli.command else {
            panic!("expected audit");
        };
        assert_eq!(args.table.as_deref(), Some("accounts"));
        assert_eq!(
            args.from.map(|t| t.to_rfc3339()).as_deref(),
            Some("2026-01-01T00:00:00+00:00")
        );
        assert_eq!(
            args.to.map(|t| t.to_rfc3339()).as_deref(),
            Some("2026-02-01T10:30:00+00:00")
        );
        assert!(Cli::try_parse_from(["bizledger", "audit", "--from", "yesterday"]).is_err());
    }
}
