//! Assembles the dashboard view: accounts plus current-month totals.

use rusqlite::Connection;
use serde::Serialize;
use time::Date;

use crate::{
    Error,
    account::{AccountOverview, list_accounts_for},
    summary::{LedgerSummary, month_window, summarize},
    transaction::get_transactions_in_window,
    user::UserId,
};

/// Everything the dashboard shows: the user's accounts and the aggregate
/// totals for the calendar month containing `today`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    /// The user's accounts, most recently created first.
    pub accounts: Vec<AccountOverview>,
    /// The month's totals across every account the user can access.
    #[serde(flatten)]
    pub summary: LedgerSummary,
}

/// Build the dashboard for `user_id`.
///
/// `today` should be the current date in the server's configured timezone;
/// the summary covers the calendar month containing it, inclusive of the
/// month's last second.
///
/// # Errors
/// Returns [Error::SqlError] if an SQL related error occurred.
pub fn accounts_and_summary(
    user_id: UserId,
    today: Date,
    connection: &Connection,
) -> Result<DashboardSummary, Error> {
    let accounts = list_accounts_for(user_id, connection)?;

    let window = month_window(today);
    let transactions = get_transactions_in_window(user_id, window, connection)?;
    let summary = summarize(&transactions);

    Ok(DashboardSummary { accounts, summary })
}
