//! Aggregation of transactions into income/expense/balance summaries.
//!
//! The engine is a pure function over a transaction slice; it owns no
//! state. All sums are integer cents, so results are exact and independent
//! of input order.

use serde::Serialize;
use time::{Date, PrimitiveDateTime, Time};

use crate::{category::CategoryKind, transaction::Transaction};

/// An inclusive datetime range over which totals are summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowRange {
    /// The first instant included.
    pub start: PrimitiveDateTime,
    /// The last instant included.
    pub end: PrimitiveDateTime,
}

/// Income and expense totals with their balance, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LedgerSummary {
    /// Sum of all income amounts.
    pub total_income_cents: i64,
    /// Sum of all expense amounts.
    pub total_expenses_cents: i64,
    /// `total_income_cents - total_expenses_cents`. May be negative.
    pub balance_cents: i64,
}

/// Sum a transaction slice into income, expense, and balance totals.
///
/// An empty slice yields all zeros.
pub fn summarize(transactions: &[Transaction]) -> LedgerSummary {
    let mut total_income_cents = 0;
    let mut total_expenses_cents = 0;

    for transaction in transactions {
        match transaction.kind {
            CategoryKind::Income => total_income_cents += transaction.amount_cents,
            CategoryKind::Expense => total_expenses_cents += transaction.amount_cents,
        }
    }

    LedgerSummary {
        total_income_cents,
        total_expenses_cents,
        balance_cents: total_income_cents - total_expenses_cents,
    }
}

/// The calendar-month window containing `today`.
///
/// The window runs from the first day of the month at 00:00:00 through the
/// last day of the month at 23:59:59, inclusive on both ends, so a
/// transaction recorded in the last second of the month still counts.
pub fn month_window(today: Date) -> WindowRange {
    let first_day = today.replace_day(1).expect("day 1 is valid in every month");
    let last_day = today
        .replace_day(today.month().length(today.year()))
        .expect("month length is a valid day");

    WindowRange {
        start: PrimitiveDateTime::new(first_day, Time::MIDNIGHT),
        end: PrimitiveDateTime::new(
            last_day,
            Time::from_hms(23, 59, 59).expect("23:59:59 is a valid time"),
        ),
    }
}

#[cfg(test)]
mod summarize_tests {
    use time::macros::datetime;

    use crate::{
        category::CategoryKind,
        transaction::Transaction,
        user::UserId,
    };

    use super::{LedgerSummary, summarize};

    fn make_transaction(id: i64, kind: CategoryKind, amount_cents: i64) -> Transaction {
        Transaction {
            id,
            account_id: 1,
            category_id: 1,
            kind,
            amount_cents,
            date: datetime!(2024-08-07 12:00:00),
            description: None,
            created_by: UserId::new(1),
        }
    }

    #[test]
    fn empty_input_is_all_zeros() {
        let summary = summarize(&[]);

        assert_eq!(
            summary,
            LedgerSummary {
                total_income_cents: 0,
                total_expenses_cents: 0,
                balance_cents: 0,
            }
        );
    }

    #[test]
    fn sums_income_and_expenses_separately() {
        let transactions = vec![
            make_transaction(1, CategoryKind::Income, 1000),
            make_transaction(2, CategoryKind::Expense, 300),
            make_transaction(3, CategoryKind::Income, 200),
            make_transaction(4, CategoryKind::Expense, 150),
        ];

        let summary = summarize(&transactions);

        assert_eq!(
            summary,
            LedgerSummary {
                total_income_cents: 1200,
                total_expenses_cents: 450,
                balance_cents: 750,
            }
        );
    }

    #[test]
    fn is_order_independent() {
        let mut transactions = vec![
            make_transaction(1, CategoryKind::Income, 1000),
            make_transaction(2, CategoryKind::Expense, 300),
            make_transaction(3, CategoryKind::Income, 200),
            make_transaction(4, CategoryKind::Expense, 150),
        ];

        let forward = summarize(&transactions);
        transactions.reverse();
        let backward = summarize(&transactions);
        transactions.swap(0, 2);
        let shuffled = summarize(&transactions);

        assert_eq!(forward, backward);
        assert_eq!(forward, shuffled);
    }

    #[test]
    fn balance_can_be_negative() {
        let transactions = vec![make_transaction(1, CategoryKind::Expense, 500)];

        let summary = summarize(&transactions);

        assert_eq!(summary.balance_cents, -500);
    }
}
