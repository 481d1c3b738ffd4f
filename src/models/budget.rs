use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Closed set of budgeting buckets every expense is mapped into.
///
/// The declaration order is the canonical iteration order: bucket listings,
/// keyword matching, and the most-active-category tie-break all follow it.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash,
)]
#[serde(rename_all = "snake_case")]
pub enum BudgetCategory {
    Food,
    Fuel,
    Transport,
    Recharge,
    Entertainment,
    Medical,
    SendHome,
    Miscellaneous,
}

impl BudgetCategory {
    /// Every category, in canonical order.
    pub const ALL: [BudgetCategory; 8] = [
        BudgetCategory::Food,
        BudgetCategory::Fuel,
        BudgetCategory::Transport,
        BudgetCategory::Recharge,
        BudgetCategory::Entertainment,
        BudgetCategory::Medical,
        BudgetCategory::SendHome,
        BudgetCategory::Miscellaneous,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetCategory::Food => "food",
            BudgetCategory::Fuel => "fuel",
            BudgetCategory::Transport => "transport",
            BudgetCategory::Recharge => "recharge",
            BudgetCategory::Entertainment => "entertainment",
            BudgetCategory::Medical => "medical",
            BudgetCategory::SendHome => "send_home",
            BudgetCategory::Miscellaneous => "miscellaneous",
        }
    }

    /// Default weekly cap in paise for a brand-new budget week, based on a
    /// typical delivery-worker spending profile.
    pub fn default_weekly_cap_paise(&self) -> i64 {
        match self {
            BudgetCategory::Food => 240_000,          // ₹2400
            BudgetCategory::Fuel => 160_000,          // ₹1600
            BudgetCategory::Transport => 40_000,      // ₹400
            BudgetCategory::Recharge => 10_000,       // ₹100
            BudgetCategory::Entertainment => 50_000,  // ₹500
            BudgetCategory::Medical => 30_000,        // ₹300
            BudgetCategory::SendHome => 150_000,      // ₹1500
            BudgetCategory::Miscellaneous => 100_000, // ₹1000
        }
    }
}

/// Per-category state inside a weekly budget.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CategoryBudgetLine {
    pub max_budget_paise: i64,
    pub current_spent_paise: i64,
    pub transaction_count: u32,
}

impl CategoryBudgetLine {
    pub fn with_cap(max_budget_paise: i64) -> Self {
        Self {
            max_budget_paise,
            current_spent_paise: 0,
            transaction_count: 0,
        }
    }
}

/// Summary statistics over the week's transactions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TransactionSummary {
    pub total_transactions: u32,
    pub income_transactions: u32,
    pub expense_transactions: u32,
    /// Integer mean of expense amounts; 0 when there are no expenses.
    pub avg_transaction_paise: i64,
    pub largest_expense_paise: i64,
    pub most_active_category: BudgetCategory,
}

impl Default for TransactionSummary {
    fn default() -> Self {
        Self {
            total_transactions: 0,
            income_transactions: 0,
            expense_transactions: 0,
            avg_transaction_paise: 0,
            largest_expense_paise: 0,
            most_active_category: BudgetCategory::Food,
        }
    }
}

/// Signals set by external analysis jobs, carried on the budget record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AdjustmentFlags {
    pub income_drop_detected: bool,
    pub income_spike: bool,
    pub festival_month: bool,
    pub emergency_spend: bool,
    pub cash_fluctuation: bool,
    pub emi_due_date: bool,
}

/// One budget record per user per ISO week (Monday..Sunday). The spend and
/// count fields are recomputed from the ledger; `max_budget_paise` survives
/// recomputation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyBudget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub year: i32,
    pub week_number: u32,
    pub categories: BTreeMap<BudgetCategory, CategoryBudgetLine>,
    pub transaction_summary: TransactionSummary,
    pub total_spent_paise: i64,
    pub total_budget_paise: i64,
    /// round(100 * spent / budget); 0 when nothing is budgeted. Not clamped,
    /// overspending reads as more than 100.
    pub budget_utilization: u32,
    /// Transaction-count-weighted category risk, clamped to 0..=100.
    pub overall_risk_score: u32,
    pub adjustment_flags: AdjustmentFlags,
    pub ai_last_analyzed: Option<DateTime<Utc>>,
    pub last_updated: DateTime<Utc>,
}

impl WeeklyBudget {
    /// Fresh zero-spend budget for a week, with the default category caps.
    pub fn new_for_week(user_id: Uuid, week_start: NaiveDate, week_end: NaiveDate) -> Self {
        let categories = BudgetCategory::ALL
            .iter()
            .map(|c| (*c, CategoryBudgetLine::with_cap(c.default_weekly_cap_paise())))
            .collect();
        let iso = week_start.iso_week();
        Self {
            id: Uuid::new_v4(),
            user_id,
            week_start,
            week_end,
            year: iso.year(),
            week_number: iso.week(),
            categories,
            transaction_summary: TransactionSummary::default(),
            total_spent_paise: 0,
            total_budget_paise: BudgetCategory::ALL
                .iter()
                .map(|c| c.default_weekly_cap_paise())
                .sum(),
            budget_utilization: 0,
            overall_risk_score: 0,
            adjustment_flags: AdjustmentFlags::default(),
            ai_last_analyzed: None,
            last_updated: Utc::now(),
        }
    }
}

/// Request payload for adjusting per-category weekly caps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateLimitsRequest {
    /// Any date inside the target week.
    pub week_date: NaiveDate,
    /// New caps in paise; categories not listed keep their current cap.
    pub limits: BTreeMap<BudgetCategory, i64>,
}

/// Direction of week-over-week spend movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpendTrend {
    Increasing,
    Decreasing,
    Stable,
}

/// Week-over-week movement derived from recent budgets.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BudgetTrends {
    pub trend: SpendTrend,
    /// Latest vs previous week total spend, rounded percent.
    pub change_pct: i64,
    pub weekly_average_paise: i64,
}

/// Recent budgets (most recent first) with derived trends.
#[derive(Debug, Clone, Serialize)]
pub struct BudgetHistory {
    pub budgets: Vec<WeeklyBudget>,
    pub trends: BudgetTrends,
    pub total_weeks: usize,
}
