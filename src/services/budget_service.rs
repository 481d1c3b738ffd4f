use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc, Weekday};
use std::collections::BTreeMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::categories::map_budget_category;
use crate::error::ErrorCategory;
use crate::locks::KeyedLocks;
use crate::models::budget::{
    BudgetCategory, BudgetHistory, BudgetTrends, CategoryBudgetLine, SpendTrend,
    TransactionSummary, UpdateLimitsRequest, WeeklyBudget,
};
use crate::models::transaction::{TransactionKind, TransactionQuery};
use crate::repositories::{BudgetRepository, RepositoryError, TransactionRepository};

/// Budget service errors
#[derive(Debug, thiserror::Error)]
pub enum BudgetError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Weekly budget not found")]
    BudgetNotFound,

    #[error("Invalid week specification")]
    InvalidWeek,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl BudgetError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            BudgetError::Validation(_) | BudgetError::InvalidWeek => ErrorCategory::Validation,
            BudgetError::BudgetNotFound => ErrorCategory::NotFound,
            BudgetError::DatabaseError(_) => ErrorCategory::Storage,
        }
    }
}

/// Monday..Sunday bounds of the week containing `date`. Deterministic: every
/// date inside one week maps to the same pair.
pub fn week_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let week_start = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    (week_start, week_start + Duration::days(6))
}

/// round(100 * spent / budget); 0 when nothing is budgeted.
pub fn utilization_percent(total_spent_paise: i64, total_budget_paise: i64) -> u32 {
    if total_budget_paise <= 0 {
        return 0;
    }
    let pct = (total_spent_paise * 100 + total_budget_paise / 2) / total_budget_paise;
    pct.max(0) as u32
}

/// Risk for one category, 0..=100. An unbudgeted category with spend is
/// maximum risk.
pub fn category_risk(line: &CategoryBudgetLine) -> u32 {
    if line.max_budget_paise <= 0 {
        return if line.current_spent_paise > 0 { 100 } else { 0 };
    }
    let pct = (line.current_spent_paise * 100 + line.max_budget_paise / 2) / line.max_budget_paise;
    pct.clamp(0, 100) as u32
}

/// Transaction-count-weighted mean of category risks, clamped to 0..=100.
/// 0 when the week has no expense transactions.
pub fn overall_risk_score(categories: &BTreeMap<BudgetCategory, CategoryBudgetLine>) -> u32 {
    let mut weighted_sum = 0i64;
    let mut weight = 0i64;
    for line in categories.values() {
        let count = line.transaction_count as i64;
        weighted_sum += category_risk(line) as i64 * count;
        weight += count;
    }
    if weight == 0 {
        0
    } else {
        (weighted_sum / weight).clamp(0, 100) as u32
    }
}

/// Week-over-week movement over recent budgets (most recent first). Fewer
/// than two weeks reads as stable.
pub fn calculate_trends(budgets: &[WeeklyBudget]) -> BudgetTrends {
    let weekly_average_paise = if budgets.is_empty() {
        0
    } else {
        budgets.iter().map(|b| b.total_spent_paise).sum::<i64>() / budgets.len() as i64
    };

    if budgets.len() < 2 {
        return BudgetTrends {
            trend: SpendTrend::Stable,
            change_pct: 0,
            weekly_average_paise,
        };
    }

    let latest = budgets[0].total_spent_paise;
    let previous = budgets[1].total_spent_paise;
    let change_pct = if previous > 0 {
        (((latest - previous) as f64 / previous as f64) * 100.0).round() as i64
    } else {
        0
    };

    let trend = if change_pct > 10 {
        SpendTrend::Increasing
    } else if change_pct < -10 {
        SpendTrend::Decreasing
    } else {
        SpendTrend::Stable
    };

    BudgetTrends {
        trend,
        change_pct,
        weekly_average_paise,
    }
}

/// Trait defining weekly budget operations
#[async_trait]
pub trait BudgetService: Send + Sync {
    /// Recompute the budget for the week containing `date` from the ledger
    /// and upsert it. Full recompute is the authoritative path; the
    /// incremental per-transaction update goes through here too, so both
    /// always agree.
    async fn compute_week(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<WeeklyBudget, BudgetError>;

    /// Budget for the week containing `date`, computed lazily when the
    /// record does not exist yet
    async fn budget_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<WeeklyBudget, BudgetError>;

    /// Budget for a specific ISO week; not-found when it was never computed
    async fn budget_for_week(
        &self,
        user_id: Uuid,
        year: i32,
        week_number: u32,
    ) -> Result<WeeklyBudget, BudgetError>;

    /// Adjust per-category caps for an existing week (used by the external
    /// budgeting agent); spend/risk fields are refreshed
    async fn update_limits(
        &self,
        user_id: Uuid,
        request: UpdateLimitsRequest,
    ) -> Result<WeeklyBudget, BudgetError>;

    /// Recent budgets with derived trends, newest week first
    async fn history(&self, user_id: Uuid, limit: usize) -> Result<BudgetHistory, BudgetError>;
}

/// Implementation of BudgetService
pub struct BudgetServiceImpl {
    transaction_repository: Arc<dyn TransactionRepository>,
    budget_repository: Arc<dyn BudgetRepository>,
    locks: KeyedLocks<(Uuid, NaiveDate)>,
}

impl BudgetServiceImpl {
    pub fn new(
        transaction_repository: Arc<dyn TransactionRepository>,
        budget_repository: Arc<dyn BudgetRepository>,
    ) -> Self {
        Self {
            transaction_repository,
            budget_repository,
            locks: KeyedLocks::new(),
        }
    }

    /// Recompute the window from the ledger. Callers must hold the
    /// (user, week) lock.
    async fn recompute_window(
        &self,
        user_id: Uuid,
        week_start: NaiveDate,
        week_end: NaiveDate,
    ) -> Result<WeeklyBudget, BudgetError> {
        let window_from = week_start.and_time(NaiveTime::MIN).and_utc();
        let window_until = (week_end + Duration::days(1))
            .and_time(NaiveTime::MIN)
            .and_utc();

        let expenses = self
            .transaction_repository
            .find_by_user(
                user_id,
                TransactionQuery::kind_in_window(
                    TransactionKind::Expense,
                    window_from,
                    window_until,
                ),
            )
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BudgetError::BudgetNotFound,
                RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
            })?;

        let incomes = self
            .transaction_repository
            .find_by_user(
                user_id,
                TransactionQuery::kind_in_window(
                    TransactionKind::Income,
                    window_from,
                    window_until,
                ),
            )
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BudgetError::BudgetNotFound,
                RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
            })?;

        let mut budget = match self
            .budget_repository
            .find_one(user_id, week_start)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BudgetError::BudgetNotFound,
                RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
            })? {
            Some(existing) => existing,
            None => WeeklyBudget::new_for_week(user_id, week_start, week_end),
        };

        // Reset spend and counts but keep the configured caps; every category
        // in the taxonomy gets a line.
        for category in BudgetCategory::ALL {
            let line = budget
                .categories
                .entry(category)
                .or_insert_with(|| CategoryBudgetLine::with_cap(category.default_weekly_cap_paise()));
            line.current_spent_paise = 0;
            line.transaction_count = 0;
        }

        let mut largest_expense_paise = 0i64;
        for transaction in &expenses {
            let category = map_budget_category(
                &transaction.category,
                transaction.merchant.as_deref().unwrap_or(""),
                transaction.notes.as_deref().unwrap_or(""),
            );
            if let Some(line) = budget.categories.get_mut(&category) {
                line.current_spent_paise += transaction.amount_paise;
                line.transaction_count += 1;
            }
            if transaction.amount_paise > largest_expense_paise {
                largest_expense_paise = transaction.amount_paise;
            }
        }

        let total_spent_paise: i64 = budget
            .categories
            .values()
            .map(|l| l.current_spent_paise)
            .sum();
        let total_budget_paise: i64 = budget.categories.values().map(|l| l.max_budget_paise).sum();
        let expense_count = expenses.len() as u32;
        let income_count = incomes.len() as u32;

        // Highest transaction count wins; ties and the empty week resolve to
        // the first category in canonical order.
        let mut most_active_category = BudgetCategory::Food;
        let mut best_count = 0u32;
        for category in BudgetCategory::ALL {
            let count = budget
                .categories
                .get(&category)
                .map_or(0, |l| l.transaction_count);
            if count > best_count {
                best_count = count;
                most_active_category = category;
            }
        }

        budget.transaction_summary = TransactionSummary {
            total_transactions: expense_count + income_count,
            income_transactions: income_count,
            expense_transactions: expense_count,
            avg_transaction_paise: if expense_count > 0 {
                total_spent_paise / expense_count as i64
            } else {
                0
            },
            largest_expense_paise,
            most_active_category,
        };
        budget.total_spent_paise = total_spent_paise;
        budget.total_budget_paise = total_budget_paise;
        budget.budget_utilization = utilization_percent(total_spent_paise, total_budget_paise);
        budget.overall_risk_score = overall_risk_score(&budget.categories);
        budget.last_updated = Utc::now();

        self.budget_repository
            .upsert(budget)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BudgetError::BudgetNotFound,
                RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
            })
    }
}

#[async_trait]
impl BudgetService for BudgetServiceImpl {
    async fn compute_week(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<WeeklyBudget, BudgetError> {
        let (week_start, week_end) = week_bounds(date);
        let _guard = self.locks.acquire((user_id, week_start)).await;
        self.recompute_window(user_id, week_start, week_end).await
    }

    async fn budget_for_date(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<WeeklyBudget, BudgetError> {
        let (week_start, _) = week_bounds(date);
        let existing = self
            .budget_repository
            .find_one(user_id, week_start)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BudgetError::BudgetNotFound,
                RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
            })?;

        match existing {
            Some(budget) => Ok(budget),
            // The record is a cache over the ledger; compute it on demand.
            None => self.compute_week(user_id, date).await,
        }
    }

    async fn budget_for_week(
        &self,
        user_id: Uuid,
        year: i32,
        week_number: u32,
    ) -> Result<WeeklyBudget, BudgetError> {
        let week_start = NaiveDate::from_isoywd_opt(year, week_number, Weekday::Mon)
            .ok_or(BudgetError::InvalidWeek)?;

        self.budget_repository
            .find_one(user_id, week_start)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BudgetError::BudgetNotFound,
                RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
            })?
            .ok_or(BudgetError::BudgetNotFound)
    }

    async fn update_limits(
        &self,
        user_id: Uuid,
        request: UpdateLimitsRequest,
    ) -> Result<WeeklyBudget, BudgetError> {
        for (category, cap) in &request.limits {
            if *cap < 0 {
                return Err(BudgetError::Validation(format!(
                    "Cap for {} must not be negative",
                    category.as_str()
                )));
            }
        }

        let (week_start, _) = week_bounds(request.week_date);
        let _guard = self.locks.acquire((user_id, week_start)).await;

        let mut budget = self
            .budget_repository
            .find_one(user_id, week_start)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BudgetError::BudgetNotFound,
                RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
            })?
            .ok_or(BudgetError::BudgetNotFound)?;

        for (category, cap) in request.limits {
            budget
                .categories
                .entry(category)
                .or_insert_with(|| CategoryBudgetLine::with_cap(0))
                .max_budget_paise = cap;
        }

        // Caps changed, so the derived fields must be refreshed.
        budget.total_budget_paise = budget.categories.values().map(|l| l.max_budget_paise).sum();
        budget.budget_utilization =
            utilization_percent(budget.total_spent_paise, budget.total_budget_paise);
        budget.overall_risk_score = overall_risk_score(&budget.categories);
        budget.ai_last_analyzed = Some(Utc::now());
        budget.last_updated = Utc::now();

        self.budget_repository
            .upsert(budget)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BudgetError::BudgetNotFound,
                RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
            })
    }

    async fn history(&self, user_id: Uuid, limit: usize) -> Result<BudgetHistory, BudgetError> {
        let budgets = self
            .budget_repository
            .find_recent(user_id, limit)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => BudgetError::BudgetNotFound,
                RepositoryError::DatabaseError(msg) => BudgetError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => BudgetError::DatabaseError(msg),
            })?;

        let trends = calculate_trends(&budgets);
        let total_weeks = budgets.len();

        Ok(BudgetHistory {
            budgets,
            trends,
            total_weeks,
        })
    }
}
