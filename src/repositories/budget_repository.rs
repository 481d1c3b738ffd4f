use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::budget::WeeklyBudget;
use crate::repositories::RepositoryError;

/// Contract over the weekly-budget store, keyed by (user, week start).
#[async_trait]
pub trait BudgetRepository: Send + Sync {
    /// Insert or replace the budget for its (user, week start) key
    async fn upsert(&self, budget: WeeklyBudget) -> Result<WeeklyBudget, RepositoryError>;

    /// Find the budget for a specific week
    async fn find_one(
        &self,
        user_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyBudget>, RepositoryError>;

    /// Most recent budgets for a user, newest week first
    async fn find_recent(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<WeeklyBudget>, RepositoryError>;
}

pub struct InMemoryBudgetRepository {
    budgets: Mutex<HashMap<(Uuid, NaiveDate), WeeklyBudget>>,
    should_fail: bool,
}

impl InMemoryBudgetRepository {
    pub fn new() -> Self {
        Self {
            budgets: Mutex::new(HashMap::new()),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            budgets: Mutex::new(HashMap::new()),
            should_fail: true,
        }
    }
}

impl Default for InMemoryBudgetRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BudgetRepository for InMemoryBudgetRepository {
    async fn upsert(&self, budget: WeeklyBudget) -> Result<WeeklyBudget, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let mut budgets = self.budgets.lock().unwrap();
        budgets.insert((budget.user_id, budget.week_start), budget.clone());
        Ok(budget)
    }

    async fn find_one(
        &self,
        user_id: Uuid,
        week_start: NaiveDate,
    ) -> Result<Option<WeeklyBudget>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let budgets = self.budgets.lock().unwrap();
        Ok(budgets.get(&(user_id, week_start)).cloned())
    }

    async fn find_recent(
        &self,
        user_id: Uuid,
        limit: usize,
    ) -> Result<Vec<WeeklyBudget>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let budgets = self.budgets.lock().unwrap();
        let mut recent: Vec<WeeklyBudget> = budgets
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        recent.sort_by(|a, b| b.week_start.cmp(&a.week_start));
        recent.truncate(limit);
        Ok(recent)
    }
}
