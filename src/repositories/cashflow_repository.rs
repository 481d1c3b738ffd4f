use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::cashflow::DailyCashflow;
use crate::repositories::RepositoryError;

/// Contract over the daily-cashflow cache, keyed by (user, calendar day).
#[async_trait]
pub trait CashflowRepository: Send + Sync {
    /// Insert or replace the row for its (user, date) key
    async fn upsert(&self, cashflow: DailyCashflow) -> Result<DailyCashflow, RepositoryError>;

    /// Find the row for one day
    async fn find_one(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyCashflow>, RepositoryError>;

    /// All rows for a user within an inclusive date range, oldest first
    async fn find_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyCashflow>, RepositoryError>;
}

pub struct InMemoryCashflowRepository {
    rows: Mutex<HashMap<(Uuid, NaiveDate), DailyCashflow>>,
    should_fail: bool,
}

impl InMemoryCashflowRepository {
    pub fn new() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            rows: Mutex::new(HashMap::new()),
            should_fail: true,
        }
    }
}

impl Default for InMemoryCashflowRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CashflowRepository for InMemoryCashflowRepository {
    async fn upsert(&self, cashflow: DailyCashflow) -> Result<DailyCashflow, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let mut rows = self.rows.lock().unwrap();
        rows.insert((cashflow.user_id, cashflow.date), cashflow.clone());
        Ok(cashflow)
    }

    async fn find_one(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Option<DailyCashflow>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&(user_id, date)).cloned())
    }

    async fn find_range(
        &self,
        user_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<DailyCashflow>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let rows = self.rows.lock().unwrap();
        let mut matches: Vec<DailyCashflow> = rows
            .values()
            .filter(|r| r.user_id == user_id && r.date >= start && r.date <= end)
            .cloned()
            .collect();
        matches.sort_by(|a, b| a.date.cmp(&b.date));
        Ok(matches)
    }
}
