use async_trait::async_trait;
use chrono::{Datelike, Duration, NaiveDate, NaiveTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ErrorCategory;
use crate::locks::KeyedLocks;
use crate::models::cashflow::{CashflowStatus, DailyCashflow, HeatmapDay, MonthHeatmap};
use crate::models::transaction::{TransactionKind, TransactionQuery};
use crate::repositories::{CashflowRepository, RepositoryError, TransactionRepository};

/// Cashflow service errors
#[derive(Debug, thiserror::Error)]
pub enum CashflowError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl CashflowError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            CashflowError::Validation(_) => ErrorCategory::Validation,
            CashflowError::DatabaseError(_) => ErrorCategory::Storage,
        }
    }
}

/// Labels a day from its paise totals. Thresholds are in major units:
/// net of +₹500 and up is a high-earning day, -₹200 and below a heavy one.
pub fn cashflow_status(income_paise: i64, expense_paise: i64) -> CashflowStatus {
    if income_paise == 0 && expense_paise == 0 {
        return CashflowStatus::Neutral;
    }
    let net_paise = income_paise - expense_paise;
    if net_paise >= 50_000 {
        CashflowStatus::HighEarning
    } else if net_paise <= -20_000 {
        CashflowStatus::HeavyExpense
    } else {
        CashflowStatus::Balanced
    }
}

/// Trait defining daily cashflow operations
#[async_trait]
pub trait CashflowService: Send + Sync {
    /// Recompute one day's totals from the ledger and upsert the cache row.
    /// Always a full re-sum, so a missed update heals on the next sync.
    async fn sync_day(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<DailyCashflow, CashflowError>;

    /// The cached row for a day, computed lazily when absent
    async fn cashflow_for(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<DailyCashflow, CashflowError>;

    /// Full-calendar heatmap for one month; days without data are
    /// zero-valued and neutral
    async fn month_heatmap(
        &self,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<MonthHeatmap, CashflowError>;

    /// Rebuild the cache row for every day the user has ledger activity on.
    /// Returns the number of days synced.
    async fn backfill(&self, user_id: Uuid) -> Result<usize, CashflowError>;
}

/// Implementation of CashflowService
pub struct CashflowServiceImpl {
    transaction_repository: Arc<dyn TransactionRepository>,
    cashflow_repository: Arc<dyn CashflowRepository>,
    locks: KeyedLocks<(Uuid, NaiveDate)>,
}

impl CashflowServiceImpl {
    pub fn new(
        transaction_repository: Arc<dyn TransactionRepository>,
        cashflow_repository: Arc<dyn CashflowRepository>,
    ) -> Self {
        Self {
            transaction_repository,
            cashflow_repository,
            locks: KeyedLocks::new(),
        }
    }
}

#[async_trait]
impl CashflowService for CashflowServiceImpl {
    async fn sync_day(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<DailyCashflow, CashflowError> {
        let _guard = self.locks.acquire((user_id, date)).await;

        let day_from = date.and_time(NaiveTime::MIN).and_utc();
        let day_until = (date + Duration::days(1)).and_time(NaiveTime::MIN).and_utc();

        let entries = self
            .transaction_repository
            .find_by_user(
                user_id,
                TransactionQuery {
                    from: Some(day_from),
                    until: Some(day_until),
                    ..TransactionQuery::default()
                },
            )
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    CashflowError::DatabaseError("Ledger unavailable".to_string())
                }
                RepositoryError::DatabaseError(msg) => CashflowError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => CashflowError::DatabaseError(msg),
            })?;

        let mut income_paise = 0i64;
        let mut expense_paise = 0i64;
        for entry in &entries {
            match entry.kind {
                TransactionKind::Income => income_paise += entry.amount_paise,
                TransactionKind::Expense => expense_paise += entry.amount_paise,
                TransactionKind::Transfer => {}
            }
        }

        let cashflow = DailyCashflow {
            user_id,
            date,
            income_paise,
            expense_paise,
            net_paise: income_paise - expense_paise,
            status: cashflow_status(income_paise, expense_paise),
            last_updated: Utc::now(),
        };

        self.cashflow_repository
            .upsert(cashflow)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    CashflowError::DatabaseError("Cashflow store unavailable".to_string())
                }
                RepositoryError::DatabaseError(msg) => CashflowError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => CashflowError::DatabaseError(msg),
            })
    }

    async fn cashflow_for(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<DailyCashflow, CashflowError> {
        let existing = self
            .cashflow_repository
            .find_one(user_id, date)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    CashflowError::DatabaseError("Cashflow store unavailable".to_string())
                }
                RepositoryError::DatabaseError(msg) => CashflowError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => CashflowError::DatabaseError(msg),
            })?;

        match existing {
            Some(cashflow) => Ok(cashflow),
            // Cache row missing; rebuild it from the ledger.
            None => self.sync_day(user_id, date).await,
        }
    }

    async fn month_heatmap(
        &self,
        user_id: Uuid,
        year: i32,
        month: u32,
    ) -> Result<MonthHeatmap, CashflowError> {
        let month_start = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| {
            CashflowError::Validation(format!("{}-{} is not a valid month", year, month))
        })?;
        let next_month = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(|| {
            CashflowError::Validation(format!("{}-{} is not a valid month", year, month))
        })?;
        let month_end = next_month - Duration::days(1);

        let rows = self
            .cashflow_repository
            .find_range(user_id, month_start, month_end)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    CashflowError::DatabaseError("Cashflow store unavailable".to_string())
                }
                RepositoryError::DatabaseError(msg) => CashflowError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => CashflowError::DatabaseError(msg),
            })?;

        let by_date: HashMap<NaiveDate, DailyCashflow> =
            rows.into_iter().map(|r| (r.date, r)).collect();

        let mut days = Vec::with_capacity(31);
        let mut date = month_start;
        while date <= month_end {
            let day = match by_date.get(&date) {
                Some(row) => HeatmapDay {
                    day: date.day(),
                    date,
                    income_paise: row.income_paise,
                    expense_paise: row.expense_paise,
                    net_paise: row.net_paise,
                    status: row.status,
                },
                None => HeatmapDay {
                    day: date.day(),
                    date,
                    income_paise: 0,
                    expense_paise: 0,
                    net_paise: 0,
                    status: CashflowStatus::Neutral,
                },
            };
            days.push(day);
            date = date + Duration::days(1);
        }

        Ok(MonthHeatmap { year, month, days })
    }

    async fn backfill(&self, user_id: Uuid) -> Result<usize, CashflowError> {
        let entries = self
            .transaction_repository
            .find_by_user(user_id, TransactionQuery::default())
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    CashflowError::DatabaseError("Ledger unavailable".to_string())
                }
                RepositoryError::DatabaseError(msg) => CashflowError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => CashflowError::DatabaseError(msg),
            })?;

        let mut dates: Vec<NaiveDate> = entries
            .iter()
            .map(|t| t.timestamp.date_naive())
            .collect();
        dates.sort();
        dates.dedup();

        for date in &dates {
            self.sync_day(user_id, *date).await?;
        }
        Ok(dates.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::{PaymentMethod, Transaction, TransactionSource};
    use crate::repositories::{InMemoryCashflowRepository, InMemoryTransactionRepository};
    use chrono::TimeZone;

    fn service() -> (
        CashflowServiceImpl,
        Arc<InMemoryTransactionRepository>,
        Arc<InMemoryCashflowRepository>,
    ) {
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let cashflows = Arc::new(InMemoryCashflowRepository::new());
        let service = CashflowServiceImpl::new(transactions.clone(), cashflows.clone());
        (service, transactions, cashflows)
    }

    fn entry(user_id: Uuid, kind: TransactionKind, amount_paise: i64, day: u32) -> Transaction {
        Transaction {
            id: Uuid::new_v4(),
            user_id,
            client_local_id: None,
            kind,
            amount_paise,
            category: "other".to_string(),
            merchant: None,
            method: PaymentMethod::Cash,
            timestamp: Utc.with_ymd_and_hms(2025, 11, day, 12, 0, 0).unwrap(),
            source: TransactionSource::Manual,
            parser_meta: None,
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 11, d).unwrap()
    }

    #[test]
    fn test_status_neutral_when_no_activity() {
        assert_eq!(cashflow_status(0, 0), CashflowStatus::Neutral);
    }

    #[test]
    fn test_status_high_earning_at_500_rupees_net() {
        assert_eq!(cashflow_status(100_000, 0), CashflowStatus::HighEarning);
        // Exactly on the threshold.
        assert_eq!(cashflow_status(50_000, 0), CashflowStatus::HighEarning);
        assert_eq!(cashflow_status(49_999, 0), CashflowStatus::Balanced);
    }

    #[test]
    fn test_status_heavy_expense_at_minus_200_rupees_net() {
        assert_eq!(cashflow_status(0, 30_000), CashflowStatus::HeavyExpense);
        assert_eq!(cashflow_status(0, 20_000), CashflowStatus::HeavyExpense);
        assert_eq!(cashflow_status(0, 19_999), CashflowStatus::Balanced);
    }

    #[test]
    fn test_status_balanced_between_thresholds() {
        assert_eq!(cashflow_status(50_000, 40_000), CashflowStatus::Balanced);
    }

    #[tokio::test]
    async fn test_sync_day_sums_and_classifies() {
        let (service, transactions, _cashflows) = service();
        let user_id = Uuid::new_v4();

        transactions
            .append(entry(user_id, TransactionKind::Income, 120_000, 12))
            .await
            .unwrap();
        transactions
            .append(entry(user_id, TransactionKind::Expense, 30_000, 12))
            .await
            .unwrap();
        // Transfers never count.
        transactions
            .append(entry(user_id, TransactionKind::Transfer, 500_000, 12))
            .await
            .unwrap();

        let cashflow = service.sync_day(user_id, day(12)).await.unwrap();
        assert_eq!(cashflow.income_paise, 120_000);
        assert_eq!(cashflow.expense_paise, 30_000);
        assert_eq!(cashflow.net_paise, 90_000);
        assert_eq!(cashflow.status, CashflowStatus::HighEarning);
    }

    #[tokio::test]
    async fn test_sync_day_recomputes_rather_than_increments() {
        let (service, transactions, _cashflows) = service();
        let user_id = Uuid::new_v4();

        transactions
            .append(entry(user_id, TransactionKind::Expense, 10_000, 12))
            .await
            .unwrap();
        service.sync_day(user_id, day(12)).await.unwrap();

        transactions
            .append(entry(user_id, TransactionKind::Expense, 5_000, 12))
            .await
            .unwrap();
        let second = service.sync_day(user_id, day(12)).await.unwrap();

        // Re-summed from the ledger, not 10k + (10k + 5k).
        assert_eq!(second.expense_paise, 15_000);

        let third = service.sync_day(user_id, day(12)).await.unwrap();
        assert_eq!(third.expense_paise, 15_000);
    }

    #[tokio::test]
    async fn test_sync_day_ignores_other_days() {
        let (service, transactions, _cashflows) = service();
        let user_id = Uuid::new_v4();

        transactions
            .append(entry(user_id, TransactionKind::Expense, 10_000, 11))
            .await
            .unwrap();
        transactions
            .append(entry(user_id, TransactionKind::Expense, 7_000, 12))
            .await
            .unwrap();

        let cashflow = service.sync_day(user_id, day(12)).await.unwrap();
        assert_eq!(cashflow.expense_paise, 7_000);
    }

    #[tokio::test]
    async fn test_cashflow_for_computes_lazily() {
        let (service, transactions, cashflows) = service();
        let user_id = Uuid::new_v4();

        transactions
            .append(entry(user_id, TransactionKind::Income, 60_000, 12))
            .await
            .unwrap();

        assert!(cashflows.find_one(user_id, day(12)).await.unwrap().is_none());

        let cashflow = service.cashflow_for(user_id, day(12)).await.unwrap();
        assert_eq!(cashflow.income_paise, 60_000);
        assert_eq!(cashflow.status, CashflowStatus::HighEarning);

        // Now cached.
        assert!(cashflows.find_one(user_id, day(12)).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_month_heatmap_fills_missing_days_with_neutral() {
        let (service, transactions, _cashflows) = service();
        let user_id = Uuid::new_v4();

        transactions
            .append(entry(user_id, TransactionKind::Income, 80_000, 12))
            .await
            .unwrap();
        service.sync_day(user_id, day(12)).await.unwrap();

        let heatmap = service.month_heatmap(user_id, 2025, 11).await.unwrap();
        assert_eq!(heatmap.days.len(), 30);

        let active = &heatmap.days[11];
        assert_eq!(active.day, 12);
        assert_eq!(active.income_paise, 80_000);
        assert_eq!(active.status, CashflowStatus::HighEarning);

        let idle = &heatmap.days[0];
        assert_eq!(idle.day, 1);
        assert_eq!(idle.income_paise, 0);
        assert_eq!(idle.status, CashflowStatus::Neutral);
    }

    #[tokio::test]
    async fn test_month_heatmap_handles_december_rollover() {
        let (service, _transactions, _cashflows) = service();
        let heatmap = service
            .month_heatmap(Uuid::new_v4(), 2025, 12)
            .await
            .unwrap();
        assert_eq!(heatmap.days.len(), 31);
    }

    #[tokio::test]
    async fn test_month_heatmap_rejects_invalid_month() {
        let (service, _transactions, _cashflows) = service();
        let result = service.month_heatmap(Uuid::new_v4(), 2025, 13).await;
        assert!(matches!(result.unwrap_err(), CashflowError::Validation(_)));
    }

    #[tokio::test]
    async fn test_backfill_rebuilds_every_active_day() {
        let (service, transactions, cashflows) = service();
        let user_id = Uuid::new_v4();

        transactions
            .append(entry(user_id, TransactionKind::Income, 70_000, 10))
            .await
            .unwrap();
        transactions
            .append(entry(user_id, TransactionKind::Expense, 25_000, 11))
            .await
            .unwrap();
        transactions
            .append(entry(user_id, TransactionKind::Expense, 4_000, 11))
            .await
            .unwrap();

        let synced = service.backfill(user_id).await.unwrap();
        assert_eq!(synced, 2);

        let monday = cashflows.find_one(user_id, day(10)).await.unwrap().unwrap();
        assert_eq!(monday.status, CashflowStatus::HighEarning);
        let tuesday = cashflows.find_one(user_id, day(11)).await.unwrap().unwrap();
        assert_eq!(tuesday.expense_paise, 29_000);
        assert_eq!(tuesday.status, CashflowStatus::HeavyExpense);
    }

    #[tokio::test]
    async fn test_storage_failure_surfaces_as_database_error() {
        let transactions = Arc::new(InMemoryTransactionRepository::with_failure());
        let cashflows = Arc::new(InMemoryCashflowRepository::new());
        let service = CashflowServiceImpl::new(transactions, cashflows);

        let result = service.sync_day(Uuid::new_v4(), day(12)).await;
        assert!(matches!(
            result.unwrap_err(),
            CashflowError::DatabaseError(_)
        ));
    }
}
