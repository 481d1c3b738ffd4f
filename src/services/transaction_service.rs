use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ErrorCategory;
use crate::models::transaction::{
    CreateTransactionRequest, Transaction, TransactionQuery,
};
use crate::repositories::{RepositoryError, TransactionRepository};
use crate::services::budget_service::BudgetService;
use crate::services::cashflow_service::CashflowService;

/// Transaction service errors
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl TransactionError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            TransactionError::Validation(_) => ErrorCategory::Validation,
            TransactionError::DatabaseError(_) => ErrorCategory::Storage,
        }
    }
}

/// Whether one derived aggregate was refreshed after the ledger write.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum RefreshOutcome {
    Refreshed,
    Failed(String),
    /// Nothing to refresh, e.g. a deduplicated capture.
    Skipped,
}

/// Outcomes of the derived-aggregate refreshes that follow a write. A failed
/// refresh never fails the write itself; it is reported here and logged.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DerivedRefresh {
    pub weekly_budget: RefreshOutcome,
    pub daily_cashflow: RefreshOutcome,
}

impl DerivedRefresh {
    pub fn skipped() -> Self {
        Self {
            weekly_budget: RefreshOutcome::Skipped,
            daily_cashflow: RefreshOutcome::Skipped,
        }
    }

    /// True when every aggregate refreshed cleanly (or had nothing to do).
    pub fn fully_applied(&self) -> bool {
        !matches!(self.weekly_budget, RefreshOutcome::Failed(_))
            && !matches!(self.daily_cashflow, RefreshOutcome::Failed(_))
    }
}

/// A stored transaction plus what happened to the derived aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct RecordedTransaction {
    pub transaction: Transaction,
    pub derived: DerivedRefresh,
    /// True when the capture matched an existing `client_local_id` and no
    /// new ledger entry was written.
    pub deduplicated: bool,
}

/// Trait defining transaction capture operations
#[async_trait]
pub trait TransactionService: Send + Sync {
    /// Validate and append a transaction, then refresh the week's budget and
    /// the day's cashflow best-effort
    async fn record_transaction(
        &self,
        user_id: Uuid,
        request: CreateTransactionRequest,
    ) -> Result<RecordedTransaction, TransactionError>;

    /// A user's transactions matching the query, newest first
    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>, TransactionError>;
}

/// Implementation of TransactionService
pub struct TransactionServiceImpl {
    transaction_repository: Arc<dyn TransactionRepository>,
    budget_service: Arc<dyn BudgetService>,
    cashflow_service: Arc<dyn CashflowService>,
}

impl TransactionServiceImpl {
    pub fn new(
        transaction_repository: Arc<dyn TransactionRepository>,
        budget_service: Arc<dyn BudgetService>,
        cashflow_service: Arc<dyn CashflowService>,
    ) -> Self {
        Self {
            transaction_repository,
            budget_service,
            cashflow_service,
        }
    }

    async fn refresh_derived(&self, transaction: &Transaction) -> DerivedRefresh {
        let date = transaction.timestamp.date_naive();

        let weekly_budget = match self
            .budget_service
            .compute_week(transaction.user_id, date)
            .await
        {
            Ok(_) => RefreshOutcome::Refreshed,
            Err(err) => {
                tracing::warn!(
                    user_id = %transaction.user_id,
                    transaction_id = %transaction.id,
                    %date,
                    error = %err,
                    "weekly budget refresh failed after ledger write"
                );
                RefreshOutcome::Failed(err.to_string())
            }
        };

        let daily_cashflow = match self
            .cashflow_service
            .sync_day(transaction.user_id, date)
            .await
        {
            Ok(_) => RefreshOutcome::Refreshed,
            Err(err) => {
                tracing::warn!(
                    user_id = %transaction.user_id,
                    transaction_id = %transaction.id,
                    %date,
                    error = %err,
                    "daily cashflow refresh failed after ledger write"
                );
                RefreshOutcome::Failed(err.to_string())
            }
        };

        DerivedRefresh {
            weekly_budget,
            daily_cashflow,
        }
    }
}

#[async_trait]
impl TransactionService for TransactionServiceImpl {
    async fn record_transaction(
        &self,
        user_id: Uuid,
        request: CreateTransactionRequest,
    ) -> Result<RecordedTransaction, TransactionError> {
        request
            .validate()
            .map_err(|e| TransactionError::Validation(e.to_string()))?;

        // Device retries carry the same client_local_id; answer with the
        // already-stored entry instead of double-booking.
        if let Some(ref client_local_id) = request.client_local_id {
            let existing = self
                .transaction_repository
                .find_by_client_id(user_id, client_local_id)
                .await
                .map_err(|e| match e {
                    RepositoryError::NotFound => {
                        TransactionError::DatabaseError("Ledger unavailable".to_string())
                    }
                    RepositoryError::DatabaseError(msg) => TransactionError::DatabaseError(msg),
                    RepositoryError::ConstraintViolation(msg) => {
                        TransactionError::DatabaseError(msg)
                    }
                })?;
            if let Some(transaction) = existing {
                return Ok(RecordedTransaction {
                    transaction,
                    derived: DerivedRefresh::skipped(),
                    deduplicated: true,
                });
            }
        }

        let transaction = Transaction {
            id: Uuid::new_v4(),
            user_id,
            client_local_id: request.client_local_id,
            kind: request.kind,
            amount_paise: request.amount_paise,
            category: request.category,
            merchant: request.merchant,
            method: request.method.unwrap_or_default(),
            timestamp: request.timestamp,
            source: request.source.unwrap_or_default(),
            parser_meta: request.parser_meta,
            notes: request.notes,
            created_at: Utc::now(),
        };

        let stored = self
            .transaction_repository
            .append(transaction)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    TransactionError::DatabaseError("Ledger unavailable".to_string())
                }
                RepositoryError::DatabaseError(msg) => TransactionError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => TransactionError::DatabaseError(msg),
            })?;

        let derived = self.refresh_derived(&stored).await;

        Ok(RecordedTransaction {
            transaction: stored,
            derived,
            deduplicated: false,
        })
    }

    async fn transactions_for_user(
        &self,
        user_id: Uuid,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>, TransactionError> {
        self.transaction_repository
            .find_by_user(user_id, query)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => {
                    TransactionError::DatabaseError("Ledger unavailable".to_string())
                }
                RepositoryError::DatabaseError(msg) => TransactionError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => TransactionError::DatabaseError(msg),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::{PaymentMethod, TransactionKind, TransactionSource};
    use crate::repositories::{
        InMemoryBudgetRepository, InMemoryCashflowRepository, InMemoryTransactionRepository,
    };
    use crate::repositories::budget_repository::BudgetRepository;
    use crate::repositories::cashflow_repository::CashflowRepository;
    use crate::services::budget_service::BudgetServiceImpl;
    use crate::services::cashflow_service::CashflowServiceImpl;
    use chrono::TimeZone;

    struct Fixture {
        service: TransactionServiceImpl,
        transactions: Arc<InMemoryTransactionRepository>,
        budgets: Arc<InMemoryBudgetRepository>,
        cashflows: Arc<InMemoryCashflowRepository>,
    }

    fn fixture() -> Fixture {
        fixture_with_budget_repo(Arc::new(InMemoryBudgetRepository::new()))
    }

    fn fixture_with_budget_repo(budgets: Arc<InMemoryBudgetRepository>) -> Fixture {
        let transactions = Arc::new(InMemoryTransactionRepository::new());
        let cashflows = Arc::new(InMemoryCashflowRepository::new());
        let budget_service = Arc::new(BudgetServiceImpl::new(
            transactions.clone(),
            budgets.clone(),
        ));
        let cashflow_service = Arc::new(CashflowServiceImpl::new(
            transactions.clone(),
            cashflows.clone(),
        ));
        let service = TransactionServiceImpl::new(
            transactions.clone(),
            budget_service,
            cashflow_service,
        );
        Fixture {
            service,
            transactions,
            budgets,
            cashflows,
        }
    }

    fn request(kind: TransactionKind, amount_paise: i64, category: &str) -> CreateTransactionRequest {
        CreateTransactionRequest {
            client_local_id: None,
            kind,
            amount_paise,
            category: category.to_string(),
            merchant: None,
            method: Some(PaymentMethod::Upi),
            timestamp: Utc.with_ymd_and_hms(2025, 11, 12, 14, 30, 0).unwrap(),
            source: Some(TransactionSource::Manual),
            parser_meta: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_record_transaction_appends_and_refreshes_derived() {
        let fx = fixture();
        let user_id = Uuid::new_v4();

        let recorded = fx
            .service
            .record_transaction(user_id, request(TransactionKind::Expense, 25_000, "fuel"))
            .await
            .unwrap();

        assert!(!recorded.deduplicated);
        assert_eq!(recorded.derived.weekly_budget, RefreshOutcome::Refreshed);
        assert_eq!(recorded.derived.daily_cashflow, RefreshOutcome::Refreshed);
        assert!(recorded.derived.fully_applied());

        // Both derived records exist and reflect the write.
        let date = recorded.transaction.timestamp.date_naive();
        let week_start = crate::services::budget_service::week_bounds(date).0;
        let budget = fx.budgets.find_one(user_id, week_start).await.unwrap().unwrap();
        assert_eq!(budget.total_spent_paise, 25_000);

        let cashflow = fx.cashflows.find_one(user_id, date).await.unwrap().unwrap();
        assert_eq!(cashflow.expense_paise, 25_000);
    }

    #[tokio::test]
    async fn test_record_transaction_rejects_invalid_request() {
        let fx = fixture();
        let user_id = Uuid::new_v4();

        let zero_amount = request(TransactionKind::Expense, 0, "fuel");
        assert!(matches!(
            fx.service
                .record_transaction(user_id, zero_amount)
                .await
                .unwrap_err(),
            TransactionError::Validation(_)
        ));

        let empty_category = request(TransactionKind::Expense, 1_000, "");
        assert!(matches!(
            fx.service
                .record_transaction(user_id, empty_category)
                .await
                .unwrap_err(),
            TransactionError::Validation(_)
        ));

        // Nothing was written.
        let stored = fx
            .service
            .transactions_for_user(user_id, TransactionQuery::default())
            .await
            .unwrap();
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_record_transaction_deduplicates_by_client_id() {
        let fx = fixture();
        let user_id = Uuid::new_v4();

        let mut first = request(TransactionKind::Expense, 12_000, "food");
        first.client_local_id = Some("device-42".to_string());
        let recorded = fx.service.record_transaction(user_id, first.clone()).await.unwrap();

        let replay = fx.service.record_transaction(user_id, first).await.unwrap();
        assert!(replay.deduplicated);
        assert_eq!(replay.transaction.id, recorded.transaction.id);
        assert_eq!(replay.derived, DerivedRefresh::skipped());

        let stored = fx
            .service
            .transactions_for_user(user_id, TransactionQuery::default())
            .await
            .unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_budget_refresh_failure_does_not_fail_the_write() {
        let fx = fixture_with_budget_repo(Arc::new(InMemoryBudgetRepository::with_failure()));
        let user_id = Uuid::new_v4();

        let recorded = fx
            .service
            .record_transaction(user_id, request(TransactionKind::Expense, 9_000, "food"))
            .await
            .unwrap();

        // Primary write landed.
        let stored = fx.transactions.find_by_user(user_id, TransactionQuery::default()).await.unwrap();
        assert_eq!(stored.len(), 1);

        // Partial success is visible, not swallowed.
        assert!(matches!(
            recorded.derived.weekly_budget,
            RefreshOutcome::Failed(_)
        ));
        assert_eq!(recorded.derived.daily_cashflow, RefreshOutcome::Refreshed);
        assert!(!recorded.derived.fully_applied());
    }

    #[tokio::test]
    async fn test_transactions_for_user_filters_and_pages() {
        let fx = fixture();
        let user_id = Uuid::new_v4();

        for (kind, amount, category, hour) in [
            (TransactionKind::Expense, 5_000, "fuel", 9),
            (TransactionKind::Expense, 8_000, "food", 12),
            (TransactionKind::Income, 90_000, "gig_payout", 20),
        ] {
            let mut req = request(kind, amount, category);
            req.timestamp = Utc.with_ymd_and_hms(2025, 11, 12, hour, 0, 0).unwrap();
            fx.service.record_transaction(user_id, req).await.unwrap();
        }

        let all = fx
            .service
            .transactions_for_user(user_id, TransactionQuery::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 3);
        // Newest first.
        assert_eq!(all[0].category, "gig_payout");

        let expenses = fx
            .service
            .transactions_for_user(
                user_id,
                TransactionQuery {
                    kind: Some(TransactionKind::Expense),
                    ..TransactionQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(expenses.len(), 2);

        let paged = fx
            .service
            .transactions_for_user(
                user_id,
                TransactionQuery {
                    limit: Some(1),
                    offset: Some(1),
                    ..TransactionQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].category, "food");
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            TransactionError::Validation("x".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            TransactionError::DatabaseError("x".into()).category(),
            ErrorCategory::Storage
        );
    }
}
