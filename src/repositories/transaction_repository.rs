use async_trait::async_trait;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::transaction::{Transaction, TransactionQuery};
use crate::repositories::RepositoryError;

/// Contract over the transaction source of truth. The ledger is append-only:
/// nothing here mutates or deletes an existing entry.
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Append a new transaction to the ledger
    async fn append(&self, transaction: Transaction) -> Result<Transaction, RepositoryError>;

    /// Find a user's transactions matching the query, newest first
    async fn find_by_user(
        &self,
        user_id: Uuid,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>, RepositoryError>;

    /// Look up a transaction by the device-side idempotency key
    async fn find_by_client_id(
        &self,
        user_id: Uuid,
        client_local_id: &str,
    ) -> Result<Option<Transaction>, RepositoryError>;
}

/// In-memory ledger used by tests and single-process deployments; a real
/// document store implements the same trait out of crate.
pub struct InMemoryTransactionRepository {
    entries: Mutex<Vec<Transaction>>,
    should_fail: bool,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            should_fail: false,
        }
    }

    /// Adapter that fails every call, for exercising storage-error paths.
    pub fn with_failure() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            should_fail: true,
        }
    }
}

impl Default for InMemoryTransactionRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn append(&self, transaction: Transaction) -> Result<Transaction, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let mut entries = self.entries.lock().unwrap();
        entries.push(transaction.clone());
        Ok(transaction)
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        query: TransactionQuery,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let entries = self.entries.lock().unwrap();
        let mut matches: Vec<Transaction> = entries
            .iter()
            .filter(|t| t.user_id == user_id)
            .filter(|t| query.kind.map_or(true, |kind| t.kind == kind))
            .filter(|t| {
                query
                    .category
                    .as_deref()
                    .map_or(true, |category| t.category == category)
            })
            .filter(|t| query.from.map_or(true, |from| t.timestamp >= from))
            .filter(|t| query.until.map_or(true, |until| t.timestamp < until))
            .cloned()
            .collect();

        // Newest first
        matches.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let offset = query.offset.unwrap_or(0);
        let matches: Vec<Transaction> = match query.limit {
            Some(limit) => matches.into_iter().skip(offset).take(limit).collect(),
            None => matches.into_iter().skip(offset).collect(),
        };

        Ok(matches)
    }

    async fn find_by_client_id(
        &self,
        user_id: Uuid,
        client_local_id: &str,
    ) -> Result<Option<Transaction>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let entries = self.entries.lock().unwrap();
        Ok(entries
            .iter()
            .find(|t| {
                t.user_id == user_id && t.client_local_id.as_deref() == Some(client_local_id)
            })
            .cloned())
    }
}
