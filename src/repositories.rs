pub mod budget_repository;
pub mod cashflow_repository;
pub mod challenge_repository;
pub mod jar_repository;
pub mod transaction_repository;

pub use budget_repository::{BudgetRepository, InMemoryBudgetRepository};
pub use cashflow_repository::{CashflowRepository, InMemoryCashflowRepository};
pub use challenge_repository::{ChallengeRepository, InMemoryChallengeRepository};
pub use jar_repository::{InMemoryJarRepository, JarRepository};
pub use transaction_repository::{InMemoryTransactionRepository, TransactionRepository};

/// Repository errors for storage operations
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Resource not found")]
    NotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),
}
