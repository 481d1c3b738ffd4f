use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::error::ErrorCategory;
use crate::locks::KeyedLocks;
use crate::models::jar::{CreateJarRequest, JarDeposit, JarStatus, SavingsJar, SavingsOverview};
use crate::models::transaction::{TransactionKind, TransactionQuery};
use crate::repositories::{JarRepository, RepositoryError, TransactionRepository};

/// Title of the auto-created jar that collects challenge rewards.
pub const REWARDS_JAR_TITLE: &str = "Challenge Rewards";
/// Effectively unbounded target so the rewards jar never completes.
const REWARDS_JAR_TARGET_PAISE: i64 = 99_999_999_900;

/// Savings jar service errors
#[derive(Debug, thiserror::Error)]
pub enum JarError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Savings jar not found")]
    JarNotFound,

    #[error("Jar is not active")]
    JarNotActive,

    #[error("Deposit of {requested_paise} paise exceeds unallocated cash of {available_paise} paise")]
    InsufficientUnallocatedCash {
        requested_paise: i64,
        available_paise: i64,
    },

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl JarError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            JarError::Validation(_) => ErrorCategory::Validation,
            // Other users' jars read as missing as well.
            JarError::JarNotFound => ErrorCategory::NotFound,
            JarError::JarNotActive | JarError::InsufficientUnallocatedCash { .. } => {
                ErrorCategory::Conflict
            }
            JarError::DatabaseError(_) => ErrorCategory::Storage,
        }
    }
}

/// Result of a successful deposit.
#[derive(Debug, Clone)]
pub struct DepositOutcome {
    pub jar: SavingsJar,
    pub deposited_paise: i64,
    /// True when this deposit pushed the jar over its target.
    pub completed: bool,
}

/// Trait defining savings jar operations
#[async_trait]
pub trait JarService: Send + Sync {
    /// Create a new jar for a user
    async fn create_jar(
        &self,
        user_id: Uuid,
        request: CreateJarRequest,
    ) -> Result<SavingsJar, JarError>;

    /// A user's active jars, soonest deadline first
    async fn jars_for_user(&self, user_id: Uuid) -> Result<Vec<SavingsJar>, JarError>;

    /// Deposit into a jar. Guarded by unallocated cash and serialized per
    /// user, so concurrent deposits cannot jointly overdraw.
    async fn deposit(
        &self,
        user_id: Uuid,
        jar_id: Uuid,
        amount_paise: i64,
    ) -> Result<DepositOutcome, JarError>;

    /// Lifetime totals and unallocated cash for a user
    async fn savings_overview(&self, user_id: Uuid) -> Result<SavingsOverview, JarError>;

    /// The user's active rewards jar, created on first use
    async fn reward_jar(&self, user_id: Uuid) -> Result<SavingsJar, JarError>;
}

/// Implementation of JarService
pub struct JarServiceImpl {
    jar_repository: Arc<dyn JarRepository>,
    transaction_repository: Arc<dyn TransactionRepository>,
    user_locks: KeyedLocks<Uuid>,
}

impl JarServiceImpl {
    pub fn new(
        jar_repository: Arc<dyn JarRepository>,
        transaction_repository: Arc<dyn TransactionRepository>,
    ) -> Self {
        Self {
            jar_repository,
            transaction_repository,
            user_locks: KeyedLocks::new(),
        }
    }

    async fn lifetime_kind_total(
        &self,
        user_id: Uuid,
        kind: TransactionKind,
    ) -> Result<i64, JarError> {
        let entries = self
            .transaction_repository
            .find_by_user(
                user_id,
                TransactionQuery {
                    kind: Some(kind),
                    ..TransactionQuery::default()
                },
            )
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => JarError::JarNotFound,
                RepositoryError::DatabaseError(msg) => JarError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => JarError::DatabaseError(msg),
            })?;
        Ok(entries.iter().map(|t| t.amount_paise).sum())
    }

    async fn overview_unlocked(&self, user_id: Uuid) -> Result<SavingsOverview, JarError> {
        let lifetime_income_paise = self
            .lifetime_kind_total(user_id, TransactionKind::Income)
            .await?;
        let lifetime_expense_paise = self
            .lifetime_kind_total(user_id, TransactionKind::Expense)
            .await?;

        let jars = self
            .jar_repository
            .find_by_user(user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => JarError::JarNotFound,
                RepositoryError::DatabaseError(msg) => JarError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => JarError::DatabaseError(msg),
            })?;
        let total_saved_paise: i64 = jars.iter().map(|j| j.saved_paise).sum();

        Ok(SavingsOverview {
            lifetime_income_paise,
            lifetime_expense_paise,
            total_saved_paise,
            unallocated_paise: lifetime_income_paise - lifetime_expense_paise - total_saved_paise,
        })
    }
}

#[async_trait]
impl JarService for JarServiceImpl {
    async fn create_jar(
        &self,
        user_id: Uuid,
        request: CreateJarRequest,
    ) -> Result<SavingsJar, JarError> {
        request
            .validate()
            .map_err(|e| JarError::Validation(e.to_string()))?;

        let jar = SavingsJar {
            id: Uuid::new_v4(),
            user_id,
            title: request.title,
            target_paise: request.target_paise,
            saved_paise: 0,
            deadline: request.deadline,
            status: JarStatus::Active,
            icon: request.icon.unwrap_or_else(|| "piggy-bank".to_string()),
            color: request.color.unwrap_or_else(|| "#10B981".to_string()),
            history: Vec::new(),
            created_at: Utc::now(),
        };

        self.jar_repository
            .create(jar)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => JarError::JarNotFound,
                RepositoryError::DatabaseError(msg) => JarError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => JarError::DatabaseError(msg),
            })
    }

    async fn jars_for_user(&self, user_id: Uuid) -> Result<Vec<SavingsJar>, JarError> {
        let jars = self
            .jar_repository
            .find_by_user(user_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => JarError::JarNotFound,
                RepositoryError::DatabaseError(msg) => JarError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => JarError::DatabaseError(msg),
            })?;

        // Repository orders by deadline already; keep only active jars.
        Ok(jars
            .into_iter()
            .filter(|j| j.status == JarStatus::Active)
            .collect())
    }

    async fn deposit(
        &self,
        user_id: Uuid,
        jar_id: Uuid,
        amount_paise: i64,
    ) -> Result<DepositOutcome, JarError> {
        if amount_paise <= 0 {
            return Err(JarError::Validation(
                "Deposit amount must be greater than 0 paise".to_string(),
            ));
        }

        // The guard reads lifetime totals and then writes the jar; the
        // per-user lock closes the read-then-write gap.
        let _guard = self.user_locks.acquire(user_id).await;

        let mut jar = self
            .jar_repository
            .find_by_id(jar_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => JarError::JarNotFound,
                RepositoryError::DatabaseError(msg) => JarError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => JarError::DatabaseError(msg),
            })?
            .ok_or(JarError::JarNotFound)?;

        if jar.user_id != user_id {
            return Err(JarError::JarNotFound);
        }
        if jar.status != JarStatus::Active {
            return Err(JarError::JarNotActive);
        }

        let overview = self.overview_unlocked(user_id).await?;
        if amount_paise > overview.unallocated_paise {
            return Err(JarError::InsufficientUnallocatedCash {
                requested_paise: amount_paise,
                available_paise: overview.unallocated_paise.max(0),
            });
        }

        jar.saved_paise += amount_paise;
        jar.history.push(JarDeposit {
            amount_paise,
            deposited_at: Utc::now(),
        });
        let completed = jar.saved_paise >= jar.target_paise;
        if completed {
            jar.status = JarStatus::Completed;
        }

        let jar = self
            .jar_repository
            .update(jar)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => JarError::JarNotFound,
                RepositoryError::DatabaseError(msg) => JarError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => JarError::DatabaseError(msg),
            })?;

        Ok(DepositOutcome {
            jar,
            deposited_paise: amount_paise,
            completed,
        })
    }

    async fn savings_overview(&self, user_id: Uuid) -> Result<SavingsOverview, JarError> {
        self.overview_unlocked(user_id).await
    }

    async fn reward_jar(&self, user_id: Uuid) -> Result<SavingsJar, JarError> {
        if let Some(jar) = self
            .jar_repository
            .find_active_by_title(user_id, REWARDS_JAR_TITLE)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => JarError::JarNotFound,
                RepositoryError::DatabaseError(msg) => JarError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => JarError::DatabaseError(msg),
            })?
        {
            return Ok(jar);
        }

        let jar = SavingsJar {
            id: Uuid::new_v4(),
            user_id,
            title: REWARDS_JAR_TITLE.to_string(),
            target_paise: REWARDS_JAR_TARGET_PAISE,
            saved_paise: 0,
            // Far enough out that the suggested-amount math stays sane.
            deadline: Utc::now().date_naive() + Duration::days(365 * 75),
            status: JarStatus::Active,
            icon: "trophy".to_string(),
            color: "#F59E0B".to_string(),
            history: Vec::new(),
            created_at: Utc::now(),
        };

        self.jar_repository
            .create(jar)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => JarError::JarNotFound,
                RepositoryError::DatabaseError(msg) => JarError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => JarError::DatabaseError(msg),
            })
    }
}
