use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ErrorCategory;
use crate::models::challenge::{ChallengeCompletion, ChallengeStatus, DailyChallenge};
use crate::models::jar::{SavingsJar, SavingsOverview};
use crate::models::transaction::{
    CreateTransactionRequest, PaymentMethod, Transaction, TransactionKind, TransactionSource,
};
use crate::repositories::{ChallengeRepository, RepositoryError};
use crate::services::jar_service::{JarError, JarService};
use crate::services::transaction_service::{TransactionError, TransactionService};

/// Ledger category used for challenge reward income.
pub const REWARD_CATEGORY: &str = "challenge_reward";

/// Challenge service errors
#[derive(Debug, thiserror::Error)]
pub enum ChallengeError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Challenge not found or already completed")]
    ChallengeNotFound,

    #[error("Database error: {0}")]
    DatabaseError(String),
}

impl ChallengeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChallengeError::Validation(_) => ErrorCategory::Validation,
            ChallengeError::ChallengeNotFound => ErrorCategory::NotFound,
            ChallengeError::DatabaseError(_) => ErrorCategory::Storage,
        }
    }
}

/// Whether the reward reached the rewards jar.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "detail")]
pub enum RewardJarOutcome {
    Deposited(SavingsJar),
    /// The reward income is booked but the jar deposit failed; reported,
    /// never rolled back.
    Failed(String),
}

/// Everything that happened while settling a challenge.
#[derive(Debug, Clone, Serialize)]
pub struct ChallengeSettlement {
    pub challenge: DailyChallenge,
    pub reward_transaction: Transaction,
    pub reward_jar: RewardJarOutcome,
    /// Absent when the jar store was unreachable; the settlement itself
    /// still stands.
    pub dashboard: Option<SavingsOverview>,
}

/// Trait defining daily challenge operations
#[async_trait]
pub trait ChallengeService: Send + Sync {
    /// Active challenges assigned to the user on `today`, lowest priority
    /// first
    async fn todays_challenges(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<DailyChallenge>, ChallengeError>;

    /// Settle an active challenge: mark it completed, book the reward as
    /// income, and move it into the rewards jar
    async fn complete_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        actual_amount_paise: Option<i64>,
    ) -> Result<ChallengeSettlement, ChallengeError>;
}

/// Implementation of ChallengeService
pub struct ChallengeServiceImpl {
    challenge_repository: Arc<dyn ChallengeRepository>,
    transaction_service: Arc<dyn TransactionService>,
    jar_service: Arc<dyn JarService>,
}

impl ChallengeServiceImpl {
    pub fn new(
        challenge_repository: Arc<dyn ChallengeRepository>,
        transaction_service: Arc<dyn TransactionService>,
        jar_service: Arc<dyn JarService>,
    ) -> Self {
        Self {
            challenge_repository,
            transaction_service,
            jar_service,
        }
    }

    async fn deposit_reward(&self, user_id: Uuid, reward_paise: i64) -> Result<SavingsJar, JarError> {
        let jar = self.jar_service.reward_jar(user_id).await?;
        let outcome = self.jar_service.deposit(user_id, jar.id, reward_paise).await?;
        Ok(outcome.jar)
    }
}

#[async_trait]
impl ChallengeService for ChallengeServiceImpl {
    async fn todays_challenges(
        &self,
        user_id: Uuid,
        today: NaiveDate,
    ) -> Result<Vec<DailyChallenge>, ChallengeError> {
        self.challenge_repository
            .find_assigned_on(user_id, today)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ChallengeError::ChallengeNotFound,
                RepositoryError::DatabaseError(msg) => ChallengeError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => ChallengeError::DatabaseError(msg),
            })
    }

    async fn complete_challenge(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
        actual_amount_paise: Option<i64>,
    ) -> Result<ChallengeSettlement, ChallengeError> {
        let mut challenge = self
            .challenge_repository
            .find_active(user_id, challenge_id)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ChallengeError::ChallengeNotFound,
                RepositoryError::DatabaseError(msg) => ChallengeError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => ChallengeError::DatabaseError(msg),
            })?
            .ok_or(ChallengeError::ChallengeNotFound)?;

        challenge.status = ChallengeStatus::Completed;
        challenge.completion = Some(ChallengeCompletion {
            actual_amount_paise: actual_amount_paise.unwrap_or(challenge.amount_paise),
            completed_at: Utc::now(),
        });
        let challenge = self
            .challenge_repository
            .update(challenge)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ChallengeError::ChallengeNotFound,
                RepositoryError::DatabaseError(msg) => ChallengeError::DatabaseError(msg),
                RepositoryError::ConstraintViolation(msg) => ChallengeError::DatabaseError(msg),
            })?;

        // Book the reward as income. The client_local_id keys on the
        // challenge so a retried settlement can never double-book.
        let recorded = self
            .transaction_service
            .record_transaction(
                user_id,
                CreateTransactionRequest {
                    client_local_id: Some(format!("challenge_reward_{}", challenge.id)),
                    kind: TransactionKind::Income,
                    amount_paise: challenge.reward_paise,
                    category: REWARD_CATEGORY.to_string(),
                    merchant: Some("Daily Challenge".to_string()),
                    method: Some(PaymentMethod::Wallet),
                    timestamp: Utc::now(),
                    source: Some(TransactionSource::Manual),
                    parser_meta: None,
                    notes: Some(format!("Challenge completed: {}", challenge.title)),
                },
            )
            .await
            .map_err(|e| match e {
                TransactionError::Validation(msg) => ChallengeError::Validation(msg),
                TransactionError::DatabaseError(msg) => ChallengeError::DatabaseError(msg),
            })?;

        let reward_jar = match self.deposit_reward(user_id, challenge.reward_paise).await {
            Ok(jar) => RewardJarOutcome::Deposited(jar),
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    challenge_id = %challenge.id,
                    error = %err,
                    "reward jar deposit failed after booking reward income"
                );
                RewardJarOutcome::Failed(err.to_string())
            }
        };

        let dashboard = match self.jar_service.savings_overview(user_id).await {
            Ok(overview) => Some(overview),
            Err(err) => {
                tracing::warn!(
                    user_id = %user_id,
                    error = %err,
                    "savings overview unavailable after challenge settlement"
                );
                None
            }
        };

        Ok(ChallengeSettlement {
            challenge,
            reward_transaction: recorded.transaction,
            reward_jar,
            dashboard,
        })
    }
}
