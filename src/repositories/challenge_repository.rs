use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::challenge::{ChallengeStatus, DailyChallenge};
use crate::repositories::RepositoryError;

/// Contract over the daily-challenge store. Challenges are written by an
/// external generator; this crate only lists and settles them.
#[async_trait]
pub trait ChallengeRepository: Send + Sync {
    /// Persist a newly generated challenge
    async fn create(&self, challenge: DailyChallenge) -> Result<DailyChallenge, RepositoryError>;

    /// Find an active challenge by ID for a user
    async fn find_active(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<DailyChallenge>, RepositoryError>;

    /// Active challenges assigned to a user on a day, lowest priority first
    async fn find_assigned_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<DailyChallenge>, RepositoryError>;

    /// Replace the stored challenge with the given state
    async fn update(&self, challenge: DailyChallenge) -> Result<DailyChallenge, RepositoryError>;
}

pub struct InMemoryChallengeRepository {
    challenges: Mutex<HashMap<Uuid, DailyChallenge>>,
    should_fail: bool,
}

impl InMemoryChallengeRepository {
    pub fn new() -> Self {
        Self {
            challenges: Mutex::new(HashMap::new()),
            should_fail: false,
        }
    }

    pub fn with_failure() -> Self {
        Self {
            challenges: Mutex::new(HashMap::new()),
            should_fail: true,
        }
    }
}

impl Default for InMemoryChallengeRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChallengeRepository for InMemoryChallengeRepository {
    async fn create(&self, challenge: DailyChallenge) -> Result<DailyChallenge, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let mut challenges = self.challenges.lock().unwrap();
        challenges.insert(challenge.id, challenge.clone());
        Ok(challenge)
    }

    async fn find_active(
        &self,
        user_id: Uuid,
        challenge_id: Uuid,
    ) -> Result<Option<DailyChallenge>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let challenges = self.challenges.lock().unwrap();
        Ok(challenges
            .get(&challenge_id)
            .filter(|c| c.user_id == user_id && c.status == ChallengeStatus::Active)
            .cloned())
    }

    async fn find_assigned_on(
        &self,
        user_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<DailyChallenge>, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let challenges = self.challenges.lock().unwrap();
        let mut assigned: Vec<DailyChallenge> = challenges
            .values()
            .filter(|c| {
                c.user_id == user_id
                    && c.date_assigned == date
                    && c.status == ChallengeStatus::Active
            })
            .cloned()
            .collect();
        assigned.sort_by_key(|c| c.priority);
        Ok(assigned)
    }

    async fn update(&self, challenge: DailyChallenge) -> Result<DailyChallenge, RepositoryError> {
        if self.should_fail {
            return Err(RepositoryError::DatabaseError(
                "Storage backend unavailable".to_string(),
            ));
        }

        let mut challenges = self.challenges.lock().unwrap();
        if !challenges.contains_key(&challenge.id) {
            return Err(RepositoryError::NotFound);
        }
        challenges.insert(challenge.id, challenge.clone());
        Ok(challenge)
    }
}
