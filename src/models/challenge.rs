use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChallengeStatus {
    Active,
    Completed,
    Expired,
}

/// Recorded when a challenge is settled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChallengeCompletion {
    pub actual_amount_paise: i64,
    pub completed_at: DateTime<Utc>,
}

/// A daily behavioral challenge ("spend under ₹200 on food today").
/// Challenges are generated by an external engine; this crate lists them
/// and settles completions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyChallenge {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    /// The behavioral target amount, e.g. the spending cap to stay under.
    pub amount_paise: i64,
    /// Reward booked as income when the challenge is completed.
    pub reward_paise: i64,
    /// Lower sorts first in the day's listing.
    pub priority: u32,
    pub status: ChallengeStatus,
    pub date_assigned: NaiveDate,
    pub completion: Option<ChallengeCompletion>,
}
