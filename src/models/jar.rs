use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_positive_paise;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JarStatus {
    Active,
    Completed,
    Archived,
}

/// One deposit in a jar's append-only history.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JarDeposit {
    pub amount_paise: i64,
    pub deposited_at: DateTime<Utc>,
}

/// A goal-bounded savings accumulator. `saved_paise` only grows under the
/// deposit flow; the jar completes once it reaches the target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavingsJar {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub target_paise: i64,
    pub saved_paise: i64,
    pub deadline: NaiveDate,
    pub status: JarStatus,
    /// Display hints passed through to clients.
    pub icon: String,
    pub color: String,
    pub history: Vec<JarDeposit>,
    pub created_at: DateTime<Utc>,
}

impl SavingsJar {
    /// Daily deposit needed to reach the target by the deadline, computed at
    /// read time so it never goes stale. 0 once the target is reached; a
    /// passed deadline counts as one remaining day.
    pub fn suggested_daily_paise(&self, today: NaiveDate) -> i64 {
        if self.saved_paise >= self.target_paise {
            return 0;
        }
        let days_left = (self.deadline - today).num_days().max(1);
        let remaining = self.target_paise - self.saved_paise;
        (remaining + days_left - 1) / days_left
    }

    /// Whole days until the deadline, floored at 0.
    pub fn days_left(&self, today: NaiveDate) -> i64 {
        (self.deadline - today).num_days().max(0)
    }
}

/// Request payload for creating a new savings jar
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateJarRequest {
    #[validate(length(min = 1, message = "Title is required"))]
    pub title: String,

    #[validate(custom(function = "validate_positive_paise"))]
    pub target_paise: i64,

    pub deadline: NaiveDate,

    pub icon: Option<String>,

    pub color: Option<String>,
}

/// Lifetime totals used by the deposit guard and dashboards. All paise;
/// transfers are excluded.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SavingsOverview {
    pub lifetime_income_paise: i64,
    pub lifetime_expense_paise: i64,
    pub total_saved_paise: i64,
    /// lifetime income - lifetime expense - total saved across all jars
    pub unallocated_paise: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jar(target: i64, saved: i64, deadline: NaiveDate) -> SavingsJar {
        SavingsJar {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            title: "Bike repair".to_string(),
            target_paise: target,
            saved_paise: saved,
            deadline,
            status: JarStatus::Active,
            icon: "piggy-bank".to_string(),
            color: "#10B981".to_string(),
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_suggested_daily_splits_remaining_over_days_left() {
        let today = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let deadline = NaiveDate::from_ymd_opt(2025, 11, 11).unwrap();
        let jar = jar(100_000, 20_000, deadline);

        // 80,000 paise over 10 days
        assert_eq!(jar.suggested_daily_paise(today), 8_000);
    }

    #[test]
    fn test_suggested_daily_rounds_up() {
        let today = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let deadline = NaiveDate::from_ymd_opt(2025, 11, 4).unwrap();
        let jar = jar(10_000, 0, deadline);

        // ceil(10000 / 3)
        assert_eq!(jar.suggested_daily_paise(today), 3_334);
    }

    #[test]
    fn test_suggested_daily_zero_once_target_reached() {
        let today = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let deadline = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let jar = jar(10_000, 10_000, deadline);

        assert_eq!(jar.suggested_daily_paise(today), 0);
    }

    #[test]
    fn test_suggested_daily_passed_deadline_counts_one_day() {
        let today = NaiveDate::from_ymd_opt(2025, 11, 10).unwrap();
        let deadline = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let jar = jar(50_000, 10_000, deadline);

        // Everything still missing is suggested at once.
        assert_eq!(jar.suggested_daily_paise(today), 40_000);
    }

    #[test]
    fn test_days_left_floors_at_zero() {
        let deadline = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let jar = jar(10_000, 0, deadline);

        let before = NaiveDate::from_ymd_opt(2025, 10, 29).unwrap();
        assert_eq!(jar.days_left(before), 3);

        let after = NaiveDate::from_ymd_opt(2025, 11, 5).unwrap();
        assert_eq!(jar.days_left(after), 0);
    }
}
