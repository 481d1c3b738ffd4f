use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Label for a day's net cashflow, derived from the paise totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CashflowStatus {
    HighEarning,
    Balanced,
    HeavyExpense,
    Neutral,
}

/// Cached per-user-per-day summary, always recomputed from the day's
/// transactions rather than incremented, so it self-heals from missed
/// updates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyCashflow {
    pub user_id: Uuid,
    pub date: NaiveDate,
    pub income_paise: i64,
    pub expense_paise: i64,
    /// income - expense
    pub net_paise: i64,
    pub status: CashflowStatus,
    pub last_updated: DateTime<Utc>,
}

/// One calendar day in a month heatmap. Days without a cashflow record are
/// zero-valued and neutral.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HeatmapDay {
    pub day: u32,
    pub date: NaiveDate,
    pub income_paise: i64,
    pub expense_paise: i64,
    pub net_paise: i64,
    pub status: CashflowStatus,
}

/// Full-calendar heatmap for one month.
#[derive(Debug, Clone, Serialize)]
pub struct MonthHeatmap {
    pub year: i32,
    pub month: u32,
    pub days: Vec<HeatmapDay>,
}
