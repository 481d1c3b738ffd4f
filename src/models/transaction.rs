use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::validation::validate_positive_paise;

/// Direction of a ledger entry. Income adds, expense subtracts, transfers
/// are ignored by every aggregation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
    Transfer,
}

/// How the money moved
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Upi,
    Bank,
    Wallet,
}

impl Default for PaymentMethod {
    fn default() -> Self {
        PaymentMethod::Cash
    }
}

/// How the transaction was captured
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TransactionSource {
    Sms,
    Voice,
    Manual,
    Quicktap,
}

impl Default for TransactionSource {
    fn default() -> Self {
        TransactionSource::Manual
    }
}

/// Metadata left behind by the message/voice parser that produced a
/// transaction, kept verbatim for later auditing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParserMeta {
    pub parser: String,
    pub confidence: f64,
    pub raw_parse: serde_json::Value,
}

/// A single ledger entry. Immutable once written; only ever read by the
/// aggregation services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Uuid,
    pub user_id: Uuid,
    /// Device-side idempotency key; a repeated capture with the same key
    /// returns the already-stored entry.
    pub client_local_id: Option<String>,
    pub kind: TransactionKind,
    /// Always a non-negative amount in paise; `kind` carries the sign.
    pub amount_paise: i64,
    /// Raw free-form label as captured ("fuel", "gig_payout", ...)
    pub category: String,
    pub merchant: Option<String>,
    pub method: PaymentMethod,
    pub timestamp: DateTime<Utc>,
    pub source: TransactionSource,
    pub parser_meta: Option<ParserMeta>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request payload for recording a new transaction
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateTransactionRequest {
    pub client_local_id: Option<String>,

    pub kind: TransactionKind,

    #[validate(custom(function = "validate_positive_paise"))]
    pub amount_paise: i64,

    #[validate(length(min = 1, message = "Category is required"))]
    pub category: String,

    pub merchant: Option<String>,

    pub method: Option<PaymentMethod>,

    pub timestamp: DateTime<Utc>,

    pub source: Option<TransactionSource>,

    pub parser_meta: Option<ParserMeta>,

    pub notes: Option<String>,
}

/// Filters for listing ledger entries. `from` is inclusive, `until`
/// exclusive.
#[derive(Debug, Clone, Default)]
pub struct TransactionQuery {
    pub kind: Option<TransactionKind>,
    pub category: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl TransactionQuery {
    /// Query for one kind over an inclusive/exclusive time window.
    pub fn kind_in_window(
        kind: TransactionKind,
        from: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: Some(kind),
            from: Some(from),
            until: Some(until),
            ..Self::default()
        }
    }
}
