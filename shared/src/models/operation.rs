//! Retryable operation (work queue) model

use serde::{Deserialize, Serialize};

/// Kinds of background work the operations worker executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationType {
    /// Attempt the deferred off-session charge for a pairing guarantee
    SecondChargeAttempt,
    /// Create the tournament entry once a pairing confirms
    TournamentEntry,
    /// Send the purchase receipt email
    ReceiptEmail,
}

impl OperationType {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::SecondChargeAttempt => "SECOND_CHARGE_ATTEMPT",
            Self::TournamentEntry => "TOURNAMENT_ENTRY",
            Self::ReceiptEmail => "RECEIPT_EMAIL",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "SECOND_CHARGE_ATTEMPT" => Some(Self::SecondChargeAttempt),
            "TOURNAMENT_ENTRY" => Some(Self::TournamentEntry),
            "RECEIPT_EMAIL" => Some(Self::ReceiptEmail),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationStatus {
    Pending,
    Processing,
    Ok,
    Error,
    DeadLetter,
}

impl OperationStatus {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Processing => "PROCESSING",
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::DeadLetter => "DEAD_LETTER",
        }
    }

    pub fn from_db(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(Self::Pending),
            "PROCESSING" => Some(Self::Processing),
            "OK" => Some(Self::Ok),
            "ERROR" => Some(Self::Error),
            "DEAD_LETTER" => Some(Self::DeadLetter),
            _ => None,
        }
    }
}

/// One queued unit of retryable work
///
/// `dedupe_key` is unique, so re-running the fulfillment that enqueued
/// the operation never queues it twice. After `MAX_ATTEMPTS` failures the
/// row moves to `DeadLetter` and stops retrying.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    pub id: String,
    pub dedupe_key: String,
    pub op_type: OperationType,
    pub payload: serde_json::Value,
    pub status: OperationStatus,
    pub attempts: i32,
    pub next_retry_at: Option<i64>,
    pub last_error: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Retry budget before an operation is dead-lettered
pub const MAX_ATTEMPTS: i32 = 5;

/// Backoff between retries
pub const RETRY_DELAY_MS: i64 = 5 * 60 * 1000;
