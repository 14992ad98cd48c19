// Score records and ingest payload validation.

use serde::{Deserialize, Serialize};
use serde_json::Number;

use crate::error::AppError;

/// Size of the fixed leaderboard window returned by `GET /scores`.
pub const TOP_SCORES_LIMIT: i64 = 5;

/// One persisted game result with its submission timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct ScoreRecord {
    pub score: i64,
    pub timestamp: String,
}

impl ScoreRecord {
    pub fn new(score: i64, timestamp: impl Into<String>) -> Self {
        Self {
            score,
            timestamp: timestamp.into(),
        }
    }
}

/// Body of `POST /scores`.
///
/// Both fields are optional at the serde level so that a missing field is
/// reported as a validation error with a useful message instead of a generic
/// deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitScoreRequest {
    pub score: Option<Number>,
    pub timestamp: Option<String>,
}

impl SubmitScoreRequest {
    /// Check presence and integrality, yielding a record ready for the store.
    /// The timestamp is stored as given.
    pub fn into_record(self) -> Result<ScoreRecord, AppError> {
        let score = match self.score {
            Some(n) => integral_score(&n)?,
            None => return Err(AppError::Validation("score is required".into())),
        };
        let timestamp = self
            .timestamp
            .ok_or_else(|| AppError::Validation("timestamp is required".into()))?;
        Ok(ScoreRecord { score, timestamp })
    }
}

fn integral_score(n: &Number) -> Result<i64, AppError> {
    if let Some(v) = n.as_i64() {
        return Ok(v);
    }
    if n.is_u64() {
        return Err(AppError::Validation(format!("score {n} is out of range")));
    }
    // Accept floats like 90.0, reject anything with a fractional part.
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
            Ok(f as i64)
        }
        _ => Err(AppError::Validation(format!("score {n} must be an integer"))),
    }
}
