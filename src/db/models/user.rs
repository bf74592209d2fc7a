//! User identity and profile models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Identity every query is scoped by.
///
/// There is no authentication; the id comes from the request and falls back
/// to [`UserId::DEMO`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub i64);

impl UserId {
    pub const DEMO: UserId = UserId(1);

    pub fn get(self) -> i64 {
        self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::DEMO
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn demo(now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::DEMO,
            email: "demo@example.com".into(),
            created_at: now,
        }
    }
}

/// Dashboard counters for one user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserStats {
    pub total_medications: i64,
    pub logs_last_7_days: i64,
    pub logs_today: i64,
    pub streak_days: u32,
}
