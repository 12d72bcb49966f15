use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CooldownEntry {
    pub track_id: String,
    /// Epoch milliseconds
    pub last_used_at: i64,
}
