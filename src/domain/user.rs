use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// User identifiers are assigned by the store (integer row ids), not
/// generated in-process.
pub type UserId = i64;

/// An identity owning zero or more accounts. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountUser {
    pub id: UserId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}
