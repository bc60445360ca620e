use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One reconstructed timeline row: a completed user operation with its
/// localized service/method names and a pre-formatted duration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovementEntry {
    pub account_id: i64,
    pub user_name: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration: String,
    pub service: String,
    pub method: String,
    pub service_id: String,
    pub method_id: String,
}
