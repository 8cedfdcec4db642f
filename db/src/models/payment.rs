use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize)]
pub struct ProcessedPayment {
    pub provider_transaction_id: String,
    pub payload: String,
    pub user_id: i64,
    pub subscription_id: i64,
    /// End of the window right after this payment was granted.
    pub granted_until: DateTime<Utc>,
    pub processed_at: DateTime<Utc>,
}
