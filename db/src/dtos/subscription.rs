use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct SubscriptionCreateRequest {
    pub user_id: i64,
    pub subscription_type: String,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Write that turns a grant into the user's active window.
#[derive(Debug, Clone)]
pub enum WindowChange {
    /// No active window: insert a new row.
    Open(SubscriptionCreateRequest),
    /// Move the end of the active row.
    Extend {
        user_id: i64,
        subscription_id: i64,
        new_end: DateTime<Utc>,
    },
}

impl WindowChange {
    pub fn user_id(&self) -> i64 {
        match self {
            WindowChange::Open(req) => req.user_id,
            WindowChange::Extend { user_id, .. } => *user_id,
        }
    }
}
