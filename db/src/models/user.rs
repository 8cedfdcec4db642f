use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::dtos::user::UserCreateRequest;

#[derive(Debug, Clone, PartialEq, sqlx::FromRow, Serialize, Deserialize)]
pub struct User {
    pub user_id: i64,
    pub username: Option<String>,
    pub name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
    pub referrer_id: Option<i64>,
    pub referral_count: i32,
}

impl User {
    /// True when `req` would have created exactly this user.
    /// A repeated creation with the same payload is a no-op, anything else conflicts.
    pub fn matches(&self, req: &UserCreateRequest) -> bool {
        self.user_id == req.user_id
            && self.username == req.username
            && self.name == req.name
            && self.referrer_id == req.referrer_id
    }
}
