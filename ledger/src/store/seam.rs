use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::Res;
use db::{
    dtos::{
        payment::PaymentKey,
        subscription::{SubscriptionCreateRequest, WindowChange},
        user::UserCreateRequest,
    },
    models::{payment::ProcessedPayment, subscription::Subscription, user::User},
};

/// Durable record of users, subscription windows and processed payments.
///
/// Every call is atomic on its own row; nothing spans rows. Invariants that
/// need read-then-write (one active window per user) are upheld by callers
/// holding a [`crate::locks::UserGuard`].
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get_user(&self, user_id: i64) -> Res<Option<User>>;

    /// `Conflict` if the id exists with a different payload; the existing
    /// user when the payload is identical.
    async fn create_user(&self, req: UserCreateRequest) -> Res<User>;

    /// `NotFound` if the user is missing.
    async fn increment_referral_count(&self, user_id: i64) -> Res<User>;

    async fn get_subscription(&self, subscription_id: i64) -> Res<Option<Subscription>>;

    /// Active row with `end_date > now`, latest `end_date` first.
    async fn get_active_subscription(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Res<Option<Subscription>>;

    /// Inserts an active row. `NotFound` if the user is missing.
    async fn persist_subscription(&self, req: SubscriptionCreateRequest) -> Res<Subscription>;

    /// `NotFound` if the id is missing or inactive.
    async fn update_subscription_window(
        &self,
        subscription_id: i64,
        new_end: DateTime<Utc>,
    ) -> Res<Subscription>;

    async fn deactivate_subscription(&self, subscription_id: i64) -> Res<Subscription>;

    async fn find_processed_payment(&self, key: &PaymentKey) -> Res<Option<ProcessedPayment>>;

    /// Applies `change` and records `key` against the resulting window, both or
    /// neither. `Conflict` if the key was already recorded.
    async fn commit_payment(
        &self,
        key: PaymentKey,
        change: WindowChange,
    ) -> Res<(Subscription, ProcessedPayment)>;
}
