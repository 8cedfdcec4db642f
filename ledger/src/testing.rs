use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use common::error::{AppError, Res};
use db::{
    dtos::{
        payment::PaymentKey,
        subscription::{SubscriptionCreateRequest, WindowChange},
        user::UserCreateRequest,
    },
    models::{payment::ProcessedPayment, subscription::Subscription, user::User},
};

use crate::{
    clock::ManualClock,
    locks::UserLocks,
    services::resolver::SubscriptionResolver,
    store::{LedgerStore, memory::MemoryLedgerStore},
};

/// `day` whole days after the fixture's start instant.
pub(crate) fn at(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap() + TimeDelta::days(day)
}

pub(crate) struct Fixture {
    pub clock: Arc<ManualClock>,
    pub store: Arc<MemoryLedgerStore>,
    pub locks: UserLocks,
}

impl Fixture {
    pub async fn with_users(user_ids: &[i64]) -> Self {
        let clock = Arc::new(ManualClock::new(at(0)));
        let store = Arc::new(MemoryLedgerStore::new(clock.clone()));
        for &user_id in user_ids {
            store.create_user(user(user_id, None)).await.unwrap();
        }

        Fixture {
            clock,
            store,
            locks: UserLocks::new(),
        }
    }

    pub fn resolver(&self) -> SubscriptionResolver {
        SubscriptionResolver::new(self.store.clone(), self.clock.clone())
    }
}

pub(crate) fn user(user_id: i64, referrer_id: Option<i64>) -> UserCreateRequest {
    UserCreateRequest {
        user_id,
        username: Some(format!("user{}", user_id)),
        name: Some(format!("User {}", user_id)),
        referrer_id,
    }
}

/// Memory store with switchable write failures and latency.
pub(crate) struct FlakyStore {
    pub inner: Arc<MemoryLedgerStore>,
    pub fail_grants: AtomicBool,
    pub fail_payment_records: AtomicBool,
    pub read_delay: Option<Duration>,
    pub write_delay: Option<Duration>,
}

impl FlakyStore {
    pub fn over(inner: Arc<MemoryLedgerStore>) -> Self {
        FlakyStore {
            inner,
            fail_grants: AtomicBool::new(false),
            fail_payment_records: AtomicBool::new(false),
            read_delay: None,
            write_delay: None,
        }
    }

    async fn stall(delay: Option<Duration>) {
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }

    fn broken(flag: &AtomicBool, what: &str) -> Res<()> {
        if flag.load(Ordering::SeqCst) {
            Err(AppError::Storage(format!("{} unavailable", what)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl LedgerStore for FlakyStore {
    async fn get_user(&self, user_id: i64) -> Res<Option<User>> {
        Self::stall(self.read_delay).await;
        self.inner.get_user(user_id).await
    }

    async fn create_user(&self, req: UserCreateRequest) -> Res<User> {
        self.inner.create_user(req).await
    }

    async fn increment_referral_count(&self, user_id: i64) -> Res<User> {
        self.inner.increment_referral_count(user_id).await
    }

    async fn get_subscription(&self, subscription_id: i64) -> Res<Option<Subscription>> {
        self.inner.get_subscription(subscription_id).await
    }

    async fn get_active_subscription(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Res<Option<Subscription>> {
        self.inner.get_active_subscription(user_id, now).await
    }

    async fn persist_subscription(&self, req: SubscriptionCreateRequest) -> Res<Subscription> {
        Self::stall(self.write_delay).await;
        Self::broken(&self.fail_grants, "subscriptions")?;
        self.inner.persist_subscription(req).await
    }

    async fn update_subscription_window(
        &self,
        subscription_id: i64,
        new_end: DateTime<Utc>,
    ) -> Res<Subscription> {
        Self::stall(self.write_delay).await;
        Self::broken(&self.fail_grants, "subscriptions")?;
        self.inner
            .update_subscription_window(subscription_id, new_end)
            .await
    }

    async fn deactivate_subscription(&self, subscription_id: i64) -> Res<Subscription> {
        self.inner.deactivate_subscription(subscription_id).await
    }

    async fn find_processed_payment(&self, key: &PaymentKey) -> Res<Option<ProcessedPayment>> {
        self.inner.find_processed_payment(key).await
    }

    async fn commit_payment(
        &self,
        key: PaymentKey,
        change: WindowChange,
    ) -> Res<(Subscription, ProcessedPayment)> {
        Self::stall(self.write_delay).await;
        Self::broken(&self.fail_grants, "subscriptions")?;
        Self::broken(&self.fail_payment_records, "processed_payments")?;
        self.inner.commit_payment(key, change).await
    }
}
