use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use db::{
    dtos::{
        payment::PaymentKey,
        subscription::{SubscriptionCreateRequest, WindowChange},
        user::UserCreateRequest,
    },
    models::{payment::ProcessedPayment, subscription::Subscription, user::User},
};
use tokio::sync::Mutex;

use super::LedgerStore;
use crate::clock::Clock;

#[derive(Default)]
struct MemoryState {
    users: HashMap<i64, User>,
    subscriptions: BTreeMap<i64, Subscription>,
    payments: HashMap<PaymentKey, ProcessedPayment>,
    next_subscription_id: i64,
}

impl MemoryState {
    fn open(&mut self, req: SubscriptionCreateRequest) -> Res<Subscription> {
        if !self.users.contains_key(&req.user_id) {
            return Err(AppError::NotFound(format!("user {}", req.user_id)));
        }
        if req.end_date <= req.start_date {
            return Err(AppError::Storage(format!(
                "subscription for user {} must end after it starts",
                req.user_id
            )));
        }

        self.next_subscription_id += 1;
        let subscription = Subscription {
            id: self.next_subscription_id,
            user_id: req.user_id,
            subscription_type: req.subscription_type,
            start_date: req.start_date,
            end_date: req.end_date,
            is_active: true,
        };
        self.subscriptions
            .insert(subscription.id, subscription.clone());
        Ok(subscription)
    }

    fn extend(&mut self, subscription_id: i64, new_end: DateTime<Utc>) -> Res<Subscription> {
        match self.subscriptions.get_mut(&subscription_id) {
            Some(subscription) if subscription.is_active => {
                subscription.end_date = new_end;
                Ok(subscription.clone())
            }
            _ => Err(AppError::NotFound(format!(
                "active subscription {}",
                subscription_id
            ))),
        }
    }
}

/// Process-local ledger store with the same contract as the Postgres one.
pub struct MemoryLedgerStore {
    state: Mutex<MemoryState>,
    clock: Arc<dyn Clock>,
}

impl MemoryLedgerStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        MemoryLedgerStore {
            state: Mutex::new(MemoryState::default()),
            clock,
        }
    }

    /// Every row ever written for `user_id`, active or not, oldest first.
    pub async fn subscriptions_of(&self, user_id: i64) -> Vec<Subscription> {
        let state = self.state.lock().await;
        state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl LedgerStore for MemoryLedgerStore {
    async fn get_user(&self, user_id: i64) -> Res<Option<User>> {
        Ok(self.state.lock().await.users.get(&user_id).cloned())
    }

    async fn create_user(&self, req: UserCreateRequest) -> Res<User> {
        let mut state = self.state.lock().await;

        if let Some(existing) = state.users.get(&req.user_id) {
            return if existing.matches(&req) {
                Ok(existing.clone())
            } else {
                Err(AppError::Conflict(format!(
                    "user {} already exists",
                    req.user_id
                )))
            };
        }

        let user = User {
            user_id: req.user_id,
            username: req.username,
            name: req.name,
            created_at: self.clock.now(),
            is_active: true,
            referrer_id: req.referrer_id,
            referral_count: 0,
        };
        state.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    async fn increment_referral_count(&self, user_id: i64) -> Res<User> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;
        user.referral_count += 1;
        Ok(user.clone())
    }

    async fn get_subscription(&self, subscription_id: i64) -> Res<Option<Subscription>> {
        Ok(self
            .state
            .lock()
            .await
            .subscriptions
            .get(&subscription_id)
            .cloned())
    }

    async fn get_active_subscription(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Res<Option<Subscription>> {
        let state = self.state.lock().await;
        Ok(state
            .subscriptions
            .values()
            .filter(|s| s.user_id == user_id && s.is_current(now))
            .max_by_key(|s| s.end_date)
            .cloned())
    }

    async fn persist_subscription(&self, req: SubscriptionCreateRequest) -> Res<Subscription> {
        self.state.lock().await.open(req)
    }

    async fn update_subscription_window(
        &self,
        subscription_id: i64,
        new_end: DateTime<Utc>,
    ) -> Res<Subscription> {
        self.state.lock().await.extend(subscription_id, new_end)
    }

    async fn deactivate_subscription(&self, subscription_id: i64) -> Res<Subscription> {
        let mut state = self.state.lock().await;
        let subscription = state
            .subscriptions
            .get_mut(&subscription_id)
            .ok_or_else(|| AppError::NotFound(format!("subscription {}", subscription_id)))?;
        subscription.is_active = false;
        Ok(subscription.clone())
    }

    async fn find_processed_payment(&self, key: &PaymentKey) -> Res<Option<ProcessedPayment>> {
        Ok(self.state.lock().await.payments.get(key).cloned())
    }

    async fn commit_payment(
        &self,
        key: PaymentKey,
        change: WindowChange,
    ) -> Res<(Subscription, ProcessedPayment)> {
        let mut state = self.state.lock().await;

        if state.payments.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "payment {}",
                key.provider_transaction_id
            )));
        }

        // open/extend validate before writing, so a failure leaves no trace
        let subscription = match change {
            WindowChange::Open(req) => state.open(req)?,
            WindowChange::Extend {
                subscription_id,
                new_end,
                ..
            } => state.extend(subscription_id, new_end)?,
        };

        let payment = ProcessedPayment {
            provider_transaction_id: key.provider_transaction_id.clone(),
            payload: key.payload.clone(),
            user_id: subscription.user_id,
            subscription_id: subscription.id,
            granted_until: subscription.end_date,
            processed_at: self.clock.now(),
        };
        state.payments.insert(key, payment.clone());
        Ok((subscription, payment))
    }
}
