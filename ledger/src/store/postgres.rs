use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use db::{
    dtos::{
        payment::{PaymentKey, ProcessedPaymentCreateRequest},
        subscription::{SubscriptionCreateRequest, WindowChange},
        user::UserCreateRequest,
    },
    models::{payment::ProcessedPayment, subscription::Subscription, user::User},
};
use sqlx::PgPool;

use super::LedgerStore;

/// Ledger store backed by the Postgres tables from `db`.
pub struct PgLedgerStore {
    pool: Arc<PgPool>,
}

impl PgLedgerStore {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn get_user(&self, user_id: i64) -> Res<Option<User>> {
        db::user::get_user_by_id(&*self.pool, user_id).await
    }

    async fn create_user(&self, req: UserCreateRequest) -> Res<User> {
        if let Some(user) = db::user::insert_user(&*self.pool, &req).await? {
            return Ok(user);
        }

        let existing = db::user::get_user_by_id(&*self.pool, req.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Storage(format!("user {} neither inserted nor found", req.user_id))
            })?;

        if existing.matches(&req) {
            Ok(existing)
        } else {
            Err(AppError::Conflict(format!(
                "user {} already exists",
                req.user_id
            )))
        }
    }

    async fn increment_referral_count(&self, user_id: i64) -> Res<User> {
        db::user::increment_referral_count(&*self.pool, user_id).await
    }

    async fn get_subscription(&self, subscription_id: i64) -> Res<Option<Subscription>> {
        db::subscription::get_subscription_by_id(&*self.pool, subscription_id).await
    }

    async fn get_active_subscription(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Res<Option<Subscription>> {
        db::subscription::get_active_subscription(&*self.pool, user_id, now).await
    }

    async fn persist_subscription(&self, req: SubscriptionCreateRequest) -> Res<Subscription> {
        db::subscription::insert_subscription(&*self.pool, &req).await
    }

    async fn update_subscription_window(
        &self,
        subscription_id: i64,
        new_end: DateTime<Utc>,
    ) -> Res<Subscription> {
        db::subscription::update_subscription_end(&*self.pool, subscription_id, new_end).await
    }

    async fn deactivate_subscription(&self, subscription_id: i64) -> Res<Subscription> {
        db::subscription::deactivate_subscription(&*self.pool, subscription_id).await
    }

    async fn find_processed_payment(&self, key: &PaymentKey) -> Res<Option<ProcessedPayment>> {
        db::payment::get_processed_payment(&*self.pool, key).await
    }

    async fn commit_payment(
        &self,
        key: PaymentKey,
        change: WindowChange,
    ) -> Res<(Subscription, ProcessedPayment)> {
        // rolled back on drop, including when the caller's deadline cancels us
        let mut tx = self.pool.begin().await?;

        let subscription = match &change {
            WindowChange::Open(req) => db::subscription::insert_subscription(&mut *tx, req).await?,
            WindowChange::Extend {
                subscription_id,
                new_end,
                ..
            } => {
                db::subscription::update_subscription_end(&mut *tx, *subscription_id, *new_end)
                    .await?
            }
        };
        let payment = db::payment::insert_processed_payment(
            &mut *tx,
            &ProcessedPaymentCreateRequest {
                key,
                user_id: subscription.user_id,
                subscription_id: subscription.id,
                granted_until: subscription.end_date,
            },
        )
        .await?;

        tx.commit().await?;
        Ok((subscription, payment))
    }
}
