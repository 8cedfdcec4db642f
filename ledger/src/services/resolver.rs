use std::sync::Arc;

use chrono::TimeDelta;
use common::error::{AppError, Res};
use db::{
    dtos::subscription::{SubscriptionCreateRequest, WindowChange},
    models::subscription::Subscription,
};

use crate::{clock::Clock, locks::UserGuard, store::LedgerStore};

/// Turns a grant of whole days into the user's single active window.
pub struct SubscriptionResolver {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
}

impl SubscriptionResolver {
    pub fn new(store: Arc<dyn LedgerStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Opens a window of `days` from now, or stacks `days` onto the end of the
    /// active one. An extended window keeps the type that opened it.
    pub async fn grant(
        &self,
        user: &UserGuard,
        subscription_type: &str,
        days: u32,
    ) -> Res<Subscription> {
        let change = self.plan(user, subscription_type, days).await?;
        let subscription = match &change {
            WindowChange::Open(req) => self.store.persist_subscription(req.clone()).await?,
            WindowChange::Extend {
                subscription_id,
                new_end,
                ..
            } => {
                self.store
                    .update_subscription_window(*subscription_id, *new_end)
                    .await?
            }
        };
        log_grant(&change, subscription_type, days);
        Ok(subscription)
    }

    /// Works out the write for a grant without performing it. The result is only
    /// valid while `user` stays locked.
    pub async fn plan(
        &self,
        user: &UserGuard,
        subscription_type: &str,
        days: u32,
    ) -> Res<WindowChange> {
        let user_id = user.user_id();
        if days == 0 {
            return Err(AppError::InvalidPayload(format!(
                "grant of {} for user {} has no length",
                subscription_type, user_id
            )));
        }

        let now = self.clock.now();
        let length = TimeDelta::days(days.into());

        Ok(match self.store.get_active_subscription(user_id, now).await? {
            None => WindowChange::Open(SubscriptionCreateRequest {
                user_id,
                subscription_type: subscription_type.to_string(),
                start_date: now,
                end_date: now + length,
            }),
            Some(active) => WindowChange::Extend {
                user_id,
                subscription_id: active.id,
                new_end: active.end_date.max(now) + length,
            },
        })
    }

    /// Retires the active window. The row stays for audit.
    pub async fn cancel(&self, user: &UserGuard) -> Res<Subscription> {
        let user_id = user.user_id();
        let active = self
            .store
            .get_active_subscription(user_id, self.clock.now())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("active subscription of user {}", user_id)))?;

        let cancelled = self.store.deactivate_subscription(active.id).await?;
        log::info!("{} | subscription_cancelled", user_id);
        Ok(cancelled)
    }
}

pub(crate) fn log_grant(change: &WindowChange, subscription_type: &str, days: u32) {
    match change {
        WindowChange::Open(_) => {
            log::info!("{} | subscription_opened_{}", change.user_id(), subscription_type)
        }
        WindowChange::Extend { .. } => log::info!(
            "{} | subscription_extended_{}_by_{}",
            change.user_id(),
            subscription_type,
            days
        ),
    }
}
