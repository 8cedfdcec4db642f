use std::{future::Future, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use common::{
    env_config::LedgerConfig,
    error::{AppError, Res},
    plans::PlanCatalog,
};
use db::{
    dtos::user::UserCreateRequest,
    models::{subscription::Subscription, user::User},
};
use serde::Serialize;

use crate::{
    clock::{Clock, SystemClock},
    events::{PaymentConfirmed, UserCreated, UserProfile},
    locks::UserLocks,
    services::{
        payment::{PaymentIntake, PaymentReceipt, PreCheckout},
        referral::{ReferralAccountant, ReferralOutcome},
        resolver::SubscriptionResolver,
    },
    store::LedgerStore,
};

#[derive(Debug, Clone, Serialize)]
pub struct Registration {
    pub user: User,
    /// False on a repeated `/start`.
    pub created: bool,
    pub referral: Option<ReferralOutcome>,
}

/// Active window as shown on the profile and status screens.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStatus {
    pub subscription: Subscription,
    pub title: String,
    pub price: Option<i64>,
    pub days_left: i64,
}

/// Entry point of the ledger. Every public operation runs under the
/// configured deadline and mutations are serialized per user.
pub struct Ledger {
    store: Arc<dyn LedgerStore>,
    clock: Arc<dyn Clock>,
    locks: UserLocks,
    catalog: Arc<PlanCatalog>,
    resolver: Arc<SubscriptionResolver>,
    accountant: ReferralAccountant,
    intake: PaymentIntake,
    timeout: Duration,
}

impl Ledger {
    pub fn new(store: Arc<dyn LedgerStore>, config: &LedgerConfig) -> Self {
        Self::with_clock(store, config, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn LedgerStore>,
        config: &LedgerConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let locks = UserLocks::new();
        let catalog = Arc::new(PlanCatalog::standard(config.referral_bonus_days));
        let resolver = Arc::new(SubscriptionResolver::new(store.clone(), clock.clone()));
        let accountant = ReferralAccountant::new(
            store.clone(),
            resolver.clone(),
            locks.clone(),
            config.referral_bonus_days,
        );
        let intake = PaymentIntake::new(store.clone(), resolver.clone(), catalog.clone());

        Ledger {
            store,
            clock,
            locks,
            catalog,
            resolver,
            accountant,
            intake,
            timeout: config.operation_timeout,
        }
    }

    pub fn plans(&self) -> &PlanCatalog {
        &self.catalog
    }

    /// First contact: creates the user and attributes the referral, if any.
    /// A repeated event for a known user changes nothing.
    pub async fn register_user(&self, event: UserCreated) -> Res<Registration> {
        self.within_deadline("register_user", async {
            let guard = self.locks.acquire(event.user_id).await;

            if let Some(user) = self.store.get_user(event.user_id).await? {
                log::info!("{} | start_known_user", event.user_id);
                return Ok(Registration {
                    user,
                    created: false,
                    referral: None,
                });
            }

            let referral = match event.referrer_id {
                Some(referrer_id) => Some(
                    self.accountant
                        .attribute(&guard, &event.profile(), referrer_id)
                        .await?,
                ),
                None => None,
            };

            let user = match referral.as_ref().and_then(|r| r.user.clone()) {
                Some(user) => user,
                None => {
                    let user = self
                        .store
                        .create_user(UserCreateRequest {
                            user_id: event.user_id,
                            username: event.username.clone(),
                            name: event.name.clone(),
                            referrer_id: None,
                        })
                        .await?;
                    log::info!("{} | user_add", event.user_id);
                    user
                }
            };

            Ok(Registration {
                user,
                created: true,
                referral,
            })
        })
        .await
    }

    pub async fn attribute_referral(
        &self,
        new_user_id: i64,
        profile: UserProfile,
        referrer_id: i64,
    ) -> Res<ReferralOutcome> {
        self.within_deadline("attribute_referral", async {
            let guard = self.locks.acquire(new_user_id).await;
            self.accountant
                .attribute(&guard, &profile, referrer_id)
                .await
        })
        .await
    }

    pub async fn confirm_payment(&self, event: PaymentConfirmed) -> Res<PaymentReceipt> {
        self.within_deadline("confirm_payment", async {
            let guard = self.locks.acquire(event.user_id).await;
            self.intake.confirm_payment(&guard, &event.payment).await
        })
        .await
    }

    pub fn pre_checkout(&self, payload: &str) -> PreCheckout {
        self.intake.pre_checkout(payload)
    }

    /// Grants `days` of a catalog plan outside of a payment or referral.
    pub async fn grant(&self, user_id: i64, subscription_type: &str, days: u32) -> Res<Subscription> {
        if self.catalog.get(subscription_type).is_none() {
            return Err(AppError::InvalidPayload(format!(
                "unknown plan {}",
                subscription_type
            )));
        }

        self.within_deadline("grant", async {
            let guard = self.locks.acquire(user_id).await;
            self.resolver.grant(&guard, subscription_type, days).await
        })
        .await
    }

    pub async fn cancel_subscription(&self, user_id: i64) -> Res<Subscription> {
        self.within_deadline("cancel_subscription", async {
            let guard = self.locks.acquire(user_id).await;
            self.resolver.cancel(&guard).await
        })
        .await
    }

    pub async fn get_user(&self, user_id: i64) -> Res<Option<User>> {
        self.within_deadline("get_user", self.store.get_user(user_id))
            .await
    }

    pub async fn get_active_subscription(&self, user_id: i64) -> Res<Option<Subscription>> {
        self.within_deadline(
            "get_active_subscription",
            self.store.get_active_subscription(user_id, self.clock.now()),
        )
        .await
    }

    pub async fn subscription_status(&self, user_id: i64) -> Res<Option<SubscriptionStatus>> {
        let now = self.clock.now();
        let active = self
            .within_deadline(
                "subscription_status",
                self.store.get_active_subscription(user_id, now),
            )
            .await?;

        Ok(active.map(|subscription| self.status_of(subscription, now)))
    }

    fn status_of(&self, subscription: Subscription, now: DateTime<Utc>) -> SubscriptionStatus {
        let plan = self.catalog.get(&subscription.subscription_type);
        SubscriptionStatus {
            title: plan
                .map(|p| p.title.clone())
                .unwrap_or_else(|| subscription.subscription_type.clone()),
            price: plan.map(|p| p.price),
            days_left: (subscription.end_date - now).num_days(),
            subscription,
        }
    }

    async fn within_deadline<T, F>(&self, operation: &str, fut: F) -> Res<T>
    where
        F: Future<Output = Res<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| {
                log::error!("{}_timeout | {:?}", operation, self.timeout);
                AppError::Timeout(format!(
                    "{} did not finish within {:?}",
                    operation, self.timeout
                ))
            })?
    }
}
