use std::sync::Arc;

use common::{
    error::{AppError, Res},
    plans::REFERRAL_PLAN_ID,
};
use db::{
    dtos::user::UserCreateRequest,
    models::{subscription::Subscription, user::User},
};
use serde::Serialize;

use super::resolver::SubscriptionResolver;
use crate::{
    events::UserProfile,
    locks::{UserGuard, UserLocks},
    store::LedgerStore,
};

/// What happened to the referrer's reward.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BonusGrant {
    NotApplicable,
    Granted { subscription: Subscription },
    /// Referral was counted but the bonus window could not be written.
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct ReferralOutcome {
    pub referrer_id: i64,
    pub credited: bool,
    /// The referred user, when this attribution created it.
    pub user: Option<User>,
    pub bonus: BonusGrant,
}

impl ReferralOutcome {
    fn rejected(referrer_id: i64) -> Self {
        ReferralOutcome {
            referrer_id,
            credited: false,
            user: None,
            bonus: BonusGrant::NotApplicable,
        }
    }
}

/// Records who invited a new user and rewards the inviter, once per invited user.
pub struct ReferralAccountant {
    store: Arc<dyn LedgerStore>,
    resolver: Arc<SubscriptionResolver>,
    locks: UserLocks,
    bonus_days: u32,
}

impl ReferralAccountant {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        resolver: Arc<SubscriptionResolver>,
        locks: UserLocks,
        bonus_days: u32,
    ) -> Self {
        Self {
            store,
            resolver,
            locks,
            bonus_days,
        }
    }

    /// Creates the referred user with `referrer_id` set, counts the referral and
    /// grants the bonus.
    ///
    /// Nothing is written when the referred user already exists, refers itself,
    /// or names an unknown referrer; the outcome is then `credited = false`.
    /// A failed bonus grant does not undo the count and is reported in
    /// [`ReferralOutcome::bonus`]. Once the user row exists the count and the
    /// bonus run on their own task, so a caller that stops waiting does not
    /// leave a counted referral without its bonus.
    pub async fn attribute(
        &self,
        new_user: &UserGuard,
        profile: &UserProfile,
        referrer_id: i64,
    ) -> Res<ReferralOutcome> {
        let user_id = new_user.user_id();

        if referrer_id == user_id {
            log::warn!("{} | referral_self_rejected", user_id);
            return Ok(ReferralOutcome::rejected(referrer_id));
        }
        if self.store.get_user(user_id).await?.is_some() {
            log::info!("{} | referral_ignored_existing_user", user_id);
            return Ok(ReferralOutcome::rejected(referrer_id));
        }
        if self.store.get_user(referrer_id).await?.is_none() {
            log::warn!("{} | referral_unknown_referrer_{}", user_id, referrer_id);
            return Ok(ReferralOutcome::rejected(referrer_id));
        }

        let user = self
            .store
            .create_user(UserCreateRequest {
                user_id,
                username: profile.username.clone(),
                name: profile.name.clone(),
                referrer_id: Some(referrer_id),
            })
            .await?;
        log::info!("{} | user_add", user_id);

        let credit = tokio::spawn(credit_referrer(
            self.store.clone(),
            self.resolver.clone(),
            self.locks.clone(),
            user_id,
            referrer_id,
            self.bonus_days,
        ));
        let bonus = credit
            .await
            .map_err(|e| AppError::Internal(format!("referral credit task: {}", e)))??;

        Ok(ReferralOutcome {
            referrer_id,
            credited: true,
            user: Some(user),
            bonus,
        })
    }
}

async fn credit_referrer(
    store: Arc<dyn LedgerStore>,
    resolver: Arc<SubscriptionResolver>,
    locks: UserLocks,
    user_id: i64,
    referrer_id: i64,
    bonus_days: u32,
) -> Res<BonusGrant> {
    store.increment_referral_count(referrer_id).await?;
    log::info!("{} | referred_by_{}", user_id, referrer_id);

    let referrer = locks.acquire(referrer_id).await;
    let bonus = match resolver
        .grant(&referrer, REFERRAL_PLAN_ID, bonus_days)
        .await
    {
        Ok(subscription) => {
            log::info!("{} | referral_bonus_added", referrer_id);
            BonusGrant::Granted { subscription }
        }
        Err(e) => {
            log::error!("{} | referral_bonus_error | {}", referrer_id, e);
            BonusGrant::Failed {
                error: e.to_string(),
            }
        }
    };

    Ok(bonus)
}

#[cfg(test)]
mod tests {
    use std::{sync::atomic::Ordering, time::Duration};

    use chrono::TimeDelta;

    use super::*;
    use crate::{
        clock::Clock,
        testing::{Fixture, FlakyStore, at},
    };

    const BONUS_DAYS: u32 = 7;

    fn profile() -> UserProfile {
        UserProfile {
            username: Some("newcomer".to_string()),
            name: Some("New Comer".to_string()),
        }
    }

    fn accountant_over(fx: &Fixture, store: Arc<dyn LedgerStore>) -> ReferralAccountant {
        let clock: Arc<dyn Clock> = fx.clock.clone();
        let resolver = Arc::new(SubscriptionResolver::new(store.clone(), clock));
        ReferralAccountant::new(store, resolver, fx.locks.clone(), BONUS_DAYS)
    }

    #[tokio::test]
    async fn new_user_with_referral_credits_referrer() {
        let fx = Fixture::with_users(&[7]).await;
        let accountant = accountant_over(&fx, fx.store.clone());

        let guard = fx.locks.acquire(42).await;
        let outcome = accountant.attribute(&guard, &profile(), 7).await.unwrap();

        assert!(outcome.credited);
        assert_eq!(outcome.user.as_ref().unwrap().referrer_id, Some(7));
        assert_eq!(fx.store.get_user(42).await.unwrap().unwrap().referrer_id, Some(7));
        assert_eq!(fx.store.get_user(7).await.unwrap().unwrap().referral_count, 1);

        let rows = fx.store.subscriptions_of(7).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subscription_type, "referral");
        assert_eq!(rows[0].end_date - rows[0].start_date, TimeDelta::days(7));
        assert!(matches!(outcome.bonus, BonusGrant::Granted { .. }));
    }

    #[tokio::test]
    async fn second_attribution_for_same_user_is_ignored() {
        let fx = Fixture::with_users(&[7]).await;
        let accountant = accountant_over(&fx, fx.store.clone());
        let guard = fx.locks.acquire(42).await;

        accountant.attribute(&guard, &profile(), 7).await.unwrap();
        let again = accountant.attribute(&guard, &profile(), 7).await.unwrap();

        assert!(!again.credited);
        assert!(again.user.is_none());
        assert_eq!(fx.store.get_user(7).await.unwrap().unwrap().referral_count, 1);
        assert_eq!(
            fx.store.subscriptions_of(7).await[0].end_date,
            at(0) + TimeDelta::days(7)
        );
    }

    #[tokio::test]
    async fn self_referral_writes_nothing() {
        let fx = Fixture::with_users(&[]).await;
        let accountant = accountant_over(&fx, fx.store.clone());
        let guard = fx.locks.acquire(42).await;

        let outcome = accountant.attribute(&guard, &profile(), 42).await.unwrap();

        assert!(!outcome.credited);
        assert!(fx.store.get_user(42).await.unwrap().is_none());
        assert!(fx.store.subscriptions_of(42).await.is_empty());
    }

    #[tokio::test]
    async fn existing_user_self_referral_writes_nothing() {
        let fx = Fixture::with_users(&[42]).await;
        let accountant = accountant_over(&fx, fx.store.clone());
        let guard = fx.locks.acquire(42).await;

        let outcome = accountant.attribute(&guard, &profile(), 42).await.unwrap();

        assert!(!outcome.credited);
        assert_eq!(fx.store.get_user(42).await.unwrap().unwrap().referral_count, 0);
        assert!(fx.store.subscriptions_of(42).await.is_empty());
    }

    #[tokio::test]
    async fn unknown_referrer_is_not_credited() {
        let fx = Fixture::with_users(&[]).await;
        let accountant = accountant_over(&fx, fx.store.clone());
        let guard = fx.locks.acquire(42).await;

        let outcome = accountant.attribute(&guard, &profile(), 999).await.unwrap();

        assert!(!outcome.credited);
        assert!(fx.store.get_user(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn failed_bonus_keeps_the_count() {
        let fx = Fixture::with_users(&[7]).await;
        let flaky = Arc::new(FlakyStore::over(fx.store.clone()));
        flaky.fail_grants.store(true, Ordering::SeqCst);
        let accountant = accountant_over(&fx, flaky.clone());

        let guard = fx.locks.acquire(42).await;
        let outcome = accountant.attribute(&guard, &profile(), 7).await.unwrap();

        assert!(outcome.credited);
        assert!(matches!(outcome.bonus, BonusGrant::Failed { .. }));
        assert_eq!(fx.store.get_user(7).await.unwrap().unwrap().referral_count, 1);
        assert!(fx.store.subscriptions_of(7).await.is_empty());
    }

    #[tokio::test]
    async fn bonus_stacks_onto_referrers_paid_window() {
        let fx = Fixture::with_users(&[7]).await;
        let accountant = accountant_over(&fx, fx.store.clone());
        {
            let referrer = fx.locks.acquire(7).await;
            fx.resolver().grant(&referrer, "1month", 30).await.unwrap();
        }

        let guard = fx.locks.acquire(42).await;
        accountant.attribute(&guard, &profile(), 7).await.unwrap();

        let rows = fx.store.subscriptions_of(7).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subscription_type, "1month");
        assert_eq!(rows[0].end_date, at(0) + TimeDelta::days(37));
    }

    #[tokio::test]
    async fn abandoned_attribution_still_pays_the_bonus() {
        let fx = Fixture::with_users(&[7]).await;
        let mut flaky = FlakyStore::over(fx.store.clone());
        flaky.write_delay = Some(Duration::from_millis(200));
        let accountant = accountant_over(&fx, Arc::new(flaky));

        let guard = fx.locks.acquire(42).await;
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            accountant.attribute(&guard, &profile(), 7),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(fx.store.get_user(7).await.unwrap().unwrap().referral_count, 1);
        let rows = fx.store.subscriptions_of(7).await;
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].subscription_type, "referral");
    }
}
