use std::sync::Arc;

use common::{
    error::{AppError, Res},
    plans::{CURRENCY, PaymentPayload, Plan, PlanCatalog},
};
use db::{dtos::payment::PaymentKey, models::subscription::Subscription};
use serde::Serialize;

use super::resolver::{SubscriptionResolver, log_grant};
use crate::{events::Payment, locks::UserGuard, store::LedgerStore};

/// Answer to the provider's pre-authorization query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PreCheckout {
    Accept,
    Reject { reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentReceipt {
    pub plan: Plan,
    /// The window as this payment left it. For a duplicate that is the stored
    /// result of the first delivery, even if the window moved since.
    pub subscription: Subscription,
    /// The payment had been processed before; nothing was granted this time.
    pub duplicate: bool,
}

/// Validates confirmed payments and grants the purchased plan once per payment.
pub struct PaymentIntake {
    store: Arc<dyn LedgerStore>,
    resolver: Arc<SubscriptionResolver>,
    catalog: Arc<PlanCatalog>,
}

impl PaymentIntake {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        resolver: Arc<SubscriptionResolver>,
        catalog: Arc<PlanCatalog>,
    ) -> Self {
        Self {
            store,
            resolver,
            catalog,
        }
    }

    /// Accepts unless the payload names no purchasable plan.
    pub fn pre_checkout(&self, payload: &str) -> PreCheckout {
        let resolved = PaymentPayload::parse(payload)
            .and_then(|payload| self.catalog.resolve_purchase(&payload).map(|_| ()));

        match resolved {
            Ok(()) => PreCheckout::Accept,
            Err(e) => PreCheckout::Reject {
                reason: e.to_string(),
            },
        }
    }

    /// Grants the plan named by a captured payment.
    ///
    /// The window change and the processed-payment record are committed
    /// together, so a redelivery either finds the record or finds nothing
    /// granted. An amount or currency that differs from the plan is logged,
    /// not refused: the money has already moved.
    pub async fn confirm_payment(&self, user: &UserGuard, payment: &Payment) -> Res<PaymentReceipt> {
        let user_id = user.user_id();
        let payload = PaymentPayload::parse(&payment.payload)?;
        let plan = self.catalog.resolve_purchase(&payload)?.clone();
        if let Some(mismatch) =
            amount_mismatch(&plan, payment.total_amount, payment.currency.as_deref())
        {
            log::error!(
                "{} | payment_amount_mismatch | {} | {}",
                user_id,
                payment.provider_transaction_id,
                mismatch
            );
        }

        if payment.provider_transaction_id.trim().is_empty() {
            return Err(AppError::InvalidPayload(
                "missing provider transaction id".to_string(),
            ));
        }
        let key = PaymentKey {
            provider_transaction_id: payment.provider_transaction_id.clone(),
            payload: payload.to_string(),
        };

        if let Some(processed) = self.store.find_processed_payment(&key).await? {
            if processed.user_id != user_id {
                return Err(AppError::Conflict(format!(
                    "payment {} belongs to user {}",
                    key.provider_transaction_id, processed.user_id
                )));
            }
            let mut subscription = self
                .store
                .get_subscription(processed.subscription_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("subscription {}", processed.subscription_id))
                })?;
            subscription.end_date = processed.granted_until;
            subscription.is_active = true;

            log::info!("{} | payment_duplicate_{}", user_id, plan.id);
            return Ok(PaymentReceipt {
                plan,
                subscription,
                duplicate: true,
            });
        }

        if self.store.get_user(user_id).await?.is_none() {
            return Err(AppError::NotFound(format!("user {}", user_id)));
        }

        let change = self.resolver.plan(user, &plan.id, plan.days).await?;
        let (subscription, _) = self
            .store
            .commit_payment(key, change.clone())
            .await
            .inspect_err(|e| {
                log::error!("{} | payment_grant_error_{} | {}", user_id, plan.id, e);
            })?;
        log_grant(&change, &plan.id, plan.days);
        log::info!("{} | payment_success_{}", user_id, plan.id);

        Ok(PaymentReceipt {
            plan,
            subscription,
            duplicate: false,
        })
    }
}

fn amount_mismatch(plan: &Plan, total_amount: Option<i64>, currency: Option<&str>) -> Option<String> {
    if let Some(currency) = currency {
        if currency != CURRENCY {
            return Some(format!(
                "plan {} is priced in {}, got {}",
                plan.id, CURRENCY, currency
            ));
        }
    }
    match total_amount {
        Some(amount) if amount != plan.price => Some(format!(
            "plan {} costs {}, got {}",
            plan.id, plan.price, amount
        )),
        _ => None,
    }
}
