use std::fmt;

use serde::Serialize;

use crate::error::{AppError, Res};

/// Plan id under which referral bonuses are granted.
pub const REFERRAL_PLAN_ID: &str = "referral";

/// Prefix of every invoice payload handed to the payment provider.
const PAYLOAD_PREFIX: &str = "subscription_";

/// Currency of plan prices (Telegram stars).
pub const CURRENCY: &str = "XTR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: String,
    pub title: String,
    pub description: String,
    /// Price in the provider's smallest unit.
    pub price: i64,
    /// Length of the grant in whole days.
    pub days: u32,
    pub purchasable: bool,
}

/// Static mapping from plan id to plan. Built once at startup, never mutated.
#[derive(Debug, Clone)]
pub struct PlanCatalog {
    plans: Vec<Plan>,
}

impl PlanCatalog {
    /// The bot's fixed offering plus the non-purchasable referral entry.
    pub fn standard(referral_bonus_days: u32) -> Self {
        let paid = |id: &str, title: &str, description: &str, price: i64, days: u32| Plan {
            id: id.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            price,
            days,
            purchasable: true,
        };

        PlanCatalog {
            plans: vec![
                paid("1month", "1 Month", "Access for one month", 1, 30),
                paid("3months", "3 Months", "Access for three months", 2, 90),
                paid("6months", "6 Months", "Access for six months", 3, 180),
                paid("1year", "1 Year", "Access for one year", 4, 365),
                Plan {
                    id: REFERRAL_PLAN_ID.to_string(),
                    title: "Referral Bonus".to_string(),
                    description: "Bonus access for inviting a friend".to_string(),
                    price: 0,
                    days: referral_bonus_days,
                    purchasable: false,
                },
            ],
        }
    }

    pub fn get(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|p| p.id == plan_id)
    }

    /// Plans offered in the purchase menu, in display order.
    pub fn purchasable(&self) -> Vec<&Plan> {
        self.plans.iter().filter(|p| p.purchasable).collect()
    }

    pub fn referral(&self) -> Option<&Plan> {
        self.get(REFERRAL_PLAN_ID)
    }

    /// Resolves a payload to a plan that can actually be bought.
    pub fn resolve_purchase(&self, payload: &PaymentPayload) -> Res<&Plan> {
        match self.get(payload.plan_id()) {
            Some(plan) if plan.purchasable => Ok(plan),
            Some(plan) => Err(AppError::InvalidPayload(format!(
                "plan {} cannot be purchased",
                plan.id
            ))),
            None => Err(AppError::InvalidPayload(format!(
                "unknown plan {}",
                payload.plan_id()
            ))),
        }
    }

    /// The opaque payload attached to an invoice for `plan_id`.
    pub fn invoice_payload(&self, plan_id: &str) -> Option<PaymentPayload> {
        self.get(plan_id).map(|plan| PaymentPayload(plan.id.clone()))
    }
}

/// Invoice payload of the form `subscription_<plan id>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentPayload(String);

impl PaymentPayload {
    /// Extracts the plan id. Does not check the catalog.
    pub fn parse(raw: &str) -> Res<Self> {
        match raw.strip_prefix(PAYLOAD_PREFIX) {
            Some(plan_id) if !plan_id.is_empty() => Ok(PaymentPayload(plan_id.to_string())),
            _ => Err(AppError::InvalidPayload(format!(
                "malformed payment payload: {:?}",
                raw
            ))),
        }
    }

    pub fn plan_id(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PaymentPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PAYLOAD_PREFIX, self.0)
    }
}
