use serde::Deserialize;

/// Emitted by the bot layer on a user's first `/start`.
#[derive(Debug, Clone, Deserialize)]
pub struct UserCreated {
    pub user_id: i64,
    pub username: Option<String>,
    pub name: Option<String>,
    /// Parsed from the deep-link payload, if any.
    pub referrer_id: Option<i64>,
}

impl UserCreated {
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            username: self.username.clone(),
            name: self.name.clone(),
        }
    }
}

/// Display attributes of a user.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    pub username: Option<String>,
    pub name: Option<String>,
}

/// Emitted by the bot layer once the payment provider confirms a charge.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentConfirmed {
    pub user_id: i64,
    #[serde(flatten)]
    pub payment: Payment,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    /// Invoice payload, `subscription_<plan id>`.
    pub payload: String,
    pub provider_transaction_id: String,
    /// Charged amount in the provider's smallest unit, when reported.
    pub total_amount: Option<i64>,
    pub currency: Option<String>,
}
