use chrono::{DateTime, Utc};

/// Idempotency key of a confirmed payment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PaymentKey {
    pub provider_transaction_id: String,
    pub payload: String,
}

#[derive(Debug, Clone)]
pub struct ProcessedPaymentCreateRequest {
    pub key: PaymentKey,
    pub user_id: i64,
    pub subscription_id: i64,
    pub granted_until: DateTime<Utc>,
}
