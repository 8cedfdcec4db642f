use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{
    constraint_error,
    dtos::payment::{PaymentKey, ProcessedPaymentCreateRequest},
    models::payment::ProcessedPayment,
};

pub async fn get_processed_payment<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    key: &PaymentKey,
) -> Res<Option<ProcessedPayment>> {
    sqlx::query_as::<_, ProcessedPayment>(
        "SELECT * FROM processed_payments WHERE provider_transaction_id = $1 AND payload = $2",
    )
    .bind(&key.provider_transaction_id)
    .bind(&key.payload)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_processed_payment<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: &ProcessedPaymentCreateRequest,
) -> Res<ProcessedPayment> {
    sqlx::query_as::<_, ProcessedPayment>(
        r#"
        INSERT INTO processed_payments
            (provider_transaction_id, payload, user_id, subscription_id, granted_until)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING *
        "#,
    )
    .bind(&data.key.provider_transaction_id)
    .bind(&data.key.payload)
    .bind(data.user_id)
    .bind(data.subscription_id)
    .bind(data.granted_until)
    .fetch_one(executor)
    .await
    .map_err(|e| {
        constraint_error(
            e,
            &format!("payment {}", data.key.provider_transaction_id),
        )
    })
}
