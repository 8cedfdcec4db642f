use chrono::{DateTime, Utc};
use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{
    constraint_error, dtos::subscription::SubscriptionCreateRequest,
    models::subscription::Subscription,
};

pub async fn get_subscription_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: i64,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
        .bind(subscription_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// The active window at `now`; the latest-ending one if several are open.
pub async fn get_active_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: i64,
    now: DateTime<Utc>,
) -> Res<Option<Subscription>> {
    sqlx::query_as::<_, Subscription>(
        r#"
        SELECT * FROM subscriptions
        WHERE user_id = $1 AND is_active = TRUE AND end_date > $2
        ORDER BY end_date DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .bind(now)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn insert_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: &SubscriptionCreateRequest,
) -> Res<Subscription> {
    sqlx::query_as::<_, Subscription>(
        r#"
        INSERT INTO subscriptions (user_id, subscription_type, start_date, end_date, is_active)
        VALUES ($1, $2, $3, $4, TRUE)
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(&data.subscription_type)
    .bind(data.start_date)
    .bind(data.end_date)
    .fetch_one(executor)
    .await
    .map_err(|e| constraint_error(e, &format!("user {}", data.user_id)))
}

pub async fn update_subscription_end<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: i64,
    new_end: DateTime<Utc>,
) -> Res<Subscription> {
    sqlx::query_as::<_, Subscription>(
        "UPDATE subscriptions SET end_date = $1 WHERE id = $2 AND is_active = TRUE RETURNING *",
    )
    .bind(new_end)
    .bind(subscription_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)?
    .ok_or_else(|| AppError::NotFound(format!("active subscription {}", subscription_id)))
}

pub async fn deactivate_subscription<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    subscription_id: i64,
) -> Res<Subscription> {
    sqlx::query_as::<_, Subscription>(
        "UPDATE subscriptions SET is_active = FALSE WHERE id = $1 RETURNING *",
    )
    .bind(subscription_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)?
    .ok_or_else(|| AppError::NotFound(format!("subscription {}", subscription_id)))
}
