use common::error::{AppError, Res};
use sqlx::{Executor, Postgres};

use crate::{dtos::user::UserCreateRequest, models::user::User};

pub async fn get_user_by_id<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: i64,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .map_err(AppError::from)
}

/// Inserts the user unless the id is taken. Returns `None` when a row already existed.
pub async fn insert_user<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    data: &UserCreateRequest,
) -> Res<Option<User>> {
    sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (user_id, username, name, referrer_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id) DO NOTHING
        RETURNING *
        "#,
    )
    .bind(data.user_id)
    .bind(&data.username)
    .bind(&data.name)
    .bind(data.referrer_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)
}

pub async fn increment_referral_count<'e, E: Executor<'e, Database = Postgres>>(
    executor: E,
    user_id: i64,
) -> Res<User> {
    sqlx::query_as::<_, User>(
        "UPDATE users SET referral_count = referral_count + 1 WHERE user_id = $1 RETURNING *",
    )
    .bind(user_id)
    .fetch_optional(executor)
    .await
    .map_err(AppError::from)?
    .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))
}
