use std::sync::Arc;

use actix_web::{Responder, get, post, web};
use common::{
    error::{AppError, Res},
    http::Success,
};
use ledger::Ledger;

#[get("/{user_id}")]
pub async fn get_user(
    ledger: web::Data<Arc<Ledger>>,
    user_id: web::Path<i64>,
) -> Res<impl Responder> {
    let user_id = user_id.into_inner();
    let user = ledger
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("user {}", user_id)))?;
    Success::ok(user)
}

/// Current window with its plan title and days left. `404` when there is none.
#[get("/{user_id}/subscription")]
pub async fn get_subscription(
    ledger: web::Data<Arc<Ledger>>,
    user_id: web::Path<i64>,
) -> Res<impl Responder> {
    let user_id = user_id.into_inner();
    let status = ledger
        .subscription_status(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("active subscription of user {}", user_id)))?;
    Success::ok(status)
}

#[post("/{user_id}/subscription/cancel")]
pub async fn post_cancel_subscription(
    ledger: web::Data<Arc<Ledger>>,
    user_id: web::Path<i64>,
) -> Res<impl Responder> {
    let cancelled = ledger.cancel_subscription(user_id.into_inner()).await?;
    Success::ok(cancelled)
}
