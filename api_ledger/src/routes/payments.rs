use std::sync::Arc;

use actix_web::{Responder, post, web};
use common::{error::Res, http::Success};
use ledger::Ledger;

use crate::dtos::payments::PreCheckoutRequest;

/// Answers the provider's pre-checkout query.
///
/// Always `200 OK`; the decision is in the body.
#[post("/pre-checkout")]
pub async fn post_pre_checkout(
    ledger: web::Data<Arc<Ledger>>,
    req: web::Json<PreCheckoutRequest>,
) -> Res<impl Responder> {
    let decision = ledger.pre_checkout(&req.payload);
    Success::ok(decision)
}
