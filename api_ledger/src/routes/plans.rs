use std::sync::Arc;

use actix_web::{Responder, get, web};
use common::{error::Res, http::Success};
use ledger::Ledger;

use crate::dtos::plans::PlanListItem;

/// Lists the plans offered for purchase, in menu order.
#[get("")]
pub async fn get_plans(ledger: web::Data<Arc<Ledger>>) -> Res<impl Responder> {
    Success::ok(PlanListItem::from_catalog(ledger.plans()))
}
