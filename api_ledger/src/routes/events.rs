use std::sync::Arc;

use actix_web::{Either, Responder, post, web};
use common::{
    error::{AppError, Res},
    http::Success,
};
use ledger::{
    Ledger,
    events::{PaymentConfirmed, UserCreated},
};

/// Records a user's first contact, attributing the referral if one is present.
///
/// Answers `201 Created` when the user was created and `200 OK` when the user
/// was already known.
#[post("/user")]
pub async fn post_user_event(
    ledger: web::Data<Arc<Ledger>>,
    event: web::Json<UserCreated>,
) -> Res<impl Responder> {
    let registration = ledger.register_user(event.into_inner()).await?;
    if registration.created {
        Success::created(registration).map(Either::Left)
    } else {
        Success::ok(registration).map(Either::Right)
    }
}

/// Grants the purchased plan for a confirmed payment.
///
/// The charge has already gone through, so anything that stops the grant is
/// reported as an activation failure and the bot can tell the user their
/// money arrived. The one exception is a charge already bound to another
/// user, which stays a conflict.
#[post("/payment")]
pub async fn post_payment_event(
    ledger: web::Data<Arc<Ledger>>,
    event: web::Json<PaymentConfirmed>,
) -> Res<impl Responder> {
    let event = event.into_inner();
    let user_id = event.user_id;

    let receipt = ledger.confirm_payment(event).await.map_err(|e| match e {
        AppError::Conflict(_) => e,
        other => {
            log::error!("{} | payment_activation_error | {}", user_id, other);
            AppError::ActivationFailed(other.to_string())
        }
    })?;
    Success::ok(receipt)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::{App, http::StatusCode, test};
    use chrono::Utc;
    use common::env_config::LedgerConfig;
    use ledger::{clock::ManualClock, store::memory::MemoryLedgerStore};
    use serde_json::{Value, json};

    use super::*;

    fn ledger() -> Arc<Ledger> {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = Arc::new(MemoryLedgerStore::new(clock.clone()));
        let config = LedgerConfig {
            referral_bonus_days: 7,
            operation_timeout: Duration::from_secs(5),
        };
        Arc::new(Ledger::with_clock(store, &config, clock))
    }

    #[actix_web::test]
    async fn user_event_is_created_then_acknowledged() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ledger()))
                .service(crate::mount_api()),
        )
        .await;
        let event = json!({ "user_id": 42, "username": "alice", "name": null, "referrer_id": null });

        let req = test::TestRequest::post()
            .uri("/api/events/user")
            .set_json(&event)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/events/user")
            .set_json(&event)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["created"], json!(false));
        assert_eq!(body["user"]["user_id"], json!(42));
    }

    #[actix_web::test]
    async fn payment_event_grants_plan() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ledger()))
                .service(crate::mount_api()),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/api/events/user")
            .set_json(json!({ "user_id": 42 }))
            .to_request();
        test::call_service(&app, req).await;

        let payment = json!({
            "user_id": 42,
            "payload": "subscription_1month",
            "provider_transaction_id": "charge-1",
            "total_amount": 1,
            "currency": "XTR",
        });
        let req = test::TestRequest::post()
            .uri("/api/events/payment")
            .set_json(&payment)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["duplicate"], json!(false));
        assert_eq!(body["plan"]["id"], json!("1month"));
        assert_eq!(body["subscription"]["subscription_type"], json!("1month"));

        let req = test::TestRequest::post()
            .uri("/api/events/payment")
            .set_json(&payment)
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["duplicate"], json!(true));
    }

    #[actix_web::test]
    async fn unusable_payment_is_an_activation_failure() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ledger()))
                .service(crate::mount_api()),
        )
        .await;

        for payment in [
            json!({
                "user_id": 42,
                "payload": "subscription_lifetime",
                "provider_transaction_id": "charge-1",
            }),
            json!({
                "user_id": 43,
                "payload": "subscription_1month",
                "provider_transaction_id": "charge-2",
            }),
        ] {
            let req = test::TestRequest::post()
                .uri("/api/events/payment")
                .set_json(&payment)
                .to_request();
            let res = test::call_service(&app, req).await;
            assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
            let body: Value = test::read_body_json(res).await;
            assert_eq!(body["payment_received"], json!(true));
        }
    }

    #[actix_web::test]
    async fn charge_of_another_user_conflicts() {
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(ledger()))
                .service(crate::mount_api()),
        )
        .await;

        for user_id in [42, 43] {
            let req = test::TestRequest::post()
                .uri("/api/events/user")
                .set_json(json!({ "user_id": user_id }))
                .to_request();
            test::call_service(&app, req).await;
        }
        let mut payment = json!({
            "user_id": 42,
            "payload": "subscription_1month",
            "provider_transaction_id": "charge-1",
        });
        let req = test::TestRequest::post()
            .uri("/api/events/payment")
            .set_json(&payment)
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        payment["user_id"] = json!(43);
        let req = test::TestRequest::post()
            .uri("/api/events/payment")
            .set_json(&payment)
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::CONFLICT
        );
    }
}
