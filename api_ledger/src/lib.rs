use actix_web::web;

pub mod routes {
    pub mod events;
    pub mod payments;
    pub mod plans;
    pub mod users;
}

mod dtos {
    pub(crate) mod payments;
    pub(crate) mod plans;
}

pub fn mount_events() -> actix_web::Scope {
    web::scope("/events")
        .service(routes::events::post_user_event)
        .service(routes::events::post_payment_event)
}
pub fn mount_payments() -> actix_web::Scope {
    web::scope("/payments").service(routes::payments::post_pre_checkout)
}
pub fn mount_plans() -> actix_web::Scope {
    web::scope("/plans").service(routes::plans::get_plans)
}
pub fn mount_users() -> actix_web::Scope {
    web::scope("/users")
        .service(routes::users::get_user)
        .service(routes::users::get_subscription)
        .service(routes::users::post_cancel_subscription)
}

/// Every ledger scope under one prefix, as the bot layer expects it.
pub fn mount_api() -> actix_web::Scope {
    web::scope("/api")
        .service(mount_events())
        .service(mount_payments())
        .service(mount_plans())
        .service(mount_users())
}
