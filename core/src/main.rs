use std::sync::Arc;

use actix_web::{App, HttpServer, web};
use common::env_config::Config;
use ledger::{Ledger, store::postgres::PgLedgerStore};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // get env vars
    let config = Config::from_env();

    // init logger
    logger::setup(&config).expect("Failed to set up logger");

    // init db connection
    let pool = db::setup(&config.database_url, config.is_production())
        .await
        .expect("Failed to set up database");

    // init ledger
    let store = Arc::new(PgLedgerStore::new(pool));
    let ledger = Arc::new(Ledger::new(store, &config.ledger));
    log::info!(
        "ledger ready: referral bonus {} days, deadline {:?}",
        config.ledger.referral_bonus_days,
        config.ledger.operation_timeout
    );

    let config_data = config.clone();
    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(ledger.clone()))
            .app_data(web::Data::new(config_data.clone()))
            .wrap(logger::middleware())
            .service(api_ledger::mount_api())
    })
    .bind((config.server_host.as_str(), config.server_port))?
    .workers(config.num_workers)
    .run()
    .await
}
