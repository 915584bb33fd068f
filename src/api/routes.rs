// src/api/routes.rs
use actix_web::web;

use crate::api::handlers;
use crate::context::SERVICE_PATH;
use crate::error::ChargingError;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(|err, _req| {
        ChargingError::InvalidRequest(err.to_string()).into()
    }))
    .service(
        web::scope(SERVICE_PATH)
            .route("/chargingdata", web::post().to(handlers::create_charging_data))
            .route("/chargingdata/{id}/update", web::post().to(handlers::update_charging_data))
            .route("/chargingdata/{id}/release", web::post().to(handlers::release_charging_data))
            .route("/recharge/{ue_id}/{rating_group}", web::post().to(handlers::recharge)),
    )
    .service(
        web::scope("/api/v1")
            .route("/health", web::get().to(handlers::health_check))
            .route("/records/{ue_id}", web::get().to(handlers::subscriber_records)),
    );
}
