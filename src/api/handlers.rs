// src/api/handlers.rs
use actix_web::{http::header, web, HttpResponse};
use std::sync::Arc;

use crate::error::ChargingError;
use crate::models::{ChargingDataRequest, HealthResponse};
use crate::services::ChargingProcessor;

pub async fn health_check(processor: web::Data<Arc<ChargingProcessor>>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        service: "apolo-chf".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_sessions: processor.context().registry().len(),
    })
}

pub async fn create_charging_data(
    req: web::Json<ChargingDataRequest>,
    processor: web::Data<Arc<ChargingProcessor>>,
) -> Result<HttpResponse, ChargingError> {
    let (response, location) = processor.create(req.into_inner()).await?;

    Ok(HttpResponse::Created()
        .insert_header((header::LOCATION, location))
        .json(response))
}

pub async fn update_charging_data(
    path: web::Path<String>,
    req: web::Json<ChargingDataRequest>,
    processor: web::Data<Arc<ChargingProcessor>>,
) -> Result<HttpResponse, ChargingError> {
    let response = processor.update(req.into_inner(), &path).await?;
    Ok(HttpResponse::Ok().json(response))
}

pub async fn release_charging_data(
    path: web::Path<String>,
    req: web::Json<ChargingDataRequest>,
    processor: web::Data<Arc<ChargingProcessor>>,
) -> Result<HttpResponse, ChargingError> {
    processor.release(req.into_inner(), &path).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// Balance recharge signalled by the account side
pub async fn recharge(
    path: web::Path<(String, u32)>,
    processor: web::Data<Arc<ChargingProcessor>>,
) -> Result<HttpResponse, ChargingError> {
    let (ue_id, rating_group) = path.into_inner();
    processor.notify_recharge(&ue_id, rating_group).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub async fn subscriber_records(
    path: web::Path<String>,
    processor: web::Data<Arc<ChargingProcessor>>,
) -> Result<HttpResponse, ChargingError> {
    let records = processor.records(&path).await?;
    Ok(HttpResponse::Ok().json(records))
}
