// src/error.rs
//! Error type for charging operations, rendered as a problem descriptor
//! on the Nchf interface.

use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

use crate::models::ProblemDetails;

#[derive(Error, Debug)]
pub enum ChargingError {
    // ==================== Client Errors ====================
    #[error("Malformed subscriber identifier: {0}")]
    MalformedSubscriber(String),

    #[error("Subscriber not found: {0}")]
    SubscriberNotFound(String),

    #[error("Charging session not found: {0}")]
    ChargingSessionNotFound(String),

    #[error("Record already closed: {0}")]
    RecordClosed(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Record persistence failed: {0}")]
    Persistence(String),

    // ==================== Internal Errors ====================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ChargingError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ChargingError::MalformedSubscriber(_)
            | ChargingError::SubscriberNotFound(_)
            | ChargingError::RecordClosed(_)
            | ChargingError::InvalidRequest(_)
            | ChargingError::Persistence(_) => StatusCode::BAD_REQUEST,

            ChargingError::ChargingSessionNotFound(_) => StatusCode::NOT_FOUND,

            ChargingError::Config(_) | ChargingError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Application cause carried in the problem descriptor
    pub fn cause(&self) -> &'static str {
        match self {
            ChargingError::MalformedSubscriber(_) => "MANDATORY_IE_INCORRECT",
            ChargingError::SubscriberNotFound(_) => "USER_UNKNOWN",
            ChargingError::ChargingSessionNotFound(_) => "CHARGING_NOT_APPLICABLE",
            ChargingError::RecordClosed(_) => "CHARGING_NOT_APPLICABLE",
            ChargingError::InvalidRequest(_) => "INVALID_MSG_FORMAT",
            ChargingError::Persistence(_) => "CHARGING_FAILED",
            ChargingError::Config(_) => "SYSTEM_FAILURE",
            ChargingError::Internal(_) => "SYSTEM_FAILURE",
        }
    }

    pub fn to_problem_details(&self) -> ProblemDetails {
        ProblemDetails {
            title: self.status_code().canonical_reason().map(str::to_string),
            status: self.status_code().as_u16(),
            detail: Some(self.to_string()),
            cause: Some(self.cause().to_string()),
        }
    }
}

impl ResponseError for ChargingError {
    fn status_code(&self) -> StatusCode {
        ChargingError::status_code(self)
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("application/problem+json")
            .json(self.to_problem_details())
    }
}

impl From<tokio_postgres::Error> for ChargingError {
    fn from(err: tokio_postgres::Error) -> Self {
        ChargingError::Persistence(err.to_string())
    }
}

impl From<deadpool_postgres::PoolError> for ChargingError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        ChargingError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for ChargingError {
    fn from(err: serde_json::Error) -> Self {
        ChargingError::Internal(err.to_string())
    }
}
