// src/service/error.rs
use axum::http::StatusCode;
use thiserror::Error;
use uuid::Uuid;

use crate::error::HttpError;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Ticket with ID {0} not found")]
    TicketNotFound(Uuid),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot send notification: {0}")]
    EmailNotAllowed(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Mail error: {0}")]
    Mail(String),
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::TicketNotFound(_) => StatusCode::NOT_FOUND,

            ServiceError::Validation(_) | ServiceError::EmailNotAllowed(_) => {
                StatusCode::BAD_REQUEST
            }

            ServiceError::Database(_) | ServiceError::Mail(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ServiceError> for HttpError {
    fn from(error: ServiceError) -> Self {
        HttpError::new(error.to_string(), error.status_code())
    }
}
