// src/handler/portal.rs
use std::sync::Arc;

use axum::{response::IntoResponse, routing::post, Extension, Json, Router};
use validator::Validate;

use crate::{
    dtos::ticketdtos::{CreateSupportRequestDto, CreateTicketDto},
    error::HttpError,
    service::view,
    AppState,
};

pub fn portal_handler() -> Router {
    Router::new().route("/requests", post(create_support_request))
}

/// Unauthenticated customer-facing entry point. The ticket number is always
/// minted server-side and the creation is attributed to the system actor.
pub async fn create_support_request(
    Extension(app_state): Extension<Arc<AppState>>,
    Json(body): Json<CreateSupportRequestDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let dto = CreateTicketDto {
        ticket_number: None,
        issue_title: Some(body.subject.clone()),
        issue_description: format!("{}: {}", body.subject, body.message),
        priority: body.priority,
        status: None,
        product_serial_id: None,
        serial_number: body.serial_number,
        customer_name: body.customer_name,
        customer_email: body.customer_email,
        customer_phone: body.customer_phone,
        assigned_to: None,
    };

    let detail = app_state.lifecycle.create(dto).await?;
    let value =
        serde_json::to_value(detail).map_err(|e| HttpError::server_error(e.to_string()))?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Support request created successfully",
        "ticket": view::transform_ticket(value)
    })))
}
