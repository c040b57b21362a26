// src/handler/tickets.rs
use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::ticketdtos::{
        AssignTechnicianDto, CreateTicketDto, TicketQueryParams, UpdateStatusDto, UpdateTicketDto,
    },
    error::HttpError,
    mail::mails::send_ticket_notification,
    middleware::JWTAuthMiddeware,
    models::ticketmodel::{Actor, TicketDetail, TicketStatus},
    service::{error::ServiceError, view},
    AppState,
};

pub fn tickets_handler() -> Router {
    Router::new()
        .route("/", get(get_tickets).post(create_ticket))
        .route(
            "/:ticket_id",
            get(get_ticket).patch(update_ticket).delete(delete_ticket),
        )
        .route("/:ticket_id/status", put(update_ticket_status))
        .route("/:ticket_id/assign", put(assign_ticket))
        .route("/:ticket_id/history", get(get_ticket_history))
        .route("/:ticket_id/email", post(send_ticket_email))
}

fn to_view(detail: TicketDetail) -> Result<Value, HttpError> {
    let value =
        serde_json::to_value(detail).map_err(|e| HttpError::server_error(e.to_string()))?;
    Ok(view::transform_ticket(value))
}

pub async fn create_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(_auth): Extension<JWTAuthMiddeware>,
    Json(body): Json<CreateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let detail = app_state.lifecycle.create(body).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": to_view(detail)?
    })))
}

pub async fn get_tickets(
    Extension(app_state): Extension<Arc<AppState>>,
    Query(params): Query<TicketQueryParams>,
) -> Result<impl IntoResponse, HttpError> {
    let tickets = app_state
        .lifecycle
        .find_all(params.status, params.priority)
        .await?;

    let values = tickets
        .into_iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| HttpError::server_error(e.to_string()))?;
    let views = view::transform_tickets(values);

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": views
    })))
}

pub async fn get_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let detail = app_state.lifecycle.find_by_id(ticket_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": to_view(detail)?
    })))
}

pub async fn update_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<UpdateTicketDto>,
) -> Result<impl IntoResponse, HttpError> {
    body.validate()
        .map_err(|e| HttpError::bad_request(e.to_string()))?;

    let detail = app_state
        .lifecycle
        .update(ticket_id, body, Actor::User(auth.user.id))
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": to_view(detail)?
    })))
}

pub async fn update_ticket_status(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<UpdateStatusDto>,
) -> Result<impl IntoResponse, HttpError> {
    let detail = app_state
        .lifecycle
        .update_status(ticket_id, body, Actor::User(auth.user.id))
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": to_view(detail)?
    })))
}

pub async fn assign_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
    Json(body): Json<AssignTechnicianDto>,
) -> Result<impl IntoResponse, HttpError> {
    let detail = app_state
        .lifecycle
        .assign_technician(
            ticket_id,
            body.technician_id,
            body.note,
            Actor::User(auth.user.id),
        )
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": to_view(detail)?
    })))
}

pub async fn get_ticket_history(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let history = app_state.lifecycle.get_history(ticket_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": history
    })))
}

pub async fn delete_ticket(
    Extension(app_state): Extension<Arc<AppState>>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let detail = app_state.lifecycle.remove(ticket_id).await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "data": to_view(detail)?
    })))
}

/// Send the customer the resolved/closed notification for a ticket. The
/// lifecycle only exposes the fact that a ticket reached a terminal state;
/// dispatching the email is this boundary's job.
pub async fn send_ticket_email(
    Extension(app_state): Extension<Arc<AppState>>,
    Extension(auth): Extension<JWTAuthMiddeware>,
    Path(ticket_id): Path<Uuid>,
) -> Result<impl IntoResponse, HttpError> {
    let detail = app_state.lifecycle.find_by_id(ticket_id).await?;

    if detail.ticket.status != TicketStatus::Resolved
        && detail.ticket.status != TicketStatus::Closed
    {
        return Err(ServiceError::EmailNotAllowed(
            "notifications can only be sent for resolved or closed tickets".to_string(),
        )
        .into());
    }

    let customer_email = detail
        .ticket
        .customer_email
        .clone()
        .ok_or_else(|| HttpError::bad_request("Ticket has no customer email"))?;

    send_ticket_notification(&detail, &customer_email)
        .await
        .map_err(|e| HttpError::from(ServiceError::Mail(e.to_string())))?;

    app_state
        .lifecycle
        .record_notification(ticket_id, &customer_email, Actor::User(auth.user.id))
        .await?;

    Ok(Json(serde_json::json!({
        "status": "success",
        "message": "Notification email sent"
    })))
}
