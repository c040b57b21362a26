// src/dtos/ticketdtos.rs
use serde::{Deserialize, Deserializer};
use uuid::Uuid;
use validator::Validate;

use crate::models::ticketmodel::{TicketPriority, TicketStatus};

/// Three-state wrapper for nullable fields in partial updates.
///
/// A plain `Option` cannot distinguish "field absent from the payload" from
/// "field explicitly set to null", and for fields like `assigned_to` that
/// difference matters (leaving the assignment alone vs clearing it).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    #[default]
    Missing,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_missing(&self) -> bool {
        matches!(self, Patch::Missing)
    }

    /// Resolve against the current stored value: absent keeps it, null
    /// clears it, a value replaces it.
    pub fn apply(self, current: Option<T>) -> Option<T> {
        match self {
            Patch::Missing => current,
            Patch::Null => None,
            Patch::Value(v) => Some(v),
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Only reached when the key is present; #[serde(default)] covers the
        // missing case.
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(v) => Patch::Value(v),
            None => Patch::Null,
        })
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTicketDto {
    pub ticket_number: Option<String>,

    pub issue_title: Option<String>,

    #[validate(length(min = 1, message = "Issue description is required"))]
    pub issue_description: String,

    pub priority: TicketPriority,

    pub status: Option<TicketStatus>,

    pub product_serial_id: Option<Uuid>,

    /// Free-form serial number; resolved to a product serial when it matches.
    pub serial_number: Option<String>,

    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,

    #[validate(email(message = "Customer email is invalid"))]
    pub customer_email: Option<String>,

    pub customer_phone: Option<String>,

    pub assigned_to: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTicketDto {
    pub status: Option<TicketStatus>,

    pub priority: Option<TicketPriority>,

    #[serde(default)]
    pub issue_title: Patch<String>,

    #[validate(length(min = 1, message = "Issue description cannot be empty"))]
    pub issue_description: Option<String>,

    #[validate(length(min = 1, message = "Customer name cannot be empty"))]
    pub customer_name: Option<String>,

    #[serde(default)]
    pub customer_email: Patch<String>,

    #[serde(default)]
    pub customer_phone: Patch<String>,

    #[serde(default)]
    pub product_serial_id: Patch<Uuid>,

    #[serde(default)]
    pub assigned_to: Patch<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusDto {
    pub status: TicketStatus,
    pub note: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssignTechnicianDto {
    pub technician_id: Uuid,
    pub note: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct TicketQueryParams {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
}

/// Customer-portal support request. Subject and message are folded into the
/// issue description; the ticket number is always minted server-side.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSupportRequestDto {
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,

    #[validate(length(min = 1, message = "Message is required"))]
    pub message: String,

    pub serial_number: Option<String>,

    pub priority: TicketPriority,

    #[validate(length(min = 1, message = "Customer name is required"))]
    pub customer_name: String,

    #[validate(email(message = "Customer email is invalid"))]
    pub customer_email: Option<String>,

    pub customer_phone: Option<String>,
}
